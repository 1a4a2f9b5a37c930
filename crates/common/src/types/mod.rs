use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct Health {
    pub status: &'static str,
}

impl Health {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

/// Generic `{"error": ...}` body returned by failing handlers.
#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}
