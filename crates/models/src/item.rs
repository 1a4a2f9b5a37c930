use serde::{Deserialize, Serialize};

/// Numeric "item amount" record as posted to `/items/{id}`.
///
/// Only `amount` reaches the store; `id` and `name` are accepted for shape
/// compatibility with clients that send the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
}

impl Item {
    /// Amount used on write and update paths; missing means zero.
    pub fn amount_or_zero(&self) -> i64 {
        self.amount.unwrap_or(0)
    }
}
