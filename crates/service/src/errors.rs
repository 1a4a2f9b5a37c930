use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("validation error: {0}")]
    Validation(String),
    /// Connectivity, protocol or store-side type errors, passed through as-is.
    #[error("store error: {0}")]
    Store(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("encode error: {0}")]
    Encode(String),
}

impl ServiceError {
    pub fn store(msg: impl Into<String>) -> Self { Self::Store(msg.into()) }
}

impl From<redis::RedisError> for ServiceError {
    fn from(e: redis::RedisError) -> Self {
        Self::Store(e.to_string())
    }
}
