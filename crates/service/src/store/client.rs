use async_trait::async_trait;

use crate::errors::ServiceError;

/// Sentinel returned by [`KvClient::pttl`] when the key does not exist.
pub const PTTL_NO_KEY: i64 = -2;
/// Sentinel returned by [`KvClient::pttl`] when the key has no expiration.
pub const PTTL_NO_EXPIRY: i64 = -1;

/// Primitive operations of the external key-value store.
///
/// Shapes follow the Redis commands of the same name so that the Redis
/// implementation is a direct delegation. Every call is a single attempt.
#[async_trait]
pub trait KvClient: Send + Sync {
    /// `GET`
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError>;
    /// `SET`; clears any expiration.
    async fn set(&self, key: &str, value: String) -> Result<bool, ServiceError>;
    /// `GETSET`; atomic replace returning the previous value.
    async fn get_set(&self, key: &str, value: String) -> Result<Option<String>, ServiceError>;
    /// `DEL`; returns how many keys were removed.
    async fn del(&self, keys: &[String]) -> Result<u64, ServiceError>;
    /// `INCRBY`; missing keys start from zero.
    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ServiceError>;
    /// `EXISTS`
    async fn exists(&self, key: &str) -> Result<bool, ServiceError>;
    /// `STRLEN`; zero for missing keys.
    async fn strlen(&self, key: &str) -> Result<i64, ServiceError>;
    /// `PTTL`; remaining milliseconds or one of the `PTTL_*` sentinels.
    async fn pttl(&self, key: &str) -> Result<i64, ServiceError>;
    /// `PEXPIRE`; a non-positive timeout deletes the key.
    async fn pexpire(&self, key: &str, millis: i64) -> Result<bool, ServiceError>;
    /// `PEXPIREAT` with a unix timestamp in milliseconds.
    async fn pexpire_at(&self, key: &str, unix_millis: i64) -> Result<bool, ServiceError>;
    /// `PERSIST`; true only when an expiration was removed.
    async fn persist(&self, key: &str) -> Result<bool, ServiceError>;
    /// `KEYS` with glob syntax (`*`, `?`, `[...]`, `\` escapes).
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError>;
}
