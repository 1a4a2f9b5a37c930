use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::info;

use super::client::KvClient;
use crate::errors::ServiceError;

/// [`KvClient`] backed by a Redis server.
///
/// Wraps a single `ConnectionManager`; clones share the underlying
/// multiplexed connection, so one instance serves the whole process.
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    /// Open the connection eagerly so a bad URL fails at startup.
    pub async fn connect(url: &str) -> Result<Self, ServiceError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(url = %redacted(url), "connected to redis");
        Ok(Self { conn })
    }

    fn conn(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

/// Strip credentials from a connection URL before logging it.
fn redacted(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}

#[async_trait]
impl KvClient for RedisClient {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let mut conn = self.conn();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<bool, ServiceError> {
        let mut conn = self.conn();
        let _: () = redis::cmd("SET").arg(key).arg(value).query_async(&mut conn).await?;
        Ok(true)
    }

    async fn get_set(&self, key: &str, value: String) -> Result<Option<String>, ServiceError> {
        let mut conn = self.conn();
        let previous: Option<String> =
            redis::cmd("GETSET").arg(key).arg(value).query_async(&mut conn).await?;
        Ok(previous)
    }

    async fn del(&self, keys: &[String]) -> Result<u64, ServiceError> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn();
        let removed: u64 = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ServiceError> {
        let mut conn = self.conn();
        let value: i64 = redis::cmd("INCRBY").arg(key).arg(delta).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, ServiceError> {
        let mut conn = self.conn();
        let found: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(found)
    }

    async fn strlen(&self, key: &str) -> Result<i64, ServiceError> {
        let mut conn = self.conn();
        let len: i64 = redis::cmd("STRLEN").arg(key).query_async(&mut conn).await?;
        Ok(len)
    }

    async fn pttl(&self, key: &str) -> Result<i64, ServiceError> {
        let mut conn = self.conn();
        let millis: i64 = redis::cmd("PTTL").arg(key).query_async(&mut conn).await?;
        Ok(millis)
    }

    async fn pexpire(&self, key: &str, millis: i64) -> Result<bool, ServiceError> {
        let mut conn = self.conn();
        let applied: bool = redis::cmd("PEXPIRE").arg(key).arg(millis).query_async(&mut conn).await?;
        Ok(applied)
    }

    async fn pexpire_at(&self, key: &str, unix_millis: i64) -> Result<bool, ServiceError> {
        let mut conn = self.conn();
        let applied: bool =
            redis::cmd("PEXPIREAT").arg(key).arg(unix_millis).query_async(&mut conn).await?;
        Ok(applied)
    }

    async fn persist(&self, key: &str) -> Result<bool, ServiceError> {
        let mut conn = self.conn();
        let removed: bool = redis::cmd("PERSIST").arg(key).query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> {
        let mut conn = self.conn();
        let keys: Vec<String> = redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await?;
        Ok(keys)
    }
}
