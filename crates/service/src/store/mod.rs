//! Uniform async adapter over the external key-value store.
//!
//! Values written through [`StoreService`] are JSON-encoded. Reads decode
//! JSON and fall back to a plain string for values written by other clients.

pub mod client;
pub mod memory;
pub mod redis_client;

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use configs::{KeyLookup, StoreBackend, StoreConfig};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::errors::ServiceError;

pub use client::KvClient;
pub use memory::MemoryClient;
pub use redis_client::RedisClient;

/// Store access layer shared by all request handlers.
///
/// Holds one thread-safe client handle; no state of its own, so concurrent
/// requests touching the same key interleave at the store.
#[derive(Clone)]
pub struct StoreService {
    client: Arc<dyn KvClient>,
    lookup: KeyLookup,
}

impl StoreService {
    pub fn new(client: Arc<dyn KvClient>) -> Self {
        Self { client, lookup: KeyLookup::Direct }
    }

    pub fn with_lookup(mut self, lookup: KeyLookup) -> Self {
        self.lookup = lookup;
        self
    }

    /// Convenience for tests and the `memory` backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryClient::new()))
    }

    /// Build the client named by the configuration.
    pub async fn from_config(cfg: &StoreConfig) -> Result<Self, ServiceError> {
        let client: Arc<dyn KvClient> = match cfg.backend {
            StoreBackend::Redis => Arc::new(RedisClient::connect(&cfg.url).await?),
            StoreBackend::Memory => {
                info!("using in-memory store backend; data is not persisted");
                Arc::new(MemoryClient::new())
            }
        };
        Ok(Self::new(client).with_lookup(cfg.key_lookup))
    }

    pub fn lookup(&self) -> KeyLookup {
        self.lookup
    }

    /// Resolve the key a read or swap acts on. `None` means nothing matched
    /// in pattern mode.
    async fn resolve(&self, key: &str) -> Result<Option<String>, ServiceError> {
        match self.lookup {
            KeyLookup::Direct => Ok(Some(key.to_string())),
            KeyLookup::Pattern => {
                let mut matches = self.client.keys(key).await?;
                matches.sort();
                debug!(%key, matched = matches.len(), "pattern lookup");
                Ok(matches.into_iter().next())
            }
        }
    }

    // ---- writes ----

    /// Overwrite the record at `key`; any expiration is cleared.
    pub async fn write<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<bool, ServiceError> {
        let encoded = encode(value)?;
        debug!(%key, bytes = encoded.len(), "write");
        self.client.set(key, encoded).await
    }

    /// Atomically replace the value and return what was there before.
    ///
    /// In pattern mode a key that matches nothing is left untouched and
    /// `None` is returned.
    pub async fn swap<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Result<Option<Value>, ServiceError> {
        let encoded = encode(value)?;
        let Some(target) = self.resolve(key).await? else {
            debug!(%key, "swap skipped, no key matched");
            return Ok(None);
        };
        debug!(%key, %target, "swap");
        let previous = self.client.get_set(&target, encoded).await?;
        Ok(previous.map(decode_raw))
    }

    /// [`swap`](Self::swap) with the previous value decoded as `T`.
    pub async fn swap_typed<T, V>(&self, key: &str, value: &V) -> Result<Option<T>, ServiceError>
    where
        T: DeserializeOwned,
        V: Serialize + ?Sized,
    {
        self.swap(key, value).await?.map(decode_typed).transpose()
    }

    pub async fn delete(&self, key: &str) -> Result<(), ServiceError> {
        let removed = self.client.del(&[key.to_string()]).await?;
        debug!(%key, removed, "delete");
        Ok(())
    }

    /// Remove a batch of keys; missing keys are ignored.
    pub async fn delete_many<S: AsRef<str>>(&self, keys: &[S]) -> Result<(), ServiceError> {
        if keys.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let removed = self.client.del(&keys).await?;
        debug!(requested = keys.len(), removed, "delete batch");
        Ok(())
    }

    // ---- reads ----

    pub async fn read(&self, key: &str) -> Result<Option<Value>, ServiceError> {
        let Some(target) = self.resolve(key).await? else {
            return Ok(None);
        };
        let raw = self.client.get(&target).await?;
        debug!(%key, found = raw.is_some(), "read");
        Ok(raw.map(decode_raw))
    }

    /// Read and decode into `T`; an incompatible stored shape is a
    /// [`ServiceError::Decode`].
    pub async fn read_typed<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ServiceError> {
        self.read(key).await?.map(decode_typed).transpose()
    }

    pub async fn has_key(&self, key: &str) -> Result<bool, ServiceError> {
        self.client.exists(key).await
    }

    /// Stored byte length; zero when the key is absent.
    pub async fn value_size(&self, key: &str) -> Result<i64, ServiceError> {
        self.client.strlen(key).await
    }

    // ---- counters ----

    /// Add `delta` (may be negative); an absent key starts at zero.
    pub async fn increment(&self, key: &str, delta: i64) -> Result<i64, ServiceError> {
        let value = self.client.incr_by(key, delta).await?;
        debug!(%key, delta, value, "increment");
        Ok(value)
    }

    pub async fn increment_one(&self, key: &str) -> Result<i64, ServiceError> {
        self.increment(key, 1).await
    }

    /// Same as `increment(key, -delta)`.
    pub async fn decrement(&self, key: &str, delta: i64) -> Result<i64, ServiceError> {
        let negated = delta
            .checked_neg()
            .ok_or_else(|| ServiceError::Validation(format!("cannot decrement by {delta}")))?;
        self.increment(key, negated).await
    }

    pub async fn decrement_one(&self, key: &str) -> Result<i64, ServiceError> {
        self.decrement(key, 1).await
    }

    // ---- expiry ----

    /// Remaining lifetime. `None` covers both "no expiration" and "no such
    /// key"; combine with [`has_key`](Self::has_key) to tell them apart.
    pub async fn time_to_live(&self, key: &str) -> Result<Option<Duration>, ServiceError> {
        let millis = self.client.pttl(key).await?;
        Ok(u64::try_from(millis).ok().map(Duration::from_millis))
    }

    pub async fn set_time_to_live(&self, key: &str, ttl: Duration) -> Result<bool, ServiceError> {
        let millis = i64::try_from(ttl.as_millis())
            .map_err(|_| ServiceError::Validation(format!("ttl too large: {ttl:?}")))?;
        self.client.pexpire(key, millis).await
    }

    /// Expire at an absolute instant; an instant in the past removes the key.
    pub async fn set_expiration_at(&self, key: &str, at: DateTime<Utc>) -> Result<bool, ServiceError> {
        self.client.pexpire_at(key, at.timestamp_millis()).await
    }

    /// Make the key persistent again.
    pub async fn remove_time_to_live(&self, key: &str) -> Result<bool, ServiceError> {
        self.client.persist(key).await
    }
}

fn encode<V: Serialize + ?Sized>(value: &V) -> Result<String, ServiceError> {
    serde_json::to_string(value).map_err(|e| ServiceError::Encode(e.to_string()))
}

fn decode_raw(raw: String) -> Value {
    match serde_json::from_str::<Value>(&raw) {
        Ok(v) => v,
        Err(_) => Value::String(raw),
    }
}

fn decode_typed<T: DeserializeOwned>(value: Value) -> Result<T, ServiceError> {
    serde_json::from_value(value).map_err(|e| ServiceError::Decode(e.to_string()))
}
