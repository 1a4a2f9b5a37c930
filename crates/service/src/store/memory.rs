use std::{
    collections::HashMap,
    sync::{Arc, Weak},
    time::{Duration, Instant, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::client::{KvClient, PTTL_NO_EXPIRY, PTTL_NO_KEY};
use crate::errors::ServiceError;

const ERR_NOT_INTEGER: &str = "ERR value is not an integer or out of range";
const ERR_OVERFLOW: &str = "ERR increment or decrement would overflow";

/// A stored value with its optional expiration time.
#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: String) -> Self {
        Self { value, expires_at: None }
    }

    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// How often the background task drops expired entries.
const SWEEP_INTERVAL: Duration = Duration::from_secs(30);

type Map = HashMap<String, Entry>;

/// In-process [`KvClient`] mirroring the Redis semantics the access layer
/// relies on. Each command runs under a single write or read lock, which
/// gives `INCRBY` and `GETSET` the same atomicity Redis provides.
///
/// Reads skip expired entries. They are removed from the map by a
/// periodic sweep, or earlier when a write touches the same key. The sweep
/// task ends once the last clone is dropped.
#[derive(Clone)]
pub struct MemoryClient {
    inner: Arc<RwLock<Map>>,
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::with_sweep_interval(SWEEP_INTERVAL)
    }

    /// Outside a tokio runtime no sweeper is started and expired entries
    /// are only dropped by writes.
    pub fn with_sweep_interval(every: Duration) -> Self {
        let inner = Arc::new(RwLock::new(Map::new()));
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(sweep_task(Arc::downgrade(&inner), every));
            }
            Err(_) => debug!("no tokio runtime; memory store sweeper not started"),
        }
        Self { inner }
    }

    /// Number of live entries.
    #[cfg(test)]
    async fn len(&self) -> usize {
        let now = Instant::now();
        let map = self.inner.read().await;
        map.values().filter(|e| !e.is_expired(now)).count()
    }

    /// Entries held in the map, expired or not.
    #[cfg(test)]
    async fn raw_len(&self) -> usize {
        self.inner.read().await.len()
    }
}

async fn sweep_task(map: Weak<RwLock<Map>>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let Some(shared) = map.upgrade() else { break };
        let removed = purge_expired(&mut *shared.write().await, Instant::now());
        if removed > 0 {
            debug!(removed, "swept expired entries");
        }
    }
}

fn purge_expired(map: &mut Map, now: Instant) -> usize {
    let before = map.len();
    map.retain(|_, e| !e.is_expired(now));
    before - map.len()
}

fn live<'a>(map: &'a Map, key: &str, now: Instant) -> Option<&'a Entry> {
    map.get(key).filter(|e| !e.is_expired(now))
}

fn live_mut<'a>(map: &'a mut Map, key: &str, now: Instant) -> Option<&'a mut Entry> {
    if map.get(key).is_some_and(|e| e.is_expired(now)) {
        map.remove(key);
    }
    map.get_mut(key)
}

fn unix_millis_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Redis-style glob match over bytes: `*`, `?`, `[abc]`, `[^a-z]`, `\x`.
///
/// Iterative: on a mismatch only the most recent `*` is widened, so the
/// cost stays within `pattern.len() * text.len()` steps.
pub(crate) fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // pattern index after the last `*` and the text index it resumes from
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        if pattern.get(p) == Some(&b'*') {
            p += 1;
            star = Some((p, t));
        } else if let Some(next) = match_token(pattern, p, text[t]) {
            p = next;
            t += 1;
        } else if let Some((after_star, from)) = star {
            p = after_star;
            t = from + 1;
            star = Some((after_star, t));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&b| b == b'*')
}

/// Match one text byte against the token at `pattern[p]`; returns the
/// pattern index after the token.
fn match_token(pattern: &[u8], p: usize, c: u8) -> Option<usize> {
    match pattern[p..].split_first()? {
        (&b'*', _) => None,
        (&b'?', _) => Some(p + 1),
        (&b'[', body) => match match_class(body, c) {
            Some((matched, after)) => matched.then(|| pattern.len() - after.len()),
            // unterminated class: treat '[' literally
            None => (c == b'[').then_some(p + 1),
        },
        (&b'\\', tail) if !tail.is_empty() => (tail[0] == c).then_some(p + 2),
        (&lit, _) => (lit == c).then_some(p + 1),
    }
}

/// Match `c` against a `[...]` class body; returns the verdict and the
/// pattern remainder after `]`.
fn match_class(body: &[u8], c: u8) -> Option<(bool, &[u8])> {
    let (negate, mut i) = match body.first() {
        Some(b'^') => (true, 1),
        _ => (false, 0),
    };
    let mut matched = false;
    while i < body.len() {
        match body[i] {
            b']' => return Some((matched != negate, &body[i + 1..])),
            b'\\' if i + 1 < body.len() => {
                matched |= body[i + 1] == c;
                i += 2;
            }
            lo if i + 2 < body.len() && body[i + 1] == b'-' && body[i + 2] != b']' => {
                let hi = body[i + 2];
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                matched |= (lo..=hi).contains(&c);
                i += 3;
            }
            other => {
                matched |= other == c;
                i += 1;
            }
        }
    }
    None
}

#[async_trait]
impl KvClient for MemoryClient {
    async fn get(&self, key: &str) -> Result<Option<String>, ServiceError> {
        let map = self.inner.read().await;
        Ok(live(&map, key, Instant::now()).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String) -> Result<bool, ServiceError> {
        let mut map = self.inner.write().await;
        map.insert(key.to_string(), Entry::new(value));
        Ok(true)
    }

    async fn get_set(&self, key: &str, value: String) -> Result<Option<String>, ServiceError> {
        let now = Instant::now();
        let mut map = self.inner.write().await;
        let previous = map
            .insert(key.to_string(), Entry::new(value))
            .filter(|e| !e.is_expired(now))
            .map(|e| e.value);
        Ok(previous)
    }

    async fn del(&self, keys: &[String]) -> Result<u64, ServiceError> {
        let now = Instant::now();
        let mut map = self.inner.write().await;
        let removed = keys
            .iter()
            .filter(|k| map.remove(k.as_str()).is_some_and(|e| !e.is_expired(now)))
            .count();
        Ok(removed as u64)
    }

    async fn incr_by(&self, key: &str, delta: i64) -> Result<i64, ServiceError> {
        let now = Instant::now();
        let mut map = self.inner.write().await;
        match live_mut(&mut map, key, now) {
            Some(entry) => {
                let current: i64 = entry
                    .value
                    .parse()
                    .map_err(|_| ServiceError::store(ERR_NOT_INTEGER))?;
                let next = current
                    .checked_add(delta)
                    .ok_or_else(|| ServiceError::store(ERR_OVERFLOW))?;
                // INCRBY keeps the existing expiration
                entry.value = next.to_string();
                Ok(next)
            }
            None => {
                map.insert(key.to_string(), Entry::new(delta.to_string()));
                Ok(delta)
            }
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, ServiceError> {
        let map = self.inner.read().await;
        Ok(live(&map, key, Instant::now()).is_some())
    }

    async fn strlen(&self, key: &str) -> Result<i64, ServiceError> {
        let map = self.inner.read().await;
        Ok(live(&map, key, Instant::now()).map_or(0, |e| e.value.len() as i64))
    }

    async fn pttl(&self, key: &str) -> Result<i64, ServiceError> {
        let now = Instant::now();
        let map = self.inner.read().await;
        let ttl = match live(&map, key, now) {
            None => PTTL_NO_KEY,
            Some(Entry { expires_at: None, .. }) => PTTL_NO_EXPIRY,
            Some(Entry { expires_at: Some(at), .. }) => {
                at.saturating_duration_since(now).as_millis() as i64
            }
        };
        Ok(ttl)
    }

    async fn pexpire(&self, key: &str, millis: i64) -> Result<bool, ServiceError> {
        let now = Instant::now();
        let mut map = self.inner.write().await;
        if live_mut(&mut map, key, now).is_none() {
            return Ok(false);
        }
        if millis <= 0 {
            map.remove(key);
            return Ok(true);
        }
        if let Some(entry) = map.get_mut(key) {
            entry.expires_at = Some(now + Duration::from_millis(millis as u64));
        }
        Ok(true)
    }

    async fn pexpire_at(&self, key: &str, unix_millis: i64) -> Result<bool, ServiceError> {
        let remaining = unix_millis.saturating_sub(unix_millis_now());
        self.pexpire(key, remaining).await
    }

    async fn persist(&self, key: &str) -> Result<bool, ServiceError> {
        let now = Instant::now();
        let mut map = self.inner.write().await;
        Ok(live_mut(&mut map, key, now).is_some_and(|e| e.expires_at.take().is_some()))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, ServiceError> {
        let now = Instant::now();
        let map = self.inner.read().await;
        let keys = map
            .iter()
            .filter(|(k, e)| !e.is_expired(now) && glob_match(pattern.as_bytes(), k.as_bytes()))
            .map(|(k, _)| k.clone())
            .collect();
        Ok(keys)
    }
}
