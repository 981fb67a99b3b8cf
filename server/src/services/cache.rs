//! In-process key/value cache with per-entry TTL.
//!
//! Backs the webhook replay guard, the channel-update batch accumulator,
//! the app access token and the Helix read-through caches. Every operation
//! takes the store mutex once, so `add`, `pull` and `append` are atomic
//! with respect to each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::time::Instant;

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: Value, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Clone, Default)]
pub struct CacheStore {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Live entry for `key`, evicting it first when it has expired.
    fn live<'a>(
        entries: &'a mut HashMap<String, CacheEntry>,
        key: &str,
        now: Instant,
    ) -> Option<&'a mut CacheEntry> {
        if entries.get(key).is_some_and(|e| !e.is_live(now)) {
            entries.remove(key);
        }
        entries.get_mut(key)
    }

    /// Insert only when no live entry exists. Returns whether the value was stored.
    pub fn add(&self, key: &str, value: Value, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut entries = self.lock();
        if Self::live(&mut entries, key, now).is_some() {
            return false;
        }
        entries.insert(key.to_string(), CacheEntry::new(value, ttl));
        true
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.lock();
        Self::live(&mut entries, key, now).map(|e| e.value.clone())
    }

    /// Typed read. A value that does not deserialize into `T` reads as a miss.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::debug!(key, "Cached value has unexpected shape: {e}");
                None
            }
        }
    }

    pub fn put(&self, key: &str, value: Value, ttl: Duration) {
        self.lock()
            .insert(key.to_string(), CacheEntry::new(value, ttl));
    }

    /// Read and remove in one step.
    pub fn pull(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        let mut entries = self.lock();
        let entry = entries.remove(key)?;
        entry.is_live(now).then_some(entry.value)
    }

    /// Append `value` to the JSON array stored at `key` and refresh its TTL.
    ///
    /// A missing or expired entry starts a new array; a non-array value is
    /// replaced. Returns the array length after the append.
    pub fn append(&self, key: &str, value: Value, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let mut items = match Self::live(&mut entries, key, now) {
            Some(entry) => match entry.value.take() {
                Value::Array(items) => items,
                _ => Vec::new(),
            },
            None => Vec::new(),
        };
        items.push(value);
        let len = items.len();
        entries.insert(key.to_string(), CacheEntry::new(Value::Array(items), ttl));
        len
    }

    /// Time left before `key` expires.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let mut entries = self.lock();
        Self::live(&mut entries, key, now).map(|e| e.expires_at - now)
    }

    /// Return the cached value or run `fetch` and cache its result.
    ///
    /// Fetch errors are returned and nothing is cached. Concurrent misses may
    /// fetch more than once.
    pub async fn remember<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get_as::<T>(key) {
            return Ok(hit);
        }
        tracing::debug!(key, "Cache miss");
        let fresh = fetch().await?;
        match serde_json::to_value(&fresh) {
            Ok(value) => self.put(key, value, ttl),
            Err(e) => tracing::warn!(key, "Value not cacheable: {e}"),
        }
        Ok(fresh)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
