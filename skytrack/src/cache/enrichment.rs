//! In-memory TTL cache backed by a persistent store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{CacheError, CacheStore};

/// Default time-to-live for enrichment entries.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// One cached value. The cache key is the key of the enclosing map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: serde_json::Value,
    /// Unix milliseconds at which the entry was written.
    pub timestamp: i64,
    pub ttl_ms: u64,
}

impl CacheEntry {
    /// Valid iff `now - timestamp < ttl`.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        let age = now_ms.saturating_sub(self.timestamp);
        // Entries stamped in the future (clock moved back) count as fresh.
        age < 0 || (age as u64) < self.ttl_ms
    }
}

/// TTL cache for enrichment payloads, persisted after every write.
pub struct EnrichmentCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
    /// Serializes persistence so the last save always reflects the last write.
    persist_lock: tokio::sync::Mutex<()>,
}

impl EnrichmentCache {
    /// Loads the store once and returns a ready cache.
    ///
    /// A corrupt store is logged and replaced by an empty cache. I/O errors
    /// other than a missing file are returned.
    pub async fn open(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Result<Self, CacheError> {
        let entries = match store.load().await {
            Ok(entries) => {
                tracing::info!(entries = entries.len(), "Loaded enrichment cache");
                entries
            }
            Err(CacheError::Corrupt { path, reason }) => {
                tracing::warn!(
                    path = %path.display(),
                    reason = %reason,
                    "Enrichment cache is corrupt, starting empty"
                );
                HashMap::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            entries: RwLock::new(entries),
            store,
            default_ttl,
            persist_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the payload for `key`, or `None` when absent or expired.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.get_at(key, now_ms())
    }

    /// Like [`get`](Self::get) at an explicit wall-clock time.
    pub fn get_at(&self, key: &str, now_ms: i64) -> Option<serde_json::Value> {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if entry.is_valid_at(now_ms) => Some(entry.payload.clone()),
            Some(_) => {
                tracing::trace!(key, "Enrichment cache entry expired");
                None
            }
            None => {
                tracing::trace!(key, "Enrichment cache miss");
                None
            }
        }
    }

    /// Decodes the payload for `key` into `T`. Undecodable payloads read as misses.
    pub fn get_typed<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let payload = self.get(key)?;
        match serde_json::from_value(payload) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(key, error = %e, "Cached payload does not match requested type");
                None
            }
        }
    }

    /// Stores `payload` under `key` with the default TTL and persists.
    pub async fn put(&self, key: &str, payload: serde_json::Value) -> Result<(), CacheError> {
        self.put_at(key, payload, self.default_ttl, now_ms()).await
    }

    /// Stores `payload` with a specific TTL and persists.
    pub async fn put_with_ttl(
        &self,
        key: &str,
        payload: serde_json::Value,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.put_at(key, payload, ttl, now_ms()).await
    }

    /// Encodes `value` and stores it with the default TTL.
    pub async fn put_typed<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let payload = serde_json::to_value(value)?;
        self.put(key, payload).await
    }

    /// Stores an entry stamped at `now_ms` and persists the full map.
    ///
    /// The in-memory entry is kept even when persisting fails.
    pub async fn put_at(
        &self,
        key: &str,
        payload: serde_json::Value,
        ttl: Duration,
        now_ms: i64,
    ) -> Result<(), CacheError> {
        let _persist = self.persist_lock.lock().await;

        let snapshot = {
            let mut entries = self.entries.write();
            entries.insert(
                key.to_string(),
                CacheEntry {
                    payload,
                    timestamp: now_ms,
                    ttl_ms: ttl.as_millis().min(u64::MAX as u128) as u64,
                },
            );
            entries.clone()
        };

        if let Err(e) = self.store.save(&snapshot).await {
            tracing::warn!(key, error = %e, "Failed to persist enrichment cache");
            return Err(e);
        }
        Ok(())
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
