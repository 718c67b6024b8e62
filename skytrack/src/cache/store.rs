//! Backing stores for the enrichment cache.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use thiserror::Error;

use super::CacheEntry;

/// Errors from cache persistence.
#[derive(Debug, Error)]
pub enum CacheError {
    /// I/O error reading or writing the store.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The persisted document could not be parsed.
    #[error("corrupt cache store {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// An entry could not be encoded.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Durable storage for the full cache map.
///
/// Dyn-compatible so the cache can hold any backend as `Arc<dyn CacheStore>`.
pub trait CacheStore: Send + Sync {
    /// Loads every persisted entry. A store that does not exist yet is empty.
    fn load(&self) -> BoxFuture<'_, Result<HashMap<String, CacheEntry>, CacheError>>;

    /// Replaces the persisted contents with `entries`.
    fn save<'a>(
        &'a self,
        entries: &'a HashMap<String, CacheEntry>,
    ) -> BoxFuture<'a, Result<(), CacheError>>;
}

/// Single JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CacheStore for JsonFileStore {
    fn load(&self) -> BoxFuture<'_, Result<HashMap<String, CacheEntry>, CacheError>> {
        Box::pin(async move {
            let bytes = match tokio::fs::read(&self.path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
                Err(e) => return Err(e.into()),
            };

            serde_json::from_slice(&bytes).map_err(|e| CacheError::Corrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            })
        })
    }

    fn save<'a>(
        &'a self,
        entries: &'a HashMap<String, CacheEntry>,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            // Sorted keys keep the document stable between writes.
            let ordered: BTreeMap<&String, &CacheEntry> = entries.iter().collect();
            let bytes = serde_json::to_vec_pretty(&ordered)?;

            if let Some(parent) = self.path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }

            // Write to temp file first, then rename for atomicity
            let temp_path = self.temp_path();
            tokio::fs::write(&temp_path, &bytes).await?;
            tokio::fs::rename(&temp_path, &self.path).await?;

            tracing::trace!(path = %self.path.display(), entries = entries.len(), "Persisted cache");
            Ok(())
        })
    }
}

/// Volatile store for tests and for running without a cache file.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: Mutex<HashMap<String, CacheEntry>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    pub fn with_entries(entries: HashMap<String, CacheEntry>) -> Self {
        Self {
            contents: Mutex::new(entries),
            saves: Mutex::new(0),
        }
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        *self.saves.lock()
    }

    /// Copy of the last saved contents.
    pub fn contents(&self) -> HashMap<String, CacheEntry> {
        self.contents.lock().clone()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self) -> BoxFuture<'_, Result<HashMap<String, CacheEntry>, CacheError>> {
        Box::pin(async move { Ok(self.contents.lock().clone()) })
    }

    fn save<'a>(
        &'a self,
        entries: &'a HashMap<String, CacheEntry>,
    ) -> BoxFuture<'a, Result<(), CacheError>> {
        Box::pin(async move {
            *self.contents.lock() = entries.clone();
            *self.saves.lock() += 1;
            Ok(())
        })
    }
}
