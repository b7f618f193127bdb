//! Cache store implementations.
//!
//! [`JsonFileCache`] persists records across runs in a single JSON object
//! keyed by cache key:
//!
//! ```json
//! {
//!   "strapi-media-5": { "fileNodeID": "file-123", "updatedAt": "2020-01-01" }
//! }
//! ```
//!
//! [`MemoryCache`] keeps records for the lifetime of the process.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::collaborators::CacheStore;
use crate::types::CacheRecord;
use crate::{Error, Result};

/// In-process cache store.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheRecord>>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether no record is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheRecord>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, record: CacheRecord) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), record);
        Ok(())
    }
}

/// Cache store backed by a JSON file.
///
/// The file is read once on [`JsonFileCache::open`] and rewritten atomically
/// (temp file + rename) on every write.
///
/// ## Thread Safety
///
/// Safe to share across tasks. Not safe across processes writing the same
/// file concurrently.
#[derive(Debug)]
pub struct JsonFileCache {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, CacheRecord>>,
}

impl JsonFileCache {
    /// Open (or start) the cache file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let json = fs::read_to_string(&path)
                .map_err(|e| Error::Storage(format!("Failed to read cache file: {e}")))?;
            if json.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&json)
                    .map_err(|e| Error::Serialization(format!("Failed to parse cache file: {e}")))?
            }
        } else {
            BTreeMap::new()
        };

        debug!(path = %path.display(), entries = entries.len(), "opened media cache");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every stored record.
    pub async fn entries(&self) -> BTreeMap<String, CacheRecord> {
        self.entries.lock().await.clone()
    }

    /// Drop every record and persist the empty cache. Returns how many were removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let removed = entries.len();
        entries.clear();
        self.persist(&entries).await?;
        Ok(removed)
    }

    async fn persist(&self, entries: &BTreeMap<String, CacheRecord>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("Failed to create cache directory: {e}")))?;
        }

        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| Error::Storage(format!("Failed to serialize cache: {e}")))?;

        // Atomic write: temp file + rename
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write temp cache file: {e}")))?;

        #[cfg(target_os = "windows")]
        if self.path.exists() {
            tokio::fs::remove_file(&self.path)
                .await
                .map_err(|e| Error::Storage(format!("Failed to remove existing cache: {e}")))?;
        }

        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to commit cache file: {e}")))
    }
}

#[async_trait]
impl CacheStore for JsonFileCache {
    async fn get(&self, key: &str) -> Result<Option<CacheRecord>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, record: CacheRecord) -> Result<()> {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), record);
        self.persist(&entries).await?;
        debug!(key, "stored media cache record");
        Ok(())
    }
}
