//! File node bookkeeping: registration, liveness, and garbage collection.
//!
//! [`NodeLedger`] records every file node a materializer creates and which
//! nodes were created or touched during the current run. Nodes that were
//! neither are stale and can be removed with [`NodeLedger::sweep`].
//!
//! ## Storage Layout
//!
//! ```text
//! <root>/
//!   nodes.json     # FileNode records keyed by handle
//!   files/...      # downloaded files referenced by FileNode::path
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::collaborators::{LivenessTracker, NodeIdGenerator, NodeRegistry};
use crate::types::FileHandle;
use crate::{Error, Result};

/// A materialized local file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    /// Handle minted for this node.
    pub id: FileHandle,
    /// URL the file was downloaded from.
    pub url: String,
    /// Location of the file on disk.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Base64 SHA-256 of the file contents.
    pub digest: String,
    /// Extension including the dot.
    pub extension: Option<String>,
    /// Display name from the descriptor.
    pub name: Option<String>,
    /// When the file was downloaded.
    pub created_at: DateTime<Utc>,
    /// Last run that created or touched the node.
    pub touched_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct LedgerState {
    nodes: BTreeMap<FileHandle, FileNode>,
    live: HashSet<FileHandle>,
}

/// Node registry and liveness tracker in one.
///
/// Persists to a JSON file when opened with [`NodeLedger::open`]; the
/// in-memory variant keeps nothing across runs.
#[derive(Debug)]
pub struct NodeLedger {
    path: Option<PathBuf>,
    state: Mutex<LedgerState>,
}

impl NodeLedger {
    /// Ledger that lives only as long as the process.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Open (or start) a ledger persisted at `path`.
    ///
    /// Nodes loaded from disk start out not live.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let nodes = if path.exists() {
            let json = fs::read_to_string(&path)
                .map_err(|e| Error::Storage(format!("Failed to read node ledger: {e}")))?;
            serde_json::from_str(&json)
                .map_err(|e| Error::Serialization(format!("Failed to parse node ledger: {e}")))?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: Some(path),
            state: Mutex::new(LedgerState {
                nodes,
                live: HashSet::new(),
            }),
        })
    }

    /// Look up a node by handle.
    pub async fn get(&self, id: &FileHandle) -> Option<FileNode> {
        self.state.lock().await.nodes.get(id).cloned()
    }

    /// Every known node, ordered by handle.
    pub async fn nodes(&self) -> Vec<FileNode> {
        self.state.lock().await.nodes.values().cloned().collect()
    }

    /// Whether `id` was created or touched during this run.
    pub async fn is_live(&self, id: &FileHandle) -> bool {
        self.state.lock().await.live.contains(id)
    }

    /// Remove every node not created or touched during this run, deleting
    /// its file. Returns the removed nodes.
    pub async fn sweep(&self) -> Result<Vec<FileNode>> {
        let mut state = self.state.lock().await;
        let stale: Vec<FileHandle> = state
            .nodes
            .keys()
            .filter(|id| !state.live.contains(*id))
            .cloned()
            .collect();

        let mut removed = Vec::with_capacity(stale.len());
        for id in stale {
            if let Some(node) = state.nodes.remove(&id) {
                remove_file(&node.path).await?;
                removed.push(node);
            }
        }

        if !removed.is_empty() {
            info!(removed = removed.len(), "swept stale file nodes");
        }
        self.persist(&state.nodes).await?;
        Ok(removed)
    }

    /// Persist touch timestamps recorded since the ledger was opened.
    pub async fn flush(&self) -> Result<()> {
        let state = self.state.lock().await;
        self.persist(&state.nodes).await
    }

    async fn persist(&self, nodes: &BTreeMap<FileHandle, FileNode>) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Storage(format!("Failed to create ledger directory: {e}")))?;
        }

        let json = serde_json::to_string_pretty(nodes)
            .map_err(|e| Error::Storage(format!("Failed to serialize node ledger: {e}")))?;
        let tmp_path = path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json)
            .await
            .map_err(|e| Error::Storage(format!("Failed to write temp ledger file: {e}")))?;

        #[cfg(target_os = "windows")]
        if path.exists() {
            tokio::fs::remove_file(path)
                .await
                .map_err(|e| Error::Storage(format!("Failed to remove existing ledger: {e}")))?;
        }

        tokio::fs::rename(&tmp_path, path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to commit node ledger: {e}")))
    }
}

async fn remove_file(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::Io(e)),
    }
}

#[async_trait]
impl NodeRegistry for NodeLedger {
    async fn create_node(&self, node: FileNode) -> Result<()> {
        let mut state = self.state.lock().await;
        debug!(id = %node.id, path = %node.path.display(), "registering file node");
        state.live.insert(node.id.clone());
        let id = node.id.clone();
        let new_path = node.path.clone();
        if let Some(previous) = state.nodes.insert(id, node)
            && previous.path != new_path
        {
            debug!(path = %previous.path.display(), "removing replaced file");
            remove_file(&previous.path).await?;
        }
        self.persist(&state.nodes).await
    }
}

/// Touches only update memory; [`NodeLedger::flush`] or
/// [`NodeLedger::sweep`] writes them out.
#[async_trait]
impl LivenessTracker for NodeLedger {
    async fn touch(&self, handle: &FileHandle) -> Result<()> {
        let mut state = self.state.lock().await;
        state.live.insert(handle.clone());
        match state.nodes.get_mut(handle) {
            Some(node) => node.touched_at = Utc::now(),
            None => warn!(%handle, "touched a file node the ledger does not know"),
        }
        Ok(())
    }
}

/// Deterministic, namespaced handle generator.
///
/// Handles are `file-` followed by 24 hex characters of
/// `SHA-256(namespace || seed)`, so re-downloading the same URL reuses the
/// same handle.
#[derive(Debug, Clone)]
pub struct HashIdGenerator {
    namespace: String,
}

impl HashIdGenerator {
    /// Generator scoped to `namespace`.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }
}

impl Default for HashIdGenerator {
    fn default() -> Self {
        Self::new("mediasync")
    }
}

impl NodeIdGenerator for HashIdGenerator {
    fn create_node_id(&self, seed: &str) -> FileHandle {
        let mut hasher = Sha256::new();
        hasher.update(self.namespace.as_bytes());
        hasher.update([0]);
        hasher.update(seed.as_bytes());
        let hex = hasher.finalize().iter().take(12).fold(String::new(), |mut acc, b| {
            // write! to String is infallible
            let _ = write!(acc, "{b:02x}");
            acc
        });
        FileHandle::new(format!("file-{hex}"))
    }
}
