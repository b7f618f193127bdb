//! Narrow interfaces to the services a sync depends on.
//!
//! The resolver only talks to [`CacheStore`], [`FileMaterializer`] and
//! [`LivenessTracker`]. [`NodeRegistry`] and [`NodeIdGenerator`] are consumed
//! by materializers, never by the resolver directly. Default implementations
//! live in [`crate::cache_store`], [`crate::fetcher`] and [`crate::ledger`].

use async_trait::async_trait;

use crate::config::Auth;
use crate::ledger::FileNode;
use crate::types::{CacheRecord, FileHandle};
use crate::Result;

/// Persistent key-value store for cache records.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a record; `None` when the key was never written.
    async fn get(&self, key: &str) -> Result<Option<CacheRecord>>;

    /// Write a record, replacing any previous one.
    async fn set(&self, key: &str, record: CacheRecord) -> Result<()>;
}

/// Everything a materializer needs to download and register one image.
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    /// Fully-qualified source URL.
    pub url: &'a str,
    /// File extension including the dot, if the descriptor had one.
    pub extension: Option<&'a str>,
    /// Display name, if the descriptor had one.
    pub name: Option<&'a str>,
    /// Credentials to present to the origin.
    pub auth: &'a Auth,
}

/// Downloads a remote file and registers it as a file node.
#[async_trait]
pub trait FileMaterializer: Send + Sync {
    /// Download `request.url` and return the new node's handle.
    ///
    /// `Ok(None)` means the origin answered but produced no usable file
    /// (e.g. a 404); the image is skipped. Transport failures are errors.
    async fn download(&self, request: DownloadRequest<'_>) -> Result<Option<FileHandle>>;
}

/// Marks file nodes as still referenced so they survive garbage collection.
#[async_trait]
pub trait LivenessTracker: Send + Sync {
    /// Mark `handle` as used by the current run.
    async fn touch(&self, handle: &FileHandle) -> Result<()>;
}

/// Stores file nodes created by a materializer.
#[async_trait]
pub trait NodeRegistry: Send + Sync {
    /// Register (or replace) a node.
    async fn create_node(&self, node: FileNode) -> Result<()>;
}

/// Mints file node handles.
pub trait NodeIdGenerator: Send + Sync {
    /// Derive a handle from `seed`; equal seeds yield equal handles.
    fn create_node_id(&self, seed: &str) -> FileHandle;
}
