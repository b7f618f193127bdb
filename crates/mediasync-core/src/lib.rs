//! # mediasync-core
//!
//! Revision-aware local caching of images referenced by headless CMS content.
//!
//! Records fetched from a CMS API are arbitrary JSON trees. Any object with a
//! `mime` key is an image descriptor. For each descriptor this crate decides,
//! using a persistent cache keyed by image id, whether the file downloaded on
//! an earlier run can be reused or the image must be fetched again, then
//! writes the local file handle back into the record as `localFile___NODE`.
//!
//! ## Architecture
//!
//! - **Traversal**: depth-first discovery of image descriptors ([`traverse`])
//! - **Resolution**: the per-image cache consistency protocol ([`resolver`])
//! - **Source URLs**: absolute URL construction and CDN transformations ([`source_url`])
//! - **Collaborators**: narrow traits for the cache, downloads, and node
//!   liveness ([`collaborators`]) with default implementations in
//!   [`cache_store`], [`fetcher`] and [`ledger`]
//! - **Configuration**: TOML settings with environment overrides ([`config`])
//! - **Error Handling**: categorized errors with recovery hints ([`error`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use mediasync_core::{
//!     HashIdGenerator, HttpFileMaterializer, JsonFileCache, MediaContext, NodeLedger,
//!     SyncConfig, download_media_files,
//! };
//!
//! # async fn run() -> mediasync_core::Result<()> {
//! let config = SyncConfig::load(None)?;
//! let ledger = Arc::new(NodeLedger::open(config.paths.ledger_file())?);
//! let files = HttpFileMaterializer::with_config(
//!     &config.fetch,
//!     config.paths.files_dir(),
//!     ledger.clone(),
//!     Arc::new(HashIdGenerator::default()),
//! )?;
//!
//! let ctx = MediaContext::from_config(&config)
//!     .cache(Arc::new(JsonFileCache::open(config.paths.cache_file())?))
//!     .files(Arc::new(files))
//!     .liveness(ledger)
//!     .build()?;
//!
//! let mut records = vec![serde_json::json!({
//!     "cover": {"id": 5, "mime": "image/png", "url": "/uploads/a.png", "updatedAt": "2020-01-01"}
//! })];
//! let report = download_media_files(&mut records, &ctx).await?;
//! println!("{} downloaded, {} reused", report.downloaded, report.reused);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`]. A download that produces no
//! file is not an error; the image is simply left without a local file.
//!
//! ```rust,no_run
//! # use mediasync_core::{Error, MediaContext, download_media_files};
//! # async fn run(ctx: &MediaContext, records: &mut [serde_json::Value]) {
//! match download_media_files(records, ctx).await {
//!     Ok(report) => println!("{} images", report.images),
//!     Err(e) if e.is_recoverable() => eprintln!("Retry later: {e}"),
//!     Err(e) => eprintln!("Fatal error: {e}"),
//! }
//! # }
//! ```

/// Default cache store implementations
pub mod cache_store;
/// Collaborator interfaces
pub mod collaborators;
/// Configuration management
pub mod config;
/// Shared sync context
pub mod context;
/// Error types and result aliases
pub mod error;
/// HTTP file materializer
pub mod fetcher;
/// File node registry, liveness, and garbage collection
pub mod ledger;
/// Per-image cache consistency protocol
pub mod resolver;
/// Source URL construction
pub mod source_url;
/// Batch entry point
pub mod sync;
/// Image descriptor discovery
pub mod traverse;
/// Core data types
pub mod types;

// Re-export commonly used types
pub use cache_store::{JsonFileCache, MemoryCache};
pub use collaborators::{
    CacheStore, DownloadRequest, FileMaterializer, LivenessTracker, NodeIdGenerator, NodeRegistry,
};
pub use config::{Auth, ConcurrencyConfig, FetchConfig, PathsConfig, SyncConfig};
pub use context::{MediaContext, MediaContextBuilder};
pub use error::{Error, Result};
pub use fetcher::HttpFileMaterializer;
pub use ledger::{FileNode, HashIdGenerator, NodeLedger};
pub use resolver::{ResolvedImage, resolve_and_attach, resolve_image};
pub use source_url::build_image_url;
pub use sync::{SyncReport, download_media_files};
pub use traverse::{Visit, classify, collect_images, extract_fields};
pub use types::*;
