//! Entry point: resolve the images of many records at once.

use std::collections::BTreeMap;

use futures::{StreamExt, stream};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info};

use crate::context::MediaContext;
use crate::resolver::ResolvedImage;
use crate::traverse::extract_fields;
use crate::types::{FileHandle, Resolution};
use crate::Result;

/// Summary of a sync run.
///
/// `handles` mirrors what was written into the records, keyed by cache key,
/// for callers that prefer a side table over reading the mutated records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Records traversed.
    pub records: usize,
    /// Image descriptors found.
    pub images: usize,
    /// Images served from a valid cache record.
    pub reused: usize,
    /// Images downloaded.
    pub downloaded: usize,
    /// Images for which no file was produced.
    pub unavailable: usize,
    /// Attached handle per cache key.
    pub handles: BTreeMap<String, FileHandle>,
}

impl SyncReport {
    pub(crate) fn record_image(&mut self, image: ResolvedImage) {
        self.images += 1;
        match &image.resolution {
            Resolution::Reused(_) => self.reused += 1,
            Resolution::Downloaded(_) => self.downloaded += 1,
            Resolution::Unavailable => self.unavailable += 1,
        }
        if let (Some(key), Some(handle)) = (image.cache_key, image.resolution.handle()) {
            self.handles.insert(key, handle.clone());
        }
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.records += other.records;
        self.images += other.images;
        self.reused += other.reused;
        self.downloaded += other.downloaded;
        self.unavailable += other.unavailable;
        self.handles.extend(other.handles);
    }
}

/// Download (or reuse) every image referenced by `entities`.
///
/// Records are traversed concurrently, up to `concurrency.records` at a time,
/// and mutated in place: each resolved image descriptor gains a
/// `localFile___NODE` field. Every record runs to completion; if any failed,
/// the first failure in record order is returned once all are done.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use mediasync_core::{MediaContext, MemoryCache, NodeLedger, download_media_files};
/// # use mediasync_core::{FileMaterializer, DownloadRequest, FileHandle, Result};
/// # struct Files;
/// # #[async_trait::async_trait]
/// # impl FileMaterializer for Files {
/// #     async fn download(&self, _: DownloadRequest<'_>) -> Result<Option<FileHandle>> { Ok(None) }
/// # }
///
/// # async fn run() -> Result<()> {
/// let ledger = Arc::new(NodeLedger::in_memory());
/// let ctx = MediaContext::builder("http://localhost:1337")
///     .cache(Arc::new(MemoryCache::new()))
///     .files(Arc::new(Files))
///     .liveness(ledger)
///     .build()?;
///
/// let mut entities = vec![serde_json::json!({
///     "cover": {"id": 5, "mime": "image/png", "url": "/uploads/a.png"}
/// })];
/// let report = download_media_files(&mut entities, &ctx).await?;
/// println!("{} images, {} downloaded", report.images, report.downloaded);
/// # Ok(())
/// # }
/// ```
pub async fn download_media_files(entities: &mut [Value], ctx: &MediaContext) -> Result<SyncReport> {
    let results: Vec<Result<SyncReport>> = stream::iter(entities.iter_mut())
        .map(|entity| extract_fields(entity, ctx))
        .buffered(ctx.concurrency().records)
        .collect()
        .await;

    let mut report = SyncReport::default();
    let mut first_error = None;
    let mut failed = 0usize;

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(record) => report.merge(record),
            Err(err) => {
                error!(record = index, category = err.category(), "media sync failed: {err}");
                failed += 1;
                first_error.get_or_insert(err);
            },
        }
    }

    if let Some(err) = first_error {
        error!(failed, total = entities.len(), "media sync finished with failures");
        return Err(err);
    }

    info!(
        records = report.records,
        images = report.images,
        reused = report.reused,
        downloaded = report.downloaded,
        unavailable = report.unavailable,
        "media sync complete"
    );
    Ok(report)
}
