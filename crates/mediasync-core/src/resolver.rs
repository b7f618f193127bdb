//! Per-image cache consistency protocol.
//!
//! For each image descriptor the resolver decides between reusing the file
//! node recorded in the cache and downloading the image again:
//!
//! 1. Look up `strapi-media-<id>` in the cache store.
//! 2. Reuse when the stored revision marker equals the descriptor's current
//!    marker, touching the node so it survives garbage collection.
//! 3. Otherwise download through the file materializer and, when a file was
//!    produced, overwrite the cache record.
//!
//! A materializer that produces no file is not an error: the descriptor just
//! ends up without a local file.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::collaborators::DownloadRequest;
use crate::context::MediaContext;
use crate::source_url::build_image_url;
use crate::types::{CacheRecord, ImageDescriptor, LOCAL_FILE_FIELD, Resolution};
use crate::Result;

/// Result of resolving one descriptor in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Cache key the image was resolved under, if it had an id.
    pub cache_key: Option<String>,
    /// What the resolver did.
    pub resolution: Resolution,
}

/// Resolve one image descriptor against the cache.
///
/// Does not touch the descriptor; see [`resolve_and_attach`].
pub async fn resolve_image(image: &ImageDescriptor, ctx: &MediaContext) -> Result<Resolution> {
    let cache_key = image.cache_key();
    let current = image.revision();

    match cache_key.as_deref() {
        Some(key) => {
            if let Some(record) = ctx.cache().get(key).await? {
                if record.is_valid_for(current) {
                    debug!(key, handle = %record.file_node_id, "reusing cached media file");
                    ctx.liveness().touch(&record.file_node_id).await?;
                    return Ok(Resolution::Reused(record.file_node_id));
                }
                debug!(
                    key,
                    stored = ?record.updated_at,
                    current = ?current,
                    "cached media file is stale"
                );
            }
        },
        None => debug!(mime = ?image.mime, "image has no id; bypassing cache"),
    }

    let url = build_image_url(image, ctx.api_url());
    let request = DownloadRequest {
        url: &url,
        extension: image.ext.as_deref(),
        name: image.name.as_deref(),
        auth: ctx.auth(),
    };

    let Some(handle) = ctx.files().download(request).await? else {
        warn!(%url, "no file produced for image; leaving it without a local file");
        return Ok(Resolution::Unavailable);
    };

    info!(%url, %handle, "downloaded media file");

    if let Some(key) = cache_key.as_deref() {
        let record = CacheRecord {
            file_node_id: handle.clone(),
            updated_at: current.cloned(),
        };
        ctx.cache().set(key, record).await?;
    }

    Ok(Resolution::Downloaded(handle))
}

/// Resolve a descriptor object and write the handle into its
/// `localFile___NODE` field when one was obtained.
pub async fn resolve_and_attach(
    descriptor: &mut Map<String, Value>,
    ctx: &MediaContext,
) -> Result<ResolvedImage> {
    let image = ImageDescriptor::from_map(descriptor);
    let resolution = resolve_image(&image, ctx).await?;

    if let Some(handle) = resolution.handle() {
        descriptor.insert(
            LOCAL_FILE_FIELD.to_string(),
            Value::String(handle.to_string()),
        );
    }

    Ok(ResolvedImage {
        cache_key: image.cache_key(),
        resolution,
    })
}
