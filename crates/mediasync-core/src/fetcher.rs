//! HTTP file materializer.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::Utc;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::collaborators::{DownloadRequest, FileMaterializer, NodeIdGenerator, NodeRegistry};
use crate::config::{Auth, FetchConfig};
use crate::ledger::FileNode;
use crate::types::FileHandle;
use crate::{Error, Result};

/// Downloads images over HTTP into a local directory and registers each file
/// as a [`FileNode`].
///
/// Files land in `<files_dir>/<url hash>/<name><ext>`, so two images that
/// share a display name never overwrite each other.
pub struct HttpFileMaterializer {
    client: Client,
    files_dir: PathBuf,
    registry: Arc<dyn NodeRegistry>,
    ids: Arc<dyn NodeIdGenerator>,
}

impl HttpFileMaterializer {
    /// Creates a materializer with default fetch settings
    pub fn new(
        files_dir: impl Into<PathBuf>,
        registry: Arc<dyn NodeRegistry>,
        ids: Arc<dyn NodeIdGenerator>,
    ) -> Result<Self> {
        Self::with_config(&FetchConfig::default(), files_dir, registry, ids)
    }

    /// Creates a materializer with a custom timeout and user agent
    pub fn with_config(
        fetch: &FetchConfig,
        files_dir: impl Into<PathBuf>,
        registry: Arc<dyn NodeRegistry>,
        ids: Arc<dyn NodeIdGenerator>,
    ) -> Result<Self> {
        let user_agent = fetch
            .user_agent
            .clone()
            .unwrap_or_else(|| concat!("mediasync/", env!("CARGO_PKG_VERSION")).to_string());
        let client = Client::builder()
            .timeout(fetch.timeout())
            .user_agent(user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            client,
            files_dir: files_dir.into(),
            registry,
            ids,
        })
    }

    /// Directory downloaded files are written under.
    #[must_use]
    pub fn files_dir(&self) -> &Path {
        &self.files_dir
    }

    fn target_path(&self, request: &DownloadRequest<'_>) -> PathBuf {
        let extension = request.extension.unwrap_or_default();
        let stem = request
            .name
            .map(|name| name.strip_suffix(extension).unwrap_or(name))
            .unwrap_or_default();
        let file_name = sanitize_file_name(&format!("{stem}{extension}"));
        self.files_dir.join(url_bucket(request.url)).join(file_name)
    }
}

impl std::fmt::Debug for HttpFileMaterializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFileMaterializer")
            .field("files_dir", &self.files_dir)
            .finish_non_exhaustive()
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout(format!("Timed out downloading {url}"))
    } else {
        Error::Network(err)
    }
}

fn authorize(request: reqwest::RequestBuilder, auth: &Auth) -> reqwest::RequestBuilder {
    if let Some(token) = auth.token.as_deref() {
        request.bearer_auth(token)
    } else if let Some(username) = auth.username.as_deref() {
        request.basic_auth(username, auth.password.as_deref())
    } else {
        request
    }
}

#[async_trait]
impl FileMaterializer for HttpFileMaterializer {
    async fn download(&self, request: DownloadRequest<'_>) -> Result<Option<FileHandle>> {
        debug!(url = request.url, "downloading media file");
        let response = authorize(self.client.get(request.url), request.auth)
            .send()
            .await
            .map_err(|e| transport_error(request.url, e))?;
        let status = response.status();

        if !status.is_success() {
            warn!(url = request.url, %status, "origin returned no file");
            return Ok(None);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(request.url, e))?;
        let path = self.target_path(&request);
        write_atomically(&path, &bytes).await?;

        let now = Utc::now();
        let node = FileNode {
            id: self.ids.create_node_id(request.url),
            url: request.url.to_string(),
            path,
            size: bytes.len() as u64,
            digest: calculate_sha256(&bytes),
            extension: request.extension.map(str::to_string),
            name: request.name.map(str::to_string),
            created_at: now,
            touched_at: now,
        };
        let handle = node.id.clone();

        info!("Fetched {} bytes from {}", node.size, request.url);
        self.registry.create_node(node).await?;
        Ok(Some(handle))
    }
}

async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Storage(format!("Failed to create media directory: {e}")))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".part");
    let tmp_path = PathBuf::from(tmp_name);
    tokio::fs::write(&tmp_path, bytes)
        .await
        .map_err(|e| Error::Storage(format!("Failed to write media file: {e}")))?;

    #[cfg(target_os = "windows")]
    if path.exists() {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| Error::Storage(format!("Failed to replace media file: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Storage(format!("Failed to commit media file: {e}")))
}

/// First 16 hex characters of the URL's SHA-256.
fn url_bucket(url: &str) -> String {
    Sha256::digest(url.as_bytes())
        .iter()
        .take(8)
        .fold(String::new(), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        })
}

fn sanitize_file_name(name: &str) -> String {
    // Conservative character set; anything else becomes an underscore.
    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", "_");
    }

    if sanitized.is_empty() || sanitized.starts_with('.') {
        format!("file{sanitized}")
    } else {
        sanitized
    }
}

fn calculate_sha256(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    STANDARD.encode(result)
}
