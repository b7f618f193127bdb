//! Injected dependencies for a sync run.

use std::fmt;
use std::sync::Arc;

use crate::collaborators::{CacheStore, FileMaterializer, LivenessTracker};
use crate::config::{Auth, ConcurrencyConfig, SyncConfig};
use crate::{Error, Result};

/// Collaborators and settings shared by every resolution in a run.
///
/// Built with [`MediaContext::builder`]; cheap to share by reference across
/// concurrent record traversals.
pub struct MediaContext {
    api_url: String,
    cache: Arc<dyn CacheStore>,
    files: Arc<dyn FileMaterializer>,
    liveness: Arc<dyn LivenessTracker>,
    auth: Auth,
    concurrency: ConcurrencyConfig,
}

impl MediaContext {
    /// Start building a context for the given API base URL.
    pub fn builder(api_url: impl Into<String>) -> MediaContextBuilder {
        MediaContextBuilder {
            api_url: api_url.into(),
            cache: None,
            files: None,
            liveness: None,
            auth: Auth::default(),
            concurrency: ConcurrencyConfig::default(),
        }
    }

    /// Start building a context from loaded configuration.
    pub fn from_config(config: &SyncConfig) -> MediaContextBuilder {
        Self::builder(config.api_url.trim())
            .auth(config.auth.clone())
            .concurrency(config.concurrency)
    }

    /// Base URL relative upload paths are resolved against.
    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Cache store.
    #[must_use]
    pub fn cache(&self) -> &dyn CacheStore {
        self.cache.as_ref()
    }

    /// File materializer.
    #[must_use]
    pub fn files(&self) -> &dyn FileMaterializer {
        self.files.as_ref()
    }

    /// Liveness tracker.
    #[must_use]
    pub fn liveness(&self) -> &dyn LivenessTracker {
        self.liveness.as_ref()
    }

    /// Credentials forwarded to downloads.
    #[must_use]
    pub const fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Concurrency limits.
    #[must_use]
    pub const fn concurrency(&self) -> ConcurrencyConfig {
        self.concurrency
    }
}

impl fmt::Debug for MediaContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaContext")
            .field("api_url", &self.api_url)
            .field("auth", &self.auth)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Builder for [`MediaContext`].
#[must_use]
pub struct MediaContextBuilder {
    api_url: String,
    cache: Option<Arc<dyn CacheStore>>,
    files: Option<Arc<dyn FileMaterializer>>,
    liveness: Option<Arc<dyn LivenessTracker>>,
    auth: Auth,
    concurrency: ConcurrencyConfig,
}

impl MediaContextBuilder {
    /// Set the cache store.
    pub fn cache(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the file materializer.
    pub fn files(mut self, files: Arc<dyn FileMaterializer>) -> Self {
        self.files = Some(files);
        self
    }

    /// Set the liveness tracker.
    pub fn liveness(mut self, liveness: Arc<dyn LivenessTracker>) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// Set download credentials.
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Set concurrency limits.
    pub fn concurrency(mut self, concurrency: ConcurrencyConfig) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Finish the context; every collaborator must be set.
    pub fn build(self) -> Result<MediaContext> {
        let missing = |name: &str| Error::Config(format!("media context is missing a {name}"));
        Ok(MediaContext {
            api_url: self.api_url,
            cache: self.cache.ok_or_else(|| missing("cache store"))?,
            files: self.files.ok_or_else(|| missing("file materializer"))?,
            liveness: self.liveness.ok_or_else(|| missing("liveness tracker"))?,
            auth: self.auth,
            concurrency: ConcurrencyConfig {
                records: self.concurrency.records.max(1),
                images_per_record: self.concurrency.images_per_record.max(1),
            },
        })
    }
}
