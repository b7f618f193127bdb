//! Configuration management for media syncs.
//!
//! Settings are resolved in layers, each overriding the previous:
//!
//! 1. **Defaults**: [`SyncConfig::default`]
//! 2. **Config file**: an explicit path, or `config.toml` in the platform
//!    config directory (see [`SyncConfig::default_path`])
//! 3. **Environment variables**: `MEDIASYNC_API_URL`, `MEDIASYNC_DATA_DIR`,
//!    `MEDIASYNC_TOKEN`
//!
//! ## Example Configuration File
//!
//! ```toml
//! api_url = "https://cms.example.com"
//!
//! [paths]
//! root = "/var/cache/mediasync"
//!
//! [fetch]
//! timeout_secs = 30
//!
//! [concurrency]
//! records = 8
//! images_per_record = 1
//!
//! [auth]
//! token = "…"
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Environment variable overriding [`SyncConfig::api_url`].
pub const ENV_API_URL: &str = "MEDIASYNC_API_URL";
/// Environment variable overriding [`PathsConfig::root`].
pub const ENV_DATA_DIR: &str = "MEDIASYNC_DATA_DIR";
/// Environment variable overriding [`Auth::token`].
pub const ENV_TOKEN: &str = "MEDIASYNC_TOKEN";

/// Top-level configuration for a media sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL that relative upload paths are resolved against.
    pub api_url: String,
    /// Where the cache, node ledger, and downloaded files live.
    pub paths: PathsConfig,
    /// HTTP download settings.
    pub fetch: FetchConfig,
    /// Concurrency limits.
    pub concurrency: ConcurrencyConfig,
    /// Credentials forwarded to every download.
    pub auth: Auth,
}

/// File system paths configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root data directory.
    ///
    /// Layout: `root/cache.json`, `root/nodes.json`, `root/files/`.
    pub root: PathBuf,
}

impl PathsConfig {
    /// Persistent cache store file.
    #[must_use]
    pub fn cache_file(&self) -> PathBuf {
        self.root.join("cache.json")
    }

    /// Node ledger file.
    #[must_use]
    pub fn ledger_file(&self) -> PathBuf {
        self.root.join("nodes.json")
    }

    /// Directory downloaded files are written under.
    #[must_use]
    pub fn files_dir(&self) -> PathBuf {
        self.root.join("files")
    }
}

/// HTTP download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent override; defaults to `mediasync/<version>`.
    pub user_agent: Option<String>,
}

impl FetchConfig {
    /// Request timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
        }
    }
}

/// Concurrency limits for a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Top-level records traversed at the same time.
    pub records: usize,
    /// Images resolved at the same time within one record.
    ///
    /// `1` resolves images one after another in depth-first order.
    pub images_per_record: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            records: 8,
            images_per_record: 1,
        }
    }
}

/// Credentials forwarded to the file materializer.
///
/// Basic credentials cover `.htaccess`-protected upload folders; the token is
/// sent as a bearer token for CMS instances with private uploads.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Auth {
    /// Basic auth user.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// Bearer token.
    pub token: Option<String>,
}

impl Auth {
    /// Whether any credential is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.password.is_none() && self.token.is_none()
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Auth")
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("token", &redact(&self.token))
            .finish()
    }
}

impl SyncConfig {
    /// Load configuration from `path`, or from the default location when
    /// `path` is `None`, then apply environment overrides.
    ///
    /// A missing default file yields defaults; a missing explicit file is an
    /// error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if !path.exists() => {
                return Err(Error::NotFound(format!(
                    "Config file '{}' does not exist",
                    path.display()
                )));
            },
            Some(path) => Self::load_from(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env();
        Ok(config)
    }

    /// Parse a TOML config file without applying environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Platform config file location:
    /// - Linux: `~/.config/mediasync/config.toml`
    /// - macOS: `~/Library/Application Support/dev.outfitter.mediasync/config.toml`
    /// - Windows: `%APPDATA%\outfitter\mediasync\config\config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "outfitter", "mediasync")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(api_url) = non_empty(ENV_API_URL) {
            self.api_url = api_url;
        }
        if let Some(root) = non_empty(ENV_DATA_DIR) {
            self.paths.root = PathBuf::from(root);
        }
        if let Some(token) = non_empty(ENV_TOKEN) {
            self.auth.token = Some(token);
        }
    }

    /// Check the settings a sync cannot run without.
    pub fn validate(&self) -> Result<()> {
        let api_url = self.api_url.trim();
        if api_url.is_empty() {
            return Err(Error::Config(format!(
                "api_url is not set (use the config file, --api-url, or {ENV_API_URL})"
            )));
        }
        let parsed = Url::parse(api_url).map_err(|e| Error::InvalidUrl(format!("{api_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidUrl(format!(
                "{api_url}: unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        if self.concurrency.records == 0 || self.concurrency.images_per_record == 0 {
            return Err(Error::Config("concurrency limits must be at least 1".into()));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(Error::Config("fetch.timeout_secs must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: directories::ProjectDirs::from("dev", "outfitter", "mediasync").map_or_else(
                || {
                    directories::BaseDirs::new().map_or_else(
                        || PathBuf::from(".mediasync"),
                        |base| base.home_dir().join(".mediasync"),
                    )
                },
                |dirs| dirs.data_dir().to_path_buf(),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn valid() -> SyncConfig {
        SyncConfig {
            api_url: "http://localhost:1337".into(),
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.concurrency.records, 8);
        assert_eq!(config.concurrency.images_per_record, 1);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(30));
        assert!(config.auth.is_empty());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "api_url = \"https://cms.example.com\"\n[concurrency]\nrecords = 2\n",
        )
        .unwrap();

        let config = SyncConfig::load_from(&path).unwrap();
        assert_eq!(config.api_url, "https://cms.example.com");
        assert_eq!(config.concurrency.records, 2);
        assert_eq!(config.concurrency.images_per_record, 1);
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn test_save_and_reload() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let mut config = valid();
        config.paths.root = temp.path().join("data");
        config.auth.username = Some("editor".into());

        config.save(&path).unwrap();
        let loaded = SyncConfig::load_from(&path).unwrap();
        assert_eq!(loaded.api_url, config.api_url);
        assert_eq!(loaded.paths.root, config.paths.root);
        assert_eq!(loaded.auth, config.auth);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let temp = TempDir::new().unwrap();
        let err = SyncConfig::load(Some(&temp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "api_url = [").unwrap();
        assert!(matches!(SyncConfig::load_from(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides_apply_non_empty_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "https://override.example.com"),
            (ENV_DATA_DIR, "  "),
            (ENV_TOKEN, "secret"),
        ]);
        let mut config = valid();
        let root = config.paths.root.clone();
        config.apply_overrides(|key| env.get(key).map(ToString::to_string));

        assert_eq!(config.api_url, "https://override.example.com");
        assert_eq!(config.paths.root, root);
        assert_eq!(config.auth.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());
        assert!(matches!(SyncConfig::default().validate(), Err(Error::Config(_))));

        let mut config = valid();
        config.api_url = "ftp://cms".into();
        assert!(matches!(config.validate(), Err(Error::InvalidUrl(_))));

        let mut config = valid();
        config.concurrency.records = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_auth_debug_redacts_secrets() {
        let auth = Auth {
            username: Some("editor".into()),
            password: Some("hunter2".into()),
            token: Some("tok".into()),
        };
        let rendered = format!("{auth:?}");
        assert!(rendered.contains("editor"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("tok\""));
    }
}
