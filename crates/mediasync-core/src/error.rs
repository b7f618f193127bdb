//! Error types and handling for mediasync-core operations.
//!
//! A single error enum covers every failure the sync can surface: the
//! traversal engine itself never fails, so every variant originates from a
//! collaborator (cache store, file materializer, node ledger) or from loading
//! configuration.
//!
//! ## Error Categories
//!
//! - **I/O Errors**: reading or writing cache files and downloaded media
//! - **Network Errors**: transport failures while downloading an image
//! - **Timeouts**: downloads that exceed the configured fetch timeout
//! - **Storage Errors**: cache store and node ledger consistency problems
//! - **Serialization Errors**: cache or ledger files that do not parse
//! - **Configuration Errors**: invalid settings or config files
//! - **Collaborator Errors**: failures reported by caller-supplied collaborators
//!
//! A download that completes with a non-success HTTP status is *not* an error:
//! the materializer reports it as "no handle" and the image is skipped.
//!
//! ```rust
//! use mediasync_core::{Error, Result};
//!
//! fn handle(result: Result<()>) {
//!     match result {
//!         Err(e) if e.is_recoverable() => eprintln!("transient failure: {e}"),
//!         Err(e) => eprintln!("{} failure: {e}", e.category()),
//!         Ok(()) => {},
//!     }
//! }
//!
//! handle(Err(Error::Timeout("download took too long".into())));
//! ```

use thiserror::Error;

/// The main error type for mediasync-core operations.
///
/// All public functions in mediasync-core return `Result<T, Error>`. The
/// source chain is preserved for wrapped standard library and `reqwest`
/// errors.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers writing downloaded files, reading and writing the cache and
    /// ledger files, and creating data directories.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// Raised when an image download cannot complete at the transport level
    /// (DNS, connection refused, TLS, body read). Connection and timeout
    /// failures are recoverable.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Storage operation failed.
    ///
    /// Covers the persistent cache store and the node ledger: unreadable
    /// files, failed atomic commits, missing directories.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An explicitly requested config file does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// URL is malformed or invalid.
    ///
    /// Only raised when validating configuration; image URLs built during a
    /// sync are not validated.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// An image download exceeded the configured fetch timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization or deserialization failed.
    ///
    /// Occurs when the cache file or ledger file contains data that
    /// does not match the expected shape.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A caller-supplied collaborator failed.
    ///
    /// Collaborators that are not backed by this crate (a build pipeline's own
    /// cache or node store, for instance) report failures through this variant.
    #[error("Collaborator error: {0}")]
    Collaborator(String),
}

impl Error {
    /// Check if the error might be recoverable through retry logic.
    ///
    /// The sync never retries on its own; callers that re-run a build can use
    /// this to decide whether a failure is worth another attempt.
    ///
    /// ```rust
    /// use mediasync_core::Error;
    /// use std::io;
    ///
    /// assert!(Error::Timeout("slow".into()).is_recoverable());
    /// assert!(Error::Io(io::Error::new(io::ErrorKind::Interrupted, "eintr")).is_recoverable());
    /// assert!(!Error::Config("bad".into()).is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// Useful as a structured logging field:
    ///
    /// ```rust
    /// use mediasync_core::Error;
    ///
    /// let err = Error::Storage("cache.json is truncated".into());
    /// tracing::error!(category = err.category(), "{err}");
    /// ```
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Storage(_) => "storage",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::InvalidUrl(_) => "invalid_url",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
            Self::Collaborator(_) => "collaborator",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
