//! Configuration resolution for CLI commands.

use anyhow::{Context, Result};
use mediasync_core::SyncConfig;

use crate::cli::Cli;

/// Load configuration: `--config` (or the default location), then
/// `MEDIASYNC_*` environment overrides.
///
/// # Errors
///
/// Returns an error if an explicit config file is missing or unreadable.
pub fn load_config(cli: &Cli) -> Result<SyncConfig> {
    let path = cli.config.as_deref();
    SyncConfig::load(path).with_context(|| match path {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Failed to load config".to_string(),
    })
}
