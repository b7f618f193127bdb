//! mediasync CLI - revision-aware local caching of CMS images
//!
//! Thin entry point; command handling lives in the library crate.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    mediasync_cli::run().await
}
