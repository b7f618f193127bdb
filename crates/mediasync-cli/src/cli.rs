//! # CLI Structure and Argument Parsing
//!
//! Command-line interface for `mediasync`, built with `clap` derive macros.
//!
//! ```bash
//! # Download (or reuse) every image in a CMS export
//! mediasync sync --input posts.json --output posts.local.json
//!
//! # Same, deleting files no record references anymore
//! mediasync sync --input posts.json --prune
//!
//! # Inspect or reset the revision cache
//! mediasync cache list --json
//! mediasync cache clear --force
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure for the `mediasync` command
#[derive(Parser, Clone, Debug)]
#[command(name = "mediasync")]
#[command(version)]
#[command(about = "mediasync - Revision-aware local caching of CMS images", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Path to configuration file. Also via `MEDIASYNC_CONFIG`.
    #[arg(long, global = true, value_name = "FILE", env = "MEDIASYNC_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Resolve every image in a set of records against the local cache
    Sync(SyncArgs),

    /// Inspect or reset the revision cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

/// Arguments for `mediasync sync`
#[derive(Args, Clone, Debug)]
pub struct SyncArgs {
    /// JSON file holding an array of records or a single record (`-` for stdin)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Where to write the augmented records (stdout when omitted)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Base URL relative upload paths are resolved against
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Delete downloaded files no record referenced during this run
    #[arg(long)]
    pub prune: bool,
}

/// Cache subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum CacheCommands {
    /// List cached image records
    List {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Remove every cached image record
    Clear {
        /// Skip confirmation prompt
        #[arg(short = 'f', long)]
        force: bool,
    },
}
