//! mediasync CLI - revision-aware local caching of CMS images
//!
//! Reads exported CMS records, downloads (or reuses) every image they
//! reference, and writes the records back with local file handles attached.
use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;
mod utils;

use crate::utils::{initialize_logging, load_config};
use cli::{CacheCommands, Cli, Commands};

/// Execute the mediasync CLI with the currently configured environment.
///
/// # Errors
///
/// Returns an error if CLI initialization, configuration loading, or command
/// execution fails.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(&cli)?;

    execute_command(cli).await
}

async fn execute_command(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    match cli.command {
        Commands::Sync(args) => commands::sync::run(config, args, cli.quiet).await,
        Commands::Cache { command } => match command {
            CacheCommands::List { json } => commands::cache::list(&config, json).await,
            CacheCommands::Clear { force } => commands::cache::clear(&config, force).await,
        },
    }
}
