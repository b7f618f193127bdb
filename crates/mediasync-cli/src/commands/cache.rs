//! Cache inspection and clearing commands

use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::Result;
use colored::Colorize;
use mediasync_core::{CacheRecord, JsonFileCache, SyncConfig};

/// High-level outcome produced by [`execute_clear`]. Useful for assertions in tests.
#[derive(Debug, PartialEq, Eq)]
pub enum ClearOutcome {
    /// No records were present to clear.
    AlreadyEmpty,
    /// User cancelled the clear operation.
    Cancelled,
    /// Cache cleared with the number of records removed.
    Cleared { cleared: usize },
}

/// Render cached records as text or JSON.
///
/// # Errors
///
/// Returns an error if writing or serialization fails.
pub fn write_list<W: Write>(
    mut writer: W,
    entries: &BTreeMap<String, CacheRecord>,
    json: bool,
) -> Result<()> {
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(entries)?)?;
        return Ok(());
    }

    if entries.is_empty() {
        writeln!(writer, "Cache is empty. Run 'mediasync sync' to populate it.")?;
        return Ok(());
    }

    for (key, record) in entries {
        let revision = record
            .updated_at
            .as_ref()
            .map_or_else(|| "no revision".to_string(), ToString::to_string);
        writeln!(
            writer,
            "{} -> {} {}",
            key.bold(),
            record.file_node_id,
            format!("({revision})").bright_black()
        )?;
    }
    writeln!(writer)?;
    writeln!(writer, "{} record(s)", entries.len())?;
    Ok(())
}

/// Execute `mediasync cache list`.
///
/// # Errors
///
/// Returns an error if the cache file cannot be read.
pub async fn list(config: &SyncConfig, json: bool) -> Result<()> {
    let cache = JsonFileCache::open(config.paths.cache_file())?;
    let entries = cache.entries().await;
    write_list(io::stdout().lock(), &entries, json)
}

/// Core clear implementation with injectable IO to enable deterministic tests.
///
/// # Errors
///
/// Returns an error if confirmation or cache deletion fails.
pub async fn execute_clear<W, C>(
    cache: &JsonFileCache,
    mut writer: W,
    force: bool,
    mut confirm: C,
) -> Result<ClearOutcome>
where
    W: Write,
    C: FnMut(usize) -> Result<bool>,
{
    let count = cache.entries().await.len();

    if count == 0 {
        writeln!(writer, "{} Cache is already empty", "ℹ".blue())?;
        return Ok(ClearOutcome::AlreadyEmpty);
    }

    writeln!(
        writer,
        "{} This will forget {} cached image record(s); every image will be downloaded again on the next sync.",
        "⚠".yellow(),
        count
    )?;

    if !force && !confirm(count)? {
        writeln!(writer, "{} Cancelled", "✗".red())?;
        return Ok(ClearOutcome::Cancelled);
    }

    let cleared = cache.clear().await?;
    writeln!(writer, "{} Cache cleared successfully", "✓".green())?;

    Ok(ClearOutcome::Cleared { cleared })
}

/// Execute `mediasync cache clear` with terminal IO.
///
/// # Errors
///
/// Returns an error if the cache cannot be opened, confirmation fails, or
/// deletion fails.
pub async fn clear(config: &SyncConfig, force: bool) -> Result<()> {
    let cache = JsonFileCache::open(config.paths.cache_file())?;
    let mut input = String::new();

    execute_clear(&cache, io::stdout(), force, |_count| {
        let mut prompt = io::stdout();
        write!(prompt, "Are you sure you want to continue? [y/N] ")?;
        prompt.flush()?;

        input.clear();
        io::stdin().read_line(&mut input)?;

        Ok(matches!(
            input.trim().to_ascii_lowercase().as_str(),
            "y" | "yes"
        ))
    })
    .await?;

    Ok(())
}
