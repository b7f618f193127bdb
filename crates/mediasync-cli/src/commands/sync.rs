//! Sync command implementation

use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use colored::Colorize;
use mediasync_core::{
    HashIdGenerator, HttpFileMaterializer, JsonFileCache, MediaContext, NodeLedger, SyncConfig,
    SyncReport, download_media_files,
};
use serde_json::Value;
use tracing::info;

use crate::cli::SyncArgs;

/// Records as read from the input, remembering whether a bare object was given.
#[derive(Debug, PartialEq)]
pub enum RecordSet {
    /// A JSON array of records.
    Many(Vec<Value>),
    /// A single record object.
    One(Vec<Value>),
}

impl RecordSet {
    /// Parse input text into records.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not JSON or is neither an array nor an object.
    pub fn parse(input: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(input).context("Input is not valid JSON")?;
        match value {
            Value::Array(records) => Ok(Self::Many(records)),
            record @ Value::Object(_) => Ok(Self::One(vec![record])),
            other => bail!("Expected an array of records or a record object, got {other}"),
        }
    }

    /// Mutable view of the records for syncing.
    pub fn records_mut(&mut self) -> &mut [Value] {
        match self {
            Self::Many(records) | Self::One(records) => records,
        }
    }

    /// Back to JSON in the shape it was read.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Many(records) => Value::Array(records),
            Self::One(mut records) => records.pop().unwrap_or(Value::Null),
        }
    }
}

/// Outcome of a sync, for reporting.
#[derive(Debug)]
pub struct SyncOutcome {
    /// Per-run counters.
    pub report: SyncReport,
    /// Files deleted by `--prune`.
    pub pruned: usize,
}

/// Run the sync over already-parsed records using the default collaborators.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, local state cannot be
/// opened, or any record fails to sync.
pub async fn execute_sync(
    config: &SyncConfig,
    records: &mut RecordSet,
    prune: bool,
) -> Result<SyncOutcome> {
    config.validate()?;

    let ledger = Arc::new(NodeLedger::open(config.paths.ledger_file())?);
    let files = HttpFileMaterializer::with_config(
        &config.fetch,
        config.paths.files_dir(),
        ledger.clone(),
        Arc::new(HashIdGenerator::default()),
    )?;
    let cache = JsonFileCache::open(config.paths.cache_file())?;

    let ctx = MediaContext::from_config(config)
        .cache(Arc::new(cache))
        .files(Arc::new(files))
        .liveness(ledger.clone())
        .build()?;

    let report = download_media_files(records.records_mut(), &ctx).await?;

    let pruned = if prune {
        let removed = ledger.sweep().await?;
        info!(removed = removed.len(), "pruned unreferenced files");
        removed.len()
    } else {
        ledger.flush().await?;
        0
    };

    Ok(SyncOutcome { report, pruned })
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("Failed to read records from stdin")?;
        Ok(input)
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read records from {}", path.display()))
    }
}

fn write_output(path: Option<&Path>, value: &Value) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => std::fs::write(path, format!("{json}\n"))
            .with_context(|| format!("Failed to write records to {}", path.display())),
        None => {
            let stdout = io::stdout();
            let mut lock = stdout.lock();
            writeln!(lock, "{json}")?;
            Ok(())
        },
    }
}

/// Print the run summary to `writer`.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn print_summary<W: Write>(mut writer: W, outcome: &SyncOutcome) -> Result<()> {
    let report = &outcome.report;
    writeln!(
        writer,
        "{} Synced {} image(s) across {} record(s)",
        "✓".green(),
        report.images,
        report.records
    )?;
    writeln!(
        writer,
        "  {} downloaded, {} reused, {} unavailable",
        report.downloaded.to_string().cyan(),
        report.reused.to_string().cyan(),
        report.unavailable.to_string().yellow()
    )?;
    if outcome.pruned > 0 {
        writeln!(writer, "  {} stale file(s) pruned", outcome.pruned)?;
    }
    Ok(())
}

/// Execute `mediasync sync`.
///
/// # Errors
///
/// Returns an error if reading, syncing, or writing fails.
pub async fn run(mut config: SyncConfig, args: SyncArgs, quiet: bool) -> Result<()> {
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }

    let input = read_input(&args.input)?;
    let mut records = RecordSet::parse(&input)?;
    let outcome = execute_sync(&config, &mut records, args.prune).await?;

    write_output(args.output.as_deref(), &records.into_value())?;

    if !quiet {
        print_summary(io::stderr().lock(), &outcome)?;
    }
    Ok(())
}
