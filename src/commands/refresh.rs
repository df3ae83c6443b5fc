// ABOUTME: Full and incremental refresh commands
// ABOUTME: Drives the replicator with a progress bar and records the next watermark on success

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::ReplicatorConfig;
use crate::replicate::{ReplicationMode, RunReport, RunState, Watermark};
use crate::state;

/// Drop and recopy every configured table.
///
/// With `fresh` (or `fresh_destination` in the config) the destination file is
/// deleted first, so tables that are no longer replicated disappear too.
pub fn full(config: &ReplicatorConfig, fresh: bool, json: bool) -> Result<()> {
    if fresh || config.fresh_destination {
        remove_destination(&config.destination)?;
    }
    run_and_record(config, ReplicationMode::Full, json)
}

/// Upsert rows changed since `since`, or since the saved watermark.
///
/// Without either, falls back to a full refresh.
pub fn incremental(config: &ReplicatorConfig, since: Option<String>, json: bool) -> Result<()> {
    let since = match since {
        Some(value) => Some(value),
        None => {
            let path = super::state_path(config)?;
            state::load(&path)
                .context("Failed to load state")?
                .last_watermark
        }
    };

    let mode = match since {
        Some(value) => ReplicationMode::Incremental(
            Watermark::new(value).context("Cannot run incremental refresh")?,
        ),
        None => {
            tracing::warn!(
                "No watermark given and none saved; running a full refresh instead"
            );
            ReplicationMode::Full
        }
    };

    run_and_record(config, mode, json)
}

fn run_and_record(config: &ReplicatorConfig, mode: ReplicationMode, json: bool) -> Result<()> {
    ensure_parent_dir(&config.destination)?;

    // Rows written while the run is in progress are picked up next time.
    let started_at = Utc::now();
    let replicator = config.replicator();

    let progress = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(replicator.tables().len() as u64)
    };
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("##-"),
    );

    let report = replicator
        .run_with_progress(&mode, |state| match state {
            RunState::Idle => {}
            RunState::RunningTable { index, table } => {
                progress.set_position(*index as u64);
                progress.set_message(table.to_string());
            }
            RunState::Failed { table, .. } => {
                progress.abandon_with_message(format!("failed at {}", table));
            }
            RunState::Done => {
                progress.set_position(replicator.tables().len() as u64);
                progress.finish_with_message("done");
            }
        })
        .with_context(|| format!("{} refresh failed", mode.name()))?;

    record_success(&super::state_path(config)?, started_at)?;

    print_report(&report, json)
}

/// Watermark for the run after one that started at `started_at`.
///
/// Stored timestamps have whole-second resolution, so a row written later in
/// the starting second carries the same value. Backing off one second keeps
/// it strictly newer; re-sending rows already applied is harmless.
fn next_watermark(started_at: DateTime<Utc>) -> Watermark {
    Watermark::from_datetime((started_at - Duration::seconds(1)).naive_utc())
}

fn record_success(state_path: &Path, started_at: DateTime<Utc>) -> Result<()> {
    let mut app_state = state::load(state_path).context("Failed to load state")?;
    app_state.last_watermark = Some(next_watermark(started_at).to_string());
    app_state.last_run_at = Some(Utc::now());
    state::save(state_path, &app_state).context("Failed to save state")
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for outcome in &report.tables {
        println!(
            "  {:<20} {:<13} {:>8} rows",
            outcome.table.as_str(),
            outcome.action.to_string(),
            outcome.rows
        );
    }
    println!(
        "{} refresh complete: {} tables, {} rows in {} ms",
        report.mode,
        report.tables.len(),
        report.total_rows(),
        report.elapsed_ms
    );
    Ok(())
}

fn remove_destination(path: &Path) -> Result<()> {
    // DuckDB keeps uncheckpointed changes in a sidecar write-ahead log.
    let wal = path.with_file_name(format!(
        "{}.wal",
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    ));

    for file in [path, wal.as_path()] {
        if file.exists() {
            fs::remove_file(file)
                .with_context(|| format!("Failed to remove {}", file.display()))?;
            tracing::info!("Removed existing destination file {}", file.display());
        }
    }
    Ok(())
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
    }
    Ok(())
}
