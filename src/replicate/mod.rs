// ABOUTME: Replication orchestrator: runs the table list in order for a full or incremental refresh
// ABOUTME: Fails fast on the first table error, leaving earlier tables committed

pub mod copier;
pub mod upserter;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{Phase, ReplicationError, Result};
use crate::olap::{open_duckdb, table_exists};
use crate::sqlite::open_sqlite;
use crate::tables::ReplicatedTable;

pub use copier::copy_table;
pub use upserter::upsert_table;

/// Lower bound for change detection.
///
/// Compared against `created_at`/`updated_at` as an instant when SQLite can
/// read it as a date (`2024-05-02 00:00:00`, `2024-05-02T00:00:00`), and as
/// text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Watermark(String);

impl Watermark {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ReplicationError::InvalidWatermark { value });
        }
        Ok(Self(value))
    }

    /// Watermark in SQLite's `CURRENT_TIMESTAMP` format.
    pub fn from_datetime(at: NaiveDateTime) -> Self {
        Self(at.format("%Y-%m-%d %H:%M:%S").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Watermark {
    type Err = ReplicationError;

    fn from_str(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationMode {
    /// Drop and recopy every table.
    Full,
    /// Upsert rows changed after the watermark; absent tables are bootstrapped.
    Incremental(Watermark),
}

impl ReplicationMode {
    pub fn name(&self) -> &'static str {
        match self {
            ReplicationMode::Full => "full",
            ReplicationMode::Incremental(_) => "incremental",
        }
    }
}

/// What was done to a table during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableAction {
    BulkCopy,
    /// Bulk copy chosen by an incremental run because the table was absent.
    Bootstrap,
    Upsert,
}

impl fmt::Display for TableAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableAction::BulkCopy => write!(f, "copied"),
            TableAction::Bootstrap => write!(f, "bootstrapped"),
            TableAction::Upsert => write!(f, "upserted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableOutcome {
    pub table: ReplicatedTable,
    pub action: TableAction,
    pub rows: usize,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub mode: &'static str,
    pub watermark: Option<Watermark>,
    pub tables: Vec<TableOutcome>,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }
}

/// Progress of a run, reported on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    RunningTable {
        index: usize,
        table: ReplicatedTable,
    },
    Failed {
        index: usize,
        table: ReplicatedTable,
    },
    Done,
}

/// Runs replication between one source and one destination file.
///
/// Each run opens its own pair of connections and recomputes everything from
/// the two live databases. Nothing is carried between runs.
#[derive(Debug, Clone)]
pub struct Replicator {
    source: PathBuf,
    destination: PathBuf,
    tables: Vec<ReplicatedTable>,
}

impl Replicator {
    /// Replicator over every table in [`ReplicatedTable::ALL`] order.
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            tables: ReplicatedTable::ALL.to_vec(),
        }
    }

    /// Restrict or reorder the tables a run visits.
    pub fn with_tables(mut self, tables: Vec<ReplicatedTable>) -> Self {
        self.tables = tables;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn tables(&self) -> &[ReplicatedTable] {
        &self.tables
    }

    pub fn run(&self, mode: &ReplicationMode) -> Result<RunReport> {
        self.run_with_progress(mode, |_| {})
    }

    /// Run every table in order, calling `on_state` on each state transition.
    ///
    /// The first table failure ends the run with `TableFailed`. Tables before
    /// it stay committed; tables after it are not touched.
    pub fn run_with_progress<F>(&self, mode: &ReplicationMode, mut on_state: F) -> Result<RunReport>
    where
        F: FnMut(&RunState),
    {
        let started = Instant::now();
        let source = open_sqlite(&self.source)?;
        let mut destination = open_duckdb(&self.destination)?;

        tracing::info!(
            mode = mode.name(),
            tables = self.tables.len(),
            "Starting replication run"
        );
        on_state(&RunState::Idle);

        let mut outcomes: Vec<TableOutcome> = Vec::with_capacity(self.tables.len());

        for (index, table) in self.tables.iter().copied().enumerate() {
            let state = RunState::RunningTable { index, table };
            tracing::debug!(?state, "Run state");
            on_state(&state);

            match replicate_table(&source, &mut destination, table, mode) {
                Ok(outcome) => outcomes.push(outcome),
                Err((phase, err)) => {
                    let state = RunState::Failed { index, table };
                    tracing::error!(?state, phase = %phase, "Table failed: {}", err);
                    on_state(&state);

                    return Err(ReplicationError::TableFailed {
                        table: table.to_string(),
                        index,
                        phase,
                        applied: outcomes.iter().map(|o| o.table.to_string()).collect(),
                        source: Box::new(err),
                    });
                }
            }
        }

        let report = RunReport {
            mode: mode.name(),
            watermark: match mode {
                ReplicationMode::Full => None,
                ReplicationMode::Incremental(w) => Some(w.clone()),
            },
            tables: outcomes,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        tracing::debug!(state = ?RunState::Done, "Run state");
        on_state(&RunState::Done);
        tracing::info!(
            mode = report.mode,
            rows = report.total_rows(),
            elapsed_ms = report.elapsed_ms,
            "Replication run complete"
        );

        Ok(report)
    }
}

/// Replicate one table, reporting which phase a failure belongs to.
///
/// An incremental run that cannot tell whether the destination table exists
/// fails in the upsert phase; it never falls back to a bootstrap copy.
fn replicate_table(
    source: &rusqlite::Connection,
    destination: &mut duckdb::Connection,
    table: ReplicatedTable,
    mode: &ReplicationMode,
) -> std::result::Result<TableOutcome, (Phase, ReplicationError)> {
    match mode {
        ReplicationMode::Full => {
            copy_table(source, destination, table).map_err(|e| (Phase::Copy, e))
        }
        ReplicationMode::Incremental(watermark) => {
            let exists = table_exists(destination, table).map_err(|e| (Phase::Upsert, e))?;
            if exists {
                upsert_table(source, destination, table, watermark).map_err(|e| (Phase::Upsert, e))
            } else {
                tracing::info!("Destination table '{}' is absent, bootstrapping with a full copy", table);
                let mut outcome =
                    copy_table(source, destination, table).map_err(|e| (Phase::Copy, e))?;
                outcome.action = TableAction::Bootstrap;
                Ok(outcome)
            }
        }
    }
}
