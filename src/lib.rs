// ABOUTME: Library root for duckdb-replicator
// ABOUTME: Keeps a DuckDB analytical replica in step with an authoritative SQLite database

pub mod commands;
pub mod config;
pub mod error;
pub mod olap;
pub mod replicate;
pub mod schema;
pub mod sqlite;
pub mod state;
pub mod tables;
pub mod utils;

use std::path::Path;

pub use config::ReplicatorConfig;
pub use error::{DatabaseRole, Phase, ReplicationError, Result};
pub use replicate::{
    ReplicationMode, Replicator, RunReport, RunState, TableAction, TableOutcome, Watermark,
};
pub use tables::ReplicatedTable;

/// Drop and recopy every replicated table from `source` into `destination`.
///
/// Idempotent for a fixed source snapshot.
///
/// # Examples
///
/// ```no_run
/// # fn example() -> duckdb_replicator::Result<()> {
/// let report = duckdb_replicator::full_refresh("eggtracker.db", "eggtracker.duckdb")?;
/// println!("copied {} rows", report.total_rows());
/// # Ok(())
/// # }
/// ```
pub fn full_refresh(source: impl AsRef<Path>, destination: impl AsRef<Path>) -> Result<RunReport> {
    Replicator::new(source.as_ref(), destination.as_ref()).run(&ReplicationMode::Full)
}

/// Upsert rows created or updated after `watermark`; tables missing from the
/// destination are bulk-copied instead.
///
/// A blank watermark is rejected with `InvalidWatermark` before anything is
/// opened.
pub fn incremental_refresh(
    source: impl AsRef<Path>,
    destination: impl AsRef<Path>,
    watermark: &str,
) -> Result<RunReport> {
    let watermark = Watermark::new(watermark)?;
    Replicator::new(source.as_ref(), destination.as_ref())
        .run(&ReplicationMode::Incremental(watermark))
}
