// ABOUTME: Error taxonomy for SQLite-to-DuckDB replication runs
// ABOUTME: Every variant names the table it concerns so run failures are attributable

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Boxed driver error used where either database can be the origin.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which side of the replication a connection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseRole {
    Source,
    Destination,
}

impl fmt::Display for DatabaseRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseRole::Source => write!(f, "source SQLite"),
            DatabaseRole::Destination => write!(f, "destination DuckDB"),
        }
    }
}

/// The per-table operation that was running when an error happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Copy,
    Upsert,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Copy => write!(f, "copy"),
            Phase::Upsert => write!(f, "upsert"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ReplicationError {
    /// Either database could not be opened.
    #[error("failed to open {role} database at {}: {source}", .path.display())]
    Connection {
        role: DatabaseRole,
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// The table has no definition in the source catalog.
    #[error("table '{table}' was not found in the source catalog")]
    SchemaNotFound { table: String },

    /// DuckDB rejected the translated DDL. The statement is kept because the
    /// translation is where most of these originate.
    #[error("destination rejected schema for '{table}': {source}\n  statement: {statement}")]
    SchemaApply {
        table: String,
        statement: String,
        #[source]
        source: duckdb::Error,
    },

    #[error("failed to read row {row} of '{table}' from source: {source}")]
    RowScan {
        table: String,
        row: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to write row {row} of '{table}' to destination: {source}")]
    RowInsert {
        table: String,
        row: usize,
        #[source]
        source: duckdb::Error,
    },

    #[error("table '{table}' has no 'id' column to resolve conflicts on")]
    NoIdentityColumn { table: String },

    #[error("unknown table '{name}' (replicated tables: {})", crate::tables::ReplicatedTable::names().join(", "))]
    UnknownTable { name: String },

    #[error("invalid watermark '{value}': must be a non-empty timestamp string")]
    InvalidWatermark { value: String },

    /// A source statement failed outside of row iteration.
    #[error("source error on '{table}' while trying to {action}: {source}")]
    Source {
        table: String,
        action: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// A destination statement failed outside of row iteration.
    #[error("destination error on '{table}' while trying to {action}: {source}")]
    Destination {
        table: String,
        action: &'static str,
        #[source]
        source: duckdb::Error,
    },

    /// Wraps a table-level failure with its position in the run.
    #[error(
        "run failed at table '{table}' (index {index}, {phase}); {}",
        describe_applied(.applied)
    )]
    TableFailed {
        table: String,
        index: usize,
        phase: Phase,
        applied: Vec<String>,
        #[source]
        source: Box<ReplicationError>,
    },
}

fn describe_applied(applied: &[String]) -> String {
    if applied.is_empty() {
        "no tables were applied".to_string()
    } else {
        format!("tables before it are already applied: {}", applied.join(", "))
    }
}

impl ReplicationError {
    pub(crate) fn source_failure(
        table: &str,
        action: &'static str,
        source: rusqlite::Error,
    ) -> Self {
        ReplicationError::Source {
            table: table.to_string(),
            action,
            source,
        }
    }

    pub(crate) fn destination_failure(
        table: &str,
        action: &'static str,
        source: duckdb::Error,
    ) -> Self {
        ReplicationError::Destination {
            table: table.to_string(),
            action,
            source,
        }
    }

    /// Table the error concerns, when it concerns one.
    pub fn table(&self) -> Option<&str> {
        match self {
            ReplicationError::SchemaNotFound { table }
            | ReplicationError::SchemaApply { table, .. }
            | ReplicationError::RowScan { table, .. }
            | ReplicationError::RowInsert { table, .. }
            | ReplicationError::NoIdentityColumn { table }
            | ReplicationError::Source { table, .. }
            | ReplicationError::Destination { table, .. }
            | ReplicationError::TableFailed { table, .. } => Some(table),
            ReplicationError::Connection { .. }
            | ReplicationError::UnknownTable { .. }
            | ReplicationError::InvalidWatermark { .. } => None,
        }
    }

    /// The innermost replication error, unwrapping `TableFailed`.
    pub fn root(&self) -> &ReplicationError {
        match self {
            ReplicationError::TableFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, ReplicationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_failed_message_lists_applied_tables() {
        let err = ReplicationError::TableFailed {
            table: "species".to_string(),
            index: 2,
            phase: Phase::Copy,
            applied: vec!["eggs".to_string(), "inventory_actions".to_string()],
            source: Box::new(ReplicationError::SchemaNotFound {
                table: "species".to_string(),
            }),
        };

        let message = err.to_string();
        assert!(message.contains("run failed at table 'species'"));
        assert!(message.contains("copy"));
        assert!(message.contains("eggs, inventory_actions"));
        assert_eq!(err.table(), Some("species"));
        assert!(matches!(err.root(), ReplicationError::SchemaNotFound { .. }));
    }

    #[test]
    fn table_failed_on_first_table_reports_nothing_applied() {
        let err = ReplicationError::TableFailed {
            table: "eggs".to_string(),
            index: 0,
            phase: Phase::Upsert,
            applied: Vec::new(),
            source: Box::new(ReplicationError::NoIdentityColumn {
                table: "eggs".to_string(),
            }),
        };
        assert!(err.to_string().contains("no tables were applied"));
    }

    #[test]
    fn unknown_table_lists_known_names() {
        let err = ReplicationError::UnknownTable {
            name: "chickens".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("chickens"));
        assert!(message.contains("inventory_actions"));
    }
}
