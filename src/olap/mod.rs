// ABOUTME: Destination side of replication: the DuckDB column store
// ABOUTME: Connection handling and catalog introspection through information_schema

pub mod writer;

use std::path::Path;

use duckdb::{params, AccessMode, Config, Connection};

use crate::error::{DatabaseRole, ReplicationError, Result};
use crate::tables::ReplicatedTable;
use crate::utils::quote_ident;

/// Open (creating if needed) the destination database for writing.
pub fn open_duckdb(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    tracing::debug!("Opening destination DuckDB database at {}", path.display());

    Connection::open(path).map_err(|e| connection_error(path, e))
}

/// Open an existing destination for inspection only.
pub fn open_duckdb_read_only(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    let config = Config::default()
        .access_mode(AccessMode::ReadOnly)
        .map_err(|e| connection_error(path, e))?;

    Connection::open_with_flags(path, config).map_err(|e| connection_error(path, e))
}

fn connection_error(path: &Path, e: duckdb::Error) -> ReplicationError {
    ReplicationError::Connection {
        role: DatabaseRole::Destination,
        path: path.to_path_buf(),
        source: Box::new(e),
    }
}

/// Whether the table exists in the destination's `main` schema.
///
/// Only a zero count means absent. A failed lookup is an error, never a
/// reason to bootstrap.
pub fn table_exists(conn: &Connection, table: ReplicatedTable) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = 'main' AND table_name = ?",
            params![table.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| ReplicationError::destination_failure(table.as_str(), "check existence", e))?;

    Ok(count > 0)
}

/// Column metadata for a destination table.
///
/// Returns (column_name, data_type) pairs in declaration order.
pub fn get_table_columns(conn: &Connection, table: ReplicatedTable) -> Result<Vec<(String, String)>> {
    let fail = |e| ReplicationError::destination_failure(table.as_str(), "read columns", e);

    let mut stmt = conn
        .prepare(
            "SELECT column_name, data_type
             FROM information_schema.columns
             WHERE table_schema = 'main' AND table_name = ?
             ORDER BY ordinal_position",
        )
        .map_err(fail)?;

    let columns = stmt
        .query_map(params![table.as_str()], |row| {
            let name: String = row.get(0)?;
            let dtype: String = row.get(1)?;
            Ok((name, dtype))
        })
        .map_err(fail)?
        .collect::<duckdb::Result<Vec<_>>>()
        .map_err(fail)?;

    Ok(columns)
}

pub fn get_table_row_count(conn: &Connection, table: ReplicatedTable) -> Result<usize> {
    let query = format!("SELECT COUNT(*) FROM {}", quote_ident(table.as_str()));
    let count: i64 = conn
        .query_row(&query, [], |row| row.get(0))
        .map_err(|e| ReplicationError::destination_failure(table.as_str(), "count rows", e))?;
    Ok(count as usize)
}
