// ABOUTME: Source side of replication: read-only SQLite access
// ABOUTME: Opens the row store and reads live table definitions from its catalog

pub mod converter;
pub mod reader;

use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension};

use crate::error::{DatabaseRole, ReplicationError, Result};
use crate::tables::ReplicatedTable;

/// Open the source database read-only.
///
/// The file must already exist; a missing path is a `Connection` error rather
/// than a silently created empty database.
pub fn open_sqlite(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    tracing::debug!("Opening source SQLite database at {}", path.display());

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| ReplicationError::Connection {
        role: DatabaseRole::Source,
        path: path.to_path_buf(),
        source: Box::new(e),
    })
}

/// Read the `CREATE TABLE` statement for a table from `sqlite_master`.
///
/// Always reads the live catalog; definitions are never cached between runs.
pub fn read_table_schema(conn: &Connection, table: ReplicatedTable) -> Result<String> {
    let sql: Option<Option<String>> = conn
        .query_row(
            "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table.as_str()],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| ReplicationError::source_failure(table.as_str(), "read table definition", e))?;

    match sql.flatten() {
        Some(sql) => Ok(sql),
        None => Err(ReplicationError::SchemaNotFound {
            table: table.to_string(),
        }),
    }
}
