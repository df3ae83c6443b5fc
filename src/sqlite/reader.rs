// ABOUTME: SQLite table introspection and row cursors
// ABOUTME: Lists and counts tables, and streams full or changed-since row sets one row at a time

use rusqlite::{Connection, Row, Statement};

use crate::error::{ReplicationError, Result};
use crate::tables::ReplicatedTable;
use crate::utils::quote_ident;

/// List all user tables in a SQLite database
///
/// Queries sqlite_master for user-created tables, skipping the `sqlite_*`
/// internal tables (sqlite_sequence, sqlite_stat1, etc.).
///
/// # Returns
///
/// Sorted vector of table names
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    tracing::debug!("Listing tables from SQLite database");

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master \
             WHERE type='table' \
             AND name NOT LIKE 'sqlite_%' \
             ORDER BY name",
        )
        .map_err(|e| ReplicationError::source_failure("sqlite_master", "list tables", e))?;

    let tables = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<String>>>())
        .map_err(|e| ReplicationError::source_failure("sqlite_master", "list tables", e))?;

    tracing::debug!("Found {} user tables in SQLite database", tables.len());

    Ok(tables)
}

/// Row count for one replicated table.
pub fn get_table_row_count(conn: &Connection, table: ReplicatedTable) -> Result<usize> {
    let query = format!("SELECT COUNT(*) FROM {}", quote_ident(table.as_str()));

    let count: i64 = conn
        .query_row(&query, [], |row| row.get(0))
        .map_err(|e| ReplicationError::source_failure(table.as_str(), "count rows", e))?;

    Ok(count as usize)
}

/// A prepared `SELECT *` over one source table.
///
/// Column names are available before any row is read, so callers can prepare
/// the matching destination statement first. Rows are then visited through a
/// cursor and never collected.
pub struct TableScan<'conn> {
    table: ReplicatedTable,
    stmt: Statement<'conn>,
    columns: Vec<String>,
    since: Option<String>,
}

impl<'conn> TableScan<'conn> {
    /// Every row of the table.
    pub fn all(conn: &'conn Connection, table: ReplicatedTable) -> Result<Self> {
        let query = format!("SELECT * FROM {}", quote_ident(table.as_str()));
        Self::prepare(conn, table, &query, None)
    }

    /// Rows created or updated strictly after `watermark`.
    ///
    /// Timestamps are compared as instants, so `2024-05-02T00:00:00` and
    /// `2024-05-02 00:00:00` are the same watermark. Values SQLite cannot read
    /// as a date fall back to a plain text comparison. A row with both
    /// columns NULL is never selected.
    pub fn changed_since(
        conn: &'conn Connection,
        table: ReplicatedTable,
        watermark: &str,
    ) -> Result<Self> {
        let query = format!(
            "SELECT * FROM {} WHERE {} OR {}",
            quote_ident(table.as_str()),
            newer_than("created_at"),
            newer_than("updated_at")
        );
        Self::prepare(conn, table, &query, Some(watermark.to_string()))
    }

    fn prepare(
        conn: &'conn Connection,
        table: ReplicatedTable,
        query: &str,
        since: Option<String>,
    ) -> Result<Self> {
        let stmt = conn
            .prepare(query)
            .map_err(|e| ReplicationError::source_failure(table.as_str(), "prepare row query", e))?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        tracing::debug!(
            "Table '{}' has {} columns: {:?}",
            table,
            columns.len(),
            columns
        );

        Ok(Self {
            table,
            stmt,
            columns,
            since,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Visit every row in cursor order, passing its 1-based position.
    ///
    /// A cursor step failure becomes `RowScan` at the position it would have
    /// had. Errors returned by `visit` stop the scan and are passed through.
    /// Returns the number of rows visited.
    pub fn for_each<F>(&mut self, mut visit: F) -> Result<usize>
    where
        F: FnMut(usize, &Row<'_>) -> Result<()>,
    {
        let table = self.table;
        let mut rows = match &self.since {
            Some(watermark) => self.stmt.query([watermark.as_str()]),
            None => self.stmt.query([]),
        }
        .map_err(|e| ReplicationError::source_failure(table.as_str(), "query rows", e))?;

        let mut row_number = 0;
        loop {
            let next = rows.next().map_err(|source| ReplicationError::RowScan {
                table: table.to_string(),
                row: row_number + 1,
                source,
            })?;
            let Some(row) = next else {
                break;
            };
            row_number += 1;
            visit(row_number, row)?;
        }

        Ok(row_number)
    }
}

/// `column > ?1` by julianday when both sides parse, by text otherwise.
///
/// Left unquoted: SQLite reads an unknown double-quoted name as a string
/// literal, and a missing column has to fail at prepare.
fn newer_than(column: &str) -> String {
    format!("COALESCE(julianday({col}) > julianday(?1), {col} > ?1)", col = column)
}
