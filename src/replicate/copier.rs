// ABOUTME: Bulk copy of one table: drop, recreate from the translated source schema, stream rows
// ABOUTME: All rows land in a single destination transaction or none do

use crate::error::{ReplicationError, Result};
use crate::olap::get_table_columns;
use crate::olap::writer::{build_insert_query, replace_table, RowWriter};
use crate::schema::translate_schema;
use crate::sqlite::converter::{column_kinds, normalize_row};
use crate::sqlite::read_table_schema;
use crate::sqlite::reader::TableScan;
use crate::tables::ReplicatedTable;

use super::{TableAction, TableOutcome};

/// Replace the destination copy of `table` with the current source contents.
///
/// The schema is re-read from the source catalog on every call, so source
/// DDL changes carry over on the next full copy. The drop and create run
/// outside the row transaction; a failure while streaming rows leaves the
/// table empty rather than half-filled.
pub fn copy_table(
    source: &rusqlite::Connection,
    destination: &mut duckdb::Connection,
    table: ReplicatedTable,
) -> Result<TableOutcome> {
    let source_sql = read_table_schema(source, table)?;
    let ddl = translate_schema(&source_sql, table);
    tracing::debug!(table = %table, ddl = %ddl, "Translated source schema");

    copy_with_ddl(source, destination, table, &ddl)
}

/// Recreate `table` from `ddl` and stream every source row into it.
///
/// Rows are inserted by source column name. A destination with a different
/// column count only warns: extra destination columns are left NULL, and a
/// source column the destination lacks fails the insert.
fn copy_with_ddl(
    source: &rusqlite::Connection,
    destination: &mut duckdb::Connection,
    table: ReplicatedTable,
    ddl: &str,
) -> Result<TableOutcome> {
    replace_table(destination, table, ddl)?;

    let mut scan = TableScan::all(source, table)?;
    let columns = scan.columns().to_vec();

    let destination_columns = get_table_columns(destination, table)?;
    if destination_columns.len() != columns.len() {
        tracing::warn!(
            "Column count mismatch for '{}': source has {}, destination has {}",
            table,
            columns.len(),
            destination_columns.len()
        );
    }
    let kinds = column_kinds(&columns, &destination_columns);
    let insert = build_insert_query(table.as_str(), &columns);

    let tx = destination
        .transaction()
        .map_err(|e| ReplicationError::destination_failure(table.as_str(), "begin transaction", e))?;

    let rows = {
        let mut writer = RowWriter::prepare(&tx, table, &insert)?;
        let mut values = Vec::with_capacity(columns.len());
        scan.for_each(|row_number, row| {
            normalize_row(row, &kinds, &mut values).map_err(|source| {
                ReplicationError::RowScan {
                    table: table.to_string(),
                    row: row_number,
                    source,
                }
            })?;
            writer.write(row_number, &values)
        })?
    };

    tx.commit()
        .map_err(|e| ReplicationError::destination_failure(table.as_str(), "commit", e))?;

    tracing::info!(table = %table, rows, "Copied table");

    Ok(TableOutcome {
        table,
        action: TableAction::BulkCopy,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_with(sql: &str) -> (tempfile::TempDir, rusqlite::Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = rusqlite::Connection::open(dir.path().join("src.db")).unwrap();
        conn.execute_batch(sql).unwrap();
        (dir, conn)
    }

    #[test]
    fn copies_rows_and_converts_types() {
        let (_dir, source) = source_with(
            "CREATE TABLE eggs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                species TEXT,
                deleted BOOLEAN,
                laid_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            INSERT INTO eggs (species, deleted, laid_at) VALUES ('Chicken', 0, '2024-05-01 08:00:00');
            INSERT INTO eggs (species, deleted, laid_at) VALUES ('Duck', 1, '2024-05-02T09:30:00');",
        );
        let mut destination = duckdb::Connection::open_in_memory().unwrap();

        let outcome = copy_table(&source, &mut destination, ReplicatedTable::Eggs).unwrap();
        assert_eq!(outcome.rows, 2);
        assert_eq!(outcome.action, TableAction::BulkCopy);

        let (species, deleted, laid_at): (String, bool, String) = destination
            .query_row(
                "SELECT species, deleted, CAST(laid_at AS VARCHAR) FROM eggs WHERE id = 2",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(species, "Duck");
        assert!(deleted);
        assert_eq!(laid_at, "2024-05-02 09:30:00");
    }

    #[test]
    fn column_count_mismatch_warns_and_copies() {
        let (_dir, source) = source_with(
            "CREATE TABLE coops (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO coops VALUES (1, 'North');
             INSERT INTO coops VALUES (2, 'South');",
        );
        let mut destination = duckdb::Connection::open_in_memory().unwrap();
        let ddl = crate::schema::rewrite_schema_text(
            "CREATE TABLE coops (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, notes TEXT)",
        );

        let outcome =
            copy_with_ddl(&source, &mut destination, ReplicatedTable::Coops, &ddl).unwrap();
        assert_eq!(outcome.rows, 2);

        let (name, notes): (String, Option<String>) = destination
            .query_row("SELECT name, notes FROM coops WHERE id = 2", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "South");
        assert_eq!(notes, None);
    }

    #[test]
    fn missing_source_table_is_schema_not_found() {
        let (_dir, source) = source_with("CREATE TABLE coops (id INTEGER PRIMARY KEY)");
        let mut destination = duckdb::Connection::open_in_memory().unwrap();

        let err = copy_table(&source, &mut destination, ReplicatedTable::Species).unwrap_err();
        assert!(matches!(err, ReplicationError::SchemaNotFound { .. }));
    }

    #[test]
    fn failing_row_rolls_back_whole_table() {
        // SQLite allows duplicate ids without a declared key; the promoted key rejects them.
        let (_dir, source) = source_with(
            "CREATE TABLE coops (id INTEGER, name TEXT);
             INSERT INTO coops VALUES (1, 'North');
             INSERT INTO coops VALUES (2, 'South');
             INSERT INTO coops VALUES (2, 'Duplicate');",
        );
        let mut destination = duckdb::Connection::open_in_memory().unwrap();

        let err = copy_table(&source, &mut destination, ReplicatedTable::Coops).unwrap_err();
        match err {
            ReplicationError::RowInsert { table, row, .. } => {
                assert_eq!(table, "coops");
                assert_eq!(row, 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        let count: i64 = destination
            .query_row("SELECT COUNT(*) FROM coops", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
