// ABOUTME: Statement builders and row writer for the DuckDB destination
// ABOUTME: Plain INSERT for bulk copies, INSERT ... ON CONFLICT DO UPDATE for incremental upserts

use duckdb::{params_from_iter, Connection, Statement};

use crate::error::{ReplicationError, Result};
use crate::sqlite::converter::NormalizedValue;
use crate::tables::ReplicatedTable;
use crate::utils::{column_list, placeholders, quote_ident};

/// Drop the destination table if present and create it from `ddl`.
///
/// A rejected `CREATE` carries the exact statement that failed.
pub fn replace_table(conn: &Connection, table: ReplicatedTable, ddl: &str) -> Result<()> {
    let drop = format!("DROP TABLE IF EXISTS {}", quote_ident(table.as_str()));
    conn.execute_batch(&drop)
        .map_err(|e| ReplicationError::destination_failure(table.as_str(), "drop table", e))?;

    conn.execute_batch(ddl)
        .map_err(|source| ReplicationError::SchemaApply {
            table: table.to_string(),
            statement: ddl.to_string(),
            source,
        })?;

    tracing::debug!("Recreated destination table '{}'", table);
    Ok(())
}

/// Build a single-row insert:
/// ```sql
/// INSERT INTO "table" ("col1", "col2") VALUES (?, ?)
/// ```
pub fn build_insert_query(table: &str, columns: &[String]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        column_list(columns),
        placeholders(columns.len())
    )
}

/// Build a single-row upsert keyed on `key_column`.
///
/// Generates a query like:
/// ```sql
/// INSERT INTO "table" ("id", "col2", "col3") VALUES (?, ?, ?)
/// ON CONFLICT ("id") DO UPDATE SET
///   "col2" = EXCLUDED."col2",
///   "col3" = EXCLUDED."col3"
/// ```
/// Every non-key column is overwritten, so the last write wins. When the key
/// is the only column the conflict clause is `DO NOTHING`.
pub fn build_upsert_query(table: &str, key_column: &str, columns: &[String]) -> String {
    let update_columns: Vec<String> = columns
        .iter()
        .filter(|c| c.as_str() != key_column)
        .map(|c| format!("{} = EXCLUDED.{}", quote_ident(c), quote_ident(c)))
        .collect();

    let update_clause = if update_columns.is_empty() {
        "DO NOTHING".to_string()
    } else {
        format!("DO UPDATE SET {}", update_columns.join(", "))
    };

    format!(
        "{} ON CONFLICT ({}) {}",
        build_insert_query(table, columns),
        quote_ident(key_column),
        update_clause
    )
}

/// A prepared single-row statement bound to one destination table.
pub struct RowWriter<'conn> {
    table: ReplicatedTable,
    stmt: Statement<'conn>,
}

impl<'conn> RowWriter<'conn> {
    pub fn prepare(conn: &'conn Connection, table: ReplicatedTable, sql: &str) -> Result<Self> {
        tracing::trace!("Preparing destination statement: {}", sql);
        let stmt = conn.prepare(sql).map_err(|e| {
            ReplicationError::destination_failure(table.as_str(), "prepare write statement", e)
        })?;
        Ok(Self { table, stmt })
    }

    /// Execute the statement for one row. `row` is the 1-based source position.
    pub fn write(&mut self, row: usize, values: &[NormalizedValue]) -> Result<()> {
        self.stmt
            .execute(params_from_iter(values.iter()))
            .map_err(|source| ReplicationError::RowInsert {
                table: self.table.to_string(),
                row,
                source,
            })?;
        Ok(())
    }
}
