// ABOUTME: Incremental upsert of rows changed since a watermark
// ABOUTME: Last-writer-wins merge on the id column inside one destination transaction

use crate::error::{ReplicationError, Result};
use crate::olap::get_table_columns;
use crate::olap::writer::{build_upsert_query, RowWriter};
use crate::sqlite::converter::{column_kinds, normalize_row};
use crate::sqlite::reader::TableScan;
use crate::tables::ReplicatedTable;

use super::{TableAction, TableOutcome, Watermark};

/// Merge rows created or updated after `watermark` into an existing
/// destination table.
///
/// Idempotent for a fixed source snapshot: replaying the same watermark writes
/// the same values again. Rows deleted in the source are not removed.
pub fn upsert_table(
    source: &rusqlite::Connection,
    destination: &mut duckdb::Connection,
    table: ReplicatedTable,
    watermark: &Watermark,
) -> Result<TableOutcome> {
    let mut scan = TableScan::changed_since(source, table, watermark.as_str())?;
    let columns = scan.columns().to_vec();

    let key = columns
        .iter()
        .find(|c| c.eq_ignore_ascii_case("id"))
        .cloned()
        .ok_or_else(|| ReplicationError::NoIdentityColumn {
            table: table.to_string(),
        })?;

    let destination_columns = get_table_columns(destination, table)?;
    let kinds = column_kinds(&columns, &destination_columns);
    let upsert = build_upsert_query(table.as_str(), &key, &columns);

    let tx = destination
        .transaction()
        .map_err(|e| ReplicationError::destination_failure(table.as_str(), "begin transaction", e))?;

    let rows = {
        let mut writer = RowWriter::prepare(&tx, table, &upsert)?;
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

    tracing::info!(table = %table, rows, watermark = %watermark, "Upserted changed rows");

    Ok(TableOutcome {
        table,
        action: TableAction::Upsert,
        rows,
    })
}
