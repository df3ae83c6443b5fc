// ABOUTME: Status command comparing source and destination table by table
// ABOUTME: Optionally prints the DuckDB DDL each source definition translates to

use anyhow::{Context, Result};

use crate::config::ReplicatorConfig;
use crate::error::ReplicationError;
use crate::olap;
use crate::schema::{rewrite_schema_text, translate_schema};
use crate::sqlite::{self, reader};
use crate::state;
use crate::tables::ReplicatedTable;

pub fn status(config: &ReplicatorConfig, show_ddl: bool) -> Result<()> {
    let source = sqlite::open_sqlite(&config.source).context("Cannot inspect source")?;
    let source_tables = reader::list_tables(&source)?;

    let destination = if config.destination.exists() {
        Some(olap::open_duckdb_read_only(&config.destination).context("Cannot inspect destination")?)
    } else {
        None
    };

    println!("Source:      {}", config.source.display());
    match &destination {
        Some(_) => println!("Destination: {}", config.destination.display()),
        None => println!("Destination: {} (not created yet)", config.destination.display()),
    }

    let state_path = super::state_path(config)?;
    match state::load(&state_path)?.last_watermark {
        Some(watermark) => println!("Watermark:   {}", watermark),
        None => println!("Watermark:   not set"),
    }
    println!();
    println!("  {:<20} {:>12} {:>12}", "table", "source rows", "dest rows");

    for table in &config.tables {
        let source_rows = if source_tables.iter().any(|t| t == table.as_str()) {
            reader::get_table_row_count(&source, *table)?.to_string()
        } else {
            "missing".to_string()
        };

        let destination_rows = match &destination {
            Some(conn) if olap::table_exists(conn, *table)? => {
                olap::get_table_row_count(conn, *table)?.to_string()
            }
            _ => "absent".to_string(),
        };

        println!(
            "  {:<20} {:>12} {:>12}",
            table.as_str(),
            source_rows,
            destination_rows
        );
    }

    if show_ddl {
        for table in &config.tables {
            let Some(source_sql) = source_schema(&source, *table)? else {
                continue;
            };
            println!();
            println!("-- {}: structural translation", table);
            println!("{};", translate_schema(&source_sql, *table));
            println!("-- {}: literal rewrite", table);
            println!("{};", rewrite_schema_text(&source_sql));
        }
    }

    Ok(())
}

/// The table's source DDL, or `None` when the source has no such table.
fn source_schema(conn: &rusqlite::Connection, table: ReplicatedTable) -> Result<Option<String>> {
    match sqlite::read_table_schema(conn, table) {
        Ok(sql) => Ok(Some(sql)),
        Err(ReplicationError::SchemaNotFound { .. }) => Ok(None),
        Err(e) => Err(e).with_context(|| format!("Cannot read schema of {}", table)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_table_has_no_source_schema() {
        let dir = tempfile::tempdir().unwrap();
        let conn = rusqlite::Connection::open(dir.path().join("source.db")).unwrap();
        conn.execute_batch("CREATE TABLE coops (id INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();

        assert!(source_schema(&conn, ReplicatedTable::Coops).unwrap().is_some());
        assert!(source_schema(&conn, ReplicatedTable::Eggs).unwrap().is_none());
    }

    #[test]
    fn unreadable_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.db");
        std::fs::write(&path, vec![0x5a; 4096]).unwrap();
        let conn = rusqlite::Connection::open(&path).unwrap();

        let err = source_schema(&conn, ReplicatedTable::Eggs).unwrap_err();
        assert!(err.to_string().contains("eggs"));
    }
}
