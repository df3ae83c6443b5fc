// ABOUTME: SQLite-to-DuckDB DDL translation through an explicit type map
// ABOUTME: Renders a parsed table definition as a DuckDB CREATE TABLE statement

use super::{ColumnDefinition, TableDefinition};
use crate::tables::ReplicatedTable;
use crate::utils::{quote_ident, replace_case_insensitive};

/// SQLite declared type names that DuckDB spells differently.
///
/// Matched against the declared type's base name (before any `(args)`),
/// ignoring case. Anything not listed passes through unchanged.
const TYPE_RENAMES: &[(&str, &str)] = &[
    ("DATETIME", "TIMESTAMP"),
    ("CLOB", "VARCHAR"),
    ("NVARCHAR", "VARCHAR"),
    ("NCHAR", "VARCHAR"),
    ("NATIVE CHARACTER", "VARCHAR"),
    ("VARYING CHARACTER", "VARCHAR"),
    ("MEDIUMINT", "INTEGER"),
    ("UNSIGNED BIG INT", "UBIGINT"),
];

/// Map a SQLite declared column type to its DuckDB spelling.
///
/// Columns declared without a type (legal in SQLite) become VARCHAR.
pub fn map_column_type(declared: &str) -> String {
    let declared = declared.trim();
    if declared.is_empty() {
        return "VARCHAR".to_string();
    }

    let (base, args) = match declared.find('(') {
        Some(pos) => (declared[..pos].trim(), &declared[pos..]),
        None => (declared, ""),
    };
    let base = base.split_whitespace().collect::<Vec<_>>().join(" ");

    TYPE_RENAMES
        .iter()
        .find(|(from, _)| from.eq_ignore_ascii_case(&base))
        .map(|(_, to)| format!("{}{}", to, args))
        .unwrap_or_else(|| declared.to_string())
}

/// Translate a source table definition into a DuckDB `CREATE TABLE` statement.
///
/// Applied rules:
/// - AUTOINCREMENT is dropped
/// - `DEFAULT CURRENT_TIMESTAMP` (and any other non-literal default) is dropped;
///   the copier writes every value explicitly
/// - DATETIME becomes TIMESTAMP, along with the other entries of the type map
/// - an `INTEGER PRIMARY KEY` column takes the table's identity type
/// - foreign keys, UNIQUE, CHECK, and COLLATE are dropped
///
/// If the source declares no primary key but has an `id` column, `id` becomes
/// the primary key so incremental upserts have a conflict target.
///
/// Definitions that cannot be parsed fall back to [`rewrite_schema_text`].
pub fn translate_schema(source_sql: &str, table: ReplicatedTable) -> String {
    match TableDefinition::parse(source_sql) {
        Some(definition) => render_duckdb_table(&definition, table),
        None => {
            tracing::warn!(
                "Could not parse definition of '{}', falling back to text rewrite",
                table
            );
            rewrite_schema_text(source_sql)
        }
    }
}

fn render_duckdb_table(definition: &TableDefinition, table: ReplicatedTable) -> String {
    let promote_id = !definition.has_primary_key();
    if promote_id && definition.identity_column().is_some() {
        tracing::debug!(
            "Table '{}' declares no primary key; using 'id' as the destination key",
            table
        );
    }

    let mut lines: Vec<String> = definition
        .columns
        .iter()
        .map(|column| {
            let is_key = column.primary_key
                || (promote_id && column.name.eq_ignore_ascii_case("id"));
            render_column(column, is_key, table)
        })
        .collect();

    if !definition.composite_key.is_empty() {
        let cols: Vec<String> = definition
            .composite_key
            .iter()
            .map(|c| quote_ident(c))
            .collect();
        lines.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    format!(
        "CREATE TABLE {} (\n    {}\n)",
        quote_ident(table.as_str()),
        lines.join(",\n    ")
    )
}

fn render_column(column: &ColumnDefinition, is_key: bool, table: ReplicatedTable) -> String {
    let is_integer_key = column.primary_key
        && column
            .declared_type
            .trim()
            .eq_ignore_ascii_case("INTEGER");

    let column_type = if is_integer_key {
        table.identity_type().to_string()
    } else {
        map_column_type(&column.declared_type)
    };

    let mut rendered = format!("{} {}", quote_ident(&column.name), column_type);
    if is_key {
        rendered.push_str(" PRIMARY KEY");
    } else if column.not_null {
        rendered.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        rendered.push_str(" DEFAULT ");
        rendered.push_str(default);
    }
    rendered
}

/// Literal substring rewrite of a SQLite definition, case-insensitive:
/// 1. strip ` AUTOINCREMENT`
/// 2. strip ` DEFAULT CURRENT_TIMESTAMP`
/// 3. `DATETIME` → `TIMESTAMP`
/// 4. `INTEGER PRIMARY KEY` → `BIGINT PRIMARY KEY`
///
/// Kept for unparseable definitions and for side-by-side display in
/// `status --show-ddl`. Constraints are passed through untouched.
pub fn rewrite_schema_text(source_sql: &str) -> String {
    let sql = replace_case_insensitive(source_sql, " AUTOINCREMENT", "");
    let sql = replace_case_insensitive(&sql, " DEFAULT CURRENT_TIMESTAMP", "");
    let sql = replace_case_insensitive(&sql, "DATETIME", "TIMESTAMP");
    replace_case_insensitive(&sql, "INTEGER PRIMARY KEY", "BIGINT PRIMARY KEY")
}
