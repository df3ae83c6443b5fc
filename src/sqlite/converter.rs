// ABOUTME: SQLite value normalization for binding into DuckDB statements
// ABOUTME: Maps loosely typed SQLite values onto the destination column's kind, BLOBs as UTF-8 or base64

use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use duckdb::types::{TimeUnit, ToSqlOutput, Value as DuckValue, ValueRef};
use rusqlite::types::Value as SqliteValue;

/// Broad class of a destination column, derived once per column from its
/// declared DuckDB type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
    Boolean,
    Timestamp,
    Blob,
    /// Anything else (DATE, DECIMAL, ...). Values bind as-is and DuckDB casts.
    Any,
}

impl ColumnKind {
    /// Classify a declared type name by substring, the way SQLite assigns
    /// column affinity.
    pub fn from_declared_type(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();

        if upper.contains("BOOL") {
            ColumnKind::Boolean
        } else if upper.contains("TIMESTAMP") || upper.contains("DATETIME") {
            ColumnKind::Timestamp
        } else if upper.contains("INTERVAL") {
            ColumnKind::Any
        } else if upper.contains("INT") {
            ColumnKind::Integer
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            ColumnKind::Float
        } else if ["CHAR", "TEXT", "CLOB", "STRING"]
            .iter()
            .any(|t| upper.contains(t))
        {
            ColumnKind::Text
        } else if upper.contains("BLOB") || upper.contains("BYTEA") {
            ColumnKind::Blob
        } else {
            ColumnKind::Any
        }
    }
}

/// Column kinds for a source cursor, looked up by name in the destination
/// table's `(name, data_type)` list. Unmatched columns get `Any`.
pub fn column_kinds(source_columns: &[String], destination: &[(String, String)]) -> Vec<ColumnKind> {
    source_columns
        .iter()
        .map(|name| {
            destination
                .iter()
                .find(|(dest_name, _)| dest_name.eq_ignore_ascii_case(name))
                .map(|(_, data_type)| ColumnKind::from_declared_type(data_type))
                .unwrap_or(ColumnKind::Any)
        })
        .collect()
}

/// A source value in the form it is bound to the destination.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    Blob(Vec<u8>),
}

impl duckdb::ToSql for NormalizedValue {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        Ok(match self {
            NormalizedValue::Null => ToSqlOutput::Owned(DuckValue::Null),
            NormalizedValue::Integer(i) => ToSqlOutput::Owned(DuckValue::BigInt(*i)),
            NormalizedValue::Float(f) => ToSqlOutput::Owned(DuckValue::Double(*f)),
            NormalizedValue::Boolean(b) => ToSqlOutput::Owned(DuckValue::Boolean(*b)),
            NormalizedValue::Timestamp(ts) => ToSqlOutput::Owned(DuckValue::Timestamp(
                TimeUnit::Microsecond,
                ts.and_utc().timestamp_micros(),
            )),
            NormalizedValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            NormalizedValue::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
        })
    }
}

/// Convert one SQLite value for a column of the given kind.
///
/// Mapping:
/// - NULL stays NULL for every kind
/// - Boolean: numbers are `!= 0`; text accepts true/false/t/f/1/0
/// - Timestamp: text in `YYYY-MM-DD[ T]HH:MM:SS[.f]`, RFC 3339 or `YYYY-MM-DD`;
///   integers and reals are Unix seconds
/// - Float: integers widen to f64
/// - Text: BLOBs become UTF-8 text, or base64 when not valid UTF-8
/// - Blob: text is bound as its bytes
///
/// Anything that does not fit its kind passes through unchanged and DuckDB
/// decides whether it can be cast.
pub fn normalize_value(value: SqliteValue, kind: ColumnKind) -> NormalizedValue {
    match (kind, value) {
        (_, SqliteValue::Null) => NormalizedValue::Null,

        (ColumnKind::Boolean, SqliteValue::Integer(i)) => NormalizedValue::Boolean(i != 0),
        (ColumnKind::Boolean, SqliteValue::Real(f)) => NormalizedValue::Boolean(f != 0.0),
        (ColumnKind::Boolean, SqliteValue::Text(s)) => match parse_bool(&s) {
            Some(b) => NormalizedValue::Boolean(b),
            None => NormalizedValue::Text(s),
        },

        (ColumnKind::Timestamp, SqliteValue::Text(s)) => match parse_timestamp(&s) {
            Some(ts) => NormalizedValue::Timestamp(ts),
            None => NormalizedValue::Text(s),
        },
        (ColumnKind::Timestamp, SqliteValue::Integer(secs)) => {
            match DateTime::from_timestamp(secs, 0) {
                Some(dt) => NormalizedValue::Timestamp(dt.naive_utc()),
                None => NormalizedValue::Integer(secs),
            }
        }
        (ColumnKind::Timestamp, SqliteValue::Real(secs)) => {
            let whole = secs.trunc();
            let nanos = ((secs - whole) * 1e9).round() as u32;
            match DateTime::from_timestamp(whole as i64, nanos) {
                Some(dt) => NormalizedValue::Timestamp(dt.naive_utc()),
                None => NormalizedValue::Float(secs),
            }
        }

        (ColumnKind::Float, SqliteValue::Integer(i)) => NormalizedValue::Float(i as f64),

        (ColumnKind::Text, SqliteValue::Blob(bytes)) => match String::from_utf8(bytes) {
            Ok(text) => NormalizedValue::Text(text),
            Err(e) => NormalizedValue::Text(
                base64::engine::general_purpose::STANDARD.encode(e.into_bytes()),
            ),
        },

        (ColumnKind::Blob, SqliteValue::Text(s)) => NormalizedValue::Blob(s.into_bytes()),

        (_, value) => natural(value),
    }
}

/// Fill `buf` with the normalized values of one source row.
///
/// The buffer is cleared first and reused across rows; `kinds` has one entry
/// per cursor column.
pub fn normalize_row(
    row: &rusqlite::Row<'_>,
    kinds: &[ColumnKind],
    buf: &mut Vec<NormalizedValue>,
) -> rusqlite::Result<()> {
    buf.clear();
    for (idx, kind) in kinds.iter().enumerate() {
        let value: SqliteValue = row.get(idx)?;
        buf.push(normalize_value(value, *kind));
    }
    Ok(())
}

fn natural(value: SqliteValue) -> NormalizedValue {
    match value {
        SqliteValue::Null => NormalizedValue::Null,
        SqliteValue::Integer(i) => NormalizedValue::Integer(i),
        SqliteValue::Real(f) => NormalizedValue::Float(f),
        SqliteValue::Text(s) => NormalizedValue::Text(s),
        SqliteValue::Blob(b) => NormalizedValue::Blob(b),
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "1" => Some(true),
        "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

/// Parse the timestamp spellings SQLite applications commonly store.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
