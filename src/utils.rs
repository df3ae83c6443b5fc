// ABOUTME: SQL text helpers shared by the source reader and destination writer
// ABOUTME: Identifier quoting, placeholder lists, and case-insensitive rewriting

/// Quote a SQL identifier (table, column)
///
/// Escapes embedded quotes and wraps the identifier in double quotes. Both
/// SQLite and DuckDB accept this form.
///
/// # Examples
///
/// ```
/// use duckdb_replicator::utils::quote_ident;
/// assert_eq!(quote_ident("eggs"), "\"eggs\"");
/// assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
/// ```
pub fn quote_ident(identifier: &str) -> String {
    let mut quoted = String::with_capacity(identifier.len() + 2);
    quoted.push('"');
    for ch in identifier.chars() {
        if ch == '"' {
            quoted.push('"');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

/// Quote and join column names for an INSERT column list.
pub fn column_list(columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Positional placeholders for a single-row VALUES clause: `?, ?, ?`
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Replace every occurrence of `needle` in `haystack`, ignoring ASCII case.
///
/// # Examples
///
/// ```
/// use duckdb_replicator::utils::replace_case_insensitive;
/// assert_eq!(
///     replace_case_insensitive("created DateTime, updated datetime", "DATETIME", "TIMESTAMP"),
///     "created TIMESTAMP, updated TIMESTAMP"
/// );
/// ```
pub fn replace_case_insensitive(haystack: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }

    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();

    let mut result = String::with_capacity(haystack.len());
    let mut start = 0;
    while let Some(offset) = lower_haystack[start..].find(&lower_needle) {
        let idx = start + offset;
        result.push_str(&haystack[start..idx]);
        result.push_str(replacement);
        start = idx + needle.len();
    }
    result.push_str(&haystack[start..]);
    result
}
