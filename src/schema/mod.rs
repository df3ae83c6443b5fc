// ABOUTME: Structural model of a SQLite CREATE TABLE statement
// ABOUTME: Parses catalog DDL into columns and constraint flags for translation

pub mod translate;

pub use translate::{map_column_type, rewrite_schema_text, translate_schema};

/// One column of a parsed table definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub name: String,
    /// Declared type as written in the source, empty when omitted.
    pub declared_type: String,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub not_null: bool,
    /// Literal default value. Expression defaults are not carried.
    pub default: Option<String>,
}

impl ColumnDefinition {
    fn new(name: String) -> Self {
        Self {
            name,
            declared_type: String::new(),
            primary_key: false,
            autoincrement: false,
            not_null: false,
            default: None,
        }
    }
}

/// A parsed `CREATE TABLE` statement.
///
/// Only the parts that survive translation are kept: column names, declared
/// types, primary key, NOT NULL, and literal defaults. Foreign keys, unique and
/// check constraints, and collations are recognized and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: String,
    pub columns: Vec<ColumnDefinition>,
    /// Table-level primary key spanning more than one column.
    pub composite_key: Vec<String>,
}

impl TableDefinition {
    /// Parse the `sql` text stored in `sqlite_master`.
    ///
    /// Returns `None` when the statement has no column list to parse.
    pub fn parse(sql: &str) -> Option<Self> {
        let sql = strip_comments(sql);
        let open = find_top_level(&sql, '(')?;
        let close = matching_paren(&sql, open)?;

        let name = table_name_from_header(&sql[..open])?;
        let body = &sql[open + 1..close];

        let mut columns: Vec<ColumnDefinition> = Vec::new();
        let mut table_key: Vec<String> = Vec::new();

        for part in split_top_level(body, ',') {
            let tokens = tokenize(&part);
            if tokens.is_empty() {
                continue;
            }
            if is_table_constraint(&tokens) {
                if let Some(cols) = table_primary_key(&tokens) {
                    table_key = cols;
                }
                continue;
            }
            columns.push(parse_column(&tokens));
        }

        if columns.is_empty() {
            return None;
        }

        let mut composite_key = Vec::new();
        match table_key.len() {
            0 => {}
            1 => {
                let key = &table_key[0];
                if let Some(col) = columns
                    .iter_mut()
                    .find(|c| c.name.eq_ignore_ascii_case(key))
                {
                    col.primary_key = true;
                }
            }
            _ => composite_key = table_key,
        }

        Some(Self {
            name,
            columns,
            composite_key,
        })
    }

    /// The column literally named `id`, ignoring case.
    pub fn identity_column(&self) -> Option<&ColumnDefinition> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case("id"))
    }

    pub fn has_primary_key(&self) -> bool {
        !self.composite_key.is_empty() || self.columns.iter().any(|c| c.primary_key)
    }
}

fn table_name_from_header(header: &str) -> Option<String> {
    let tokens = tokenize(header);
    let table_pos = tokens
        .iter()
        .position(|t| t.eq_ignore_ascii_case("TABLE"))?;
    let raw = tokens[table_pos + 1..]
        .iter()
        .filter(|t| {
            !["IF", "NOT", "EXISTS"]
                .iter()
                .any(|kw| t.eq_ignore_ascii_case(kw))
        })
        .last()?;
    let unqualified = raw.rsplit('.').next().unwrap_or(raw);
    Some(unquote(unqualified))
}

fn is_table_constraint(tokens: &[String]) -> bool {
    matches!(
        keyword(&tokens[0]).as_str(),
        "CONSTRAINT" | "PRIMARY" | "UNIQUE" | "CHECK" | "FOREIGN"
    )
}

/// Columns of a table-level `PRIMARY KEY (...)`, if this constraint is one.
fn table_primary_key(tokens: &[String]) -> Option<Vec<String>> {
    let mut idx = 0;
    if keyword(&tokens[0]) == "CONSTRAINT" {
        idx = 2;
    }
    if tokens.get(idx).map(|t| keyword(t)) != Some("PRIMARY".to_string()) {
        return None;
    }
    let rest = tokens[idx..].join(" ");
    let open = rest.find('(')?;
    let close = matching_paren(&rest, open)?;
    let cols = split_top_level(&rest[open + 1..close], ',')
        .into_iter()
        .filter_map(|c| tokenize(&c).into_iter().next())
        .map(|c| unquote(&c))
        .collect();
    Some(cols)
}

fn parse_column(tokens: &[String]) -> ColumnDefinition {
    let mut column = ColumnDefinition::new(unquote(&tokens[0]));

    let mut idx = 1;
    let mut type_tokens = Vec::new();
    while idx < tokens.len() && !is_column_constraint_start(&tokens[idx]) {
        type_tokens.push(tokens[idx].as_str());
        idx += 1;
    }
    column.declared_type = type_tokens.join(" ");

    while idx < tokens.len() {
        let kw = keyword(&tokens[idx]);
        let has_group = tokens[idx].contains('(');
        match kw.as_str() {
            "CONSTRAINT" => idx += 2,
            "PRIMARY" => {
                column.primary_key = true;
                // PRIMARY KEY [ASC|DESC]
                idx += 2;
                if let Some(next) = tokens.get(idx) {
                    if matches!(keyword(next).as_str(), "ASC" | "DESC") {
                        idx += 1;
                    }
                }
            }
            "AUTOINCREMENT" => {
                column.autoincrement = true;
                idx += 1;
            }
            "NOT" => {
                if tokens
                    .get(idx + 1)
                    .is_some_and(|t| keyword(t) == "NULL")
                {
                    column.not_null = true;
                }
                idx += 2;
            }
            "NULL" | "UNIQUE" | "STORED" | "VIRTUAL" | "ALWAYS" | "GENERATED" => idx += 1,
            "ON" => {
                // ON CONFLICT <resolution>
                idx += 3;
            }
            "CHECK" | "AS" => {
                idx += if has_group { 1 } else { 2 };
            }
            "COLLATE" => idx += 2,
            "DEFAULT" => {
                if let Some(value) = tokens.get(idx + 1) {
                    if is_literal_default(value) {
                        column.default = Some(value.clone());
                    } else {
                        tracing::debug!(
                            "Dropping non-literal default '{}' on column '{}'",
                            value,
                            column.name
                        );
                    }
                }
                idx += 2;
            }
            "REFERENCES" => idx = skip_foreign_key_clause(tokens, idx),
            _ => {
                tracing::debug!(
                    "Ignoring unrecognized token '{}' on column '{}'",
                    tokens[idx],
                    column.name
                );
                idx += 1;
            }
        }
    }

    column
}

/// Skip `REFERENCES tbl[(cols)] [ON DELETE|UPDATE action] [MATCH name]
/// [[NOT] DEFERRABLE [INITIALLY DEFERRED|IMMEDIATE]]`, returning the index of
/// the next unconsumed token.
fn skip_foreign_key_clause(tokens: &[String], start: usize) -> usize {
    let mut idx = start + 2;
    if tokens.get(idx).is_some_and(|t| t.starts_with('(')) {
        idx += 1;
    }
    while let Some(token) = tokens.get(idx) {
        match keyword(token).as_str() {
            "ON" => {
                idx += 2;
                match tokens.get(idx).map(|t| keyword(t)).as_deref() {
                    Some("SET") | Some("NO") => idx += 2,
                    Some(_) => idx += 1,
                    None => {}
                }
            }
            "MATCH" => idx += 2,
            "NOT" if tokens
                .get(idx + 1)
                .is_some_and(|t| keyword(t) == "DEFERRABLE") =>
            {
                idx += 2
            }
            "DEFERRABLE" => idx += 1,
            "INITIALLY" => idx += 2,
            _ => break,
        }
    }
    idx
}

fn is_column_constraint_start(token: &str) -> bool {
    matches!(
        keyword(token).as_str(),
        "CONSTRAINT"
            | "PRIMARY"
            | "NOT"
            | "NULL"
            | "UNIQUE"
            | "CHECK"
            | "DEFAULT"
            | "COLLATE"
            | "REFERENCES"
            | "GENERATED"
            | "AS"
            | "AUTOINCREMENT"
    )
}

fn is_literal_default(value: &str) -> bool {
    value.starts_with('\'')
        || value.parse::<f64>().is_ok()
        || matches!(keyword(value).as_str(), "NULL" | "TRUE" | "FALSE")
}

/// Upper-cased token text up to any attached parenthesized group.
fn keyword(token: &str) -> String {
    token
        .split('(')
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

fn unquote(ident: &str) -> String {
    let ident = ident.trim();
    let bytes = ident.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if (first == b'"' && last == b'"')
            || (first == b'`' && last == b'`')
            || (first == b'\'' && last == b'\'')
            || (first == b'[' && last == b']')
        {
            return ident[1..ident.len() - 1].to_string();
        }
    }
    ident.to_string()
}

fn strip_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            out.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                out.push(ch);
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
                out.push(' ');
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Byte index of the first `target` outside quotes.
fn find_top_level(sql: &str, target: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (idx, ch) in sql.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if matches!(ch, '\'' | '"' | '`') => quote = Some(ch),
            None if ch == target => return Some(idx),
            None => {}
        }
    }
    None
}

fn matching_paren(sql: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, ch) in sql[open..].char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' | '`' => quote = Some(ch),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open + idx);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

fn split_top_level(body: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in body.chars() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                current.push(ch);
            }
            None => match ch {
                '\'' | '"' | '`' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '(' => {
                    depth += 1;
                    current.push(ch);
                }
                ')' => {
                    depth = depth.saturating_sub(1);
                    current.push(ch);
                }
                c if c == separator && depth == 0 => {
                    parts.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(ch),
            },
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

/// Split on whitespace, keeping quoted names and parenthesized groups whole.
/// A group directly following a word stays attached to it (`VARCHAR(10)`).
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in text.chars() {
        if let Some(q) = quote {
            current.push(ch);
            let closes = match q {
                '[' => ch == ']',
                _ => ch == q,
            };
            if closes {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' | '[' => {
                quote = Some(ch);
                current.push(ch);
            }
            '(' => {
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
