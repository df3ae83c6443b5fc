// ABOUTME: Shared fixtures for integration tests: egg-tracker SQLite sources and DuckDB readers
// ABOUTME: Values from both sides are rendered into one comparable cell type

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// The egg tracker's production schema, comments and foreign keys included.
pub const EGG_TRACKER_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS species (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS coops (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS egg_colors (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        color TEXT UNIQUE NOT NULL,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS egg_sizes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        size TEXT UNIQUE NOT NULL, -- e.g., Small, Medium, Large, Jumbo
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS eggs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        species_id INTEGER NOT NULL,
        coop_id INTEGER NOT NULL,
        collection_date DATE NOT NULL,
        quantity INTEGER NOT NULL DEFAULT 1,
        notes TEXT,
        color_id INTEGER,
        size_id INTEGER,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (species_id) REFERENCES species(id),
        FOREIGN KEY (coop_id) REFERENCES coops(id),
        FOREIGN KEY (color_id) REFERENCES egg_colors(id),
        FOREIGN KEY (size_id) REFERENCES egg_sizes(id)
    );

    -- This is the crucial table for inventory tracking
    CREATE TABLE IF NOT EXISTS inventory_actions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        egg_id INTEGER NOT NULL,
        action_type TEXT NOT NULL, -- e.g., 'collected', 'sold', 'used', 'broken', 'gifted'
        quantity INTEGER NOT NULL, -- How many eggs involved in this action
        action_date DATETIME NOT NULL,
        notes TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY (egg_id) REFERENCES eggs(id)
    );

    CREATE TRIGGER IF NOT EXISTS update_species_updated_at
    AFTER UPDATE ON species
    FOR EACH ROW
    BEGIN
        UPDATE species SET updated_at = CURRENT_TIMESTAMP WHERE id = OLD.id;
    END;
";

pub const EGG_TRACKER_SEED: &str = "
    INSERT INTO species (name) VALUES ('Chicken'), ('Duck'), ('Quail');
    INSERT INTO coops (name) VALUES ('Main Coop'), ('Duck House');
    INSERT INTO egg_colors (color) VALUES ('Brown'), ('White'), ('Blue');
    INSERT INTO egg_sizes (size) VALUES ('Medium'), ('Large'), ('Small');
    INSERT INTO eggs (species_id, coop_id, collection_date, quantity, color_id, size_id) VALUES
        (1, 1, '2025-05-01', 5, 1, 2),
        (1, 1, '2025-05-02', 4, 3, 1),
        (2, 2, '2025-05-02', 2, 2, 2);
    INSERT INTO inventory_actions (egg_id, action_type, quantity, action_date, notes) VALUES
        (1, 'collected', 5, '2025-05-01 07:30:00', 'morning round'),
        (1, 'sold', 3, '2025-05-01T16:00:00', NULL),
        (3, 'broken', 1, '2025-05-02 09:15:00', 'dropped');
";

/// Loosely typed tables with every timestamp stored as TEXT.
pub const SIMPLE_SCHEMA: &str = "
    CREATE TABLE eggs (id INTEGER PRIMARY KEY, date_laid TEXT, species TEXT, deleted BOOLEAN, created_at TEXT, updated_at TEXT);
    CREATE TABLE inventory_actions (id INTEGER PRIMARY KEY, quantity INTEGER, species TEXT, action TEXT, notes TEXT, date TEXT, created_at TEXT, updated_at TEXT);
    CREATE TABLE species (id INTEGER PRIMARY KEY, name TEXT, active BOOLEAN, created_at TEXT, updated_at TEXT);
    CREATE TABLE egg_colors (id INTEGER PRIMARY KEY, name TEXT, active BOOLEAN, created_at TEXT, updated_at TEXT);
    CREATE TABLE egg_sizes (id INTEGER PRIMARY KEY, name TEXT, active BOOLEAN, created_at TEXT, updated_at TEXT);
    CREATE TABLE coops (id INTEGER PRIMARY KEY, name TEXT, active BOOLEAN, created_at TEXT, updated_at TEXT);
";

pub const SIMPLE_SEED: &str = "
    INSERT INTO eggs VALUES (1, '2024-05-01', 'Chicken', 0, '2024-05-01', '2024-05-01');
    INSERT INTO inventory_actions VALUES (1, 10, 'Goose', 'collected', 'note', '2024-05-01', '2024-05-01', '2024-05-01');
    INSERT INTO species VALUES (1, 'Chicken', 1, '2024-05-01', '2024-05-01');
    INSERT INTO egg_colors VALUES (1, 'White', 1, '2024-05-01', '2024-05-01');
    INSERT INTO egg_sizes VALUES (1, 'Large', 1, '2024-05-01', '2024-05-01');
    INSERT INTO coops VALUES (1, 'Main Coop', 1, '2024-05-01', '2024-05-01');
";

pub const TABLES: [&str; 6] = [
    "eggs",
    "inventory_actions",
    "species",
    "egg_colors",
    "egg_sizes",
    "coops",
];

/// Source and destination paths inside a temp dir that lives as long as `_dir`.
pub struct Fixture {
    pub _dir: tempfile::TempDir,
    pub source: PathBuf,
    pub destination: PathBuf,
}

impl Fixture {
    pub fn new(schema: &str, seed: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("eggtracker.db");
        let destination = dir.path().join("eggtracker.duckdb");

        let conn = rusqlite::Connection::open(&source).unwrap();
        conn.execute_batch(schema).unwrap();
        conn.execute_batch(seed).unwrap();

        Self {
            _dir: dir,
            source,
            destination,
        }
    }

    pub fn egg_tracker() -> Self {
        Self::new(EGG_TRACKER_SCHEMA, EGG_TRACKER_SEED)
    }

    pub fn simple() -> Self {
        Self::new(SIMPLE_SCHEMA, SIMPLE_SEED)
    }

    /// Run statements against the source with a writable connection.
    pub fn source_exec(&self, sql: &str) {
        rusqlite::Connection::open(&self.source)
            .unwrap()
            .execute_batch(sql)
            .unwrap();
    }

    /// Open the destination, run `f`, and close it again before returning.
    pub fn with_destination<T>(&self, f: impl FnOnce(&duckdb::Connection) -> T) -> T {
        let conn = duckdb::Connection::open(&self.destination).unwrap();
        f(&conn)
    }

    pub fn destination_exec(&self, sql: &str) {
        self.with_destination(|conn| conn.execute_batch(sql).unwrap());
    }

    pub fn source_rows(&self, table: &str) -> Vec<Vec<Cell>> {
        sqlite_rows(&self.source, table)
    }

    pub fn destination_rows(&self, table: &str) -> Vec<Vec<Cell>> {
        let width = sqlite_width(&self.source, table);
        self.with_destination(|conn| duckdb_rows(conn, table, width))
    }

    pub fn destination_has_table(&self, table: &str) -> bool {
        self.with_destination(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            count > 0
        })
    }

    pub fn destination_count(&self, table: &str) -> i64 {
        self.with_destination(|conn| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .unwrap()
        })
    }

    /// (id, text) pairs from the destination, ordered by id.
    pub fn destination_pairs(&self, sql: &str) -> Vec<(i64, String)> {
        self.with_destination(|conn| {
            let mut stmt = conn.prepare(sql).unwrap();
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
                .unwrap()
                .collect::<duckdb::Result<Vec<_>>>()
                .unwrap()
        })
    }
}

/// A value from either database in comparable form. Booleans compare as
/// integers, the way SQLite stores them.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
}

fn sqlite_width(path: &Path, table: &str) -> usize {
    let conn = rusqlite::Connection::open(path).unwrap();
    let stmt = conn.prepare(&format!("SELECT * FROM {}", table)).unwrap();
    stmt.column_count()
}

pub fn sqlite_rows(path: &Path, table: &str) -> Vec<Vec<Cell>> {
    use rusqlite::types::Value;

    let conn = rusqlite::Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {} ORDER BY id", table))
        .unwrap();
    let width = stmt.column_count();
    let mut rows = stmt.query([]).unwrap();

    let mut out = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        let cells = (0..width)
            .map(|idx| match row.get::<_, Value>(idx).unwrap() {
                Value::Null => Cell::Null,
                Value::Integer(i) => Cell::Int(i),
                Value::Real(f) => Cell::Real(f),
                Value::Text(s) => Cell::Text(s),
                Value::Blob(b) => Cell::Text(String::from_utf8_lossy(&b).into_owned()),
            })
            .collect();
        out.push(cells);
    }
    out
}

pub fn duckdb_rows(conn: &duckdb::Connection, table: &str, width: usize) -> Vec<Vec<Cell>> {
    use duckdb::types::Value;

    let mut stmt = conn
        .prepare(&format!("SELECT * FROM {} ORDER BY id", table))
        .unwrap();
    let mut rows = stmt.query([]).unwrap();

    let mut out = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        let cells = (0..width)
            .map(|idx| match row.get::<_, Value>(idx).unwrap() {
                Value::Null => Cell::Null,
                Value::Boolean(b) => Cell::Int(b as i64),
                Value::TinyInt(i) => Cell::Int(i as i64),
                Value::SmallInt(i) => Cell::Int(i as i64),
                Value::Int(i) => Cell::Int(i as i64),
                Value::BigInt(i) => Cell::Int(i),
                Value::Float(f) => Cell::Real(f as f64),
                Value::Double(f) => Cell::Real(f),
                Value::Text(s) => Cell::Text(s),
                other => Cell::Text(format!("{:?}", other)),
            })
            .collect();
        out.push(cells);
    }
    out
}
