// ABOUTME: Replicator configuration loaded from TOML and overridden by CLI flags or env
// ABOUTME: Table names are resolved here, so an unknown table fails at load time

//! # Configuration Format
//!
//! ```toml
//! source = "/app/data/eggtracker.db"          # authoritative SQLite file
//! destination = "/app/data/eggtracker.duckdb" # DuckDB replica
//! tables = ["eggs", "species"]                # optional subset, run in this order
//! fresh_destination = false                   # delete the DuckDB file before full runs
//! state_path = "/var/lib/replicator/state.json"
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::replicate::Replicator;
use crate::tables::ReplicatedTable;

pub const DEFAULT_SOURCE: &str = "/app/data/eggtracker.db";
pub const DEFAULT_DESTINATION: &str = "/app/data/eggtracker.duckdb";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicatorConfig {
    /// Source SQLite database file
    #[serde(default = "default_source")]
    pub source: PathBuf,

    /// Destination DuckDB database file
    #[serde(default = "default_destination")]
    pub destination: PathBuf,

    /// Tables to replicate, in run order (default: all)
    #[serde(default = "default_tables")]
    pub tables: Vec<ReplicatedTable>,

    /// Remove the destination file before a full refresh
    #[serde(default)]
    pub fresh_destination: bool,

    /// Where the CLI keeps its watermark (default: ~/.duckdb-replicator/state.json)
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

fn default_source() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE)
}

fn default_destination() -> PathBuf {
    PathBuf::from(DEFAULT_DESTINATION)
}

fn default_tables() -> Vec<ReplicatedTable> {
    ReplicatedTable::ALL.to_vec()
}

impl Default for ReplicatorConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            destination: default_destination(),
            tables: default_tables(),
            fresh_destination: false,
            state_path: None,
        }
    }
}

impl ReplicatorConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Invalid replicator configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load config file {}", path.display()))
    }

    /// Reject table lists that would make a run ambiguous.
    pub fn validate(&self) -> Result<()> {
        if self.tables.is_empty() {
            bail!("'tables' must name at least one table");
        }

        let mut seen = HashSet::new();
        for table in &self.tables {
            if !seen.insert(*table) {
                bail!("table '{}' is listed more than once", table);
            }
        }
        Ok(())
    }

    pub fn replicator(&self) -> Replicator {
        Replicator::new(&self.source, &self.destination).with_tables(self.tables.clone())
    }
}
