// ABOUTME: Persisted CLI state: the watermark for the next incremental run
// ABOUTME: Stored as JSON under ~/.duckdb-replicator unless a path is configured

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppState {
    /// Lower bound for the next incremental run
    pub last_watermark: Option<String>,
    /// When the last successful run finished
    pub last_run_at: Option<DateTime<Utc>>,
}

pub fn default_path() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home_dir.join(".duckdb-replicator").join("state.json"))
}

/// Load state from `path`; a missing file is an empty state.
pub fn load(path: &Path) -> Result<AppState> {
    if !path.exists() {
        return Ok(AppState::default());
    }
    let state_file = fs::File::open(path)
        .with_context(|| format!("Failed to open state file {}", path.display()))?;
    let state = serde_json::from_reader(state_file)
        .with_context(|| format!("Failed to parse state file {}", path.display()))?;
    Ok(state)
}

pub fn save(path: &Path, state: &AppState) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create state directory {}", dir.display()))?;
        }
    }
    let state_file = fs::File::create(path)
        .with_context(|| format!("Failed to write state file {}", path.display()))?;
    serde_json::to_writer_pretty(state_file, state)?;
    Ok(())
}
