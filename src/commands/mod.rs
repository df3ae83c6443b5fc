// ABOUTME: Command implementations for the duckdb-replicator CLI
// ABOUTME: Exports full/incremental refresh, status, and watermark management

pub mod refresh;
pub mod status;
pub mod watermark;

use std::path::PathBuf;

use anyhow::Result;

use crate::config::ReplicatorConfig;

pub use refresh::{full, incremental};
pub use status::status;
pub use watermark::command as watermark;

/// State file for this configuration: the configured path, else the default.
pub fn state_path(config: &ReplicatorConfig) -> Result<PathBuf> {
    match &config.state_path {
        Some(path) => Ok(path.clone()),
        None => crate::state::default_path(),
    }
}
