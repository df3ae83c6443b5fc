// ABOUTME: CLI entry point for duckdb-replicator
// ABOUTME: Resolves configuration from file, env, and flags, then routes to command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use duckdb_replicator::commands;
use duckdb_replicator::{ReplicatedTable, ReplicatorConfig};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "duckdb-replicator")]
#[command(about = "Keep a DuckDB analytical replica in sync with a SQLite database", long_about = None)]
#[command(version)]
struct Cli {
    /// Set the log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log: String,
    /// Path to a replicator TOML config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Source SQLite database
    #[arg(long, global = true, env = "DUCKDB_REPLICATOR_SOURCE", value_name = "PATH")]
    source: Option<PathBuf>,
    /// Destination DuckDB database
    #[arg(
        long,
        global = true,
        env = "DUCKDB_REPLICATOR_DESTINATION",
        value_name = "PATH"
    )]
    destination: Option<PathBuf>,
    /// Replicate only these tables, in this order (comma-separated)
    #[arg(long, global = true, value_delimiter = ',')]
    tables: Option<Vec<ReplicatedTable>>,
    /// Watermark state file (default: ~/.duckdb-replicator/state.json)
    #[arg(long = "state", global = true, value_name = "PATH")]
    state_path: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Drop and recopy every table into the destination
    Full {
        /// Delete the destination file before copying
        #[arg(long)]
        fresh: bool,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Upsert rows created or updated since the watermark
    ///
    /// Tables missing from the destination are copied in full. Without
    /// --since the saved watermark is used; with neither, a full refresh runs.
    Incremental {
        /// Lower bound, compared with created_at/updated_at (e.g. "2024-05-02 00:00:00")
        #[arg(long)]
        since: Option<String>,
        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show per-table row counts in source and destination
    Status {
        /// Also print the translated DuckDB schema for each table
        #[arg(long)]
        show_ddl: bool,
    },
    /// Manage the saved watermark
    Watermark {
        #[command(flatten)]
        args: commands::watermark::WatermarkArgs,
    },
}

impl Cli {
    /// File config first, then env and flag overrides.
    fn resolve_config(&self) -> Result<ReplicatorConfig> {
        let mut config = match &self.config {
            Some(path) => ReplicatorConfig::load(path)?,
            None => ReplicatorConfig::default(),
        };

        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if let Some(destination) = &self.destination {
            config.destination = destination.clone();
        }
        if let Some(tables) = &self.tables {
            config.tables = tables.clone();
        }
        if let Some(state_path) = &self.state_path {
            config.state_path = Some(state_path.clone());
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(log: &str) {
    // RUST_LOG takes precedence over --log
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let config = cli.resolve_config()?;
    tracing::debug!(?config, "Resolved configuration");

    match cli.command {
        Commands::Full { fresh, json } => commands::full(&config, fresh, json),
        Commands::Incremental { since, json } => commands::incremental(&config, since, json),
        Commands::Status { show_ddl } => commands::status(&config, show_ddl),
        Commands::Watermark { args } => {
            let state_path = commands::state_path(&config)?;
            commands::watermark(args, &state_path)
        }
    }
}
