// ABOUTME: Watermark management command (get/set/unset)
// ABOUTME: Reads and writes the saved lower bound for incremental runs

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use std::path::Path;

use crate::replicate::Watermark;
use crate::state;

#[derive(Debug, Args)]
pub struct WatermarkArgs {
    #[command(subcommand)]
    command: WatermarkCommands,
}

#[derive(Debug, Subcommand)]
enum WatermarkCommands {
    /// Set the watermark used by the next incremental run
    Set {
        /// Timestamp in the source's format, e.g. "2024-05-02 00:00:00"
        value: String,
    },
    /// Forget the saved watermark (the next incremental run does a full refresh)
    Unset,
    /// Show the saved watermark
    Get,
}

pub fn command(args: WatermarkArgs, state_path: &Path) -> Result<()> {
    match args.command {
        WatermarkCommands::Set { value } => {
            let watermark = Watermark::new(value)?;
            let mut state = state::load(state_path).context("Failed to load state")?;
            state.last_watermark = Some(watermark.to_string());
            state::save(state_path, &state).context("Failed to save state")?;
            println!("Watermark set to: {}", watermark);
        }
        WatermarkCommands::Unset => {
            let mut state = state::load(state_path).context("Failed to load state")?;
            state.last_watermark = None;
            state::save(state_path, &state).context("Failed to save state")?;
            println!("Watermark unset.");
        }
        WatermarkCommands::Get => {
            let state = state::load(state_path).context("Failed to load state")?;
            match state.last_watermark {
                Some(value) => println!("Current watermark: {}", value),
                None => println!("Watermark is not set."),
            }
        }
    }
    Ok(())
}
