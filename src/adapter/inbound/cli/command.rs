//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Prediction-market copy trading: leader ingestion, settlement and
/// reconciliation.
#[derive(Parser, Debug)]
#[command(name = "copytrail")]
#[command(version)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline until Ctrl-C
    Run,

    /// Show realized PnL for a copy-trading relationship
    Stats(StatsArgs),

    /// Load and validate the configuration
    CheckConfig,
}

/// Arguments for `copytrail stats`.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Copy-trading relationship id
    pub copy_trading_id: i64,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}
