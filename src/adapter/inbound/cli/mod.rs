//! CLI module graph.

pub mod check;
pub mod command;
pub mod output;
pub mod run;
pub mod stats;

use crate::error::Result;
use command::{Cli, Commands};

/// Dispatch a parsed command line.
///
/// # Errors
///
/// Returns whatever the selected command fails with.
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run => run::execute(&cli.config).await,
        Commands::Stats(args) => stats::execute(&cli.config, &args).await,
        Commands::CheckConfig => check::execute(&cli.config),
    }
}
