//! Handler for `copytrail run`.

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::infrastructure::bootstrap;
use crate::infrastructure::config::settings::Config;

/// Run the pipeline in the foreground until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or the pipeline
/// fails to start.
pub async fn execute(path: &Path) -> Result<()> {
    let config = Config::load(path)?;
    config.init_logging();
    info!(config = %path.display(), "copytrail starting");

    let pipeline = bootstrap::build_pipeline(&config)?;
    pipeline.run_until_ctrl_c().await?;

    info!("copytrail stopped");
    Ok(())
}
