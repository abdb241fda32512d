//! Handler for `copytrail check-config`.

use std::path::Path;

use crate::adapter::inbound::cli::output;
use crate::adapter::outbound::crypto::AesGcmCipher;
use crate::error::Result;
use crate::infrastructure::config::settings::{Config, MASTER_KEY_ENV};

/// Validate the configuration file without starting anything.
///
/// # Errors
///
/// Returns the load or validation error, or an invalid master key.
pub fn execute(path: &Path) -> Result<()> {
    let config = Config::load(path)?;

    output::section("Configuration Check");
    output::field("Config", path.display());
    output::success("Configuration file is valid");

    output::section("Summary");
    output::field("Database", &config.database);
    output::field("Dry run", config.dry_run);
    output::field("Polling", enabled(config.polling.enabled));
    output::field("Polling interval", format!("{} ms", config.polling.interval_ms));
    output::field("Streaming", enabled(config.streaming.enabled));
    output::field("Reconciliation", enabled(config.reconciliation.enabled));
    output::field("Data API", &config.polymarket.data_api_url);
    output::field("CLOB API", &config.polymarket.clob_api_url);

    match config.master_key.as_deref() {
        Some(key) => {
            AesGcmCipher::from_base64(key)?;
            output::success("Master key is valid");
        }
        None => output::warning(&format!(
            "{MASTER_KEY_ENV} not set; sell prices will not be reconciled"
        )),
    }
    Ok(())
}

const fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}
