//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; secrets such as the credential
//! master key come from the environment only.
//!
//! # Example
//!
//! ```no_run
//! use copytrail::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::ingest::{PollingConfig, StreamingConfig};
use super::logging::LoggingConfig;
use super::reconciliation::ReconciliationConfig;
use super::reconnection::ReconnectionConfig;
use crate::adapter::outbound::polymarket::settings::PolymarketConfig;
use crate::error::{ConfigError, Result};

/// Environment variable holding the base64 credential master key.
pub const MASTER_KEY_ENV: &str = "COPYTRAIL_MASTER_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// SQLite database path.
    #[serde(default = "default_database")]
    pub database: String,

    /// Fill copies locally instead of calling an execution venue.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub polymarket: PolymarketConfig,

    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub streaming: StreamingConfig,

    #[serde(default)]
    pub reconnection: ReconnectionConfig,

    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    /// Credential master key, loaded from `COPYTRAIL_MASTER_KEY` at runtime
    /// (never from the config file).
    #[serde(skip)]
    pub master_key: Option<String>,
}

fn default_database() -> String {
    "copytrail.db".into()
}

const fn default_dry_run() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: default_database(),
            dry_run: default_dry_run(),
            logging: LoggingConfig::default(),
            polymarket: PolymarketConfig::default(),
            polling: PollingConfig::default(),
            streaming: StreamingConfig::default(),
            reconnection: ReconnectionConfig::default(),
            reconciliation: ReconciliationConfig::default(),
            master_key: None,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text and validate it.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        // Secrets never come from the config file.
        config.master_key = std::env::var(MASTER_KEY_ENV).ok().filter(|k| !k.is_empty());

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns the first missing field or out-of-range value.
    pub fn validate(&self) -> Result<()> {
        if self.database.is_empty() {
            return Err(ConfigError::MissingField { field: "database" }.into());
        }
        if self.polymarket.data_api_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "data_api_url",
            }
            .into());
        }
        if self.polymarket.clob_api_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "clob_api_url",
            }
            .into());
        }
        if self.polymarket.ws_url.is_empty() {
            return Err(ConfigError::MissingField { field: "ws_url" }.into());
        }

        positive("polling.interval_ms", self.polling.interval_ms)?;
        if self.polling.batch_size == 0 {
            return Err(invalid("polling.batch_size", "must be greater than 0"));
        }
        if !(1..=100).contains(&self.polling.fetch_limit) {
            return Err(invalid("polling.fetch_limit", "must be between 1 and 100"));
        }
        if self.polling.cache_capacity == 0 {
            return Err(invalid("polling.cache_capacity", "must be greater than 0"));
        }

        positive(
            "streaming.ping_interval_secs",
            self.streaming.ping_interval_secs,
        )?;
        positive("streaming.read_timeout_secs", self.streaming.read_timeout_secs)?;
        positive(
            "streaming.connect_timeout_secs",
            self.streaming.connect_timeout_secs,
        )?;

        if self.reconnection.max_delay_ms < self.reconnection.initial_delay_ms {
            return Err(invalid(
                "reconnection.max_delay_ms",
                "must not be less than initial_delay_ms",
            ));
        }
        if self.reconnection.backoff_multiplier < 1.0 {
            return Err(invalid(
                "reconnection.backoff_multiplier",
                "must be at least 1.0",
            ));
        }

        positive("reconciliation.interval_ms", self.reconciliation.interval_ms)?;
        positive(
            "reconciliation.query_timeout_ms",
            self.reconciliation.query_timeout_ms,
        )?;
        positive(
            "reconciliation.retention_interval_secs",
            self.reconciliation.retention_interval_secs,
        )?;

        Ok(())
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}

fn positive(field: &'static str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(invalid(field, "must be greater than 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::parse_toml("").unwrap();

        assert_eq!(config.database, "copytrail.db");
        assert!(config.dry_run);
        assert_eq!(config.logging.level, "info");
        assert!(config.polling.enabled);
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.polling.batch_size, 10);
        assert_eq!(config.polling.cache_capacity, 1000);
        assert!(!config.streaming.enabled);
        assert_eq!(config.streaming.connect_timeout_secs, 10);
        assert_eq!(config.reconciliation.interval_ms, 5000);
        assert_eq!(config.reconnection.max_consecutive_failures, 10);
        assert_eq!(
            config.polymarket.data_api_url,
            "https://data-api.polymarket.com"
        );
    }

    #[test]
    fn sections_override_defaults() {
        let toml = r#"
            database = "/tmp/ct.db"
            dry_run = false

            [logging]
            format = "json"

            [polling]
            interval_ms = 500
            fetch_limit = 50

            [polymarket.http]
            retry_max_attempts = 1
        "#;

        let config = Config::parse_toml(toml).unwrap();

        assert_eq!(config.database, "/tmp/ct.db");
        assert!(!config.dry_run);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.polling.fetch_limit, 50);
        assert_eq!(config.polling.batch_size, 10);
        assert_eq!(config.polymarket.http.retry_max_attempts, 1);
        assert_eq!(config.polymarket.http.timeout_ms, 5000);
    }

    #[test]
    fn fetch_limit_above_window_is_rejected() {
        let err = Config::parse_toml("[polling]\nfetch_limit = 101").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "polling.fetch_limit",
                ..
            })
        ));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = Config::parse_toml("[reconciliation]\ninterval_ms = 0").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue {
                field: "reconciliation.interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn inverted_backoff_bounds_are_rejected() {
        let toml = "[reconnection]\ninitial_delay_ms = 5000\nmax_delay_ms = 1000";
        assert!(Config::parse_toml(toml).is_err());

        let toml = "[reconnection]\nbackoff_multiplier = 0.5";
        assert!(Config::parse_toml(toml).is_err());
    }

    #[test]
    fn empty_url_is_missing() {
        let err = Config::parse_toml("[polymarket]\nws_url = \"\"").unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::MissingField { field: "ws_url" })
        ));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        assert!(matches!(
            Config::parse_toml("polling = ["),
            Err(Error::Config(ConfigError::Parse(_)))
        ));
    }
}
