//! Reconciliation and retention schedule.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Fixed delay between passes (milliseconds).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Timeout for one order-price query (milliseconds).
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
    /// Age after which dedup rows are purged.
    #[serde(default = "default_processed_retention_days")]
    pub processed_retention_days: u32,
    /// How often the retention purge runs (seconds).
    #[serde(default = "default_retention_interval_secs")]
    pub retention_interval_secs: u64,
}

const fn default_enabled() -> bool {
    true
}

const fn default_interval_ms() -> u64 {
    5000
}

const fn default_query_timeout_ms() -> u64 {
    5000
}

const fn default_processed_retention_days() -> u32 {
    30
}

const fn default_retention_interval_secs() -> u64 {
    3600
}

impl ReconciliationConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    #[must_use]
    pub const fn retention_interval(&self) -> Duration {
        Duration::from_secs(self.retention_interval_secs)
    }

    #[must_use]
    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.processed_retention_days))
    }
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_ms: default_interval_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            processed_retention_days: default_processed_retention_days(),
            retention_interval_secs: default_retention_interval_secs(),
        }
    }
}
