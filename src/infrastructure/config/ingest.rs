//! Polling and streaming ingestion settings.

use std::time::Duration;

use serde::Deserialize;

/// Activity-feed polling loop.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Delay between cycles (milliseconds).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Leaders fetched concurrently per batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between batches (milliseconds).
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,
    /// Activity items requested per leader, newest first.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
    /// Trade ids remembered per leader.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

const fn default_true() -> bool {
    true
}

const fn default_interval_ms() -> u64 {
    2000
}

const fn default_batch_size() -> usize {
    10
}

const fn default_batch_pause_ms() -> u64 {
    100
}

const fn default_fetch_limit() -> u32 {
    100
}

const fn default_cache_capacity() -> usize {
    1000
}

impl PollingConfig {
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    #[must_use]
    pub const fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: default_interval_ms(),
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
            fetch_limit: default_fetch_limit(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// User-channel streaming. Off by default: subscribing to another wallet's
/// channel needs that wallet's credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Interval between `PING` heartbeats (seconds).
    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,
    /// Silence after which the connection counts as lost (seconds).
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    /// Bound on the handshake and the subscribe send (seconds).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

const fn default_ping_interval_secs() -> u64 {
    10
}

const fn default_read_timeout_secs() -> u64 {
    60
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

impl StreamingConfig {
    #[must_use]
    pub const fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ping_interval_secs: default_ping_interval_secs(),
            read_timeout_secs: default_read_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}
