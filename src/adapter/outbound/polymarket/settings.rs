//! Polymarket endpoint configuration.

use serde::Deserialize;

/// Timeouts and retries shared by the Data-API and CLOB clients.
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketHttpConfig {
    /// Request timeout in milliseconds.
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_http_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Attempts per request when the connection fails or times out.
    #[serde(default = "default_http_retry_max_attempts")]
    pub retry_max_attempts: u32,
    /// Pause between attempts in milliseconds.
    #[serde(default = "default_http_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

const fn default_http_timeout_ms() -> u64 {
    5000
}

const fn default_http_connect_timeout_ms() -> u64 {
    2000
}

const fn default_http_retry_max_attempts() -> u32 {
    3
}

const fn default_http_retry_backoff_ms() -> u64 {
    200
}

impl Default for PolymarketHttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_http_timeout_ms(),
            connect_timeout_ms: default_http_connect_timeout_ms(),
            retry_max_attempts: default_http_retry_max_attempts(),
            retry_backoff_ms: default_http_retry_backoff_ms(),
        }
    }
}

/// Polymarket endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PolymarketConfig {
    /// Data API base URL (wallet activity).
    #[serde(default = "default_data_api_url")]
    pub data_api_url: String,
    /// CLOB API base URL (order queries).
    #[serde(default = "default_clob_api_url")]
    pub clob_api_url: String,
    /// Real-time data WebSocket URL (user trade channel).
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    #[serde(default)]
    pub http: PolymarketHttpConfig,
}

fn default_data_api_url() -> String {
    "https://data-api.polymarket.com".into()
}

fn default_clob_api_url() -> String {
    "https://clob.polymarket.com".into()
}

fn default_ws_url() -> String {
    "wss://ws-live-data.polymarket.com".into()
}

impl Default for PolymarketConfig {
    fn default() -> Self {
        Self {
            data_api_url: default_data_api_url(),
            clob_api_url: default_clob_api_url(),
            ws_url: default_ws_url(),
            http: PolymarketHttpConfig::default(),
        }
    }
}
