//! Data-API activity client.

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use super::dto::activity::ActivityItem;
use super::http::RetryingHttp;
use super::settings::PolymarketConfig;
use crate::error::Result;
use crate::port::outbound::activity::{ActivityFeed, ActivityRecord, TRADE_ACTIVITY};

/// Upper bound the Data API accepts for `limit`.
pub const MAX_ACTIVITY_LIMIT: u32 = 100;

/// Unauthenticated reader of wallet activity.
pub struct DataApiClient {
    http: RetryingHttp,
    base_url: String,
}

impl DataApiClient {
    #[must_use]
    pub fn from_config(config: &PolymarketConfig) -> Self {
        Self {
            http: RetryingHttp::from_config(&config.http),
            base_url: config.data_api_url.trim_end_matches('/').to_string(),
        }
    }

    fn activity_url(&self, address: &str, limit: u32) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/activity", self.base_url))?;
        url.query_pairs_mut()
            .append_pair("user", address)
            .append_pair("limit", &limit.min(MAX_ACTIVITY_LIMIT).to_string())
            .append_pair("offset", "0")
            .append_pair("type", TRADE_ACTIVITY)
            .append_pair("sortBy", "TIMESTAMP")
            .append_pair("sortDirection", "DESC");
        Ok(url)
    }
}

#[async_trait]
impl ActivityFeed for DataApiClient {
    async fn recent_trades(&self, address: &str, limit: u32) -> Result<Vec<ActivityRecord>> {
        let url = self.activity_url(address, limit)?;
        let items: Vec<ActivityItem> = self.http.get_with_retry(url, &[]).await?;
        debug!(address, count = items.len(), "Fetched activity");
        Ok(items.into_iter().map(ActivityRecord::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activity_url_carries_trade_query() {
        let client = DataApiClient::from_config(&PolymarketConfig {
            data_api_url: "https://data.example/".into(),
            ..PolymarketConfig::default()
        });

        let url = client.activity_url("0xabc", 500).unwrap();

        assert_eq!(url.path(), "/activity");
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("user".into(), "0xabc".into())));
        assert!(query.contains(&("limit".into(), "100".into())));
        assert!(query.contains(&("type".into(), "TRADE".into())));
        assert!(query.contains(&("sortBy".into(), "TIMESTAMP".into())));
        assert!(query.contains(&("sortDirection".into(), "DESC".into())));
    }
}
