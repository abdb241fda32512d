//! CLOB order-query client.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::debug;
use url::Url;

use super::auth::l2_headers;
use super::dto::order::OrderResponse;
use super::http::RetryingHttp;
use super::settings::PolymarketConfig;
use crate::domain::{ApiCredentials, OrderId};
use crate::error::Result;
use crate::port::outbound::exchange::OrderQuery;

/// Authenticated lookup of orders on the CLOB.
pub struct ClobOrderClient {
    http: RetryingHttp,
    base_url: String,
}

impl ClobOrderClient {
    #[must_use]
    pub fn from_config(config: &PolymarketConfig) -> Self {
        Self {
            http: RetryingHttp::from_config(&config.http),
            base_url: config.clob_api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl OrderQuery for ClobOrderClient {
    async fn executed_price(
        &self,
        credentials: &ApiCredentials,
        order_id: &OrderId,
    ) -> Result<Option<Decimal>> {
        let path = format!("/data/order/{}", order_id.as_str());
        let url = Url::parse(&format!("{}{}", self.base_url, path))?;
        let headers = l2_headers(credentials, Utc::now().timestamp(), "GET", &path, "")?;

        let order: OrderResponse = self.http.get_with_retry(url, &headers.pairs()).await?;
        let price = order.executed_price();
        debug!(order_id = %order_id, status = ?order.status, price = ?price, "Queried order");
        Ok(price)
    }
}
