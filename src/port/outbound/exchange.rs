//! Exchange-side ports: copy-trade execution and authoritative order queries.

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::{ApiCredentials, CopyTrading, OrderId, TradeEvent};
use crate::error::Result;

/// Result of a successful copy-trade execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicatedOrder {
    pub order_id: OrderId,
    /// Price the copy was recorded at. Reconciliation may correct it later.
    pub price: Decimal,
    pub quantity: Decimal,
}

/// Why a copy trade could not be executed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    /// The exchange refused the order.
    #[error("order rejected: {0}")]
    Rejected(String),

    /// The exchange could not be reached.
    #[error("exchange unavailable: {0}")]
    Unavailable(String),

    /// The follower account cannot trade.
    #[error("account not tradable: {0}")]
    Account(String),
}

/// Executes a leader trade into a follower account.
#[async_trait]
pub trait TradeReplicator: Send + Sync {
    async fn replicate(
        &self,
        relationship: &CopyTrading,
        event: &TradeEvent,
    ) -> std::result::Result<ReplicatedOrder, ReplicationError>;
}

/// Authenticated order lookup on the exchange.
#[async_trait]
pub trait OrderQuery: Send + Sync {
    /// Authoritative executed price of `order_id`.
    ///
    /// `Ok(None)` means the exchange knows the order but reports no fill.
    async fn executed_price(
        &self,
        credentials: &ApiCredentials,
        order_id: &OrderId,
    ) -> Result<Option<Decimal>>;
}
