//! Replicator that fills locally without touching a venue.

use async_trait::async_trait;
use tracing::info;

use crate::domain::{CopyTrading, OrderId, TradeEvent};
use crate::port::outbound::exchange::{ReplicatedOrder, ReplicationError, TradeReplicator};

/// Fills every copy at the leader's price and size.
///
/// Order ids are `dry-<uuid>`, which reconciliation finalizes without a query.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunReplicator;

#[async_trait]
impl TradeReplicator for DryRunReplicator {
    async fn replicate(
        &self,
        relationship: &CopyTrading,
        event: &TradeEvent,
    ) -> Result<ReplicatedOrder, ReplicationError> {
        let order_id = OrderId::new(format!("dry-{}", uuid::Uuid::new_v4()));
        info!(
            copy_trading_id = %relationship.id,
            trade_id = %event.id,
            side = %event.side,
            price = %event.price,
            size = %event.size,
            order_id = %order_id,
            "Dry-run fill"
        );
        Ok(ReplicatedOrder {
            order_id,
            price: event.price,
            quantity: event.size,
        })
    }
}
