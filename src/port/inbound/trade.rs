//! Funnel contract shared by both ingestion paths.

use async_trait::async_trait;

use crate::domain::{LeaderId, ProcessOutcome, TradeEvent, TradeSource};
use crate::error::Result;

/// Consumer of detected leader trades.
///
/// Implementations must be safe against the same `(leader, trade)` arriving
/// concurrently from both ingestors.
#[async_trait]
pub trait TradeHandler: Send + Sync {
    /// Admit, replicate and settle one leader trade.
    ///
    /// # Errors
    ///
    /// Returns an error only when the ledger itself is unavailable; replication
    /// failures are recorded and reported through [`ProcessOutcome::Failed`].
    async fn process_trade(
        &self,
        leader_id: LeaderId,
        event: TradeEvent,
        source: TradeSource,
    ) -> Result<ProcessOutcome>;
}
