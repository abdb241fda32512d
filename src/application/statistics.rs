//! Read-side settlement statistics.

use std::sync::Arc;

use crate::domain::{CopyTradingId, RecordWithDetails, SettlementSummary};
use crate::error::Result;
use crate::port::outbound::ledger::SettlementLedger;

/// Builds per-relationship realized-PnL summaries from the settlement ledger.
pub struct SettlementStatistics {
    ledger: Arc<dyn SettlementLedger>,
}

impl SettlementStatistics {
    #[must_use]
    pub fn new(ledger: Arc<dyn SettlementLedger>) -> Self {
        Self { ledger }
    }

    /// Summary of every sell settled under `copy_trading_id`, with details.
    pub async fn summary(&self, copy_trading_id: CopyTradingId) -> Result<SettlementSummary> {
        let records = self.ledger.records_for(copy_trading_id).await?;
        let mut with_details = Vec::with_capacity(records.len());
        for record in records {
            let details = self.ledger.details(record.id).await?;
            with_details.push(RecordWithDetails { record, details });
        }
        Ok(SettlementSummary::from_records(
            copy_trading_id,
            with_details,
        ))
    }
}
