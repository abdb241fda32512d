//! Realized-PnL summary of one copy-trading relationship.

use rust_decimal::Decimal;
use serde::Serialize;

use super::id::CopyTradingId;
use super::ledger::{SellMatchDetail, SellMatchRecord};

/// A match record together with its per-lot details.
#[derive(Debug, Clone, Serialize)]
pub struct RecordWithDetails {
    pub record: SellMatchRecord,
    pub details: Vec<SellMatchDetail>,
}

/// Aggregated settlement figures for a relationship.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementSummary {
    pub copy_trading_id: CopyTradingId,
    pub sell_count: usize,
    pub total_matched_quantity: Decimal,
    pub total_realized_pnl: Decimal,
    /// Records whose sell price has not been reconciled yet.
    pub pending_reconciliation: usize,
    pub records: Vec<RecordWithDetails>,
}

impl SettlementSummary {
    #[must_use]
    pub fn from_records(copy_trading_id: CopyTradingId, records: Vec<RecordWithDetails>) -> Self {
        let total_matched_quantity = records
            .iter()
            .map(|r| r.record.total_matched_quantity)
            .sum();
        let total_realized_pnl = records.iter().map(|r| r.record.total_realized_pnl).sum();
        let pending_reconciliation = records.iter().filter(|r| !r.record.price_updated).count();

        Self {
            copy_trading_id,
            sell_count: records.len(),
            total_matched_quantity,
            total_realized_pnl,
            pending_reconciliation,
            records,
        }
    }
}
