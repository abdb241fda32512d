//! Ledger persistence ports.
//!
//! Both ledgers are the only cross-task source of truth; implementations must
//! rely on store-level atomicity, not application locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Admission, CopyTradingId, FailedTrade, LeaderId, MatchRecordId, NewFailedTrade,
    NewProcessedTrade, PriceCorrection, ProcessedTrade, ProcessedTradeId, SellFill,
    SellMatchDetail, SellMatchRecord, Settled, TradeId, TradeStatus,
};
use crate::error::Result;

/// Idempotency store for leader trades plus the failed-trade ledger.
#[async_trait]
pub trait DedupLedger: Send + Sync {
    /// Insert a pending row for the trade's key in one atomic step.
    ///
    /// Returns [`Admission::Duplicate`] if the key already exists.
    async fn admit(&self, trade: &NewProcessedTrade) -> Result<Admission>;

    /// Move an admitted row from pending to its final status.
    async fn mark_status(&self, id: ProcessedTradeId, status: TradeStatus) -> Result<()>;

    /// Look up the row for a key.
    async fn find_processed(
        &self,
        leader_id: LeaderId,
        trade_id: &TradeId,
    ) -> Result<Option<ProcessedTrade>>;

    /// Append a failure row, numbering it after earlier failures of the same
    /// trade and relationship.
    async fn record_failure(&self, failure: &NewFailedTrade) -> Result<FailedTrade>;

    /// All failure rows of a trade, oldest first.
    async fn failed_trades_for(
        &self,
        leader_id: LeaderId,
        trade_id: &TradeId,
    ) -> Result<Vec<FailedTrade>>;

    /// Delete processed rows older than `cutoff`. Returns the count deleted.
    async fn purge_processed_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Realized-PnL ledger.
#[async_trait]
pub trait SettlementLedger: Send + Sync {
    /// Match `fill` against the open lots of its market and write the
    /// record, its details and the lot decrements.
    ///
    /// Reading the lots, planning and writing happen in one transaction, so
    /// concurrent sells never plan against the same remaining quantity.
    async fn settle(&self, fill: &SellFill) -> Result<Settled>;

    /// Every record.
    async fn records(&self) -> Result<Vec<SellMatchRecord>>;

    /// Records whose price is not yet reconciled.
    async fn pending_records(&self) -> Result<Vec<SellMatchRecord>>;

    /// Records of one relationship, oldest first.
    async fn records_for(&self, copy_trading_id: CopyTradingId) -> Result<Vec<SellMatchRecord>>;

    async fn details(&self, record_id: MatchRecordId) -> Result<Vec<SellMatchDetail>>;

    /// Set `price_updated` without touching price or PnL.
    async fn mark_price_final(&self, record_id: MatchRecordId) -> Result<()>;

    /// Apply a corrected price to the record and all its details, and set
    /// `price_updated`, in one transaction.
    async fn update_price(&self, correction: &PriceCorrection) -> Result<()>;

    /// Delete a record and its details.
    async fn delete_record(&self, record_id: MatchRecordId) -> Result<()>;
}
