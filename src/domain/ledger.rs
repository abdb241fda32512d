//! Ledger row types: the dedup ledger, the failed-trade ledger and the
//! realized-PnL settlement ledger.
//!
//! # Invariants
//!
//! - At most one [`ProcessedTrade`] exists per `(leader_id, leader_trade_id)`.
//! - A [`SellMatchRecord`]'s totals always equal the sums over its
//!   [`SellMatchDetail`] rows.
//! - Each detail satisfies `realized_pnl == (sell_price - buy_price) * matched_quantity`
//!   with `matched_quantity > 0`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::error::DomainError;
use super::id::{
    AccountId, CopyTradingId, LeaderId, LotId, MatchRecordId, OrderId, ProcessedTradeId, TradeId,
};
use super::trade::{Side, TradeSource};

/// Realized profit or loss of selling `quantity` bought at `buy_price`.
#[must_use]
pub fn realized_pnl(sell_price: Decimal, buy_price: Decimal, quantity: Decimal) -> Decimal {
    (sell_price - buy_price) * quantity
}

/// Processing state of an admitted trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    /// Admitted, replication still in flight.
    Pending,
    Success,
    Failed,
}

impl TradeStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "SUCCESS" => Ok(Self::Success),
            "FAILED" => Ok(Self::Failed),
            other => Err(DomainError::UnknownVariant {
                kind: "trade status",
                value: other.to_string(),
            }),
        }
    }
}

/// Admission request for the dedup ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProcessedTrade {
    pub leader_id: LeaderId,
    pub leader_trade_id: TradeId,
    pub trade_type: Side,
    pub source: TradeSource,
}

/// Result of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The key was new; the row now exists with [`TradeStatus::Pending`].
    Admitted(ProcessedTradeId),
    /// The key already existed.
    Duplicate,
}

/// A dedup ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessedTrade {
    pub id: ProcessedTradeId,
    pub leader_id: LeaderId,
    pub leader_trade_id: TradeId,
    pub trade_type: Side,
    pub source: TradeSource,
    pub status: TradeStatus,
    pub processed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A replication failure to append to the failed-trade ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFailedTrade {
    pub leader_id: LeaderId,
    pub leader_trade_id: TradeId,
    pub trade_type: Side,
    pub copy_trading_id: CopyTradingId,
    pub account_id: AccountId,
    pub market: String,
    /// Outcome side label (e.g. "Yes") the trade targeted.
    pub side: String,
    pub price: Decimal,
    pub size: Decimal,
    pub error_message: String,
}

/// A failed-trade ledger row. One row per failed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedTrade {
    pub id: i64,
    pub leader_id: LeaderId,
    pub leader_trade_id: TradeId,
    pub trade_type: Side,
    pub copy_trading_id: CopyTradingId,
    pub account_id: AccountId,
    pub market: String,
    pub side: String,
    pub price: Decimal,
    pub size: Decimal,
    pub error_message: String,
    /// Zero for the first failure of a trade, incremented per repeat.
    pub retry_count: i32,
    pub failed_at: DateTime<Utc>,
}

/// A detail row about to be written as part of a settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSellMatchDetail {
    /// Buy lot the quantity was taken from.
    pub tracking_id: LotId,
    pub buy_order_id: OrderId,
    pub matched_quantity: Decimal,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub realized_pnl: Decimal,
}

impl NewSellMatchDetail {
    /// Build a detail, computing its realized PnL.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NonPositiveQuantity`] if `matched_quantity <= 0`.
    pub fn try_new(
        tracking_id: LotId,
        buy_order_id: OrderId,
        matched_quantity: Decimal,
        buy_price: Decimal,
        sell_price: Decimal,
    ) -> Result<Self, DomainError> {
        if matched_quantity <= Decimal::ZERO {
            return Err(DomainError::NonPositiveQuantity {
                quantity: matched_quantity,
            });
        }
        Ok(Self {
            tracking_id,
            buy_order_id,
            matched_quantity,
            buy_price,
            sell_price,
            realized_pnl: realized_pnl(sell_price, buy_price, matched_quantity),
        })
    }
}

/// A settlement about to be written: one record and its details.
///
/// Totals are derived from the details at construction and cannot drift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSellMatch {
    pub copy_trading_id: CopyTradingId,
    pub sell_order_id: OrderId,
    pub leader_sell_trade_id: TradeId,
    pub market: String,
    pub side: String,
    pub outcome_index: Option<i32>,
    pub sell_price: Decimal,
    details: Vec<NewSellMatchDetail>,
}

impl NewSellMatch {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        copy_trading_id: CopyTradingId,
        sell_order_id: OrderId,
        leader_sell_trade_id: TradeId,
        market: String,
        side: String,
        outcome_index: Option<i32>,
        sell_price: Decimal,
        details: Vec<NewSellMatchDetail>,
    ) -> Self {
        Self {
            copy_trading_id,
            sell_order_id,
            leader_sell_trade_id,
            market,
            side,
            outcome_index,
            sell_price,
            details,
        }
    }

    #[must_use]
    pub fn details(&self) -> &[NewSellMatchDetail] {
        &self.details
    }

    #[must_use]
    pub fn total_matched_quantity(&self) -> Decimal {
        self.details.iter().map(|d| d.matched_quantity).sum()
    }

    #[must_use]
    pub fn total_realized_pnl(&self) -> Decimal {
        self.details.iter().map(|d| d.realized_pnl).sum()
    }
}

/// A persisted sell match record, one per replicated sell order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellMatchRecord {
    pub id: MatchRecordId,
    pub copy_trading_id: CopyTradingId,
    pub sell_order_id: OrderId,
    pub leader_sell_trade_id: TradeId,
    pub market: String,
    pub side: String,
    pub outcome_index: Option<i32>,
    pub total_matched_quantity: Decimal,
    pub sell_price: Decimal,
    pub total_realized_pnl: Decimal,
    /// Set once the sell price has been reconciled. Never reverts to false.
    pub price_updated: bool,
    pub created_at: DateTime<Utc>,
}

/// A persisted per-lot match detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SellMatchDetail {
    pub id: i64,
    pub match_record_id: MatchRecordId,
    pub tracking_id: LotId,
    pub buy_order_id: OrderId,
    pub matched_quantity: Decimal,
    pub buy_price: Decimal,
    pub sell_price: Decimal,
    pub realized_pnl: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Partial update applied when reconciliation corrects a sell price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceCorrection {
    pub record_id: MatchRecordId,
    pub sell_price: Decimal,
    pub total_realized_pnl: Decimal,
    /// `(detail id, recomputed realized pnl)` for every detail of the record.
    pub detail_pnls: Vec<(i64, Decimal)>,
}

impl PriceCorrection {
    /// Reprice every detail of a record at `sell_price`.
    #[must_use]
    pub fn reprice(
        record_id: MatchRecordId,
        sell_price: Decimal,
        details: &[SellMatchDetail],
    ) -> Self {
        let detail_pnls: Vec<(i64, Decimal)> = details
            .iter()
            .map(|d| {
                (
                    d.id,
                    realized_pnl(sell_price, d.buy_price, d.matched_quantity),
                )
            })
            .collect();
        let total_realized_pnl = detail_pnls.iter().map(|(_, pnl)| *pnl).sum();
        Self {
            record_id,
            sell_price,
            total_realized_pnl,
            detail_pnls,
        }
    }
}
