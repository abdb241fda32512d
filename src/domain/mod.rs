//! Venue-agnostic domain types: trade events, ledger rows and FIFO matching.

pub mod directory;
pub mod error;
pub mod id;
pub mod ledger;
pub mod matching;
pub mod stats;
pub mod trade;

pub use directory::{Account, ApiCredentials, CopyTrading, Leader};
pub use id::{
    AccountId, CopyTradingId, LeaderId, LotId, MatchRecordId, OrderId, ProcessedTradeId, TradeId,
};
pub use ledger::{
    realized_pnl, Admission, FailedTrade, NewFailedTrade, NewProcessedTrade, NewSellMatch,
    NewSellMatchDetail, PriceCorrection, ProcessedTrade, SellMatchDetail, SellMatchRecord,
    TradeStatus,
};
pub use matching::{
    plan_fifo, plan_settlement, BuyLot, MatchKey, MatchPlan, NewBuyLot, SellFill, SettlementPlan,
    Settled, SkipReason,
};
pub use stats::{RecordWithDetails, SettlementSummary};
pub use trade::{ProcessOutcome, Side, TradeEvent, TradeSource};
