//! Leader activity feed port.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Side, TradeEvent, TradeId};
use crate::error::Result;

/// Activity type carried by trade items.
pub const TRADE_ACTIVITY: &str = "TRADE";

/// One item of a wallet's on-chain activity, as reported by the venue.
///
/// Every field is optional: the feed is untrusted and incomplete items are
/// dropped by [`ActivityRecord::into_trade_event`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityRecord {
    pub activity_type: Option<String>,
    pub side: Option<String>,
    pub price: Option<Decimal>,
    pub size: Option<Decimal>,
    pub timestamp: Option<i64>,
    pub condition_id: Option<String>,
    pub outcome_index: Option<i32>,
    pub outcome: Option<String>,
    pub proxy_wallet: Option<String>,
    pub transaction_hash: Option<String>,
}

impl ActivityRecord {
    /// Map to a trade event, or `None` when the item is not a complete trade.
    ///
    /// Items without a transaction hash get a synthesized `timestamp_market` id.
    #[must_use]
    pub fn into_trade_event(self) -> Option<TradeEvent> {
        if self.activity_type.as_deref() != Some(TRADE_ACTIVITY) {
            return None;
        }
        let side: Side = self.side.as_deref()?.parse().ok()?;
        let price = self.price?;
        let size = self.size?;
        let market = self.condition_id?;
        let timestamp_secs = self.timestamp.unwrap_or_default();

        let id = match self.transaction_hash.filter(|hash| !hash.is_empty()) {
            Some(hash) => TradeId::new(hash),
            None => TradeId::synthesized(timestamp_secs, &market),
        };

        Some(TradeEvent {
            id,
            market,
            side,
            price,
            size,
            timestamp_secs,
            source_wallet: self.proxy_wallet,
            outcome_index: self.outcome_index,
            outcome_label: self.outcome,
        })
    }
}

/// Read access to a wallet's recent activity.
#[async_trait]
pub trait ActivityFeed: Send + Sync {
    /// Fetch up to `limit` most recent TRADE items for `address`, newest first.
    async fn recent_trades(&self, address: &str, limit: u32) -> Result<Vec<ActivityRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn trade_record() -> ActivityRecord {
        ActivityRecord {
            activity_type: Some("TRADE".into()),
            side: Some("BUY".into()),
            price: Some(dec!(0.42)),
            size: Some(dec!(10)),
            timestamp: Some(1_700_000_000),
            condition_id: Some("0xcond".into()),
            outcome_index: Some(0),
            outcome: Some("Yes".into()),
            proxy_wallet: Some("0xleader".into()),
            transaction_hash: Some("0xhash".into()),
        }
    }

    #[test]
    fn complete_trade_maps_to_event() {
        let event = trade_record().into_trade_event().unwrap();
        assert_eq!(event.id.as_str(), "0xhash");
        assert_eq!(event.market, "0xcond");
        assert_eq!(event.side, Side::Buy);
        assert_eq!(event.price, dec!(0.42));
        assert_eq!(event.outcome_label.as_deref(), Some("Yes"));
    }

    #[test]
    fn missing_hash_synthesizes_id() {
        let record = ActivityRecord {
            transaction_hash: None,
            ..trade_record()
        };
        let event = record.into_trade_event().unwrap();
        assert_eq!(event.id.as_str(), "1700000000_0xcond");
    }

    #[test]
    fn non_trade_items_are_dropped() {
        let record = ActivityRecord {
            activity_type: Some("REDEEM".into()),
            ..trade_record()
        };
        assert!(record.into_trade_event().is_none());
    }

    #[test]
    fn items_missing_side_price_or_size_are_dropped() {
        let no_side = ActivityRecord {
            side: None,
            ..trade_record()
        };
        let no_price = ActivityRecord {
            price: None,
            ..trade_record()
        };
        let no_size = ActivityRecord {
            size: None,
            ..trade_record()
        };
        assert!(no_side.into_trade_event().is_none());
        assert!(no_price.into_trade_event().is_none());
        assert!(no_size.into_trade_event().is_none());
    }
}
