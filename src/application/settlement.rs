//! FIFO settlement of replicated sells.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::domain::{SellMatchRecord, Settled, SkipReason};
use crate::error::Result;
use crate::port::outbound::ledger::SettlementLedger;

pub use crate::domain::SellFill;

/// Turns a replicated sell into a match record against its open buy lots.
pub struct SettlementEngine {
    ledger: Arc<dyn SettlementLedger>,
}

impl SettlementEngine {
    #[must_use]
    pub fn new(ledger: Arc<dyn SettlementLedger>) -> Self {
        Self { ledger }
    }

    /// Match `fill` oldest-lot-first and persist the record, its details and
    /// the lot decrements together.
    ///
    /// A partial match is recorded as such. Returns `None` when no open lot
    /// can cover the fill, or when the fill names no outcome and the market
    /// holds lots in more than one.
    ///
    /// # Errors
    ///
    /// Fails on a non-positive sell quantity or a ledger error; nothing is
    /// written in either case.
    pub async fn settle_sell(&self, fill: &SellFill) -> Result<Option<SellMatchRecord>> {
        match self.ledger.settle(fill).await? {
            Settled::Recorded {
                record,
                unmatched_quantity,
            } => {
                if unmatched_quantity > Decimal::ZERO {
                    debug!(
                        copy_trading_id = %fill.copy_trading_id,
                        matched = %record.total_matched_quantity,
                        unmatched = %unmatched_quantity,
                        "Sell only partially matched"
                    );
                }
                info!(
                    record_id = %record.id,
                    copy_trading_id = %record.copy_trading_id,
                    matched = %record.total_matched_quantity,
                    realized_pnl = %record.total_realized_pnl,
                    "Settled sell"
                );
                Ok(Some(record))
            }
            Settled::Skipped(reason @ SkipReason::NoOpenLots) => {
                info!(
                    copy_trading_id = %fill.copy_trading_id,
                    market = %fill.market,
                    side = %fill.side,
                    %reason,
                    "No open lots to match sell"
                );
                Ok(None)
            }
            Settled::Skipped(reason) => {
                warn!(
                    copy_trading_id = %fill.copy_trading_id,
                    market = %fill.market,
                    %reason,
                    "Sell left unsettled"
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CopyTradingId, MatchKey, NewBuyLot, OrderId, TradeId};
    use crate::port::outbound::directory::BuyLotBook;
    use crate::testkit::memory::MemoryLedger;
    use rust_decimal_macros::dec;

    fn fill(quantity: Decimal, price: Decimal) -> SellFill {
        SellFill {
            copy_trading_id: CopyTradingId::new(1),
            sell_order_id: OrderId::from("0xs1"),
            leader_sell_trade_id: TradeId::from("0xleadersell"),
            market: "0xcond".into(),
            side: "Yes".into(),
            outcome_index: Some(0),
            sell_price: price,
            sell_quantity: quantity,
        }
    }

    async fn open_in(
        ledger: &MemoryLedger,
        order: &str,
        (side, outcome_index): (&str, i32),
        price: Decimal,
        quantity: Decimal,
    ) {
        ledger
            .open_lot(&NewBuyLot {
                key: MatchKey {
                    copy_trading_id: CopyTradingId::new(1),
                    market: "0xcond".into(),
                    outcome_index: Some(outcome_index),
                },
                side: side.into(),
                buy_order_id: OrderId::from(order),
                price,
                quantity,
            })
            .await
            .unwrap();
    }

    async fn open(ledger: &MemoryLedger, order: &str, price: Decimal, quantity: Decimal) {
        open_in(ledger, order, ("Yes", 0), price, quantity).await;
    }

    fn engine(ledger: &Arc<MemoryLedger>) -> SettlementEngine {
        SettlementEngine::new(Arc::clone(ledger) as Arc<dyn SettlementLedger>)
    }

    #[tokio::test]
    async fn sell_spanning_two_lots_is_matched_fifo() {
        let ledger = Arc::new(MemoryLedger::new());
        open(&ledger, "0xb1", dec!(0.40), dec!(6)).await;
        open(&ledger, "0xb2", dec!(0.45), dec!(8)).await;

        let record = engine(&ledger)
            .settle_sell(&fill(dec!(10), dec!(0.50)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.total_matched_quantity, dec!(10));
        assert_eq!(record.total_realized_pnl, dec!(0.80));
        assert!(!record.price_updated);

        let details = ledger.all_details();
        assert_eq!(details.len(), 2);
        assert_eq!(
            (details[0].matched_quantity, details[0].buy_price),
            (dec!(6), dec!(0.40))
        );
        assert_eq!(
            (details[1].matched_quantity, details[1].buy_price),
            (dec!(4), dec!(0.45))
        );

        let lots = ledger.lots();
        assert_eq!(lots[0].remaining_quantity, dec!(0));
        assert_eq!(lots[1].remaining_quantity, dec!(4));
    }

    #[tokio::test]
    async fn sell_larger_than_holdings_records_partial_match() {
        let ledger = Arc::new(MemoryLedger::new());
        open(&ledger, "0xb1", dec!(0.40), dec!(3)).await;

        let record = engine(&ledger)
            .settle_sell(&fill(dec!(10), dec!(0.50)))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(record.total_matched_quantity, dec!(3));
        assert_eq!(record.total_realized_pnl, dec!(0.30));
    }

    #[tokio::test]
    async fn sell_without_lots_writes_nothing() {
        let ledger = Arc::new(MemoryLedger::new());

        let record = engine(&ledger)
            .settle_sell(&fill(dec!(5), dec!(0.50)))
            .await
            .unwrap();

        assert!(record.is_none());
        assert!(ledger.all_records().is_empty());
    }

    #[tokio::test]
    async fn non_positive_quantity_is_rejected() {
        let ledger = Arc::new(MemoryLedger::new());
        open(&ledger, "0xb1", dec!(0.40), dec!(3)).await;

        assert!(engine(&ledger)
            .settle_sell(&fill(dec!(0), dec!(0.50)))
            .await
            .is_err());
        assert!(ledger.all_records().is_empty());
    }

    #[tokio::test]
    async fn sell_without_outcome_over_two_outcomes_is_left_alone() {
        let ledger = Arc::new(MemoryLedger::new());
        open_in(&ledger, "0xb1", ("Yes", 0), dec!(0.40), dec!(3)).await;
        open_in(&ledger, "0xb2", ("No", 1), dec!(0.60), dec!(3)).await;
        let unknown = SellFill {
            side: String::new(),
            outcome_index: None,
            ..fill(dec!(2), dec!(0.50))
        };

        assert!(engine(&ledger).settle_sell(&unknown).await.unwrap().is_none());
        assert!(ledger.all_records().is_empty());
        assert!(ledger
            .lots()
            .iter()
            .all(|lot| lot.remaining_quantity == dec!(3)));
    }
}
