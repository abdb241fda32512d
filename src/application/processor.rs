//! The single funnel both ingestors feed.
//!
//! Admission into the dedup ledger is the exactly-once gate: whichever path
//! delivers a trade first wins, the other sees [`ProcessOutcome::Duplicate`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::settlement::{SellFill, SettlementEngine};
use crate::domain::{
    Admission, CopyTrading, LeaderId, MatchKey, NewBuyLot, NewFailedTrade, NewProcessedTrade,
    ProcessOutcome, Side, TradeEvent, TradeSource, TradeStatus,
};
use crate::error::Result;
use crate::port::inbound::trade::TradeHandler;
use crate::port::outbound::directory::{BuyLotBook, CopyTradingDirectory};
use crate::port::outbound::exchange::{ReplicatedOrder, TradeReplicator};
use crate::port::outbound::ledger::DedupLedger;

/// Admits, replicates and settles leader trades.
pub struct TradeEventProcessor {
    dedup: Arc<dyn DedupLedger>,
    directory: Arc<dyn CopyTradingDirectory>,
    lots: Arc<dyn BuyLotBook>,
    replicator: Arc<dyn TradeReplicator>,
    settlement: SettlementEngine,
}

impl TradeEventProcessor {
    #[must_use]
    pub fn new(
        dedup: Arc<dyn DedupLedger>,
        directory: Arc<dyn CopyTradingDirectory>,
        lots: Arc<dyn BuyLotBook>,
        replicator: Arc<dyn TradeReplicator>,
        settlement: SettlementEngine,
    ) -> Self {
        Self {
            dedup,
            directory,
            lots,
            replicator,
            settlement,
        }
    }

    /// Record a successful copy: BUYs open a lot, SELLs settle against lots.
    ///
    /// Returns whether a settlement record was written.
    async fn book(
        &self,
        relationship: &CopyTrading,
        event: &TradeEvent,
        order: ReplicatedOrder,
    ) -> bool {
        match event.side {
            Side::Buy => {
                let lot = NewBuyLot {
                    key: MatchKey {
                        copy_trading_id: relationship.id,
                        market: event.market.clone(),
                        outcome_index: event.outcome_index,
                    },
                    side: event.outcome_side(),
                    buy_order_id: order.order_id,
                    price: order.price,
                    quantity: order.quantity,
                };
                if let Err(e) = self.lots.open_lot(&lot).await {
                    error!(copy_trading_id = %relationship.id, trade_id = %event.id, error = %e, "Failed to open buy lot");
                }
                false
            }
            Side::Sell => {
                let fill = SellFill {
                    copy_trading_id: relationship.id,
                    sell_order_id: order.order_id,
                    leader_sell_trade_id: event.id.clone(),
                    market: event.market.clone(),
                    side: event.outcome_label.clone().unwrap_or_default(),
                    outcome_index: event.outcome_index,
                    sell_price: order.price,
                    sell_quantity: order.quantity,
                };
                match self.settlement.settle_sell(&fill).await {
                    Ok(record) => record.is_some(),
                    Err(e) => {
                        error!(copy_trading_id = %relationship.id, trade_id = %event.id, error = %e, "Settlement failed");
                        false
                    }
                }
            }
        }
    }

    async fn record_failure(
        &self,
        leader_id: LeaderId,
        relationship: &CopyTrading,
        event: &TradeEvent,
        message: String,
    ) {
        let failure = NewFailedTrade {
            leader_id,
            leader_trade_id: event.id.clone(),
            trade_type: event.side,
            copy_trading_id: relationship.id,
            account_id: relationship.account_id,
            market: event.market.clone(),
            side: event.outcome_side(),
            price: event.price,
            size: event.size,
            error_message: message,
        };
        match self.dedup.record_failure(&failure).await {
            Ok(row) => {
                warn!(
                    copy_trading_id = %relationship.id,
                    trade_id = %event.id,
                    retry_count = row.retry_count,
                    error = %row.error_message,
                    "Replication failed"
                );
            }
            Err(e) => {
                error!(copy_trading_id = %relationship.id, trade_id = %event.id, error = %e, "Failed to record replication failure");
            }
        }
    }
}

#[async_trait]
impl TradeHandler for TradeEventProcessor {
    async fn process_trade(
        &self,
        leader_id: LeaderId,
        event: TradeEvent,
        source: TradeSource,
    ) -> Result<ProcessOutcome> {
        let admission = self
            .dedup
            .admit(&NewProcessedTrade {
                leader_id,
                leader_trade_id: event.id.clone(),
                trade_type: event.side,
                source,
            })
            .await?;
        let processed_id = match admission {
            Admission::Admitted(id) => id,
            Admission::Duplicate => {
                debug!(leader_id = %leader_id, trade_id = %event.id, source = %source, "Duplicate trade");
                return Ok(ProcessOutcome::Duplicate);
            }
        };

        let relationships = match self.directory.enabled_relationships_for(leader_id).await {
            Ok(relationships) => relationships,
            Err(e) => {
                if let Err(mark) = self.dedup.mark_status(processed_id, TradeStatus::Failed).await {
                    error!(processed_id = %processed_id, error = %mark, "Failed to mark trade failed");
                }
                return Err(e);
            }
        };

        info!(
            leader_id = %leader_id,
            trade_id = %event.id,
            side = %event.side,
            price = %event.price,
            size = %event.size,
            source = %source,
            copies = relationships.len(),
            "New leader trade"
        );

        let mut copies = 0;
        let mut settled = 0;
        let mut failures = 0;
        for relationship in &relationships {
            match self.replicator.replicate(relationship, &event).await {
                Ok(order) => {
                    copies += 1;
                    debug!(copy_trading_id = %relationship.id, order_id = %order.order_id, "Replicated");
                    if self.book(relationship, &event, order).await {
                        settled += 1;
                    }
                }
                Err(e) => {
                    failures += 1;
                    self.record_failure(leader_id, relationship, &event, e.to_string())
                        .await;
                }
            }
        }

        let status = if failures == 0 {
            TradeStatus::Success
        } else {
            TradeStatus::Failed
        };
        self.dedup.mark_status(processed_id, status).await?;

        if failures == 0 {
            Ok(ProcessOutcome::Replicated { copies, settled })
        } else {
            Ok(ProcessOutcome::Failed { copies, failures })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CopyTradingId, TradeId};
    use crate::port::outbound::exchange::ReplicationError;
    use crate::port::outbound::ledger::SettlementLedger;
    use crate::testkit::domain::{leader, relationship, trade};
    use crate::testkit::memory::{MemoryLedger, ScriptedReplicator};
    use rust_decimal_macros::dec;

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        replicator: Arc<ScriptedReplicator>,
        processor: Arc<TradeEventProcessor>,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.add_leader(leader(1, "0xleader"));
        ledger.add_relationship(relationship(10, 1, 100));
        let replicator = Arc::new(ScriptedReplicator::new());
        let settlement = SettlementEngine::new(Arc::clone(&ledger) as Arc<dyn SettlementLedger>);
        let processor = Arc::new(TradeEventProcessor::new(
            Arc::clone(&ledger) as Arc<dyn DedupLedger>,
            Arc::clone(&ledger) as Arc<dyn CopyTradingDirectory>,
            Arc::clone(&ledger) as Arc<dyn BuyLotBook>,
            Arc::clone(&replicator) as Arc<dyn TradeReplicator>,
            settlement,
        ));
        Fixture {
            ledger,
            replicator,
            processor,
        }
    }

    #[tokio::test]
    async fn same_trade_twice_replicates_once() {
        let f = fixture();
        let event = trade("0xt1", Side::Buy, dec!(0.40), dec!(10));

        let first = f
            .processor
            .process_trade(LeaderId::new(1), event.clone(), TradeSource::Polling)
            .await
            .unwrap();
        let second = f
            .processor
            .process_trade(LeaderId::new(1), event, TradeSource::Streaming)
            .await
            .unwrap();

        assert_eq!(
            first,
            ProcessOutcome::Replicated {
                copies: 1,
                settled: 0
            }
        );
        assert!(second.is_duplicate());
        assert_eq!(f.replicator.calls().len(), 1);
        assert_eq!(f.ledger.processed().len(), 1);
        assert_eq!(f.ledger.processed()[0].status, TradeStatus::Success);
        assert_eq!(f.ledger.processed()[0].source, TradeSource::Polling);
    }

    #[tokio::test]
    async fn concurrent_delivery_replicates_once() {
        let f = fixture();
        let event = trade("0xt1", Side::Buy, dec!(0.40), dec!(10));

        let tasks: Vec<_> = [TradeSource::Polling, TradeSource::Streaming]
            .into_iter()
            .map(|source| {
                let processor = Arc::clone(&f.processor);
                let event = event.clone();
                tokio::spawn(async move {
                    processor
                        .process_trade(LeaderId::new(1), event, source)
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut duplicates = 0;
        for task in tasks {
            if task.await.unwrap().is_duplicate() {
                duplicates += 1;
            }
        }

        assert_eq!(duplicates, 1);
        assert_eq!(f.replicator.calls().len(), 1);
    }

    #[tokio::test]
    async fn buy_opens_a_lot_keyed_by_outcome() {
        let f = fixture();

        f.processor
            .process_trade(
                LeaderId::new(1),
                trade("0xt1", Side::Buy, dec!(0.40), dec!(6)),
                TradeSource::Polling,
            )
            .await
            .unwrap();

        let lots = f.ledger.lots();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].copy_trading_id, CopyTradingId::new(10));
        assert_eq!(lots[0].side, "Yes");
        assert_eq!(lots[0].outcome_index, Some(0));
        assert_eq!(lots[0].remaining_quantity, dec!(6));
    }

    #[tokio::test]
    async fn sell_after_buy_is_settled() {
        let f = fixture();
        let leader_id = LeaderId::new(1);
        f.processor
            .process_trade(
                leader_id,
                trade("0xb", Side::Buy, dec!(0.40), dec!(10)),
                TradeSource::Polling,
            )
            .await
            .unwrap();

        let outcome = f
            .processor
            .process_trade(
                leader_id,
                trade("0xs", Side::Sell, dec!(0.50), dec!(10)),
                TradeSource::Polling,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Replicated {
                copies: 1,
                settled: 1
            }
        );
        let records = f.ledger.all_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].leader_sell_trade_id, TradeId::from("0xs"));
        assert_eq!(records[0].total_realized_pnl, dec!(1.00));
    }

    #[tokio::test]
    async fn replication_failure_is_recorded_and_terminal() {
        let f = fixture();
        f.replicator.fail_for(
            CopyTradingId::new(10),
            ReplicationError::Rejected("insufficient balance".into()),
        );
        let event = trade("0xt1", Side::Buy, dec!(0.40), dec!(10));

        let outcome = f
            .processor
            .process_trade(LeaderId::new(1), event.clone(), TradeSource::Polling)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Failed {
                copies: 0,
                failures: 1
            }
        );
        assert_eq!(f.ledger.processed()[0].status, TradeStatus::Failed);
        let failed = f.ledger.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].copy_trading_id, CopyTradingId::new(10));
        assert!(failed[0].error_message.contains("insufficient balance"));
        assert!(f.ledger.lots().is_empty());

        f.replicator.succeed_for(CopyTradingId::new(10));
        let again = f
            .processor
            .process_trade(LeaderId::new(1), event, TradeSource::Polling)
            .await
            .unwrap();
        assert!(again.is_duplicate());
    }

    #[tokio::test]
    async fn each_relationship_gets_its_own_copy_and_failure_row() {
        let f = fixture();
        f.ledger.add_relationship(relationship(11, 1, 101));
        f.ledger.add_relationship(CopyTrading {
            enabled: false,
            ..relationship(12, 1, 102)
        });
        f.replicator.fail_for(
            CopyTradingId::new(11),
            ReplicationError::Unavailable("timeout".into()),
        );

        let outcome = f
            .processor
            .process_trade(
                LeaderId::new(1),
                trade("0xt1", Side::Buy, dec!(0.40), dec!(10)),
                TradeSource::Polling,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Failed {
                copies: 1,
                failures: 1
            }
        );
        assert_eq!(f.replicator.calls().len(), 2);
        assert_eq!(f.ledger.failed().len(), 1);
        assert_eq!(f.ledger.lots().len(), 1);
    }

    #[tokio::test]
    async fn trade_without_relationships_succeeds_with_no_copies() {
        let f = fixture();

        let outcome = f
            .processor
            .process_trade(
                LeaderId::new(2),
                trade("0xt1", Side::Buy, dec!(0.40), dec!(10)),
                TradeSource::Polling,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ProcessOutcome::Replicated {
                copies: 0,
                settled: 0
            }
        );
        assert_eq!(f.ledger.processed()[0].status, TradeStatus::Success);
    }
}
