//! In-memory ledgers and scripted collaborators.
//!
//! [`MemoryLedger`] implements every persistence port with the same
//! semantics as the SQLite adapters: atomic admission, all-or-nothing
//! settlement and cascading record deletion.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::domain::{
    plan_settlement, Account, AccountId, Admission, ApiCredentials, BuyLot, CopyTrading,
    CopyTradingId, FailedTrade, Leader, LeaderId, LotId, MatchKey, MatchRecordId, NewBuyLot,
    NewFailedTrade, NewProcessedTrade, OrderId, PriceCorrection, ProcessOutcome, ProcessedTrade,
    ProcessedTradeId, SellFill, SellMatchDetail, SellMatchRecord, Settled, SettlementPlan,
    TradeEvent, TradeId, TradeSource, TradeStatus,
};
use crate::error::{CredentialError, Error, Result};
use crate::port::inbound::trade::TradeHandler;
use crate::port::outbound::activity::{ActivityFeed, ActivityRecord};
use crate::port::outbound::directory::{BuyLotBook, CopyTradingDirectory};
use crate::port::outbound::exchange::{
    OrderQuery, ReplicatedOrder, ReplicationError, TradeReplicator,
};
use crate::port::outbound::ledger::{DedupLedger, SettlementLedger};
use crate::port::outbound::secret::SecretCipher;

// ---------------------------------------------------------------------------
// MemoryLedger
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    next_id: i64,
    processed: Vec<ProcessedTrade>,
    failed: Vec<FailedTrade>,
    records: Vec<SellMatchRecord>,
    details: Vec<SellMatchDetail>,
    leaders: Vec<Leader>,
    accounts: Vec<Account>,
    relationships: Vec<CopyTrading>,
    lots: Vec<BuyLot>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// All ledgers, the directory and the lot book in one mutex.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<State>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_leader(&self, leader: Leader) {
        self.state.lock().leaders.push(leader);
    }

    pub fn add_account(&self, account: Account) {
        self.state.lock().accounts.push(account);
    }

    pub fn add_relationship(&self, relationship: CopyTrading) {
        self.state.lock().relationships.push(relationship);
    }

    pub fn remove_account(&self, id: AccountId) {
        self.state.lock().accounts.retain(|a| a.id != id);
    }

    pub fn remove_relationship(&self, id: CopyTradingId) {
        self.state.lock().relationships.retain(|r| r.id != id);
    }

    pub fn set_enabled(&self, id: CopyTradingId, enabled: bool) {
        for relationship in &mut self.state.lock().relationships {
            if relationship.id == id {
                relationship.enabled = enabled;
            }
        }
    }

    pub fn processed(&self) -> Vec<ProcessedTrade> {
        self.state.lock().processed.clone()
    }

    pub fn failed(&self) -> Vec<FailedTrade> {
        self.state.lock().failed.clone()
    }

    pub fn all_records(&self) -> Vec<SellMatchRecord> {
        self.state.lock().records.clone()
    }

    pub fn all_details(&self) -> Vec<SellMatchDetail> {
        self.state.lock().details.clone()
    }

    pub fn lot(&self, id: LotId) -> Option<BuyLot> {
        self.state.lock().lots.iter().find(|l| l.id == id).cloned()
    }

    pub fn lots(&self) -> Vec<BuyLot> {
        self.state.lock().lots.clone()
    }

    /// Age a processed row, for retention tests.
    pub fn backdate_processed(&self, id: ProcessedTradeId, at: DateTime<Utc>) {
        for row in &mut self.state.lock().processed {
            if row.id == id {
                row.processed_at = at;
            }
        }
    }
}

#[async_trait]
impl DedupLedger for MemoryLedger {
    async fn admit(&self, trade: &NewProcessedTrade) -> Result<Admission> {
        let mut state = self.state.lock();
        let exists = state.processed.iter().any(|row| {
            row.leader_id == trade.leader_id && row.leader_trade_id == trade.leader_trade_id
        });
        if exists {
            return Ok(Admission::Duplicate);
        }
        let id = ProcessedTradeId::new(state.next_id());
        let now = Utc::now();
        state.processed.push(ProcessedTrade {
            id,
            leader_id: trade.leader_id,
            leader_trade_id: trade.leader_trade_id.clone(),
            trade_type: trade.trade_type,
            source: trade.source,
            status: TradeStatus::Pending,
            processed_at: now,
            created_at: now,
        });
        Ok(Admission::Admitted(id))
    }

    async fn mark_status(&self, id: ProcessedTradeId, status: TradeStatus) -> Result<()> {
        let mut state = self.state.lock();
        let row = state
            .processed
            .iter_mut()
            .find(|row| row.id == id && row.status == TradeStatus::Pending)
            .ok_or_else(|| Error::Database(format!("processed trade {id} is not pending")))?;
        row.status = status;
        row.processed_at = Utc::now();
        Ok(())
    }

    async fn find_processed(
        &self,
        leader_id: LeaderId,
        trade_id: &TradeId,
    ) -> Result<Option<ProcessedTrade>> {
        Ok(self
            .state
            .lock()
            .processed
            .iter()
            .find(|row| row.leader_id == leader_id && &row.leader_trade_id == trade_id)
            .cloned())
    }

    async fn record_failure(&self, failure: &NewFailedTrade) -> Result<FailedTrade> {
        let mut state = self.state.lock();
        let retry_count = state
            .failed
            .iter()
            .filter(|row| {
                row.leader_id == failure.leader_id
                    && row.leader_trade_id == failure.leader_trade_id
                    && row.copy_trading_id == failure.copy_trading_id
            })
            .map(|row| row.retry_count)
            .max()
            .map_or(0, |n| n + 1);
        let row = FailedTrade {
            id: state.next_id(),
            leader_id: failure.leader_id,
            leader_trade_id: failure.leader_trade_id.clone(),
            trade_type: failure.trade_type,
            copy_trading_id: failure.copy_trading_id,
            account_id: failure.account_id,
            market: failure.market.clone(),
            side: failure.side.clone(),
            price: failure.price,
            size: failure.size,
            error_message: failure.error_message.clone(),
            retry_count,
            failed_at: Utc::now(),
        };
        state.failed.push(row.clone());
        Ok(row)
    }

    async fn failed_trades_for(
        &self,
        leader_id: LeaderId,
        trade_id: &TradeId,
    ) -> Result<Vec<FailedTrade>> {
        Ok(self
            .state
            .lock()
            .failed
            .iter()
            .filter(|row| row.leader_id == leader_id && &row.leader_trade_id == trade_id)
            .cloned()
            .collect())
    }

    async fn purge_processed_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut state = self.state.lock();
        let before = state.processed.len();
        state.processed.retain(|row| row.processed_at >= cutoff);
        Ok(before - state.processed.len())
    }
}

#[async_trait]
impl SettlementLedger for MemoryLedger {
    async fn settle(&self, fill: &SellFill) -> Result<Settled> {
        let mut state = self.state.lock();

        let market_lots: Vec<BuyLot> = state
            .lots
            .iter()
            .filter(|l| l.copy_trading_id == fill.copy_trading_id && l.market == fill.market)
            .cloned()
            .collect();
        let (settlement, unmatched_quantity) = match plan_settlement(fill, &market_lots)? {
            SettlementPlan::Match {
                sell,
                unmatched_quantity,
            } => (sell, unmatched_quantity),
            SettlementPlan::Skip(reason) => return Ok(Settled::Skipped(reason)),
        };

        let now = Utc::now();
        let record_id = MatchRecordId::new(state.next_id());
        let record = SellMatchRecord {
            id: record_id,
            copy_trading_id: settlement.copy_trading_id,
            sell_order_id: settlement.sell_order_id.clone(),
            leader_sell_trade_id: settlement.leader_sell_trade_id.clone(),
            market: settlement.market.clone(),
            side: settlement.side.clone(),
            outcome_index: settlement.outcome_index,
            total_matched_quantity: settlement.total_matched_quantity(),
            sell_price: settlement.sell_price,
            total_realized_pnl: settlement.total_realized_pnl(),
            price_updated: false,
            created_at: now,
        };
        state.records.push(record.clone());

        for detail in settlement.details() {
            let id = state.next_id();
            state.details.push(SellMatchDetail {
                id,
                match_record_id: record_id,
                tracking_id: detail.tracking_id,
                buy_order_id: detail.buy_order_id.clone(),
                matched_quantity: detail.matched_quantity,
                buy_price: detail.buy_price,
                sell_price: detail.sell_price,
                realized_pnl: detail.realized_pnl,
                created_at: now,
            });
            if let Some(lot) = state.lots.iter_mut().find(|l| l.id == detail.tracking_id) {
                lot.remaining_quantity -= detail.matched_quantity;
            }
        }
        Ok(Settled::Recorded {
            record,
            unmatched_quantity,
        })
    }

    async fn records(&self) -> Result<Vec<SellMatchRecord>> {
        Ok(self.all_records())
    }

    async fn pending_records(&self) -> Result<Vec<SellMatchRecord>> {
        Ok(self
            .state
            .lock()
            .records
            .iter()
            .filter(|r| !r.price_updated)
            .cloned()
            .collect())
    }

    async fn records_for(&self, copy_trading_id: CopyTradingId) -> Result<Vec<SellMatchRecord>> {
        Ok(self
            .state
            .lock()
            .records
            .iter()
            .filter(|r| r.copy_trading_id == copy_trading_id)
            .cloned()
            .collect())
    }

    async fn details(&self, record_id: MatchRecordId) -> Result<Vec<SellMatchDetail>> {
        Ok(self
            .state
            .lock()
            .details
            .iter()
            .filter(|d| d.match_record_id == record_id)
            .cloned()
            .collect())
    }

    async fn mark_price_final(&self, record_id: MatchRecordId) -> Result<()> {
        let mut state = self.state.lock();
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == record_id)
            .ok_or_else(|| Error::Database(format!("record {record_id} not found")))?;
        record.price_updated = true;
        Ok(())
    }

    async fn update_price(&self, correction: &PriceCorrection) -> Result<()> {
        let mut state = self.state.lock();
        if !state.records.iter().any(|r| r.id == correction.record_id) {
            return Err(Error::Database(format!(
                "record {} not found",
                correction.record_id
            )));
        }
        for (detail_id, pnl) in &correction.detail_pnls {
            if let Some(detail) = state.details.iter_mut().find(|d| d.id == *detail_id) {
                detail.sell_price = correction.sell_price;
                detail.realized_pnl = *pnl;
            }
        }
        if let Some(record) = state
            .records
            .iter_mut()
            .find(|r| r.id == correction.record_id)
        {
            record.sell_price = correction.sell_price;
            record.total_realized_pnl = correction.total_realized_pnl;
            record.price_updated = true;
        }
        Ok(())
    }

    async fn delete_record(&self, record_id: MatchRecordId) -> Result<()> {
        let mut state = self.state.lock();
        state.details.retain(|d| d.match_record_id != record_id);
        state.records.retain(|r| r.id != record_id);
        Ok(())
    }
}

#[async_trait]
impl CopyTradingDirectory for MemoryLedger {
    async fn leader(&self, id: LeaderId) -> Result<Option<Leader>> {
        Ok(self
            .state
            .lock()
            .leaders
            .iter()
            .find(|l| l.id == id)
            .cloned())
    }

    async fn enabled_relationships(&self) -> Result<Vec<CopyTrading>> {
        Ok(self
            .state
            .lock()
            .relationships
            .iter()
            .filter(|r| r.enabled)
            .cloned()
            .collect())
    }

    async fn enabled_relationships_for(&self, leader_id: LeaderId) -> Result<Vec<CopyTrading>> {
        Ok(self
            .state
            .lock()
            .relationships
            .iter()
            .filter(|r| r.enabled && r.leader_id == leader_id)
            .cloned()
            .collect())
    }

    async fn relationship(&self, id: CopyTradingId) -> Result<Option<CopyTrading>> {
        Ok(self
            .state
            .lock()
            .relationships
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        Ok(self
            .state
            .lock()
            .accounts
            .iter()
            .find(|a| a.id == id)
            .cloned())
    }
}

#[async_trait]
impl BuyLotBook for MemoryLedger {
    async fn open_lots(&self, key: &MatchKey) -> Result<Vec<BuyLot>> {
        Ok(self
            .state
            .lock()
            .lots
            .iter()
            .filter(|lot| {
                key.admits(lot) && lot.remaining_quantity > Decimal::ZERO
            })
            .cloned()
            .collect())
    }

    async fn open_lot(&self, lot: &NewBuyLot) -> Result<BuyLot> {
        let mut state = self.state.lock();
        let opened = BuyLot {
            id: LotId::new(state.next_id()),
            copy_trading_id: lot.key.copy_trading_id,
            buy_order_id: lot.buy_order_id.clone(),
            market: lot.key.market.clone(),
            side: lot.side.clone(),
            outcome_index: lot.key.outcome_index,
            price: lot.price,
            remaining_quantity: lot.quantity,
            created_at: Utc::now(),
        };
        state.lots.push(opened.clone());
        Ok(opened)
    }
}

// ---------------------------------------------------------------------------
// ScriptedFeed
// ---------------------------------------------------------------------------

/// Activity feed answering from per-address scripts.
///
/// Unknown addresses get an empty window.
#[derive(Default)]
pub struct ScriptedFeed {
    responses: Mutex<HashMap<String, Option<Vec<ActivityRecord>>>>,
    calls: AtomicU32,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` (newest first) for `address` until replaced.
    pub fn respond(&self, address: &str, records: Vec<ActivityRecord>) {
        self.responses
            .lock()
            .insert(address.to_lowercase(), Some(records));
    }

    /// Fail every fetch for `address` until replaced.
    pub fn fail(&self, address: &str) {
        self.responses.lock().insert(address.to_lowercase(), None);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActivityFeed for ScriptedFeed {
    async fn recent_trades(&self, address: &str, limit: u32) -> Result<Vec<ActivityRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.lock().get(address) {
            Some(Some(records)) => Ok(records.iter().take(limit as usize).cloned().collect()),
            Some(None) => Err(Error::Connection(format!("scripted failure for {address}"))),
            None => Ok(Vec::new()),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingHandler
// ---------------------------------------------------------------------------

/// Trade handler that records every call and replicates nothing.
#[derive(Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<(LeaderId, TradeEvent, TradeSource)>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<(LeaderId, TradeEvent, TradeSource)> {
        self.calls.lock().clone()
    }

    pub fn trade_ids(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .map(|(_, event, _)| event.id.as_str().to_string())
            .collect()
    }

    pub fn sources(&self) -> Vec<TradeSource> {
        self.calls.lock().iter().map(|(_, _, source)| *source).collect()
    }
}

#[async_trait]
impl TradeHandler for RecordingHandler {
    async fn process_trade(
        &self,
        leader_id: LeaderId,
        event: TradeEvent,
        source: TradeSource,
    ) -> Result<ProcessOutcome> {
        self.calls.lock().push((leader_id, event, source));
        Ok(ProcessOutcome::Replicated {
            copies: 0,
            settled: 0,
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedReplicator
// ---------------------------------------------------------------------------

/// Replicator that fills at the leader's price with `0x`-hex order ids,
/// except for relationships scripted to fail.
#[derive(Default)]
pub struct ScriptedReplicator {
    failures: Mutex<HashMap<CopyTradingId, ReplicationError>>,
    fill_quantity: Mutex<Option<Decimal>>,
    calls: Mutex<Vec<(CopyTradingId, TradeId)>>,
}

impl ScriptedReplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, copy_trading_id: CopyTradingId, error: ReplicationError) {
        self.failures.lock().insert(copy_trading_id, error);
    }

    pub fn succeed_for(&self, copy_trading_id: CopyTradingId) {
        self.failures.lock().remove(&copy_trading_id);
    }

    /// Fill every copy with `quantity` instead of the leader's size.
    pub fn fill_quantity(&self, quantity: Decimal) {
        *self.fill_quantity.lock() = Some(quantity);
    }

    pub fn calls(&self) -> Vec<(CopyTradingId, TradeId)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl TradeReplicator for ScriptedReplicator {
    async fn replicate(
        &self,
        relationship: &CopyTrading,
        event: &TradeEvent,
    ) -> std::result::Result<ReplicatedOrder, ReplicationError> {
        let sequence = {
            let mut calls = self.calls.lock();
            calls.push((relationship.id, event.id.clone()));
            calls.len()
        };
        if let Some(error) = self.failures.lock().get(&relationship.id) {
            return Err(error.clone());
        }
        Ok(ReplicatedOrder {
            order_id: OrderId::new(format!("0x{sequence:04x}")),
            price: event.price,
            quantity: self.fill_quantity.lock().unwrap_or(event.size),
        })
    }
}

// ---------------------------------------------------------------------------
// FixedOrderQuery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Answer {
    Price(Option<Decimal>),
    Fail,
    Hang,
}

/// Order query with scripted answers per order id.
///
/// Unscripted orders report no fill.
#[derive(Default)]
pub struct FixedOrderQuery {
    answers: Mutex<HashMap<String, Answer>>,
    calls: AtomicU32,
}

impl FixedOrderQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn price(&self, order_id: &str, price: Decimal) {
        self.answers
            .lock()
            .insert(order_id.to_string(), Answer::Price(Some(price)));
    }

    pub fn fail(&self, order_id: &str) {
        self.answers.lock().insert(order_id.to_string(), Answer::Fail);
    }

    /// Never answer, to exercise query timeouts.
    pub fn hang(&self, order_id: &str) {
        self.answers.lock().insert(order_id.to_string(), Answer::Hang);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderQuery for FixedOrderQuery {
    async fn executed_price(
        &self,
        _credentials: &ApiCredentials,
        order_id: &OrderId,
    ) -> Result<Option<Decimal>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .answers
            .lock()
            .get(order_id.as_str())
            .cloned()
            .unwrap_or(Answer::Price(None));
        match answer {
            Answer::Price(price) => Ok(price),
            Answer::Fail => Err(Error::Connection("scripted order query failure".into())),
            Answer::Hang => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// PlainCipher
// ---------------------------------------------------------------------------

/// Reversible `enc:` prefix cipher. Values without the prefix fail to decrypt.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCipher;

impl SecretCipher for PlainCipher {
    fn encrypt(&self, plaintext: &str) -> std::result::Result<String, CredentialError> {
        Ok(format!("enc:{plaintext}"))
    }

    fn decrypt(&self, ciphertext: &str) -> std::result::Result<String, CredentialError> {
        ciphertext
            .strip_prefix("enc:")
            .map(str::to_string)
            .ok_or_else(|| CredentialError::Decrypt {
                field: "ciphertext",
                reason: "missing enc: prefix".into(),
            })
    }
}
