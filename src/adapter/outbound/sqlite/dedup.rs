//! SQLite dedup and failed-trade ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;

use super::database::connection::{with_connection, DbPool};
use super::database::model::{
    format_timestamp, last_insert_rowid, FailedTradeRow, NewFailedTradeRow, NewProcessedTradeRow,
    ProcessedTradeRow,
};
use super::database::schema::{failed_trades, processed_trades};
use crate::domain::{
    Admission, FailedTrade, LeaderId, NewFailedTrade, NewProcessedTrade, ProcessedTrade,
    ProcessedTradeId, TradeId, TradeStatus,
};
use crate::error::{Error, Result};
use crate::port::outbound::ledger::DedupLedger;

/// SQLite-backed [`DedupLedger`].
///
/// Admission is a single `INSERT OR IGNORE` against the unique
/// `(leader_id, leader_trade_id)` index.
pub struct SqliteDedupLedger {
    pool: DbPool,
}

impl SqliteDedupLedger {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DedupLedger for SqliteDedupLedger {
    async fn admit(&self, trade: &NewProcessedTrade) -> Result<Admission> {
        let now = format_timestamp(Utc::now());
        let row = NewProcessedTradeRow {
            leader_id: trade.leader_id.get(),
            leader_trade_id: trade.leader_trade_id.as_str().to_string(),
            trade_type: trade.trade_type.as_str().to_string(),
            source: trade.source.as_str().to_string(),
            status: TradeStatus::Pending.as_str().to_string(),
            processed_at: now.clone(),
            created_at: now,
        };

        with_connection(&self.pool, move |conn| {
            let admission = conn.immediate_transaction(|conn| {
                let inserted = diesel::insert_or_ignore_into(processed_trades::table)
                    .values(&row)
                    .execute(conn)?;
                if inserted == 0 {
                    return Ok::<_, diesel::result::Error>(Admission::Duplicate);
                }
                let id = last_insert_rowid(conn)?;
                Ok(Admission::Admitted(ProcessedTradeId::new(id)))
            })?;
            Ok(admission)
        })
        .await
    }

    async fn mark_status(&self, id: ProcessedTradeId, status: TradeStatus) -> Result<()> {
        let processed_at = format_timestamp(Utc::now());
        with_connection(&self.pool, move |conn| {
            let updated = diesel::update(
                processed_trades::table
                    .filter(processed_trades::id.eq(id.get()))
                    .filter(processed_trades::status.eq(TradeStatus::Pending.as_str())),
            )
            .set((
                processed_trades::status.eq(status.as_str()),
                processed_trades::processed_at.eq(processed_at),
            ))
            .execute(conn)?;
            if updated == 0 {
                return Err(Error::Database(format!(
                    "processed trade {id} is not pending"
                )));
            }
            Ok(())
        })
        .await
    }

    async fn find_processed(
        &self,
        leader_id: LeaderId,
        trade_id: &TradeId,
    ) -> Result<Option<ProcessedTrade>> {
        let trade_id = trade_id.as_str().to_string();
        with_connection(&self.pool, move |conn| {
            let row: Option<ProcessedTradeRow> = processed_trades::table
                .filter(processed_trades::leader_id.eq(leader_id.get()))
                .filter(processed_trades::leader_trade_id.eq(trade_id))
                .select(ProcessedTradeRow::as_select())
                .first(conn)
                .optional()?;
            row.map(ProcessedTradeRow::into_domain).transpose()
        })
        .await
    }

    async fn record_failure(&self, failure: &NewFailedTrade) -> Result<FailedTrade> {
        let failure = failure.clone();
        with_connection(&self.pool, move |conn| {
            let row = conn.immediate_transaction(|conn| {
                let previous: Option<i32> = failed_trades::table
                    .filter(failed_trades::leader_id.eq(failure.leader_id.get()))
                    .filter(failed_trades::leader_trade_id.eq(failure.leader_trade_id.as_str()))
                    .filter(failed_trades::copy_trading_id.eq(failure.copy_trading_id.get()))
                    .select(diesel::dsl::max(failed_trades::retry_count))
                    .first(conn)?;

                let new_row = NewFailedTradeRow {
                    leader_id: failure.leader_id.get(),
                    leader_trade_id: failure.leader_trade_id.as_str().to_string(),
                    trade_type: failure.trade_type.as_str().to_string(),
                    copy_trading_id: failure.copy_trading_id.get(),
                    account_id: failure.account_id.get(),
                    market: failure.market.clone(),
                    side: failure.side.clone(),
                    price: failure.price.to_string(),
                    size: failure.size.to_string(),
                    error_message: failure.error_message.clone(),
                    retry_count: previous.map_or(0, |n| n + 1),
                    failed_at: format_timestamp(Utc::now()),
                };
                diesel::insert_into(failed_trades::table)
                    .values(&new_row)
                    .execute(conn)?;
                let id = last_insert_rowid(conn)?;

                failed_trades::table
                    .find(id)
                    .select(FailedTradeRow::as_select())
                    .first::<FailedTradeRow>(conn)
            })?;
            row.into_domain()
        })
        .await
    }

    async fn failed_trades_for(
        &self,
        leader_id: LeaderId,
        trade_id: &TradeId,
    ) -> Result<Vec<FailedTrade>> {
        let trade_id = trade_id.as_str().to_string();
        with_connection(&self.pool, move |conn| {
            let rows: Vec<FailedTradeRow> = failed_trades::table
                .filter(failed_trades::leader_id.eq(leader_id.get()))
                .filter(failed_trades::leader_trade_id.eq(trade_id))
                .order(failed_trades::id.asc())
                .select(FailedTradeRow::as_select())
                .load(conn)?;
            rows.into_iter().map(FailedTradeRow::into_domain).collect()
        })
        .await
    }

    async fn purge_processed_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let cutoff = format_timestamp(cutoff);
        with_connection(&self.pool, move |conn| {
            let deleted = diesel::delete(
                processed_trades::table.filter(processed_trades::processed_at.lt(cutoff)),
            )
            .execute(conn)?;
            Ok(deleted)
        })
        .await
    }
}
