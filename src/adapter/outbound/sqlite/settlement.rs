//! SQLite realized-PnL ledger.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use super::database::connection::{with_connection, DbPool};
use super::database::model::{
    format_timestamp, last_insert_rowid, parse_decimal, NewSellMatchDetailRow,
    NewSellMatchRecordRow, SellMatchDetailRow, SellMatchRecordRow,
};
use super::database::schema::{buy_lots, sell_match_details, sell_match_records};
use super::directory::market_lots;
use crate::domain::{
    plan_settlement, CopyTradingId, MatchRecordId, NewSellMatch, PriceCorrection, SellFill,
    SellMatchDetail, SellMatchRecord, Settled, SettlementPlan,
};
use crate::error::{Error, Result};
use crate::port::outbound::ledger::SettlementLedger;

/// SQLite-backed [`SettlementLedger`].
pub struct SqliteSettlementLedger {
    pool: DbPool,
}

impl SqliteSettlementLedger {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn load_records(
    conn: &mut SqliteConnection,
    query: sell_match_records::BoxedQuery<'static, diesel::sqlite::Sqlite>,
) -> Result<Vec<SellMatchRecord>> {
    let rows: Vec<SellMatchRecordRow> = query
        .order(sell_match_records::id.asc())
        .select(SellMatchRecordRow::as_select())
        .load(conn)?;
    rows.into_iter()
        .map(SellMatchRecordRow::into_domain)
        .collect()
}

/// Subtract `quantity` from a lot's remaining quantity.
fn decrement_lot(
    conn: &mut SqliteConnection,
    lot_id: i64,
    quantity: rust_decimal::Decimal,
) -> Result<()> {
    let remaining: String = buy_lots::table
        .find(lot_id)
        .select(buy_lots::remaining_quantity)
        .first(conn)?;
    let remaining = parse_decimal("remaining_quantity", &remaining)?;
    if remaining < quantity {
        return Err(Error::Database(format!(
            "lot {lot_id} has {remaining} remaining, cannot take {quantity}"
        )));
    }
    diesel::update(buy_lots::table.find(lot_id))
        .set(buy_lots::remaining_quantity.eq((remaining - quantity).to_string()))
        .execute(conn)?;
    Ok(())
}

/// Write the record, its details and the lot decrements.
///
/// Must run inside the transaction that read the lots.
fn insert_settlement(
    conn: &mut SqliteConnection,
    settlement: &NewSellMatch,
) -> Result<SellMatchRecord> {
    let created_at = format_timestamp(Utc::now());
    let record = NewSellMatchRecordRow {
        copy_trading_id: settlement.copy_trading_id.get(),
        sell_order_id: settlement.sell_order_id.as_str().to_string(),
        leader_sell_trade_id: settlement.leader_sell_trade_id.as_str().to_string(),
        market: settlement.market.clone(),
        side: settlement.side.clone(),
        outcome_index: settlement.outcome_index,
        total_matched_quantity: settlement.total_matched_quantity().to_string(),
        sell_price: settlement.sell_price.to_string(),
        total_realized_pnl: settlement.total_realized_pnl().to_string(),
        price_updated: false,
        created_at: created_at.clone(),
    };
    diesel::insert_into(sell_match_records::table)
        .values(&record)
        .execute(conn)?;
    let record_id = last_insert_rowid(conn)?;

    let details: Vec<NewSellMatchDetailRow> = settlement
        .details()
        .iter()
        .map(|d| NewSellMatchDetailRow {
            match_record_id: record_id,
            tracking_id: d.tracking_id.get(),
            buy_order_id: d.buy_order_id.as_str().to_string(),
            matched_quantity: d.matched_quantity.to_string(),
            buy_price: d.buy_price.to_string(),
            sell_price: d.sell_price.to_string(),
            realized_pnl: d.realized_pnl.to_string(),
            created_at: created_at.clone(),
        })
        .collect();
    diesel::insert_into(sell_match_details::table)
        .values(&details)
        .execute(conn)?;

    for detail in settlement.details() {
        decrement_lot(conn, detail.tracking_id.get(), detail.matched_quantity)?;
    }

    sell_match_records::table
        .find(record_id)
        .select(SellMatchRecordRow::as_select())
        .first::<SellMatchRecordRow>(conn)?
        .into_domain()
}

#[async_trait]
impl SettlementLedger for SqliteSettlementLedger {
    async fn settle(&self, fill: &SellFill) -> Result<Settled> {
        let fill = fill.clone();
        with_connection(&self.pool, move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                let lots = market_lots(conn, fill.copy_trading_id, &fill.market)?;
                let (settlement, unmatched_quantity) = match plan_settlement(&fill, &lots)? {
                    SettlementPlan::Match {
                        sell,
                        unmatched_quantity,
                    } => (sell, unmatched_quantity),
                    SettlementPlan::Skip(reason) => return Ok(Settled::Skipped(reason)),
                };
                let record = insert_settlement(conn, &settlement)?;
                Ok(Settled::Recorded {
                    record,
                    unmatched_quantity,
                })
            })
        })
        .await
    }

    async fn records(&self) -> Result<Vec<SellMatchRecord>> {
        with_connection(&self.pool, |conn| {
            load_records(conn, sell_match_records::table.into_boxed())
        })
        .await
    }

    async fn pending_records(&self) -> Result<Vec<SellMatchRecord>> {
        with_connection(&self.pool, |conn| {
            load_records(
                conn,
                sell_match_records::table
                    .filter(sell_match_records::price_updated.eq(false))
                    .into_boxed(),
            )
        })
        .await
    }

    async fn records_for(&self, copy_trading_id: CopyTradingId) -> Result<Vec<SellMatchRecord>> {
        with_connection(&self.pool, move |conn| {
            load_records(
                conn,
                sell_match_records::table
                    .filter(sell_match_records::copy_trading_id.eq(copy_trading_id.get()))
                    .into_boxed(),
            )
        })
        .await
    }

    async fn details(&self, record_id: MatchRecordId) -> Result<Vec<SellMatchDetail>> {
        with_connection(&self.pool, move |conn| {
            let rows: Vec<SellMatchDetailRow> = sell_match_details::table
                .filter(sell_match_details::match_record_id.eq(record_id.get()))
                .order(sell_match_details::id.asc())
                .select(SellMatchDetailRow::as_select())
                .load(conn)?;
            rows.into_iter()
                .map(SellMatchDetailRow::into_domain)
                .collect()
        })
        .await
    }

    async fn mark_price_final(&self, record_id: MatchRecordId) -> Result<()> {
        with_connection(&self.pool, move |conn| {
            diesel::update(sell_match_records::table.find(record_id.get()))
                .set(sell_match_records::price_updated.eq(true))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn update_price(&self, correction: &PriceCorrection) -> Result<()> {
        let correction = correction.clone();
        with_connection(&self.pool, move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                let record_id = correction.record_id.get();
                let sell_price = correction.sell_price.to_string();

                for (detail_id, pnl) in &correction.detail_pnls {
                    diesel::update(
                        sell_match_details::table
                            .filter(sell_match_details::id.eq(*detail_id))
                            .filter(sell_match_details::match_record_id.eq(record_id)),
                    )
                    .set((
                        sell_match_details::sell_price.eq(&sell_price),
                        sell_match_details::realized_pnl.eq(pnl.to_string()),
                    ))
                    .execute(conn)?;
                }

                let updated = diesel::update(sell_match_records::table.find(record_id))
                    .set((
                        sell_match_records::sell_price.eq(&sell_price),
                        sell_match_records::total_realized_pnl
                            .eq(correction.total_realized_pnl.to_string()),
                        sell_match_records::price_updated.eq(true),
                    ))
                    .execute(conn)?;
                if updated == 0 {
                    return Err(Error::Database(format!(
                        "sell match record {record_id} not found"
                    )));
                }
                Ok(())
            })
        })
        .await
    }

    async fn delete_record(&self, record_id: MatchRecordId) -> Result<()> {
        with_connection(&self.pool, move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                diesel::delete(
                    sell_match_details::table
                        .filter(sell_match_details::match_record_id.eq(record_id.get())),
                )
                .execute(conn)?;
                diesel::delete(sell_match_records::table.find(record_id.get())).execute(conn)?;
                Ok(())
            })
        })
        .await
    }
}
