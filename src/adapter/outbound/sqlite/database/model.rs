//! Database model types for Diesel ORM.
//!
//! Decimals are stored as text and timestamps as fixed-width RFC 3339 UTC text
//! so that lexical order matches time order.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::schema::{
    accounts, buy_lots, copy_tradings, failed_trades, leaders, processed_trades,
    sell_match_details, sell_match_records,
};
use crate::domain::error::DomainError;
use crate::domain::{
    Account, BuyLot, CopyTrading, FailedTrade, Leader, OrderId, ProcessedTrade, SellMatchDetail,
    SellMatchRecord, TradeId,
};
use crate::error::{Error, Result};

pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Parse(e.to_string()))
}

pub(crate) fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal> {
    Decimal::from_str(value).map_err(|_| {
        DomainError::InvalidDecimal {
            field,
            value: value.to_string(),
        }
        .into()
    })
}

/// Last inserted row id on the current connection.
#[derive(QueryableByName)]
pub(crate) struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    #[diesel(column_name = "id")]
    pub id: i64,
}

pub(crate) fn last_insert_rowid(conn: &mut SqliteConnection) -> QueryResult<i64> {
    diesel::sql_query("SELECT last_insert_rowid() AS id")
        .get_result::<LastInsertRowId>(conn)
        .map(|row| row.id)
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = processed_trades)]
pub struct NewProcessedTradeRow {
    pub leader_id: i64,
    pub leader_trade_id: String,
    pub trade_type: String,
    pub source: String,
    pub status: String,
    pub processed_at: String,
    pub created_at: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = processed_trades)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProcessedTradeRow {
    pub id: i64,
    pub leader_id: i64,
    pub leader_trade_id: String,
    pub trade_type: String,
    pub source: String,
    pub status: String,
    pub processed_at: String,
    pub created_at: String,
}

impl ProcessedTradeRow {
    pub fn into_domain(self) -> Result<ProcessedTrade> {
        Ok(ProcessedTrade {
            id: self.id.into(),
            leader_id: self.leader_id.into(),
            leader_trade_id: TradeId::new(self.leader_trade_id),
            trade_type: self.trade_type.parse()?,
            source: self.source.parse()?,
            status: self.status.parse()?,
            processed_at: parse_timestamp(&self.processed_at)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = failed_trades)]
pub struct NewFailedTradeRow {
    pub leader_id: i64,
    pub leader_trade_id: String,
    pub trade_type: String,
    pub copy_trading_id: i64,
    pub account_id: i64,
    pub market: String,
    pub side: String,
    pub price: String,
    pub size: String,
    pub error_message: String,
    pub retry_count: i32,
    pub failed_at: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = failed_trades)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FailedTradeRow {
    pub id: i64,
    pub leader_id: i64,
    pub leader_trade_id: String,
    pub trade_type: String,
    pub copy_trading_id: i64,
    pub account_id: i64,
    pub market: String,
    pub side: String,
    pub price: String,
    pub size: String,
    pub error_message: String,
    pub retry_count: i32,
    pub failed_at: String,
}

impl FailedTradeRow {
    pub fn into_domain(self) -> Result<FailedTrade> {
        Ok(FailedTrade {
            id: self.id,
            leader_id: self.leader_id.into(),
            leader_trade_id: TradeId::new(self.leader_trade_id),
            trade_type: self.trade_type.parse()?,
            copy_trading_id: self.copy_trading_id.into(),
            account_id: self.account_id.into(),
            market: self.market,
            side: self.side,
            price: parse_decimal("price", &self.price)?,
            size: parse_decimal("size", &self.size)?,
            error_message: self.error_message,
            retry_count: self.retry_count,
            failed_at: parse_timestamp(&self.failed_at)?,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = sell_match_records)]
pub struct NewSellMatchRecordRow {
    pub copy_trading_id: i64,
    pub sell_order_id: String,
    pub leader_sell_trade_id: String,
    pub market: String,
    pub side: String,
    pub outcome_index: Option<i32>,
    pub total_matched_quantity: String,
    pub sell_price: String,
    pub total_realized_pnl: String,
    pub price_updated: bool,
    pub created_at: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = sell_match_records)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SellMatchRecordRow {
    pub id: i64,
    pub copy_trading_id: i64,
    pub sell_order_id: String,
    pub leader_sell_trade_id: String,
    pub market: String,
    pub side: String,
    pub outcome_index: Option<i32>,
    pub total_matched_quantity: String,
    pub sell_price: String,
    pub total_realized_pnl: String,
    pub price_updated: bool,
    pub created_at: String,
}

impl SellMatchRecordRow {
    pub fn into_domain(self) -> Result<SellMatchRecord> {
        Ok(SellMatchRecord {
            id: self.id.into(),
            copy_trading_id: self.copy_trading_id.into(),
            sell_order_id: OrderId::new(self.sell_order_id),
            leader_sell_trade_id: TradeId::new(self.leader_sell_trade_id),
            market: self.market,
            side: self.side,
            outcome_index: self.outcome_index,
            total_matched_quantity: parse_decimal(
                "total_matched_quantity",
                &self.total_matched_quantity,
            )?,
            sell_price: parse_decimal("sell_price", &self.sell_price)?,
            total_realized_pnl: parse_decimal("total_realized_pnl", &self.total_realized_pnl)?,
            price_updated: self.price_updated,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = sell_match_details)]
pub struct NewSellMatchDetailRow {
    pub match_record_id: i64,
    pub tracking_id: i64,
    pub buy_order_id: String,
    pub matched_quantity: String,
    pub buy_price: String,
    pub sell_price: String,
    pub realized_pnl: String,
    pub created_at: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = sell_match_details)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SellMatchDetailRow {
    pub id: i64,
    pub match_record_id: i64,
    pub tracking_id: i64,
    pub buy_order_id: String,
    pub matched_quantity: String,
    pub buy_price: String,
    pub sell_price: String,
    pub realized_pnl: String,
    pub created_at: String,
}

impl SellMatchDetailRow {
    pub fn into_domain(self) -> Result<SellMatchDetail> {
        Ok(SellMatchDetail {
            id: self.id,
            match_record_id: self.match_record_id.into(),
            tracking_id: self.tracking_id.into(),
            buy_order_id: OrderId::new(self.buy_order_id),
            matched_quantity: parse_decimal("matched_quantity", &self.matched_quantity)?,
            buy_price: parse_decimal("buy_price", &self.buy_price)?,
            sell_price: parse_decimal("sell_price", &self.sell_price)?,
            realized_pnl: parse_decimal("realized_pnl", &self.realized_pnl)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = leaders)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LeaderRow {
    pub id: i64,
    pub address: String,
    pub name: Option<String>,
    pub category: Option<String>,
}

impl From<LeaderRow> for Leader {
    fn from(row: LeaderRow) -> Self {
        Self {
            id: row.id.into(),
            address: row.address,
            name: row.name,
            category: row.category,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = accounts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct AccountRow {
    pub id: i64,
    pub wallet_address: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub api_passphrase: Option<String>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id.into(),
            wallet_address: row.wallet_address,
            api_key: row.api_key,
            api_secret: row.api_secret,
            api_passphrase: row.api_passphrase,
        }
    }
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone)]
#[diesel(table_name = copy_tradings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CopyTradingRow {
    pub id: i64,
    pub leader_id: i64,
    pub account_id: i64,
    pub enabled: bool,
}

impl From<CopyTradingRow> for CopyTrading {
    fn from(row: CopyTradingRow) -> Self {
        Self {
            id: row.id.into(),
            leader_id: row.leader_id.into(),
            account_id: row.account_id.into(),
            enabled: row.enabled,
        }
    }
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = buy_lots)]
pub struct NewBuyLotRow {
    pub copy_trading_id: i64,
    pub buy_order_id: String,
    pub market: String,
    pub side: String,
    pub outcome_index: Option<i32>,
    pub price: String,
    pub remaining_quantity: String,
    pub created_at: String,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = buy_lots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct BuyLotRow {
    pub id: i64,
    pub copy_trading_id: i64,
    pub buy_order_id: String,
    pub market: String,
    pub side: String,
    pub outcome_index: Option<i32>,
    pub price: String,
    pub remaining_quantity: String,
    pub created_at: String,
}

impl BuyLotRow {
    pub fn into_domain(self) -> Result<BuyLot> {
        Ok(BuyLot {
            id: self.id.into(),
            copy_trading_id: self.copy_trading_id.into(),
            buy_order_id: OrderId::new(self.buy_order_id),
            market: self.market,
            side: self.side,
            outcome_index: self.outcome_index,
            price: parse_decimal("price", &self.price)?,
            remaining_quantity: parse_decimal("remaining_quantity", &self.remaining_quantity)?,
            created_at: parse_timestamp(&self.created_at)?,
        })
    }
}
