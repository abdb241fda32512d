//! SQLite directory of leaders, accounts, copy-tradings and buy lots.
//!
//! The write helpers exist for seeding and tests; managing these entities is
//! otherwise done outside this crate.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;

use super::database::connection::{with_connection, DbPool};
use super::database::model::{
    format_timestamp, last_insert_rowid, AccountRow, BuyLotRow, CopyTradingRow, LeaderRow,
    NewBuyLotRow,
};
use super::database::schema::{accounts, buy_lots, copy_tradings, leaders};
use crate::domain::{
    Account, AccountId, BuyLot, CopyTrading, CopyTradingId, Leader, LeaderId, MatchKey, NewBuyLot,
};
use crate::error::{Error, Result};
use crate::port::outbound::directory::{BuyLotBook, CopyTradingDirectory};

/// SQLite-backed [`CopyTradingDirectory`] and [`BuyLotBook`].
pub struct SqliteDirectory {
    pool: DbPool,
}

impl SqliteDirectory {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Insert a leader and return its id.
    pub async fn add_leader(&self, address: &str, name: Option<&str>) -> Result<LeaderId> {
        let address = address.to_string();
        let name = name.map(str::to_string);
        with_connection(&self.pool, move |conn| {
            let id = conn.immediate_transaction::<_, Error, _>(|conn| {
                diesel::insert_into(leaders::table)
                    .values((
                        leaders::address.eq(address),
                        leaders::name.eq(name),
                        leaders::category.eq(None::<String>),
                    ))
                    .execute(conn)?;
                Ok(last_insert_rowid(conn)?)
            })?;
            Ok(LeaderId::new(id))
        })
        .await
    }

    /// Insert an account with already-encrypted credentials.
    pub async fn add_account(
        &self,
        wallet_address: &str,
        api_key: Option<String>,
        api_secret: Option<String>,
        api_passphrase: Option<String>,
    ) -> Result<AccountId> {
        let wallet_address = wallet_address.to_string();
        with_connection(&self.pool, move |conn| {
            let id = conn.immediate_transaction::<_, Error, _>(|conn| {
                diesel::insert_into(accounts::table)
                    .values((
                        accounts::wallet_address.eq(wallet_address),
                        accounts::api_key.eq(api_key),
                        accounts::api_secret.eq(api_secret),
                        accounts::api_passphrase.eq(api_passphrase),
                    ))
                    .execute(conn)?;
                Ok(last_insert_rowid(conn)?)
            })?;
            Ok(AccountId::new(id))
        })
        .await
    }

    /// Insert a copy-trading relationship.
    pub async fn add_copy_trading(
        &self,
        leader_id: LeaderId,
        account_id: AccountId,
        enabled: bool,
    ) -> Result<CopyTradingId> {
        with_connection(&self.pool, move |conn| {
            let id = conn.immediate_transaction::<_, Error, _>(|conn| {
                diesel::insert_into(copy_tradings::table)
                    .values((
                        copy_tradings::leader_id.eq(leader_id.get()),
                        copy_tradings::account_id.eq(account_id.get()),
                        copy_tradings::enabled.eq(enabled),
                    ))
                    .execute(conn)?;
                Ok(last_insert_rowid(conn)?)
            })?;
            Ok(CopyTradingId::new(id))
        })
        .await
    }

    /// Delete an account. Its relationships are left dangling, as the
    /// external admin surface does.
    pub async fn delete_account(&self, id: AccountId) -> Result<bool> {
        with_connection(&self.pool, move |conn| {
            let deleted = diesel::delete(accounts::table.find(id.get())).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[async_trait]
impl CopyTradingDirectory for SqliteDirectory {
    async fn leader(&self, id: LeaderId) -> Result<Option<Leader>> {
        with_connection(&self.pool, move |conn| {
            let row: Option<LeaderRow> = leaders::table
                .find(id.get())
                .select(LeaderRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Leader::from))
        })
        .await
    }

    async fn enabled_relationships(&self) -> Result<Vec<CopyTrading>> {
        with_connection(&self.pool, |conn| {
            let rows: Vec<CopyTradingRow> = copy_tradings::table
                .filter(copy_tradings::enabled.eq(true))
                .order(copy_tradings::id.asc())
                .select(CopyTradingRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(CopyTrading::from).collect())
        })
        .await
    }

    async fn enabled_relationships_for(&self, leader_id: LeaderId) -> Result<Vec<CopyTrading>> {
        with_connection(&self.pool, move |conn| {
            let rows: Vec<CopyTradingRow> = copy_tradings::table
                .filter(copy_tradings::enabled.eq(true))
                .filter(copy_tradings::leader_id.eq(leader_id.get()))
                .order(copy_tradings::id.asc())
                .select(CopyTradingRow::as_select())
                .load(conn)?;
            Ok(rows.into_iter().map(CopyTrading::from).collect())
        })
        .await
    }

    async fn relationship(&self, id: CopyTradingId) -> Result<Option<CopyTrading>> {
        with_connection(&self.pool, move |conn| {
            let row: Option<CopyTradingRow> = copy_tradings::table
                .find(id.get())
                .select(CopyTradingRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(CopyTrading::from))
        })
        .await
    }

    async fn account(&self, id: AccountId) -> Result<Option<Account>> {
        with_connection(&self.pool, move |conn| {
            let row: Option<AccountRow> = accounts::table
                .find(id.get())
                .select(AccountRow::as_select())
                .first(conn)
                .optional()?;
            Ok(row.map(Account::from))
        })
        .await
    }
}

/// Open lots of one relationship in one market, oldest first.
pub(super) fn market_lots(
    conn: &mut SqliteConnection,
    copy_trading_id: CopyTradingId,
    market: &str,
) -> Result<Vec<BuyLot>> {
    let rows: Vec<BuyLotRow> = buy_lots::table
        .filter(buy_lots::copy_trading_id.eq(copy_trading_id.get()))
        .filter(buy_lots::market.eq(market))
        .order((buy_lots::created_at.asc(), buy_lots::id.asc()))
        .select(BuyLotRow::as_select())
        .load(conn)?;

    let lots = rows
        .into_iter()
        .map(BuyLotRow::into_domain)
        .collect::<Result<Vec<_>>>()?;
    Ok(lots
        .into_iter()
        .filter(|lot| lot.remaining_quantity > rust_decimal::Decimal::ZERO)
        .collect())
}

#[async_trait]
impl BuyLotBook for SqliteDirectory {
    async fn open_lots(&self, key: &MatchKey) -> Result<Vec<BuyLot>> {
        let key = key.clone();
        with_connection(&self.pool, move |conn| {
            let lots = market_lots(conn, key.copy_trading_id, &key.market)?;
            Ok(lots.into_iter().filter(|lot| key.admits(lot)).collect())
        })
        .await
    }

    async fn open_lot(&self, lot: &NewBuyLot) -> Result<BuyLot> {
        let row = NewBuyLotRow {
            copy_trading_id: lot.key.copy_trading_id.get(),
            buy_order_id: lot.buy_order_id.as_str().to_string(),
            market: lot.key.market.clone(),
            side: lot.side.clone(),
            outcome_index: lot.key.outcome_index,
            price: lot.price.to_string(),
            remaining_quantity: lot.quantity.to_string(),
            created_at: format_timestamp(Utc::now()),
        };
        with_connection(&self.pool, move |conn| {
            conn.immediate_transaction::<_, Error, _>(|conn| {
                diesel::insert_into(buy_lots::table)
                    .values(&row)
                    .execute(conn)?;
                let id = last_insert_rowid(conn)?;
                buy_lots::table
                    .find(id)
                    .select(BuyLotRow::as_select())
                    .first::<BuyLotRow>(conn)?
                    .into_domain()
            })
        })
        .await
    }
}
