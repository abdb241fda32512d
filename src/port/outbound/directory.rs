//! Read access to configuration entities, and the buy-lot book.

use async_trait::async_trait;

use crate::domain::{
    Account, AccountId, BuyLot, CopyTrading, CopyTradingId, Leader, LeaderId, MatchKey, NewBuyLot,
};
use crate::error::Result;

/// Leaders, follower accounts and copy-trading relationships.
#[async_trait]
pub trait CopyTradingDirectory: Send + Sync {
    async fn leader(&self, id: LeaderId) -> Result<Option<Leader>>;

    /// Every enabled relationship.
    async fn enabled_relationships(&self) -> Result<Vec<CopyTrading>>;

    /// Enabled relationships following `leader_id`.
    async fn enabled_relationships_for(&self, leader_id: LeaderId) -> Result<Vec<CopyTrading>>;

    /// A relationship by id, enabled or not.
    async fn relationship(&self, id: CopyTradingId) -> Result<Option<CopyTrading>>;

    async fn account(&self, id: AccountId) -> Result<Option<Account>>;
}

/// Open replicated buy quantities.
#[async_trait]
pub trait BuyLotBook: Send + Sync {
    /// Lots with remaining quantity that `key` admits, oldest first.
    async fn open_lots(&self, key: &MatchKey) -> Result<Vec<BuyLot>>;

    /// Open a lot for a replicated buy.
    async fn open_lot(&self, lot: &NewBuyLot) -> Result<BuyLot>;
}
