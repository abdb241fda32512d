#![allow(dead_code)]

use std::sync::Arc;

use copytrail::adapter::outbound::sqlite::SqliteDirectory;
use copytrail::application::{SettlementEngine, TradeEventProcessor};
use copytrail::domain::{AccountId, CopyTradingId, LeaderId};
use copytrail::port::outbound::directory::{BuyLotBook, CopyTradingDirectory};
use copytrail::port::outbound::exchange::TradeReplicator;
use copytrail::port::outbound::ledger::{DedupLedger, SettlementLedger};
use copytrail::port::outbound::secret::SecretCipher;

use crate::harness::temp_db::TempDb;

/// Ids of one seeded leader/account/relationship triple.
#[derive(Debug, Clone, Copy)]
pub struct Seeded {
    pub leader: LeaderId,
    pub account: AccountId,
    pub copy_trading: CopyTradingId,
}

/// Seed a leader followed by one account whose credentials are encrypted
/// with `cipher` (or absent).
pub async fn seed(
    directory: &SqliteDirectory,
    leader_address: &str,
    cipher: Option<&dyn SecretCipher>,
) -> Seeded {
    let leader = directory
        .add_leader(leader_address, Some("leader"))
        .await
        .expect("add leader");
    let encrypt = |value: &str| cipher.map(|c| c.encrypt(value).expect("encrypt"));
    let account = directory
        .add_account(
            "0xfollower",
            encrypt("api-key"),
            encrypt("c2VjcmV0LWtleQ=="),
            encrypt("passphrase"),
        )
        .await
        .expect("add account");
    let copy_trading = directory
        .add_copy_trading(leader, account, true)
        .await
        .expect("add copy trading");
    Seeded {
        leader,
        account,
        copy_trading,
    }
}

/// A processor over the SQLite ledgers of `db`.
pub fn processor(db: &TempDb, replicator: Arc<dyn TradeReplicator>) -> Arc<TradeEventProcessor> {
    let directory = db.directory();
    let settlements = db.settlements();
    Arc::new(TradeEventProcessor::new(
        db.dedup() as Arc<dyn DedupLedger>,
        Arc::clone(&directory) as Arc<dyn CopyTradingDirectory>,
        Arc::clone(&directory) as Arc<dyn BuyLotBook>,
        replicator,
        SettlementEngine::new(settlements as Arc<dyn SettlementLedger>),
    ))
}

/// Base64 of 32 zero bytes, a valid master key.
pub const TEST_MASTER_KEY: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";
