//! Builders for domain primitives used across tests.
//!
//! Concise factories so tests focus on assertions rather than construction
//! boilerplate.

use rust_decimal::Decimal;

use crate::domain::{
    Account, AccountId, CopyTrading, CopyTradingId, Leader, LeaderId, Side, TradeEvent, TradeId,
};
use crate::port::outbound::activity::ActivityRecord;
use crate::port::outbound::stream::StreamEvent;

/// A leader with the given id and address.
pub fn leader(id: i64, address: &str) -> Leader {
    Leader {
        id: LeaderId::new(id),
        address: address.to_string(),
        name: None,
        category: None,
    }
}

/// An enabled relationship.
pub fn relationship(id: i64, leader_id: i64, account_id: i64) -> CopyTrading {
    CopyTrading {
        id: CopyTradingId::new(id),
        leader_id: LeaderId::new(leader_id),
        account_id: AccountId::new(account_id),
        enabled: true,
    }
}

/// An account whose credentials are [`PlainCipher`](super::memory::PlainCipher)-encrypted.
pub fn account(id: i64, wallet: &str) -> Account {
    Account {
        id: AccountId::new(id),
        wallet_address: wallet.to_string(),
        api_key: Some("enc:key".into()),
        api_secret: Some("enc:c2VjcmV0".into()),
        api_passphrase: Some("enc:pass".into()),
    }
}

/// An account with no stored credentials.
pub fn account_without_credentials(id: i64, wallet: &str) -> Account {
    Account {
        api_key: None,
        api_secret: None,
        api_passphrase: None,
        ..account(id, wallet)
    }
}

/// A trade on market `0xcond`, outcome `Yes` (index 0).
pub fn trade(id: &str, side: Side, price: Decimal, size: Decimal) -> TradeEvent {
    TradeEvent {
        id: TradeId::from(id),
        market: "0xcond".into(),
        side,
        price,
        size,
        timestamp_secs: 1_700_000_000,
        source_wallet: None,
        outcome_index: Some(0),
        outcome_label: Some("Yes".into()),
    }
}

/// A complete TRADE activity item with transaction hash `hash`.
pub fn trade_activity(hash: &str, timestamp: i64) -> ActivityRecord {
    ActivityRecord {
        activity_type: Some("TRADE".into()),
        side: Some("BUY".into()),
        price: Some(Decimal::new(5, 1)),
        size: Some(Decimal::TEN),
        timestamp: Some(timestamp),
        condition_id: Some("0xcond".into()),
        outcome_index: Some(0),
        outcome: Some("Yes".into()),
        proxy_wallet: None,
        transaction_hash: Some(hash.to_string()),
    }
}

/// A stream event carrying [`trade`] with the given id.
pub fn trade_stream_event(id: &str) -> StreamEvent {
    StreamEvent::Trade(trade(id, Side::Buy, Decimal::new(5, 1), Decimal::TEN))
}

/// Create a [`Disconnected`](StreamEvent::Disconnected) event.
pub fn disconnect_event(reason: &str) -> StreamEvent {
    StreamEvent::Disconnected {
        reason: reason.to_string(),
    }
}
