//! Outbound adapters (driven side).

pub mod crypto;
pub mod polymarket;
pub mod replication;
pub mod sqlite;
