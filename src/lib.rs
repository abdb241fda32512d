//! Copytrail - prediction-market copy trading core.
//!
//! Watches leader wallets, replicates their trades into follower accounts
//! exactly once, settles sells against open buys first-in-first-out and
//! reconciles recorded sell prices against the exchange.
//!
//! # Architecture
//!
//! - [`domain`] - Trade events, ledger rows, FIFO matching and PnL arithmetic
//! - [`port`] - Traits for every external collaborator
//! - [`application`] - Ingestors, trade processor, settlement, reconciliation
//!   and the leader watch registry
//! - [`adapter`] - Polymarket clients, SQLite ledgers, credential cipher and
//!   the CLI
//! - [`infrastructure`] - Configuration, composition root and pipeline
//!   lifecycle
//! - [`error`] - Error types for the crate
//!
//! # Data flow
//!
//! ```text
//! LeaderWatchRegistry -> {PollingIngestor, StreamIngestor}
//!     -> TradeEventProcessor -> DedupLedger, replication, SettlementEngine
//! ReconciliationScheduler -> SettlementLedger, OrderQuery
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
