//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports are the seams between the ingestion/settlement core and everything
//! it talks to: the venue's activity feed, user-trade socket and order query,
//! the copy-trade executor, the ledgers and the configuration directory.
//!
//! # Architecture
//!
//! ```text
//!   ActivityFeed   TradeStream                 OrderQuery
//!        │              │                          │
//!        ▼              ▼                          ▼
//!   ┌──────────────────────────┐      ┌─────────────────────────┐
//!   │ Polling / Stream ingest  │─────▶│ TradeHandler (inbound)  │
//!   └──────────────────────────┘      └────────────┬────────────┘
//!                                                  │
//!            DedupLedger · TradeReplicator · SettlementLedger · BuyLotBook
//! ```

pub mod inbound;
pub mod outbound;
