//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`stream`]: Mock [`TradeStream`](crate::port::outbound::stream::TradeStream)
//!   implementations: `ScriptedStream`, `ChannelStream`.
//! - [`domain`]: builders for leaders, relationships, trade events and
//!   activity items.
//! - [`memory`]: in-memory ledgers and scripted collaborators.

pub mod domain;
pub mod memory;
pub mod stream;
