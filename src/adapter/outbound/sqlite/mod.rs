//! SQLite persistence adapters.
//!
//! Diesel/r2d2 implementations of the dedup ledger, the settlement ledger and
//! the configuration directory, sharing one pool and embedded migrations.

pub mod database;
pub mod dedup;
pub mod directory;
pub mod settlement;

pub use database::connection::{create_pool, run_migrations, DbPool};
pub use dedup::SqliteDedupLedger;
pub use directory::SqliteDirectory;
pub use settlement::SqliteSettlementLedger;
