//! Application services: ingestion, trade processing, settlement and
//! reconciliation.
//!
//! These services orchestrate domain logic over the outbound ports; the
//! composition root wires concrete adapters into them.

pub mod ingest;
pub mod processor;
pub mod reconciliation;
pub mod registry;
pub mod settlement;
pub mod statistics;

pub use ingest::{PollSummary, PollingIngestor, StreamIngestor};
pub use processor::TradeEventProcessor;
pub use reconciliation::{ReconcileSummary, ReconciliationScheduler, RecordReconciliation};
pub use registry::LeaderWatchRegistry;
pub use settlement::{SellFill, SettlementEngine};
pub use statistics::SettlementStatistics;
