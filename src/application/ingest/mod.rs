//! Leader trade ingestion: activity polling and user-channel streaming.

pub mod cache;
pub mod polling;
pub mod reconnecting;
pub mod streaming;

pub use polling::{PollSummary, PollingIngestor};
pub use streaming::StreamIngestor;
