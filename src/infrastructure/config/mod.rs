//! Infrastructure configuration modules.

pub mod ingest;
pub mod logging;
pub mod reconciliation;
pub mod reconnection;
pub mod settings;
