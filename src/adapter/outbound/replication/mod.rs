//! Copy-trade execution adapters.

mod dry_run;

pub use dry_run::DryRunReplicator;
