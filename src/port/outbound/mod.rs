//! Outbound ports: collaborators the core calls.

pub mod activity;
pub mod directory;
pub mod exchange;
pub mod ledger;
pub mod secret;
pub mod stream;
