//! Inbound ports: contracts the application exposes to drivers.

pub mod trade;

pub use trade::TradeHandler;
