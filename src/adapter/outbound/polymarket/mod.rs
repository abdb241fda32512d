//! Polymarket integration: Data-API activity, CLOB order queries and the
//! user-channel WebSocket.

pub mod activity;
pub mod auth;
pub mod dto;
pub mod http;
pub mod order;
pub mod settings;
pub mod stream;

pub use activity::DataApiClient;
pub use order::ClobOrderClient;
pub use settings::PolymarketConfig;
pub use stream::{UserTradeStream, UserTradeStreamFactory};
