//! Pushed user-trade stream port.

use async_trait::async_trait;

use crate::domain::TradeEvent;
use crate::error::Result;

/// Events produced by a [`TradeStream`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A complete trade frame.
    Trade(TradeEvent),
    /// Heartbeat reply from the server.
    Heartbeat,
    /// The connection was lost.
    Disconnected { reason: String },
}

/// A persistent connection to one user's trade channel.
#[async_trait]
pub trait TradeStream: Send {
    /// Open the connection.
    async fn connect(&mut self) -> Result<()>;

    /// Subscribe to trades of `address`.
    async fn subscribe(&mut self, address: &str) -> Result<()>;

    /// Wait for the next event.
    ///
    /// Returns `None` if the stream ended or was never connected.
    async fn next_event(&mut self) -> Option<StreamEvent>;
}

#[async_trait]
impl<S: TradeStream + ?Sized> TradeStream for Box<S> {
    async fn connect(&mut self) -> Result<()> {
        (**self).connect().await
    }

    async fn subscribe(&mut self, address: &str) -> Result<()> {
        (**self).subscribe(address).await
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        (**self).next_event().await
    }
}

/// Creates one stream per watched leader.
pub trait TradeStreamFactory: Send + Sync {
    fn create(&self) -> Box<dyn TradeStream>;
}
