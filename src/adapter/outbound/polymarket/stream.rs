//! Polymarket user-channel WebSocket.
//!
//! One connection follows one wallet. The client keeps the connection alive
//! with `PING` text frames and treats a silent socket as lost. Reconnection
//! is left to the caller.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{interval_at, sleep_until, timeout, Instant, Interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

use super::dto::message::{parse_frame, UserFrame, UserSubscribeMessage, HEARTBEAT_REQUEST};
use crate::error::{Error, Result};
use crate::port::outbound::stream::{StreamEvent, TradeStream, TradeStreamFactory};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Bound on the handshake and on the subscribe send unless overridden.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

async fn within<T>(limit: Duration, step: impl Future<Output = Result<T>>) -> Result<T> {
    timeout(limit, step)
        .await
        .map_err(|_| Error::Timeout(limit.as_millis() as u64))?
}

struct Connection {
    ws: WsStream,
    heartbeat: Interval,
    last_message: Instant,
}

/// [`TradeStream`] over the Polymarket real-time user channel.
pub struct UserTradeStream {
    url: String,
    ping_interval: Duration,
    read_timeout: Duration,
    connect_timeout: Duration,
    connection: Option<Connection>,
}

impl UserTradeStream {
    #[must_use]
    pub fn new(url: impl Into<String>, ping_interval: Duration, read_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            ping_interval,
            read_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            connection: None,
        }
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    fn disconnected(&mut self, reason: impl Into<String>) -> Option<StreamEvent> {
        self.connection = None;
        Some(StreamEvent::Disconnected {
            reason: reason.into(),
        })
    }
}

#[async_trait]
impl TradeStream for UserTradeStream {
    async fn connect(&mut self) -> Result<()> {
        info!(url = %self.url, "Connecting to user channel");

        let (ws, response) = within(self.connect_timeout, async {
            Ok::<_, Error>(connect_async(&self.url).await?)
        })
        .await?;
        info!(status = %response.status(), "User channel connected");

        let now = Instant::now();
        let mut heartbeat = interval_at(now + self.ping_interval, self.ping_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.connection = Some(Connection {
            ws,
            heartbeat,
            last_message: now,
        });
        Ok(())
    }

    async fn subscribe(&mut self, address: &str) -> Result<()> {
        let limit = self.connect_timeout;
        let conn = self
            .connection
            .as_mut()
            .ok_or_else(|| Error::Connection("subscribe before connect".into()))?;

        let json = serde_json::to_string(&UserSubscribeMessage::new(address))?;
        info!(address, "Subscribing to user trades");
        within(limit, async {
            Ok::<_, Error>(conn.ws.send(Message::Text(json)).await?)
        })
        .await
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        let read_timeout = self.read_timeout;

        loop {
            let conn = self.connection.as_mut()?;
            let deadline = conn.last_message + read_timeout;

            let frame = tokio::select! {
                _ = conn.heartbeat.tick() => {
                    trace!("Sending heartbeat");
                    if let Err(e) = conn.ws.send(Message::Text(HEARTBEAT_REQUEST.into())).await {
                        return self.disconnected(e.to_string());
                    }
                    continue;
                }
                () = sleep_until(deadline) => {
                    warn!(timeout_secs = read_timeout.as_secs(), "User channel silent, dropping connection");
                    return self.disconnected("read timeout");
                }
                frame = conn.ws.next() => frame,
            };
            conn.last_message = Instant::now();

            match frame {
                Some(Ok(Message::Text(text))) => match parse_frame(&text, Utc::now().timestamp()) {
                    UserFrame::Heartbeat => return Some(StreamEvent::Heartbeat),
                    UserFrame::Trade(event) => {
                        debug!(trade_id = %event.id, market = %event.market, "Trade frame");
                        return Some(StreamEvent::Trade(event));
                    }
                    UserFrame::Ignored => {
                        trace!(bytes = text.len(), "Ignoring non-trade frame");
                    }
                    UserFrame::Malformed(reason) => {
                        warn!(reason = %reason, bytes = text.len(), "Dropping malformed frame");
                    }
                },
                Some(Ok(Message::Ping(data))) => {
                    if let Err(e) = conn.ws.send(Message::Pong(data)).await {
                        return self.disconnected(e.to_string());
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(frame = ?frame, "Server closed user channel");
                    return self.disconnected("server closed connection");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "User channel error");
                    return self.disconnected(e.to_string());
                }
                None => return self.disconnected("stream ended"),
            }
        }
    }
}

/// Creates a fresh [`UserTradeStream`] per leader.
pub struct UserTradeStreamFactory {
    url: String,
    ping_interval: Duration,
    read_timeout: Duration,
    connect_timeout: Duration,
}

impl UserTradeStreamFactory {
    #[must_use]
    pub fn new(url: impl Into<String>, ping_interval: Duration, read_timeout: Duration) -> Self {
        Self {
            url: url.into(),
            ping_interval,
            read_timeout,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

impl TradeStreamFactory for UserTradeStreamFactory {
    fn create(&self) -> Box<dyn TradeStream> {
        Box::new(
            UserTradeStream::new(self.url.clone(), self.ping_interval, self.read_timeout)
                .with_connect_timeout(self.connect_timeout),
        )
    }
}
