//! User-channel streaming: one connection task per leader.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::reconnecting::ReconnectingTradeStream;
use crate::domain::{Leader, LeaderId, TradeSource};
use crate::infrastructure::config::reconnection::ReconnectionConfig;
use crate::port::inbound::trade::TradeHandler;
use crate::port::outbound::stream::{StreamEvent, TradeStream, TradeStreamFactory};

struct Connection {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Follows each watched leader over its own reconnecting stream.
///
/// Subscribing to a wallet's channel needs that wallet's credentials, so
/// this path is opt-in.
pub struct StreamIngestor {
    factory: Arc<dyn TradeStreamFactory>,
    handler: Arc<dyn TradeHandler>,
    reconnection: ReconnectionConfig,
    enabled: bool,
    shutdown: CancellationToken,
    connections: DashMap<LeaderId, Connection>,
}

impl StreamIngestor {
    #[must_use]
    pub fn new(
        factory: Arc<dyn TradeStreamFactory>,
        handler: Arc<dyn TradeHandler>,
        reconnection: ReconnectionConfig,
        enabled: bool,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            factory,
            handler,
            reconnection,
            enabled,
            shutdown,
            connections: DashMap::new(),
        }
    }

    /// Open a connection for every leader.
    pub fn start(&self, leaders: Vec<Leader>) {
        if !self.enabled {
            info!("Streaming disabled, not starting");
            return;
        }
        info!(leaders = leaders.len(), "Streaming started");
        for leader in leaders {
            self.add_leader(leader);
        }
    }

    /// Open a connection for `leader` unless one is already running.
    pub fn add_leader(&self, leader: Leader) {
        if !self.enabled {
            return;
        }
        let dashmap::mapref::entry::Entry::Vacant(slot) = self.connections.entry(leader.id)
        else {
            return;
        };

        let token = self.shutdown.child_token();
        let stream = ReconnectingTradeStream::new(self.factory.create(), self.reconnection.clone());
        info!(leader_id = %leader.id, address = %leader.address, "Streaming leader");
        let handle = tokio::spawn(follow(
            leader,
            stream,
            Arc::clone(&self.handler),
            token.clone(),
        ));
        slot.insert(Connection { token, handle });
    }

    /// Close the connection for `leader_id`.
    pub fn remove_leader(&self, leader_id: LeaderId) {
        if let Some((_, connection)) = self.connections.remove(&leader_id) {
            connection.token.cancel();
            connection.handle.abort();
            info!(leader_id = %leader_id, "Stopped streaming leader");
        }
    }

    /// Close every connection without waiting for in-flight I/O.
    pub fn stop(&self) {
        let leaders: Vec<LeaderId> = self.connections.iter().map(|c| *c.key()).collect();
        for leader_id in leaders {
            self.remove_leader(leader_id);
        }
    }

    /// Ids of leaders with an open connection task.
    #[must_use]
    pub fn watched(&self) -> Vec<LeaderId> {
        let mut ids: Vec<LeaderId> = self.connections.iter().map(|c| *c.key()).collect();
        ids.sort();
        ids
    }
}

async fn follow(
    leader: Leader,
    mut stream: ReconnectingTradeStream<Box<dyn TradeStream>>,
    handler: Arc<dyn TradeHandler>,
    token: CancellationToken,
) {
    let address = leader.normalized_address();

    tokio::select! {
        () = token.cancelled() => return,
        result = stream.connect() => {
            if let Err(e) = result {
                warn!(leader_id = %leader.id, error = %e, "Initial connect failed, will retry");
            }
        }
    }
    tokio::select! {
        () = token.cancelled() => return,
        result = stream.subscribe(&address) => {
            if let Err(e) = result {
                warn!(leader_id = %leader.id, error = %e, "Subscribe failed, will resubscribe on reconnect");
            }
        }
    }

    loop {
        let event = tokio::select! {
            () = token.cancelled() => break,
            event = stream.next_event() => event,
        };

        match event {
            Some(StreamEvent::Trade(trade)) => {
                let trade_id = trade.id.clone();
                match handler
                    .process_trade(leader.id, trade, TradeSource::Streaming)
                    .await
                {
                    Ok(outcome) => {
                        debug!(leader_id = %leader.id, trade_id = %trade_id, outcome = ?outcome, "Processed streamed trade");
                    }
                    Err(e) => {
                        error!(leader_id = %leader.id, trade_id = %trade_id, error = %e, "Failed to process streamed trade");
                    }
                }
            }
            Some(StreamEvent::Heartbeat) => trace!(leader_id = %leader.id, "Heartbeat"),
            Some(StreamEvent::Disconnected { reason }) => {
                debug!(leader_id = %leader.id, reason = %reason, "Stream disconnected");
            }
            None => {
                warn!(leader_id = %leader.id, "Trade stream ended");
                break;
            }
        }
    }
    debug!(leader_id = %leader.id, "Streaming task exited");
}
