//! Mock [`TradeStream`] implementations for testing.
//!
//! - [`ScriptedStream`]: pre-loaded connect/subscribe results and events.
//!   Best for: error handling, reconnection logic, retry behavior.
//!
//! - [`ChannelStream`]: channel-backed stream with external control handle.
//!   Best for: ingestor tests needing on-demand event delivery.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::port::outbound::stream::{StreamEvent, TradeStream, TradeStreamFactory};

// ---------------------------------------------------------------------------
// ScriptedStream
// ---------------------------------------------------------------------------

/// A mock stream with scripted connect/subscribe results and a fixed event queue.
///
/// Each call to `connect()` or `subscribe()` pops the next result from the
/// corresponding queue (defaults to `Ok(())` when exhausted). Once the event
/// queue is drained, `next_event` blocks forever.
pub struct ScriptedStream {
    connect_results: VecDeque<Result<()>>,
    subscribe_results: VecDeque<Result<()>>,
    events: VecDeque<Option<StreamEvent>>,
    connect_count: Arc<AtomicU32>,
    subscribe_count: Arc<AtomicU32>,
    subscribed: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStream {
    pub fn new() -> Self {
        Self {
            connect_results: VecDeque::new(),
            subscribe_results: VecDeque::new(),
            events: VecDeque::new(),
            connect_count: Arc::new(AtomicU32::new(0)),
            subscribe_count: Arc::new(AtomicU32::new(0)),
            subscribed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_connect_results(mut self, results: Vec<Result<()>>) -> Self {
        self.connect_results = results.into();
        self
    }

    pub fn with_subscribe_results(mut self, results: Vec<Result<()>>) -> Self {
        self.subscribe_results = results.into();
        self
    }

    pub fn with_events(mut self, events: Vec<Option<StreamEvent>>) -> Self {
        self.events = events.into();
        self
    }

    /// Get shared counters for asserting connect/subscribe call counts.
    pub fn counts(&self) -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        (self.connect_count.clone(), self.subscribe_count.clone())
    }

    /// Addresses passed to `subscribe`, in call order.
    pub fn subscriptions(&self) -> Arc<Mutex<Vec<String>>> {
        self.subscribed.clone()
    }
}

impl Default for ScriptedStream {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradeStream for ScriptedStream {
    async fn connect(&mut self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        self.connect_results.pop_front().unwrap_or(Ok(()))
    }

    async fn subscribe(&mut self, address: &str) -> Result<()> {
        self.subscribe_count.fetch_add(1, Ordering::SeqCst);
        self.subscribed.lock().push(address.to_string());
        self.subscribe_results.pop_front().unwrap_or(Ok(()))
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        match self.events.pop_front() {
            Some(event) => event,
            None => std::future::pending().await,
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelStream
// ---------------------------------------------------------------------------

/// A mock stream controlled externally via a [`ChannelStreamHandle`].
pub struct ChannelStream {
    event_rx: mpsc::Receiver<StreamEvent>,
    connect_count: Arc<AtomicU32>,
    subscribed: Arc<Mutex<Vec<String>>>,
}

/// Control handle for a [`ChannelStream`].
#[derive(Clone)]
pub struct ChannelStreamHandle {
    event_tx: mpsc::Sender<StreamEvent>,
    connect_count: Arc<AtomicU32>,
    subscribed: Arc<Mutex<Vec<String>>>,
}

impl ChannelStreamHandle {
    /// Send an event to the stream.
    pub async fn send(&self, event: StreamEvent) {
        let _ = self.event_tx.send(event).await;
    }

    /// How many times `connect()` was called.
    pub fn connect_count(&self) -> u32 {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Addresses passed to `subscribe`, in call order.
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscribed.lock().clone()
    }

    /// Whether the stream side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.event_tx.is_closed()
    }
}

/// Create a [`ChannelStream`] and its control [`ChannelStreamHandle`].
pub fn channel_stream(buffer: usize) -> (ChannelStream, ChannelStreamHandle) {
    let (tx, rx) = mpsc::channel(buffer);
    let connect_count = Arc::new(AtomicU32::new(0));
    let subscribed = Arc::new(Mutex::new(Vec::new()));
    (
        ChannelStream {
            event_rx: rx,
            connect_count: connect_count.clone(),
            subscribed: subscribed.clone(),
        },
        ChannelStreamHandle {
            event_tx: tx,
            connect_count,
            subscribed,
        },
    )
}

#[async_trait]
impl TradeStream for ChannelStream {
    async fn connect(&mut self) -> Result<()> {
        self.connect_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn subscribe(&mut self, address: &str) -> Result<()> {
        self.subscribed.lock().push(address.to_string());
        Ok(())
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        self.event_rx.recv().await
    }
}

// ---------------------------------------------------------------------------
// ChannelStreamFactory
// ---------------------------------------------------------------------------

/// Hands out pre-built [`ChannelStream`]s, one per `create` call.
///
/// When the queue is empty a fresh, never-fed stream is returned; its handle
/// is kept so the stream stays open.
#[derive(Default)]
pub struct ChannelStreamFactory {
    streams: Mutex<VecDeque<ChannelStream>>,
    idle: Mutex<Vec<ChannelStreamHandle>>,
    created: AtomicU32,
}

impl ChannelStreamFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a stream and return its handle.
    pub fn push(&self, buffer: usize) -> ChannelStreamHandle {
        let (stream, handle) = channel_stream(buffer);
        self.streams.lock().push_back(stream);
        handle
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

impl TradeStreamFactory for ChannelStreamFactory {
    fn create(&self) -> Box<dyn TradeStream> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let queued = self.streams.lock().pop_front();
        let stream = queued.unwrap_or_else(|| {
            let (stream, handle) = channel_stream(1);
            self.idle.lock().push(handle);
            stream
        });
        Box::new(stream)
    }
}
