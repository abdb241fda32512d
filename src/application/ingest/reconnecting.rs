//! Self-healing user-channel stream.
//!
//! [`ReconnectingTradeStream`] keeps one leader's channel alive: a lost
//! connection is reopened after an exponentially growing pause and the
//! leader's address is subscribed again. [`ReconnectPolicy`] owns the pause
//! schedule and the circuit breaker that parks a leader whose channel keeps
//! failing.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::infrastructure::config::reconnection::ReconnectionConfig;
use crate::port::outbound::stream::{StreamEvent, TradeStream};

/// Pause schedule and circuit breaker for reconnect attempts.
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectionConfig,
    failures: u32,
    delay_ms: u64,
    /// Set while the breaker is open.
    parked_until: Option<Instant>,
}

impl ReconnectPolicy {
    #[must_use]
    pub fn new(config: ReconnectionConfig) -> Self {
        let delay_ms = config.initial_delay_ms;
        Self {
            config,
            failures: 0,
            delay_ms,
            parked_until: None,
        }
    }

    /// Consecutive failed attempts since the last healthy event.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    #[must_use]
    pub const fn is_parked(&self) -> bool {
        self.parked_until.is_some()
    }

    /// Forget past failures.
    pub fn recovered(&mut self) {
        self.failures = 0;
        self.delay_ms = self.config.initial_delay_ms;
        self.parked_until = None;
    }

    /// Count a failure; parks the stream once the threshold is reached.
    pub fn failed(&mut self) {
        self.failures += 1;
        if self.failures < self.config.max_consecutive_failures || self.is_parked() {
            return;
        }
        let cooldown = Duration::from_millis(self.config.circuit_breaker_cooldown_ms);
        self.parked_until = Some(Instant::now() + cooldown);
        error!(
            failures = self.failures,
            cooldown_secs = cooldown.as_secs(),
            "Channel keeps failing, parking reconnects"
        );
    }

    /// Pause to apply before the next attempt, then grow the schedule.
    ///
    /// The pause carries up to 20% jitter so leaders dropped together do not
    /// reconnect in lockstep.
    pub fn next_pause(&mut self) -> Duration {
        let base = self.delay_ms;
        let grown = (base as f64 * self.config.backoff_multiplier) as u64;
        self.delay_ms = grown.min(self.config.max_delay_ms);
        Duration::from_millis(base + jitter_ms(base))
    }

    /// Remaining breaker cooldown; clears the breaker once it has elapsed.
    pub fn cooldown_remaining(&mut self) -> Option<Duration> {
        let until = self.parked_until?;
        let now = Instant::now();
        if now >= until {
            info!("Reconnect cooldown over");
            self.recovered();
            return None;
        }
        Some(until - now)
    }

    /// Sleep out the breaker cooldown (if any) and the next pause.
    async fn wait_for_attempt(&mut self) {
        if let Some(remaining) = self.cooldown_remaining() {
            warn!(remaining_secs = remaining.as_secs(), "Reconnects parked, waiting");
            sleep(remaining).await;
            self.recovered();
        }
        let pause = self.next_pause();
        info!(
            pause_ms = pause.as_millis() as u64,
            attempt = self.failures + 1,
            "Reconnecting"
        );
        sleep(pause).await;
    }
}

fn jitter_ms(base_ms: u64) -> u64 {
    let span = base_ms / 5;
    if span == 0 {
        return 0;
    }
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.subsec_nanos());
    u64::from(nanos) % (span + 1)
}

/// A [`TradeStream`] that never reports [`StreamEvent::Disconnected`]:
/// it reconnects and resubscribes instead.
pub struct ReconnectingTradeStream<S: TradeStream> {
    inner: S,
    policy: ReconnectPolicy,
    /// Address re-sent after every reconnect.
    address: Option<String>,
    connected: bool,
}

impl<S: TradeStream> ReconnectingTradeStream<S> {
    /// Starts disconnected; the first `next_event` connects if
    /// [`connect`](TradeStream::connect) was never called or failed.
    pub fn new(inner: S, config: ReconnectionConfig) -> Self {
        Self {
            inner,
            policy: ReconnectPolicy::new(config),
            address: None,
            connected: false,
        }
    }

    fn lost(&mut self) {
        self.connected = false;
        self.policy.failed();
    }

    async fn reopen(&mut self) -> Result<()> {
        self.policy.wait_for_attempt().await;

        if let Err(e) = self.inner.connect().await {
            error!(error = %e, "Reconnect failed");
            self.lost();
            return Err(e);
        }
        self.connected = true;

        if let Some(address) = self.address.clone() {
            debug!(address = %address, "Resubscribing");
            if let Err(e) = self.inner.subscribe(&address).await {
                error!(error = %e, "Resubscribe failed");
                self.lost();
                return Err(e);
            }
        }

        info!("Channel reopened");
        self.policy.recovered();
        Ok(())
    }
}

#[async_trait]
impl<S: TradeStream> TradeStream for ReconnectingTradeStream<S> {
    async fn connect(&mut self) -> Result<()> {
        self.inner.connect().await?;
        self.connected = true;
        self.policy.recovered();
        Ok(())
    }

    async fn subscribe(&mut self, address: &str) -> Result<()> {
        self.address = Some(address.to_string());
        if !self.connected {
            return Ok(());
        }
        let result = self.inner.subscribe(address).await;
        if result.is_err() {
            self.lost();
        }
        result
    }

    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if !self.connected {
                if let Err(e) = self.reopen().await {
                    warn!(error = %e, "Channel still down");
                    continue;
                }
            }

            match self.inner.next_event().await {
                Some(StreamEvent::Disconnected { reason }) => {
                    warn!(reason = %reason, "Channel lost");
                    self.lost();
                }
                None => {
                    warn!("Channel ended");
                    self.lost();
                }
                Some(event) => {
                    if self.policy.failures() > 0 {
                        self.policy.recovered();
                    }
                    return Some(event);
                }
            }
        }
    }
}
