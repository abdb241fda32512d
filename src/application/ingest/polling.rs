//! Activity-feed polling.
//!
//! One task walks every watched leader per cycle, in batches, and diffs each
//! leader's latest fetch window against that leader's [`TradeIdCache`]. The
//! fetch window is fixed: more than `fetch_limit` trades between two cycles
//! and the overflow is never seen.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::cache::TradeIdCache;
use crate::domain::{Leader, LeaderId, TradeEvent, TradeSource};
use crate::error::Result;
use crate::infrastructure::config::ingest::PollingConfig;
use crate::port::inbound::trade::TradeHandler;
use crate::port::outbound::activity::ActivityFeed;

/// Counts from one polling cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub polled: usize,
    pub emitted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
enum LeaderPoll {
    Emitted(usize),
    Failed,
}

/// Polls the activity feed of every watched leader.
///
/// The leader set sits behind one lock: add, remove and the cycle's snapshot
/// are linearizable, so a cycle never sees a half-applied change.
pub struct PollingIngestor {
    feed: Arc<dyn ActivityFeed>,
    handler: Arc<dyn TradeHandler>,
    config: PollingConfig,
    shutdown: CancellationToken,
    leaders: RwLock<BTreeMap<LeaderId, Leader>>,
    caches: DashMap<LeaderId, TradeIdCache>,
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl PollingIngestor {
    /// `shutdown` is the pipeline token; the loop runs under a child of it.
    #[must_use]
    pub fn new(
        feed: Arc<dyn ActivityFeed>,
        handler: Arc<dyn TradeHandler>,
        config: PollingConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            feed,
            handler,
            config,
            shutdown,
            leaders: RwLock::new(BTreeMap::new()),
            caches: DashMap::new(),
            task: Mutex::new(None),
        }
    }

    /// Replace the watched set and start the loop if it is not running.
    pub fn start(self: &Arc<Self>, leaders: Vec<Leader>) {
        if !self.config.enabled {
            info!("Polling disabled, not starting");
            return;
        }

        {
            let mut watched = self.leaders.write();
            watched.clear();
            self.caches.clear();
            for leader in leaders {
                self.caches
                    .insert(leader.id, TradeIdCache::new(self.config.cache_capacity));
                watched.insert(leader.id, leader);
            }
        }

        let mut task = self.task.lock();
        if task.is_some() {
            debug!("Polling loop already running");
            return;
        }

        let token = self.shutdown.child_token();
        let handle = tokio::spawn(Arc::clone(self).run(token.clone()));
        *task = Some((token, handle));
        info!(
            leaders = self.leaders.read().len(),
            interval_ms = self.config.interval_ms,
            "Polling started"
        );
    }

    /// Watch `leader`. Re-adding an already watched leader keeps its cache.
    pub fn add_leader(&self, leader: Leader) {
        let mut watched = self.leaders.write();
        if watched.contains_key(&leader.id) {
            return;
        }
        self.caches
            .insert(leader.id, TradeIdCache::new(self.config.cache_capacity));
        info!(leader_id = %leader.id, address = %leader.address, "Polling leader");
        watched.insert(leader.id, leader);
    }

    /// Stop watching `leader_id` and forget its cache.
    pub fn remove_leader(&self, leader_id: LeaderId) {
        let mut watched = self.leaders.write();
        if watched.remove(&leader_id).is_some() {
            self.caches.remove(&leader_id);
            info!(leader_id = %leader_id, "Stopped polling leader");
        }
    }

    /// Cancel the loop without waiting for in-flight fetches.
    pub fn stop(&self) {
        if let Some((token, handle)) = self.task.lock().take() {
            token.cancel();
            handle.abort();
            info!("Polling stopped");
        }
        self.leaders.write().clear();
        self.caches.clear();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Ids of the watched leaders.
    #[must_use]
    pub fn watched(&self) -> Vec<LeaderId> {
        self.leaders.read().keys().copied().collect()
    }

    async fn run(self: Arc<Self>, token: CancellationToken) {
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                summary = self.poll_cycle() => {
                    debug!(
                        polled = summary.polled,
                        emitted = summary.emitted,
                        failed = summary.failed,
                        "Polling cycle complete"
                    );
                }
            }
            tokio::select! {
                () = token.cancelled() => break,
                () = sleep(self.config.interval()) => {}
            }
        }
        debug!("Polling loop exited");
    }

    /// Run one cycle over a snapshot of the watched set.
    pub async fn poll_cycle(&self) -> PollSummary {
        let snapshot: Vec<Leader> = self.leaders.read().values().cloned().collect();
        let mut summary = PollSummary::default();
        let batch_size = self.config.batch_size.max(1);
        let batches = snapshot.len().div_ceil(batch_size);

        for (index, batch) in snapshot.chunks(batch_size).enumerate() {
            let results = join_all(batch.iter().map(|leader| self.poll_leader(leader))).await;
            for result in results {
                summary.polled += 1;
                match result {
                    LeaderPoll::Emitted(n) => summary.emitted += n,
                    LeaderPoll::Failed => summary.failed += 1,
                }
            }
            if index + 1 < batches {
                sleep(self.config.batch_pause()).await;
            }
        }
        summary
    }

    async fn poll_leader(&self, leader: &Leader) -> LeaderPoll {
        let events = match self.fetch(leader).await {
            Ok(events) => events,
            Err(e) => {
                warn!(leader_id = %leader.id, error = %e, "Activity fetch failed");
                return LeaderPoll::Failed;
            }
        };

        let fresh = {
            // Results for a leader removed mid-fetch are dropped.
            let Some(mut cache) = self.caches.get_mut(&leader.id) else {
                debug!(leader_id = %leader.id, "Leader removed during fetch, dropping results");
                return LeaderPoll::Emitted(0);
            };
            let seeded = cache.is_seeded();
            let fresh = cache.absorb(events);
            if !seeded {
                info!(leader_id = %leader.id, cached = cache.len(), "Seeded trade baseline");
            }
            fresh
        };

        let emitted = fresh.len();
        for event in fresh {
            let trade_id = event.id.clone();
            match self
                .handler
                .process_trade(leader.id, event, TradeSource::Polling)
                .await
            {
                Ok(outcome) => {
                    debug!(leader_id = %leader.id, trade_id = %trade_id, outcome = ?outcome, "Processed polled trade");
                }
                Err(e) => {
                    error!(leader_id = %leader.id, trade_id = %trade_id, error = %e, "Failed to process polled trade");
                }
            }
        }
        LeaderPoll::Emitted(emitted)
    }

    async fn fetch(&self, leader: &Leader) -> Result<Vec<TradeEvent>> {
        let records = self
            .feed
            .recent_trades(&leader.normalized_address(), self.config.fetch_limit)
            .await?;
        Ok(records
            .into_iter()
            .filter_map(|record| record.into_trade_event())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::domain::{leader, trade_activity};
    use crate::testkit::memory::{RecordingHandler, ScriptedFeed};

    fn config() -> PollingConfig {
        PollingConfig {
            interval_ms: 10,
            batch_pause_ms: 1,
            ..PollingConfig::default()
        }
    }

    fn ingestor(feed: &Arc<ScriptedFeed>, handler: &Arc<RecordingHandler>) -> Arc<PollingIngestor> {
        Arc::new(PollingIngestor::new(
            Arc::clone(feed) as Arc<dyn ActivityFeed>,
            Arc::clone(handler) as Arc<dyn TradeHandler>,
            config(),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn first_poll_is_baseline_then_only_new_trades_are_emitted() {
        let feed = Arc::new(ScriptedFeed::new());
        let handler = Arc::new(RecordingHandler::new());
        let polling = ingestor(&feed, &handler);
        let whale = leader(1, "0xWHALE");
        polling.add_leader(whale);

        feed.respond(
            "0xwhale",
            vec![trade_activity("T3", 3), trade_activity("T2", 2), trade_activity("T1", 1)],
        );
        let first = polling.poll_cycle().await;
        assert_eq!(first.emitted, 0);
        assert!(handler.trade_ids().is_empty());

        feed.respond(
            "0xwhale",
            vec![
                trade_activity("T4", 4),
                trade_activity("T3", 3),
                trade_activity("T2", 2),
                trade_activity("T1", 1),
            ],
        );
        let second = polling.poll_cycle().await;
        assert_eq!(second.emitted, 1);
        assert_eq!(handler.trade_ids(), ["T4"]);
        assert_eq!(handler.sources(), [TradeSource::Polling]);
    }

    #[tokio::test]
    async fn failing_leader_does_not_abort_the_cycle() {
        let feed = Arc::new(ScriptedFeed::new());
        let handler = Arc::new(RecordingHandler::new());
        let polling = ingestor(&feed, &handler);
        polling.add_leader(leader(1, "0xbroken"));
        polling.add_leader(leader(2, "0xfine"));
        feed.fail("0xbroken");
        feed.respond("0xfine", Vec::new());

        polling.poll_cycle().await;
        feed.respond("0xfine", vec![trade_activity("T9", 9)]);
        let summary = polling.poll_cycle().await;

        assert_eq!(summary.polled, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(handler.trade_ids(), ["T9"]);
    }

    #[tokio::test]
    async fn removed_leader_is_no_longer_polled_and_readding_rebaselines() {
        let feed = Arc::new(ScriptedFeed::new());
        let handler = Arc::new(RecordingHandler::new());
        let polling = ingestor(&feed, &handler);
        polling.add_leader(leader(1, "0xa"));
        feed.respond("0xa", vec![trade_activity("T1", 1)]);
        polling.poll_cycle().await;

        polling.remove_leader(LeaderId::new(1));
        assert!(polling.watched().is_empty());
        assert_eq!(polling.poll_cycle().await.polled, 0);

        polling.add_leader(leader(1, "0xa"));
        feed.respond("0xa", vec![trade_activity("T2", 2), trade_activity("T1", 1)]);
        assert_eq!(polling.poll_cycle().await.emitted, 0);
        assert!(handler.trade_ids().is_empty());
    }

    #[tokio::test]
    async fn batches_cover_every_leader() {
        let feed = Arc::new(ScriptedFeed::new());
        let handler = Arc::new(RecordingHandler::new());
        let polling = Arc::new(PollingIngestor::new(
            Arc::clone(&feed) as Arc<dyn ActivityFeed>,
            Arc::clone(&handler) as Arc<dyn TradeHandler>,
            PollingConfig {
                batch_size: 2,
                batch_pause_ms: 1,
                ..PollingConfig::default()
            },
            CancellationToken::new(),
        ));
        for id in 1..=5 {
            polling.add_leader(leader(id, &format!("0x{id}")));
        }

        let summary = polling.poll_cycle().await;

        assert_eq!(summary.polled, 5);
        assert_eq!(feed.calls(), 5);
    }

    #[tokio::test]
    async fn items_without_required_fields_are_dropped() {
        let feed = Arc::new(ScriptedFeed::new());
        let handler = Arc::new(RecordingHandler::new());
        let polling = ingestor(&feed, &handler);
        polling.add_leader(leader(1, "0xa"));
        feed.respond("0xa", Vec::new());
        polling.poll_cycle().await;

        let mut incomplete = trade_activity("T2", 2);
        incomplete.size = None;
        feed.respond("0xa", vec![incomplete, trade_activity("T1", 1)]);
        polling.poll_cycle().await;

        assert_eq!(handler.trade_ids(), ["T1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_runs_until_stopped() {
        let feed = Arc::new(ScriptedFeed::new());
        let handler = Arc::new(RecordingHandler::new());
        let polling = ingestor(&feed, &handler);
        feed.respond("0xa", Vec::new());

        polling.start(vec![leader(1, "0xa")]);
        assert!(polling.is_running());
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(feed.calls() >= 2);

        polling.stop();
        assert!(!polling.is_running());
        let calls = feed.calls();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert_eq!(feed.calls(), calls);
    }

    #[tokio::test]
    async fn disabled_polling_never_starts() {
        let feed = Arc::new(ScriptedFeed::new());
        let handler = Arc::new(RecordingHandler::new());
        let polling = Arc::new(PollingIngestor::new(
            Arc::clone(&feed) as Arc<dyn ActivityFeed>,
            Arc::clone(&handler) as Arc<dyn TradeHandler>,
            PollingConfig {
                enabled: false,
                ..PollingConfig::default()
            },
            CancellationToken::new(),
        ));

        polling.start(vec![leader(1, "0xa")]);
        assert!(!polling.is_running());
    }
}
