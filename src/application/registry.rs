//! Watched-leader lifecycle across both ingestors.
//!
//! The watched set is derived from enabled copy-trading relationships: a
//! leader is watched while at least one enabled relationship follows it.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{info, warn};

use super::ingest::{PollingIngestor, StreamIngestor};
use crate::domain::{Leader, LeaderId};
use crate::error::Result;
use crate::port::outbound::directory::CopyTradingDirectory;

/// Pause between stopping and starting again on [`LeaderWatchRegistry::restart`].
pub const RESTART_PAUSE: Duration = Duration::from_secs(1);

/// Starts, stops and adjusts the ingestors' watched leaders.
///
/// Lifecycle calls are serialized so a restart never interleaves with an
/// add or remove.
pub struct LeaderWatchRegistry {
    directory: Arc<dyn CopyTradingDirectory>,
    polling: Arc<PollingIngestor>,
    streaming: Arc<StreamIngestor>,
    lifecycle: Mutex<()>,
}

impl LeaderWatchRegistry {
    #[must_use]
    pub fn new(
        directory: Arc<dyn CopyTradingDirectory>,
        polling: Arc<PollingIngestor>,
        streaming: Arc<StreamIngestor>,
    ) -> Self {
        Self {
            directory,
            polling,
            streaming,
            lifecycle: Mutex::new(()),
        }
    }

    /// Watch every leader with an enabled relationship.
    ///
    /// Returns the number of leaders watched.
    pub async fn start(&self) -> Result<usize> {
        let _guard = self.lifecycle.lock().await;
        self.start_locked().await
    }

    async fn start_locked(&self) -> Result<usize> {
        let leaders = self.followed_leaders().await?;
        let count = leaders.len();
        self.polling.start(leaders.clone());
        self.streaming.start(leaders);
        info!(leaders = count, "Leader monitoring started");
        Ok(count)
    }

    async fn followed_leaders(&self) -> Result<Vec<Leader>> {
        let ids: BTreeSet<LeaderId> = self
            .directory
            .enabled_relationships()
            .await?
            .into_iter()
            .map(|r| r.leader_id)
            .collect();

        let mut leaders = Vec::with_capacity(ids.len());
        for id in ids {
            match self.directory.leader(id).await? {
                Some(leader) => leaders.push(leader),
                None => warn!(leader_id = %id, "Relationship references a missing leader"),
            }
        }
        Ok(leaders)
    }

    /// Start watching `leader_id` if an enabled relationship follows it.
    ///
    /// Returns whether the leader is now watched.
    pub async fn add_leader_monitoring(&self, leader_id: LeaderId) -> Result<bool> {
        let _guard = self.lifecycle.lock().await;
        if self
            .directory
            .enabled_relationships_for(leader_id)
            .await?
            .is_empty()
        {
            info!(leader_id = %leader_id, "No enabled relationships, not monitoring");
            return Ok(false);
        }
        let Some(leader) = self.directory.leader(leader_id).await? else {
            warn!(leader_id = %leader_id, "Leader not found");
            return Ok(false);
        };
        self.polling.add_leader(leader.clone());
        self.streaming.add_leader(leader);
        Ok(true)
    }

    /// Stop watching `leader_id` once no enabled relationship follows it.
    ///
    /// Returns whether the leader was dropped.
    pub async fn remove_leader_monitoring(&self, leader_id: LeaderId) -> Result<bool> {
        let _guard = self.lifecycle.lock().await;
        let remaining = self.directory.enabled_relationships_for(leader_id).await?;
        if !remaining.is_empty() {
            info!(
                leader_id = %leader_id,
                relationships = remaining.len(),
                "Leader still followed, keeping monitoring"
            );
            return Ok(false);
        }
        self.polling.remove_leader(leader_id);
        self.streaming.remove_leader(leader_id);
        Ok(true)
    }

    /// Stop both ingestors, pause, then start again from the directory.
    pub async fn restart(&self) -> Result<usize> {
        let _guard = self.lifecycle.lock().await;
        self.stop_locked();
        sleep(RESTART_PAUSE).await;
        self.start_locked().await
    }

    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;
        self.stop_locked();
    }

    fn stop_locked(&self) {
        self.polling.stop();
        self.streaming.stop();
        info!("Leader monitoring stopped");
    }

    /// Leaders watched by either ingestor, ascending.
    #[must_use]
    pub fn watched(&self) -> Vec<LeaderId> {
        let mut ids: BTreeSet<LeaderId> = self.polling.watched().into_iter().collect();
        ids.extend(self.streaming.watched());
        ids.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CopyTradingId;
    use crate::infrastructure::config::ingest::PollingConfig;
    use crate::infrastructure::config::reconnection::ReconnectionConfig;
    use crate::port::inbound::trade::TradeHandler;
    use crate::port::outbound::activity::ActivityFeed;
    use crate::port::outbound::stream::TradeStreamFactory;
    use crate::testkit::domain::{leader, relationship};
    use crate::testkit::memory::{MemoryLedger, RecordingHandler, ScriptedFeed};
    use crate::testkit::stream::ChannelStreamFactory;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        ledger: Arc<MemoryLedger>,
        polling: Arc<PollingIngestor>,
        registry: LeaderWatchRegistry,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(MemoryLedger::new());
        ledger.add_leader(leader(1, "0xone"));
        ledger.add_leader(leader(2, "0xtwo"));
        ledger.add_leader(leader(3, "0xthree"));
        ledger.add_relationship(relationship(10, 1, 100));
        ledger.add_relationship(relationship(11, 1, 101));
        ledger.add_relationship(relationship(12, 2, 100));

        let handler = Arc::new(RecordingHandler::new()) as Arc<dyn TradeHandler>;
        let shutdown = CancellationToken::new();
        let polling = Arc::new(PollingIngestor::new(
            Arc::new(ScriptedFeed::new()) as Arc<dyn ActivityFeed>,
            Arc::clone(&handler),
            PollingConfig::default(),
            shutdown.clone(),
        ));
        let streaming = Arc::new(StreamIngestor::new(
            Arc::new(ChannelStreamFactory::new()) as Arc<dyn TradeStreamFactory>,
            handler,
            ReconnectionConfig::default(),
            false,
            shutdown,
        ));
        let registry = LeaderWatchRegistry::new(
            Arc::clone(&ledger) as Arc<dyn CopyTradingDirectory>,
            Arc::clone(&polling),
            streaming,
        );
        Fixture {
            ledger,
            polling,
            registry,
        }
    }

    #[tokio::test]
    async fn start_watches_distinct_followed_leaders() {
        let f = fixture();
        f.ledger.add_relationship(relationship(13, 9, 100));

        let count = f.registry.start().await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(f.registry.watched(), [LeaderId::new(1), LeaderId::new(2)]);
        assert!(f.polling.is_running());
        f.registry.stop().await;
    }

    #[tokio::test]
    async fn unfollowed_leader_is_not_added() {
        let f = fixture();
        f.registry.start().await.unwrap();

        assert!(!f
            .registry
            .add_leader_monitoring(LeaderId::new(3))
            .await
            .unwrap());

        f.ledger.add_relationship(relationship(14, 3, 100));
        assert!(f
            .registry
            .add_leader_monitoring(LeaderId::new(3))
            .await
            .unwrap());
        assert!(f.registry.watched().contains(&LeaderId::new(3)));
        f.registry.stop().await;
    }

    #[tokio::test]
    async fn leader_stays_watched_while_any_relationship_remains() {
        let f = fixture();
        f.registry.start().await.unwrap();

        f.ledger.set_enabled(CopyTradingId::new(10), false);
        assert!(!f
            .registry
            .remove_leader_monitoring(LeaderId::new(1))
            .await
            .unwrap());
        assert!(f.registry.watched().contains(&LeaderId::new(1)));

        f.ledger.remove_relationship(CopyTradingId::new(11));
        assert!(f
            .registry
            .remove_leader_monitoring(LeaderId::new(1))
            .await
            .unwrap());
        assert_eq!(f.registry.watched(), [LeaderId::new(2)]);
        f.registry.stop().await;
    }

    #[tokio::test]
    async fn stop_clears_the_watched_set() {
        let f = fixture();
        f.registry.start().await.unwrap();

        f.registry.stop().await;

        assert!(f.registry.watched().is_empty());
        assert!(!f.polling.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_reloads_from_the_directory() {
        let f = fixture();
        f.registry.start().await.unwrap();
        f.ledger.remove_relationship(CopyTradingId::new(12));

        let started = tokio::time::Instant::now();
        let count = f.registry.restart().await.unwrap();

        assert!(started.elapsed() >= RESTART_PAUSE);
        assert_eq!(count, 1);
        assert_eq!(f.registry.watched(), [LeaderId::new(1)]);
        assert!(f.polling.is_running());
        f.registry.stop().await;
    }
}
