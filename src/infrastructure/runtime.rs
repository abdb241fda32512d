//! Pipeline lifecycle.
//!
//! The pipeline owns the root [`CancellationToken`]; every background task
//! runs under a child of it. Shutdown cancels and aborts without awaiting
//! in-flight network calls.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::adapter::outbound::sqlite::{DbPool, SqliteDirectory};
use crate::application::{
    LeaderWatchRegistry, PollingIngestor, ReconciliationScheduler, SettlementStatistics,
    StreamIngestor, TradeEventProcessor,
};
use crate::error::Result;

/// The wired ingestion, settlement and reconciliation services.
pub struct Pipeline {
    pub(crate) shutdown: CancellationToken,
    pub pool: DbPool,
    pub directory: Arc<SqliteDirectory>,
    pub processor: Arc<TradeEventProcessor>,
    pub polling: Arc<PollingIngestor>,
    pub streaming: Arc<StreamIngestor>,
    pub registry: Arc<LeaderWatchRegistry>,
    pub reconciliation: Arc<ReconciliationScheduler>,
    pub statistics: SettlementStatistics,
}

impl Pipeline {
    /// Start leader monitoring and the reconciliation timer.
    ///
    /// Returns the number of leaders watched.
    pub async fn start(&self) -> Result<usize> {
        let leaders = self.registry.start().await?;
        self.reconciliation.start(&self.shutdown);
        info!(leaders, "Pipeline started");
        Ok(leaders)
    }

    /// Cancel every background task.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        self.registry.stop().await;
        self.reconciliation.stop();
        info!("Pipeline stopped");
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Run until Ctrl-C, then shut down.
    pub async fn run_until_ctrl_c(&self) -> Result<()> {
        self.start().await?;
        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");
        self.shutdown().await;
        Ok(())
    }
}
