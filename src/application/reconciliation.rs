//! Periodic settlement upkeep: orphan cleanup, sell-price reconciliation and
//! dedup-ledger retention.
//!
//! Every item is fault-isolated: one record failing is logged and the pass
//! moves on to the next.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{ApiCredentials, PriceCorrection, SellMatchRecord};
use crate::error::Result;
use crate::infrastructure::config::reconciliation::ReconciliationConfig;
use crate::port::outbound::directory::CopyTradingDirectory;
use crate::port::outbound::exchange::OrderQuery;
use crate::port::outbound::ledger::{DedupLedger, SettlementLedger};
use crate::port::outbound::secret::{decrypt_credentials, SecretCipher};

/// What the update pass did with one pending record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordReconciliation {
    /// Price changed; record and details repriced.
    Repriced,
    /// Recorded price confirmed (or unqueryable) and marked final.
    Finalized,
    /// Left pending for the next pass.
    Skipped,
}

/// Counts from one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub orphans_deleted: usize,
    pub repriced: usize,
    pub finalized: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Runs cleanup, update and retention passes on a fixed delay.
pub struct ReconciliationScheduler {
    settlements: Arc<dyn SettlementLedger>,
    directory: Arc<dyn CopyTradingDirectory>,
    dedup: Arc<dyn DedupLedger>,
    orders: Arc<dyn OrderQuery>,
    cipher: Option<Arc<dyn SecretCipher>>,
    config: ReconciliationConfig,
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl ReconciliationScheduler {
    /// Without a `cipher` no credentials can be decrypted and every queryable
    /// record stays pending.
    #[must_use]
    pub fn new(
        settlements: Arc<dyn SettlementLedger>,
        directory: Arc<dyn CopyTradingDirectory>,
        dedup: Arc<dyn DedupLedger>,
        orders: Arc<dyn OrderQuery>,
        cipher: Option<Arc<dyn SecretCipher>>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            settlements,
            directory,
            dedup,
            orders,
            cipher,
            config,
            task: Mutex::new(None),
        }
    }

    /// Spawn the loop under a child of `shutdown`. No-op when disabled or
    /// already running.
    pub fn start(self: &Arc<Self>, shutdown: &CancellationToken) {
        if !self.config.enabled {
            info!("Reconciliation disabled, not starting");
            return;
        }
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        let token = shutdown.child_token();
        let handle = tokio::spawn(Arc::clone(self).run(token.clone()));
        *task = Some((token, handle));
        info!(interval_ms = self.config.interval_ms, "Reconciliation started");
    }

    /// Cancel the loop without waiting for an in-flight pass.
    pub fn stop(&self) {
        if let Some((token, handle)) = self.task.lock().take() {
            token.cancel();
            handle.abort();
            info!("Reconciliation stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    async fn run(self: Arc<Self>, token: CancellationToken) {
        let mut last_retention: Option<Instant> = None;
        loop {
            tokio::select! {
                () = token.cancelled() => break,
                summary = self.run_once() => {
                    debug!(?summary, "Reconciliation pass complete");
                }
            }

            let retention_due = last_retention
                .map_or(true, |at| at.elapsed() >= self.config.retention_interval());
            if retention_due {
                tokio::select! {
                    () = token.cancelled() => break,
                    result = self.retention_pass() => {
                        if let Err(e) = result {
                            error!(error = %e, "Retention pass failed");
                        }
                    }
                }
                last_retention = Some(Instant::now());
            }

            tokio::select! {
                () = token.cancelled() => break,
                () = sleep(self.config.interval()) => {}
            }
        }
        debug!("Reconciliation loop exited");
    }

    /// Cleanup pass followed by update pass.
    pub async fn run_once(&self) -> ReconcileSummary {
        let mut summary = ReconcileSummary::default();
        match self.cleanup_pass().await {
            Ok(deleted) => summary.orphans_deleted = deleted,
            Err(e) => error!(error = %e, "Orphan cleanup failed"),
        }
        match self.settlements.pending_records().await {
            Ok(records) => {
                for record in records {
                    match self.reconcile_record(&record).await {
                        Ok(RecordReconciliation::Repriced) => summary.repriced += 1,
                        Ok(RecordReconciliation::Finalized) => summary.finalized += 1,
                        Ok(RecordReconciliation::Skipped) => summary.skipped += 1,
                        Err(e) => {
                            summary.failed += 1;
                            warn!(record_id = %record.id, error = %e, "Failed to reconcile record");
                        }
                    }
                }
            }
            Err(e) => error!(error = %e, "Failed to load pending settlement records"),
        }
        summary
    }

    /// Delete records whose relationship or account no longer exists.
    ///
    /// Returns the number of records deleted.
    pub async fn cleanup_pass(&self) -> Result<usize> {
        let mut deleted = 0;
        for record in self.settlements.records().await? {
            match self.is_orphaned(&record).await {
                Ok(false) => {}
                Ok(true) => match self.settlements.delete_record(record.id).await {
                    Ok(()) => deleted += 1,
                    Err(e) => {
                        warn!(record_id = %record.id, error = %e, "Failed to delete orphaned record");
                    }
                },
                Err(e) => {
                    warn!(record_id = %record.id, error = %e, "Failed to resolve record owner");
                }
            }
        }
        if deleted > 0 {
            info!(deleted, "Deleted orphaned settlement records");
        }
        Ok(deleted)
    }

    async fn is_orphaned(&self, record: &SellMatchRecord) -> Result<bool> {
        let Some(relationship) = self.directory.relationship(record.copy_trading_id).await? else {
            return Ok(true);
        };
        Ok(self
            .directory
            .account(relationship.account_id)
            .await?
            .is_none())
    }

    /// Bring one pending record to its authoritative price.
    pub async fn reconcile_record(&self, record: &SellMatchRecord) -> Result<RecordReconciliation> {
        let Some(relationship) = self.directory.relationship(record.copy_trading_id).await? else {
            return Ok(RecordReconciliation::Skipped);
        };
        let Some(account) = self.directory.account(relationship.account_id).await? else {
            return Ok(RecordReconciliation::Skipped);
        };
        if !account.has_credentials() {
            debug!(record_id = %record.id, account_id = %account.id, "Account has no API credentials");
            return Ok(RecordReconciliation::Skipped);
        }
        let Some(cipher) = self.cipher.as_deref() else {
            debug!(record_id = %record.id, "No master key configured");
            return Ok(RecordReconciliation::Skipped);
        };
        let credentials = match decrypt_credentials(cipher, &account) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(record_id = %record.id, account_id = %account.id, error = %e, "Failed to decrypt credentials");
                return Ok(RecordReconciliation::Skipped);
            }
        };

        if !record.sell_order_id.is_queryable() {
            debug!(record_id = %record.id, order_id = %record.sell_order_id, "Order id not queryable, keeping recorded price");
            self.settlements.mark_price_final(record.id).await?;
            return Ok(RecordReconciliation::Finalized);
        }

        let price = self.authoritative_price(record, &credentials).await;
        if price == record.sell_price {
            self.settlements.mark_price_final(record.id).await?;
            return Ok(RecordReconciliation::Finalized);
        }

        let details = self.settlements.details(record.id).await?;
        let correction = PriceCorrection::reprice(record.id, price, &details);
        self.settlements.update_price(&correction).await?;
        info!(
            record_id = %record.id,
            order_id = %record.sell_order_id,
            old_price = %record.sell_price,
            new_price = %price,
            old_pnl = %record.total_realized_pnl,
            new_pnl = %correction.total_realized_pnl,
            "Reconciled sell price"
        );
        Ok(RecordReconciliation::Repriced)
    }

    /// The exchange's executed price, or the recorded one when unknown.
    async fn authoritative_price(
        &self,
        record: &SellMatchRecord,
        credentials: &ApiCredentials,
    ) -> Decimal {
        let query = self
            .orders
            .executed_price(credentials, &record.sell_order_id);
        match timeout(self.config.query_timeout(), query).await {
            Ok(Ok(Some(price))) => price,
            Ok(Ok(None)) => record.sell_price,
            Ok(Err(e)) => {
                warn!(record_id = %record.id, error = %e, "Order query failed, keeping recorded price");
                record.sell_price
            }
            Err(_) => {
                warn!(
                    record_id = %record.id,
                    timeout_ms = self.config.query_timeout_ms,
                    "Order query timed out, keeping recorded price"
                );
                record.sell_price
            }
        }
    }

    /// Purge dedup rows older than the retention window.
    pub async fn retention_pass(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.config.retention();
        let purged = self.dedup.purge_processed_before(cutoff).await?;
        if purged > 0 {
            info!(purged, %cutoff, "Purged processed trades");
        }
        Ok(purged)
    }
}
