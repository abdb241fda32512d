//! Composition root: builds a [`Pipeline`] from [`Config`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::runtime::Pipeline;
use crate::adapter::outbound::crypto::AesGcmCipher;
use crate::adapter::outbound::polymarket::{
    ClobOrderClient, DataApiClient, UserTradeStreamFactory,
};
use crate::adapter::outbound::replication::DryRunReplicator;
use crate::adapter::outbound::sqlite::{
    create_pool, run_migrations, DbPool, SqliteDedupLedger, SqliteDirectory,
    SqliteSettlementLedger,
};
use crate::application::{
    LeaderWatchRegistry, PollingIngestor, ReconciliationScheduler, SettlementEngine,
    SettlementStatistics, StreamIngestor, TradeEventProcessor,
};
use crate::error::{ConfigError, Result};
use crate::infrastructure::config::settings::{Config, MASTER_KEY_ENV};
use crate::port::inbound::trade::TradeHandler;
use crate::port::outbound::directory::{BuyLotBook, CopyTradingDirectory};
use crate::port::outbound::exchange::TradeReplicator;
use crate::port::outbound::ledger::{DedupLedger, SettlementLedger};
use crate::port::outbound::secret::SecretCipher;

/// Open the database and apply pending migrations.
///
/// # Errors
///
/// Returns an error if the pool cannot be created or a migration fails.
pub fn open_database(config: &Config) -> Result<DbPool> {
    let pool = create_pool(&config.database)?;
    run_migrations(&pool)?;
    Ok(pool)
}

/// Credential cipher from the configured master key, if any.
///
/// # Errors
///
/// Returns [`CredentialError::InvalidKey`](crate::error::CredentialError::InvalidKey)
/// if the key is set but malformed.
pub fn build_cipher(config: &Config) -> Result<Option<Arc<dyn SecretCipher>>> {
    match config.master_key.as_deref() {
        Some(key) => Ok(Some(Arc::new(AesGcmCipher::from_base64(key)?))),
        None => {
            warn!(
                env = MASTER_KEY_ENV,
                "No master key set, sell prices will not be reconciled"
            );
            Ok(None)
        }
    }
}

/// Build the pipeline with the dry-run replicator.
///
/// # Errors
///
/// Fails when `dry_run` is off: live execution needs a replicator passed to
/// [`build_pipeline_with`].
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    if !config.dry_run {
        return Err(ConfigError::InvalidValue {
            field: "dry_run",
            reason: "live replication needs an execution backend; set dry_run = true".into(),
        }
        .into());
    }
    build_pipeline_with(config, Arc::new(DryRunReplicator))
}

/// Build the pipeline around `replicator`.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or the master key is
/// malformed.
pub fn build_pipeline_with(
    config: &Config,
    replicator: Arc<dyn TradeReplicator>,
) -> Result<Pipeline> {
    let pool = open_database(config)?;
    let dedup = Arc::new(SqliteDedupLedger::new(pool.clone()));
    let settlements = Arc::new(SqliteSettlementLedger::new(pool.clone()));
    let directory = Arc::new(SqliteDirectory::new(pool.clone()));
    let cipher = build_cipher(config)?;
    let shutdown = CancellationToken::new();

    let settlement = SettlementEngine::new(Arc::clone(&settlements) as Arc<dyn SettlementLedger>);
    let processor = Arc::new(TradeEventProcessor::new(
        Arc::clone(&dedup) as Arc<dyn DedupLedger>,
        Arc::clone(&directory) as Arc<dyn CopyTradingDirectory>,
        Arc::clone(&directory) as Arc<dyn BuyLotBook>,
        replicator,
        settlement,
    ));
    let handler = Arc::clone(&processor) as Arc<dyn TradeHandler>;

    let polling = Arc::new(PollingIngestor::new(
        Arc::new(DataApiClient::from_config(&config.polymarket)),
        Arc::clone(&handler),
        config.polling.clone(),
        shutdown.clone(),
    ));
    let streaming = Arc::new(StreamIngestor::new(
        Arc::new(
            UserTradeStreamFactory::new(
                config.polymarket.ws_url.clone(),
                config.streaming.ping_interval(),
                config.streaming.read_timeout(),
            )
            .with_connect_timeout(config.streaming.connect_timeout()),
        ),
        handler,
        config.reconnection.clone(),
        config.streaming.enabled,
        shutdown.clone(),
    ));
    let registry = Arc::new(LeaderWatchRegistry::new(
        Arc::clone(&directory) as Arc<dyn CopyTradingDirectory>,
        Arc::clone(&polling),
        Arc::clone(&streaming),
    ));
    let reconciliation = Arc::new(ReconciliationScheduler::new(
        Arc::clone(&settlements) as Arc<dyn SettlementLedger>,
        Arc::clone(&directory) as Arc<dyn CopyTradingDirectory>,
        dedup as Arc<dyn DedupLedger>,
        Arc::new(ClobOrderClient::from_config(&config.polymarket)),
        cipher,
        config.reconciliation.clone(),
    ));

    info!(
        database = %config.database,
        dry_run = config.dry_run,
        polling = config.polling.enabled,
        streaming = config.streaming.enabled,
        reconciliation = config.reconciliation.enabled,
        "Pipeline built"
    );

    Ok(Pipeline {
        shutdown,
        pool,
        directory,
        processor,
        polling,
        streaming,
        registry,
        reconciliation,
        statistics: SettlementStatistics::new(settlements),
    })
}

/// Statistics reader over the configured database.
///
/// # Errors
///
/// Returns an error if the database cannot be opened.
pub fn build_statistics(config: &Config) -> Result<SettlementStatistics> {
    let pool = open_database(config)?;
    Ok(SettlementStatistics::new(Arc::new(
        SqliteSettlementLedger::new(pool),
    )))
}
