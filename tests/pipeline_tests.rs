mod harness;
mod support;

use std::time::Duration;

use copytrail::adapter::outbound::sqlite::SqliteDedupLedger;
use copytrail::domain::{MatchKey, TradeId, TradeSource, TradeStatus};
use copytrail::infrastructure::bootstrap::build_pipeline;
use copytrail::infrastructure::config::settings::Config;
use copytrail::port::outbound::directory::BuyLotBook;
use copytrail::port::outbound::ledger::DedupLedger;
use rust_decimal_macros::dec;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn activity(hash: &str, timestamp: i64, size: f64) -> serde_json::Value {
    serde_json::json!({
        "proxyWallet": "0xleader",
        "timestamp": timestamp,
        "conditionId": "0xcond",
        "type": "TRADE",
        "size": size,
        "price": 0.40,
        "side": "BUY",
        "outcomeIndex": 0,
        "outcome": "Yes",
        "transactionHash": hash
    })
}

fn config(dir: &tempfile::TempDir, data_api_url: String) -> Config {
    let mut config = Config {
        database: dir.path().join("pipeline.db").display().to_string(),
        ..Config::default()
    };
    config.polymarket.data_api_url = data_api_url;
    config.polymarket.http.retry_max_attempts = 1;
    config.polling.interval_ms = 50;
    config.polling.batch_pause_ms = 0;
    config.reconciliation.enabled = false;
    config
}

#[tokio::test]
async fn polled_trades_after_baseline_are_replicated_and_booked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activity"))
        .and(query_param("user", "0xleader"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            activity("0xt1", 1_700_000_000, 5.0)
        ])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/activity"))
        .and(query_param("user", "0xleader"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            activity("0xt2", 1_700_000_060, 10.0),
            activity("0xt1", 1_700_000_000, 5.0)
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let pipeline = build_pipeline(&config(&dir, server.uri())).unwrap();
    let seeded = support::seed(&pipeline.directory, "0xleader", None).await;
    let dedup = SqliteDedupLedger::new(pipeline.pool.clone());

    assert_eq!(pipeline.start().await.unwrap(), 1);

    let processed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(row) = dedup
                .find_processed(seeded.leader, &TradeId::from("0xt2"))
                .await
                .unwrap()
            {
                if row.status != TradeStatus::Pending {
                    return row;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("second trade processed");

    pipeline.shutdown().await;
    assert!(pipeline.is_shut_down());

    assert_eq!(processed.status, TradeStatus::Success);
    assert_eq!(processed.source, TradeSource::Polling);
    assert!(dedup
        .find_processed(seeded.leader, &TradeId::from("0xt1"))
        .await
        .unwrap()
        .is_none());

    let lots = pipeline
        .directory
        .open_lots(&MatchKey {
            copy_trading_id: seeded.copy_trading,
            market: "0xcond".into(),
            outcome_index: Some(0),
        })
        .await
        .unwrap();
    assert_eq!(lots.len(), 1);
    assert_eq!(lots[0].remaining_quantity, dec!(10));
}
