use std::time::Duration;

use copytrail::adapter::outbound::polymarket::settings::PolymarketHttpConfig;
use copytrail::adapter::outbound::polymarket::{
    ClobOrderClient, DataApiClient, PolymarketConfig, UserTradeStream,
};
use copytrail::domain::{ApiCredentials, OrderId, Side, TradeId};
use copytrail::port::outbound::activity::ActivityFeed;
use copytrail::port::outbound::exchange::OrderQuery;
use copytrail::port::outbound::stream::{StreamEvent, TradeStream};
use futures_util::{SinkExt, StreamExt};
use rust_decimal_macros::dec;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> PolymarketConfig {
    PolymarketConfig {
        data_api_url: server.uri(),
        clob_api_url: server.uri(),
        http: PolymarketHttpConfig {
            retry_max_attempts: 1,
            retry_backoff_ms: 0,
            ..PolymarketHttpConfig::default()
        },
        ..PolymarketConfig::default()
    }
}

fn credentials() -> ApiCredentials {
    ApiCredentials {
        address: "0xfollower".into(),
        key: "api-key".into(),
        secret: "c2VjcmV0LWtleQ==".into(),
        passphrase: "passphrase".into(),
    }
}

#[tokio::test]
async fn activity_client_requests_latest_trades_newest_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/activity"))
        .and(query_param("user", "0xleader"))
        .and(query_param("limit", "100"))
        .and(query_param("offset", "0"))
        .and(query_param("type", "TRADE"))
        .and(query_param("sortBy", "TIMESTAMP"))
        .and(query_param("sortDirection", "DESC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {
                "proxyWallet": "0xleader",
                "timestamp": 1700000100,
                "conditionId": "0xcond",
                "type": "TRADE",
                "size": 12.5,
                "price": 0.42,
                "side": "SELL",
                "outcomeIndex": 1,
                "outcome": "No",
                "transactionHash": "0xnewest"
            },
            {
                "timestamp": 1700000000,
                "conditionId": "0xcond",
                "type": "TRADE",
                "size": 10,
                "price": 0.40,
                "side": "BUY",
                "outcomeIndex": 1,
                "outcome": "No"
            }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = DataApiClient::from_config(&config(&server));
    let records = client.recent_trades("0xleader", 500).await.unwrap();

    assert_eq!(records.len(), 2);
    let newest = records[0].clone().into_trade_event().unwrap();
    assert_eq!(newest.id, TradeId::from("0xnewest"));
    assert_eq!(newest.side, Side::Sell);
    assert_eq!(newest.price, dec!(0.42));
    assert_eq!(newest.size, dec!(12.5));
    assert_eq!(newest.outcome_side(), "No");

    let unhashed = records[1].clone().into_trade_event().unwrap();
    assert_eq!(unhashed.id, TradeId::synthesized(1_700_000_000, "0xcond"));
}

#[tokio::test]
async fn activity_client_surfaces_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = DataApiClient::from_config(&config(&server));

    assert!(client.recent_trades("0xleader", 100).await.is_err());
}

#[tokio::test]
async fn order_client_signs_request_and_reads_fill_price() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/order/0xabc"))
        .and(header("POLY_ADDRESS", "0xfollower"))
        .and(header("POLY_API_KEY", "api-key"))
        .and(header("POLY_PASSPHRASE", "passphrase"))
        .and(header_exists("POLY_SIGNATURE"))
        .and(header_exists("POLY_TIMESTAMP"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "0xabc",
            "status": "MATCHED",
            "price": "0.52",
            "size_matched": "10",
            "original_size": "10"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ClobOrderClient::from_config(&config(&server));
    let price = client
        .executed_price(&credentials(), &OrderId::from("0xabc"))
        .await
        .unwrap();

    assert_eq!(price, Some(dec!(0.52)));
}

#[tokio::test]
async fn unfilled_order_has_no_executed_price() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/order/0xopen"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "0xopen",
            "status": "LIVE",
            "price": "0.52",
            "size_matched": "0"
        })))
        .mount(&server)
        .await;

    let client = ClobOrderClient::from_config(&config(&server));
    let price = client
        .executed_price(&credentials(), &OrderId::from("0xopen"))
        .await
        .unwrap();

    assert_eq!(price, None);
}

#[tokio::test]
async fn user_stream_subscribes_and_yields_trades() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (subscribed_tx, subscribed_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
        let subscribe = match ws.next().await {
            Some(Ok(Message::Text(text))) => text,
            other => panic!("expected subscribe frame, got {other:?}"),
        };
        subscribed_tx.send(subscribe).unwrap();

        ws.send(Message::Text("PONG".into())).await.unwrap();
        ws.send(Message::Text(
            r#"{"event_type":"order","id":"0xo"}"#.into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"event_type":"trade","id":"0xbad","side":"BUY"}"#.into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"event_type":"trade","id":"0xt1","market":"0xcond","side":"BUY","price":"0.42","size":"10","timestamp":"1700000000","user":{"address":"0xleader"}}"#.into(),
        ))
        .await
        .unwrap();
        ws.close(None).await.unwrap();
    });

    let mut stream = UserTradeStream::new(
        format!("ws://{addr}"),
        Duration::from_secs(10),
        Duration::from_secs(60),
    );
    stream.connect().await.unwrap();
    stream.subscribe("0xLEADER").await.unwrap();

    let subscribe: serde_json::Value =
        serde_json::from_str(&subscribed_rx.await.unwrap()).unwrap();
    assert_eq!(
        subscribe,
        serde_json::json!({"type": "subscribe", "channel": "user", "user": "0xleader"})
    );

    assert_eq!(stream.next_event().await, Some(StreamEvent::Heartbeat));
    match stream.next_event().await {
        Some(StreamEvent::Trade(event)) => {
            assert_eq!(event.id, TradeId::from("0xt1"));
            assert_eq!(event.price, dec!(0.42));
            assert_eq!(event.timestamp_secs, 1_700_000_000);
            assert_eq!(event.source_wallet.as_deref(), Some("0xleader"));
        }
        other => panic!("expected trade, got {other:?}"),
    }
    assert!(matches!(
        stream.next_event().await,
        Some(StreamEvent::Disconnected { .. })
    ));
    assert_eq!(stream.next_event().await, None);

    server.await.unwrap();
}
