//! Polymarket user-channel WebSocket messages.
//!
//! The server sends either the literal text `PONG` (reply to our `PING`) or a
//! JSON object. Trade frames carry `"event_type":"trade"`:
//! ```json
//! {"event_type":"trade","id":"0x…","market":"0x…","side":"BUY","price":"0.42",
//!  "size":"10","timestamp":"1700000000","user":{"address":"0x…"}}
//! ```

use serde::Serialize;
use serde_json::Value;

use super::{decimal_from_value, i64_from_value};
use crate::domain::{Side, TradeEvent, TradeId};

/// Heartbeat text the client sends.
pub const HEARTBEAT_REQUEST: &str = "PING";

/// Heartbeat text the server replies with.
pub const HEARTBEAT_REPLY: &str = "PONG";

/// Subscription request for one user's trades.
#[derive(Debug, Serialize)]
pub struct UserSubscribeMessage {
    #[serde(rename = "type")]
    pub msg_type: &'static str,
    pub channel: &'static str,
    pub user: String,
}

impl UserSubscribeMessage {
    pub fn new(address: &str) -> Self {
        Self {
            msg_type: "subscribe",
            channel: "user",
            user: address.to_lowercase(),
        }
    }
}

/// A classified inbound text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFrame {
    Heartbeat,
    Trade(TradeEvent),
    /// Valid JSON that is not a trade event.
    Ignored,
    /// A trade frame missing required fields, or unparseable text.
    Malformed(String),
}

/// Classify a text frame. `now_secs` stands in for a missing timestamp.
pub fn parse_frame(text: &str, now_secs: i64) -> UserFrame {
    if text.trim() == HEARTBEAT_REPLY {
        return UserFrame::Heartbeat;
    }

    let json: Value = match serde_json::from_str(text) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(_) => return UserFrame::Ignored,
        Err(e) => return UserFrame::Malformed(e.to_string()),
    };

    if json.get("event_type").and_then(Value::as_str) != Some("trade") {
        return UserFrame::Ignored;
    }

    match trade_from_json(&json, now_secs) {
        Some(event) => UserFrame::Trade(event),
        None => UserFrame::Malformed("trade frame missing id, market, side, price or size".into()),
    }
}

fn text_field(json: &Value, key: &str) -> Option<String> {
    match json.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn trade_from_json(json: &Value, now_secs: i64) -> Option<TradeEvent> {
    let id = text_field(json, "id").or_else(|| text_field(json, "trade_id"))?;
    let market = text_field(json, "market")?;
    let side: Side = json.get("side")?.as_str()?.parse().ok()?;
    let price = decimal_from_value(json.get("price")?)?;
    let size = decimal_from_value(json.get("size")?)?;

    // Timestamps arrive in seconds or milliseconds.
    let timestamp_secs = json
        .get("timestamp")
        .and_then(i64_from_value)
        .map(|ts| if ts > 10_000_000_000 { ts / 1000 } else { ts })
        .unwrap_or(now_secs);

    let source_wallet = json
        .get("user")
        .and_then(|user| user.get("address"))
        .and_then(Value::as_str)
        .map(str::to_string);

    let outcome_index = json
        .get("outcome_index")
        .and_then(i64_from_value)
        .and_then(|i| i32::try_from(i).ok());

    Some(TradeEvent {
        id: TradeId::new(id),
        market,
        side,
        price,
        size,
        timestamp_secs,
        source_wallet,
        outcome_index,
        outcome_label: text_field(json, "outcome"),
    })
}
