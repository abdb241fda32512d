//! Polymarket data transfer objects.
//!
//! Contains types for API and WebSocket communication:
//! - Data-API activity items
//! - User-channel WebSocket frames and subscriptions
//! - CLOB order responses

pub mod activity;
pub mod message;
pub mod order;

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Read a decimal the venue may send either as a JSON number or a string.
pub(crate) fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// Read an integer the venue may send either as a JSON number or a string.
pub(crate) fn i64_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
