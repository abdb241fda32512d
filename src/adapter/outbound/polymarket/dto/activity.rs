//! Data-API activity item.
//!
//! Example item:
//! ```json
//! {"proxyWallet":"0x…","timestamp":1700000000,"conditionId":"0x…","type":"TRADE",
//!  "size":10,"price":0.42,"side":"BUY","outcomeIndex":0,"outcome":"Yes",
//!  "transactionHash":"0x…"}
//! ```

use serde::Deserialize;
use serde_json::Value;

use super::{decimal_from_value, i64_from_value};
use crate::port::outbound::activity::ActivityRecord;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    #[serde(rename = "type")]
    pub activity_type: Option<String>,
    pub side: Option<String>,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub size: Value,
    #[serde(default)]
    pub timestamp: Value,
    pub condition_id: Option<String>,
    pub outcome_index: Option<i32>,
    pub outcome: Option<String>,
    pub proxy_wallet: Option<String>,
    pub transaction_hash: Option<String>,
}

impl From<ActivityItem> for ActivityRecord {
    fn from(item: ActivityItem) -> Self {
        Self {
            activity_type: item.activity_type,
            side: item.side,
            price: decimal_from_value(&item.price),
            size: decimal_from_value(&item.size),
            timestamp: i64_from_value(&item.timestamp),
            condition_id: item.condition_id,
            outcome_index: item.outcome_index,
            outcome: item.outcome,
            proxy_wallet: item.proxy_wallet,
            transaction_hash: item.transaction_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn activity_item_deserializes_camel_case() {
        let json = r#"{"proxyWallet":"0xw","timestamp":1700000000,"conditionId":"0xc",
            "type":"TRADE","size":10,"price":0.42,"side":"BUY","outcomeIndex":1,
            "outcome":"No","transactionHash":"0xh","usdcSize":4.2}"#;
        let item: ActivityItem = serde_json::from_str(json).unwrap();
        let record = ActivityRecord::from(item);

        assert_eq!(record.activity_type.as_deref(), Some("TRADE"));
        assert_eq!(record.price, Some(dec!(0.42)));
        assert_eq!(record.size, Some(dec!(10)));
        assert_eq!(record.timestamp, Some(1_700_000_000));
        assert_eq!(record.outcome_index, Some(1));
        assert_eq!(record.transaction_hash.as_deref(), Some("0xh"));
    }

    #[test]
    fn missing_fields_deserialize_as_none() {
        let item: ActivityItem = serde_json::from_str(r#"{"type":"TRADE"}"#).unwrap();
        let record = ActivityRecord::from(item);
        assert!(record.price.is_none());
        assert!(record.side.is_none());
    }
}
