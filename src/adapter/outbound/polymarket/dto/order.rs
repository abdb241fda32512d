//! CLOB order lookup response (`GET /data/order/{id}`).

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::decimal_from_value;

#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub size_matched: Value,
    #[serde(default)]
    pub original_size: Value,
}

impl OrderResponse {
    /// Executed price, known only once some size has matched.
    #[must_use]
    pub fn executed_price(&self) -> Option<Decimal> {
        let matched = decimal_from_value(&self.size_matched)?;
        if matched <= Decimal::ZERO {
            return None;
        }
        decimal_from_value(&self.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn filled_order_reports_price() {
        let order: OrderResponse = serde_json::from_str(
            r#"{"id":"0x1","status":"MATCHED","price":"0.52","size_matched":"10","original_size":"10"}"#,
        )
        .unwrap();
        assert_eq!(order.executed_price(), Some(dec!(0.52)));
    }

    #[test]
    fn unfilled_order_has_no_price() {
        let order: OrderResponse = serde_json::from_str(
            r#"{"id":"0x1","status":"LIVE","price":"0.52","size_matched":"0"}"#,
        )
        .unwrap();
        assert_eq!(order.executed_price(), None);
    }
}
