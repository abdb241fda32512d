//! Domain identifier types with proper encapsulation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declares a newtype over a database row id.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw row id.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Get the raw row id.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

row_id!(
    /// Identifier of a watched leader wallet.
    LeaderId
);
row_id!(
    /// Identifier of a leader/follower copy-trading relationship.
    CopyTradingId
);
row_id!(
    /// Identifier of a follower account.
    AccountId
);
row_id!(
    /// Identifier of an open buy lot (a tracked replicated buy order).
    LotId
);
row_id!(
    /// Identifier of a persisted sell match record.
    MatchRecordId
);
row_id!(
    /// Identifier of a persisted dedup ledger row.
    ProcessedTradeId
);

/// Leader trade identifier: the venue transaction hash, or a synthesized
/// `timestamp_market` key when the venue omits it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradeId(String);

impl TradeId {
    /// Create a new `TradeId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the fallback id used when a trade carries no transaction hash.
    #[must_use]
    pub fn synthesized(timestamp_secs: i64, market: &str) -> Self {
        Self(format!("{timestamp_secs}_{market}"))
    }

    /// Get the trade ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TradeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for TradeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Exchange order identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(String);

impl OrderId {
    /// Create a new `OrderId` from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the order ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the exchange can be asked about this order.
    ///
    /// Queryable ids are `0x` (or `0X`) followed by one or more hexadecimal
    /// digits.
    #[must_use]
    pub fn is_queryable(&self) -> bool {
        let Some(hex) = self
            .0
            .strip_prefix("0x")
            .or_else(|| self.0.strip_prefix("0X"))
        else {
            return false;
        };
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_with_hex_digits_is_queryable() {
        assert!(OrderId::from("0xA1b2").is_queryable());
        assert!(OrderId::from("0x0").is_queryable());
    }

    #[test]
    fn order_id_prefix_is_case_insensitive() {
        assert!(OrderId::from("0XA1").is_queryable());
        assert!(!OrderId::from("0X").is_queryable());
    }

    #[test]
    fn order_id_without_digits_is_not_queryable() {
        assert!(!OrderId::from("0x").is_queryable());
    }

    #[test]
    fn order_id_without_prefix_is_not_queryable() {
        assert!(!OrderId::from("A1b2").is_queryable());
        assert!(!OrderId::from("dry-1234").is_queryable());
    }

    #[test]
    fn order_id_with_non_hex_digits_is_not_queryable() {
        assert!(!OrderId::from("0xGG").is_queryable());
        assert!(!OrderId::from("0x12 34").is_queryable());
    }

    #[test]
    fn synthesized_trade_id_joins_timestamp_and_market() {
        let id = TradeId::synthesized(1_700_000_000, "0xcond");
        assert_eq!(id.as_str(), "1700000000_0xcond");
    }

    #[test]
    fn row_ids_round_trip_raw_value() {
        let id = LeaderId::new(42);
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(LeaderId::from(42), id);
    }
}
