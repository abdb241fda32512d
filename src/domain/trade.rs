//! Leader trade events and their processing outcomes.
//!
//! A [`TradeEvent`] is produced by either ingestion path (polling or
//! streaming) and is never persisted as such: it is either admitted into the
//! dedup ledger or discarded as a duplicate.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::id::TradeId;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Canonical upper-case wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("buy") {
            Ok(Self::Buy)
        } else if s.eq_ignore_ascii_case("sell") {
            Ok(Self::Sell)
        } else {
            Err(DomainError::UnknownSide(s.to_string()))
        }
    }
}

/// Ingestion path that observed a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSource {
    Polling,
    Streaming,
}

impl TradeSource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::Streaming => "streaming",
        }
    }
}

impl fmt::Display for TradeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSource {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "polling" => Ok(Self::Polling),
            "streaming" => Ok(Self::Streaming),
            other => Err(DomainError::UnknownVariant {
                kind: "trade source",
                value: other.to_string(),
            }),
        }
    }
}

/// A single leader trade as observed on the venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeEvent {
    /// Venue transaction hash, or a synthesized `timestamp_market` key.
    pub id: TradeId,
    /// Market (condition) identifier.
    pub market: String,
    pub side: Side,
    pub price: Decimal,
    pub size: Decimal,
    /// Trade time in unix seconds.
    pub timestamp_secs: i64,
    /// Wallet that executed the trade, when the venue reports it.
    pub source_wallet: Option<String>,
    /// Outcome index within the market (0 = first outcome).
    pub outcome_index: Option<i32>,
    /// Human-readable outcome name, e.g. "Yes".
    pub outcome_label: Option<String>,
}

impl TradeEvent {
    /// Outcome name for display and storage.
    ///
    /// Prefers the venue's label, then the stringified index. Lots are
    /// matched by index, never by this text.
    #[must_use]
    pub fn outcome_side(&self) -> String {
        match (&self.outcome_label, self.outcome_index) {
            (Some(label), _) => label.clone(),
            (None, Some(index)) => index.to_string(),
            (None, None) => String::new(),
        }
    }
}

/// Result of funnelling one trade event through the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The `(leader, trade)` key was already admitted; nothing was done.
    Duplicate,
    /// Every copy relationship replicated the trade.
    Replicated {
        /// Number of relationships the trade was copied into.
        copies: usize,
        /// Number of sell settlements written.
        settled: usize,
    },
    /// At least one relationship failed; failures are in the failed-trade ledger.
    Failed {
        copies: usize,
        failures: usize,
    },
}

impl ProcessOutcome {
    #[must_use]
    pub const fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_parses_case_insensitively() {
        assert_eq!("BUY".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!("sell".parse::<Side>().unwrap(), Side::Sell);
        assert!(matches!(
            "hold".parse::<Side>(),
            Err(DomainError::UnknownSide(_))
        ));
    }

    #[test]
    fn trade_source_round_trips_through_str() {
        for source in [TradeSource::Polling, TradeSource::Streaming] {
            assert_eq!(source.as_str().parse::<TradeSource>().unwrap(), source);
        }
    }

    #[test]
    fn outcome_side_prefers_label_then_index() {
        let mut event = TradeEvent {
            id: TradeId::from("0xabc"),
            market: "m".into(),
            side: Side::Buy,
            price: Decimal::ONE,
            size: Decimal::ONE,
            timestamp_secs: 0,
            source_wallet: None,
            outcome_index: Some(1),
            outcome_label: Some("No".into()),
        };
        assert_eq!(event.outcome_side(), "No");

        event.outcome_label = None;
        assert_eq!(event.outcome_side(), "1");

        event.outcome_index = None;
        assert_eq!(event.outcome_side(), "");
    }
}
