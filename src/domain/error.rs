//! Domain validation errors.
//!
//! Returned when a value arriving from a feed or the store violates an
//! invariant of the ledger types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Quantities matched or sold must be strictly positive.
    #[error("quantity must be positive, got {quantity}")]
    NonPositiveQuantity {
        /// The invalid quantity that was provided.
        quantity: Decimal,
    },

    /// Trade side was neither BUY nor SELL.
    #[error("unknown trade side '{0}'")]
    UnknownSide(String),

    /// A decimal string could not be parsed.
    #[error("invalid decimal for {field}: '{value}'")]
    InvalidDecimal {
        /// Field that carried the value.
        field: &'static str,
        /// The raw text that failed to parse.
        value: String,
    },

    /// A stored enum column held an unrecognised value.
    #[error("unknown {kind} '{value}'")]
    UnknownVariant {
        /// Name of the enum being decoded.
        kind: &'static str,
        /// The raw stored value.
        value: String,
    },
}
