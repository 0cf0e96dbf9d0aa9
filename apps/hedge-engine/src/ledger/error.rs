//! Ledger error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from ledger mutations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Purchase would drive cash negative and the funding policy cannot cover it.
    #[error("Insufficient cash: required {required}, available {available}")]
    InsufficientCash {
        /// Cash required for the purchase.
        required: Decimal,
        /// Cash the funding policy could raise.
        available: Decimal,
    },

    /// Purchase quantity must be positive.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(u64),

    /// Price input is negative or zero where a positive value is required.
    #[error("Invalid {field}: {value}")]
    InvalidPrice {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: Decimal,
    },
}
