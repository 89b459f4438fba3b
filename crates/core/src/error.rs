//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type BankResult<T> = Result<T, BankError>;

/// Domain-level error.
///
/// Every variant is recoverable by the caller: operations return these before
/// touching any state, so a failed call never leaves a partial mutation behind.
/// Storage failures are infrastructure concerns and live in `guildbank-infra`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BankError {
    /// A non-positive amount or quantity was supplied (or the result would overflow).
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// An item name was blank after trimming.
    #[error("invalid item name")]
    InvalidItemName,

    /// The bank does not hold enough mesos.
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: i64, available: i64 },

    /// The bank does not hold enough of an item.
    #[error("insufficient stock of '{item}': requested {requested}, available {available}")]
    InsufficientStock {
        item: String,
        requested: i64,
        available: i64,
    },

    /// No record exists for the item.
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// The caller lacks the privilege the operation requires.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// No pending withdrawal request matches the approval or cancellation.
    #[error("no matching pending request")]
    NoMatchingRequest,
}

impl BankError {
    pub fn invalid_amount(msg: impl Into<String>) -> Self {
        Self::InvalidAmount(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    /// Stable, machine-readable name of the error kind (used in logs).
    pub fn kind(&self) -> &'static str {
        match self {
            BankError::InvalidAmount(_) => "invalid_amount",
            BankError::InvalidItemName => "invalid_item_name",
            BankError::InsufficientFunds { .. } => "insufficient_funds",
            BankError::InsufficientStock { .. } => "insufficient_stock",
            BankError::ItemNotFound(_) => "item_not_found",
            BankError::Unauthorized(_) => "unauthorized",
            BankError::NoMatchingRequest => "no_matching_request",
        }
    }
}

/// Reject non-positive amounts and quantities.
pub fn ensure_positive(value: i64, what: &str) -> BankResult<i64> {
    if value <= 0 {
        return Err(BankError::invalid_amount(format!(
            "{what} must be positive (got {value})"
        )));
    }
    Ok(value)
}
