//! Domain errors raised by the settlement and reservation rules

use rust_decimal::Decimal;
use thiserror::Error;

/// Business-rule violations. None of these leave state half-mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },

    #[error("Insufficient funds: balance {balance}, requested {requested}")]
    InsufficientFunds { balance: Decimal, requested: Decimal },

    #[error("No commission rate is configured")]
    NoCommissionConfigured,

    #[error("{field} must be greater than zero")]
    NonPositiveAmount { field: &'static str },

    #[error("{field} must have at most two decimal places")]
    ExcessPrecision { field: &'static str },

    #[error("Split produced a negative {party} share of {amount}")]
    NegativeShare { party: &'static str, amount: Decimal },

    #[error("Resale price {resale_price} is below the farmer base price {base_price}")]
    ResaleBelowCost {
        resale_price: Decimal,
        base_price: Decimal,
    },

    #[error("Stock lot is not available: {0}")]
    StockUnavailable(String),

    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Commission rate must be between 0 and 100, got {0}")]
    InvalidRate(Decimal),
}

/// Result alias for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
