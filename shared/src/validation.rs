//! Validation helpers shared by the domain rules

use rust_decimal::Decimal;

use crate::error::{DomainError, DomainResult};
use crate::types::MONEY_SCALE;

/// Reject zero and negative amounts/quantities
pub fn ensure_positive(value: Decimal, field: &'static str) -> DomainResult<()> {
    if value <= Decimal::ZERO {
        return Err(DomainError::NonPositiveAmount { field });
    }
    Ok(())
}

/// Reject values with more than two decimal places, the storage scale.
/// Trailing zeros are ignored, so `1.500` passes.
pub fn ensure_money_scale(value: Decimal, field: &'static str) -> DomainResult<()> {
    if value.normalize().scale() > MONEY_SCALE {
        return Err(DomainError::ExcessPrecision { field });
    }
    Ok(())
}

/// Validate a commission rate percentage (0-100 inclusive)
pub fn validate_rate(rate_percent: Decimal) -> DomainResult<()> {
    if rate_percent < Decimal::ZERO || rate_percent > Decimal::from(100) {
        return Err(DomainError::InvalidRate(rate_percent));
    }
    Ok(())
}

/// Check whether a reservation of `requested` fits into `available`
pub fn fits_available(available: Decimal, requested: Decimal) -> bool {
    requested > Decimal::ZERO && requested <= available
}
