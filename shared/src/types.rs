//! Common types used across the platform

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Minor-unit precision of every stored amount
pub const MONEY_SCALE: u32 = 2;

/// Round an amount to 2 places, half-up (midpoint away from zero).
///
/// This is the only rounding rule applied to money in the platform.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Total of an order line (`unit_price * quantity`), rounded
pub fn line_total(unit_price: Decimal, quantity: Decimal) -> Decimal {
    round_money(unit_price * quantity)
}

/// Marketplace roles carried in access tokens
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "user_role", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Vendor,
    Farmer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Vendor => "vendor",
            UserRole::Farmer => "farmer",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
