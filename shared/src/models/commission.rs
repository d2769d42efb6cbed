//! Commission configuration and the farmer/vendor/platform split

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::types::round_money;
use crate::validation::validate_rate;

/// The single authoritative platform commission rate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct CommissionRate {
    /// Percentage of each sale, halved between the farmer and vendor sides
    pub rate_percent: Decimal,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
}

impl CommissionRate {
    /// Turn a missing configuration into `NoCommissionConfigured`
    pub fn require(rate: Option<&CommissionRate>) -> DomainResult<&CommissionRate> {
        rate.ok_or(DomainError::NoCommissionConfigured)
    }

    /// Fraction charged to each side (`rate / 100 / 2`)
    pub fn half_rate(&self) -> Decimal {
        half_rate(self.rate_percent)
    }
}

fn half_rate(rate_percent: Decimal) -> Decimal {
    rate_percent / Decimal::from(100) / Decimal::from(2)
}

/// Result of splitting one line's revenue
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommissionSplit {
    pub line_total: Decimal,
    pub farmer_base_amount: Decimal,
    pub farmer_commission: Decimal,
    pub vendor_commission: Decimal,
    pub admin_commission: Decimal,
    pub farmer_share: Decimal,
    pub vendor_share: Decimal,
}

impl CommissionSplit {
    /// Sum of the three payouts; always equals `line_total`
    pub fn distributed(&self) -> Decimal {
        self.farmer_share + self.vendor_share + self.admin_commission
    }
}

/// Split `line_total` between farmer, vendor and platform.
///
/// `farmer_base_amount` is the farmer's cost basis (`base_price * quantity`).
/// Each side's commission is rounded half-up to cents; the admin commission
/// takes whatever remains so the three shares add up to `line_total` exactly.
/// A negative farmer or vendor share is rejected.
pub fn split(
    line_total: Decimal,
    farmer_base_amount: Decimal,
    rate_percent: Decimal,
) -> DomainResult<CommissionSplit> {
    validate_rate(rate_percent)?;

    let line_total = round_money(line_total);
    let farmer_base_amount = round_money(farmer_base_amount);
    let half_rate = half_rate(rate_percent);

    let farmer_commission = round_money(line_total * half_rate);
    let vendor_commission = round_money(line_total * half_rate);

    let farmer_share = farmer_base_amount - farmer_commission;
    let vendor_base_amount = line_total - farmer_base_amount;
    let vendor_share = vendor_base_amount - vendor_commission;
    let admin_commission = line_total - farmer_share - vendor_share;

    if farmer_share < Decimal::ZERO {
        return Err(DomainError::NegativeShare {
            party: "farmer",
            amount: farmer_share,
        });
    }
    if vendor_share < Decimal::ZERO {
        return Err(DomainError::NegativeShare {
            party: "vendor",
            amount: vendor_share,
        });
    }

    Ok(CommissionSplit {
        line_total,
        farmer_base_amount,
        farmer_commission,
        vendor_commission,
        admin_commission,
        farmer_share,
        vendor_share,
    })
}
