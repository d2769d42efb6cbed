//! Pure settlement planning for one order
//!
//! The backend loads the order lines, builds a [`SettlementPlan`] and posts
//! its credits inside a single transaction together with the settled marker.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::commission::{split, CommissionRate, CommissionSplit};
use super::wallet::WalletOwner;
use crate::error::DomainResult;
use crate::types::line_total;

/// An order line joined with the parties and cost basis needed to split it
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct SettlementLine {
    pub line_id: Uuid,
    pub reservation_id: Uuid,
    pub farmer_id: Uuid,
    pub vendor_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// Farmer's base price per unit of the underlying stock lot
    pub base_price: Decimal,
}

impl SettlementLine {
    pub fn line_total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity)
    }

    pub fn farmer_base_amount(&self) -> Decimal {
        self.base_price * self.quantity
    }
}

/// Split computed for one line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineSettlement {
    pub line_id: Uuid,
    pub farmer_id: Uuid,
    pub vendor_id: Uuid,
    pub split: CommissionSplit,
}

/// Amount to post to one wallet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletCredit {
    pub owner: WalletOwner,
    pub amount: Decimal,
}

/// Everything one settlement will post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementPlan {
    pub rate_percent: Decimal,
    pub lines: Vec<LineSettlement>,
    /// One entry per wallet, sorted by owner, zero amounts omitted
    pub credits: Vec<WalletCredit>,
}

impl SettlementPlan {
    /// Split every line and aggregate the credits per wallet.
    ///
    /// Fails with `NoCommissionConfigured` when `rate` is missing and with the
    /// first line's error otherwise; nothing is partially planned.
    pub fn build(lines: &[SettlementLine], rate: Option<&CommissionRate>) -> DomainResult<Self> {
        let rate = CommissionRate::require(rate)?;

        let mut settled = Vec::with_capacity(lines.len());
        let mut totals: BTreeMap<WalletOwner, Decimal> = BTreeMap::new();

        for line in lines {
            let split = split(line.line_total(), line.farmer_base_amount(), rate.rate_percent)?;

            *totals.entry(WalletOwner::Farmer(line.farmer_id)).or_default() += split.farmer_share;
            *totals.entry(WalletOwner::Vendor(line.vendor_id)).or_default() += split.vendor_share;
            *totals.entry(WalletOwner::Admin).or_default() += split.admin_commission;

            settled.push(LineSettlement {
                line_id: line.line_id,
                farmer_id: line.farmer_id,
                vendor_id: line.vendor_id,
                split,
            });
        }

        let credits = totals
            .into_iter()
            .filter(|(_, amount)| *amount > Decimal::ZERO)
            .map(|(owner, amount)| WalletCredit { owner, amount })
            .collect();

        Ok(Self {
            rate_percent: rate.rate_percent,
            lines: settled,
            credits,
        })
    }

    /// Sum of all line totals
    pub fn order_total(&self) -> Decimal {
        self.lines.iter().map(|l| l.split.line_total).sum()
    }

    /// Sum of all wallet credits; equals `order_total`
    pub fn credited_total(&self) -> Decimal {
        self.credits.iter().map(|c| c.amount).sum()
    }
}

/// What a settlement attempt did
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SettlementOutcome {
    /// Wallets credited and the order marked settled
    Settled {
        settled_at: DateTime<Utc>,
        plan: SettlementPlan,
    },
    /// The order was settled earlier; nothing posted
    AlreadySettled { settled_at: DateTime<Utc> },
    /// No commission rate configured; the order stays unsettled for a retry
    Deferred,
    /// The order is not delivered and paid yet
    NotDue,
}

impl SettlementOutcome {
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SettlementOutcome::Settled { .. } | SettlementOutcome::AlreadySettled { .. }
        )
    }
}
