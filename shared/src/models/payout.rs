//! Farmer and vendor payout requests

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::wallet::{OwnerKind, WalletOwner};
use crate::error::{DomainError, DomainResult};

/// Lifecycle of a payout request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "payout_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Approved,
    Rejected,
    Paid,
}

impl PayoutStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "pending",
            PayoutStatus::Approved => "approved",
            PayoutStatus::Rejected => "rejected",
            PayoutStatus::Paid => "paid",
        }
    }

    /// Title-case label used in notifications
    pub fn label(&self) -> &'static str {
        match self {
            PayoutStatus::Pending => "Pending",
            PayoutStatus::Approved => "Approved",
            PayoutStatus::Rejected => "Rejected",
            PayoutStatus::Paid => "Paid",
        }
    }

    /// pending -> approved | rejected, approved -> paid
    pub fn can_transition_to(&self, next: PayoutStatus) -> bool {
        matches!(
            (self, next),
            (PayoutStatus::Pending, PayoutStatus::Approved)
                | (PayoutStatus::Pending, PayoutStatus::Rejected)
                | (PayoutStatus::Approved, PayoutStatus::Paid)
        )
    }
}

impl std::fmt::Display for PayoutStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request by a farmer or vendor to withdraw wallet funds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct PayoutRequest {
    pub id: Uuid,
    pub owner_kind: OwnerKind,
    pub owner_id: Uuid,
    pub requested_amount: Decimal,
    pub status: PayoutStatus,
    pub admin_response: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl PayoutRequest {
    pub fn owner(&self) -> WalletOwner {
        WalletOwner::from_parts(self.owner_kind, self.owner_id)
    }

    pub fn transition(&mut self, next: PayoutStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                entity: "payout",
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        self.updated_at = now;
        if next == PayoutStatus::Paid {
            self.paid_at = Some(now);
        }
        Ok(())
    }
}
