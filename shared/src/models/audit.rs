//! Append-only audit trail entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::settlement::LineSettlement;

/// What an audit entry records
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "audit_action", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    VendorSelected,
    DeliveryUpdated,
    PayoutRequested,
    PayoutApproved,
    PayoutRejected,
    PayoutPaid,
    WalletTransaction,
    CommissionUpdated,
    OrderStatusChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::VendorSelected => "vendor_selected",
            AuditAction::DeliveryUpdated => "delivery_updated",
            AuditAction::PayoutRequested => "payout_requested",
            AuditAction::PayoutApproved => "payout_approved",
            AuditAction::PayoutRejected => "payout_rejected",
            AuditAction::PayoutPaid => "payout_paid",
            AuditAction::WalletTransaction => "wallet_transaction",
            AuditAction::CommissionUpdated => "commission_updated",
            AuditAction::OrderStatusChanged => "order_status_changed",
        }
    }
}

/// A recorded event. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct AuditEntry {
    /// Monotonic; gives the creation order
    pub id: i64,
    pub actor_id: Option<Uuid>,
    pub action: AuditAction,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Description of one settled line
pub fn describe_line_settlement(order_number: &str, line: &LineSettlement) -> String {
    let split = &line.split;
    format!(
        "Order {} payment split: Farmer Rs.{:.2}, Vendor Rs.{:.2}, \
         Farmer Commission Rs.{:.2}, Vendor Commission Rs.{:.2}, Platform Rs.{:.2}",
        order_number,
        split.farmer_share,
        split.vendor_share,
        split.farmer_commission,
        split.vendor_commission,
        split.admin_commission,
    )
}
