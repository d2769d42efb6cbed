//! Customer orders and their settlement marker

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::types::line_total;

/// Fulfilment status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "order_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Re-applying the current status is accepted so duplicate events are harmless
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }
        match (self, next) {
            (OrderStatus::Pending, OrderStatus::Processing)
            | (OrderStatus::Processing, OrderStatus::Shipped)
            | (OrderStatus::Shipped, OrderStatus::Delivered) => true,
            (current, OrderStatus::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }

    /// Message sent to the customer when the order enters this status
    pub fn customer_message(&self) -> Option<&'static str> {
        match self {
            OrderStatus::Pending => None,
            OrderStatus::Processing => Some("Your order is being processed"),
            OrderStatus::Shipped => Some("Your order has been shipped"),
            OrderStatus::Delivered => Some("Your order has been delivered"),
            OrderStatus::Cancelled => Some("Your order has been cancelled"),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status (cash on delivery)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "payment_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "unpaid",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        *self == next
            || matches!(
                (self, next),
                (PaymentStatus::Unpaid, PaymentStatus::Paid)
                    | (PaymentStatus::Unpaid, PaymentStatus::Failed)
                    | (PaymentStatus::Failed, PaymentStatus::Paid)
            )
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted settlement marker column
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "settlement_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Unsettled,
    Settled,
}

/// Settlement state of an order as seen by the domain
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SettlementState {
    Unsettled,
    Settled { settled_at: DateTime<Utc> },
}

/// A customer order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Option<Uuid>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub settlement_status: SettlementStatus,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn settlement(&self) -> SettlementState {
        match (self.settlement_status, self.settled_at) {
            (SettlementStatus::Settled, Some(settled_at)) => SettlementState::Settled { settled_at },
            // Rows written before settled_at existed
            (SettlementStatus::Settled, None) => SettlementState::Settled {
                settled_at: self.updated_at,
            },
            (SettlementStatus::Unsettled, _) => SettlementState::Unsettled,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.settlement_status == SettlementStatus::Settled
    }

    /// Revenue of the order is ready to be split
    pub fn is_settlement_due(&self) -> bool {
        self.status == OrderStatus::Delivered && self.payment_status == PaymentStatus::Paid
    }

    /// Apply a status and/or payment change. Returns whether anything changed.
    pub fn apply_transition(
        &mut self,
        status: Option<OrderStatus>,
        payment_status: Option<PaymentStatus>,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let next_status = status.unwrap_or(self.status);
        let next_payment = payment_status.unwrap_or(self.payment_status);

        if !self.status.can_transition_to(next_status) {
            return Err(DomainError::InvalidTransition {
                entity: "order",
                from: self.status.to_string(),
                to: next_status.to_string(),
            });
        }
        if !self.payment_status.can_transition_to(next_payment) {
            return Err(DomainError::InvalidTransition {
                entity: "payment",
                from: self.payment_status.to_string(),
                to: next_payment.to_string(),
            });
        }

        let changed = next_status != self.status || next_payment != self.payment_status;
        self.status = next_status;
        self.payment_status = next_payment;
        if next_status == OrderStatus::Delivered && self.delivered_at.is_none() {
            self.delivered_at = Some(now);
        }
        if changed {
            self.updated_at = now;
        }
        Ok(changed)
    }
}

/// One purchased reservation within an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub reservation_id: Uuid,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

impl OrderLine {
    pub fn total(&self) -> Decimal {
        line_total(self.unit_price, self.quantity)
    }
}
