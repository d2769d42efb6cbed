//! Farmer stock lots and vendor reservations

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::validation::{ensure_money_scale, ensure_positive};

/// Delivery status shared by stock lots and reservations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "stock_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Pending,
    Selected,
    InTransit,
    Delivered,
    Cancelled,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Pending => "pending",
            StockStatus::Selected => "selected",
            StockStatus::InTransit => "in_transit",
            StockStatus::Delivered => "delivered",
            StockStatus::Cancelled => "cancelled",
        }
    }

    /// Delivery progression of a reservation: selected -> in_transit -> delivered
    pub fn can_advance_to(&self, next: StockStatus) -> bool {
        matches!(
            (self, next),
            (StockStatus::Selected, StockStatus::InTransit)
                | (StockStatus::InTransit, StockStatus::Delivered)
        )
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A farmer-listed batch of produce
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct StockLot {
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub name: String,
    pub total_quantity: Decimal,
    /// Always within `0..=total_quantity`
    pub available_quantity: Decimal,
    /// Farmer's price per unit
    pub base_price: Decimal,
    pub status: StockStatus,
    pub expiry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockLot {
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry_date < today
    }

    /// Whether vendors can still browse and select this lot
    pub fn is_available(&self, today: NaiveDate) -> bool {
        self.status == StockStatus::Pending
            && self.available_quantity > Decimal::ZERO
            && !self.is_expired(today)
    }

    /// Take `quantity` out of the lot for a vendor.
    ///
    /// Either the whole quantity is taken or nothing changes. The lot moves
    /// to `selected` once nothing is left.
    pub fn reserve(
        &mut self,
        quantity: Decimal,
        resale_price: Decimal,
        today: NaiveDate,
    ) -> DomainResult<()> {
        ensure_positive(quantity, "quantity")?;
        ensure_positive(resale_price, "resale_price")?;
        ensure_money_scale(quantity, "quantity")?;
        ensure_money_scale(resale_price, "resale_price")?;

        if self.status == StockStatus::Cancelled {
            return Err(DomainError::StockUnavailable(format!(
                "lot {} is cancelled",
                self.id
            )));
        }
        if self.is_expired(today) {
            return Err(DomainError::StockUnavailable(format!(
                "lot {} expired on {}",
                self.id, self.expiry_date
            )));
        }
        if quantity > self.available_quantity {
            return Err(DomainError::InsufficientStock {
                requested: quantity,
                available: self.available_quantity,
            });
        }
        if resale_price < self.base_price {
            return Err(DomainError::ResaleBelowCost {
                resale_price,
                base_price: self.base_price,
            });
        }

        self.available_quantity -= quantity;
        if self.available_quantity <= Decimal::ZERO {
            self.status = StockStatus::Selected;
        }
        Ok(())
    }
}

/// A vendor's claim on part of a stock lot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Reservation {
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub stock_lot_id: Uuid,
    /// Fixed at creation
    pub reserved_quantity: Decimal,
    pub resale_price: Decimal,
    /// Reduced only by customer sales
    pub available_quantity: Decimal,
    pub status: StockStatus,
    pub is_visible_to_customers: bool,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
}

impl Reservation {
    pub fn new(
        vendor_id: Uuid,
        stock_lot_id: Uuid,
        quantity: Decimal,
        resale_price: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            vendor_id,
            stock_lot_id,
            reserved_quantity: quantity,
            resale_price,
            available_quantity: quantity,
            status: StockStatus::Selected,
            is_visible_to_customers: false,
            created_at: now,
            delivered_at: None,
        }
    }

    /// Move the reservation along its delivery progression
    pub fn advance_delivery(&mut self, next: StockStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.status.can_advance_to(next) {
            return Err(DomainError::InvalidTransition {
                entity: "reservation",
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        if next == StockStatus::Delivered && self.delivered_at.is_none() {
            self.delivered_at = Some(now);
        }
        self.is_visible_to_customers = self.should_be_visible();
        Ok(())
    }

    /// Customers see a reservation only once it is delivered and has stock left
    pub fn should_be_visible(&self) -> bool {
        self.status == StockStatus::Delivered && self.available_quantity > Decimal::ZERO
    }

    /// Vendor margin per unit over the farmer's base price
    pub fn unit_margin(&self, base_price: Decimal) -> Decimal {
        self.resale_price - base_price
    }
}
