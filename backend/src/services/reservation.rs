//! Inventory reservation service
//!
//! Vendors claim part of a farmer's stock lot. The lot row is locked for the
//! check-and-decrement so concurrent selections of the same lot serialize and
//! the lot can never be oversold.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{AuditAction, NotificationType, Reservation, StockLot, StockStatus, WalletOwner};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{set_lock_timeout, validate_amount, AuditService, NotificationService};

/// Input for selecting stock from a lot
#[derive(Debug, Deserialize, Validate)]
pub struct ReserveInput {
    #[validate(custom = "validate_amount")]
    pub quantity: Decimal,
    #[validate(custom = "validate_amount")]
    pub resale_price: Decimal,
}

/// Input for moving a reservation along its delivery progression
#[derive(Debug, Deserialize)]
pub struct UpdateDeliveryInput {
    pub status: StockStatus,
}

#[derive(Debug, FromRow)]
struct VendorProfile {
    user_id: Uuid,
    shop_name: String,
    is_active: bool,
}

#[derive(Clone)]
pub struct ReservationService {
    db: PgPool,
    lock_timeout_ms: u64,
}

impl ReservationService {
    pub fn new(db: PgPool, lock_timeout_ms: u64) -> Self {
        Self { db, lock_timeout_ms }
    }

    /// Reserve `quantity` of a stock lot for a vendor at `resale_price`
    pub async fn reserve(
        &self,
        vendor_id: Uuid,
        stock_lot_id: Uuid,
        input: ReserveInput,
    ) -> AppResult<Reservation> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        let vendor = sqlx::query_as::<_, VendorProfile>(
            "SELECT user_id, shop_name, is_active FROM vendors WHERE id = $1",
        )
        .bind(vendor_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Vendor".to_string()))?;

        if !vendor.is_active {
            return Err(AppError::Forbidden("Vendor account is inactive".to_string()));
        }

        let mut lot = Self::lock_lot(&mut tx, stock_lot_id).await?;
        let now = Utc::now();
        lot.reserve(input.quantity, input.resale_price, now.date_naive())?;

        sqlx::query(
            r#"
            UPDATE stock_lots
            SET available_quantity = $2, status = $3, updated_at = $4
            WHERE id = $1
            "#,
        )
        .bind(lot.id)
        .bind(lot.available_quantity)
        .bind(lot.status)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let reservation =
            Reservation::new(vendor_id, lot.id, input.quantity, input.resale_price, now);

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id, vendor_id, stock_lot_id, reserved_quantity, resale_price,
                available_quantity, status, is_visible_to_customers, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.vendor_id)
        .bind(reservation.stock_lot_id)
        .bind(reservation.reserved_quantity)
        .bind(reservation.resale_price)
        .bind(reservation.available_quantity)
        .bind(reservation.status)
        .bind(reservation.is_visible_to_customers)
        .bind(reservation.created_at)
        .execute(&mut *tx)
        .await?;

        let farm_name: String = sqlx::query_scalar("SELECT farm_name FROM farmers WHERE id = $1")
            .bind(lot.farmer_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            reservation_id = %reservation.id,
            stock_lot_id = %lot.id,
            quantity = %input.quantity,
            remaining = %lot.available_quantity,
            "Stock reserved"
        );

        NotificationService::new(self.db.clone())
            .notify_owner(
                WalletOwner::Farmer(lot.farmer_id),
                NotificationType::Selection,
                "Product Selected by Vendor",
                &format!(
                    "{} selected {} kg of your {}",
                    vendor.shop_name, input.quantity, lot.name
                ),
            )
            .await;

        AuditService::new(self.db.clone())
            .record_detached(
                Some(vendor.user_id),
                AuditAction::VendorSelected,
                &format!(
                    "Vendor {} selected {}kg of {} from {}",
                    vendor.shop_name, input.quantity, lot.name, farm_name
                ),
            )
            .await;

        Ok(reservation)
    }

    /// Advance delivery of a reservation (`selected -> in_transit -> delivered`)
    pub async fn update_delivery_status(
        &self,
        admin_user_id: Uuid,
        reservation_id: Uuid,
        status: StockStatus,
    ) -> AppResult<Reservation> {
        let mut tx = self.db.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        let mut reservation = sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, vendor_id, stock_lot_id, reserved_quantity, resale_price,
                   available_quantity, status, is_visible_to_customers, created_at, delivered_at
            FROM reservations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation".to_string()))?;

        reservation.advance_delivery(status, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2, delivered_at = $3, is_visible_to_customers = $4
            WHERE id = $1
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.status)
        .bind(reservation.delivered_at)
        .bind(reservation.is_visible_to_customers)
        .execute(&mut *tx)
        .await?;

        AuditService::record(
            &mut tx,
            Some(admin_user_id),
            AuditAction::DeliveryUpdated,
            &format!("Reservation {} delivery status set to {}", reservation.id, status),
        )
        .await?;

        tx.commit().await?;

        NotificationService::new(self.db.clone())
            .notify_owner(
                WalletOwner::Vendor(reservation.vendor_id),
                NotificationType::Delivery,
                "Delivery Status Updated",
                &format!(
                    "Your selection of {} kg is now {}",
                    reservation.reserved_quantity, status
                ),
            )
            .await;

        Ok(reservation)
    }

    pub async fn get_reservation(&self, reservation_id: Uuid) -> AppResult<Reservation> {
        sqlx::query_as::<_, Reservation>(
            r#"
            SELECT id, vendor_id, stock_lot_id, reserved_quantity, resale_price,
                   available_quantity, status, is_visible_to_customers, created_at, delivered_at
            FROM reservations
            WHERE id = $1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Reservation".to_string()))
    }

    /// Current state of a stock lot
    pub async fn get_stock_lot(&self, stock_lot_id: Uuid) -> AppResult<StockLot> {
        sqlx::query_as::<_, StockLot>(
            r#"
            SELECT id, farmer_id, name, total_quantity, available_quantity, base_price,
                   status, expiry_date, created_at, updated_at
            FROM stock_lots
            WHERE id = $1
            "#,
        )
        .bind(stock_lot_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))
    }

    async fn lock_lot(conn: &mut PgConnection, stock_lot_id: Uuid) -> AppResult<StockLot> {
        sqlx::query_as::<_, StockLot>(
            r#"
            SELECT id, farmer_id, name, total_quantity, available_quantity, base_price,
                   status, expiry_date, created_at, updated_at
            FROM stock_lots
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(stock_lot_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock lot".to_string()))
    }
}
