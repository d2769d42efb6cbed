//! Settlement engine
//!
//! Splits the revenue of a delivered, paid order between the farmers, vendors
//! and the platform exactly once. Credits, per-line audit entries and the
//! settled marker are written in one transaction under the order row lock;
//! any failure leaves the order unsettled for a later retry.

use chrono::{DateTime, Utc};
use shared::{
    describe_line_settlement, AuditAction, DomainError, Order, SettlementLine, SettlementOutcome,
    SettlementPlan, SettlementState, WalletOwner,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{set_lock_timeout, AuditService, CommissionService, WalletService};

#[derive(Clone)]
pub struct SettlementEngine {
    db: PgPool,
    lock_timeout_ms: u64,
}

impl SettlementEngine {
    pub fn new(db: PgPool, lock_timeout_ms: u64) -> Self {
        Self { db, lock_timeout_ms }
    }

    /// Settle `order_id` if it is delivered, paid and not settled yet
    pub async fn on_order_delivered(&self, order_id: Uuid) -> AppResult<SettlementOutcome> {
        let mut tx = self.db.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        let rate = CommissionService::load(&mut tx).await?;
        if rate.is_none() {
            tracing::warn!(%order_id, "No commission rate configured, settlement deferred");
            return Ok(SettlementOutcome::Deferred);
        }

        let order = Self::lock_order(&mut tx, order_id).await?;

        if let SettlementState::Settled { settled_at } = order.settlement() {
            tracing::debug!(%order_id, "Order already settled");
            return Ok(SettlementOutcome::AlreadySettled { settled_at });
        }
        if !order.is_settlement_due() {
            return Ok(SettlementOutcome::NotDue);
        }

        let lines = Self::load_lines(&mut tx, order_id).await?;
        let plan = match SettlementPlan::build(&lines, rate.as_ref()) {
            Ok(plan) => plan,
            Err(DomainError::NoCommissionConfigured) => {
                tracing::warn!(%order_id, "No commission rate configured, settlement deferred");
                return Ok(SettlementOutcome::Deferred);
            }
            Err(e) => {
                tracing::error!(%order_id, error = %e, "Settlement plan rejected");
                return Err(e.into());
            }
        };

        Self::post_credits(&mut tx, &plan).await?;

        for line in &plan.lines {
            AuditService::record(
                &mut tx,
                order.customer_id,
                AuditAction::WalletTransaction,
                &describe_line_settlement(&order.order_number, line),
            )
            .await?;
        }

        let settled_at = Self::mark_settled(&mut tx, order_id).await?;

        tx.commit().await?;

        tracing::info!(
            %order_id,
            order_number = %order.order_number,
            lines = plan.lines.len(),
            total = %plan.order_total(),
            "Order settled"
        );

        Ok(SettlementOutcome::Settled { settled_at, plan })
    }

    /// Credit every wallet of the plan in owner order
    async fn post_credits(conn: &mut PgConnection, plan: &SettlementPlan) -> AppResult<()> {
        for credit in &plan.credits {
            if credit.owner == WalletOwner::Admin {
                WalletService::ensure_wallet(conn, WalletOwner::Admin).await?;
            }
            WalletService::credit(conn, credit.owner, credit.amount).await?;
        }
        Ok(())
    }

    async fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Order> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_number, customer_id, status, payment_status, settlement_status,
                   settled_at, created_at, updated_at, delivered_at
            FROM orders
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }

    async fn load_lines(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<SettlementLine>> {
        let lines = sqlx::query_as::<_, SettlementLine>(
            r#"
            SELECT ol.id AS line_id, ol.reservation_id, sl.farmer_id, r.vendor_id,
                   ol.quantity, ol.unit_price, sl.base_price
            FROM order_lines ol
            JOIN reservations r ON r.id = ol.reservation_id
            JOIN stock_lots sl ON sl.id = r.stock_lot_id
            WHERE ol.order_id = $1
            ORDER BY ol.id
            "#,
        )
        .bind(order_id)
        .fetch_all(conn)
        .await?;
        Ok(lines)
    }

    async fn mark_settled(conn: &mut PgConnection, order_id: Uuid) -> AppResult<DateTime<Utc>> {
        sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            UPDATE orders
            SET settlement_status = 'settled', settled_at = NOW()
            WHERE id = $1 AND settlement_status = 'unsettled'
            RETURNING settled_at
            "#,
        )
        .bind(order_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Order {} was settled concurrently", order_id)))
    }
}
