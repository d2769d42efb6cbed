//! Order lifecycle
//!
//! Status changes are committed first; the customer notification and the
//! settlement of a delivered, paid order follow as explicit steps.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::{
    AuditAction, NotificationType, Order, OrderLine, OrderStatus, PaymentStatus, SettlementOutcome,
};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{set_lock_timeout, AuditService, NotificationService, SettlementEngine};

/// Input for updating an order's status
#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusInput {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
}

/// An order with its lines
#[derive(Debug, Serialize)]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

/// Result of a status update
#[derive(Debug, Serialize)]
pub struct OrderStatusResponse {
    pub order: Order,
    pub settlement: Option<SettlementOutcome>,
}

#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    lock_timeout_ms: u64,
}

impl OrderService {
    pub fn new(db: PgPool, lock_timeout_ms: u64) -> Self {
        Self { db, lock_timeout_ms }
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderWithLines> {
        let mut conn = self.db.acquire().await?;
        let order = Self::fetch_order(&mut conn, order_id, false).await?;

        let lines = sqlx::query_as::<_, OrderLine>(
            r#"
            SELECT id, order_id, reservation_id, quantity, unit_price
            FROM order_lines
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(OrderWithLines { order, lines })
    }

    /// Apply a status and/or payment change, then settle when it became due
    pub async fn update_status(
        &self,
        admin_user_id: Uuid,
        order_id: Uuid,
        input: UpdateOrderStatusInput,
    ) -> AppResult<OrderStatusResponse> {
        if input.status.is_none() && input.payment_status.is_none() {
            return Err(AppError::ValidationError(
                "Either status or payment_status is required".to_string(),
            ));
        }

        let mut tx = self.db.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        let mut order = Self::fetch_order(&mut tx, order_id, true).await?;
        let previous_status = order.status;
        let changed = order.apply_transition(input.status, input.payment_status, Utc::now())?;

        if changed {
            sqlx::query(
                r#"
                UPDATE orders
                SET status = $2, payment_status = $3, delivered_at = $4, updated_at = $5
                WHERE id = $1
                "#,
            )
            .bind(order.id)
            .bind(order.status)
            .bind(order.payment_status)
            .bind(order.delivered_at)
            .bind(order.updated_at)
            .execute(&mut *tx)
            .await?;

            AuditService::record(
                &mut tx,
                Some(admin_user_id),
                AuditAction::OrderStatusChanged,
                &format!(
                    "Order {} is now {} (payment {})",
                    order.order_number, order.status, order.payment_status
                ),
            )
            .await?;
        }

        tx.commit().await?;

        if changed && order.status != previous_status {
            self.notify_customer(&order).await;
        }

        let settlement = if order.is_settlement_due() && !order.is_settled() {
            let outcome = SettlementEngine::new(self.db.clone(), self.lock_timeout_ms)
                .on_order_delivered(order_id)
                .await?;
            let mut conn = self.db.acquire().await?;
            order = Self::fetch_order(&mut conn, order_id, false).await?;
            Some(outcome)
        } else {
            None
        };

        Ok(OrderStatusResponse { order, settlement })
    }

    /// Retry settlement of an order, e.g. after a commission rate was configured
    pub async fn settle(&self, order_id: Uuid) -> AppResult<SettlementOutcome> {
        SettlementEngine::new(self.db.clone(), self.lock_timeout_ms)
            .on_order_delivered(order_id)
            .await
    }

    async fn notify_customer(&self, order: &Order) {
        let (Some(customer_id), Some(message)) = (order.customer_id, order.status.customer_message())
        else {
            return;
        };

        NotificationService::new(self.db.clone())
            .notify(
                customer_id,
                NotificationType::Order,
                &format!("Order {} Update", order.order_number),
                message,
            )
            .await;
    }

    async fn fetch_order(conn: &mut PgConnection, order_id: Uuid, for_update: bool) -> AppResult<Order> {
        let query = if for_update {
            r#"
            SELECT id, order_number, customer_id, status, payment_status, settlement_status,
                   settled_at, created_at, updated_at, delivered_at
            FROM orders WHERE id = $1 FOR UPDATE
            "#
        } else {
            r#"
            SELECT id, order_number, customer_id, status, payment_status, settlement_status,
                   settled_at, created_at, updated_at, delivered_at
            FROM orders WHERE id = $1
            "#
        };

        sqlx::query_as::<_, Order>(query)
            .bind(order_id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }
}
