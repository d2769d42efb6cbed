//! Platform commission configuration
//!
//! A single row holds the authoritative rate; replacing it is an upsert.

use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{round_money, validate_rate, AuditAction, CommissionRate};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::AuditService;

/// Input for replacing the commission rate
#[derive(Debug, Deserialize)]
pub struct ReplaceCommissionInput {
    pub rate_percent: Decimal,
}

#[derive(Clone)]
pub struct CommissionService {
    db: PgPool,
}

impl CommissionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// The configured rate, if any
    pub async fn current(&self) -> AppResult<Option<CommissionRate>> {
        let mut conn = self.db.acquire().await?;
        Self::load(&mut conn).await
    }

    /// Read the rate on a caller-supplied connection
    pub async fn load(conn: &mut PgConnection) -> AppResult<Option<CommissionRate>> {
        let rate = sqlx::query_as::<_, CommissionRate>(
            "SELECT rate_percent, updated_at, updated_by FROM commission_config WHERE singleton",
        )
        .fetch_optional(conn)
        .await?;
        Ok(rate)
    }

    /// Replace the rate and audit the change
    pub async fn replace(&self, admin_user_id: Uuid, rate_percent: Decimal) -> AppResult<CommissionRate> {
        validate_rate(rate_percent)?;
        let rate_percent = round_money(rate_percent);

        let mut tx = self.db.begin().await?;

        let previous = Self::load(&mut tx).await?;

        let rate = sqlx::query_as::<_, CommissionRate>(
            r#"
            INSERT INTO commission_config (singleton, rate_percent, updated_at, updated_by)
            VALUES (TRUE, $1, NOW(), $2)
            ON CONFLICT (singleton) DO UPDATE
            SET rate_percent = EXCLUDED.rate_percent,
                updated_at = EXCLUDED.updated_at,
                updated_by = EXCLUDED.updated_by
            RETURNING rate_percent, updated_at, updated_by
            "#,
        )
        .bind(rate_percent)
        .bind(admin_user_id)
        .fetch_one(&mut *tx)
        .await?;

        let description = match previous {
            Some(prev) => format!(
                "Commission rate changed from {}% to {}%",
                prev.rate_percent, rate.rate_percent
            ),
            None => format!("Commission rate set to {}%", rate.rate_percent),
        };
        AuditService::record(&mut tx, Some(admin_user_id), AuditAction::CommissionUpdated, &description)
            .await?;

        tx.commit().await?;

        tracing::info!(rate_percent = %rate.rate_percent, "Commission rate replaced");
        Ok(rate)
    }
}
