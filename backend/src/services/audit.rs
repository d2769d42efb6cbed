//! Append-only audit trail
//!
//! Entries are written either inside the caller's transaction (`record`), so
//! they commit or roll back with the change they describe, or after a commit
//! as a best-effort follow-up (`record_detached`).

use shared::{AuditAction, AuditEntry};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

/// Hard cap on a single audit page
pub const MAX_PAGE_SIZE: i64 = 500;

#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

impl AuditService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append an entry on the caller's connection
    pub async fn record(
        conn: &mut PgConnection,
        actor_id: Option<Uuid>,
        action: AuditAction,
        description: &str,
    ) -> AppResult<AuditEntry> {
        let entry = sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO audit_log (actor_id, action, description)
            VALUES ($1, $2, $3)
            RETURNING id, actor_id, action, description, created_at
            "#,
        )
        .bind(actor_id)
        .bind(action)
        .bind(description)
        .fetch_one(conn)
        .await?;

        Ok(entry)
    }

    /// Append an entry outside any transaction, logging instead of failing
    pub async fn record_detached(&self, actor_id: Option<Uuid>, action: AuditAction, description: &str) {
        let result = match self.db.acquire().await {
            Ok(mut conn) => Self::record(&mut *conn, actor_id, action, description).await,
            Err(e) => Err(e.into()),
        };

        if let Err(e) = result {
            tracing::warn!(
                action = action.as_str(),
                error = %e,
                "Failed to write audit entry"
            );
        }
    }

    /// Entries in creation order, starting after `after_id`
    pub async fn list(&self, limit: i64, after_id: Option<i64>) -> AppResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, actor_id, action, description, created_at
            FROM audit_log
            WHERE id > $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(after_id.unwrap_or(0))
        .bind(limit.clamp(1, MAX_PAGE_SIZE))
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    /// Entries written by one actor, in creation order
    pub async fn list_for_actor(&self, actor_id: Uuid, limit: i64) -> AppResult<Vec<AuditEntry>> {
        let entries = sqlx::query_as::<_, AuditEntry>(
            r#"
            SELECT id, actor_id, action, description, created_at
            FROM audit_log
            WHERE actor_id = $1
            ORDER BY id ASC
            LIMIT $2
            "#,
        )
        .bind(actor_id)
        .bind(limit.clamp(1, MAX_PAGE_SIZE))
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }
}
