//! In-app notifications
//!
//! Notifications are a side channel: callers send them after their own
//! transaction has committed and a failure here never undoes that work.

use shared::{Notification, NotificationType, WalletOwner};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// The user account behind a farmer or vendor profile
#[derive(Debug, Clone, FromRow)]
pub struct Recipient {
    pub user_id: Uuid,
    pub display_name: String,
}

#[derive(Clone)]
pub struct NotificationService {
    db: PgPool,
}

impl NotificationService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Insert one notification
    pub async fn create(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) -> AppResult<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, message)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, notification_type, title, message, is_read, created_at
            "#,
        )
        .bind(user_id)
        .bind(notification_type)
        .bind(title)
        .bind(message)
        .fetch_one(&self.db)
        .await?;

        Ok(notification)
    }

    /// Best-effort variant of [`create`](Self::create)
    pub async fn notify(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) {
        if let Err(e) = self.create(user_id, notification_type, title, message).await {
            tracing::warn!(%user_id, title, error = %e, "Failed to send notification");
        }
    }

    /// Notify every admin user; best-effort
    pub async fn notify_admins(&self, notification_type: NotificationType, title: &str, message: &str) {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, message)
            SELECT id, $1, $2, $3 FROM users WHERE role = 'admin'
            "#,
        )
        .bind(notification_type)
        .bind(title)
        .bind(message)
        .execute(&self.db)
        .await;

        match result {
            Ok(done) => tracing::debug!(recipients = done.rows_affected(), title, "Notified admins"),
            Err(e) => tracing::warn!(title, error = %e, "Failed to notify admins"),
        }
    }

    /// Notify the user behind a wallet owner; best-effort, admin wallet is skipped
    pub async fn notify_owner(
        &self,
        owner: WalletOwner,
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) {
        match self.recipient_for(owner).await {
            Ok(Some(recipient)) => {
                self.notify(recipient.user_id, notification_type, title, message)
                    .await
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(%owner, error = %e, "Failed to resolve notification recipient"),
        }
    }

    /// User account for a farmer or vendor profile
    pub async fn recipient_for(&self, owner: WalletOwner) -> AppResult<Option<Recipient>> {
        let query = match owner {
            WalletOwner::Farmer(_) => {
                r#"
                SELECT u.id AS user_id, u.display_name
                FROM farmers f JOIN users u ON u.id = f.user_id
                WHERE f.id = $1
                "#
            }
            WalletOwner::Vendor(_) => {
                r#"
                SELECT u.id AS user_id, u.display_name
                FROM vendors v JOIN users u ON u.id = v.user_id
                WHERE v.id = $1
                "#
            }
            WalletOwner::Admin => return Ok(None),
        };

        let recipient = sqlx::query_as::<_, Recipient>(query)
            .bind(owner.owner_id())
            .fetch_optional(&self.db)
            .await?;

        Ok(recipient)
    }

    /// Newest first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
    ) -> AppResult<Vec<Notification>> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, notification_type, title, message, is_read, created_at
            FROM notifications
            WHERE user_id = $1 AND ($2 = FALSE OR is_read = FALSE)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit.clamp(1, 200))
        .fetch_all(&self.db)
        .await?;

        Ok(notifications)
    }

    pub async fn mark_read(&self, user_id: Uuid, notification_id: Uuid) -> AppResult<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET is_read = TRUE
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, notification_type, title, message, is_read, created_at
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification".to_string()))
    }
}
