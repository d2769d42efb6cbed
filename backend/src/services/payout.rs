//! Payout requests
//!
//! Farmers and vendors ask to withdraw wallet funds; an admin approves
//! (debiting the wallet), rejects, or marks an approved request paid.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{AuditAction, NotificationType, PayoutRequest, PayoutStatus, WalletOwner};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::{
    set_lock_timeout, validate_amount, AuditService, NotificationService, WalletService,
};

/// Input for requesting a payout
#[derive(Debug, Deserialize, Validate)]
pub struct RequestPayoutInput {
    #[validate(custom = "validate_amount")]
    pub amount: Decimal,
}

/// Input for rejecting a payout
#[derive(Debug, Deserialize, Validate)]
pub struct RejectPayoutInput {
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Clone)]
pub struct PayoutService {
    db: PgPool,
    lock_timeout_ms: u64,
}

impl PayoutService {
    pub fn new(db: PgPool, lock_timeout_ms: u64) -> Self {
        Self { db, lock_timeout_ms }
    }

    /// File a pending payout request for a farmer or vendor wallet
    pub async fn request_payout(
        &self,
        requester_user_id: Uuid,
        owner: WalletOwner,
        input: RequestPayoutInput,
    ) -> AppResult<PayoutRequest> {
        input.validate()?;
        if owner == WalletOwner::Admin {
            return Err(AppError::Forbidden(
                "The platform wallet cannot request payouts".to_string(),
            ));
        }

        let payout = sqlx::query_as::<_, PayoutRequest>(
            r#"
            INSERT INTO payout_requests (owner_kind, owner_id, requested_amount)
            VALUES ($1, $2, $3)
            RETURNING id, owner_kind, owner_id, requested_amount, status, admin_response,
                      created_at, updated_at, paid_at
            "#,
        )
        .bind(owner.kind())
        .bind(owner.owner_id())
        .bind(input.amount)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(payout_id = %payout.id, %owner, amount = %payout.requested_amount, "Payout requested");

        let owner_name = self.owner_name(owner).await;
        let title = match owner {
            WalletOwner::Vendor(_) => "New Vendor Payout Request",
            _ => "New Payout Request",
        };
        let message = format!(
            "{} requested payout of Rs.{}",
            owner_name, payout.requested_amount
        );

        NotificationService::new(self.db.clone())
            .notify_admins(NotificationType::Payout, title, &message)
            .await;
        AuditService::new(self.db.clone())
            .record_detached(Some(requester_user_id), AuditAction::PayoutRequested, &message)
            .await;

        Ok(payout)
    }

    /// Approve a pending request and debit the wallet in the same transaction
    pub async fn approve(&self, admin_user_id: Uuid, payout_id: Uuid) -> AppResult<PayoutRequest> {
        let mut tx = self.db.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        let mut payout = Self::lock_payout(&mut tx, payout_id).await?;
        payout.transition(PayoutStatus::Approved, Utc::now())?;

        let wallet = WalletService::debit(&mut tx, payout.owner(), payout.requested_amount).await?;
        Self::store(&mut tx, &payout).await?;

        AuditService::record(
            &mut tx,
            Some(admin_user_id),
            AuditAction::PayoutApproved,
            &format!(
                "Payout {} of Rs.{} approved for {}, balance now Rs.{}",
                payout.id, payout.requested_amount, payout.owner(), wallet.balance
            ),
        )
        .await?;

        tx.commit().await?;

        self.notify_status(&payout).await;
        Ok(payout)
    }

    /// Reject a pending request; the wallet is untouched
    pub async fn reject(
        &self,
        admin_user_id: Uuid,
        payout_id: Uuid,
        input: RejectPayoutInput,
    ) -> AppResult<PayoutRequest> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        let mut payout = Self::lock_payout(&mut tx, payout_id).await?;
        payout.transition(PayoutStatus::Rejected, Utc::now())?;
        payout.admin_response = Some(input.reason);
        Self::store(&mut tx, &payout).await?;

        AuditService::record(
            &mut tx,
            Some(admin_user_id),
            AuditAction::PayoutRejected,
            &format!(
                "Payout {} of Rs.{} rejected for {}",
                payout.id, payout.requested_amount, payout.owner()
            ),
        )
        .await?;

        tx.commit().await?;

        self.notify_status(&payout).await;
        Ok(payout)
    }

    /// Record that an approved payout left the platform
    pub async fn mark_paid(&self, admin_user_id: Uuid, payout_id: Uuid) -> AppResult<PayoutRequest> {
        let mut tx = self.db.begin().await?;
        set_lock_timeout(&mut tx, self.lock_timeout_ms).await?;

        let mut payout = Self::lock_payout(&mut tx, payout_id).await?;
        payout.transition(PayoutStatus::Paid, Utc::now())?;
        Self::store(&mut tx, &payout).await?;

        AuditService::record(
            &mut tx,
            Some(admin_user_id),
            AuditAction::PayoutPaid,
            &format!(
                "Payout {} of Rs.{} paid to {}",
                payout.id, payout.requested_amount, payout.owner()
            ),
        )
        .await?;

        tx.commit().await?;

        self.notify_status(&payout).await;
        Ok(payout)
    }

    /// Requests of one wallet owner, newest first
    pub async fn list_for_owner(&self, owner: WalletOwner) -> AppResult<Vec<PayoutRequest>> {
        let payouts = sqlx::query_as::<_, PayoutRequest>(
            r#"
            SELECT id, owner_kind, owner_id, requested_amount, status, admin_response,
                   created_at, updated_at, paid_at
            FROM payout_requests
            WHERE owner_kind = $1 AND owner_id = $2
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner.kind())
        .bind(owner.owner_id())
        .fetch_all(&self.db)
        .await?;

        Ok(payouts)
    }

    async fn notify_status(&self, payout: &PayoutRequest) {
        NotificationService::new(self.db.clone())
            .notify_owner(
                payout.owner(),
                NotificationType::Payout,
                &format!("Payout Request {}", payout.status.label()),
                &format!(
                    "Your payout request of Rs.{} has been {}",
                    payout.requested_amount, payout.status
                ),
            )
            .await;
    }

    /// Farm or shop name for messages; falls back to the owner key
    async fn owner_name(&self, owner: WalletOwner) -> String {
        let query = match owner {
            WalletOwner::Farmer(_) => "SELECT farm_name FROM farmers WHERE id = $1",
            WalletOwner::Vendor(_) => "SELECT shop_name FROM vendors WHERE id = $1",
            WalletOwner::Admin => return "Platform".to_string(),
        };

        match sqlx::query_scalar::<_, String>(query)
            .bind(owner.owner_id())
            .fetch_optional(&self.db)
            .await
        {
            Ok(Some(name)) => name,
            Ok(None) => owner.to_string(),
            Err(e) => {
                tracing::warn!(%owner, error = %e, "Failed to load owner name");
                owner.to_string()
            }
        }
    }

    async fn lock_payout(conn: &mut PgConnection, payout_id: Uuid) -> AppResult<PayoutRequest> {
        sqlx::query_as::<_, PayoutRequest>(
            r#"
            SELECT id, owner_kind, owner_id, requested_amount, status, admin_response,
                   created_at, updated_at, paid_at
            FROM payout_requests
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(payout_id)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Payout request".to_string()))
    }

    async fn store(conn: &mut PgConnection, payout: &PayoutRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE payout_requests
            SET status = $2, admin_response = $3, updated_at = $4, paid_at = $5
            WHERE id = $1
            "#,
        )
        .bind(payout.id)
        .bind(payout.status)
        .bind(&payout.admin_response)
        .bind(payout.updated_at)
        .bind(payout.paid_at)
        .execute(conn)
        .await?;
        Ok(())
    }
}
