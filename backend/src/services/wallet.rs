//! Wallet ledger
//!
//! Balance changes always happen on a caller-supplied transaction with the
//! wallet row locked, so the caller can commit the audit entry describing the
//! change in the same unit.

use chrono::Utc;
use rust_decimal::Decimal;
use shared::{Wallet, WalletOwner};
use sqlx::{PgConnection, PgPool};

use crate::error::{AppError, AppResult};

/// Wallet reads and balance changes.
///
/// Farmer and vendor wallets are never created implicitly. Whoever creates a
/// farmer or vendor profile must call [`WalletService::open_wallet`] for it;
/// crediting a missing wallet fails with `NotFound` and rolls settlement back.
#[derive(Clone)]
pub struct WalletService {
    db: PgPool,
}

impl WalletService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Current wallet of `owner`. The admin wallet is created on first read.
    pub async fn get_wallet(&self, owner: WalletOwner) -> AppResult<Wallet> {
        let mut conn = self.db.acquire().await?;
        if owner == WalletOwner::Admin {
            Self::ensure_wallet(&mut conn, owner).await?;
        }
        Self::fetch(&mut conn, owner)
            .await?
            .ok_or_else(|| AppError::NotFound("Wallet".to_string()))
    }

    /// Get-or-create. The onboarding flow calls this once per new farmer or vendor.
    pub async fn open_wallet(&self, owner: WalletOwner) -> AppResult<Wallet> {
        let mut conn = self.db.acquire().await?;
        Self::ensure_wallet(&mut conn, owner).await?;
        Self::fetch(&mut conn, owner)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Wallet for {} vanished after creation", owner)))
    }

    /// Create the wallet row if it does not exist yet
    pub async fn ensure_wallet(conn: &mut PgConnection, owner: WalletOwner) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO wallets (owner_kind, owner_id)
            VALUES ($1, $2)
            ON CONFLICT (owner_kind, owner_id) DO NOTHING
            "#,
        )
        .bind(owner.kind())
        .bind(owner.owner_id())
        .execute(conn)
        .await?;
        Ok(())
    }

    /// Add `amount` to the wallet of `owner`
    pub async fn credit(conn: &mut PgConnection, owner: WalletOwner, amount: Decimal) -> AppResult<Wallet> {
        let mut wallet = Self::lock(conn, owner).await?;
        wallet.credit(amount, Utc::now())?;
        Self::store_balance(conn, &wallet).await?;
        tracing::debug!(%owner, %amount, balance = %wallet.balance, "Wallet credited");
        Ok(wallet)
    }

    /// Remove `amount` from the wallet of `owner`; `InsufficientFunds` leaves it unchanged
    pub async fn debit(conn: &mut PgConnection, owner: WalletOwner, amount: Decimal) -> AppResult<Wallet> {
        let mut wallet = Self::lock(conn, owner).await?;
        wallet.debit(amount, Utc::now())?;
        Self::store_balance(conn, &wallet).await?;
        tracing::debug!(%owner, %amount, balance = %wallet.balance, "Wallet debited");
        Ok(wallet)
    }

    async fn fetch(conn: &mut PgConnection, owner: WalletOwner) -> AppResult<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, owner_kind, owner_id, balance, updated_at
            FROM wallets
            WHERE owner_kind = $1 AND owner_id = $2
            "#,
        )
        .bind(owner.kind())
        .bind(owner.owner_id())
        .fetch_optional(conn)
        .await?;
        Ok(wallet)
    }

    async fn lock(conn: &mut PgConnection, owner: WalletOwner) -> AppResult<Wallet> {
        sqlx::query_as::<_, Wallet>(
            r#"
            SELECT id, owner_kind, owner_id, balance, updated_at
            FROM wallets
            WHERE owner_kind = $1 AND owner_id = $2
            FOR UPDATE
            "#,
        )
        .bind(owner.kind())
        .bind(owner.owner_id())
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Wallet for {}", owner)))
    }

    async fn store_balance(conn: &mut PgConnection, wallet: &Wallet) -> AppResult<()> {
        sqlx::query("UPDATE wallets SET balance = $2, updated_at = $3 WHERE id = $1")
            .bind(wallet.id)
            .bind(wallet.balance)
            .bind(wallet.updated_at)
            .execute(conn)
            .await?;
        Ok(())
    }
}
