//! Wallet models and balance rules

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::validation::{ensure_money_scale, ensure_positive};

/// Kind of actor owning a wallet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "wallet_owner_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    Farmer,
    Vendor,
    Admin,
}

/// Owner of a wallet. There is exactly one platform-wide admin wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum WalletOwner {
    Farmer(Uuid),
    Vendor(Uuid),
    Admin,
}

impl WalletOwner {
    pub fn kind(&self) -> OwnerKind {
        match self {
            WalletOwner::Farmer(_) => OwnerKind::Farmer,
            WalletOwner::Vendor(_) => OwnerKind::Vendor,
            WalletOwner::Admin => OwnerKind::Admin,
        }
    }

    /// Storage key of the owner; the admin wallet uses the nil UUID
    pub fn owner_id(&self) -> Uuid {
        match self {
            WalletOwner::Farmer(id) | WalletOwner::Vendor(id) => *id,
            WalletOwner::Admin => Uuid::nil(),
        }
    }

    pub fn from_parts(kind: OwnerKind, owner_id: Uuid) -> Self {
        match kind {
            OwnerKind::Farmer => WalletOwner::Farmer(owner_id),
            OwnerKind::Vendor => WalletOwner::Vendor(owner_id),
            OwnerKind::Admin => WalletOwner::Admin,
        }
    }
}

impl std::fmt::Display for WalletOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalletOwner::Farmer(id) => write!(f, "farmer:{}", id),
            WalletOwner::Vendor(id) => write!(f, "vendor:{}", id),
            WalletOwner::Admin => write!(f, "admin"),
        }
    }
}

/// A non-negative balance held for one owner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Wallet {
    pub id: Uuid,
    pub owner_kind: OwnerKind,
    pub owner_id: Uuid,
    pub balance: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// An empty wallet for `owner`
    pub fn open(owner: WalletOwner, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_kind: owner.kind(),
            owner_id: owner.owner_id(),
            balance: Decimal::ZERO,
            updated_at: now,
        }
    }

    pub fn owner(&self) -> WalletOwner {
        WalletOwner::from_parts(self.owner_kind, self.owner_id)
    }

    /// Add `amount` to the balance
    pub fn credit(&mut self, amount: Decimal, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(amount, "amount")?;
        ensure_money_scale(amount, "amount")?;
        self.balance += amount;
        self.updated_at = now;
        Ok(())
    }

    /// Remove `amount` from the balance; leaves the wallet untouched on failure
    pub fn debit(&mut self, amount: Decimal, now: DateTime<Utc>) -> DomainResult<()> {
        ensure_positive(amount, "amount")?;
        ensure_money_scale(amount, "amount")?;
        if self.balance < amount {
            return Err(DomainError::InsufficientFunds {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        self.updated_at = now;
        Ok(())
    }
}
