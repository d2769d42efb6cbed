//! HTTP handlers for wallet balances

use axum::{extract::State, Json};
use shared::{UserRole, Wallet, WalletOwner};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::WalletService;
use crate::AppState;

/// Wallet of the calling farmer or vendor
pub async fn get_my_wallet(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Wallet>> {
    current_user
        .0
        .require_role(&[UserRole::Farmer, UserRole::Vendor])?;
    let owner = current_user.0.wallet_owner()?;
    let wallet = WalletService::new(state.db).get_wallet(owner).await?;
    Ok(Json(wallet))
}

/// Platform commission wallet
pub async fn get_admin_wallet(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Wallet>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let wallet = WalletService::new(state.db)
        .get_wallet(WalletOwner::Admin)
        .await?;
    Ok(Json(wallet))
}
