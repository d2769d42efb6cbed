//! HTTP handlers for payout requests

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{PayoutRequest, UserRole};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::payout::{RejectPayoutInput, RequestPayoutInput};
use crate::services::PayoutService;
use crate::AppState;

fn service(state: &AppState) -> PayoutService {
    PayoutService::new(state.db.clone(), state.config.settlement.lock_timeout_ms)
}

/// Farmer or vendor requests a payout from their wallet
pub async fn request_payout(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RequestPayoutInput>,
) -> AppResult<(StatusCode, Json<PayoutRequest>)> {
    current_user
        .0
        .require_role(&[UserRole::Farmer, UserRole::Vendor])?;
    let owner = current_user.0.wallet_owner()?;
    let payout = service(&state)
        .request_payout(current_user.0.user_id, owner, input)
        .await?;
    Ok((StatusCode::CREATED, Json(payout)))
}

/// Payout requests of the caller
pub async fn list_my_payouts(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<PayoutRequest>>> {
    let owner = current_user.0.wallet_owner()?;
    let payouts = service(&state).list_for_owner(owner).await?;
    Ok(Json(payouts))
}

pub async fn approve_payout(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(payout_id): Path<Uuid>,
) -> AppResult<Json<PayoutRequest>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let payout = service(&state)
        .approve(current_user.0.user_id, payout_id)
        .await?;
    Ok(Json(payout))
}

pub async fn reject_payout(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(payout_id): Path<Uuid>,
    Json(input): Json<RejectPayoutInput>,
) -> AppResult<Json<PayoutRequest>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let payout = service(&state)
        .reject(current_user.0.user_id, payout_id, input)
        .await?;
    Ok(Json(payout))
}

pub async fn mark_payout_paid(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(payout_id): Path<Uuid>,
) -> AppResult<Json<PayoutRequest>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let payout = service(&state)
        .mark_paid(current_user.0.user_id, payout_id)
        .await?;
    Ok(Json(payout))
}
