//! HTTP handlers for the platform commission rate

use axum::{extract::State, Json};
use shared::{CommissionRate, UserRole};

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::commission::ReplaceCommissionInput;
use crate::services::CommissionService;
use crate::AppState;

/// Current commission rate
pub async fn get_commission(
    State(state): State<AppState>,
    _current_user: CurrentUser,
) -> AppResult<Json<CommissionRate>> {
    let service = CommissionService::new(state.db);
    let rate = service
        .current()
        .await?
        .ok_or_else(|| AppError::NotFound("Commission rate".to_string()))?;
    Ok(Json(rate))
}

/// Replace the commission rate
pub async fn replace_commission(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ReplaceCommissionInput>,
) -> AppResult<Json<CommissionRate>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let service = CommissionService::new(state.db);
    let rate = service
        .replace(current_user.0.user_id, input.rate_percent)
        .await?;
    Ok(Json(rate))
}
