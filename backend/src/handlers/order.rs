//! HTTP handlers for order status and settlement

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{SettlementOutcome, UserRole};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::{OrderStatusResponse, OrderWithLines, UpdateOrderStatusInput};
use crate::services::OrderService;
use crate::AppState;

fn service(state: &AppState) -> OrderService {
    OrderService::new(state.db.clone(), state.config.settlement.lock_timeout_ms)
}

/// Get an order with its lines
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderWithLines>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let order = service(&state).get_order(order_id).await?;
    Ok(Json(order))
}

/// Update order and/or payment status; settles the order once delivered and paid
pub async fn update_order_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateOrderStatusInput>,
) -> AppResult<Json<OrderStatusResponse>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let response = service(&state)
        .update_status(current_user.0.user_id, order_id, input)
        .await?;
    Ok(Json(response))
}

/// Retry settlement of a delivered, paid order
pub async fn settle_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<SettlementOutcome>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let outcome = service(&state).settle(order_id).await?;
    Ok(Json(outcome))
}
