//! HTTP handlers for stock selection and delivery tracking

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::{Reservation, StockLot, UserRole};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reservation::{ReserveInput, UpdateDeliveryInput};
use crate::services::ReservationService;
use crate::AppState;

fn service(state: &AppState) -> ReservationService {
    ReservationService::new(state.db.clone(), state.config.settlement.lock_timeout_ms)
}

/// Vendor selects part of a stock lot
pub async fn reserve_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(stock_lot_id): Path<Uuid>,
    Json(input): Json<ReserveInput>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let vendor_id = current_user.0.vendor_id()?;
    let reservation = service(&state)
        .reserve(vendor_id, stock_lot_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Get a stock lot
pub async fn get_stock_lot(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(stock_lot_id): Path<Uuid>,
) -> AppResult<Json<StockLot>> {
    let lot = service(&state).get_stock_lot(stock_lot_id).await?;
    Ok(Json(lot))
}

/// Get a reservation (admin or the owning vendor)
pub async fn get_reservation(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reservation_id): Path<Uuid>,
) -> AppResult<Json<Reservation>> {
    let reservation = service(&state).get_reservation(reservation_id).await?;
    if !current_user.0.is_admin() && current_user.0.vendor_id()? != reservation.vendor_id {
        return Err(crate::error::AppError::NotFound("Reservation".to_string()));
    }
    Ok(Json(reservation))
}

/// Admin advances the delivery status of a reservation
pub async fn update_delivery_status(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(reservation_id): Path<Uuid>,
    Json(input): Json<UpdateDeliveryInput>,
) -> AppResult<Json<Reservation>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let reservation = service(&state)
        .update_delivery_status(current_user.0.user_id, reservation_id, input.status)
        .await?;
    Ok(Json(reservation))
}
