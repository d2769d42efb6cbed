//! Route definitions for the Agro Marketplace settlement API

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/stock-lots", stock_lot_routes())
        .nest("/reservations", reservation_routes())
        .nest("/orders", order_routes())
        .nest("/commission", commission_routes())
        .nest("/wallets", wallet_routes())
        .nest("/payouts", payout_routes())
        .nest("/audit", audit_routes())
        .nest("/notifications", notification_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .merge(protected)
}

/// Stock lot routes
fn stock_lot_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(handlers::get_stock_lot))
        .route("/:id/reservations", post(handlers::reserve_stock))
}

/// Reservation routes
fn reservation_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(handlers::get_reservation))
        .route("/:id/delivery-status", put(handlers::update_delivery_status))
}

/// Order routes
fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/:id", get(handlers::get_order))
        .route("/:id/status", put(handlers::update_order_status))
        .route("/:id/settle", post(handlers::settle_order))
}

/// Commission configuration routes
fn commission_routes() -> Router<AppState> {
    Router::new().route(
        "/",
        get(handlers::get_commission).put(handlers::replace_commission),
    )
}

/// Wallet routes
fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::get_my_wallet))
        .route("/admin", get(handlers::get_admin_wallet))
}

/// Payout routes
fn payout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::request_payout).get(handlers::list_my_payouts))
        .route("/:id/approve", post(handlers::approve_payout))
        .route("/:id/reject", post(handlers::reject_payout))
        .route("/:id/mark-paid", post(handlers::mark_payout_paid))
}

/// Audit trail routes
fn audit_routes() -> Router<AppState> {
    Router::new().route("/", get(handlers::list_audit))
}

/// Notification routes
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_notifications))
        .route("/:id/read", put(handlers::mark_notification_read))
}
