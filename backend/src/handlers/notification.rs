//! HTTP handlers for in-app notifications

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::Notification;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::NotificationService;
use crate::AppState;

/// Query parameters for listing notifications
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

/// Get in-app notifications
pub async fn get_notifications(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let service = NotificationService::new(state.db);
    let unread_only = query.unread_only.unwrap_or(false);
    let limit = query.limit.unwrap_or(50);

    let notifications = service
        .list_for_user(current_user.0.user_id, unread_only, limit)
        .await?;
    Ok(Json(notifications))
}

/// Mark a notification as read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(notification_id): Path<Uuid>,
) -> AppResult<Json<Notification>> {
    let service = NotificationService::new(state.db);
    let notification = service
        .mark_read(current_user.0.user_id, notification_id)
        .await?;
    Ok(Json(notification))
}
