//! HTTP handlers for the audit trail

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::{AuditEntry, UserRole};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::AuditService;
use crate::AppState;

/// Query parameters for listing audit entries
#[derive(Debug, Deserialize)]
pub struct ListAuditQuery {
    pub limit: Option<i64>,
    pub after_id: Option<i64>,
    pub actor_id: Option<Uuid>,
}

/// Audit entries in creation order
pub async fn list_audit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListAuditQuery>,
) -> AppResult<Json<Vec<AuditEntry>>> {
    current_user.0.require_role(&[UserRole::Admin])?;
    let service = AuditService::new(state.db);
    let limit = query.limit.unwrap_or(100);

    let entries = match query.actor_id {
        Some(actor_id) => service.list_for_actor(actor_id, limit).await?,
        None => service.list(limit, query.after_id).await?,
    };
    Ok(Json(entries))
}
