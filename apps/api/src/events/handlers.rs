use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::notification::Notification;
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;

#[derive(Deserialize)]
pub struct NotificationQuery {
    pub user_id: Uuid,
    pub limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

/// GET /api/v1/notifications
pub async fn handle_list_notifications(
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> Result<Json<Vec<Notification>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, DEFAULT_LIMIT);
    let notifications = state.store.list_notifications(params.user_id, limit).await?;
    Ok(Json(notifications))
}

/// POST /api/v1/notifications/:id/read
pub async fn handle_mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Value>, AppError> {
    if !state.store.mark_notification_read(params.user_id, id).await? {
        return Err(AppError::NotFound(format!("Notification {id} not found")));
    }
    Ok(Json(json!({ "id": id, "is_read": true })))
}
