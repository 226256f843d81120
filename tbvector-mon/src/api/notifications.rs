//! Cough notification HTTP handlers

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::api::auth::CurrentUser;
use crate::error::ApiResult;
use crate::AppState;

/// GET /api/notifications
pub async fn list_unread(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let unread = state.notifications().list_unread().await?;
    Ok(Json(json!({
        "status": "success",
        "data": {
            "notifications": unread.notifications,
            "unreadCount": unread.unread_count,
        },
    })))
}

/// PATCH /api/notifications/:id/read
///
/// First caller wins; later callers receive 409 Conflict.
pub async fn acknowledge(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.notifications().acknowledge(&id, &user.actor()).await?;
    Ok(Json(json!({
        "status": "success",
        "data": { "message": "Notification acknowledged successfully" },
    })))
}
