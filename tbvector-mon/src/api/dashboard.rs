//! Dashboard HTTP handlers

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/dashboard/stats
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let stats = state.dashboard().stats().await?;
    Ok(Json(json!({ "status": "success", "data": stats })))
}
