//! Device management HTTP handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use tbvector_common::Error;

use crate::api::auth::{require_admin, CurrentUser};
use crate::error::ApiResult;
use crate::services::devices::{CreateDevice, UpdateDevice};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDeviceRequest {
    pub device_id: String,
    pub name: String,
    pub location: Option<String>,
}

/// POST /api/devices (admin only)
pub async fn create_device(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(body): Json<CreateDeviceRequest>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    require_admin(&user)?;
    let device = state
        .devices()
        .create(CreateDevice {
            device_id: body.device_id,
            name: body.name,
            location: body.location,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": device, "message": "Device created successfully" })),
    ))
}

/// GET /api/devices
pub async fn list_devices(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let devices = state.devices().list().await?;
    Ok(Json(json!({ "data": devices, "message": "Retrieved all devices" })))
}

/// GET /api/devices/:id (id = externally-assigned device identifier)
pub async fn get_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let device = state.devices().get(&id).await?;
    Ok(Json(json!({ "data": device, "message": "Retrieved device" })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeviceRequest {
    pub name: Option<String>,
    pub location: Option<String>,
}

/// PUT /api/devices/:id (admin only; id = record guid)
pub async fn update_device(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateDeviceRequest>,
) -> ApiResult<Json<Value>> {
    require_admin(&user)?;
    let device = state
        .devices()
        .update(
            &id,
            UpdateDevice {
                name: body.name,
                location: body.location,
            },
        )
        .await?;
    Ok(Json(json!({ "data": device, "message": "Device updated successfully" })))
}

/// DELETE /api/devices/:id (admin only; id = record guid)
pub async fn delete_device(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    require_admin(&user)?;
    let device = state.devices().delete(&id).await?;
    Ok(Json(json!({ "data": device, "message": "Device deleted successfully" })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    pub device_id: Option<String>,
}

/// POST /api/devices/heartbeat (device tier)
pub async fn heartbeat(
    State(state): State<AppState>,
    Json(body): Json<HeartbeatRequest>,
) -> ApiResult<Json<Value>> {
    let device_id = body
        .device_id
        .ok_or_else(|| Error::InvalidInput("deviceId is required in the body".to_string()))?;
    let device = state.devices().heartbeat(&device_id).await?;
    Ok(Json(json!({ "data": device, "message": "Heartbeat received successfully" })))
}
