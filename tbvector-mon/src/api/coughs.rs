//! Cough event HTTP handlers
//!
//! Intake (device and user tiers), classification callbacks, listing, notes,
//! and deletion. Business logic lives in the lifecycle manager; handlers only
//! parse input and shape responses.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tbvector_common::db::models::{CoughStatus, DetectionResult};
use tbvector_common::Error;

use crate::api::auth::{require_admin, CurrentUser};
use crate::error::{ApiError, ApiResult};
use crate::services::lifecycle::{AudioUpload, ListQuery, SubmitMetadata};
use crate::AppState;

/// Parsed multipart upload form
struct UploadForm {
    audio: Option<AudioUpload>,
    device_id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    direction_of_arrival: Option<f64>,
}

async fn parse_upload(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm {
        audio: None,
        device_id: None,
        timestamp: None,
        direction_of_arrival: None,
    };

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                form.audio = Some(AudioUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "deviceId" => form.device_id = Some(field.text().await.map_err(bad_multipart)?),
            "timestamp" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                let parsed = DateTime::parse_from_rfc3339(&raw).map_err(|_| {
                    ApiError(Error::InvalidInput(format!("Invalid timestamp: {}", raw)))
                })?;
                form.timestamp = Some(parsed.with_timezone(&Utc));
            }
            "directionOfArrival" => {
                let raw = field.text().await.map_err(bad_multipart)?;
                let parsed = raw.parse::<f64>().map_err(|_| {
                    ApiError(Error::InvalidInput(format!(
                        "Invalid directionOfArrival: {}",
                        raw
                    )))
                })?;
                form.direction_of_arrival = Some(parsed);
            }
            // Unknown fields are ignored
            _ => {}
        }
    }

    Ok(form)
}

fn bad_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    ApiError(Error::InvalidInput(format!(
        "Malformed multipart body: {}",
        err
    )))
}

/// POST /api/coughs/upload (device tier)
pub async fn upload_device(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let form = parse_upload(multipart).await?;
    let audio = form
        .audio
        .ok_or_else(|| Error::InvalidInput("Audio file is required".to_string()))?;
    let device_id = form
        .device_id
        .ok_or_else(|| Error::InvalidInput("deviceId is required".to_string()))?;

    let view = state
        .lifecycle()
        .submit(
            audio,
            SubmitMetadata {
                device_id: Some(device_id),
                user: None,
                timestamp: form.timestamp,
                direction_of_arrival: form.direction_of_arrival,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Cough event recorded successfully",
            "data": view,
        })),
    ))
}

/// POST /api/coughs (authenticated-user tier)
pub async fn upload_user(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let form = parse_upload(multipart).await?;
    let audio = form
        .audio
        .ok_or_else(|| Error::InvalidInput("Audio file is required".to_string()))?;

    let view = state
        .lifecycle()
        .submit(
            audio,
            SubmitMetadata {
                device_id: form.device_id,
                user: Some(user.actor()),
                timestamp: form.timestamp,
                direction_of_arrival: form.direction_of_arrival,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "Cough event recorded successfully",
            "data": view,
        })),
    ))
}

/// PATCH /api/coughs/:id/result (device tier)
pub async fn record_result(
    State(state): State<AppState>,
    Path(cough_id): Path<String>,
    Json(result): Json<DetectionResult>,
) -> ApiResult<Json<Value>> {
    let view = state.lifecycle().record_result(&cough_id, result).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Cough event result updated successfully",
        "data": view,
    })))
}

/// External classifier callback body; fields optional so missing values fail
/// validation here rather than in the JSON extractor
#[derive(Debug, Deserialize)]
pub struct ExternalDetectionRequest {
    pub record_id: Option<String>,
    pub status: Option<i64>,
    pub confidence_score: Option<f64>,
}

/// POST /api/coughs/detection-result (no auth; external-service callback)
///
/// All validation happens before any state changes.
pub async fn external_detection(
    State(state): State<AppState>,
    Json(body): Json<ExternalDetectionRequest>,
) -> ApiResult<Json<Value>> {
    let (record_id, status, confidence_score) =
        match (body.record_id, body.status, body.confidence_score) {
            (Some(record_id), Some(status), Some(confidence_score)) => {
                (record_id, status, confidence_score)
            }
            _ => {
                return Err(Error::InvalidInput(
                    "Missing required fields: record_id, status, confidence_score".to_string(),
                )
                .into())
            }
        };

    if status != 0 && status != 1 {
        return Err(Error::InvalidInput(
            "Invalid status value. Must be 0 (negative) or 1 (positive)".to_string(),
        )
        .into());
    }
    if !(0.0..=1.0).contains(&confidence_score) {
        return Err(Error::InvalidInput(
            "Invalid confidence_score. Must be between 0 and 1".to_string(),
        )
        .into());
    }

    let view = state
        .lifecycle()
        .record_external_detection(&record_id, status, confidence_score)
        .await?;

    Ok(Json(json!({
        "message": "Detection result received and processed successfully",
        "data": view,
    })))
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    10
}

/// Query parameters for listing cough events
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub status: Option<CoughStatus>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub device_id: Option<String>,
    pub user_id: Option<String>,
}

/// GET /api/coughs
pub async fn list_coughs(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Value>> {
    let query = ListQuery {
        page: params.page,
        limit: params.limit,
        status: params.status,
        start_date: params.start_date,
        end_date: params.end_date,
        device_id: params.device_id,
        user_guid: params.user_id,
    };
    let page = state.lifecycle().list(&query).await?;

    Ok(Json(json!({
        "status": "success",
        "events": page.events,
        "total": page.total,
        "page": page.page,
        "pages": page.pages,
    })))
}

/// GET /api/coughs/:id
pub async fn get_cough(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let view = state.lifecycle().get(&id).await?;
    Ok(Json(json!({ "status": "success", "data": view })))
}

#[derive(Debug, Deserialize)]
pub struct AddNoteRequest {
    pub content: Option<String>,
}

/// POST /api/coughs/:id/notes
pub async fn add_note(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(body): Json<AddNoteRequest>,
) -> ApiResult<Json<Value>> {
    let content = body.content.unwrap_or_default();
    let view = state
        .lifecycle()
        .add_note(&id, &content, &user.actor())
        .await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Note added successfully",
        "data": view,
    })))
}

/// DELETE /api/coughs/:id (admin only)
pub async fn delete_cough(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    require_admin(&user)?;
    state.lifecycle().delete(&id).await?;
    Ok(Json(json!({
        "status": "success",
        "message": "Cough event deleted successfully",
    })))
}
