//! Shared test utilities
//!
//! Builds a full AppState against a temp-dir database and blob store, plus
//! seeding and request helpers.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;
use chrono::Utc;
use sqlx::SqlitePool;
use tbvector_common::config::MonConfig;
use tbvector_common::db::init_database;
use tbvector_common::db::models::{CoughEventView, Device, User, UserRole};
use tbvector_common::events::EventBus;
use tbvector_mon::services::classifier::ClassifierHandle;
use tbvector_mon::services::devices::{CreateDevice, DeviceManager};
use tbvector_mon::services::lifecycle::{AudioUpload, SubmitMetadata};
use tbvector_mon::services::storage::AudioStorage;
use tbvector_mon::AppState;
use tempfile::TempDir;
use uuid::Uuid;

pub const TEST_API_KEY: &str = "test-device-key";

/// Build application state on a fresh temp-dir database.
///
/// The classifier endpoint is unroutable on purpose: dispatch failures are
/// logged and never surfaced, so tests exercise the fire-and-forget path.
pub async fn test_state() -> (TempDir, AppState) {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let pool = init_database(&temp_dir.path().join("tbvector.db"))
        .await
        .expect("Should initialize database");

    let config = MonConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        root_folder: temp_dir.path().to_path_buf(),
        device_api_key: TEST_API_KEY.to_string(),
        classifier_url: "http://127.0.0.1:9/classify".to_string(),
        classifier_timeout: std::time::Duration::from_secs(1),
        event_capacity: 64,
    };

    let storage = AudioStorage::new(temp_dir.path());
    storage.ensure_dirs().await.expect("Should create uploads dir");

    let classifier =
        ClassifierHandle::spawn(config.classifier_url.clone(), config.classifier_timeout)
            .expect("Should spawn classifier worker");
    let bus = EventBus::new(config.event_capacity);

    let state = AppState::new(pool, bus, Arc::new(config), storage, classifier);
    (temp_dir, state)
}

/// Insert a user plus a session; returns (user guid, session token)
pub async fn seed_user(
    db: &SqlitePool,
    username: &str,
    name: &str,
    role: UserRole,
) -> (String, String) {
    let guid = Uuid::new_v4().to_string();
    let user = User {
        guid: guid.clone(),
        username: username.to_string(),
        name: name.to_string(),
        role,
        created_at: Utc::now(),
    };
    tbvector_mon::db::users::insert_user(db, &user)
        .await
        .expect("Should insert user");

    let token = format!("token-{}", guid);
    tbvector_mon::db::users::insert_session(db, &token, &guid, Utc::now(), None)
        .await
        .expect("Should insert session");

    (guid, token)
}

pub async fn seed_device(db: &SqlitePool, device_id: &str, name: &str) -> Device {
    DeviceManager::new(db.clone())
        .create(CreateDevice {
            device_id: device_id.to_string(),
            name: name.to_string(),
            location: None,
        })
        .await
        .expect("Should create device")
}

pub fn wav_bytes() -> Vec<u8> {
    b"RIFF0000WAVEfmt fake-test-audio".to_vec()
}

/// Submit an event for a seeded device through the lifecycle manager
pub async fn submit_event(state: &AppState, device_id: &str) -> CoughEventView {
    state
        .lifecycle()
        .submit(
            AudioUpload {
                file_name: Some("cough.wav".to_string()),
                bytes: wav_bytes(),
            },
            SubmitMetadata {
                device_id: Some(device_id.to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("Should submit cough event")
}

/// Build a JSON request, optionally with a session bearer token
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Build a device-style request carrying the pre-shared API key
pub fn device_request(
    method: &str,
    uri: &str,
    api_key: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Build a multipart upload request (audio + optional deviceId field)
pub fn multipart_upload_request(
    uri: &str,
    api_key: Option<&str>,
    token: Option<&str>,
    device_id: Option<&str>,
) -> Request<Body> {
    const BOUNDARY: &str = "tbvector-test-boundary";

    let mut body = String::new();
    if let Some(device_id) = device_id {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"deviceId\"\r\n\r\n{}\r\n",
            BOUNDARY, device_id
        ));
    }
    body.push_str(&format!(
        "--{}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"cough.wav\"\r\n\
         Content-Type: audio/wav\r\n\r\nRIFF0000WAVEfmt fake-test-audio\r\n",
        BOUNDARY
    ));
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    let mut builder = Request::builder().method("POST").uri(uri).header(
        "content-type",
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Extract a JSON body from a response
pub async fn extract_json(body: Body) -> serde_json::Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}
