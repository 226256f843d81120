//! tbvector-mon library - TB screening monitoring backend
//!
//! Edge devices and logged-in users upload cough audio, an external analysis
//! service classifies each recording, and staff review results through a
//! session-authenticated API with real-time SSE notifications.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::Router;
use sqlx::SqlitePool;
use tbvector_common::config::MonConfig;
use tbvector_common::events::EventBus;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

use services::classifier::ClassifierHandle;
use services::dashboard::DashboardService;
use services::devices::DeviceManager;
use services::lifecycle::CoughLifecycle;
use services::notifications::NotificationManager;
use services::storage::AudioStorage;

/// Maximum accepted upload body size (audio recordings are short clips)
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Broadcast bus feeding the SSE stream
    pub bus: EventBus,
    /// Runtime configuration
    pub config: Arc<MonConfig>,
    /// Audio blob storage under the root folder
    pub storage: AudioStorage,
    /// Queue handle for fire-and-forget classifier dispatch
    pub classifier: ClassifierHandle,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        bus: EventBus,
        config: Arc<MonConfig>,
        storage: AudioStorage,
        classifier: ClassifierHandle,
    ) -> Self {
        Self {
            db,
            bus,
            config,
            storage,
            classifier,
        }
    }

    /// Cough event lifecycle manager
    pub fn lifecycle(&self) -> CoughLifecycle {
        CoughLifecycle::new(
            self.db.clone(),
            self.bus.clone(),
            self.storage.clone(),
            self.classifier.clone(),
        )
    }

    /// Notification manager
    pub fn notifications(&self) -> NotificationManager {
        NotificationManager::new(self.db.clone(), self.bus.clone())
    }

    /// Device manager
    pub fn devices(&self) -> DeviceManager {
        DeviceManager::new(self.db.clone())
    }

    /// Dashboard statistics service
    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.db.clone())
    }
}

/// Build application router
///
/// Three trust tiers:
/// - device routes guarded by the pre-shared X-API-Key header
/// - staff routes guarded by session-token authentication
/// - public routes (health, SSE handshake, external classifier callback)
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, patch, post};

    // Machine-to-machine routes (pre-shared API key)
    let device = Router::new()
        .route("/api/coughs/upload", post(api::coughs::upload_device))
        .route("/api/coughs/:id/result", patch(api::coughs::record_result))
        .route("/api/devices/heartbeat", post(api::devices::heartbeat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::require_api_key,
        ));

    // Staff routes (session token)
    let session = Router::new()
        .route(
            "/api/coughs",
            post(api::coughs::upload_user).get(api::coughs::list_coughs),
        )
        .route(
            "/api/coughs/:id",
            get(api::coughs::get_cough).delete(api::coughs::delete_cough),
        )
        .route("/api/coughs/:id/notes", post(api::coughs::add_note))
        .route("/api/notifications", get(api::notifications::list_unread))
        .route(
            "/api/notifications/:id/read",
            patch(api::notifications::acknowledge),
        )
        .route(
            "/api/devices",
            post(api::devices::create_device).get(api::devices::list_devices),
        )
        .route(
            "/api/devices/:id",
            get(api::devices::get_device)
                .put(api::devices::update_device)
                .delete(api::devices::delete_device),
        )
        .route("/api/dashboard/stats", get(api::dashboard::stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth::require_session,
        ));

    // Public routes
    // The external classifier callback carries no credentials; the SSE
    // handshake (EventSource) cannot send custom headers.
    let public = Router::new()
        .route(
            "/api/coughs/detection-result",
            post(api::coughs::external_detection),
        )
        .route("/api/events", get(api::sse::event_stream))
        .merge(api::health::health_routes());

    Router::new()
        .merge(device)
        .merge(session)
        .merge(public)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
