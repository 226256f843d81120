//! Authentication middleware for tbvector-mon
//!
//! Two trust tiers:
//! - device routes: pre-shared key in the X-API-Key header
//! - staff routes: opaque session bearer token resolved against the sessions
//!   table; the resolved identity is attached to the request extensions

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use tbvector_common::db::models::{ActorInfo, User, UserRole};
use tbvector_common::Error;

use crate::db;
use crate::error::ApiError;
use crate::AppState;

/// Authenticated staff identity attached to the request
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub guid: String,
    pub name: String,
    pub role: UserRole,
}

impl CurrentUser {
    /// Display identity for event payloads and record attribution
    pub fn actor(&self) -> ActorInfo {
        ActorInfo {
            guid: self.guid.clone(),
            name: self.name.clone(),
        }
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            guid: user.guid,
            name: user.name,
            role: user.role,
        }
    }
}

/// Middleware guarding machine-to-machine routes with the pre-shared API key
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let provided = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    match provided {
        None => Err(Error::Unauthorized("API key is missing".to_string()).into()),
        Some(key) if key != state.config.device_api_key => {
            Err(Error::Forbidden("Invalid API key".to_string()).into())
        }
        Some(_) => Ok(next.run(request).await),
    }
}

/// Middleware guarding staff routes with a session bearer token
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string)
        .ok_or_else(|| ApiError(Error::Unauthorized("Session token is missing".to_string())))?;

    let user = db::users::find_by_session(&state.db, &token, Utc::now())
        .await?
        .ok_or_else(|| ApiError(Error::Unauthorized("Invalid or expired session".to_string())))?;

    request.extensions_mut().insert(CurrentUser::from(user));
    Ok(next.run(request).await)
}

/// Role check for destructive / administrative operations
pub fn require_admin(user: &CurrentUser) -> Result<(), Error> {
    if user.role != UserRole::Admin {
        return Err(Error::Forbidden("Administrator role required".to_string()));
    }
    Ok(())
}
