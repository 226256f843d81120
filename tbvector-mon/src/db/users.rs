//! User and session queries
//!
//! Session tokens are opaque bearer credentials; issuance (login, password
//! verification) happens outside this service.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tbvector_common::db::models::User;
use tbvector_common::Result;

pub async fn insert_user(pool: &SqlitePool, user: &User) -> Result<()> {
    sqlx::query(
        "INSERT INTO users (guid, username, name, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&user.guid)
    .bind(&user.username)
    .bind(&user.name)
    .bind(user.role)
    .bind(user.created_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn insert_session(
    pool: &SqlitePool,
    token: &str,
    user_guid: &str,
    now: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO sessions (token, user_guid, created_at, expires_at) VALUES (?, ?, ?, ?)",
    )
    .bind(token)
    .bind(user_guid)
    .bind(now.to_rfc3339())
    .bind(expires_at.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await?;
    Ok(())
}

/// Resolve a session token to its user, honoring expiry
pub async fn find_by_session(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT u.* FROM users u \
         JOIN sessions s ON s.user_guid = u.guid \
         WHERE s.token = ? AND (s.expires_at IS NULL OR s.expires_at > ?)",
    )
    .bind(token)
    .bind(now.to_rfc3339())
    .fetch_optional(pool)
    .await?;
    Ok(user)
}
