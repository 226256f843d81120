//! Device queries

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tbvector_common::db::models::Device;
use tbvector_common::Result;

pub async fn insert(pool: &SqlitePool, device: &Device) -> Result<()> {
    sqlx::query(
        "INSERT INTO devices (guid, device_id, name, location, status, last_heartbeat, \
         created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&device.guid)
    .bind(&device.device_id)
    .bind(&device.name)
    .bind(&device.location)
    .bind(device.status)
    .bind(device.last_heartbeat.map(|t| t.to_rfc3339()))
    .bind(device.created_at.to_rfc3339())
    .bind(device.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_guid(pool: &SqlitePool, guid: &str) -> Result<Option<Device>> {
    let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(device)
}

/// Lookup by the externally-assigned device identifier
pub async fn find_by_device_id(pool: &SqlitePool, device_id: &str) -> Result<Option<Device>> {
    let device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE device_id = ?")
        .bind(device_id)
        .fetch_optional(pool)
        .await?;
    Ok(device)
}

pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Device>> {
    let devices = sqlx::query_as::<_, Device>("SELECT * FROM devices ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(devices)
}

/// Update display fields; absent fields keep their current value
pub async fn update_info(
    pool: &SqlitePool,
    guid: &str,
    name: Option<&str>,
    location: Option<&str>,
    now: DateTime<Utc>,
) -> Result<u64> {
    let done = sqlx::query(
        "UPDATE devices SET name = COALESCE(?, name), location = COALESCE(?, location), \
         updated_at = ? WHERE guid = ?",
    )
    .bind(name)
    .bind(location)
    .bind(now.to_rfc3339())
    .bind(guid)
    .execute(pool)
    .await?;
    Ok(done.rows_affected())
}

pub async fn delete(pool: &SqlitePool, guid: &str) -> Result<u64> {
    let done = sqlx::query("DELETE FROM devices WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;
    Ok(done.rows_affected())
}

/// Record a heartbeat: ONLINE + timestamp
pub async fn set_online(
    pool: &SqlitePool,
    device_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<Device>> {
    let done = sqlx::query(
        "UPDATE devices SET status = 'ONLINE', last_heartbeat = ?, updated_at = ? \
         WHERE device_id = ?",
    )
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(device_id)
    .execute(pool)
    .await?;

    if done.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_device_id(pool, device_id).await
}

/// ONLINE devices whose last heartbeat predates `threshold`
pub async fn stale_online(pool: &SqlitePool, threshold: DateTime<Utc>) -> Result<Vec<Device>> {
    let devices = sqlx::query_as::<_, Device>(
        "SELECT * FROM devices WHERE status = 'ONLINE' AND last_heartbeat < ?",
    )
    .bind(threshold.to_rfc3339())
    .fetch_all(pool)
    .await?;
    Ok(devices)
}

pub async fn set_offline(pool: &SqlitePool, guid: &str, now: DateTime<Utc>) -> Result<u64> {
    let done = sqlx::query("UPDATE devices SET status = 'OFFLINE', updated_at = ? WHERE guid = ?")
        .bind(now.to_rfc3339())
        .bind(guid)
        .execute(pool)
        .await?;
    Ok(done.rows_affected())
}

pub async fn count_online(pool: &SqlitePool) -> Result<i64> {
    let total =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM devices WHERE status = 'ONLINE'")
            .fetch_one(pool)
            .await?;
    Ok(total)
}

pub async fn count_all(pool: &SqlitePool) -> Result<i64> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM devices")
        .fetch_one(pool)
        .await?;
    Ok(total)
}
