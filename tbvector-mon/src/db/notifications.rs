//! Cough notification queries
//!
//! Acknowledgment is a single conditional UPDATE so that two concurrent
//! acknowledgments cannot both succeed.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tbvector_common::db::models::{
    CoughContext, CoughNotification, CoughStatus, NotificationView,
};
use tbvector_common::Result;

const SELECT_WITH_CONTEXT: &str = "SELECT n.*, \
     c.timestamp AS cough_timestamp, c.status AS cough_status, d.name AS cough_device_name \
     FROM cough_notifications n \
     LEFT JOIN cough_events c ON c.guid = n.cough_guid \
     LEFT JOIN devices d ON d.guid = c.device_guid";

/// Notification row with originating-event context resolved
#[derive(Debug, sqlx::FromRow)]
pub struct NotificationWithContext {
    #[sqlx(flatten)]
    pub notification: CoughNotification,
    pub cough_timestamp: Option<DateTime<Utc>>,
    pub cough_status: Option<CoughStatus>,
    pub cough_device_name: Option<String>,
}

impl NotificationWithContext {
    pub fn into_view(self) -> NotificationView {
        let cough_event = match (self.cough_timestamp, self.cough_status) {
            (Some(timestamp), Some(status)) => Some(CoughContext {
                guid: self.notification.cough_guid.clone(),
                timestamp,
                status,
                device_name: self.cough_device_name,
            }),
            _ => None,
        };
        NotificationView {
            notification: self.notification,
            cough_event,
        }
    }
}

pub async fn insert(pool: &SqlitePool, notification: &CoughNotification) -> Result<()> {
    sqlx::query(
        "INSERT INTO cough_notifications (guid, kind, message, cough_guid, acknowledged_by, \
         acknowledged_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&notification.guid)
    .bind(notification.kind)
    .bind(&notification.message)
    .bind(&notification.cough_guid)
    .bind(&notification.acknowledged_by)
    .bind(notification.acknowledged_at.map(|t| t.to_rfc3339()))
    .bind(notification.created_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, guid: &str) -> Result<Option<CoughNotification>> {
    let notification =
        sqlx::query_as::<_, CoughNotification>("SELECT * FROM cough_notifications WHERE guid = ?")
            .bind(guid)
            .fetch_optional(pool)
            .await?;
    Ok(notification)
}

pub async fn find_with_context(
    pool: &SqlitePool,
    guid: &str,
) -> Result<Option<NotificationWithContext>> {
    let sql = format!("{} WHERE n.guid = ?", SELECT_WITH_CONTEXT);
    let row = sqlx::query_as::<_, NotificationWithContext>(&sql)
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Unacknowledged notifications, most recently created first
pub async fn list_unread(pool: &SqlitePool) -> Result<Vec<NotificationWithContext>> {
    let sql = format!(
        "{} WHERE n.acknowledged_by IS NULL ORDER BY n.created_at DESC, n.rowid DESC",
        SELECT_WITH_CONTEXT
    );
    let rows = sqlx::query_as::<_, NotificationWithContext>(&sql)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn count_unread(pool: &SqlitePool) -> Result<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM cough_notifications WHERE acknowledged_by IS NULL",
    )
    .fetch_one(pool)
    .await?;
    Ok(total)
}

/// Conditional acknowledgment: first writer wins.
///
/// Returns the number of rows updated; 0 means the notification either does
/// not exist or was already acknowledged (the caller distinguishes).
pub async fn try_acknowledge(
    pool: &SqlitePool,
    guid: &str,
    user_guid: &str,
    now: DateTime<Utc>,
) -> Result<u64> {
    let done = sqlx::query(
        "UPDATE cough_notifications SET acknowledged_by = ?, acknowledged_at = ? \
         WHERE guid = ? AND acknowledged_by IS NULL",
    )
    .bind(user_guid)
    .bind(now.to_rfc3339())
    .bind(guid)
    .execute(pool)
    .await?;
    Ok(done.rows_affected())
}
