//! Cough event queries

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tbvector_common::db::models::{
    ActorInfo, CoughEvent, CoughEventView, CoughNote, CoughStatus, DetectionResult, DeviceSummary,
    NoteView,
};
use tbvector_common::Result;

/// Base SELECT joining device and user display fields
const SELECT_WITH_REFS: &str = "SELECT e.*, \
     d.device_id AS device_external_id, d.name AS device_name, d.location AS device_location, \
     u.name AS user_name \
     FROM cough_events e \
     LEFT JOIN devices d ON d.guid = e.device_guid \
     LEFT JOIN users u ON u.guid = e.user_guid";

/// Cough event row with related display fields resolved
#[derive(Debug, sqlx::FromRow)]
pub struct CoughEventWithRefs {
    #[sqlx(flatten)]
    pub event: CoughEvent,
    pub device_external_id: Option<String>,
    pub device_name: Option<String>,
    pub device_location: Option<String>,
    pub user_name: Option<String>,
}

impl CoughEventWithRefs {
    /// Assemble the display view; `notes` is empty for list responses
    pub fn into_view(self, notes: Vec<NoteView>) -> CoughEventView {
        let device = match (self.event.device_guid.clone(), self.device_name) {
            (Some(guid), Some(name)) => Some(DeviceSummary {
                guid,
                device_id: self.device_external_id.unwrap_or_default(),
                name,
                location: self.device_location,
            }),
            _ => None,
        };
        let user = match (self.event.user_guid.clone(), self.user_name) {
            (Some(guid), Some(name)) => Some(ActorInfo { guid, name }),
            _ => None,
        };
        let detection_result = self.event.detection_result();
        CoughEventView {
            event: self.event,
            detection_result,
            device,
            user,
            notes,
        }
    }
}

/// List filter; all fields optional and combined with AND
#[derive(Debug, Default, Clone)]
pub struct CoughFilter {
    pub status: Option<CoughStatus>,
    pub device_guid: Option<String>,
    pub user_guid: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

fn where_clause(filter: &CoughFilter) -> (String, Vec<String>) {
    let mut conditions: Vec<&str> = Vec::new();
    let mut binds: Vec<String> = Vec::new();

    if let Some(status) = filter.status {
        conditions.push("e.status = ?");
        binds.push(status.as_str().to_string());
    }
    if let Some(device_guid) = &filter.device_guid {
        conditions.push("e.device_guid = ?");
        binds.push(device_guid.clone());
    }
    if let Some(user_guid) = &filter.user_guid {
        conditions.push("e.user_guid = ?");
        binds.push(user_guid.clone());
    }
    if let Some(from) = filter.from {
        conditions.push("e.timestamp >= ?");
        binds.push(from.to_rfc3339());
    }
    if let Some(until) = filter.until {
        conditions.push("e.timestamp <= ?");
        binds.push(until.to_rfc3339());
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    (clause, binds)
}

pub async fn insert(pool: &SqlitePool, event: &CoughEvent) -> Result<()> {
    sqlx::query(
        "INSERT INTO cough_events (guid, user_guid, device_guid, timestamp, direction_of_arrival, \
         audio_path, status, is_tb_cough, confidence_score, acknowledged_by, acknowledged_at, \
         created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&event.guid)
    .bind(&event.user_guid)
    .bind(&event.device_guid)
    .bind(event.timestamp.to_rfc3339())
    .bind(event.direction_of_arrival)
    .bind(&event.audio_path)
    .bind(event.status)
    .bind(event.is_tb_cough)
    .bind(event.confidence_score)
    .bind(&event.acknowledged_by)
    .bind(event.acknowledged_at.map(|t| t.to_rfc3339()))
    .bind(event.created_at.to_rfc3339())
    .bind(event.updated_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, guid: &str) -> Result<Option<CoughEvent>> {
    let event = sqlx::query_as::<_, CoughEvent>("SELECT * FROM cough_events WHERE guid = ?")
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(event)
}

pub async fn find_with_refs(pool: &SqlitePool, guid: &str) -> Result<Option<CoughEventWithRefs>> {
    let sql = format!("{} WHERE e.guid = ?", SELECT_WITH_REFS);
    let row = sqlx::query_as::<_, CoughEventWithRefs>(&sql)
        .bind(guid)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Set the detection result and derived status
pub async fn update_result(
    pool: &SqlitePool,
    guid: &str,
    result: &DetectionResult,
    status: CoughStatus,
    now: DateTime<Utc>,
) -> Result<u64> {
    let done = sqlx::query(
        "UPDATE cough_events SET is_tb_cough = ?, confidence_score = ?, status = ?, updated_at = ? \
         WHERE guid = ?",
    )
    .bind(result.is_tb_cough)
    .bind(result.confidence_score)
    .bind(status)
    .bind(now.to_rfc3339())
    .bind(guid)
    .execute(pool)
    .await?;
    Ok(done.rows_affected())
}

/// Page of events, most recent capture first
pub async fn list(
    pool: &SqlitePool,
    filter: &CoughFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<CoughEventWithRefs>> {
    let (clause, binds) = where_clause(filter);
    let sql = format!(
        "{}{} ORDER BY e.timestamp DESC, e.rowid DESC LIMIT ? OFFSET ?",
        SELECT_WITH_REFS, clause
    );
    let mut query = sqlx::query_as::<_, CoughEventWithRefs>(&sql);
    for bind in &binds {
        query = query.bind(bind.as_str());
    }
    let rows = query.bind(limit).bind(offset).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn count(pool: &SqlitePool, filter: &CoughFilter) -> Result<i64> {
    let (clause, binds) = where_clause(filter);
    let sql = format!("SELECT COUNT(*) FROM cough_events e{}", clause);
    let mut query = sqlx::query_scalar::<_, i64>(&sql);
    for bind in &binds {
        query = query.bind(bind.as_str());
    }
    let total = query.fetch_one(pool).await?;
    Ok(total)
}

pub async fn delete(pool: &SqlitePool, guid: &str) -> Result<u64> {
    let done = sqlx::query("DELETE FROM cough_events WHERE guid = ?")
        .bind(guid)
        .execute(pool)
        .await?;
    Ok(done.rows_affected())
}

/// Count events created since `since`, optionally restricted to a status
pub async fn count_created_since(
    pool: &SqlitePool,
    status: Option<CoughStatus>,
    since: DateTime<Utc>,
) -> Result<i64> {
    let total = match status {
        Some(status) => {
            sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM cough_events WHERE status = ? AND created_at >= ?",
            )
            .bind(status)
            .bind(since.to_rfc3339())
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cough_events WHERE created_at >= ?")
                .bind(since.to_rfc3339())
                .fetch_one(pool)
                .await?
        }
    };
    Ok(total)
}

// ========================================
// Notes
// ========================================

pub async fn insert_note(pool: &SqlitePool, note: &CoughNote) -> Result<()> {
    sqlx::query(
        "INSERT INTO cough_notes (guid, cough_guid, author_guid, content, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&note.guid)
    .bind(&note.cough_guid)
    .bind(&note.author_guid)
    .bind(&note.content)
    .bind(note.created_at.to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct NoteRow {
    guid: String,
    content: String,
    created_at: DateTime<Utc>,
    author_guid: String,
    author_name: Option<String>,
}

/// Notes for an event, most recent first
pub async fn notes_for_event(pool: &SqlitePool, cough_guid: &str) -> Result<Vec<NoteView>> {
    let rows = sqlx::query_as::<_, NoteRow>(
        "SELECT n.guid, n.content, n.created_at, n.author_guid, u.name AS author_name \
         FROM cough_notes n \
         LEFT JOIN users u ON u.guid = n.author_guid \
         WHERE n.cough_guid = ? \
         ORDER BY n.created_at DESC, n.rowid DESC",
    )
    .bind(cough_guid)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| NoteView {
            guid: row.guid,
            content: row.content,
            author: row.author_name.map(|name| ActorInfo {
                guid: row.author_guid,
                name,
            }),
            created_at: row.created_at,
        })
        .collect())
}
