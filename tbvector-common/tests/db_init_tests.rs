//! Database initialization tests
//!
//! Verifies schema creation, idempotency, and the uniqueness constraint on
//! device identifiers.

use sqlx::Row;
use tbvector_common::db::init_database;
use tempfile::TempDir;

async fn setup() -> (TempDir, sqlx::SqlitePool) {
    let temp_dir = TempDir::new().expect("Should create temp dir");
    let db_path = temp_dir.path().join("tbvector.db");
    let pool = init_database(&db_path)
        .await
        .expect("Should initialize database");
    (temp_dir, pool)
}

#[tokio::test]
async fn creates_all_tables() {
    let (_tmp, pool) = setup().await;

    let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
        .fetch_all(&pool)
        .await
        .unwrap();
    let tables: Vec<String> = rows.iter().map(|r| r.get::<String, _>(0)).collect();

    for expected in [
        "users",
        "sessions",
        "devices",
        "cough_events",
        "cough_notes",
        "cough_notifications",
    ] {
        assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
    }
}

#[tokio::test]
async fn init_is_idempotent() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("tbvector.db");

    let pool = init_database(&db_path).await.unwrap();
    drop(pool);

    // Second open against the same file must not fail
    let pool = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cough_events")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn device_id_is_unique() {
    let (_tmp, pool) = setup().await;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO devices (guid, device_id, name, status, created_at, updated_at)
         VALUES (?, ?, ?, 'OFFLINE', ?, ?)",
    )
    .bind("d1")
    .bind("EDGE-001")
    .bind("Ward 3 kiosk")
    .bind(&now)
    .bind(&now)
    .execute(&pool)
    .await
    .unwrap();

    let duplicate = sqlx::query(
        "INSERT INTO devices (guid, device_id, name, status, created_at, updated_at)
         VALUES (?, ?, ?, 'OFFLINE', ?, ?)",
    )
    .bind("d2")
    .bind("EDGE-001")
    .bind("Another kiosk")
    .bind(&now)
    .bind(&now)
    .execute(&pool)
    .await;

    assert!(duplicate.is_err(), "duplicate device_id should be rejected");
}

#[tokio::test]
async fn deleting_cough_event_cascades_notes() {
    let (_tmp, pool) = setup().await;
    let now = chrono::Utc::now().to_rfc3339();

    sqlx::query("INSERT INTO users (guid, username, name, role, created_at) VALUES (?, ?, ?, 'USER', ?)")
        .bind("u1")
        .bind("sari")
        .bind("Dr. Sari")
        .bind(&now)
        .execute(&pool)
        .await
        .unwrap();

    sqlx::query(
        "INSERT INTO cough_events (guid, timestamp, audio_path, status, created_at, updated_at)
         VALUES (?, ?, ?, 'ANALYZING', ?, ?)",
    )
    .bind("e1")
    .bind(&now)
    .bind("uploads/a.wav")
    .bind(&now)
    .bind(&now)
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO cough_notes (guid, cough_guid, author_guid, content, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind("n1")
    .bind("e1")
    .bind("u1")
    .bind("Follow up on Monday")
    .bind(&now)
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query("DELETE FROM cough_events WHERE guid = 'e1'")
        .execute(&pool)
        .await
        .unwrap();

    let notes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cough_notes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(notes, 0, "notes should cascade with their cough event");
}
