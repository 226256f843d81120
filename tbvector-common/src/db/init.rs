//! Database initialization
//!
//! Creates the database file and schema on first run; every statement is
//! idempotent so startup is safe against an existing database.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Connect-time options apply to every pooled connection: foreign keys
    // must hold on all of them, WAL allows concurrent readers with one
    // writer.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_sessions_table(pool).await?;
    create_devices_table(pool).await?;
    create_cough_events_table(pool).await?;
    create_cough_notes_table(pool).await?;
    create_cough_notifications_table(pool).await?;
    Ok(())
}

async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            guid TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'USER',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    // Opaque bearer tokens; issuance lives outside this service
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_guid TEXT NOT NULL REFERENCES users(guid) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            expires_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_devices_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            guid TEXT PRIMARY KEY,
            device_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            location TEXT,
            status TEXT NOT NULL DEFAULT 'OFFLINE',
            last_heartbeat TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_devices_status ON devices(status)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_cough_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cough_events (
            guid TEXT PRIMARY KEY,
            user_guid TEXT REFERENCES users(guid),
            device_guid TEXT REFERENCES devices(guid),
            timestamp TEXT NOT NULL,
            direction_of_arrival REAL,
            audio_path TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'ANALYZING',
            is_tb_cough INTEGER,
            confidence_score REAL,
            acknowledged_by TEXT REFERENCES users(guid),
            acknowledged_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cough_events_timestamp ON cough_events(timestamp)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cough_events_status ON cough_events(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cough_events_device ON cough_events(device_guid)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_cough_notes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cough_notes (
            guid TEXT PRIMARY KEY,
            cough_guid TEXT NOT NULL REFERENCES cough_events(guid) ON DELETE CASCADE,
            author_guid TEXT NOT NULL REFERENCES users(guid),
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cough_notes_cough ON cough_notes(cough_guid)")
        .execute(pool)
        .await?;
    Ok(())
}

async fn create_cough_notifications_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cough_notifications (
            guid TEXT PRIMARY KEY,
            kind TEXT NOT NULL,
            message TEXT NOT NULL,
            cough_guid TEXT NOT NULL REFERENCES cough_events(guid),
            acknowledged_by TEXT REFERENCES users(guid),
            acknowledged_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_notifications_unread ON cough_notifications(acknowledged_by, created_at)",
    )
    .execute(pool)
    .await?;
    Ok(())
}
