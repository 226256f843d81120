//! Dashboard statistics

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tbvector_common::db::models::CoughStatus;
use tbvector_common::Result;

use crate::db;

/// Aggregate counters shown on the staff dashboard
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    /// Positive TB events in the last 24 hours
    pub positive_last24h: i64,
    /// All events in the last 24 hours
    pub total_last24h: i64,
    /// Devices currently ONLINE
    pub active_devices: i64,
    /// All registered devices
    pub total_devices: i64,
}

pub struct DashboardService {
    db: SqlitePool,
}

impl DashboardService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Compute the dashboard counters; the four queries run concurrently
    pub async fn stats(&self) -> Result<DashboardStats> {
        let since = Utc::now() - chrono::Duration::hours(24);

        let (positive_last24h, total_last24h, active_devices, total_devices) = tokio::try_join!(
            db::cough_events::count_created_since(&self.db, Some(CoughStatus::PositiveTb), since),
            db::cough_events::count_created_since(&self.db, None, since),
            db::devices::count_online(&self.db),
            db::devices::count_all(&self.db),
        )?;

        Ok(DashboardStats {
            positive_last24h,
            total_last24h,
            active_devices,
            total_devices,
        })
    }
}
