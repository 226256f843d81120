//! Device management
//!
//! Registration, heartbeats, and the background sweep that flips silent
//! devices to OFFLINE.

use chrono::Utc;
use sqlx::SqlitePool;
use tbvector_common::db::models::{Device, DeviceStatus};
use tbvector_common::{Error, Result};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db;

/// A device with no heartbeat for this long is considered offline
const OFFLINE_AFTER_SECS: i64 = 3 * 60;

/// Sweep cadence for the background task
pub const SWEEP_PERIOD: std::time::Duration = std::time::Duration::from_secs(60);

/// Data for a new device registration
#[derive(Debug)]
pub struct CreateDevice {
    pub device_id: String,
    pub name: String,
    pub location: Option<String>,
}

/// Partial update of device display fields
#[derive(Debug, Default)]
pub struct UpdateDevice {
    pub name: Option<String>,
    pub location: Option<String>,
}

/// Device manager; cheap to construct per request
pub struct DeviceManager {
    db: SqlitePool,
}

impl DeviceManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Register a device; the external identifier must be unique
    pub async fn create(&self, data: CreateDevice) -> Result<Device> {
        if db::devices::find_by_device_id(&self.db, &data.device_id)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(format!(
                "Device with ID '{}' already exists",
                data.device_id
            )));
        }

        let now = Utc::now();
        let device = Device {
            guid: Uuid::new_v4().to_string(),
            device_id: data.device_id,
            name: data.name,
            location: data.location,
            status: DeviceStatus::Offline,
            last_heartbeat: None,
            created_at: now,
            updated_at: now,
        };
        db::devices::insert(&self.db, &device).await?;
        Ok(device)
    }

    pub async fn list(&self) -> Result<Vec<Device>> {
        db::devices::list_all(&self.db).await
    }

    /// Lookup by the externally-assigned device identifier
    pub async fn get(&self, device_id: &str) -> Result<Device> {
        db::devices::find_by_device_id(&self.db, device_id)
            .await?
            .ok_or_else(|| Error::NotFound("Device not found".to_string()))
    }

    pub async fn update(&self, guid: &str, data: UpdateDevice) -> Result<Device> {
        let updated = db::devices::update_info(
            &self.db,
            guid,
            data.name.as_deref(),
            data.location.as_deref(),
            Utc::now(),
        )
        .await?;
        if updated == 0 {
            return Err(Error::NotFound("Device not found".to_string()));
        }
        db::devices::find_by_guid(&self.db, guid)
            .await?
            .ok_or_else(|| Error::NotFound("Device not found".to_string()))
    }

    pub async fn delete(&self, guid: &str) -> Result<Device> {
        let device = db::devices::find_by_guid(&self.db, guid)
            .await?
            .ok_or_else(|| Error::NotFound("Device not found".to_string()))?;
        db::devices::delete(&self.db, guid).await?;
        Ok(device)
    }

    /// Record a heartbeat: device goes ONLINE with a fresh timestamp
    pub async fn heartbeat(&self, device_id: &str) -> Result<Device> {
        db::devices::set_online(&self.db, device_id, Utc::now())
            .await?
            .ok_or_else(|| Error::NotFound(format!("Device with ID '{}' not found", device_id)))
    }

    /// Flip ONLINE devices with stale heartbeats to OFFLINE, one at a time.
    ///
    /// Returns how many devices were updated.
    pub async fn sweep_offline(&self) -> Result<usize> {
        let threshold = Utc::now() - chrono::Duration::seconds(OFFLINE_AFTER_SECS);
        let stale = db::devices::stale_online(&self.db, threshold).await?;
        if stale.is_empty() {
            return Ok(0);
        }

        info!("Marking {} device(s) OFFLINE after missed heartbeats", stale.len());
        let now = Utc::now();
        for device in &stale {
            db::devices::set_offline(&self.db, &device.guid, now).await?;
        }
        Ok(stale.len())
    }
}

/// Background loop invoking the offline sweep on a fixed cadence
pub async fn run_offline_sweeper(db: SqlitePool, period: std::time::Duration) {
    let manager = DeviceManager::new(db);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(e) = manager.sweep_offline().await {
            warn!("Device offline sweep failed: {}", e);
        }
    }
}
