//! Cough event lifecycle manager
//!
//! Owns every transition of a cough event from intake to resolution:
//! upload → ANALYZING → classifier callback → POSITIVE_TB / NEGATIVE_TB,
//! plus listing, notes, and deletion. Positive resolutions fan out to the
//! notification manager.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tbvector_common::db::models::{
    ActorInfo, CoughEvent, CoughEventView, CoughNote, CoughStatus, DetectionResult,
    NotificationKind,
};
use tbvector_common::events::{EventBus, TbEvent};
use tbvector_common::{Error, Result};
use tracing::warn;
use uuid::Uuid;

use crate::db;
use crate::services::classifier::{ClassifierHandle, ClassifierJob};
use crate::services::notifications::{CreateNotification, NotificationManager};
use crate::services::storage::AudioStorage;

/// Uploaded audio blob as received from the boundary
#[derive(Debug)]
pub struct AudioUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Submission metadata from either trust tier
#[derive(Debug, Default)]
pub struct SubmitMetadata {
    /// Externally-assigned device identifier (device-tier uploads)
    pub device_id: Option<String>,
    /// Authenticated submitter (user-tier uploads)
    pub user: Option<ActorInfo>,
    /// Capture timestamp; defaults to submission time
    pub timestamp: Option<DateTime<Utc>>,
    pub direction_of_arrival: Option<f64>,
}

/// List query: pagination plus optional filters
#[derive(Debug, Clone)]
pub struct ListQuery {
    /// 1-indexed page
    pub page: i64,
    pub limit: i64,
    pub status: Option<CoughStatus>,
    /// Inclusive range start, normalized to start of day
    pub start_date: Option<NaiveDate>,
    /// Inclusive range end, normalized to end of day
    pub end_date: Option<NaiveDate>,
    /// Externally-assigned device identifier
    pub device_id: Option<String>,
    /// Owning user guid
    pub user_guid: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            status: None,
            start_date: None,
            end_date: None,
            device_id: None,
            user_guid: None,
        }
    }
}

/// One page of cough events
#[derive(Debug)]
pub struct CoughPage {
    pub events: Vec<CoughEventView>,
    pub total: i64,
    pub page: i64,
    pub pages: i64,
}

/// Lifecycle manager; cheap to construct per request
pub struct CoughLifecycle {
    db: SqlitePool,
    bus: EventBus,
    storage: AudioStorage,
    classifier: ClassifierHandle,
    notifier: NotificationManager,
}

impl CoughLifecycle {
    pub fn new(
        db: SqlitePool,
        bus: EventBus,
        storage: AudioStorage,
        classifier: ClassifierHandle,
    ) -> Self {
        let notifier = NotificationManager::new(db.clone(), bus.clone());
        Self {
            db,
            bus,
            storage,
            classifier,
            notifier,
        }
    }

    /// Intake a new recording: persist the blob, create the ANALYZING record,
    /// broadcast it, and hand the audio to the classifier queue.
    ///
    /// The classifier dispatch never affects the returned result.
    pub async fn submit(&self, audio: AudioUpload, meta: SubmitMetadata) -> Result<CoughEventView> {
        // Resolve the device before touching storage so an unknown device
        // leaves no blob behind
        let device = match &meta.device_id {
            Some(device_id) => Some(
                db::devices::find_by_device_id(&self.db, device_id)
                    .await?
                    .ok_or_else(|| {
                        Error::NotFound(format!("Device with ID '{}' not found", device_id))
                    })?,
            ),
            None => None,
        };

        let audio_path = self
            .storage
            .save(audio.file_name.as_deref(), &audio.bytes)
            .await?;

        let now = Utc::now();
        let event = CoughEvent {
            guid: Uuid::new_v4().to_string(),
            user_guid: meta.user.as_ref().map(|u| u.guid.clone()),
            device_guid: device.as_ref().map(|d| d.guid.clone()),
            timestamp: meta.timestamp.unwrap_or(now),
            direction_of_arrival: meta.direction_of_arrival,
            audio_path: audio_path.clone(),
            status: CoughStatus::Analyzing,
            is_tb_cough: None,
            confidence_score: None,
            acknowledged_by: None,
            acknowledged_at: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db::cough_events::insert(&self.db, &event).await {
            // Compensating action: no orphaned blobs
            if let Err(cleanup) = self.storage.delete(&audio_path).await {
                warn!("Failed to remove blob after create failure: {}", cleanup);
            }
            return Err(e);
        }

        let view = self.get(&event.guid).await?;
        self.bus.emit_lossy(TbEvent::CoughEventNew {
            event: view.clone(),
            timestamp: Utc::now(),
        });

        let submitter_name =
            submitter_name(&view).unwrap_or_else(|| "unknown submitter".to_string());
        let file_name = audio.file_name.unwrap_or_else(|| "cough.wav".to_string());
        self.classifier.enqueue(ClassifierJob {
            record_id: event.guid.clone(),
            submitter_name,
            audio_path: self.storage.absolute(&audio_path),
            file_name,
        });

        Ok(view)
    }

    /// Device-tier result callback: set the detection result and derived
    /// status; positive results raise a notification.
    pub async fn record_result(
        &self,
        cough_id: &str,
        result: DetectionResult,
    ) -> Result<CoughEventView> {
        self.apply_result(cough_id, result, false).await
    }

    /// External-service callback. `status` and `confidence_score` are
    /// validated at the boundary (0/1 and [0,1]) before this runs.
    ///
    /// Additionally broadcasts `cough_event:detection_complete`.
    pub async fn record_external_detection(
        &self,
        record_id: &str,
        status: i64,
        confidence_score: f64,
    ) -> Result<CoughEventView> {
        let result = DetectionResult {
            is_tb_cough: status == 1,
            confidence_score,
        };
        self.apply_result(record_id, result, true).await
    }

    async fn apply_result(
        &self,
        cough_id: &str,
        result: DetectionResult,
        publish_detection: bool,
    ) -> Result<CoughEventView> {
        let existing = db::cough_events::find_by_id(&self.db, cough_id)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!("Cough event with ID '{}' not found", cough_id))
            })?;

        let status = if result.is_tb_cough {
            CoughStatus::PositiveTb
        } else {
            CoughStatus::NegativeTb
        };
        db::cough_events::update_result(&self.db, &existing.guid, &result, status, Utc::now())
            .await?;

        let view = self.get(&existing.guid).await?;

        if publish_detection {
            self.bus.emit_lossy(TbEvent::CoughDetectionComplete {
                cough_id: existing.guid.clone(),
                status,
                confidence_score: result.confidence_score,
                submitter: submitter_name(&view),
                timestamp: Utc::now(),
            });
        }

        if result.is_tb_cough {
            let message = match submitter_name(&view) {
                Some(name) => format!("TB-indicative cough detected from {}.", name),
                None => "TB-indicative cough detected.".to_string(),
            };
            self.notifier
                .create(CreateNotification {
                    kind: NotificationKind::PositiveTbResult,
                    message,
                    cough_guid: existing.guid.clone(),
                })
                .await?;
        }

        Ok(view)
    }

    /// Paginated, filtered listing (most recent capture first)
    pub async fn list(&self, query: &ListQuery) -> Result<CoughPage> {
        let page = query.page.max(1);
        let limit = query.limit.max(1);

        let mut filter = db::cough_events::CoughFilter {
            status: query.status,
            user_guid: query.user_guid.clone(),
            ..Default::default()
        };
        if let Some(date) = query.start_date {
            filter.from = Some(day_start(date));
        }
        if let Some(date) = query.end_date {
            filter.until = Some(day_end(date));
        }

        if let Some(device_id) = &query.device_id {
            match db::devices::find_by_device_id(&self.db, device_id).await? {
                Some(device) => filter.device_guid = Some(device.guid),
                // Unknown device filter means an empty page, not "no filter"
                None => {
                    return Ok(CoughPage {
                        events: Vec::new(),
                        total: 0,
                        page,
                        pages: 0,
                    })
                }
            }
        }

        let total = db::cough_events::count(&self.db, &filter).await?;
        let offset = (page - 1) * limit;
        let rows = db::cough_events::list(&self.db, &filter, limit, offset).await?;
        let events = rows.into_iter().map(|row| row.into_view(Vec::new())).collect();
        let pages = (total + limit - 1) / limit;

        Ok(CoughPage {
            events,
            total,
            page,
            pages,
        })
    }

    /// Full record with device/user display fields and notes
    pub async fn get(&self, id: &str) -> Result<CoughEventView> {
        let row = db::cough_events::find_with_refs(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Cough event with ID '{}' not found", id)))?;
        let notes = db::cough_events::notes_for_event(&self.db, id).await?;
        Ok(row.into_view(notes))
    }

    /// Prepend a staff note
    pub async fn add_note(
        &self,
        id: &str,
        content: &str,
        author: &ActorInfo,
    ) -> Result<CoughEventView> {
        if content.trim().is_empty() {
            return Err(Error::InvalidInput("Note content cannot be empty".to_string()));
        }

        let event = db::cough_events::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Cough event with ID '{}' not found", id)))?;

        let note = CoughNote {
            guid: Uuid::new_v4().to_string(),
            cough_guid: event.guid.clone(),
            author_guid: author.guid.clone(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        db::cough_events::insert_note(&self.db, &note).await?;

        self.get(&event.guid).await
    }

    /// Delete a record and its audio blob.
    ///
    /// The blob goes first; a blob-deletion failure aborts before the record
    /// delete so no record ever points at audio that silently vanished.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let event = db::cough_events::find_by_id(&self.db, id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Cough event with ID '{}' not found", id)))?;

        self.storage.delete(&event.audio_path).await?;
        db::cough_events::delete(&self.db, &event.guid).await?;
        Ok(())
    }
}

/// Display name of whoever submitted the recording
fn submitter_name(view: &CoughEventView) -> Option<String> {
    view.device
        .as_ref()
        .map(|d| d.name.clone())
        .or_else(|| view.user.as_ref().map(|u| u.name.clone()))
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn day_end(date: NaiveDate) -> DateTime<Utc> {
    day_start(date + chrono::Days::new(1)) - chrono::Duration::milliseconds(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bounds_cover_the_whole_day() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let start = day_start(date);
        let end = day_end(date);
        assert_eq!(start.to_rfc3339(), "2025-03-14T00:00:00+00:00");
        assert!(end.to_rfc3339().starts_with("2025-03-14T23:59:59"));
        assert!(start < end);
    }
}
