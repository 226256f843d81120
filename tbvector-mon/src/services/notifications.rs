//! Cough notification manager
//!
//! Creation, unread listing, and single-acknowledgment-wins semantics.
//! Acknowledgment is enforced with an atomic conditional update at the store
//! layer, so two concurrent acknowledgments yield exactly one success and one
//! Conflict.

use chrono::Utc;
use sqlx::SqlitePool;
use tbvector_common::db::models::{ActorInfo, CoughNotification, NotificationKind, NotificationView};
use tbvector_common::events::{EventBus, TbEvent};
use tbvector_common::{Error, Result};
use uuid::Uuid;

use crate::db;

/// Data for a new notification
#[derive(Debug)]
pub struct CreateNotification {
    pub kind: NotificationKind,
    pub message: String,
    pub cough_guid: String,
}

/// Unread notifications plus their count
#[derive(Debug)]
pub struct UnreadNotifications {
    pub notifications: Vec<NotificationView>,
    pub unread_count: i64,
}

/// Notification manager; cheap to construct per request
pub struct NotificationManager {
    db: SqlitePool,
    bus: EventBus,
}

impl NotificationManager {
    pub fn new(db: SqlitePool, bus: EventBus) -> Self {
        Self { db, bus }
    }

    /// Persist a new unacknowledged notification and broadcast it with the
    /// originating-event context attached.
    ///
    /// Multiple positive results on the same event produce multiple
    /// notifications; there is no uniqueness constraint here.
    pub async fn create(&self, data: CreateNotification) -> Result<NotificationView> {
        let notification = CoughNotification {
            guid: Uuid::new_v4().to_string(),
            kind: data.kind,
            message: data.message,
            cough_guid: data.cough_guid,
            acknowledged_by: None,
            acknowledged_at: None,
            created_at: Utc::now(),
        };
        db::notifications::insert(&self.db, &notification).await?;

        let view = db::notifications::find_with_context(&self.db, &notification.guid)
            .await?
            .map(|row| row.into_view())
            .ok_or_else(|| Error::Internal("Notification missing after insert".to_string()))?;

        self.bus.emit_lossy(TbEvent::CoughNotificationNew {
            notification: view.clone(),
            timestamp: Utc::now(),
        });

        Ok(view)
    }

    /// All unacknowledged notifications, most recently created first
    pub async fn list_unread(&self) -> Result<UnreadNotifications> {
        let rows = db::notifications::list_unread(&self.db).await?;
        let unread_count = db::notifications::count_unread(&self.db).await?;
        Ok(UnreadNotifications {
            notifications: rows.into_iter().map(|row| row.into_view()).collect(),
            unread_count,
        })
    }

    /// Acknowledge a notification; first caller wins.
    ///
    /// The conditional update either claims the row or affects nothing; a
    /// follow-up read distinguishes "unknown id" from "already acknowledged".
    pub async fn acknowledge(&self, notification_id: &str, actor: &ActorInfo) -> Result<()> {
        let updated =
            db::notifications::try_acknowledge(&self.db, notification_id, &actor.guid, Utc::now())
                .await?;

        if updated == 0 {
            return match db::notifications::find_by_id(&self.db, notification_id).await? {
                None => Err(Error::NotFound("Notification not found".to_string())),
                Some(_) => Err(Error::Conflict(
                    "This notification has already been acknowledged by another user".to_string(),
                )),
            };
        }

        self.bus.emit_lossy(TbEvent::CoughNotificationAcknowledged {
            notification_id: notification_id.to_string(),
            user: actor.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }
}
