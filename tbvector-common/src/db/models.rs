//! Database models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a cough event
///
/// Starts at `Analyzing` and is resolved by a classification callback.
/// Callers treat the transition as monotone; the store does not enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CoughStatus {
    Analyzing,
    PositiveTb,
    NegativeTb,
}

impl CoughStatus {
    /// Status string as stored in the database and sent over the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            CoughStatus::Analyzing => "ANALYZING",
            CoughStatus::PositiveTb => "POSITIVE_TB",
            CoughStatus::NegativeTb => "NEGATIVE_TB",
        }
    }
}

/// Connectivity status of an edge device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeviceStatus {
    Online,
    Offline,
}

/// Staff role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Admin,
}

/// Notification type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    PositiveTbResult,
}

/// Classification result attached to a resolved cough event
///
/// Field names mirror the device wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(rename = "isTBCough")]
    pub is_tb_cough: bool,
    #[serde(rename = "confidenceScore")]
    pub confidence_score: f64,
}

/// One submitted audio recording and its classification lifecycle
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CoughEvent {
    pub guid: String,
    /// Owning user (absent for anonymous device submissions)
    pub user_guid: Option<String>,
    /// Device the recording came from (absent for web uploads)
    pub device_guid: Option<String>,
    /// Capture timestamp reported by the submitter
    pub timestamp: DateTime<Utc>,
    /// Direction-of-arrival angle in degrees, if the device reported one
    pub direction_of_arrival: Option<f64>,
    /// Relative path of the stored audio blob
    pub audio_path: String,
    pub status: CoughStatus,
    pub is_tb_cough: Option<bool>,
    pub confidence_score: Option<f64>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CoughEvent {
    /// Detection result, present iff the event has been classified
    pub fn detection_result(&self) -> Option<DetectionResult> {
        match (self.is_tb_cough, self.confidence_score) {
            (Some(is_tb_cough), Some(confidence_score)) => Some(DetectionResult {
                is_tb_cough,
                confidence_score,
            }),
            _ => None,
        }
    }
}

/// Registered edge device
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub guid: String,
    /// Externally-assigned identifier, unique across all devices
    pub device_id: String,
    pub name: String,
    pub location: Option<String>,
    pub status: DeviceStatus,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Staff note attached to a cough event
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CoughNote {
    pub guid: String,
    pub cough_guid: String,
    pub author_guid: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Notification raised when a classification resolves positive
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CoughNotification {
    pub guid: String,
    pub kind: NotificationKind,
    pub message: String,
    /// Non-owning reference to the originating cough event
    pub cough_guid: String,
    pub acknowledged_by: Option<String>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Staff account (credentials and login flows live outside this service)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub guid: String,
    pub username: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

// ========================================
// Display views (API / event payloads)
// ========================================

/// Display identity of a user acting on a record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorInfo {
    pub guid: String,
    pub name: String,
}

/// Display summary of the device a record references
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub guid: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub name: String,
    pub location: Option<String>,
}

/// Note with its author resolved to a display identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteView {
    pub guid: String,
    pub content: String,
    pub author: Option<ActorInfo>,
    pub created_at: DateTime<Utc>,
}

/// Cough event with related display fields attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoughEventView {
    #[serde(flatten)]
    pub event: CoughEvent,
    #[serde(rename = "detectionResult")]
    pub detection_result: Option<DetectionResult>,
    pub device: Option<DeviceSummary>,
    pub user: Option<ActorInfo>,
    /// Most recent first; empty in list responses
    pub notes: Vec<NoteView>,
}

/// Originating-event context attached to a notification for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoughContext {
    pub guid: String,
    pub timestamp: DateTime<Utc>,
    pub status: CoughStatus,
    pub device_name: Option<String>,
}

/// Notification with its originating-event context attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    #[serde(flatten)]
    pub notification: CoughNotification,
    pub cough_event: Option<CoughContext>,
}
