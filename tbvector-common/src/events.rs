//! Event types and EventBus for the TBVector monitoring backend
//!
//! Events are broadcast via the EventBus and serialized for SSE transmission
//! to connected staff UIs. Delivery is best-effort: no persistence, no replay.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::db::models::{ActorInfo, CoughEventView, CoughStatus, NotificationView};

/// TBVector broadcast event types
///
/// Each variant carries a JSON-serializable snapshot of the affected record.
/// The serialized form tags the variant under `"type"`; the SSE event name
/// comes from [`TbEvent::event_type`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TbEvent {
    /// A cough event was created and is awaiting classification
    CoughEventNew {
        event: CoughEventView,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The external classifier resolved a cough event
    CoughDetectionComplete {
        cough_id: String,
        status: CoughStatus,
        confidence_score: f64,
        /// Display name of the device or user that submitted the recording
        submitter: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A positive-result notification was created
    CoughNotificationNew {
        notification: NotificationView,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A notification was acknowledged by a staff member
    CoughNotificationAcknowledged {
        notification_id: String,
        user: ActorInfo,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TbEvent {
    /// Event name used for SSE transmission and client-side filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            TbEvent::CoughEventNew { .. } => "cough_event:new",
            TbEvent::CoughDetectionComplete { .. } => "cough_event:detection_complete",
            TbEvent::CoughNotificationNew { .. } => "cough_notification:new",
            TbEvent::CoughNotificationAcknowledged { .. } => "cough_notification:acknowledged",
        }
    }
}

/// Central event distribution bus for application-wide events
///
/// Wraps tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
///
/// Constructed once at startup and injected into the services that publish;
/// there is no process-global instance.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TbEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// `capacity` is the number of events buffered before old events are
    /// dropped for lagging subscribers.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<TbEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: TbEvent) -> Result<usize, broadcast::error::SendError<TbEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// The bus gives no delivery guarantee; UI updates are best-effort.
    pub fn emit_lossy(&self, event: TbEvent) {
        let _ = self.tx.send(event);
    }

    /// Current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_ack_event() -> TbEvent {
        TbEvent::CoughNotificationAcknowledged {
            notification_id: "n1".to_string(),
            user: ActorInfo {
                guid: "u1".to_string(),
                name: "Dr. Sari".to_string(),
            },
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn event_bus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn event_bus_delivers_to_all_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(sample_ack_event()).expect("emit should succeed");

        let r1 = rx1.try_recv().expect("rx1 should receive");
        let r2 = rx2.try_recv().expect("rx2 should receive");
        assert_eq!(r1.event_type(), "cough_notification:acknowledged");
        assert_eq!(r2.event_type(), "cough_notification:acknowledged");
    }

    #[test]
    fn emit_lossy_without_subscribers_does_not_panic() {
        let bus = EventBus::new(2);
        for _ in 0..10 {
            bus.emit_lossy(sample_ack_event());
        }
    }

    #[test]
    fn event_type_names_match_wire_protocol() {
        let detection = TbEvent::CoughDetectionComplete {
            cough_id: "e1".to_string(),
            status: CoughStatus::PositiveTb,
            confidence_score: 0.92,
            submitter: Some("Ward 3 kiosk".to_string()),
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(detection.event_type(), "cough_event:detection_complete");
        assert_eq!(sample_ack_event().event_type(), "cough_notification:acknowledged");
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_string(&sample_ack_event()).unwrap();
        assert!(json.contains("\"type\":\"CoughNotificationAcknowledged\""));
        assert!(json.contains("\"notification_id\":\"n1\""));
        assert!(json.contains("\"name\":\"Dr. Sari\""));
    }
}
