//! Notification manager tests
//!
//! Creation fan-out, unread listing, and first-acknowledgment-wins semantics
//! including the concurrent race.

mod helpers;

use helpers::{seed_device, seed_user, submit_event, test_state};
use tbvector_common::db::models::{ActorInfo, UserRole};
use tbvector_common::Error;
use tbvector_mon::AppState;
use tempfile::TempDir;

/// Seed one device, one event, one positive detection; returns the unread
/// notification id.
async fn setup_with_positive() -> (TempDir, AppState, String) {
    let (tmp, state) = test_state().await;
    seed_device(&state.db, "EDGE-001", "Ward 3 kiosk").await;
    let created = submit_event(&state, "EDGE-001").await;
    state
        .lifecycle()
        .record_external_detection(&created.event.guid, 1, 0.92)
        .await
        .unwrap();

    let unread = state.notifications().list_unread().await.unwrap();
    assert_eq!(unread.unread_count, 1);
    let id = unread.notifications[0].notification.guid.clone();
    (tmp, state, id)
}

async fn actor(state: &AppState, username: &str, name: &str) -> ActorInfo {
    let (guid, _token) = seed_user(&state.db, username, name, UserRole::User).await;
    ActorInfo {
        guid,
        name: name.to_string(),
    }
}

#[tokio::test]
async fn notification_carries_event_context() {
    let (_tmp, state, id) = setup_with_positive().await;

    let unread = state.notifications().list_unread().await.unwrap();
    let view = &unread.notifications[0];
    assert_eq!(view.notification.guid, id);
    let context = view.cough_event.as_ref().expect("context should be attached");
    assert_eq!(context.device_name.as_deref(), Some("Ward 3 kiosk"));
}

#[tokio::test]
async fn first_acknowledgment_wins_second_conflicts() {
    let (_tmp, state, id) = setup_with_positive().await;
    let user_a = actor(&state, "sari", "Dr. Sari").await;
    let user_b = actor(&state, "budi", "Dr. Budi").await;

    state.notifications().acknowledge(&id, &user_a).await.unwrap();

    let err = state
        .notifications()
        .acknowledge(&id, &user_b)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let unread = state.notifications().list_unread().await.unwrap();
    assert_eq!(unread.unread_count, 0);

    let row = tbvector_mon::db::notifications::find_by_id(&state.db, &id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.acknowledged_by.as_deref(), Some(user_a.guid.as_str()));
    assert!(row.acknowledged_at.is_some());
}

#[tokio::test]
async fn concurrent_acknowledgments_yield_exactly_one_winner() {
    let (_tmp, state, id) = setup_with_positive().await;
    let user_a = actor(&state, "sari", "Dr. Sari").await;
    let user_b = actor(&state, "budi", "Dr. Budi").await;

    let manager_a = state.notifications();
    let manager_b = state.notifications();
    let (r1, r2) = tokio::join!(
        manager_a.acknowledge(&id, &user_a),
        manager_b.acknowledge(&id, &user_b)
    );

    assert!(
        r1.is_ok() ^ r2.is_ok(),
        "exactly one acknowledgment must succeed: {:?} / {:?}",
        r1,
        r2
    );
    let loser = if r1.is_ok() { r2 } else { r1 };
    assert!(matches!(loser.unwrap_err(), Error::Conflict(_)));

    // Final state has exactly one acknowledger
    let row = tbvector_mon::db::notifications::find_by_id(&state.db, &id)
        .await
        .unwrap()
        .unwrap();
    assert!(row.acknowledged_by.is_some());
}

#[tokio::test]
async fn acknowledge_unknown_notification_fails_not_found() {
    let (_tmp, state) = test_state().await;
    let user = actor(&state, "sari", "Dr. Sari").await;

    let err = state
        .notifications()
        .acknowledge("missing", &user)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn acknowledgment_broadcasts_actor_identity() {
    let (_tmp, state, id) = setup_with_positive().await;
    let user = actor(&state, "sari", "Dr. Sari").await;

    let mut rx = state.bus.subscribe();
    state.notifications().acknowledge(&id, &user).await.unwrap();

    let event = rx.try_recv().expect("Should broadcast acknowledgment");
    assert_eq!(event.event_type(), "cough_notification:acknowledged");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["notification_id"], id.as_str());
    assert_eq!(json["user"]["name"], "Dr. Sari");
}

#[tokio::test]
async fn unread_list_is_most_recent_first() {
    let (_tmp, state) = test_state().await;
    seed_device(&state.db, "EDGE-001", "Ward 3 kiosk").await;

    let first = submit_event(&state, "EDGE-001").await;
    let second = submit_event(&state, "EDGE-001").await;
    state
        .lifecycle()
        .record_external_detection(&first.event.guid, 1, 0.8)
        .await
        .unwrap();
    state
        .lifecycle()
        .record_external_detection(&second.event.guid, 1, 0.9)
        .await
        .unwrap();

    let unread = state.notifications().list_unread().await.unwrap();
    assert_eq!(unread.unread_count, 2);
    assert_eq!(
        unread.notifications[0].notification.cough_guid,
        second.event.guid
    );
    assert_eq!(
        unread.notifications[1].notification.cough_guid,
        first.event.guid
    );
}

#[tokio::test]
async fn repeated_positive_results_create_multiple_notifications() {
    // No uniqueness across notifications for the same event
    let (_tmp, state) = test_state().await;
    seed_device(&state.db, "EDGE-001", "Ward 3 kiosk").await;
    let created = submit_event(&state, "EDGE-001").await;

    state
        .lifecycle()
        .record_external_detection(&created.event.guid, 1, 0.8)
        .await
        .unwrap();
    state
        .lifecycle()
        .record_external_detection(&created.event.guid, 1, 0.9)
        .await
        .unwrap();

    let unread = state.notifications().list_unread().await.unwrap();
    assert_eq!(unread.unread_count, 2);
}
