//! Notifications driving the session registry end to end.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use common::types::MeetingUuid;
use rtms_client::actors::SessionRegistryHandle;
use rtms_client::errors::{ChannelKind, RtmsError};
use rtms_client::events::{EndReason, SessionEvent};
use rtms_client::notifications::{self, Notification};
use rtms_client::observability::HealthState;
use rtms_test_utils::fixtures::{self, SIGNALING_URL};
use rtms_test_utils::scenario::{bootstrap, next_ended};
use rtms_test_utils::{settle, MockRelay, MockTransport};
use tokio::sync::mpsc;

const MEETING_A: &str = "meeting-a";
const MEETING_B: &str = "meeting-b";

fn registry() -> (SessionRegistryHandle, MockRelay, mpsc::Receiver<SessionEvent>) {
    let (transport, relay) = MockTransport::pair();
    let (ctx, events) = fixtures::session_context(transport, 256);
    (SessionRegistryHandle::new(ctx), relay, events)
}

async fn notify(registry: &SessionRegistryHandle, raw: &str) -> Result<(), RtmsError> {
    notifications::apply(registry, notifications::parse(raw).unwrap()).await
}

#[tokio::test(start_paused = true)]
async fn test_started_notification_creates_streaming_session() {
    let (registry, mut relay, _events) = registry();

    notify(
        &registry,
        &fixtures::started_notification(MEETING_A, SIGNALING_URL),
    )
    .await
    .unwrap();

    let (_signaling, _media) = bootstrap(&mut relay).await;
    settle().await;

    let snapshot = registry
        .get_session(MeetingUuid::from(MEETING_A))
        .await
        .unwrap();
    assert_eq!(snapshot.meeting_uuid.as_str(), MEETING_A);
    assert_eq!(snapshot.stream_id.as_str(), fixtures::STREAM_ID);
    assert!(snapshot.signaling_open && snapshot.media_open);

    registry.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_stopped_notification_ends_and_removes_session() {
    let (registry, mut relay, mut events) = registry();

    notify(
        &registry,
        &fixtures::started_notification(MEETING_A, SIGNALING_URL),
    )
    .await
    .unwrap();
    let (signaling, media) = bootstrap(&mut relay).await;

    notify(&registry, &fixtures::stopped_notification(MEETING_A))
        .await
        .unwrap();

    assert_eq!(next_ended(&mut events).await, EndReason::Stopped);
    settle().await;
    assert!(signaling.is_closed());
    assert!(media.is_closed());

    let err = registry
        .get_session(MeetingUuid::from(MEETING_A))
        .await
        .unwrap_err();
    assert!(matches!(err, RtmsError::SessionNotFound(_)));

    // Stopping again reports the missing session
    let err = notify(&registry, &fixtures::stopped_notification(MEETING_A))
        .await
        .unwrap_err();
    assert!(matches!(err, RtmsError::SessionNotFound(_)));

    // The meeting can be started again
    notify(
        &registry,
        &fixtures::started_notification(MEETING_A, SIGNALING_URL),
    )
    .await
    .unwrap();
    let signaling = relay.next_connection().await;
    assert_eq!(signaling.channel, ChannelKind::Signaling);

    registry.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_start_is_rejected() {
    let (registry, mut relay, _events) = registry();
    let raw = fixtures::started_notification(MEETING_A, SIGNALING_URL);

    notify(&registry, &raw).await.unwrap();
    let err = notify(&registry, &raw).await.unwrap_err();
    assert!(matches!(err, RtmsError::SessionExists(_)));

    settle().await;
    let _signaling = relay.next_connection().await;
    assert_eq!(relay.attempt_count(ChannelKind::Signaling), 1);
    assert_eq!(registry.list_sessions().await.unwrap().len(), 1);

    registry.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_start_with_invalid_url_registers_nothing() {
    let (registry, relay, _events) = registry();

    let err = notify(
        &registry,
        &fixtures::started_notification(MEETING_A, "https://signal.relay.example"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RtmsError::InvalidRelayUrl(_)));

    settle().await;
    assert!(relay.attempts().is_empty());
    assert!(registry.list_sessions().await.unwrap().is_empty());

    registry.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_session_ending_on_its_own_leaves_registry() {
    let (registry, mut relay, mut events) = registry();

    notify(
        &registry,
        &fixtures::started_notification(MEETING_A, SIGNALING_URL),
    )
    .await
    .unwrap();

    let mut signaling = relay.next_connection().await;
    signaling.recv_json().await;
    signaling.send_json(fixtures::handshake_failed(15)).await;

    assert_eq!(
        next_ended(&mut events).await,
        EndReason::AuthenticationFailed {
            channel: ChannelKind::Signaling,
            status_code: 15,
        }
    );

    let err = registry
        .get_session(MeetingUuid::from(MEETING_A))
        .await
        .unwrap_err();
    assert!(matches!(err, RtmsError::SessionNotFound(_)));
    assert!(registry.list_sessions().await.unwrap().is_empty());

    registry.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_ignored_notifications_change_nothing() {
    let (registry, relay, _events) = registry();

    let notification =
        notifications::parse(r#"{"event":"endpoint.url_validation","payload":{}}"#).unwrap();
    assert_eq!(
        notification,
        Notification::Ignored("endpoint.url_validation".to_string())
    );
    notifications::apply(&registry, notification).await.unwrap();

    settle().await;
    assert!(relay.attempts().is_empty());
    assert!(registry.list_sessions().await.unwrap().is_empty());

    registry.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_ends_every_session() {
    let (registry, mut relay, mut events) = registry();

    for meeting in [MEETING_A, MEETING_B] {
        notify(
            &registry,
            &fixtures::started_notification(meeting, SIGNALING_URL),
        )
        .await
        .unwrap();
    }
    let _first = relay.next_connection().await;
    let _second = relay.next_connection().await;

    let listed: Vec<_> = registry
        .list_sessions()
        .await
        .unwrap()
        .into_iter()
        .map(|snapshot| snapshot.meeting_uuid.to_string())
        .collect();
    assert_eq!(listed, vec![MEETING_A.to_string(), MEETING_B.to_string()]);

    registry.shutdown().await.unwrap();
    assert_eq!(next_ended(&mut events).await, EndReason::Shutdown);
    assert_eq!(next_ended(&mut events).await, EndReason::Shutdown);
    assert!(registry.wait_closed(Duration::from_secs(35)).await);

    settle().await;
    assert_eq!(relay.live_count(ChannelKind::Signaling), 0);
    assert!(relay.try_next_connection().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_the_handle_shuts_down_live_sessions() {
    let (registry, mut relay, mut events) = registry();
    let health = HealthState::new(registry.child_token());

    notify(
        &registry,
        &fixtures::started_notification(MEETING_A, SIGNALING_URL),
    )
    .await
    .unwrap();
    let (signaling, media) = bootstrap(&mut relay).await;
    assert!(health.is_live());

    // Sessions hold the registry mailbox weakly, so this closes it
    drop(registry);

    assert_eq!(next_ended(&mut events).await, EndReason::Shutdown);
    settle().await;
    assert!(signaling.is_closed());
    assert!(media.is_closed());
    assert!(!health.is_live());
}
