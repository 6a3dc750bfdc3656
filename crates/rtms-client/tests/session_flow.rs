//! Integration tests for a single session against the scripted relay.
//!
//! Covers the bootstrap sequence, keep-alive echo, frame and event
//! publication, terminal conditions and malformed input handling.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use bytes::Bytes;
use common::types::MeetingUuid;
use rtms_client::actors::{SessionActor, SessionActorHandle};
use rtms_client::channel::{MediaState, SignalingState};
use rtms_client::errors::ChannelKind;
use rtms_client::events::{EndReason, SessionEvent};
use rtms_client::frame::MediaKind;
use rtms_client::signature;
use rtms_test_utils::fixtures::{self, CLIENT_ID, CLIENT_SECRET, MEDIA_URL, SIGNALING_URL, STREAM_ID};
use rtms_test_utils::scenario::{bootstrap, next_ended, next_event};
use rtms_test_utils::{settle, MockRelay, MockTransport};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const MEETING: &str = "4TdtGaVIRRy8mbOrydBzTw==";

struct Harness {
    relay: MockRelay,
    events: mpsc::Receiver<SessionEvent>,
    handle: SessionActorHandle,
    task: JoinHandle<()>,
}

fn start() -> Harness {
    let (transport, relay) = MockTransport::pair();
    let (ctx, events) = fixtures::session_context(transport, 256);
    let (handle, task) = SessionActor::spawn(
        fixtures::start_session(MEETING),
        ctx,
        CancellationToken::new(),
        None,
    )
    .unwrap();

    Harness {
        relay,
        events,
        handle,
        task,
    }
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_sends_signed_handshakes_and_connects_media_once() {
    let mut h = start();
    let expected_signature = signature::sign(CLIENT_ID, MEETING, STREAM_ID, CLIENT_SECRET);

    let mut signaling = h.relay.next_connection().await;
    assert_eq!(signaling.channel, ChannelKind::Signaling);
    assert_eq!(signaling.url.as_str(), SIGNALING_URL);

    let handshake = signaling.recv_json().await;
    assert_eq!(handshake["msg_type"], 1);
    assert_eq!(handshake["protocol_version"], 1);
    assert_eq!(handshake["meeting_uuid"], MEETING);
    assert_eq!(handshake["rtms_stream_id"], STREAM_ID);
    assert_eq!(handshake["signature"], expected_signature.as_str());
    assert!(handshake["sequence"].is_u64());

    signaling
        .send_json(fixtures::handshake_ok(MEDIA_URL))
        .await;

    let subscribe = signaling.recv_json().await;
    assert_eq!(
        subscribe,
        json!({
            "msg_type": 5,
            "events": [
                { "event_type": 2, "subscribe": true },
                { "event_type": 3, "subscribe": true },
                { "event_type": 4, "subscribe": true }
            ]
        })
    );

    let mut media = h.relay.next_connection().await;
    assert_eq!(media.channel, ChannelKind::Media);
    assert_eq!(media.url.as_str(), MEDIA_URL);

    let data_handshake = media.recv_json().await;
    assert_eq!(data_handshake["msg_type"], 3);
    assert_eq!(data_handshake["meeting_uuid"], MEETING);
    assert_eq!(data_handshake["rtms_stream_id"], STREAM_ID);
    assert_eq!(data_handshake["signature"], expected_signature.as_str());
    assert_eq!(data_handshake["media_type"], 32);
    assert_eq!(data_handshake["payload_encryption"], false);
    assert!(data_handshake["media_params"].is_object());

    media.send_json(fixtures::data_handshake_ok()).await;
    let ready = signaling.recv_json().await;
    assert_eq!(ready, json!({ "msg_type": 7, "rtms_stream_id": STREAM_ID }));

    settle().await;
    assert_eq!(h.relay.attempt_count(ChannelKind::Media), 1);
    assert_eq!(h.relay.attempt_count(ChannelKind::Signaling), 1);

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.signaling_state, SignalingState::Ready);
    assert_eq!(snapshot.media_state, MediaState::Streaming);
    assert_eq!(snapshot.media_url.as_deref(), Some(MEDIA_URL));
    assert!(snapshot.signaling_open && snapshot.media_open);
    assert!(snapshot.reconnect);

    h.handle.cancel();
    assert_eq!(next_ended(&mut h.events).await, EndReason::Shutdown);
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_is_echoed_on_the_same_channel() {
    let mut h = start();
    let (mut signaling, mut media) = bootstrap(&mut h.relay).await;

    signaling
        .send_json(fixtures::keep_alive_request(1_700_000_000_111))
        .await;
    assert_eq!(
        signaling.recv_json().await,
        json!({ "msg_type": 13, "timestamp": 1_700_000_000_111_i64 })
    );

    media
        .send_json(fixtures::keep_alive_request(1_700_000_000_222))
        .await;
    assert_eq!(
        media.recv_json().await,
        json!({ "msg_type": 13, "timestamp": 1_700_000_000_222_i64 })
    );

    settle().await;
    assert!(signaling.try_recv_json().is_none(), "no echo on the other channel");
    assert!(media.try_recv_json().is_none(), "no echo on the other channel");

    let snapshot = h.handle.snapshot().await.unwrap();
    assert!(snapshot.signaling_keep_alive_ms.is_some());
    assert!(snapshot.media_keep_alive_ms.is_some());

    h.handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_media_frames_are_decoded_and_published() {
    let mut h = start();
    let (_signaling, media) = bootstrap(&mut h.relay).await;

    media
        .send_json(fixtures::video_frame(16_778_240, "Alice", &[0, 0, 0, 1, 0x65], 1_000))
        .await;
    media
        .send_json(fixtures::transcript_frame(16_778_240, "Alice", "hello there", 1_010))
        .await;

    let SessionEvent::Frame(video) = next_event(&mut h.events).await else {
        unreachable!("expected a video frame");
    };
    assert_eq!(video.meeting_uuid, MeetingUuid::from(MEETING));
    assert_eq!(video.kind, MediaKind::Video);
    assert_eq!(video.payload, Bytes::from_static(&[0, 0, 0, 1, 0x65]));
    assert_eq!(video.timestamp_ms, 1_000);
    assert_eq!(video.source.user_id, 16_778_240);
    assert_eq!(video.source.user_name, "Alice");
    assert!(!video.placeholder);

    let SessionEvent::Frame(transcript) = next_event(&mut h.events).await else {
        unreachable!("expected a transcript frame");
    };
    assert_eq!(transcript.kind, MediaKind::Transcript);
    assert_eq!(transcript.payload, Bytes::from_static(b"hello there"));

    h.handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_relay_events_are_published() {
    let mut h = start();
    let (signaling, _media) = bootstrap(&mut h.relay).await;

    signaling
        .send_json(fixtures::relay_event(3, 42, "Bob"))
        .await;

    let SessionEvent::Relay(event) = next_event(&mut h.events).await else {
        unreachable!("expected a relay event");
    };
    assert_eq!(event.meeting_uuid, MeetingUuid::from(MEETING));
    assert_eq!(event.event_type, 3);
    assert_eq!(event.user_id, Some(42));
    assert_eq!(event.user_name.as_deref(), Some("Bob"));

    h.handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_malformed_media_message_keeps_streaming() {
    let mut h = start();
    let (_signaling, media) = bootstrap(&mut h.relay).await;

    media.send_text("{this is not json").await;
    media.send_text(r#"{"msg_type": 99}"#).await;
    media.send_text(r#"{"msg_type": 15, "content": {"user_id": 1}}"#).await;
    media
        .send_json(fixtures::audio_frame(9, "Carol", b"pcm", 2_000))
        .await;

    let SessionEvent::Frame(frame) = next_event(&mut h.events).await else {
        unreachable!("expected the audio frame");
    };
    assert_eq!(frame.kind, MediaKind::Audio);
    assert_eq!(frame.payload, Bytes::from_static(b"pcm"));

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.media_state, MediaState::Streaming);
    assert!(snapshot.media_open);
    assert_eq!(h.relay.attempt_count(ChannelKind::Media), 1);

    h.handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_frames_before_data_handshake_are_discarded_and_counted() {
    let mut h = start();

    let mut signaling = h.relay.next_connection().await;
    signaling.recv_json().await;
    signaling
        .send_json(fixtures::handshake_ok(MEDIA_URL))
        .await;
    signaling.recv_json().await;

    let mut media = h.relay.next_connection().await;
    media.recv_json().await;
    media
        .send_json(fixtures::video_frame(7, "Dana", b"early", 1_000))
        .await;
    settle().await;

    let snapshot = h.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.media_state, MediaState::Authenticated);
    assert_eq!(snapshot.media_discarded_frames, 1);
    assert!(h.events.try_recv().is_err(), "no frame published");

    media.send_json(fixtures::data_handshake_ok()).await;
    media
        .send_json(fixtures::video_frame(7, "Dana", b"late", 1_040))
        .await;
    let SessionEvent::Frame(frame) = next_event(&mut h.events).await else {
        unreachable!("expected the streamed frame");
    };
    assert_eq!(frame.payload, Bytes::from_static(b"late"));
    assert_eq!(h.handle.snapshot().await.unwrap().media_discarded_frames, 1);

    h.handle.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_rejected_signaling_handshake_ends_session_without_retry() {
    let mut h = start();

    let mut signaling = h.relay.next_connection().await;
    signaling.recv_json().await;
    signaling.send_json(fixtures::handshake_failed(15)).await;

    assert_eq!(
        next_ended(&mut h.events).await,
        EndReason::AuthenticationFailed {
            channel: ChannelKind::Signaling,
            status_code: 15,
        }
    );
    h.task.await.unwrap();

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.relay.attempt_count(ChannelKind::Signaling), 1);
    assert_eq!(h.relay.attempt_count(ChannelKind::Media), 0);
    assert!(signaling.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_rejected_data_handshake_ends_session() {
    let mut h = start();

    let mut signaling = h.relay.next_connection().await;
    signaling.recv_json().await;
    signaling
        .send_json(fixtures::handshake_ok(MEDIA_URL))
        .await;
    signaling.recv_json().await;

    let mut media = h.relay.next_connection().await;
    media.recv_json().await;
    media.send_json(fixtures::data_handshake_failed(3)).await;

    assert_eq!(
        next_ended(&mut h.events).await,
        EndReason::AuthenticationFailed {
            channel: ChannelKind::Media,
            status_code: 3,
        }
    );
    h.task.await.unwrap();
    settle().await;

    assert_eq!(h.relay.live_count(ChannelKind::Signaling), 0);
    assert_eq!(h.relay.live_count(ChannelKind::Media), 0);
}

#[tokio::test(start_paused = true)]
async fn test_meeting_ended_closes_both_channels() {
    let mut h = start();
    let (signaling, media) = bootstrap(&mut h.relay).await;

    signaling.send_json(fixtures::meeting_ended()).await;

    assert_eq!(next_ended(&mut h.events).await, EndReason::MeetingEnded);
    h.task.await.unwrap();
    settle().await;

    assert!(signaling.is_closed());
    assert!(media.is_closed());
    assert_eq!(h.relay.live_count(ChannelKind::Signaling), 0);
    assert_eq!(h.relay.live_count(ChannelKind::Media), 0);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_media_url_ends_session() {
    let mut h = start();

    let mut signaling = h.relay.next_connection().await;
    signaling.recv_json().await;
    signaling
        .send_json(fixtures::handshake_ok("http://media.relay.example/not-ws"))
        .await;

    assert_eq!(next_ended(&mut h.events).await, EndReason::InvalidRelayUrl);
    h.task.await.unwrap();
    assert_eq!(h.relay.attempt_count(ChannelKind::Media), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_reconnect_after_stop_even_when_timer_fires() {
    let mut h = start();
    let (_signaling, media) = bootstrap(&mut h.relay).await;

    // Schedules a media-only reconnect
    media.close().await;
    settle().await;
    assert_eq!(
        h.handle.snapshot().await.unwrap().media_state,
        MediaState::Closed
    );

    h.handle.stop().await.unwrap();
    assert_eq!(next_ended(&mut h.events).await, EndReason::Stopped);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.relay.attempt_count(ChannelKind::Media), 1);
    assert_eq!(h.relay.attempt_count(ChannelKind::Signaling), 1);
    assert!(h.relay.try_next_connection().is_none());
    h.task.await.unwrap();
}
