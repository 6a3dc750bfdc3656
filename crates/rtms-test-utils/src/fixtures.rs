//! Pre-configured test data for RTMS client tests.
//!
//! Provides builders for:
//! - Relay messages in wire JSON form
//! - Stream start/stop notifications
//! - Session identities, signers and contexts

use crate::mock_transport::MockTransport;
use base64::Engine;
use common::secret::SecretString;
use common::types::{MeetingUuid, StreamId};
use rtms_client::actors::{ActorMetrics, SessionContext, SessionSettings, StartSession};
use rtms_client::events::{EventSink, SessionEvent};
use rtms_client::signature::Signer;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;

pub const SIGNALING_URL: &str = "wss://signal.relay.example/signaling";
pub const MEDIA_URL: &str = "wss://media.relay.example/media";
pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const STREAM_ID: &str = "stream-0001";

#[must_use]
pub fn test_signer() -> Signer {
    Signer::new(CLIENT_ID.to_string(), SecretString::from(CLIENT_SECRET))
}

/// Session context over `transport` with default settings.
#[must_use]
pub fn session_context(
    transport: MockTransport,
    event_capacity: usize,
) -> (SessionContext, mpsc::Receiver<SessionEvent>) {
    let (events, receiver) = EventSink::channel(event_capacity);
    let ctx = SessionContext {
        transport: Arc::new(transport),
        signer: test_signer(),
        settings: SessionSettings::default(),
        events,
        metrics: ActorMetrics::new(),
    };
    (ctx, receiver)
}

/// Start request for `meeting` against [`SIGNALING_URL`].
#[must_use]
pub fn start_session(meeting: &str) -> StartSession {
    StartSession {
        meeting_uuid: MeetingUuid::from(meeting),
        stream_id: StreamId::from(STREAM_ID),
        relay_url: SIGNALING_URL.to_string(),
    }
}

// ============================================================================
// Signaling
// ============================================================================

/// `HANDSHAKE_RESPONSE` accepting the client and advertising `media_url`.
#[must_use]
pub fn handshake_ok(media_url: &str) -> Value {
    json!({
        "msg_type": 2,
        "protocol_version": 1,
        "status_code": 0,
        "media_server": {
            "server_urls": {
                "all": media_url,
                "audio": media_url,
                "video": media_url,
                "transcript": media_url
            },
            "srtp_keys": {}
        }
    })
}

/// `HANDSHAKE_RESPONSE` rejecting the client.
#[must_use]
pub fn handshake_failed(status_code: i64) -> Value {
    json!({
        "msg_type": 2,
        "protocol_version": 1,
        "status_code": status_code,
        "reason": "rejected"
    })
}

/// `EVENT` for a participant or speaker change.
#[must_use]
pub fn relay_event(event_type: u32, user_id: u64, user_name: &str) -> Value {
    json!({
        "msg_type": 6,
        "event": {
            "event_type": event_type,
            "user_id": user_id,
            "user_name": user_name,
            "timestamp": 1_700_000_000_000_i64
        }
    })
}

/// `STREAM_STATE`.
#[must_use]
pub fn stream_state(state: i64, reason: i64) -> Value {
    json!({ "msg_type": 8, "state": state, "reason": reason })
}

/// `STREAM_STATE` reporting that the meeting ended.
#[must_use]
pub fn meeting_ended() -> Value {
    stream_state(4, 6)
}

/// `KEEP_ALIVE_REQUEST`.
#[must_use]
pub fn keep_alive_request(timestamp: i64) -> Value {
    json!({ "msg_type": 12, "timestamp": timestamp })
}

// ============================================================================
// Media
// ============================================================================

/// `DATA_HANDSHAKE_RESPONSE` accepting the data handshake.
#[must_use]
pub fn data_handshake_ok() -> Value {
    json!({
        "msg_type": 4,
        "protocol_version": 1,
        "status_code": 0,
        "sequence": 0,
        "payload_encrypted": false
    })
}

#[must_use]
pub fn data_handshake_failed(status_code: i64) -> Value {
    json!({
        "msg_type": 4,
        "protocol_version": 1,
        "status_code": status_code
    })
}

fn binary_frame(msg_type: u32, user_id: u64, user_name: &str, payload: &[u8], timestamp: i64) -> Value {
    json!({
        "msg_type": msg_type,
        "content": {
            "user_id": user_id,
            "user_name": user_name,
            "data": base64::engine::general_purpose::STANDARD.encode(payload),
            "timestamp": timestamp
        }
    })
}

/// `MEDIA_DATA_VIDEO` carrying `payload`.
#[must_use]
pub fn video_frame(user_id: u64, user_name: &str, payload: &[u8], timestamp: i64) -> Value {
    binary_frame(15, user_id, user_name, payload, timestamp)
}

/// `MEDIA_DATA_AUDIO` carrying `payload`.
#[must_use]
pub fn audio_frame(user_id: u64, user_name: &str, payload: &[u8], timestamp: i64) -> Value {
    binary_frame(14, user_id, user_name, payload, timestamp)
}

/// `MEDIA_DATA_TRANSCRIPT` carrying `text`.
#[must_use]
pub fn transcript_frame(user_id: u64, user_name: &str, text: &str, timestamp: i64) -> Value {
    json!({
        "msg_type": 17,
        "content": {
            "user_id": user_id,
            "user_name": user_name,
            "data": text,
            "timestamp": timestamp
        }
    })
}

// ============================================================================
// Notifications
// ============================================================================

#[must_use]
pub fn started_notification(meeting: &str, server_urls: &str) -> String {
    json!({
        "event": "meeting.rtms_started",
        "payload": {
            "meeting_uuid": meeting,
            "rtms_stream_id": STREAM_ID,
            "server_urls": server_urls,
            "operator_id": "operator-1"
        }
    })
    .to_string()
}

#[must_use]
pub fn stopped_notification(meeting: &str) -> String {
    json!({
        "event": "meeting.rtms_stopped",
        "payload": {
            "meeting_uuid": meeting,
            "rtms_stream_id": STREAM_ID,
            "stop_reason": 6
        }
    })
    .to_string()
}
