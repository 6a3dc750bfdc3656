//! Session lifecycle notifications.
//!
//! The relay platform announces streams with webhook-style JSON:
//!
//! ```json
//! {"event":"meeting.rtms_started","payload":{"meeting_uuid":"..","rtms_stream_id":"..","server_urls":"wss://.."}}
//! {"event":"meeting.rtms_stopped","payload":{"meeting_uuid":"..","rtms_stream_id":"..","stop_reason":6}}
//! ```
//!
//! Any other `event` is ignored.

use crate::actors::{SessionRegistryHandle, StartSession};
use crate::errors::RtmsError;
use crate::protocol::codes;
use common::types::{MeetingUuid, StreamId};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

pub const EVENT_STARTED: &str = "meeting.rtms_started";
pub const EVENT_STOPPED: &str = "meeting.rtms_stopped";

/// A parsed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Started(StartSession),
    Stopped {
        meeting_uuid: MeetingUuid,
        stream_id: Option<StreamId>,
        stop_reason: Option<i64>,
    },
    /// Any other event, by name.
    Ignored(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("invalid notification JSON: {0}")]
    InvalidJson(String),

    #[error("invalid {event} payload: {reason}")]
    InvalidPayload { event: &'static str, reason: String },
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Deserialize)]
struct StartedPayload {
    meeting_uuid: String,
    rtms_stream_id: String,
    server_urls: String,
}

#[derive(Deserialize)]
struct StoppedPayload {
    meeting_uuid: String,
    #[serde(default)]
    rtms_stream_id: Option<String>,
    #[serde(default)]
    stop_reason: Option<i64>,
}

/// Parse one notification.
///
/// # Errors
///
/// Returns [`NotificationError`] for malformed JSON or a start/stop payload
/// missing its required fields.
pub fn parse(raw: &str) -> Result<Notification, NotificationError> {
    let envelope: Envelope =
        serde_json::from_str(raw).map_err(|e| NotificationError::InvalidJson(e.to_string()))?;

    match envelope.event.as_str() {
        EVENT_STARTED => {
            let payload: StartedPayload =
                serde_json::from_value(envelope.payload).map_err(|e| {
                    NotificationError::InvalidPayload {
                        event: EVENT_STARTED,
                        reason: e.to_string(),
                    }
                })?;
            Ok(Notification::Started(StartSession {
                meeting_uuid: MeetingUuid::new(payload.meeting_uuid),
                stream_id: StreamId::new(payload.rtms_stream_id),
                relay_url: payload.server_urls,
            }))
        }
        EVENT_STOPPED => {
            let payload: StoppedPayload =
                serde_json::from_value(envelope.payload).map_err(|e| {
                    NotificationError::InvalidPayload {
                        event: EVENT_STOPPED,
                        reason: e.to_string(),
                    }
                })?;
            Ok(Notification::Stopped {
                meeting_uuid: MeetingUuid::new(payload.meeting_uuid),
                stream_id: payload.rtms_stream_id.map(StreamId::new),
                stop_reason: payload.stop_reason,
            })
        }
        _ => Ok(Notification::Ignored(envelope.event)),
    }
}

/// Apply a notification to the registry.
///
/// # Errors
///
/// Propagates registry errors: [`RtmsError::InvalidRelayUrl`],
/// [`RtmsError::SessionExists`] and [`RtmsError::Draining`] on start,
/// [`RtmsError::SessionNotFound`] on stop.
pub async fn apply(
    registry: &SessionRegistryHandle,
    notification: Notification,
) -> Result<(), RtmsError> {
    match notification {
        Notification::Started(request) => {
            info!(
                target: "rtms.registry",
                meeting_uuid = %request.meeting_uuid,
                stream_id = %request.stream_id,
                "Stream started"
            );
            registry.start_session(request).await.map(|_| ())
        }
        Notification::Stopped {
            meeting_uuid,
            stop_reason,
            ..
        } => {
            info!(
                target: "rtms.registry",
                meeting_uuid = %meeting_uuid,
                stop_reason = stop_reason.map_or("unspecified", codes::stop_reason_name),
                "Stream stopped"
            );
            registry.stop_session(meeting_uuid).await
        }
        Notification::Ignored(event) => {
            debug!(target: "rtms.registry", event = %event, "Notification ignored");
            Ok(())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_started() {
        let raw = r#"{"event":"meeting.rtms_started","payload":{"meeting_uuid":"abc==","rtms_stream_id":"s-1","server_urls":"wss://relay.example/signal","operator_id":"u"}}"#;
        assert_eq!(
            parse(raw).unwrap(),
            Notification::Started(StartSession {
                meeting_uuid: MeetingUuid::from("abc=="),
                stream_id: StreamId::from("s-1"),
                relay_url: "wss://relay.example/signal".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_stopped() {
        let raw = r#"{"event":"meeting.rtms_stopped","payload":{"meeting_uuid":"abc==","rtms_stream_id":"s-1","stop_reason":6}}"#;
        assert_eq!(
            parse(raw).unwrap(),
            Notification::Stopped {
                meeting_uuid: MeetingUuid::from("abc=="),
                stream_id: Some(StreamId::from("s-1")),
                stop_reason: Some(6),
            }
        );
    }

    #[test]
    fn test_parse_stopped_without_optional_fields() {
        let raw = r#"{"event":"meeting.rtms_stopped","payload":{"meeting_uuid":"abc=="}}"#;
        assert!(matches!(
            parse(raw).unwrap(),
            Notification::Stopped {
                stream_id: None,
                stop_reason: None,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_other_event_ignored() {
        let raw = r#"{"event":"endpoint.url_validation","payload":{"plainToken":"x"}}"#;
        assert_eq!(
            parse(raw).unwrap(),
            Notification::Ignored("endpoint.url_validation".to_string())
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse("not json"),
            Err(NotificationError::InvalidJson(_))
        ));

        let missing = r#"{"event":"meeting.rtms_started","payload":{"meeting_uuid":"abc=="}}"#;
        assert!(matches!(
            parse(missing),
            Err(NotificationError::InvalidPayload {
                event: EVENT_STARTED,
                ..
            })
        ));
    }
}
