//! Signaling channel: handshake, event subscription, stream state and
//! keep-alive handling.

use super::{Effect, SessionIdentity, SignalingState};
use crate::errors::{ChannelKind, RtmsError};
use crate::events::{EndReason, RelayEvent};
use crate::protocol::codes::{self, EventType, SessionState, StreamState};
use crate::protocol::messages::{
    EventMessage, EventSubscribe, HandshakeRequest, HandshakeResponse, KeepAliveResponse,
    Outbound, SessionStateMessage, StreamStateMessage,
};
use crate::protocol::{self, Inbound};
use tracing::{debug, info, warn};

const CHANNEL: ChannelKind = ChannelKind::Signaling;

/// Signaling protocol state for one session.
#[derive(Debug, Clone)]
pub struct SignalingChannel {
    state: SignalingState,
    last_keep_alive_ms: Option<i64>,
    media_url: Option<String>,
}

impl Default for SignalingChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalingChannel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: SignalingState::Connecting,
            last_keep_alive_ms: None,
            media_url: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SignalingState {
        self.state
    }

    /// Wall-clock time (ms) of the last keep-alive request.
    #[must_use]
    pub fn last_keep_alive_ms(&self) -> Option<i64> {
        self.last_keep_alive_ms
    }

    /// Media URL from the last accepted handshake.
    #[must_use]
    pub fn media_url(&self) -> Option<&str> {
        self.media_url.as_deref()
    }

    /// A new connect attempt has started.
    pub fn on_connecting(&mut self) {
        self.state = SignalingState::Connecting;
    }

    /// The connection opened; returns the handshake to send.
    pub fn on_open(&mut self, identity: &SessionIdentity, sequence: u32) -> Outbound {
        self.state = SignalingState::Authenticated;
        Outbound::Handshake(HandshakeRequest::new(
            identity.meeting_uuid.as_str(),
            identity.stream_id.as_str(),
            identity.signature.clone(),
            sequence,
        ))
    }

    /// Socket error. The close that follows drives recovery.
    pub fn on_error(&mut self) {
        self.state = SignalingState::Errored;
    }

    pub fn on_closed(&mut self) {
        self.state = SignalingState::Closed;
    }

    /// Decode and dispatch one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`RtmsError::ProtocolViolation`] for frames that cannot be
    /// decoded or are not valid in the current state. The connection stays up.
    pub fn on_message(
        &mut self,
        raw: &str,
        identity: &SessionIdentity,
        now_ms: i64,
    ) -> Result<Vec<Effect>, RtmsError> {
        let inbound = protocol::decode(CHANNEL, raw)?;
        crate::observability::metrics::record_message_received(
            CHANNEL.as_str(),
            inbound.message_type().as_str(),
        );

        match inbound {
            Inbound::HandshakeResponse(resp) => self.handle_handshake_response(&resp, identity),
            Inbound::Event(event) => Ok(handle_event(event, identity)),
            Inbound::StreamState(msg) => Ok(handle_stream_state(&msg, identity)),
            Inbound::SessionState(msg) => {
                log_session_state(&msg, identity);
                Ok(Vec::new())
            }
            Inbound::KeepAliveRequest(req) => {
                self.last_keep_alive_ms = Some(now_ms);
                debug!(
                    target: "rtms.signaling",
                    meeting_uuid = %identity.meeting_uuid,
                    timestamp = %req.timestamp,
                    "Keep-alive request"
                );
                Ok(vec![Effect::Reply(Outbound::KeepAliveResponse(
                    KeepAliveResponse::echo(req.timestamp),
                ))])
            }
            other => Err(RtmsError::ProtocolViolation {
                channel: CHANNEL,
                reason: format!("unexpected {} on signaling", other.message_type().as_str()),
            }),
        }
    }

    fn handle_handshake_response(
        &mut self,
        resp: &HandshakeResponse,
        identity: &SessionIdentity,
    ) -> Result<Vec<Effect>, RtmsError> {
        if self.state != SignalingState::Authenticated {
            return Err(RtmsError::ProtocolViolation {
                channel: CHANNEL,
                reason: format!("handshake response in state {}", self.state.as_str()),
            });
        }

        if resp.status_code != codes::STATUS_OK {
            warn!(
                target: "rtms.signaling",
                meeting_uuid = %identity.meeting_uuid,
                status_code = resp.status_code,
                status = codes::status_name(resp.status_code),
                reason = ?resp.reason.as_ref().map(|r| r.describe()),
                "Signaling handshake rejected"
            );
            self.state = SignalingState::Errored;
            return Ok(vec![Effect::Terminate(EndReason::AuthenticationFailed {
                channel: CHANNEL,
                status_code: resp.status_code,
            })]);
        }

        let media_url = resp.media_url().ok_or_else(|| RtmsError::ProtocolViolation {
            channel: CHANNEL,
            reason: "handshake accepted without media_server.server_urls.all".to_string(),
        })?;

        info!(
            target: "rtms.signaling",
            meeting_uuid = %identity.meeting_uuid,
            "Signaling handshake accepted"
        );

        self.state = SignalingState::Ready;
        self.media_url = Some(media_url.to_string());

        Ok(vec![
            Effect::ConnectMedia(media_url.to_string()),
            Effect::Reply(Outbound::EventSubscribe(EventSubscribe::new(
                &EventType::SUBSCRIBED,
            ))),
        ])
    }
}

fn handle_event(msg: EventMessage, identity: &SessionIdentity) -> Vec<Effect> {
    let Some(event) = msg.event else {
        debug!(
            target: "rtms.signaling",
            meeting_uuid = %identity.meeting_uuid,
            "Event message without body"
        );
        return Vec::new();
    };

    debug!(
        target: "rtms.signaling",
        meeting_uuid = %identity.meeting_uuid,
        event_type = EventType::from_code(event.event_type).map_or("UNKNOWN", |t| t.as_str()),
        user_id = ?event.user_id,
        "Relay event"
    );

    vec![Effect::EmitRelay(RelayEvent {
        meeting_uuid: identity.meeting_uuid.clone(),
        event_type: event.event_type,
        user_id: event.user_id,
        user_name: event.user_name,
        timestamp: event.timestamp,
    })]
}

fn handle_stream_state(msg: &StreamStateMessage, identity: &SessionIdentity) -> Vec<Effect> {
    let state = msg.state.and_then(StreamState::from_code);
    let stop_reason = msg.effective_stop_reason();

    if msg.is_meeting_ended() {
        info!(
            target: "rtms.signaling",
            meeting_uuid = %identity.meeting_uuid,
            "Relay reports meeting ended"
        );
        return vec![Effect::Terminate(EndReason::MeetingEnded)];
    }

    info!(
        target: "rtms.signaling",
        meeting_uuid = %identity.meeting_uuid,
        state = state.map_or("UNKNOWN", |s| s.as_str()),
        stop_reason = stop_reason.map_or("NONE", codes::stop_reason_name),
        "Stream state changed"
    );
    Vec::new()
}

fn log_session_state(msg: &SessionStateMessage, identity: &SessionIdentity) {
    info!(
        target: "rtms.signaling",
        meeting_uuid = %identity.meeting_uuid,
        state = msg
            .state
            .and_then(SessionState::from_code)
            .map_or("UNKNOWN", |s| s.as_str()),
        stop_reason = msg.stop_reason.map_or("NONE", codes::stop_reason_name),
        "Session state changed"
    );
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::channel::test_support::identity;
    use serde_json::json;

    fn opened() -> SignalingChannel {
        let mut channel = SignalingChannel::new();
        let _ = channel.on_open(&identity(), 7);
        channel
    }

    #[test]
    fn test_open_sends_handshake() {
        let mut channel = SignalingChannel::new();
        let handshake = channel.on_open(&identity(), 42);

        assert_eq!(channel.state(), SignalingState::Authenticated);
        let Outbound::Handshake(req) = handshake else {
            unreachable!("expected handshake");
        };
        assert_eq!(req.sequence, 42);
        assert_eq!(req.signature, "c0ffee");
        assert_eq!(req.rtms_stream_id, "03db704592624398931a588dd78200cb");
    }

    #[test]
    fn test_accepted_handshake_starts_media_and_subscribes() {
        let mut channel = opened();
        let raw = json!({
            "msg_type": 2,
            "status_code": 0,
            "media_server": {"server_urls": {"all": "wss://media.example/all"}}
        })
        .to_string();

        let effects = channel.on_message(&raw, &identity(), 1).unwrap();

        assert_eq!(channel.state(), SignalingState::Ready);
        assert_eq!(channel.media_url(), Some("wss://media.example/all"));
        assert_eq!(
            effects.first(),
            Some(&Effect::ConnectMedia("wss://media.example/all".to_string()))
        );
        assert!(matches!(
            effects.get(1),
            Some(Effect::Reply(Outbound::EventSubscribe(sub))) if sub.events.len() == 3
        ));
    }

    #[test]
    fn test_rejected_handshake_terminates() {
        let mut channel = opened();
        let raw = json!({"msg_type": 2, "status_code": 15, "reason": "bad signature"}).to_string();

        let effects = channel.on_message(&raw, &identity(), 1).unwrap();

        assert_eq!(channel.state(), SignalingState::Errored);
        assert_eq!(
            effects,
            vec![Effect::Terminate(EndReason::AuthenticationFailed {
                channel: ChannelKind::Signaling,
                status_code: 15,
            })]
        );
    }

    #[test]
    fn test_accepted_handshake_without_media_url_is_violation() {
        let mut channel = opened();
        let raw = json!({"msg_type": 2, "status_code": 0}).to_string();

        let err = channel.on_message(&raw, &identity(), 1).unwrap_err();
        assert!(matches!(err, RtmsError::ProtocolViolation { .. }));
        assert_eq!(channel.state(), SignalingState::Authenticated);
    }

    #[test]
    fn test_handshake_response_outside_authenticated_is_violation() {
        let mut channel = SignalingChannel::new();
        let raw = json!({"msg_type": 2, "status_code": 0}).to_string();
        assert!(channel.on_message(&raw, &identity(), 1).is_err());
    }

    #[test]
    fn test_keep_alive_echoes_timestamp() {
        let mut channel = opened();
        let raw = json!({"msg_type": 12, "timestamp": 1_727_384_349_000_i64}).to_string();

        let effects = channel.on_message(&raw, &identity(), 5_000).unwrap();

        assert_eq!(
            effects,
            vec![Effect::Reply(Outbound::KeepAliveResponse(
                KeepAliveResponse::echo(json!(1_727_384_349_000_i64))
            ))]
        );
        assert_eq!(channel.last_keep_alive_ms(), Some(5_000));
    }

    #[test]
    fn test_keep_alive_without_timestamp_still_replies() {
        let mut channel = opened();
        for (raw, expected) in [
            (json!({"msg_type": 12}), json!({"msg_type": 13})),
            (
                json!({"msg_type": 12, "timestamp": "soon"}),
                json!({"msg_type": 13, "timestamp": "soon"}),
            ),
        ] {
            let effects = channel
                .on_message(&raw.to_string(), &identity(), 7_000)
                .unwrap();
            let [Effect::Reply(reply)] = effects.as_slice() else {
                unreachable!("expected a single reply, got {effects:?}");
            };
            let sent: serde_json::Value = serde_json::from_str(&reply.to_json().unwrap()).unwrap();
            assert_eq!(sent, expected);
        }
        assert_eq!(channel.last_keep_alive_ms(), Some(7_000));
    }

    #[test]
    fn test_meeting_ended_terminates() {
        let mut channel = opened();
        let raw = json!({"msg_type": 8, "state": 4, "stop_reason": 6}).to_string();

        let effects = channel.on_message(&raw, &identity(), 1).unwrap();
        assert_eq!(effects, vec![Effect::Terminate(EndReason::MeetingEnded)]);
    }

    #[test]
    fn test_other_stream_states_only_log() {
        let mut channel = opened();
        for raw in [
            json!({"msg_type": 8, "state": 2, "reason": 12}),
            json!({"msg_type": 8, "state": 4, "stop_reason": 1}),
            json!({"msg_type": 9, "state": 3}),
        ] {
            let effects = channel.on_message(&raw.to_string(), &identity(), 1).unwrap();
            assert!(effects.is_empty());
        }
    }

    #[test]
    fn test_event_surfaces_relay_event() {
        let mut channel = opened();
        let raw = json!({
            "msg_type": 6,
            "event": {"event_type": 3, "user_id": 16778240, "user_name": "Ada", "timestamp": 9}
        })
        .to_string();

        let effects = channel.on_message(&raw, &identity(), 1).unwrap();
        let Some(Effect::EmitRelay(event)) = effects.first() else {
            unreachable!("expected relay event");
        };
        assert_eq!(event.kind(), Some(EventType::ParticipantJoin));
        assert_eq!(event.user_name.as_deref(), Some("Ada"));
        assert_eq!(channel.state(), SignalingState::Authenticated);
    }

    #[test]
    fn test_media_frame_on_signaling_is_violation() {
        let mut channel = opened();
        let raw = json!({"msg_type": 14, "content": {"data": "AA=="}}).to_string();
        assert!(matches!(
            channel.on_message(&raw, &identity(), 1),
            Err(RtmsError::ProtocolViolation { .. })
        ));
    }

    #[test]
    fn test_error_then_close() {
        let mut channel = opened();
        channel.on_error();
        assert_eq!(channel.state(), SignalingState::Errored);
        channel.on_closed();
        assert_eq!(channel.state(), SignalingState::Closed);
        channel.on_connecting();
        assert_eq!(channel.state(), SignalingState::Connecting);
    }
}
