//! Media channel: data handshake, keep-alive and media frame decoding.

use super::{Effect, MediaState, SessionIdentity};
use crate::errors::{ChannelKind, RtmsError};
use crate::events::EndReason;
use crate::frame::{Frame, MediaKind, SourceIdentity};
use crate::protocol::codes;
use crate::protocol::messages::{
    ClientReadyAck, DataHandshakeRequest, DataHandshakeResponse, KeepAliveResponse, MediaParams,
    MediaMessage, Outbound,
};
use crate::protocol::{self, Inbound, MessageType};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use tracing::{debug, info, warn};

const CHANNEL: ChannelKind = ChannelKind::Media;

/// Media protocol state for one session.
#[derive(Debug, Clone)]
pub struct MediaChannel {
    state: MediaState,
    last_keep_alive_ms: Option<i64>,
    discarded_frames: u64,
}

impl Default for MediaChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl MediaChannel {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: MediaState::Idle,
            last_keep_alive_ms: None,
            discarded_frames: 0,
        }
    }

    #[must_use]
    pub fn state(&self) -> MediaState {
        self.state
    }

    #[must_use]
    pub fn last_keep_alive_ms(&self) -> Option<i64> {
        self.last_keep_alive_ms
    }

    /// Frames dropped because they arrived outside `Streaming`.
    #[must_use]
    pub fn discarded_frames(&self) -> u64 {
        self.discarded_frames
    }

    pub fn on_connecting(&mut self) {
        self.state = MediaState::Connecting;
    }

    /// The connection opened; returns the data handshake to send.
    pub fn on_open(
        &mut self,
        identity: &SessionIdentity,
        media_type: u32,
        media_params: MediaParams,
    ) -> Outbound {
        self.state = MediaState::Authenticated;
        Outbound::DataHandshake(DataHandshakeRequest::new(
            identity.meeting_uuid.as_str(),
            identity.stream_id.as_str(),
            identity.signature.clone(),
            media_type,
            media_params,
        ))
    }

    pub fn on_error(&mut self) {
        self.state = MediaState::Errored;
    }

    pub fn on_closed(&mut self) {
        self.state = MediaState::Closed;
    }

    /// Decode and dispatch one inbound text frame.
    ///
    /// `now_ms` is the local wall clock, used for keep-alive bookkeeping and
    /// for frames that carry no timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`RtmsError::ProtocolViolation`] for frames that cannot be
    /// decoded. The connection stays up.
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
            Inbound::DataHandshakeResponse(resp) => {
                Ok(self.handle_data_handshake_response(&resp, identity))
            }
            Inbound::KeepAliveRequest(req) => {
                self.last_keep_alive_ms = Some(now_ms);
                Ok(vec![Effect::Reply(Outbound::KeepAliveResponse(
                    KeepAliveResponse::echo(req.timestamp),
                ))])
            }
            Inbound::Media {
                message_type,
                message,
            } => self.handle_media(message_type, message, identity, now_ms),
            Inbound::StreamState(_) | Inbound::SessionState(_) => {
                debug!(
                    target: "rtms.media",
                    meeting_uuid = %identity.meeting_uuid,
                    "State message on media channel ignored"
                );
                Ok(Vec::new())
            }
            other => Err(RtmsError::ProtocolViolation {
                channel: CHANNEL,
                reason: format!("unexpected {} on media", other.message_type().as_str()),
            }),
        }
    }

    fn handle_data_handshake_response(
        &mut self,
        resp: &DataHandshakeResponse,
        identity: &SessionIdentity,
    ) -> Vec<Effect> {
        if resp.status_code != codes::STATUS_OK {
            warn!(
                target: "rtms.media",
                meeting_uuid = %identity.meeting_uuid,
                status_code = resp.status_code,
                status = codes::status_name(resp.status_code),
                reason = ?resp.reason.as_ref().map(|r| r.describe()),
                "Media handshake rejected"
            );
            self.state = MediaState::Errored;
            return vec![Effect::Terminate(EndReason::AuthenticationFailed {
                channel: CHANNEL,
                status_code: resp.status_code,
            })];
        }

        info!(
            target: "rtms.media",
            meeting_uuid = %identity.meeting_uuid,
            payload_encrypted = ?resp.payload_encrypted,
            "Media handshake accepted, streaming"
        );
        self.state = MediaState::Streaming;

        vec![Effect::SendOnSignaling(Outbound::ClientReadyAck(
            ClientReadyAck::new(identity.stream_id.as_str()),
        ))]
    }

    fn handle_media(
        &mut self,
        message_type: MessageType,
        message: MediaMessage,
        identity: &SessionIdentity,
        now_ms: i64,
    ) -> Result<Vec<Effect>, RtmsError> {
        let kind = MediaKind::from_message_type(message_type).ok_or_else(|| {
            RtmsError::ProtocolViolation {
                channel: CHANNEL,
                reason: format!("{} is not a media frame", message_type.as_str()),
            }
        })?;

        if self.state != MediaState::Streaming {
            self.discarded_frames += 1;
            debug!(
                target: "rtms.media",
                meeting_uuid = %identity.meeting_uuid,
                kind = kind.as_str(),
                state = self.state.as_str(),
                "Frame outside streaming state discarded"
            );
            return Ok(Vec::new());
        }

        let content = message.content.ok_or_else(|| missing_data(kind))?;
        let data = content.data.ok_or_else(|| missing_data(kind))?;

        let payload = if kind.is_binary() {
            Bytes::from(STANDARD.decode(data.as_bytes()).map_err(|e| {
                RtmsError::ProtocolViolation {
                    channel: CHANNEL,
                    reason: format!("{} data is not base64: {e}", kind.as_str()),
                }
            })?)
        } else {
            Bytes::from(data)
        };

        Ok(vec![Effect::EmitFrame(Frame {
            meeting_uuid: identity.meeting_uuid.clone(),
            source: SourceIdentity {
                user_id: content.user_id,
                user_name: content.user_name,
            },
            payload,
            timestamp_ms: content.timestamp.unwrap_or(now_ms),
            kind,
            placeholder: false,
        })])
    }
}

fn missing_data(kind: MediaKind) -> RtmsError {
    RtmsError::ProtocolViolation {
        channel: CHANNEL,
        reason: format!("{} frame without content.data", kind.as_str()),
    }
}
