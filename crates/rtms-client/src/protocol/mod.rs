//! Relay wire protocol.
//!
//! Both connections exchange JSON text frames sharing one numeric `msg_type`
//! space. [`decode`] turns a raw frame into a typed [`Inbound`] message;
//! outbound messages live in [`messages`].

pub mod codes;
pub mod messages;

use crate::errors::{ChannelKind, RtmsError};
use messages::{
    DataHandshakeResponse, EventMessage, HandshakeResponse, KeepAliveRequest, MediaMessage,
    SessionStateMessage, StreamStateMessage,
};
use serde::de::DeserializeOwned;

/// Numeric message type shared by signaling and media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    HandshakeRequest,
    HandshakeResponse,
    DataHandshakeRequest,
    DataHandshakeResponse,
    EventSubscribe,
    Event,
    ClientReadyAck,
    StreamState,
    SessionState,
    KeepAliveRequest,
    KeepAliveResponse,
    AudioFrame,
    VideoFrame,
    ScreenShareFrame,
    TranscriptFrame,
    ChatFrame,
}

impl MessageType {
    /// Parse a wire code. Codes 10 and 11 are unassigned.
    #[must_use]
    pub fn from_code(code: u64) -> Option<Self> {
        let ty = match code {
            1 => MessageType::HandshakeRequest,
            2 => MessageType::HandshakeResponse,
            3 => MessageType::DataHandshakeRequest,
            4 => MessageType::DataHandshakeResponse,
            5 => MessageType::EventSubscribe,
            6 => MessageType::Event,
            7 => MessageType::ClientReadyAck,
            8 => MessageType::StreamState,
            9 => MessageType::SessionState,
            12 => MessageType::KeepAliveRequest,
            13 => MessageType::KeepAliveResponse,
            14 => MessageType::AudioFrame,
            15 => MessageType::VideoFrame,
            16 => MessageType::ScreenShareFrame,
            17 => MessageType::TranscriptFrame,
            18 => MessageType::ChatFrame,
            _ => return None,
        };
        Some(ty)
    }

    /// Wire code.
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            MessageType::HandshakeRequest => 1,
            MessageType::HandshakeResponse => 2,
            MessageType::DataHandshakeRequest => 3,
            MessageType::DataHandshakeResponse => 4,
            MessageType::EventSubscribe => 5,
            MessageType::Event => 6,
            MessageType::ClientReadyAck => 7,
            MessageType::StreamState => 8,
            MessageType::SessionState => 9,
            MessageType::KeepAliveRequest => 12,
            MessageType::KeepAliveResponse => 13,
            MessageType::AudioFrame => 14,
            MessageType::VideoFrame => 15,
            MessageType::ScreenShareFrame => 16,
            MessageType::TranscriptFrame => 17,
            MessageType::ChatFrame => 18,
        }
    }

    /// Name for log fields and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MessageType::HandshakeRequest => "handshake_request",
            MessageType::HandshakeResponse => "handshake_response",
            MessageType::DataHandshakeRequest => "data_handshake_request",
            MessageType::DataHandshakeResponse => "data_handshake_response",
            MessageType::EventSubscribe => "event_subscribe",
            MessageType::Event => "event",
            MessageType::ClientReadyAck => "client_ready_ack",
            MessageType::StreamState => "stream_state",
            MessageType::SessionState => "session_state",
            MessageType::KeepAliveRequest => "keep_alive_request",
            MessageType::KeepAliveResponse => "keep_alive_response",
            MessageType::AudioFrame => "audio_frame",
            MessageType::VideoFrame => "video_frame",
            MessageType::ScreenShareFrame => "screen_share_frame",
            MessageType::TranscriptFrame => "transcript_frame",
            MessageType::ChatFrame => "chat_frame",
        }
    }

    /// Whether this is one of the five media frame types.
    #[must_use]
    pub const fn is_media_frame(&self) -> bool {
        matches!(
            self,
            MessageType::AudioFrame
                | MessageType::VideoFrame
                | MessageType::ScreenShareFrame
                | MessageType::TranscriptFrame
                | MessageType::ChatFrame
        )
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    HandshakeResponse(HandshakeResponse),
    DataHandshakeResponse(DataHandshakeResponse),
    Event(EventMessage),
    StreamState(StreamStateMessage),
    SessionState(SessionStateMessage),
    KeepAliveRequest(KeepAliveRequest),
    /// One of the media frame types; `message_type` says which.
    Media {
        message_type: MessageType,
        message: MediaMessage,
    },
    /// A known type the relay is not expected to send (client-originated).
    Unexpected(MessageType),
}

impl Inbound {
    /// Wire message type of this message.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Inbound::HandshakeResponse(_) => MessageType::HandshakeResponse,
            Inbound::DataHandshakeResponse(_) => MessageType::DataHandshakeResponse,
            Inbound::Event(_) => MessageType::Event,
            Inbound::StreamState(_) => MessageType::StreamState,
            Inbound::SessionState(_) => MessageType::SessionState,
            Inbound::KeepAliveRequest(_) => MessageType::KeepAliveRequest,
            Inbound::Media { message_type, .. } => *message_type,
            Inbound::Unexpected(message_type) => *message_type,
        }
    }
}

/// Decode one inbound text frame.
///
/// # Errors
///
/// Returns [`RtmsError::ProtocolViolation`] when the frame is not JSON, has no
/// numeric `msg_type`, carries an unknown type, or the body does not match
/// the type's schema.
pub fn decode(channel: ChannelKind, raw: &str) -> Result<Inbound, RtmsError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| violation(channel, format!("invalid JSON: {e}")))?;

    let code = value
        .get("msg_type")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| violation(channel, "missing or non-numeric msg_type".to_string()))?;

    let message_type = MessageType::from_code(code)
        .ok_or_else(|| violation(channel, format!("unknown msg_type {code}")))?;

    let inbound = match message_type {
        MessageType::HandshakeResponse => Inbound::HandshakeResponse(body(channel, value)?),
        MessageType::DataHandshakeResponse => {
            Inbound::DataHandshakeResponse(body(channel, value)?)
        }
        MessageType::Event => Inbound::Event(body(channel, value)?),
        MessageType::StreamState => Inbound::StreamState(body(channel, value)?),
        MessageType::SessionState => Inbound::SessionState(body(channel, value)?),
        MessageType::KeepAliveRequest => Inbound::KeepAliveRequest(body(channel, value)?),
        ty if ty.is_media_frame() => Inbound::Media {
            message_type: ty,
            message: body(channel, value)?,
        },
        other => Inbound::Unexpected(other),
    };

    Ok(inbound)
}

fn body<T: DeserializeOwned>(channel: ChannelKind, value: serde_json::Value) -> Result<T, RtmsError> {
    serde_json::from_value(value).map_err(|e| violation(channel, format!("invalid message body: {e}")))
}

fn violation(channel: ChannelKind, reason: String) -> RtmsError {
    RtmsError::ProtocolViolation { channel, reason }
}
