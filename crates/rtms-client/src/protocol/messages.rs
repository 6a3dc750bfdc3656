//! Typed relay messages.
//!
//! Outbound structs serialize with their own `msg_type` field so the JSON on
//! the wire matches the relay schema exactly. Inbound structs are lenient:
//! optional fields default, unknown fields are ignored.

use super::codes::{self, EventType};
use super::MessageType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version sent in handshakes (WebSocket transport).
pub const PROTOCOL_VERSION: u8 = 1;

// ----------------------------------------------------------------------------
// Outbound
// ----------------------------------------------------------------------------

/// `HANDSHAKE_REQUEST` (1) on signaling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandshakeRequest {
    pub msg_type: u8,
    pub protocol_version: u8,
    pub sequence: u32,
    pub meeting_uuid: String,
    pub rtms_stream_id: String,
    pub signature: String,
}

impl HandshakeRequest {
    #[must_use]
    pub fn new(meeting_uuid: &str, stream_id: &str, signature: String, sequence: u32) -> Self {
        Self {
            msg_type: MessageType::HandshakeRequest.code(),
            protocol_version: PROTOCOL_VERSION,
            sequence,
            meeting_uuid: meeting_uuid.to_string(),
            rtms_stream_id: stream_id.to_string(),
            signature,
        }
    }
}

/// `DATA_HANDSHAKE_REQUEST` (3) on media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataHandshakeRequest {
    pub msg_type: u8,
    pub protocol_version: u8,
    pub meeting_uuid: String,
    pub rtms_stream_id: String,
    pub signature: String,
    pub media_type: u32,
    pub payload_encryption: bool,
    pub media_params: MediaParams,
}

impl DataHandshakeRequest {
    #[must_use]
    pub fn new(
        meeting_uuid: &str,
        stream_id: &str,
        signature: String,
        media_type: u32,
        media_params: MediaParams,
    ) -> Self {
        Self {
            msg_type: MessageType::DataHandshakeRequest.code(),
            protocol_version: PROTOCOL_VERSION,
            meeting_uuid: meeting_uuid.to_string(),
            rtms_stream_id: stream_id.to_string(),
            signature,
            media_type,
            payload_encryption: false,
            media_params,
        }
    }
}

/// One entry of an `EVENT_SUBSCRIBE` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSubscription {
    pub event_type: u32,
    pub subscribe: bool,
}

/// `EVENT_SUBSCRIBE` (5) on signaling. The relay sends no response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSubscribe {
    pub msg_type: u8,
    pub events: Vec<EventSubscription>,
}

impl EventSubscribe {
    /// Subscribe to the given event types.
    #[must_use]
    pub fn new(events: &[EventType]) -> Self {
        Self {
            msg_type: MessageType::EventSubscribe.code(),
            events: events
                .iter()
                .map(|e| EventSubscription {
                    event_type: e.code(),
                    subscribe: true,
                })
                .collect(),
        }
    }
}

/// `CLIENT_READY_ACK` (7), sent on signaling once media is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientReadyAck {
    pub msg_type: u8,
    pub rtms_stream_id: String,
}

impl ClientReadyAck {
    #[must_use]
    pub fn new(stream_id: &str) -> Self {
        Self {
            msg_type: MessageType::ClientReadyAck.code(),
            rtms_stream_id: stream_id.to_string(),
        }
    }
}

/// `KEEP_ALIVE_RESPONSE` (13), echoing the request timestamp verbatim.
///
/// A request without a timestamp gets a reply without one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeepAliveResponse {
    pub msg_type: u8,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub timestamp: Value,
}

impl KeepAliveResponse {
    #[must_use]
    pub fn echo(timestamp: Value) -> Self {
        Self {
            msg_type: MessageType::KeepAliveResponse.code(),
            timestamp,
        }
    }
}

/// Any message the client sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Handshake(HandshakeRequest),
    DataHandshake(DataHandshakeRequest),
    EventSubscribe(EventSubscribe),
    ClientReadyAck(ClientReadyAck),
    KeepAliveResponse(KeepAliveResponse),
}

impl Outbound {
    /// Wire message type of this message.
    #[must_use]
    pub fn message_type(&self) -> MessageType {
        match self {
            Outbound::Handshake(_) => MessageType::HandshakeRequest,
            Outbound::DataHandshake(_) => MessageType::DataHandshakeRequest,
            Outbound::EventSubscribe(_) => MessageType::EventSubscribe,
            Outbound::ClientReadyAck(_) => MessageType::ClientReadyAck,
            Outbound::KeepAliveResponse(_) => MessageType::KeepAliveResponse,
        }
    }

    /// Serialize to a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns the serializer error. The outbound types contain only strings,
    /// integers, booleans and echoed JSON values, so this does not fail in
    /// practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ----------------------------------------------------------------------------
// Media capability parameters
// ----------------------------------------------------------------------------

/// Audio capability declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioParams {
    pub content_type: u32,
    pub sample_rate: u32,
    pub channel: u32,
    pub codec: u32,
    pub data_opt: u32,
    pub send_rate: u32,
}

impl Default for AudioParams {
    /// RTP, 16 kHz, mono, L16, mixed stream, 100 ms send rate.
    fn default() -> Self {
        Self {
            content_type: 1,
            sample_rate: 1,
            channel: 1,
            codec: 1,
            data_opt: 1,
            send_rate: 100,
        }
    }
}

/// Video capability declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<u32>,
    pub codec: u32,
    pub data_opt: u32,
    pub resolution: u32,
    pub fps: u32,
}

impl Default for VideoParams {
    /// H.264, single active speaker stream, 720p, 25 fps.
    fn default() -> Self {
        Self {
            content_type: None,
            codec: 7,
            data_opt: 3,
            resolution: 2,
            fps: 25,
        }
    }
}

/// Screen share capability declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskshareParams {
    pub codec: u32,
    pub resolution: u32,
    pub fps: u32,
}

impl Default for DeskshareParams {
    /// JPG, 720p, 1 fps.
    fn default() -> Self {
        Self {
            codec: 5,
            resolution: 2,
            fps: 1,
        }
    }
}

/// Text stream capability declaration (chat, transcript).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextParams {
    pub content_type: u32,
}

impl Default for TextParams {
    /// Plain text.
    fn default() -> Self {
        Self { content_type: 5 }
    }
}

/// Per-kind declared media parameters for `DATA_HANDSHAKE_REQUEST`.
///
/// This is capability negotiation only; the client never touches codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deskshare: Option<DeskshareParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<TextParams>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<TextParams>,
}

impl Default for MediaParams {
    fn default() -> Self {
        Self {
            audio: Some(AudioParams::default()),
            video: Some(VideoParams::default()),
            deskshare: Some(DeskshareParams::default()),
            chat: Some(TextParams::default()),
            transcript: Some(TextParams::default()),
        }
    }
}

impl MediaParams {
    /// Override the declared video frame rate.
    #[must_use]
    pub fn with_video_fps(mut self, fps: u32) -> Self {
        if let Some(video) = self.video.as_mut() {
            video.fps = fps;
        }
        self
    }
}

// ----------------------------------------------------------------------------
// Inbound
// ----------------------------------------------------------------------------

/// A `reason` field, which the relay sends either as a code or as text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Reason {
    Code(i64),
    Text(String),
}

impl Reason {
    /// Numeric code, if the relay sent one.
    #[must_use]
    pub fn code(&self) -> Option<i64> {
        match self {
            Reason::Code(code) => Some(*code),
            Reason::Text(_) => None,
        }
    }

    /// Text for log output.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Reason::Code(code) => format!("{code} ({})", codes::stop_reason_name(*code)),
            Reason::Text(text) => text.clone(),
        }
    }
}

/// Media endpoints advertised in `HANDSHAKE_RESPONSE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ServerUrls {
    #[serde(default)]
    pub all: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MediaServer {
    #[serde(default)]
    pub server_urls: ServerUrls,
}

/// `HANDSHAKE_RESPONSE` (2).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HandshakeResponse {
    pub status_code: i64,
    #[serde(default)]
    pub reason: Option<Reason>,
    #[serde(default)]
    pub media_server: Option<MediaServer>,
}

impl HandshakeResponse {
    /// The combined media endpoint (`media_server.server_urls.all`).
    #[must_use]
    pub fn media_url(&self) -> Option<&str> {
        self.media_server
            .as_ref()
            .and_then(|m| m.server_urls.all.as_deref())
            .filter(|url| !url.is_empty())
    }
}

/// `DATA_HANDSHAKE_RESPONSE` (4).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DataHandshakeResponse {
    pub status_code: i64,
    #[serde(default)]
    pub reason: Option<Reason>,
    #[serde(default)]
    pub payload_encrypted: Option<bool>,
    #[serde(default)]
    pub media_params: Option<MediaParams>,
}

/// Body of an `EVENT` (6) message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventBody {
    pub event_type: u32,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// `EVENT` (6).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub event: Option<EventBody>,
}

/// `STREAM_STATE` (8).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamStateMessage {
    #[serde(default)]
    pub state: Option<i64>,
    #[serde(default)]
    pub reason: Option<i64>,
    #[serde(default)]
    pub stop_reason: Option<i64>,
}

impl StreamStateMessage {
    /// Stop reason, preferring `stop_reason` and falling back to `reason`.
    #[must_use]
    pub fn effective_stop_reason(&self) -> Option<i64> {
        self.stop_reason.or(self.reason)
    }

    /// Whether the relay reports the meeting itself has ended.
    #[must_use]
    pub fn is_meeting_ended(&self) -> bool {
        self.state.and_then(codes::StreamState::from_code) == Some(codes::StreamState::Terminated)
            && self.effective_stop_reason() == Some(codes::STOP_REASON_MEETING_ENDED)
    }
}

/// `SESSION_STATE` (9).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionStateMessage {
    #[serde(default)]
    pub state: Option<i64>,
    #[serde(default)]
    pub stop_reason: Option<i64>,
}

/// `KEEP_ALIVE_REQUEST` (12). The timestamp is opaque and may be absent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeepAliveRequest {
    #[serde(default)]
    pub timestamp: Value,
}

/// `content` of a media frame message (14-18).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaContent {
    #[serde(default)]
    pub user_id: u64,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Envelope shared by the five media frame message types.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaMessage {
    #[serde(default)]
    pub content: Option<MediaContent>,
}
