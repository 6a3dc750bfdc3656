//! Media frames as handed to consumers.

use crate::protocol::MessageType;
use bytes::Bytes;
use common::types::MeetingUuid;

/// Kind of media carried by a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
    Transcript,
    ScreenShare,
    Chat,
}

impl MediaKind {
    /// Map a media frame message type to its kind.
    #[must_use]
    pub fn from_message_type(message_type: MessageType) -> Option<Self> {
        match message_type {
            MessageType::AudioFrame => Some(MediaKind::Audio),
            MessageType::VideoFrame => Some(MediaKind::Video),
            MessageType::ScreenShareFrame => Some(MediaKind::ScreenShare),
            MessageType::TranscriptFrame => Some(MediaKind::Transcript),
            MessageType::ChatFrame => Some(MediaKind::Chat),
            _ => None,
        }
    }

    /// Whether `content.data` is base64 encoded binary (as opposed to text).
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(
            self,
            MediaKind::Audio | MediaKind::Video | MediaKind::ScreenShare
        )
    }

    /// Returns the kind as a string for log fields and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Transcript => "transcript",
            MediaKind::ScreenShare => "screen_share",
            MediaKind::Chat => "chat",
        }
    }
}

/// Participant a frame originates from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceIdentity {
    pub user_id: u64,
    pub user_name: String,
}

impl SourceIdentity {
    /// Key used for per-source continuity tracking.
    #[must_use]
    pub fn continuity_key(&self) -> String {
        self.user_id.to_string()
    }
}

/// One media frame. The payload is opaque; the client never decodes codecs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub meeting_uuid: MeetingUuid,
    pub source: SourceIdentity,
    pub payload: Bytes,
    /// Capture timestamp in milliseconds.
    pub timestamp_ms: i64,
    pub kind: MediaKind,
    /// True for frames synthesized to fill a timing gap.
    pub placeholder: bool,
}

impl Frame {
    /// A placeholder carrying `payload` in place of this frame's content.
    #[must_use]
    pub fn placeholder_like(&self, payload: Bytes) -> Self {
        Self {
            meeting_uuid: self.meeting_uuid.clone(),
            source: self.source.clone(),
            payload,
            timestamp_ms: self.timestamp_ms,
            kind: self.kind,
            placeholder: true,
        }
    }
}
