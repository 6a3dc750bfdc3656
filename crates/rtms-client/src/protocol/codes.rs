//! Relay code tables.
//!
//! Numeric codes carried in `status_code`, `reason`/`stop_reason`, `state`
//! and `event_type` fields, with the names used in log output. Unknown codes
//! resolve to `"UNKNOWN"` rather than failing, since the relay may add codes.

/// Handshake status code for success.
pub const STATUS_OK: i64 = 0;

/// Status code names, indexed by code.
const STATUS_NAMES: [&str; 63] = [
    "OK",
    "CONNECTION_TIMEOUT",
    "INVALID_JSON_MSG_SIZE",
    "INVALID_JSON_MSG",
    "INVALID_MESSAGE_TYPE",
    "MSG_TYPE_NOT_EXIST",
    "MSG_TYPE_NOT_UINT",
    "MEETING_UUID_NOT_EXIST",
    "MEETING_UUID_NOT_STRING",
    "MEETING_UUID_IS_EMPTY",
    "RTMS_STREAM_ID_NOT_EXIST",
    "RTMS_STREAM_ID_NOT_STRING",
    "RTMS_STREAM_ID_IS_EMPTY",
    "SESSION_NOT_FOUND",
    "SIGNATURE_NOT_EXIST",
    "INVALID_SIGNATURE",
    "INVALID_MEETING_OR_STREAM_ID",
    "DUPLICATE_SIGNAL_REQUEST",
    "EVENTS_NOT_EXIST",
    "EVENTS_VALUE_NOT_ARRAY",
    "EVENT_TYPE_NOT_EXIST",
    "EVENT_TYPE_VALUE_NOT_UINT",
    "MEDIA_TYPE_NOT_EXIST",
    "MEDIA_TYPE_NOT_UINT",
    "MEDIA_TYPE_AUDIO_NOT_SUPPORT",
    "MEDIA_TYPE_VIDEO_NOT_SUPPORT",
    "MEDIA_TYPE_DESKSHARE_NOT_SUPPORT",
    "MEDIA_TYPE_TRANSCRIPT_NOT_SUPPORT",
    "MEDIA_TYPE_CHAT_NOT_SUPPORT",
    "MEDIA_TYPE_INVALID_VALUE",
    "MEDIA_DATA_ALL_CONNECTION_EXIST",
    "DUPLICATE_MEDIA_DATA_CONNECTION",
    "MEDIA_PARAMS_NOT_EXIST",
    "INVALID_MEDIA_PARAMS",
    "NO_MEDIA_TYPE_SPECIFIED",
    "INVALID_MEDIA_AUDIO_PARAMS",
    "MEDIA_AUDIO_CONTENT_TYPE_NOT_UINT",
    "INVALID_MEDIA_AUDIO_CONTENT_TYPE",
    "MEDIA_AUDIO_SAMPLE_RATE_NOT_UINT",
    "INVALID_MEDIA_AUDIO_SAMPLE_RATE",
    "MEDIA_AUDIO_CHANNEL_NOT_UINT",
    "INVALID_MEDIA_AUDIO_CHANNEL",
    "MEDIA_AUDIO_CODEC_NOT_UINT",
    "INVALID_MEDIA_AUDIO_CODEC",
    "MEDIA_AUDIO_DATA_OPT_NOT_UINT",
    "INVALID_MEDIA_AUDIO_DATA_OPT",
    "MEDIA_AUDIO_SEND_RATE_NOT_UINT",
    "MEDIA_AUDIO_FRAME_SIZE_NOT_UINT",
    "INVALID_MEDIA_VIDEO_PARAMS",
    "INVALID_MEDIA_VIDEO_CONTENT_TYPE",
    "MEDIA_VIDEO_CONTENT_TYPE_NOT_UINT",
    "INVALID_MEDIA_VIDEO_CODEC",
    "MEDIA_VIDEO_CODEC_NOT_UINT",
    "INVALID_MEDIA_VIDEO_RESOLUTION",
    "MEDIA_VIDEO_RESOLUTION_NOT_UINT",
    "INVALID_MEDIA_VIDEO_DATA_OPT",
    "MEDIA_VIDEO_DATA_OPT_NOT_UINT",
    "MEDIA_VIDEO_FPS_NOT_UINT",
    "INVALID_MEDIA_SHARE_PARAMS",
    "INVALID_AUDIO_DATA_BUFFER",
    "INVALID_VIDEO_DATA_BUFFER",
    "POST_FIRST_PACKET_FAILURE",
    "RTMS_SESSION_NOT_FOUND",
];

/// Stop reason names, indexed by code. Shared by `reason` and `stop_reason`.
const STOP_REASON_NAMES: [&str; 19] = [
    "UNDEFINED",
    "STOP_BC_HOST_TRIGGERED",
    "STOP_BC_USER_TRIGGERED",
    "STOP_BC_USER_LEFT",
    "STOP_BC_USER_EJECTED",
    "STOP_BC_APP_DISABLED_BY_HOST",
    "STOP_BC_MEETING_ENDED",
    "STOP_BC_STREAM_CANCELED",
    "STOP_BC_STREAM_REVOKED",
    "STOP_BC_ALL_APPS_DISABLED",
    "STOP_BC_INTERNAL_EXCEPTION",
    "STOP_BC_CONNECTION_TIMEOUT",
    "STOP_BC_MEETING_CONNECTION_INTERRUPTED",
    "STOP_BC_SIGNAL_CONNECTION_INTERRUPTED",
    "STOP_BC_DATA_CONNECTION_INTERRUPTED",
    "STOP_BC_SIGNAL_CONNECTION_CLOSED_ABNORMALLY",
    "STOP_BC_DATA_CONNECTION_CLOSED_ABNORMALLY",
    "STOP_BC_EXIT_SIGNAL",
    "STOP_BC_AUTHENTICATION_FAILURE",
];

/// Stop reason reported when the meeting itself has ended.
pub const STOP_REASON_MEETING_ENDED: i64 = 6;

fn lookup(table: &'static [&'static str], code: i64) -> &'static str {
    usize::try_from(code)
        .ok()
        .and_then(|idx| table.get(idx))
        .copied()
        .unwrap_or("UNKNOWN")
}

/// Name of a handshake `status_code`.
#[must_use]
pub fn status_name(code: i64) -> &'static str {
    lookup(&STATUS_NAMES, code)
}

/// Name of a `reason` / `stop_reason` code.
#[must_use]
pub fn stop_reason_name(code: i64) -> &'static str {
    lookup(&STOP_REASON_NAMES, code)
}

/// Relay-side stream state (`STREAM_STATE.state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Inactive,
    Active,
    Interrupted,
    Terminating,
    Terminated,
}

impl StreamState {
    /// Parse a wire code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(StreamState::Inactive),
            1 => Some(StreamState::Active),
            2 => Some(StreamState::Interrupted),
            3 => Some(StreamState::Terminating),
            4 => Some(StreamState::Terminated),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            StreamState::Inactive => "INACTIVE",
            StreamState::Active => "ACTIVE",
            StreamState::Interrupted => "INTERRUPTED",
            StreamState::Terminating => "TERMINATING",
            StreamState::Terminated => "TERMINATED",
        }
    }
}

/// Relay-side session lifecycle state (`SESSION_STATE.state`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Inactive,
    Initialize,
    Started,
    Paused,
    Resumed,
    Stopped,
}

impl SessionState {
    /// Parse a wire code.
    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SessionState::Inactive),
            1 => Some(SessionState::Initialize),
            2 => Some(SessionState::Started),
            3 => Some(SessionState::Paused),
            4 => Some(SessionState::Resumed),
            5 => Some(SessionState::Stopped),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionState::Inactive => "INACTIVE",
            SessionState::Initialize => "INITIALIZE",
            SessionState::Started => "STARTED",
            SessionState::Paused => "PAUSED",
            SessionState::Resumed => "RESUMED",
            SessionState::Stopped => "STOPPED",
        }
    }
}

/// Signaling event type (`EVENT.event.event_type`, `EVENT_SUBSCRIBE`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Undefined,
    FirstPacketTimestamp,
    ActiveSpeakerChange,
    ParticipantJoin,
    ParticipantLeave,
}

impl EventType {
    /// Events the client subscribes to after a successful signaling handshake.
    pub const SUBSCRIBED: [EventType; 3] = [
        EventType::ActiveSpeakerChange,
        EventType::ParticipantJoin,
        EventType::ParticipantLeave,
    ];

    /// Parse a wire code.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(EventType::Undefined),
            1 => Some(EventType::FirstPacketTimestamp),
            2 => Some(EventType::ActiveSpeakerChange),
            3 => Some(EventType::ParticipantJoin),
            4 => Some(EventType::ParticipantLeave),
            _ => None,
        }
    }

    /// Wire code.
    #[must_use]
    pub const fn code(&self) -> u32 {
        match self {
            EventType::Undefined => 0,
            EventType::FirstPacketTimestamp => 1,
            EventType::ActiveSpeakerChange => 2,
            EventType::ParticipantJoin => 3,
            EventType::ParticipantLeave => 4,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EventType::Undefined => "UNDEFINED",
            EventType::FirstPacketTimestamp => "FIRST_PACKET_TIMESTAMP",
            EventType::ActiveSpeakerChange => "ACTIVE_SPEAKER_CHANGE",
            EventType::ParticipantJoin => "PARTICIPANT_JOIN",
            EventType::ParticipantLeave => "PARTICIPANT_LEAVE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(status_name(STATUS_OK), "OK");
        assert_eq!(status_name(15), "INVALID_SIGNATURE");
        assert_eq!(status_name(62), "RTMS_SESSION_NOT_FOUND");
        assert_eq!(status_name(63), "UNKNOWN");
        assert_eq!(status_name(-1), "UNKNOWN");
    }

    #[test]
    fn test_stop_reason_names() {
        assert_eq!(
            stop_reason_name(STOP_REASON_MEETING_ENDED),
            "STOP_BC_MEETING_ENDED"
        );
        assert_eq!(stop_reason_name(18), "STOP_BC_AUTHENTICATION_FAILURE");
        assert_eq!(stop_reason_name(19), "UNKNOWN");
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!(StreamState::from_code(4), Some(StreamState::Terminated));
        assert_eq!(StreamState::from_code(9), None);
        assert_eq!(SessionState::from_code(5), Some(SessionState::Stopped));
        assert_eq!(SessionState::from_code(2).map(|s| s.as_str()), Some("STARTED"));
    }

    #[test]
    fn test_subscribed_event_codes() {
        let codes: Vec<u32> = EventType::SUBSCRIBED.iter().map(EventType::code).collect();
        assert_eq!(codes, vec![2, 3, 4]);
        assert_eq!(EventType::from_code(1), Some(EventType::FirstPacketTimestamp));
    }
}
