//! RTMS client error types.
//!
//! Every error maps to one [`ErrorCategory`], which decides how the session
//! reacts: transient network faults are retried by the reconnection policy,
//! protocol violations drop a single message, and the remaining categories
//! are terminal for the socket or the whole session.

use thiserror::Error;

/// Which of the two relay connections an error or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Signaling connection (handshake, events, stream state).
    Signaling,
    /// Media connection (data handshake, frames).
    Media,
}

impl ChannelKind {
    /// Returns the channel kind as a string for log fields and metric labels.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ChannelKind::Signaling => "signaling",
            ChannelKind::Media => "media",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error taxonomy used to pick the recovery path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Socket error or close. Governed by the reconnection policy.
    TransientNetworkFailure,
    /// Malformed JSON or unrecognized message. Message dropped, connection kept.
    ProtocolViolation,
    /// Nonzero handshake status. Terminal for that socket.
    AuthenticationFailure,
    /// Stop notification or relay-reported meeting end. Session deleted.
    SessionTerminated,
    /// Malformed input such as a relay URL. Reconnection disabled.
    InputValidationFailure,
    /// Local faults (mailbox gone, registry misuse, configuration).
    Internal,
}

/// RTMS client error type.
#[derive(Debug, Error)]
pub enum RtmsError {
    /// Socket-level failure (connect refused, TLS, abrupt close).
    #[error("{channel} transport error: {reason}")]
    Transport { channel: ChannelKind, reason: String },

    /// Inbound message that could not be decoded or is not understood.
    #[error("Protocol violation on {channel}: {reason}")]
    ProtocolViolation { channel: ChannelKind, reason: String },

    /// Relay rejected a handshake with a nonzero status code.
    #[error("{channel} handshake rejected: status {status_code} ({status_name})")]
    AuthenticationFailure {
        channel: ChannelKind,
        status_code: i64,
        status_name: &'static str,
    },

    /// Session ended by notification or by the relay.
    #[error("Session terminated: {0}")]
    SessionTerminated(String),

    /// Relay URL is not an absolute ws:// or wss:// URL.
    #[error("Invalid relay URL: {0}")]
    InvalidRelayUrl(String),

    /// No session registered for the meeting.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A live session already exists for the meeting.
    #[error("Session already exists: {0}")]
    SessionExists(String),

    /// Registry is shutting down and refuses new sessions.
    #[error("Registry is draining")]
    Draining,

    /// Outbound queue of a connection is full or closed.
    #[error("{channel} send failed: {reason}")]
    SendFailed { channel: ChannelKind, reason: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (actor mailbox closed, response dropped).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RtmsError {
    /// Returns the taxonomy category for this error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            RtmsError::Transport { .. } | RtmsError::SendFailed { .. } => {
                ErrorCategory::TransientNetworkFailure
            }
            RtmsError::ProtocolViolation { .. } => ErrorCategory::ProtocolViolation,
            RtmsError::AuthenticationFailure { .. } => ErrorCategory::AuthenticationFailure,
            RtmsError::SessionTerminated(_) => ErrorCategory::SessionTerminated,
            RtmsError::InvalidRelayUrl(_) => ErrorCategory::InputValidationFailure,
            RtmsError::SessionNotFound(_)
            | RtmsError::SessionExists(_)
            | RtmsError::Draining
            | RtmsError::Config(_)
            | RtmsError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Whether the reconnection policy may retry after this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::TransientNetworkFailure
    }

    /// Short label for metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self.category() {
            ErrorCategory::TransientNetworkFailure => "transient_network",
            ErrorCategory::ProtocolViolation => "protocol_violation",
            ErrorCategory::AuthenticationFailure => "authentication_failure",
            ErrorCategory::SessionTerminated => "session_terminated",
            ErrorCategory::InputValidationFailure => "input_validation",
            ErrorCategory::Internal => "internal",
        }
    }
}
