//! Per-channel state machines and message dispatch.
//!
//! [`SignalingChannel`] and [`MediaChannel`] hold protocol state only. They
//! never touch sockets: each inbound message is dispatched by `msg_type` and
//! the handler returns a list of [`Effect`]s for the owning session to carry
//! out (send a reply, open media, emit a frame, end the session).

pub mod media;
pub mod signaling;

pub use media::MediaChannel;
pub use signaling::SignalingChannel;

use crate::events::{EndReason, RelayEvent};
use crate::frame::Frame;
use crate::protocol::messages::Outbound;
use common::types::{MeetingUuid, StreamId};

/// Signaling connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalingState {
    Connecting,
    /// Handshake sent, awaiting response.
    Authenticated,
    /// Handshake accepted; media URL known.
    Ready,
    Closed,
    Errored,
}

impl SignalingState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SignalingState::Connecting => "connecting",
            SignalingState::Authenticated => "authenticated",
            SignalingState::Ready => "ready",
            SignalingState::Closed => "closed",
            SignalingState::Errored => "errored",
        }
    }
}

/// Media connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Idle,
    Connecting,
    /// Data handshake sent, awaiting response.
    Authenticated,
    /// Data handshake accepted; frames flow.
    Streaming,
    Closed,
    Errored,
}

impl MediaState {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            MediaState::Idle => "idle",
            MediaState::Connecting => "connecting",
            MediaState::Authenticated => "authenticated",
            MediaState::Streaming => "streaming",
            MediaState::Closed => "closed",
            MediaState::Errored => "errored",
        }
    }
}

/// Session identity presented in both handshakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub meeting_uuid: MeetingUuid,
    pub stream_id: StreamId,
    /// Precomputed handshake signature.
    pub signature: String,
}

/// Work a channel handler asks the session to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send on the channel that received the message.
    Reply(Outbound),
    /// Send on the signaling channel (used by media for `CLIENT_READY_ACK`).
    SendOnSignaling(Outbound),
    /// Open the media channel against this URL.
    ConnectMedia(String),
    EmitFrame(Frame),
    EmitRelay(RelayEvent),
    /// Close both channels and remove the session.
    Terminate(EndReason),
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::SessionIdentity;
    use common::types::{MeetingUuid, StreamId};

    pub fn identity() -> SessionIdentity {
        SessionIdentity {
            meeting_uuid: MeetingUuid::from("4nYtdqLVTVqGJ+QB62ED7Q=="),
            stream_id: StreamId::from("03db704592624398931a588dd78200cb"),
            signature: "c0ffee".to_string(),
        }
    }
}
