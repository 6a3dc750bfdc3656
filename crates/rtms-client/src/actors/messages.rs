//! Message types for actor communication.
//!
//! All inter-actor communication uses typed message passing via
//! `tokio::sync::mpsc`; request-reply uses `tokio::sync::oneshot`.

use crate::actors::metrics::MailboxLevel;
use crate::channel::{MediaState, SignalingState};
use crate::errors::{ChannelKind, RtmsError};
use crate::transport::{OutboundFrame, TransportEvent};
use common::types::{MeetingUuid, StreamId};
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Parameters of a session start (from a `meeting.rtms_started` notification).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartSession {
    pub meeting_uuid: MeetingUuid,
    pub stream_id: StreamId,
    /// Signaling endpoint (`server_urls`).
    pub relay_url: String,
}

/// Messages sent to the `SessionRegistry` actor.
#[derive(Debug)]
pub enum RegistryMessage {
    /// Create and start a session.
    StartSession {
        request: StartSession,
        /// Instance ID of the new session, or error.
        respond_to: oneshot::Sender<Result<Uuid, RtmsError>>,
    },

    /// Stop and remove a session.
    StopSession {
        meeting_uuid: MeetingUuid,
        respond_to: oneshot::Sender<Result<(), RtmsError>>,
    },

    /// Snapshot one session.
    GetSession {
        meeting_uuid: MeetingUuid,
        respond_to: oneshot::Sender<Result<SessionSnapshot, RtmsError>>,
    },

    /// Snapshot every live session.
    ListSessions {
        respond_to: oneshot::Sender<Vec<SessionSnapshot>>,
    },

    /// A session actor ended on its own. Ignored unless `instance_id` matches
    /// the registered session.
    SessionEnded {
        meeting_uuid: MeetingUuid,
        instance_id: Uuid,
    },

    /// Stop accepting sessions and cancel everything.
    Shutdown {
        respond_to: oneshot::Sender<Result<(), RtmsError>>,
    },
}

/// Messages sent to a `SessionActor`.
#[derive(Debug)]
pub enum SessionMessage {
    /// Snapshot session state.
    GetSnapshot {
        respond_to: oneshot::Sender<SessionSnapshot>,
    },

    /// Stop: disable reconnection, close both channels, exit.
    Stop {
        respond_to: Option<oneshot::Sender<()>>,
    },

    /// A connect attempt succeeded.
    Opened {
        channel: ChannelKind,
        conn_id: u64,
        outbound: mpsc::Sender<OutboundFrame>,
    },

    /// A connect attempt failed.
    ConnectFailed {
        channel: ChannelKind,
        conn_id: u64,
        error: RtmsError,
    },

    /// Event from an open connection.
    Transport {
        channel: ChannelKind,
        conn_id: u64,
        event: TransportEvent,
    },

    /// A scheduled reconnect fired. Ignored unless `epoch` is current.
    ReconnectDue { channel: ChannelKind, epoch: u64 },
}

/// Read-only copy of a session's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub meeting_uuid: MeetingUuid,
    pub stream_id: StreamId,
    pub instance_id: Uuid,
    pub signaling_state: SignalingState,
    pub media_state: MediaState,
    pub reconnect: bool,
    pub epoch: u64,
    /// Whether a signaling connection is currently open.
    pub signaling_open: bool,
    /// Whether a media connection is currently open.
    pub media_open: bool,
    pub signaling_keep_alive_ms: Option<i64>,
    pub media_keep_alive_ms: Option<i64>,
    /// Signaling connect attempts so far.
    pub signaling_connects: u32,
    /// Media connect attempts so far.
    pub media_connects: u32,
    /// Media URL from the last accepted signaling handshake.
    pub media_url: Option<String>,
    /// Media frames dropped for arriving outside `Streaming`.
    pub media_discarded_frames: u64,
    pub mailbox_level: MailboxLevel,
    /// Largest mailbox backlog seen by the session.
    pub mailbox_peak: usize,
}
