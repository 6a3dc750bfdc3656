//! Events delivered to the consumer of a session.
//!
//! Sessions publish onto one bounded channel shared by the whole registry.
//! Frames and relay events are published with `try_send`: when the consumer
//! falls behind they are dropped and counted, so a slow consumer never
//! stalls keep-alive replies.

use crate::errors::ChannelKind;
use crate::frame::Frame;
use crate::observability::metrics;
use crate::protocol::codes::EventType;
use common::types::MeetingUuid;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// How long a session waits to publish its `Ended` event before giving up.
const ENDED_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Participant or speaker notification surfaced from signaling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEvent {
    pub meeting_uuid: MeetingUuid,
    /// Raw `event_type`; see [`RelayEvent::kind`].
    pub event_type: u32,
    pub user_id: Option<u64>,
    pub user_name: Option<String>,
    pub timestamp: Option<i64>,
}

impl RelayEvent {
    /// Parsed event type, if known.
    #[must_use]
    pub fn kind(&self) -> Option<EventType> {
        EventType::from_code(self.event_type)
    }
}

/// Why a session left the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    /// A stop notification was received.
    Stopped,
    /// The relay reported the meeting ended.
    MeetingEnded,
    /// A handshake was rejected.
    AuthenticationFailed {
        channel: ChannelKind,
        status_code: i64,
    },
    /// The relay URL was malformed.
    InvalidRelayUrl,
    /// Signaling closed for good with reconnection disabled.
    SignalingClosed,
    /// The registry shut down.
    Shutdown,
}

impl EndReason {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            EndReason::Stopped => "stopped",
            EndReason::MeetingEnded => "meeting_ended",
            EndReason::AuthenticationFailed { .. } => "authentication_failed",
            EndReason::InvalidRelayUrl => "invalid_relay_url",
            EndReason::SignalingClosed => "signaling_closed",
            EndReason::Shutdown => "shutdown",
        }
    }
}

/// What a consumer receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Frame(Frame),
    Relay(RelayEvent),
    Ended {
        meeting_uuid: MeetingUuid,
        reason: EndReason,
    },
}

impl SessionEvent {
    /// Meeting this event belongs to.
    #[must_use]
    pub fn meeting_uuid(&self) -> &MeetingUuid {
        match self {
            SessionEvent::Frame(frame) => &frame.meeting_uuid,
            SessionEvent::Relay(event) => &event.meeting_uuid,
            SessionEvent::Ended { meeting_uuid, .. } => meeting_uuid,
        }
    }
}

/// Sending side of the consumer event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::Sender<SessionEvent>,
    dropped: Arc<AtomicU64>,
}

impl EventSink {
    /// Create a sink and its receiving end.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            receiver,
        )
    }

    /// Publish a frame without waiting. Returns whether it was queued.
    pub fn emit_frame(&self, frame: Frame) -> bool {
        let kind = frame.kind.as_str();
        match self.sender.try_send(SessionEvent::Frame(frame)) {
            Ok(()) => {
                metrics::record_frame_emitted(kind);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                metrics::record_frame_dropped(kind);
                // Log the first drop of every thousand
                if dropped % 1000 == 1 {
                    warn!(
                        target: "rtms.session",
                        kind,
                        dropped,
                        "Event channel full, dropping frames"
                    );
                }
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(target: "rtms.session", kind, "Event channel closed, frame discarded");
                false
            }
        }
    }

    /// Publish a relay event without waiting. Returns whether it was queued.
    pub fn emit_relay(&self, event: RelayEvent) -> bool {
        match self.sender.try_send(SessionEvent::Relay(event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(target: "rtms.session", "Event channel full, dropping relay event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Publish the terminal event for a session, waiting briefly for room.
    pub async fn emit_ended(&self, meeting_uuid: MeetingUuid, reason: EndReason) {
        let event = SessionEvent::Ended {
            meeting_uuid,
            reason,
        };
        match tokio::time::timeout(ENDED_SEND_TIMEOUT, self.sender.send(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                debug!(target: "rtms.session", "Event channel closed, end event discarded");
            }
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(target: "rtms.session", "Timed out publishing session end event");
            }
        }
    }

    /// Total events dropped because the channel was full.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
