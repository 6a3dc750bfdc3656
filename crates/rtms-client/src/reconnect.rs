//! Cross-channel reconnection policy.
//!
//! Pure decisions over a [`ChannelView`] of the session. The session actor
//! executes the returned [`ReconnectPlan`], bumping its epoch for every
//! plan that schedules work so timers from older decisions become no-ops.
//!
//! | Closed    | Condition                          | Plan                    |
//! |-----------|------------------------------------|-------------------------|
//! | media     | reconnect disabled                 | nothing                 |
//! | media     | signaling Ready and connected      | media only, after delay |
//! | media     | otherwise                          | full bootstrap, now     |
//! | signaling | reconnect enabled                  | signaling, after delay  |
//! | signaling | reconnect disabled                 | terminate               |

use crate::channel::SignalingState;
use std::time::Duration;

/// Default delay before a scheduled reconnect.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// What the policy needs to know about a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelView {
    pub reconnect: bool,
    pub signaling_state: SignalingState,
    /// Whether a signaling connection is currently open.
    pub signaling_open: bool,
}

/// Decision returned by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPlan {
    Nothing,
    /// Reopen media after `delay`, reusing the live signaling channel.
    MediaOnly { delay: Duration },
    /// Drop any half-open signaling and start over from the signaling handshake.
    FullBootstrap,
    /// Reopen signaling after `delay`.
    Signaling { delay: Duration },
    /// Delete the session.
    Terminate,
}

impl ReconnectPlan {
    /// Label for metrics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReconnectPlan::Nothing => "nothing",
            ReconnectPlan::MediaOnly { .. } => "media_only",
            ReconnectPlan::FullBootstrap => "full_bootstrap",
            ReconnectPlan::Signaling { .. } => "signaling",
            ReconnectPlan::Terminate => "terminate",
        }
    }
}

/// Decide what to do after the media connection closed.
#[must_use]
pub fn on_media_closed(view: ChannelView, delay: Duration) -> ReconnectPlan {
    if !view.reconnect {
        return ReconnectPlan::Nothing;
    }

    if view.signaling_state == SignalingState::Ready && view.signaling_open {
        ReconnectPlan::MediaOnly { delay }
    } else {
        ReconnectPlan::FullBootstrap
    }
}

/// Decide what to do after the signaling connection closed.
///
/// An open media connection is left alone: it either fails on its own or is
/// superseded once signaling is Ready again.
#[must_use]
pub fn on_signaling_closed(view: ChannelView, delay: Duration) -> ReconnectPlan {
    if view.reconnect {
        ReconnectPlan::Signaling { delay }
    } else {
        ReconnectPlan::Terminate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(reconnect: bool, signaling_state: SignalingState, signaling_open: bool) -> ChannelView {
        ChannelView {
            reconnect,
            signaling_state,
            signaling_open,
        }
    }

    #[test]
    fn test_media_close_with_ready_signaling_reconnects_media_only() {
        let plan = on_media_closed(
            view(true, SignalingState::Ready, true),
            DEFAULT_RECONNECT_DELAY,
        );
        assert_eq!(
            plan,
            ReconnectPlan::MediaOnly {
                delay: Duration::from_millis(3000)
            }
        );
    }

    #[test]
    fn test_media_close_without_ready_signaling_bootstraps() {
        for state in [
            SignalingState::Connecting,
            SignalingState::Authenticated,
            SignalingState::Closed,
            SignalingState::Errored,
        ] {
            assert_eq!(
                on_media_closed(view(true, state, true), DEFAULT_RECONNECT_DELAY),
                ReconnectPlan::FullBootstrap,
                "state {state:?}"
            );
        }

        // Ready but the socket is already gone
        assert_eq!(
            on_media_closed(
                view(true, SignalingState::Ready, false),
                DEFAULT_RECONNECT_DELAY
            ),
            ReconnectPlan::FullBootstrap
        );
    }

    #[test]
    fn test_media_close_after_stop_does_nothing() {
        assert_eq!(
            on_media_closed(
                view(false, SignalingState::Ready, true),
                DEFAULT_RECONNECT_DELAY
            ),
            ReconnectPlan::Nothing
        );
    }

    #[test]
    fn test_signaling_close() {
        let delay = Duration::from_millis(250);
        assert_eq!(
            on_signaling_closed(view(true, SignalingState::Closed, false), delay),
            ReconnectPlan::Signaling { delay }
        );
        assert_eq!(
            on_signaling_closed(view(false, SignalingState::Closed, false), delay),
            ReconnectPlan::Terminate
        );
    }

    #[test]
    fn test_plan_labels() {
        assert_eq!(ReconnectPlan::FullBootstrap.as_str(), "full_bootstrap");
        assert_eq!(
            ReconnectPlan::MediaOnly {
                delay: Duration::ZERO
            }
            .as_str(),
            "media_only"
        );
    }
}
