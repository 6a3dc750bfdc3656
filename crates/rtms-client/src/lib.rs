//! RTMS Client Library
//!
//! Client for a real-time media relay: for each meeting stream it opens a
//! signaling WebSocket, authenticates with an HMAC signature, opens the media
//! WebSocket advertised by the relay and publishes decoded frames and relay
//! events on a bounded channel.
//!
//! # Architecture
//!
//! ```text
//! SessionRegistry (singleton)
//! └── SessionActor (one per meeting stream)
//!     ├── SignalingChannel  handshake, event subscription, keep-alive
//!     └── MediaChannel      data handshake, frames, keep-alive
//!
//! SessionEvent channel ──> ContinuityStage (optional) ──> consumer
//! ```
//!
//! # Key Design Decisions
//!
//! - **Pure channel state machines**: dispatchers return effects, the session
//!   actor performs all I/O
//! - **Epoch-guarded reconnects**: stale timers and superseded connections
//!   are ignored
//! - **Fail-soft sends**: a full or closed connection drops the message with
//!   a warning
//!
//! # Modules
//!
//! - [`actors`] - Registry and session actors
//! - [`channel`] - Signaling and media state machines
//! - [`config`] - Configuration from environment
//! - [`continuity`] - Placeholder backfill for video gaps
//! - [`errors`] - Error types and categories
//! - [`notifications`] - Session start/stop notifications
//! - [`protocol`] - Wire message types and codes
//! - [`transport`] - WebSocket transport abstraction

pub mod actors;
pub mod channel;
pub mod config;
pub mod continuity;
pub mod errors;
pub mod events;
pub mod frame;
pub mod notifications;
pub mod observability;
pub mod protocol;
pub mod reconnect;
pub mod signature;
pub mod transport;
