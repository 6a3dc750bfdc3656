//! Actor hierarchy of the client.
//!
//! ```text
//! SessionRegistry (singleton)
//! └── supervises N SessionActors
//!     └── SessionActor (one per meeting stream)
//!         ├── signaling connection
//!         └── media connection
//! ```
//!
//! # Components
//!
//! - `registry` - Session lifecycle and meeting UUID lookup
//! - `session` - Per-meeting protocol driver and reconnection
//! - `messages` - Mailbox message types
//! - `metrics` - Mailbox monitoring and actor counters

pub mod messages;
pub mod metrics;
pub mod registry;
pub mod session;

pub use messages::{SessionSnapshot, StartSession};
pub use metrics::{ActorMetrics, ActorType, MailboxLevel, MailboxMonitor};
pub use registry::SessionRegistryHandle;
pub use session::{SessionActor, SessionActorHandle, SessionContext, SessionSettings};
