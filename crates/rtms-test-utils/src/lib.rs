//! # RTMS Test Utilities
//!
//! Shared test utilities for the RTMS client.
//!
//! ## Modules
//!
//! - `mock_transport` - Scripted in-memory relay for session tests
//! - `fixtures` - Relay message builders and test identities
//! - `scenario` - Multi-step relay conversations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use rtms_test_utils::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_example() {
//!     let (transport, mut relay) = MockTransport::pair();
//!     // Start a session with `Arc::new(transport)` ...
//!
//!     let mut signaling = relay.next_connection().await;
//!     let handshake = signaling.recv_json().await;
//!     signaling.send_json(fixtures::handshake_ok("wss://media.example/m")).await;
//! }
//! ```

pub mod fixtures;
pub mod mock_transport;
pub mod scenario;

pub use mock_transport::{settle, MockConnection, MockRelay, MockTransport};
