//! Secret types for protecting credentials from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for the relay client secret and any
//! other credential material. `SecretString` implements `Debug` with
//! redaction, so a struct that derives `Debug` while holding one is safe to
//! log through `{:?}` or tracing fields.
//!
//! Secrets are zeroized when dropped.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct RelayCredentials {
//!     client_id: String,
//!     client_secret: SecretString,
//! }
//!
//! let creds = RelayCredentials {
//!     client_id: "app-client".to_string(),
//!     client_secret: SecretString::from("shhh"),
//! };
//!
//! // The secret is redacted in Debug output
//! assert!(!format!("{creds:?}").contains("shhh"));
//!
//! // Reading the value requires an explicit call
//! let secret: &str = creds.client_secret.expose_secret();
//! assert_eq!(secret, "shhh");
//! ```
//!
//! Use `SecretString` for the OAuth client secret that keys handshake
//! signatures and for webhook verification tokens. Use `SecretBox<T>` for
//! binary key material.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
