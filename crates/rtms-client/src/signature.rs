//! Handshake signature generation.
//!
//! Both relay handshakes carry the same signature:
//!
//! ```text
//! signature = hex(HMAC-SHA256(client_secret, "{client_id},{meeting_uuid},{stream_id}"))
//! ```

use common::secret::{ExposeSecret, SecretString};
use common::types::{MeetingUuid, StreamId};
use ring::hmac;

/// Compute the relay handshake signature.
///
/// Deterministic and side-effect free. Returns lowercase hex.
#[must_use]
pub fn sign(client_id: &str, meeting_uuid: &str, stream_id: &str, secret: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let message = format!("{client_id},{meeting_uuid},{stream_id}");
    let tag = hmac::sign(&key, message.as_bytes());
    hex::encode(tag.as_ref())
}

/// App credentials used to sign handshakes for any session.
///
/// The client secret stays wrapped so `Debug` output never contains it.
#[derive(Debug, Clone)]
pub struct Signer {
    client_id: String,
    client_secret: SecretString,
}

impl Signer {
    /// Create a signer from the app's client credentials.
    #[must_use]
    pub fn new(client_id: String, client_secret: SecretString) -> Self {
        Self {
            client_id,
            client_secret,
        }
    }

    /// The app client ID.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Sign a handshake for the given meeting and stream.
    #[must_use]
    pub fn sign(&self, meeting_uuid: &MeetingUuid, stream_id: &StreamId) -> String {
        sign(
            &self.client_id,
            meeting_uuid.as_str(),
            stream_id.as_str(),
            self.client_secret.expose_secret(),
        )
    }
}
