//! Identifier types for relay sessions.
//!
//! The relay hands out opaque string identifiers (meeting UUIDs are base64,
//! stream IDs are hex). They are wrapped so the two cannot be swapped at a
//! call site.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Relay meeting identifier (e.g. `4nYtdqLVTVqGJ+QB62ED7Q==`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeetingUuid(String);

impl MeetingUuid {
    /// Wrap a meeting UUID as received from the relay.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeetingUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MeetingUuid {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MeetingUuid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Relay media stream identifier (e.g. `03db704592624398931a588dd78200cb`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    /// Wrap a stream ID as received from the relay.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for StreamId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_is_transparent() {
        let id = MeetingUuid::new("4nYtdqLVTVqGJ+QB62ED7Q==");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""4nYtdqLVTVqGJ+QB62ED7Q==""#);

        let back: StreamId = serde_json::from_str(r#""03db7045""#).unwrap();
        assert_eq!(back.as_str(), "03db7045");
    }

    #[test]
    fn test_display_matches_raw_value() {
        assert_eq!(MeetingUuid::from("m-1").to_string(), "m-1");
        assert_eq!(StreamId::from("s-1".to_string()).to_string(), "s-1");
    }
}
