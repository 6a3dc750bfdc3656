//! RTMS client configuration.
//!
//! Configuration is loaded from environment variables. The client secret is
//! redacted in Debug output.

use crate::continuity::{ContinuitySettings, DEFAULT_GAP_THRESHOLD_MS, DEFAULT_MAX_BACKFILL_FRAMES};
use crate::signature::Signer;
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default reconnect delay in milliseconds.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 3000;

/// Default declared video frame rate.
pub const DEFAULT_VIDEO_FPS: u32 = 25;

/// Default consumer event queue depth.
pub const DEFAULT_EVENT_QUEUE_CAPACITY: usize = 1024;

/// Default per-connection outbound queue depth.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Default `media_type` bitmask (all media).
pub const DEFAULT_MEDIA_TYPE: u32 = 32;

/// Upper bound for `RTMS_MAX_BACKFILL_FRAMES` (six minutes at 25 fps).
pub const MAX_BACKFILL_FRAMES_LIMIT: u64 = 9_000;

/// RTMS client configuration.
#[derive(Clone)]
pub struct Config {
    /// App client ID (`ZM_CLIENT_ID`).
    pub client_id: String,

    /// App client secret (`ZM_CLIENT_SECRET`), the HMAC key for handshakes.
    pub client_secret: SecretString,

    /// Delay before a scheduled reconnect (default: 3000 ms).
    pub reconnect_delay_ms: u64,

    /// Video gap threshold for backfill (default: 500 ms).
    pub gap_threshold_ms: i64,

    /// Declared video frame rate; also sets the backfill frame period (default: 25).
    pub video_fps: u32,

    /// Cap on placeholders inserted for one gap (default: 750).
    pub max_backfill_frames: u64,

    /// Consumer event queue depth (default: 1024).
    pub event_queue_capacity: usize,

    /// Per-connection outbound queue depth (default: 256).
    pub outbound_queue_capacity: usize,

    /// `media_type` bitmask sent in the data handshake (default: 32).
    pub media_type: u32,

    /// Health and metrics endpoint bind address (default: "0.0.0.0:8080").
    pub health_bind_address: String,

    /// Optional file holding a pre-encoded placeholder frame.
    pub placeholder_path: Option<String>,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("reconnect_delay_ms", &self.reconnect_delay_ms)
            .field("gap_threshold_ms", &self.gap_threshold_ms)
            .field("video_fps", &self.video_fps)
            .field("max_backfill_frames", &self.max_backfill_frames)
            .field("event_queue_capacity", &self.event_queue_capacity)
            .field("outbound_queue_capacity", &self.outbound_queue_capacity)
            .field("media_type", &self.media_type)
            .field("health_bind_address", &self.health_bind_address)
            .field("placeholder_path", &self.placeholder_path)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Config::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when the client credentials are
    /// absent and [`ConfigError::InvalidValue`] for unparseable or
    /// out-of-range values.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let client_id = required(vars, "ZM_CLIENT_ID")?;
        let client_secret = SecretString::from(required(vars, "ZM_CLIENT_SECRET")?);

        let reconnect_delay_ms =
            parse_or(vars, "RTMS_RECONNECT_DELAY_MS", DEFAULT_RECONNECT_DELAY_MS)?;
        let gap_threshold_ms = parse_or(vars, "RTMS_GAP_THRESHOLD_MS", DEFAULT_GAP_THRESHOLD_MS)?;
        let video_fps = parse_or(vars, "RTMS_VIDEO_FPS", DEFAULT_VIDEO_FPS)?;
        let max_backfill_frames =
            parse_or(vars, "RTMS_MAX_BACKFILL_FRAMES", DEFAULT_MAX_BACKFILL_FRAMES)?;
        let event_queue_capacity =
            parse_or(vars, "RTMS_EVENT_QUEUE_CAPACITY", DEFAULT_EVENT_QUEUE_CAPACITY)?;
        let outbound_queue_capacity = parse_or(
            vars,
            "RTMS_OUTBOUND_QUEUE_CAPACITY",
            DEFAULT_OUTBOUND_QUEUE_CAPACITY,
        )?;
        let media_type = parse_or(vars, "RTMS_MEDIA_TYPE", DEFAULT_MEDIA_TYPE)?;

        let health_bind_address = vars
            .get("RTMS_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let placeholder_path = vars
            .get("RTMS_PLACEHOLDER_PATH")
            .filter(|p| !p.is_empty())
            .cloned();

        if video_fps == 0 || video_fps > 1000 {
            return Err(ConfigError::InvalidValue(format!(
                "RTMS_VIDEO_FPS must be between 1 and 1000, got {video_fps}"
            )));
        }
        if gap_threshold_ms < 0 {
            return Err(ConfigError::InvalidValue(format!(
                "RTMS_GAP_THRESHOLD_MS must not be negative, got {gap_threshold_ms}"
            )));
        }
        if max_backfill_frames > MAX_BACKFILL_FRAMES_LIMIT {
            return Err(ConfigError::InvalidValue(format!(
                "RTMS_MAX_BACKFILL_FRAMES must be at most {MAX_BACKFILL_FRAMES_LIMIT}, got {max_backfill_frames}"
            )));
        }
        if event_queue_capacity == 0 || outbound_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "queue capacities must be at least 1".to_string(),
            ));
        }

        Ok(Config {
            client_id,
            client_secret,
            reconnect_delay_ms,
            gap_threshold_ms,
            video_fps,
            max_backfill_frames,
            event_queue_capacity,
            outbound_queue_capacity,
            media_type,
            health_bind_address,
            placeholder_path,
        })
    }

    /// Handshake signer for these credentials.
    #[must_use]
    pub fn signer(&self) -> Signer {
        Signer::new(self.client_id.clone(), self.client_secret.clone())
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Backfill parameters; the frame period follows the declared fps.
    #[must_use]
    pub fn continuity_settings(&self) -> ContinuitySettings {
        ContinuitySettings {
            gap_threshold_ms: self.gap_threshold_ms,
            frame_period_ms: 1000 / i64::from(self.video_fps.max(1)),
            max_backfill_frames: self.max_backfill_frames,
        }
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    vars.get(key)
        .filter(|v| !v.is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_or<T>(vars: &HashMap<String, String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(format!("{key}={raw:?}: {e}"))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::secret::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            ("ZM_CLIENT_ID".to_string(), "client-abc".to_string()),
            ("ZM_CLIENT_SECRET".to_string(), "s3cr3t-value".to_string()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.client_id, "client-abc");
        assert_eq!(config.client_secret.expose_secret(), "s3cr3t-value");
        assert_eq!(config.reconnect_delay(), Duration::from_millis(3000));
        assert_eq!(config.gap_threshold_ms, 500);
        assert_eq!(config.video_fps, 25);
        assert_eq!(config.max_backfill_frames, 750);
        assert_eq!(config.event_queue_capacity, 1024);
        assert_eq!(config.outbound_queue_capacity, 256);
        assert_eq!(config.media_type, 32);
        assert_eq!(config.health_bind_address, DEFAULT_HEALTH_BIND_ADDRESS);
        assert_eq!(config.placeholder_path, None);

        let continuity = config.continuity_settings();
        assert_eq!(continuity.frame_period_ms, 40);
        assert_eq!(continuity.gap_threshold_ms, 500);
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("RTMS_RECONNECT_DELAY_MS".to_string(), "250".to_string());
        vars.insert("RTMS_GAP_THRESHOLD_MS".to_string(), "1000".to_string());
        vars.insert("RTMS_VIDEO_FPS".to_string(), "30".to_string());
        vars.insert("RTMS_MAX_BACKFILL_FRAMES".to_string(), "90".to_string());
        vars.insert("RTMS_EVENT_QUEUE_CAPACITY".to_string(), "16".to_string());
        vars.insert("RTMS_OUTBOUND_QUEUE_CAPACITY".to_string(), "8".to_string());
        vars.insert("RTMS_MEDIA_TYPE".to_string(), "1".to_string());
        vars.insert(
            "RTMS_HEALTH_BIND_ADDRESS".to_string(),
            "127.0.0.1:9090".to_string(),
        );
        vars.insert(
            "RTMS_PLACEHOLDER_PATH".to_string(),
            "/srv/black.h264".to_string(),
        );

        let config = Config::from_vars(&vars).expect("Config should load successfully");

        assert_eq!(config.reconnect_delay_ms, 250);
        assert_eq!(config.video_fps, 30);
        assert_eq!(config.continuity_settings().frame_period_ms, 33);
        assert_eq!(config.continuity_settings().max_backfill_frames, 90);
        assert_eq!(config.event_queue_capacity, 16);
        assert_eq!(config.outbound_queue_capacity, 8);
        assert_eq!(config.media_type, 1);
        assert_eq!(config.health_bind_address, "127.0.0.1:9090");
        assert_eq!(config.placeholder_path.as_deref(), Some("/srv/black.h264"));
    }

    #[test]
    fn test_from_vars_missing_credentials() {
        let mut vars = base_vars();
        vars.remove("ZM_CLIENT_SECRET");
        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "ZM_CLIENT_SECRET"));

        let mut vars = base_vars();
        vars.insert("ZM_CLIENT_ID".to_string(), String::new());
        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "ZM_CLIENT_ID"));
    }

    #[test]
    fn test_from_vars_rejects_invalid_numbers() {
        for (key, value) in [
            ("RTMS_RECONNECT_DELAY_MS", "soon"),
            ("RTMS_RECONNECT_DELAY_MS", "-5"),
            ("RTMS_VIDEO_FPS", "0"),
            ("RTMS_GAP_THRESHOLD_MS", "-1"),
            ("RTMS_EVENT_QUEUE_CAPACITY", "0"),
            ("RTMS_MEDIA_TYPE", "all"),
            ("RTMS_MAX_BACKFILL_FRAMES", "18446744073709551615"),
            ("RTMS_MAX_BACKFILL_FRAMES", "9001"),
        ] {
            let mut vars = base_vars();
            vars.insert(key.to_string(), value.to_string());
            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::InvalidValue(_))),
                "{key}={value} should be rejected"
            );
        }
    }

    #[test]
    fn test_max_backfill_frames_limit_is_inclusive() {
        let mut vars = base_vars();
        vars.insert(
            "RTMS_MAX_BACKFILL_FRAMES".to_string(),
            MAX_BACKFILL_FRAMES_LIMIT.to_string(),
        );
        let config = Config::from_vars(&vars).expect("Config should load successfully");
        assert_eq!(config.max_backfill_frames, MAX_BACKFILL_FRAMES_LIMIT);
    }

    #[test]
    fn test_debug_redacts_sensitive_fields() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("client-abc"));
        assert!(!debug_output.contains("s3cr3t-value"));
        assert!(!format!("{:?}", config.signer()).contains("s3cr3t-value"));
    }
}
