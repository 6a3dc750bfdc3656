//! Metrics definitions for the RTMS client.
//!
//! All metrics follow Prometheus naming conventions:
//! - `rtms_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `channel`: 2 values (signaling, media)
//! - `message_type`: 16 values (wire message types)
//! - `kind`: 5 values (media kinds)
//! - `plan`: 4 values (reconnect plans)
//! - `reason`: bounded by session end reasons (~6 values)
//!
//! Meeting UUIDs are never used as labels.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Initialize the Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus metrics recorder: {e}"))
}

// ============================================================================
// Session Metrics
// ============================================================================

/// Set the number of live sessions.
///
/// Metric: `rtms_sessions_active`
pub fn set_sessions_active(count: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("rtms_sessions_active").set(count as f64);
}

/// Record a session leaving the registry.
///
/// Metric: `rtms_sessions_ended_total`
/// Labels: `reason`
pub fn record_session_ended(reason: &'static str) {
    counter!("rtms_sessions_ended_total", "reason" => reason).increment(1);
}

/// Set the mailbox depth for an actor type.
///
/// Metric: `rtms_actor_mailbox_depth`
/// Labels: `actor_type` (registry, session)
pub fn set_actor_mailbox_depth(actor_type: &'static str, depth: usize) {
    #[allow(clippy::cast_precision_loss)]
    gauge!("rtms_actor_mailbox_depth", "actor_type" => actor_type).set(depth as f64);
}

// ============================================================================
// Connection Metrics
// ============================================================================

/// Record a relay connection being established.
///
/// Metric: `rtms_connections_opened_total`
/// Labels: `channel`
pub fn record_connection_opened(channel: &'static str) {
    counter!("rtms_connections_opened_total", "channel" => channel).increment(1);
}

/// Record a failed connect attempt.
///
/// Metric: `rtms_connect_failures_total`
/// Labels: `channel`
pub fn record_connect_failure(channel: &'static str) {
    counter!("rtms_connect_failures_total", "channel" => channel).increment(1);
}

/// Record a reconnection decision.
///
/// Metric: `rtms_reconnects_total`
/// Labels: `plan` (media_only, full_bootstrap, signaling, terminate)
pub fn record_reconnect(plan: &'static str) {
    counter!("rtms_reconnects_total", "plan" => plan).increment(1);
}

/// Record an outbound message that could not be queued.
///
/// Metric: `rtms_send_failures_total`
/// Labels: `channel`
pub fn record_send_failure(channel: &'static str) {
    counter!("rtms_send_failures_total", "channel" => channel).increment(1);
}

// ============================================================================
// Message Metrics
// ============================================================================

/// Record an inbound message by type.
///
/// Metric: `rtms_messages_received_total`
/// Labels: `channel`, `message_type`
pub fn record_message_received(channel: &'static str, message_type: &'static str) {
    counter!(
        "rtms_messages_received_total",
        "channel" => channel,
        "message_type" => message_type
    )
    .increment(1);
}

/// Record an inbound message dropped as a protocol violation.
///
/// Metric: `rtms_protocol_violations_total`
/// Labels: `channel`
pub fn record_protocol_violation(channel: &'static str) {
    counter!("rtms_protocol_violations_total", "channel" => channel).increment(1);
}

// ============================================================================
// Frame Metrics
// ============================================================================

/// Record a frame handed to the event channel.
///
/// Metric: `rtms_frames_emitted_total`
/// Labels: `kind`
pub fn record_frame_emitted(kind: &'static str) {
    counter!("rtms_frames_emitted_total", "kind" => kind).increment(1);
}

/// Record a frame dropped because the event channel was full.
///
/// Metric: `rtms_frames_dropped_total`
/// Labels: `kind`
///
/// Non-zero values mean the consumer is slower than the relay.
pub fn record_frame_dropped(kind: &'static str) {
    counter!("rtms_frames_dropped_total", "kind" => kind).increment(1);
}

/// Record placeholder frames inserted to fill a gap.
///
/// Metric: `rtms_placeholder_frames_total`
pub fn record_placeholder_frames(count: u64) {
    counter!("rtms_placeholder_frames_total").increment(count);
}
