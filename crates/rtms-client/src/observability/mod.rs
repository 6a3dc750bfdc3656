//! Observability for the client.
//!
//! - `health` - Liveness and readiness endpoints
//! - `metrics` - Prometheus metric definitions and recorder setup

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
