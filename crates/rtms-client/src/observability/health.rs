//! Health endpoints for the RTMS client.
//!
//! - `GET /health` - Liveness (is the session registry still running?)
//! - `GET /ready` - Readiness (is the client accepting sessions?)
//!
//! The `/metrics` endpoint is merged into the same router by `main` and
//! rendered by `metrics-exporter-prometheus`.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Liveness and readiness as seen by the health endpoints.
///
/// Liveness is derived from the registry's cancellation token: once the
/// registry is cancelled or its mailbox closes, the client reports itself
/// dead. Readiness is set by `main` after startup and cleared on shutdown,
/// and is never reported while the client is not live.
#[derive(Debug)]
pub struct HealthState {
    registry_token: CancellationToken,
    accepting: AtomicBool,
}

impl HealthState {
    /// Track the registry behind `registry_token`. Starts not ready.
    #[must_use]
    pub fn new(registry_token: CancellationToken) -> Self {
        Self {
            registry_token,
            accepting: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self) {
        self.accepting.store(true, Ordering::SeqCst);
    }

    /// Stop reporting ready (shutdown has begun).
    pub fn set_not_ready(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.registry_token.is_cancelled()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.is_live() && self.accepting.load(Ordering::SeqCst)
    }
}

/// Router serving `/health` and `/ready`.
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(liveness_handler))
        .route("/ready", get(readiness_handler))
        .with_state(health_state)
}

fn status(ok: bool) -> StatusCode {
    if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn liveness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    status(state.is_live())
}

async fn readiness_handler(State(state): State<Arc<HealthState>>) -> StatusCode {
    status(state.is_ready())
}
