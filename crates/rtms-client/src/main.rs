//! RTMS Client
//!
//! Receives stream start/stop notifications as newline-delimited JSON on
//! stdin and runs one relay session per meeting.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment
//! 2. Initialize Prometheus metrics recorder
//! 3. Start health HTTP server (liveness, readiness, metrics)
//! 4. Initialize the session registry and continuity stage
//! 5. Read notifications until stdin closes or a shutdown signal arrives

#![warn(clippy::pedantic)]
#![allow(clippy::too_many_lines)] // main.rs orchestrates startup, naturally longer

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use bytes::Bytes;
use rtms_client::actors::{ActorMetrics, SessionContext, SessionRegistryHandle, SessionSettings};
use rtms_client::config::Config;
use rtms_client::continuity::{ContinuityStage, DEFAULT_PLACEHOLDER};
use rtms_client::events::{EventSink, SessionEvent};
use rtms_client::notifications;
use rtms_client::observability::metrics::init_metrics_recorder;
use rtms_client::observability::{health_router, HealthState};
use rtms_client::protocol::messages::MediaParams;
use rtms_client::transport::WebSocketTransport;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How long sessions get to close their connections on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(35);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rtms_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting RTMS client");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        client_id = %config.client_id,
        reconnect_delay_ms = config.reconnect_delay_ms,
        video_fps = config.video_fps,
        gap_threshold_ms = config.gap_threshold_ms,
        media_type = config.media_type,
        health_bind_address = %config.health_bind_address,
        "Configuration loaded successfully"
    );

    // Must happen before any metrics are recorded
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let placeholder = match &config.placeholder_path {
        Some(path) => {
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                error!(error = %e, path = %path, "Failed to read placeholder frame");
                format!("Failed to read placeholder frame {path}: {e}")
            })?;
            Bytes::from(bytes)
        }
        None => Bytes::from_static(DEFAULT_PLACEHOLDER),
    };

    // Session registry
    let (events, event_rx) = EventSink::channel(config.event_queue_capacity);
    let ctx = SessionContext {
        transport: Arc::new(WebSocketTransport::new(config.outbound_queue_capacity)),
        signer: config.signer(),
        settings: SessionSettings {
            reconnect_delay: config.reconnect_delay(),
            media_type: config.media_type,
            media_params: MediaParams::default().with_video_fps(config.video_fps),
        },
        events,
        metrics: ActorMetrics::new(),
    };
    let registry = SessionRegistryHandle::new(ctx);
    let shutdown_token = registry.child_token();
    let health_state = Arc::new(HealthState::new(registry.child_token()));

    // Not tied to the registry token so that final `Ended` events drain
    let continuity_token = CancellationToken::new();
    let (output_rx, continuity_task) = ContinuityStage::spawn(
        event_rx,
        config.event_queue_capacity,
        config.continuity_settings(),
        placeholder,
        continuity_token.clone(),
    );
    let consumer_task = tokio::spawn(consume_events(output_rx));

    // Health server
    let health_addr: SocketAddr = config.health_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.health_bind_address, "Invalid health bind address");
        format!("Invalid health bind address: {e}")
    })?;

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );
    let app = health_router(Arc::clone(&health_state)).merge(metrics_router);

    // Bind before spawning to fail fast
    let listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %health_addr, "Failed to bind health server");
            format!("Failed to bind health server to {health_addr}: {e}")
        })?;

    let health_shutdown_token = shutdown_token.child_token();
    tokio::spawn(async move {
        info!(addr = %health_addr, "Health server starting");
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            health_shutdown_token.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });

    health_state.set_ready();
    info!("RTMS client running - reading notifications from stdin, press Ctrl+C to shutdown");

    tokio::select! {
        () = shutdown_signal() => {
            info!("Shutdown signal received, initiating graceful shutdown...");
        }
        () = read_notifications(&registry, shutdown_token.child_token()) => {
            info!("Notification input closed, initiating graceful shutdown...");
        }
    }

    health_state.set_not_ready();

    if let Err(e) = registry.shutdown().await {
        warn!(error = %e, "Session registry shutdown error");
    }
    if !registry.wait_closed(SHUTDOWN_GRACE).await {
        warn!("Session registry did not finish shutting down in time");
        continuity_token.cancel();
    }

    // The registry owned every event sender; the pipeline drains and ends
    drop(registry);
    if let Err(e) = continuity_task.await {
        warn!(error = %e, "Continuity stage failed");
    }
    if let Err(e) = consumer_task.await {
        warn!(error = %e, "Event consumer failed");
    }

    info!("RTMS client shutdown complete");
    Ok(())
}

/// Read newline-delimited notifications from stdin until EOF or cancellation.
async fn read_notifications(registry: &SessionRegistryHandle, cancel_token: CancellationToken) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            () = cancel_token.cancelled() => return,
            line = lines.next_line() => line,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                error!(error = %e, "Failed to read notification input");
                return;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match notifications::parse(&line) {
            Ok(notification) => {
                if let Err(e) = notifications::apply(registry, notification).await {
                    warn!(error = %e, category = ?e.category(), "Notification rejected");
                }
            }
            Err(e) => warn!(error = %e, "Malformed notification ignored"),
        }
    }
}

/// Log every event leaving the pipeline.
async fn consume_events(mut events: mpsc::Receiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Frame(frame) => debug!(
                meeting_uuid = %frame.meeting_uuid,
                kind = frame.kind.as_str(),
                user_id = frame.source.user_id,
                bytes = frame.payload.len(),
                timestamp_ms = frame.timestamp_ms,
                placeholder = frame.placeholder,
                "Frame"
            ),
            SessionEvent::Relay(event) => info!(
                meeting_uuid = %event.meeting_uuid,
                event_type = event.kind().map_or("unknown", |kind| kind.as_str()),
                user_id = ?event.user_id,
                "Relay event"
            ),
            SessionEvent::Ended {
                meeting_uuid,
                reason,
            } => info!(
                meeting_uuid = %meeting_uuid,
                reason = reason.as_str(),
                "Session ended"
            ),
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
