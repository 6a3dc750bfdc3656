//! `SessionRegistry` - singleton supervisor for session actors.
//!
//! The registry is the top-level actor of the client:
//!
//! - Owns the meeting UUID to session mapping
//! - Creates sessions on `meeting.rtms_started` and stops them on `meeting.rtms_stopped`
//! - Owns the root `CancellationToken` for graceful shutdown
//! - Monitors child actor health (panic detection via `JoinHandle`)
//!
//! Sessions that end on their own report `SessionEnded` with their instance
//! id. A report from an older instance never removes a newer session.

use crate::errors::RtmsError;
use crate::transport;

use super::messages::{RegistryMessage, SessionSnapshot, StartSession};
use super::metrics::{ActorType, MailboxMonitor};
use super::session::{SessionActor, SessionActorHandle, SessionContext};

use common::types::MeetingUuid;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Default channel buffer size for the registry mailbox.
const REGISTRY_CHANNEL_BUFFER: usize = 1000;

/// How long a stopped session may take to wind down before it is abandoned.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// How long each session may take to wind down during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle to the `SessionRegistry`.
///
/// All methods are async and return results via oneshot channels.
#[derive(Clone)]
pub struct SessionRegistryHandle {
    sender: mpsc::Sender<RegistryMessage>,
    cancel_token: CancellationToken,
}

impl SessionRegistryHandle {
    /// Create a new `SessionRegistry` and return a handle to it.
    ///
    /// This spawns the actor task and returns immediately.
    #[must_use]
    pub fn new(ctx: SessionContext) -> Self {
        let (sender, receiver) = mpsc::channel(REGISTRY_CHANNEL_BUFFER);
        let cancel_token = CancellationToken::new();

        let actor = SessionRegistry {
            receiver,
            self_sender: sender.downgrade(),
            cancel_token: cancel_token.clone(),
            sessions: HashMap::new(),
            accepting_new: true,
            mailbox: MailboxMonitor::new(ActorType::Registry, "registry"),
            ctx,
        };

        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
        }
    }

    /// Start a session for a meeting. Returns the new session's instance id.
    ///
    /// # Errors
    ///
    /// - [`RtmsError::InvalidRelayUrl`] if the signaling URL is unusable
    /// - [`RtmsError::SessionExists`] if the meeting already has a session
    /// - [`RtmsError::Draining`] after shutdown began
    pub async fn start_session(&self, request: StartSession) -> Result<Uuid, RtmsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::StartSession {
                request,
                respond_to: tx,
            })
            .await
            .map_err(|e| RtmsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RtmsError::Internal(format!("response receive failed: {e}")))?
    }

    /// Stop and remove a meeting's session.
    ///
    /// # Errors
    ///
    /// Returns [`RtmsError::SessionNotFound`] if the meeting has no session.
    pub async fn stop_session(&self, meeting_uuid: MeetingUuid) -> Result<(), RtmsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::StopSession {
                meeting_uuid,
                respond_to: tx,
            })
            .await
            .map_err(|e| RtmsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RtmsError::Internal(format!("response receive failed: {e}")))?
    }

    /// Snapshot a meeting's session.
    ///
    /// # Errors
    ///
    /// Returns [`RtmsError::SessionNotFound`] if the meeting has no session.
    pub async fn get_session(&self, meeting_uuid: MeetingUuid) -> Result<SessionSnapshot, RtmsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::GetSession {
                meeting_uuid,
                respond_to: tx,
            })
            .await
            .map_err(|e| RtmsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RtmsError::Internal(format!("response receive failed: {e}")))?
    }

    /// Snapshot every live session.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSnapshot>, RtmsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::ListSessions { respond_to: tx })
            .await
            .map_err(|e| RtmsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RtmsError::Internal(format!("response receive failed: {e}")))
    }

    /// Initiate graceful shutdown.
    pub async fn shutdown(&self) -> Result<(), RtmsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(RegistryMessage::Shutdown { respond_to: tx })
            .await
            .map_err(|e| RtmsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RtmsError::Internal(format!("response receive failed: {e}")))?
    }

    /// Wait until the registry has finished shutting down, or `deadline` passes.
    /// Returns whether the registry exited in time.
    pub async fn wait_closed(&self, deadline: Duration) -> bool {
        tokio::time::timeout(deadline, self.sender.closed())
            .await
            .is_ok()
    }

    /// Cancel the actor (for immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get a child token for tasks that should stop with the registry.
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

/// Internal state for a managed session.
struct ManagedSession {
    handle: SessionActorHandle,
    task_handle: JoinHandle<()>,
    /// Session start timestamp (Unix seconds).
    started_at: i64,
}

/// The `SessionRegistry` implementation.
pub struct SessionRegistry {
    receiver: mpsc::Receiver<RegistryMessage>,
    /// Handed to sessions for `SessionEnded` reports. Sessions keep it weak
    /// and upgrade only to send, so dropping every handle closes the mailbox.
    self_sender: mpsc::WeakSender<RegistryMessage>,
    /// Cancellation token (root).
    cancel_token: CancellationToken,
    sessions: HashMap<MeetingUuid, ManagedSession>,
    accepting_new: bool,
    mailbox: MailboxMonitor,
    ctx: SessionContext,
}

impl SessionRegistry {
    /// Run the actor message loop.
    #[instrument(skip_all, name = "rtms.registry")]
    async fn run(mut self) {
        info!(target: "rtms.registry", "SessionRegistry started");

        loop {
            // Check for terminated session actors
            self.check_session_health().await;

            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "rtms.registry",
                        "SessionRegistry received cancellation signal"
                    );
                    self.graceful_shutdown().await;
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.observe_backlog(self.receiver.len());
                            self.handle_message(message).await;
                            self.mailbox.record_processed();
                            self.ctx.metrics.record_message_processed();
                        }
                        None => {
                            info!(
                                target: "rtms.registry",
                                "SessionRegistry channel closed, exiting"
                            );
                            self.graceful_shutdown().await;
                            break;
                        }
                    }
                }
            }
        }

        // Covers the closed-mailbox exit; health liveness follows this token
        self.cancel_token.cancel();

        info!(
            target: "rtms.registry",
            sessions_remaining = self.sessions.len(),
            messages_processed = self.mailbox.messages_processed(),
            "SessionRegistry stopped"
        );
    }

    async fn handle_message(&mut self, message: RegistryMessage) {
        match message {
            RegistryMessage::StartSession {
                request,
                respond_to,
            } => {
                let result = self.start_session(request);
                let _ = respond_to.send(result);
            }

            RegistryMessage::StopSession {
                meeting_uuid,
                respond_to,
            } => {
                let result = self.stop_session(&meeting_uuid);
                let _ = respond_to.send(result);
            }

            RegistryMessage::GetSession {
                meeting_uuid,
                respond_to,
            } => {
                let result = self.get_session(&meeting_uuid).await;
                let _ = respond_to.send(result);
            }

            RegistryMessage::ListSessions { respond_to } => {
                let snapshots = self.list_sessions().await;
                let _ = respond_to.send(snapshots);
            }

            RegistryMessage::SessionEnded {
                meeting_uuid,
                instance_id,
            } => self.session_ended(&meeting_uuid, instance_id),

            RegistryMessage::Shutdown { respond_to } => {
                info!(
                    target: "rtms.registry",
                    session_count = self.sessions.len(),
                    "Initiating graceful shutdown"
                );
                self.accepting_new = false;
                // Cancel the root token (propagates to all children)
                self.cancel_token.cancel();
                let _ = respond_to.send(Ok(()));
            }
        }
    }

    fn start_session(&mut self, request: StartSession) -> Result<Uuid, RtmsError> {
        if !self.accepting_new {
            return Err(RtmsError::Draining);
        }

        if self.sessions.contains_key(&request.meeting_uuid) {
            return Err(RtmsError::SessionExists(request.meeting_uuid.to_string()));
        }

        // Rejected before anything is registered
        transport::parse_relay_url(&request.relay_url)?;

        let meeting_uuid = request.meeting_uuid.clone();
        debug!(
            target: "rtms.registry",
            meeting_uuid = %meeting_uuid,
            stream_id = %request.stream_id,
            "Creating session actor"
        );

        let (handle, task_handle) = SessionActor::spawn(
            request,
            self.ctx.clone(),
            self.cancel_token.child_token(),
            Some(self.self_sender.clone()),
        )?;
        let instance_id = handle.instance_id();

        self.sessions.insert(
            meeting_uuid.clone(),
            ManagedSession {
                handle,
                task_handle,
                started_at: chrono::Utc::now().timestamp(),
            },
        );
        self.ctx.metrics.session_created();

        info!(
            target: "rtms.registry",
            meeting_uuid = %meeting_uuid,
            instance_id = %instance_id,
            total_sessions = self.sessions.len(),
            "Session actor created"
        );

        Ok(instance_id)
    }

    /// Remove a session and ask it to stop. The wait for the actor task runs
    /// in the background.
    fn stop_session(&mut self, meeting_uuid: &MeetingUuid) -> Result<(), RtmsError> {
        let Some(managed) = self.sessions.remove(meeting_uuid) else {
            return Err(RtmsError::SessionNotFound(meeting_uuid.to_string()));
        };

        managed.handle.request_stop();

        let meeting_uuid_owned = meeting_uuid.clone();
        let lifetime_secs = chrono::Utc::now().timestamp() - managed.started_at;
        tokio::spawn(async move {
            match tokio::time::timeout(STOP_TIMEOUT, managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "rtms.registry",
                        meeting_uuid = %meeting_uuid_owned,
                        lifetime_secs,
                        "Session actor task completed cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "rtms.registry",
                        meeting_uuid = %meeting_uuid_owned,
                        error = ?e,
                        "Session actor task panicked during stop"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "rtms.registry",
                        meeting_uuid = %meeting_uuid_owned,
                        "Session actor task stop timed out, cancelling"
                    );
                    managed.handle.cancel();
                }
            }
        });

        self.ctx.metrics.session_removed();

        info!(
            target: "rtms.registry",
            meeting_uuid = %meeting_uuid,
            total_sessions = self.sessions.len(),
            "Session actor removed"
        );

        Ok(())
    }

    async fn get_session(&self, meeting_uuid: &MeetingUuid) -> Result<SessionSnapshot, RtmsError> {
        let managed = self
            .sessions
            .get(meeting_uuid)
            .ok_or_else(|| RtmsError::SessionNotFound(meeting_uuid.to_string()))?;

        managed.handle.snapshot().await.map_err(|e| {
            warn!(
                target: "rtms.registry",
                meeting_uuid = %meeting_uuid,
                error = %e,
                "Failed to query session actor"
            );
            RtmsError::SessionNotFound(meeting_uuid.to_string())
        })
    }

    async fn list_sessions(&self) -> Vec<SessionSnapshot> {
        let mut snapshots = Vec::with_capacity(self.sessions.len());
        for managed in self.sessions.values() {
            if let Ok(snapshot) = managed.handle.snapshot().await {
                snapshots.push(snapshot);
            }
        }
        snapshots.sort_by(|a, b| a.meeting_uuid.cmp(&b.meeting_uuid));
        snapshots
    }

    fn session_ended(&mut self, meeting_uuid: &MeetingUuid, instance_id: Uuid) {
        let current = self
            .sessions
            .get(meeting_uuid)
            .map(|managed| managed.handle.instance_id());

        if current != Some(instance_id) {
            debug!(
                target: "rtms.registry",
                meeting_uuid = %meeting_uuid,
                instance_id = %instance_id,
                "End report from a replaced session ignored"
            );
            return;
        }

        // The actor is exiting; the JoinHandle is dropped and the task detaches
        self.sessions.remove(meeting_uuid);
        self.ctx.metrics.session_removed();

        info!(
            target: "rtms.registry",
            meeting_uuid = %meeting_uuid,
            instance_id = %instance_id,
            total_sessions = self.sessions.len(),
            "Session ended"
        );
    }

    async fn graceful_shutdown(&mut self) {
        info!(
            target: "rtms.registry",
            session_count = self.sessions.len(),
            "Performing graceful shutdown"
        );

        self.accepting_new = false;

        // Already cancelled via the parent token when shutting down, explicit otherwise
        for (meeting_uuid, managed) in &self.sessions {
            debug!(
                target: "rtms.registry",
                meeting_uuid = %meeting_uuid,
                "Cancelling session actor"
            );
            managed.handle.cancel();
        }

        for (meeting_uuid, managed) in self.sessions.drain() {
            match tokio::time::timeout(SHUTDOWN_TIMEOUT, managed.task_handle).await {
                Ok(Ok(())) => {
                    debug!(
                        target: "rtms.registry",
                        meeting_uuid = %meeting_uuid,
                        "Session actor completed cleanly"
                    );
                }
                Ok(Err(e)) => {
                    warn!(
                        target: "rtms.registry",
                        meeting_uuid = %meeting_uuid,
                        error = ?e,
                        "Session actor task panicked during shutdown"
                    );
                }
                Err(_) => {
                    warn!(
                        target: "rtms.registry",
                        meeting_uuid = %meeting_uuid,
                        "Session actor shutdown timed out"
                    );
                }
            }
            self.ctx.metrics.session_removed();
        }

        info!(target: "rtms.registry", "Graceful shutdown complete");
    }

    /// Reap session actors whose task has finished.
    async fn check_session_health(&mut self) {
        let finished: Vec<MeetingUuid> = self
            .sessions
            .iter()
            .filter(|(_, managed)| managed.task_handle.is_finished())
            .map(|(meeting_uuid, _)| meeting_uuid.clone())
            .collect();

        for meeting_uuid in finished {
            let Some(managed) = self.sessions.remove(&meeting_uuid) else {
                continue;
            };

            match managed.task_handle.await {
                Ok(()) => {
                    info!(
                        target: "rtms.registry",
                        meeting_uuid = %meeting_uuid,
                        "Session actor exited"
                    );
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!(
                            target: "rtms.registry",
                            meeting_uuid = %meeting_uuid,
                            error = ?join_error,
                            "Session actor panicked"
                        );
                        self.ctx.metrics.record_panic(ActorType::Session);
                    }
                }
            }

            self.ctx.metrics.session_removed();
        }
    }
}
