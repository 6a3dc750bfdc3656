//! `SessionActor` - one per meeting stream.
//!
//! The session actor owns both relay channels of a meeting:
//!
//! - Opens signaling on start; opens media once signaling is Ready
//! - Feeds inbound frames to the channel dispatchers and executes their effects
//! - Applies the reconnection policy when a connection closes
//! - Publishes frames, relay events and a final `Ended` event
//!
//! # Connections
//!
//! Connect attempts run on their own task and report back through the
//! mailbox, tagged with a connection id. Every new attempt supersedes the
//! previous connection of that channel: the old one is closed and anything it
//! still reports is ignored, so at most one connection per channel is live.
//!
//! # Epochs
//!
//! Every reconnect decision bumps `epoch`. A scheduled reconnect carries the
//! epoch it was scheduled under and is dropped if the epoch moved on.

use super::messages::{RegistryMessage, SessionMessage, SessionSnapshot, StartSession};
use super::metrics::{ActorMetrics, ActorType, MailboxMonitor};
use crate::channel::{Effect, MediaChannel, SessionIdentity, SignalingChannel};
use crate::errors::{ChannelKind, RtmsError};
use crate::events::{EndReason, EventSink};
use crate::observability::metrics;
use crate::protocol::messages::{MediaParams, Outbound};
use crate::reconnect::{self, ChannelView, ReconnectPlan, DEFAULT_RECONNECT_DELAY};
use crate::signature::Signer;
use crate::transport::{self, OutboundFrame, Transport, TransportEvent};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

/// Default channel buffer size for session mailboxes.
const SESSION_CHANNEL_BUFFER: usize = 1024;

/// Per-session protocol settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub reconnect_delay: Duration,
    /// `media_type` bitmask for the data handshake.
    pub media_type: u32,
    pub media_params: MediaParams,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            media_type: 32,
            media_params: MediaParams::default(),
        }
    }
}

/// Dependencies shared by every session.
#[derive(Clone)]
pub struct SessionContext {
    pub transport: Arc<dyn Transport>,
    pub signer: Signer,
    pub settings: SessionSettings,
    pub events: EventSink,
    pub metrics: Arc<ActorMetrics>,
}

/// Handle to a `SessionActor`.
#[derive(Debug, Clone)]
pub struct SessionActorHandle {
    sender: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
    instance_id: Uuid,
}

impl SessionActorHandle {
    /// Unique id of this session instance.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Get a snapshot of the session state.
    ///
    /// # Errors
    ///
    /// Returns [`RtmsError::Internal`] if the actor has exited.
    pub async fn snapshot(&self) -> Result<SessionSnapshot, RtmsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::GetSnapshot { respond_to: tx })
            .await
            .map_err(|e| RtmsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RtmsError::Internal(format!("response receive failed: {e}")))
    }

    /// Stop the session and wait until both channels are closed.
    ///
    /// # Errors
    ///
    /// Returns [`RtmsError::Internal`] if the actor has already exited.
    pub async fn stop(&self) -> Result<(), RtmsError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(SessionMessage::Stop {
                respond_to: Some(tx),
            })
            .await
            .map_err(|e| RtmsError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| RtmsError::Internal(format!("response receive failed: {e}")))
    }

    /// Ask the session to stop without waiting. Falls back to cancellation
    /// when the mailbox is full.
    pub fn request_stop(&self) {
        if self
            .sender
            .try_send(SessionMessage::Stop { respond_to: None })
            .is_err()
        {
            self.cancel_token.cancel();
        }
    }

    /// Cancel the actor (for immediate shutdown).
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// Tracks the one connection a channel may have.
#[derive(Debug)]
enum ConnectionSlot {
    Empty,
    Pending {
        conn_id: u64,
    },
    Open {
        conn_id: u64,
        outbound: mpsc::Sender<OutboundFrame>,
    },
}

impl ConnectionSlot {
    fn conn_id(&self) -> Option<u64> {
        match self {
            ConnectionSlot::Empty => None,
            ConnectionSlot::Pending { conn_id } | ConnectionSlot::Open { conn_id, .. } => {
                Some(*conn_id)
            }
        }
    }

    fn is_open(&self) -> bool {
        matches!(self, ConnectionSlot::Open { .. })
    }

    /// Close and forget the current connection, if any.
    fn close(&mut self) {
        if let ConnectionSlot::Open { outbound, .. } = self {
            let _ = outbound.try_send(OutboundFrame::Close);
        }
        *self = ConnectionSlot::Empty;
    }
}

/// The `SessionActor` implementation.
pub struct SessionActor {
    identity: SessionIdentity,
    instance_id: Uuid,
    relay_url: Url,
    /// Cleared by stop and terminal errors; no reconnect happens afterwards.
    reconnect: bool,
    epoch: u64,
    signaling: SignalingChannel,
    media: MediaChannel,
    signaling_conn: ConnectionSlot,
    media_conn: ConnectionSlot,
    next_conn_id: u64,
    signaling_connects: u32,
    media_connects: u32,
    /// Token of the pending reconnect timer.
    timer: Option<CancellationToken>,
    ended: Option<EndReason>,
    ctx: SessionContext,
    receiver: mpsc::Receiver<SessionMessage>,
    self_sender: mpsc::Sender<SessionMessage>,
    registry: Option<mpsc::WeakSender<RegistryMessage>>,
    cancel_token: CancellationToken,
    mailbox: MailboxMonitor,
}

impl SessionActor {
    /// Spawn a session actor and start its signaling channel.
    ///
    /// `registry` receives a `SessionEnded` report when the session ends on
    /// its own, provided the registry mailbox is still open.
    ///
    /// # Errors
    ///
    /// Returns [`RtmsError::InvalidRelayUrl`] if `request.relay_url` is not an
    /// absolute `ws://` or `wss://` URL. Nothing is spawned in that case.
    pub fn spawn(
        request: StartSession,
        ctx: SessionContext,
        cancel_token: CancellationToken,
        registry: Option<mpsc::WeakSender<RegistryMessage>>,
    ) -> Result<(SessionActorHandle, JoinHandle<()>), RtmsError> {
        let relay_url = transport::parse_relay_url(&request.relay_url)?;
        let (sender, receiver) = mpsc::channel(SESSION_CHANNEL_BUFFER);
        let instance_id = Uuid::new_v4();

        let signature = ctx.signer.sign(&request.meeting_uuid, &request.stream_id);
        let mailbox = MailboxMonitor::new(ActorType::Session, request.meeting_uuid.as_str());

        let actor = Self {
            identity: SessionIdentity {
                meeting_uuid: request.meeting_uuid,
                stream_id: request.stream_id,
                signature,
            },
            instance_id,
            relay_url,
            reconnect: true,
            epoch: 0,
            signaling: SignalingChannel::new(),
            media: MediaChannel::new(),
            signaling_conn: ConnectionSlot::Empty,
            media_conn: ConnectionSlot::Empty,
            next_conn_id: 0,
            signaling_connects: 0,
            media_connects: 0,
            timer: None,
            ended: None,
            ctx,
            receiver,
            self_sender: sender.clone(),
            registry,
            cancel_token: cancel_token.clone(),
            mailbox,
        };

        let task_handle = tokio::spawn(actor.run());

        let handle = SessionActorHandle {
            sender,
            cancel_token,
            instance_id,
        };

        Ok((handle, task_handle))
    }

    /// Run the actor message loop.
    #[instrument(skip_all, name = "rtms.session", fields(meeting_uuid = %self.identity.meeting_uuid))]
    async fn run(mut self) {
        info!(
            target: "rtms.session",
            meeting_uuid = %self.identity.meeting_uuid,
            stream_id = %self.identity.stream_id,
            instance_id = %self.instance_id,
            client_id = self.ctx.signer.client_id(),
            "SessionActor started"
        );

        self.connect(ChannelKind::Signaling, self.relay_url.clone());

        while self.ended.is_none() {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "rtms.session",
                        meeting_uuid = %self.identity.meeting_uuid,
                        "SessionActor received cancellation signal"
                    );
                    self.terminate(EndReason::Shutdown);
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.mailbox.observe_backlog(self.receiver.len());
                            self.handle_message(message);
                            self.mailbox.record_processed();
                            self.ctx.metrics.record_message_processed();
                        }
                        None => {
                            self.terminate(EndReason::Shutdown);
                        }
                    }
                }
            }
        }

        self.finish().await;
    }

    fn handle_message(&mut self, message: SessionMessage) {
        match message {
            SessionMessage::GetSnapshot { respond_to } => {
                let _ = respond_to.send(self.snapshot());
            }

            SessionMessage::Stop { respond_to } => {
                info!(
                    target: "rtms.session",
                    meeting_uuid = %self.identity.meeting_uuid,
                    "Stopping session"
                );
                self.terminate(EndReason::Stopped);
                if let Some(respond_to) = respond_to {
                    let _ = respond_to.send(());
                }
            }

            SessionMessage::Opened {
                channel,
                conn_id,
                outbound,
            } => self.handle_opened(channel, conn_id, outbound),

            SessionMessage::ConnectFailed {
                channel,
                conn_id,
                error,
            } => {
                if self.slot(channel).conn_id() != Some(conn_id) {
                    return;
                }
                warn!(
                    target: "rtms.session",
                    meeting_uuid = %self.identity.meeting_uuid,
                    channel = channel.as_str(),
                    error = %error,
                    "Connect attempt failed"
                );
                metrics::record_connect_failure(channel.as_str());
                self.on_error(channel);
                self.on_closed(channel);
            }

            SessionMessage::Transport {
                channel,
                conn_id,
                event,
            } => {
                if self.slot(channel).conn_id() != Some(conn_id) {
                    debug!(
                        target: "rtms.session",
                        channel = channel.as_str(),
                        conn_id,
                        "Event from superseded connection ignored"
                    );
                    return;
                }
                match event {
                    TransportEvent::Text(raw) => self.dispatch(channel, &raw),
                    TransportEvent::Error(reason) => {
                        warn!(
                            target: "rtms.session",
                            meeting_uuid = %self.identity.meeting_uuid,
                            channel = channel.as_str(),
                            error = %reason,
                            "Connection error"
                        );
                        self.on_error(channel);
                    }
                    TransportEvent::Closed => self.on_closed(channel),
                }
            }

            SessionMessage::ReconnectDue { channel, epoch } => {
                self.handle_reconnect_due(channel, epoch);
            }
        }
    }

    fn handle_opened(
        &mut self,
        channel: ChannelKind,
        conn_id: u64,
        outbound: mpsc::Sender<OutboundFrame>,
    ) {
        let pending = matches!(self.slot(channel), ConnectionSlot::Pending { conn_id: id } if *id == conn_id);
        if !pending {
            debug!(
                target: "rtms.session",
                channel = channel.as_str(),
                conn_id,
                "Superseded connection opened, closing"
            );
            let _ = outbound.try_send(OutboundFrame::Close);
            return;
        }

        *self.slot_mut(channel) = ConnectionSlot::Open { conn_id, outbound };
        metrics::record_connection_opened(channel.as_str());
        info!(
            target: "rtms.session",
            meeting_uuid = %self.identity.meeting_uuid,
            channel = channel.as_str(),
            conn_id,
            "Connection opened"
        );

        let handshake = match channel {
            ChannelKind::Signaling => self.signaling.on_open(&self.identity, rand::random()),
            ChannelKind::Media => self.media.on_open(
                &self.identity,
                self.ctx.settings.media_type,
                self.ctx.settings.media_params,
            ),
        };
        self.send(channel, &handshake);
    }

    fn dispatch(&mut self, channel: ChannelKind, raw: &str) {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let result = match channel {
            ChannelKind::Signaling => self.signaling.on_message(raw, &self.identity, now_ms),
            ChannelKind::Media => self.media.on_message(raw, &self.identity, now_ms),
        };

        match result {
            Ok(effects) => {
                for effect in effects {
                    if self.ended.is_some() {
                        break;
                    }
                    self.apply(channel, effect);
                }
            }
            Err(e) => {
                warn!(
                    target: "rtms.session",
                    meeting_uuid = %self.identity.meeting_uuid,
                    channel = channel.as_str(),
                    error = %e,
                    "Dropping inbound message"
                );
                metrics::record_protocol_violation(channel.as_str());
            }
        }
    }

    fn apply(&mut self, channel: ChannelKind, effect: Effect) {
        match effect {
            Effect::Reply(message) => self.send(channel, &message),
            Effect::SendOnSignaling(message) => self.send(ChannelKind::Signaling, &message),
            Effect::ConnectMedia(raw) => match transport::parse_relay_url(&raw) {
                Ok(url) => self.connect(ChannelKind::Media, url),
                Err(e) => {
                    warn!(
                        target: "rtms.session",
                        meeting_uuid = %self.identity.meeting_uuid,
                        error = %e,
                        "Relay advertised an invalid media URL"
                    );
                    self.terminate(EndReason::InvalidRelayUrl);
                }
            },
            Effect::EmitFrame(frame) => {
                self.ctx.events.emit_frame(frame);
            }
            Effect::EmitRelay(event) => {
                self.ctx.events.emit_relay(event);
            }
            Effect::Terminate(reason) => self.terminate(reason),
        }
    }

    /// Queue a message on a channel. Fails soft when the channel is not open
    /// or its queue is full.
    fn send(&self, channel: ChannelKind, message: &Outbound) {
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(target: "rtms.session", error = %e, "Failed to serialize outbound message");
                return;
            }
        };

        let result = match self.slot(channel) {
            ConnectionSlot::Open { outbound, .. } => outbound
                .try_send(OutboundFrame::Text(text))
                .map_err(|e| e.to_string()),
            _ => Err("channel not open".to_string()),
        };

        match result {
            Ok(()) => debug!(
                target: "rtms.session",
                channel = channel.as_str(),
                message_type = message.message_type().as_str(),
                "Message queued"
            ),
            Err(reason) => {
                let error = RtmsError::SendFailed { channel, reason };
                warn!(
                    target: "rtms.session",
                    meeting_uuid = %self.identity.meeting_uuid,
                    message_type = message.message_type().as_str(),
                    error = %error,
                    "Outbound message dropped"
                );
                metrics::record_send_failure(channel.as_str());
            }
        }
    }

    /// Start a connect attempt, superseding any current connection.
    fn connect(&mut self, channel: ChannelKind, url: Url) {
        self.slot_mut(channel).close();
        self.next_conn_id += 1;
        let conn_id = self.next_conn_id;
        *self.slot_mut(channel) = ConnectionSlot::Pending { conn_id };

        match channel {
            ChannelKind::Signaling => {
                self.signaling.on_connecting();
                self.signaling_connects += 1;
            }
            ChannelKind::Media => {
                self.media.on_connecting();
                self.media_connects += 1;
            }
        }

        debug!(
            target: "rtms.session",
            meeting_uuid = %self.identity.meeting_uuid,
            channel = channel.as_str(),
            conn_id,
            "Connecting"
        );

        tokio::spawn(run_connection(
            Arc::clone(&self.ctx.transport),
            channel,
            conn_id,
            url,
            self.self_sender.clone(),
            self.cancel_token.child_token(),
        ));
    }

    fn on_error(&mut self, channel: ChannelKind) {
        match channel {
            ChannelKind::Signaling => self.signaling.on_error(),
            ChannelKind::Media => self.media.on_error(),
        }
    }

    fn on_closed(&mut self, channel: ChannelKind) {
        *self.slot_mut(channel) = ConnectionSlot::Empty;
        let delay = self.ctx.settings.reconnect_delay;

        let plan = match channel {
            ChannelKind::Signaling => {
                self.signaling.on_closed();
                reconnect::on_signaling_closed(self.view(), delay)
            }
            ChannelKind::Media => {
                self.media.on_closed();
                reconnect::on_media_closed(self.view(), delay)
            }
        };

        info!(
            target: "rtms.session",
            meeting_uuid = %self.identity.meeting_uuid,
            channel = channel.as_str(),
            plan = plan.as_str(),
            "Connection closed"
        );
        self.execute(plan);
    }

    fn execute(&mut self, plan: ReconnectPlan) {
        if plan != ReconnectPlan::Nothing {
            metrics::record_reconnect(plan.as_str());
        }

        match plan {
            ReconnectPlan::Nothing => {}
            ReconnectPlan::MediaOnly { delay } => {
                self.epoch += 1;
                self.schedule(ChannelKind::Media, delay);
            }
            ReconnectPlan::FullBootstrap => {
                self.epoch += 1;
                self.cancel_timer();
                self.connect(ChannelKind::Signaling, self.relay_url.clone());
            }
            ReconnectPlan::Signaling { delay } => {
                self.epoch += 1;
                self.schedule(ChannelKind::Signaling, delay);
            }
            ReconnectPlan::Terminate => self.terminate(EndReason::SignalingClosed),
        }
    }

    /// Schedule a reconnect under the current epoch, replacing any pending one.
    fn schedule(&mut self, channel: ChannelKind, delay: Duration) {
        self.cancel_timer();

        let token = self.cancel_token.child_token();
        let sender = self.self_sender.clone();
        let epoch = self.epoch;
        let timer_token = token.clone();

        tokio::spawn(async move {
            tokio::select! {
                () = timer_token.cancelled() => {}
                () = tokio::time::sleep(delay) => {
                    let _ = sender.send(SessionMessage::ReconnectDue { channel, epoch }).await;
                }
            }
        });

        debug!(
            target: "rtms.session",
            meeting_uuid = %self.identity.meeting_uuid,
            channel = channel.as_str(),
            epoch,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "Reconnect scheduled"
        );
        self.timer = Some(token);
    }

    fn cancel_timer(&mut self) {
        if let Some(token) = self.timer.take() {
            token.cancel();
        }
    }

    fn handle_reconnect_due(&mut self, channel: ChannelKind, epoch: u64) {
        if epoch != self.epoch || !self.reconnect {
            debug!(
                target: "rtms.session",
                meeting_uuid = %self.identity.meeting_uuid,
                channel = channel.as_str(),
                epoch,
                current_epoch = self.epoch,
                "Stale reconnect ignored"
            );
            return;
        }
        self.timer = None;

        match channel {
            ChannelKind::Signaling => self.connect(ChannelKind::Signaling, self.relay_url.clone()),
            ChannelKind::Media => {
                let url = self
                    .signaling
                    .media_url()
                    .and_then(|raw| transport::parse_relay_url(raw).ok());
                match url {
                    Some(url) => self.connect(ChannelKind::Media, url),
                    None => self.execute(ReconnectPlan::FullBootstrap),
                }
            }
        }
    }

    /// Disable reconnection, close both channels and mark the session ended.
    fn terminate(&mut self, reason: EndReason) {
        if self.ended.is_some() {
            return;
        }

        info!(
            target: "rtms.session",
            meeting_uuid = %self.identity.meeting_uuid,
            reason = reason.as_str(),
            "Session terminating"
        );

        self.reconnect = false;
        self.epoch += 1;
        self.cancel_timer();

        if self.signaling_conn.conn_id().is_some() {
            self.signaling_conn.close();
            self.signaling.on_closed();
        }
        if self.media_conn.conn_id().is_some() {
            self.media_conn.close();
            self.media.on_closed();
        }

        self.ended = Some(reason);
    }

    async fn finish(mut self) {
        let reason = self.ended.take().unwrap_or(EndReason::Shutdown);

        // Stops connection forwarders and timers
        self.cancel_token.cancel();
        metrics::record_session_ended(reason.as_str());

        // Report to the registry before consumers can observe the end
        if let Some(registry) = self.registry.as_ref().and_then(mpsc::WeakSender::upgrade) {
            let _ = registry.try_send(RegistryMessage::SessionEnded {
                meeting_uuid: self.identity.meeting_uuid.clone(),
                instance_id: self.instance_id,
            });
        }

        self.ctx
            .events
            .emit_ended(self.identity.meeting_uuid.clone(), reason.clone())
            .await;

        info!(
            target: "rtms.session",
            meeting_uuid = %self.identity.meeting_uuid,
            reason = reason.as_str(),
            epoch = self.epoch,
            messages_processed = self.mailbox.messages_processed(),
            mailbox_peak = self.mailbox.peak_depth(),
            media_discarded_frames = self.media.discarded_frames(),
            events_dropped = self.ctx.events.dropped(),
            "SessionActor stopped"
        );
    }

    fn view(&self) -> ChannelView {
        ChannelView {
            reconnect: self.reconnect,
            signaling_state: self.signaling.state(),
            signaling_open: self.signaling_conn.is_open(),
        }
    }

    fn slot(&self, channel: ChannelKind) -> &ConnectionSlot {
        match channel {
            ChannelKind::Signaling => &self.signaling_conn,
            ChannelKind::Media => &self.media_conn,
        }
    }

    fn slot_mut(&mut self, channel: ChannelKind) -> &mut ConnectionSlot {
        match channel {
            ChannelKind::Signaling => &mut self.signaling_conn,
            ChannelKind::Media => &mut self.media_conn,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            meeting_uuid: self.identity.meeting_uuid.clone(),
            stream_id: self.identity.stream_id.clone(),
            instance_id: self.instance_id,
            signaling_state: self.signaling.state(),
            media_state: self.media.state(),
            reconnect: self.reconnect,
            epoch: self.epoch,
            signaling_open: self.signaling_conn.is_open(),
            media_open: self.media_conn.is_open(),
            signaling_keep_alive_ms: self.signaling.last_keep_alive_ms(),
            media_keep_alive_ms: self.media.last_keep_alive_ms(),
            signaling_connects: self.signaling_connects,
            media_connects: self.media_connects,
            media_url: self.signaling.media_url().map(str::to_string),
            media_discarded_frames: self.media.discarded_frames(),
            mailbox_level: self.mailbox.current_level(),
            mailbox_peak: self.mailbox.peak_depth(),
        }
    }
}

/// Open one connection and forward its events to the session mailbox.
async fn run_connection(
    transport: Arc<dyn Transport>,
    channel: ChannelKind,
    conn_id: u64,
    url: Url,
    mailbox: mpsc::Sender<SessionMessage>,
    cancel_token: CancellationToken,
) {
    let result = tokio::select! {
        () = cancel_token.cancelled() => return,
        result = transport.connect(channel, &url) => result,
    };

    let connection = match result {
        Ok(connection) => connection,
        Err(error) => {
            let _ = mailbox
                .send(SessionMessage::ConnectFailed {
                    channel,
                    conn_id,
                    error,
                })
                .await;
            return;
        }
    };

    let outbound = connection.outbound;
    let mut inbound = connection.inbound;

    if mailbox
        .send(SessionMessage::Opened {
            channel,
            conn_id,
            outbound: outbound.clone(),
        })
        .await
        .is_err()
    {
        let _ = outbound.try_send(OutboundFrame::Close);
        return;
    }
    // The session holds the only sender from here on
    drop(outbound);

    loop {
        let event = tokio::select! {
            () = cancel_token.cancelled() => break,
            event = inbound.recv() => event.unwrap_or(TransportEvent::Closed),
        };

        let closed = event == TransportEvent::Closed;
        if mailbox
            .send(SessionMessage::Transport {
                channel,
                conn_id,
                event,
            })
            .await
            .is_err()
            || closed
        {
            break;
        }
    }

    debug!(
        target: "rtms.transport",
        channel = channel.as_str(),
        conn_id,
        "Connection forwarder terminated"
    );
}
