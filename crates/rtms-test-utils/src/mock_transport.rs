//! Scripted in-memory relay.
//!
//! [`MockTransport`] implements the client's `Transport` trait. Every
//! successful connect produces a [`MockConnection`] on the paired
//! [`MockRelay`], through which a test plays the relay's side: reading what the
//! client sent and injecting inbound frames, errors and closes.
//!
//! The relay can also be told to fail the next N connects of a channel, or to
//! hold connects until released (for reconnect race tests).
//!
//! # Example
//!
//! ```rust,ignore
//! let (transport, mut relay) = MockTransport::pair();
//! relay.fail_next(ChannelKind::Signaling, 2);
//!
//! // ... start a session using Arc::new(transport) ...
//!
//! let mut signaling = relay.next_connection().await;
//! assert_eq!(signaling.recv_json().await["msg_type"], 1);
//! ```

use rtms_client::errors::{ChannelKind, RtmsError};
use rtms_client::transport::{Connection, OutboundFrame, Transport, TransportEvent};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use url::Url;

/// Queue size of each direction of a mock connection.
const QUEUE_CAPACITY: usize = 64;

/// How long `recv_*` waits for the client to send something.
const RECV_TIMEOUT: Duration = Duration::from_secs(1);

/// How long `next_connection` waits. Longer than any reconnect delay used in
/// tests, so a scheduled reconnect fires inside the wait under paused time.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Let spawned actors and forwarders run without advancing time.
pub async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}

struct Shared {
    attempts: Mutex<Vec<(ChannelKind, Url)>>,
    fail_signaling: AtomicU32,
    fail_media: AtomicU32,
    /// `true` while connects may proceed.
    gate: watch::Sender<bool>,
    live: Mutex<Vec<(ChannelKind, Arc<AtomicBool>)>>,
    connections: mpsc::UnboundedSender<MockConnection>,
}

impl Shared {
    fn failures(&self, channel: ChannelKind) -> &AtomicU32 {
        match channel {
            ChannelKind::Signaling => &self.fail_signaling,
            ChannelKind::Media => &self.fail_media,
        }
    }
}

/// Client-side half: hand this to the session context.
#[derive(Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

impl MockTransport {
    /// Create a transport and the relay handle that observes it.
    #[must_use]
    pub fn pair() -> (Self, MockRelay) {
        let (connections, receiver) = mpsc::unbounded_channel();
        let (gate, _) = watch::channel(true);
        let shared = Arc::new(Shared {
            attempts: Mutex::new(Vec::new()),
            fail_signaling: AtomicU32::new(0),
            fail_media: AtomicU32::new(0),
            gate,
            live: Mutex::new(Vec::new()),
            connections,
        });

        (
            Self {
                shared: Arc::clone(&shared),
            },
            MockRelay {
                connections: receiver,
                shared,
            },
        )
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn connect(&self, channel: ChannelKind, url: &Url) -> Result<Connection, RtmsError> {
        self.shared
            .attempts
            .lock()
            .unwrap()
            .push((channel, url.clone()));

        let mut gate = self.shared.gate.subscribe();
        while !*gate.borrow_and_update() {
            if gate.changed().await.is_err() {
                break;
            }
        }

        let failing = self
            .shared
            .failures(channel)
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(RtmsError::Transport {
                channel,
                reason: "scripted connect failure".to_string(),
            });
        }

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<OutboundFrame>(QUEUE_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel::<TransportEvent>(QUEUE_CAPACITY);
        let (text_tx, text_rx) = mpsc::unbounded_channel::<String>();
        let closed = Arc::new(AtomicBool::new(false));

        // Pump client frames to the test; a client close is echoed back as
        // `Closed`, like a real socket.
        let pump_closed = Arc::clone(&closed);
        let pump_inbound = inbound_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                match frame {
                    OutboundFrame::Text(text) => {
                        let _ = text_tx.send(text);
                    }
                    OutboundFrame::Close => {
                        if !pump_closed.swap(true, Ordering::SeqCst) {
                            let _ = pump_inbound.send(TransportEvent::Closed).await;
                        }
                        break;
                    }
                }
            }
            pump_closed.store(true, Ordering::SeqCst);
        });

        self.shared
            .live
            .lock()
            .unwrap()
            .push((channel, Arc::clone(&closed)));

        let _ = self.shared.connections.send(MockConnection {
            channel,
            url: url.clone(),
            inbound: inbound_tx,
            outbound: text_rx,
            closed,
        });

        Ok(Connection {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

/// Test-side half: observes and scripts the transport.
pub struct MockRelay {
    connections: mpsc::UnboundedReceiver<MockConnection>,
    shared: Arc<Shared>,
}

impl MockRelay {
    /// Wait for the next successful connect.
    ///
    /// # Panics
    ///
    /// Panics if no connection arrives in time.
    pub async fn next_connection(&mut self) -> MockConnection {
        tokio::time::timeout(CONNECT_TIMEOUT, self.connections.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("transport dropped")
    }

    /// Next successful connect, if one already happened.
    pub fn try_next_connection(&mut self) -> Option<MockConnection> {
        self.connections.try_recv().ok()
    }

    /// Every connect attempt so far, failed ones included.
    #[must_use]
    pub fn attempts(&self) -> Vec<(ChannelKind, Url)> {
        self.shared.attempts.lock().unwrap().clone()
    }

    #[must_use]
    pub fn attempt_count(&self, channel: ChannelKind) -> usize {
        self.shared
            .attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, _)| *kind == channel)
            .count()
    }

    /// Connections of `channel` that neither side has closed.
    #[must_use]
    pub fn live_count(&self, channel: ChannelKind) -> usize {
        self.shared
            .live
            .lock()
            .unwrap()
            .iter()
            .filter(|(kind, closed)| *kind == channel && !closed.load(Ordering::SeqCst))
            .count()
    }

    /// Fail the next `count` connects of `channel`.
    pub fn fail_next(&self, channel: ChannelKind, count: u32) {
        self.shared.failures(channel).store(count, Ordering::SeqCst);
    }

    /// Block connects until [`MockRelay::release_connects`].
    pub fn hold_connects(&self) {
        self.shared.gate.send_replace(false);
    }

    pub fn release_connects(&self) {
        self.shared.gate.send_replace(true);
    }
}

/// The relay's end of one connection.
pub struct MockConnection {
    pub channel: ChannelKind,
    pub url: Url,
    inbound: mpsc::Sender<TransportEvent>,
    outbound: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MockConnection {
    /// Deliver a raw text frame to the client.
    pub async fn send_text(&self, text: impl Into<String>) {
        let _ = self.inbound.send(TransportEvent::Text(text.into())).await;
    }

    pub async fn send_json(&self, value: Value) {
        self.send_text(value.to_string()).await;
    }

    /// Report a socket error to the client.
    pub async fn error(&self, reason: &str) {
        let _ = self
            .inbound
            .send(TransportEvent::Error(reason.to_string()))
            .await;
    }

    /// Close the connection from the relay side.
    pub async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let _ = self.inbound.send(TransportEvent::Closed).await;
        }
    }

    /// Wait for the next text frame the client sent.
    ///
    /// # Panics
    ///
    /// Panics if nothing arrives in time or the client dropped the connection.
    pub async fn recv_text(&mut self) -> String {
        tokio::time::timeout(RECV_TIMEOUT, self.outbound.recv())
            .await
            .expect("timed out waiting for a client message")
            .expect("client dropped the connection")
    }

    /// Wait for the next client message, parsed as JSON.
    ///
    /// # Panics
    ///
    /// Panics on timeout or if the client sent invalid JSON.
    pub async fn recv_json(&mut self) -> Value {
        let text = self.recv_text().await;
        serde_json::from_str(&text).expect("client sent invalid JSON")
    }

    /// Next client message, if one is already queued.
    pub fn try_recv_json(&mut self) -> Option<Value> {
        self.outbound
            .try_recv()
            .ok()
            .map(|text| serde_json::from_str(&text).expect("client sent invalid JSON"))
    }

    /// Whether either side closed this connection.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
