//! Multi-step relay conversations shared by integration tests.

use crate::fixtures::{self, MEDIA_URL};
use crate::mock_transport::{MockConnection, MockRelay};
use rtms_client::errors::ChannelKind;
use rtms_client::events::{EndReason, SessionEvent};
use std::time::Duration;
use tokio::sync::mpsc;

/// Play the relay through a full bootstrap: signaling handshake, event
/// subscription, media data handshake and client ready ack.
///
/// Returns the signaling and media connections with nothing left unread.
///
/// # Panics
///
/// Panics if the client deviates from the expected message sequence.
pub async fn bootstrap(relay: &mut MockRelay) -> (MockConnection, MockConnection) {
    let mut signaling = relay.next_connection().await;
    assert_eq!(signaling.channel, ChannelKind::Signaling);
    let handshake = signaling.recv_json().await;
    assert_eq!(handshake["msg_type"], 1, "expected HANDSHAKE_REQUEST");

    signaling.send_json(fixtures::handshake_ok(MEDIA_URL)).await;
    let subscribe = signaling.recv_json().await;
    assert_eq!(subscribe["msg_type"], 5, "expected EVENT_SUBSCRIBE");

    let mut media = relay.next_connection().await;
    assert_eq!(media.channel, ChannelKind::Media);
    assert_eq!(media.url.as_str(), MEDIA_URL);
    let data_handshake = media.recv_json().await;
    assert_eq!(data_handshake["msg_type"], 3, "expected DATA_HANDSHAKE_REQUEST");

    media.send_json(fixtures::data_handshake_ok()).await;
    let ready = signaling.recv_json().await;
    assert_eq!(ready["msg_type"], 7, "expected CLIENT_READY_ACK");

    (signaling, media)
}

/// How long `next_event` waits for the client to publish.
const EVENT_TIMEOUT: Duration = Duration::from_secs(1);

/// Wait for the next published event.
///
/// # Panics
///
/// Panics if nothing arrives in time or the event channel closed.
pub async fn next_event(events: &mut mpsc::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for a session event")
        .expect("event channel closed")
}

/// Skip frames and relay events until a session ends; returns its reason.
///
/// # Panics
///
/// Panics if no `Ended` event arrives in time.
pub async fn next_ended(events: &mut mpsc::Receiver<SessionEvent>) -> EndReason {
    loop {
        if let SessionEvent::Ended { reason, .. } = next_event(events).await {
            return reason;
        }
    }
}
