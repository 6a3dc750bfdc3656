//! Duplex text-frame transport to the relay.
//!
//! A [`Transport`] opens one [`Connection`] per call: a bounded outbound queue
//! and a bounded inbound event stream. Sessions only ever talk to this trait,
//! so tests substitute a scripted transport for the WebSocket one.

pub mod websocket;

use crate::errors::{ChannelKind, RtmsError};
use tokio::sync::mpsc;
use url::Url;

pub use websocket::WebSocketTransport;

/// Something a session asks a connection to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// A JSON text frame.
    Text(String),
    /// Close the connection.
    Close,
}

/// Something a connection reports to its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame arrived.
    Text(String),
    /// A socket error. Always followed by [`TransportEvent::Closed`].
    Error(String),
    /// The connection is gone. Nothing follows.
    Closed,
}

/// One open connection.
#[derive(Debug)]
pub struct Connection {
    pub outbound: mpsc::Sender<OutboundFrame>,
    pub inbound: mpsc::Receiver<TransportEvent>,
}

/// Connection factory.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a connection to `url`.
    ///
    /// # Errors
    ///
    /// Returns [`RtmsError::Transport`] if the connection cannot be established.
    async fn connect(&self, channel: ChannelKind, url: &Url) -> Result<Connection, RtmsError>;
}

/// Parse a relay endpoint, accepting only absolute `ws://` and `wss://` URLs.
///
/// # Errors
///
/// Returns [`RtmsError::InvalidRelayUrl`] for anything else.
pub fn parse_relay_url(raw: &str) -> Result<Url, RtmsError> {
    let url = Url::parse(raw).map_err(|e| RtmsError::InvalidRelayUrl(format!("{raw}: {e}")))?;

    match url.scheme() {
        "ws" | "wss" if url.has_host() => Ok(url),
        "ws" | "wss" => Err(RtmsError::InvalidRelayUrl(format!("{raw}: missing host"))),
        scheme => Err(RtmsError::InvalidRelayUrl(format!(
            "{raw}: unsupported scheme {scheme}"
        ))),
    }
}
