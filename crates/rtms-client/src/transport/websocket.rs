//! WebSocket transport over `tokio-tungstenite`.
//!
//! Each connection is split into a writer task draining the outbound queue
//! and a reader task forwarding text frames. TLS (`wss://`) is handled by
//! rustls with webpki roots.

use super::{Connection, OutboundFrame, Transport, TransportEvent};
use crate::errors::{ChannelKind, RtmsError};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Production transport.
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    outbound_capacity: usize,
    inbound_capacity: usize,
}

impl WebSocketTransport {
    /// Create a transport whose connections use queues of the given depth.
    #[must_use]
    pub fn new(queue_capacity: usize) -> Self {
        let capacity = queue_capacity.max(1);
        Self {
            outbound_capacity: capacity,
            inbound_capacity: capacity,
        }
    }

    async fn writer_task(
        channel: ChannelKind,
        mut write: SplitSink<WsStream, Message>,
        mut outbound: mpsc::Receiver<OutboundFrame>,
    ) {
        while let Some(frame) = outbound.recv().await {
            match frame {
                OutboundFrame::Text(text) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        warn!(
                            target: "rtms.transport",
                            channel = channel.as_str(),
                            error = %e,
                            "WebSocket write failed"
                        );
                        break;
                    }
                }
                OutboundFrame::Close => break,
            }
        }

        // Owner asked to close or dropped the queue
        let _ = write.send(Message::Close(None)).await;
        let _ = write.close().await;
        debug!(target: "rtms.transport", channel = channel.as_str(), "Writer task terminated");
    }

    async fn reader_task(
        channel: ChannelKind,
        mut read: SplitStream<WsStream>,
        events: mpsc::Sender<TransportEvent>,
    ) {
        loop {
            let next = tokio::select! {
                () = events.closed() => break,
                next = read.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => {
                    if events.send(TransportEvent::Text(text)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(
                        target: "rtms.transport",
                        channel = channel.as_str(),
                        close_frame = ?frame,
                        "WebSocket closed by relay"
                    );
                    break;
                }
                Some(Ok(Message::Binary(data))) => {
                    debug!(
                        target: "rtms.transport",
                        channel = channel.as_str(),
                        len = data.len(),
                        "Ignoring binary frame"
                    );
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Error(e.to_string())).await;
                    break;
                }
                None => break,
            }
        }

        let _ = events.send(TransportEvent::Closed).await;
        debug!(target: "rtms.transport", channel = channel.as_str(), "Reader task terminated");
    }
}

#[async_trait::async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, channel: ChannelKind, url: &Url) -> Result<Connection, RtmsError> {
        debug!(
            target: "rtms.transport",
            channel = channel.as_str(),
            host = url.host_str().unwrap_or_default(),
            "Connecting"
        );

        let (ws_stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| RtmsError::Transport {
                channel,
                reason: format!("connect failed: {e}"),
            })?;

        let (write, read) = ws_stream.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(self.outbound_capacity);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.inbound_capacity);

        tokio::spawn(Self::writer_task(channel, write, outbound_rx));
        tokio::spawn(Self::reader_task(channel, read, inbound_tx));

        Ok(Connection {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_at_least_one() {
        let transport = WebSocketTransport::new(0);
        assert_eq!(transport.outbound_capacity, 1);
        assert_eq!(transport.inbound_capacity, 1);
    }

    #[tokio::test]
    async fn test_connect_refused_is_transport_error() {
        // Bind then drop to get a port with nothing listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = Url::parse(&format!("ws://127.0.0.1:{port}")).unwrap();
        let err = WebSocketTransport::new(8)
            .connect(ChannelKind::Signaling, &url)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RtmsError::Transport {
                channel: ChannelKind::Signaling,
                ..
            }
        ));
        assert!(err.is_retryable());
    }
}
