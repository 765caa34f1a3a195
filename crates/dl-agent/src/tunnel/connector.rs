//! Outbound WebSocket connector
//!
//! Opens the connection to the coordinator, sends `identify` as the first
//! frame, and hands back an [`ActiveTunnel`] whose inbound side is read by
//! the reconnect loop and whose outbound side is a queue drained by a
//! dedicated writer task.

use std::fmt::Display;
use std::time::Duration;

use futures::stream::SplitStream;
use futures::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use dl_core::config::AgentConfig;
use dl_core::error::TransportError;
use dl_core::{DeviceIdentity, DlError};
use dl_protocol::{Envelope, Inbound, JsonCodec, Outbound};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events surfaced by an active tunnel
#[derive(Debug)]
pub enum TunnelEvent {
    /// A decoded inbound message
    Message(Inbound),
    /// The connection is gone; the string describes why
    Disconnected(String),
}

/// Establishes WebSocket connections to the coordinator
pub struct TunnelConnector {
    /// Coordinator endpoint URL
    endpoint: String,
    /// Identity sent on every new connection
    identity: DeviceIdentity,
    /// Connection timeout
    connect_timeout: Duration,
    /// Timeout for a single socket write
    send_timeout: Duration,
    /// Outbound queue capacity
    queue_capacity: usize,
    /// Codec for both directions
    codec: JsonCodec,
}

impl TunnelConnector {
    /// Create a connector from the agent configuration
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            identity: config.identity(),
            connect_timeout: config.connect_timeout,
            send_timeout: config.send_timeout,
            queue_capacity: config.outbound_queue,
            codec: JsonCodec::with_max_inbound_bytes(config.max_inbound_bytes),
        }
    }

    /// Coordinator endpoint URL
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Connect and identify.
    ///
    /// `identify` is written directly on the socket before the writer task
    /// starts, so it always precedes any other outbound message on this
    /// connection.
    pub async fn connect(&self) -> Result<ActiveTunnel, DlError> {
        tracing::debug!(endpoint = %self.endpoint, "opening websocket");

        let (ws, _response) = tokio::time::timeout(
            self.connect_timeout,
            tokio_tungstenite::connect_async(self.endpoint.as_str()),
        )
        .await
        .map_err(|_| TransportError::ConnectTimeout {
            endpoint: self.endpoint.clone(),
            timeout: self.connect_timeout,
        })?
        .map_err(|e| TransportError::Connect {
            endpoint: self.endpoint.clone(),
            reason: e.to_string(),
        })?;

        let (mut sink, stream) = ws.split();

        let identify = Envelope::new(
            self.identity.device_id.clone(),
            Outbound::Identify {
                device_type: self.identity.device_type.clone(),
                secret: self.identity.secret.clone(),
            },
        );
        let text = self.codec.encode(&identify)?;
        write_frame(&mut sink, text, self.send_timeout).await?;
        tracing::info!(device_id = %self.identity.device_id, "sent identification");

        let (outbound_tx, outbound_rx) = mpsc::channel(self.queue_capacity);
        let cancel = CancellationToken::new();
        let writer = tokio::spawn(run_writer(
            sink,
            outbound_rx,
            self.codec.clone(),
            self.send_timeout,
            cancel.clone(),
        ));

        Ok(ActiveTunnel {
            stream,
            outbound: outbound_tx,
            writer: Some(writer),
            cancel,
            codec: self.codec.clone(),
        })
    }
}

/// A live connection to the coordinator
pub struct ActiveTunnel {
    /// Inbound half of the socket
    stream: SplitStream<WsStream>,
    /// Queue into the writer task
    outbound: mpsc::Sender<Envelope>,
    /// Writer task owning the outbound half
    writer: Option<JoinHandle<()>>,
    /// Cancelled by the writer on failure, or by us on close
    cancel: CancellationToken,
    /// Codec for inbound frames
    codec: JsonCodec,
}

impl ActiveTunnel {
    /// Sender for queueing outbound envelopes on this connection
    pub fn outbound(&self) -> mpsc::Sender<Envelope> {
        self.outbound.clone()
    }

    /// Receive the next inbound message.
    ///
    /// Undecodable frames are logged and skipped; they never end the
    /// session. Returns [`TunnelEvent::Disconnected`] when the peer closes,
    /// the stream errors, or the writer reports a failed send.
    pub async fn recv_event(&mut self) -> TunnelEvent {
        loop {
            let frame = tokio::select! {
                frame = self.stream.next() => frame,
                _ = self.cancel.cancelled() => {
                    return TunnelEvent::Disconnected("outbound write failed".to_string());
                }
            };

            match frame {
                None => return TunnelEvent::Disconnected("stream ended".to_string()),
                Some(Err(e)) => {
                    return TunnelEvent::Disconnected(TransportError::Receive(e.to_string()).to_string());
                }
                Some(Ok(Message::Text(text))) => match self.codec.decode(&text) {
                    Ok(message) => return TunnelEvent::Message(message),
                    Err(e) => {
                        tracing::warn!(error = %e, "discarding undecodable message");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = match frame {
                        Some(frame) => format!(
                            "closed by coordinator ({}): {}",
                            u16::from(frame.code),
                            frame.reason
                        ),
                        None => "closed by coordinator".to_string(),
                    };
                    return TunnelEvent::Disconnected(reason);
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!(bytes = data.len(), "ignoring binary frame");
                }
                Some(Ok(_)) => {
                    // Ping/pong are answered by tungstenite
                }
            }
        }
    }

    /// Stop the writer task and drop the connection
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(writer) = self.writer.take() {
            if tokio::time::timeout(Duration::from_millis(500), writer)
                .await
                .is_err()
            {
                tracing::debug!("writer task did not stop in time");
            }
        }
    }
}

impl Drop for ActiveTunnel {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Write one text frame, bounded by the send timeout
async fn write_frame<S>(sink: &mut S, text: String, timeout: Duration) -> Result<(), TransportError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    tokio::time::timeout(timeout, sink.send(Message::Text(text)))
        .await
        .map_err(|_| TransportError::SendTimeout(timeout))?
        .map_err(|e| TransportError::Send(e.to_string()))
}

/// Drain the outbound queue onto the socket, one frame at a time.
///
/// A failed or timed-out write cancels the tunnel so the reader side
/// reports disconnection.
async fn run_writer<S>(
    mut sink: S,
    mut outbound_rx: mpsc::Receiver<Envelope>,
    codec: JsonCodec,
    send_timeout: Duration,
    cancel: CancellationToken,
) where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    loop {
        let envelope = tokio::select! {
            envelope = outbound_rx.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
            _ = cancel.cancelled() => break,
        };

        let text = match codec.encode(&envelope) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(kind = envelope.kind(), error = %e, "failed to encode outbound message");
                continue;
            }
        };

        if let Err(e) = write_frame(&mut sink, text, send_timeout).await {
            tracing::warn!(kind = envelope.kind(), error = %e, "send failed, dropping connection");
            cancel.cancel();
            return;
        }
        tracing::debug!(kind = envelope.kind(), "sent message");
    }

    let _ = tokio::time::timeout(send_timeout, sink.close()).await;
}
