//! WebSocket transport binding
//!
//! Each binding is one tokio task owning one WebSocket connection.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use dc_core::traits::{Transport, TransportEvent, TransportEventKind, TransportEvents, TransportHandle};
use dc_core::BindingId;

/// Failures that end a binding
#[derive(Debug, Error)]
enum BindingError {
    /// The handshake did not finish in time
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),

    /// WebSocket protocol or I/O failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// Opens one WebSocket connection per binding
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    connect_timeout: Duration,
}

impl WebSocketTransport {
    /// Create a transport with the given handshake timeout
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, binding: BindingId, url: &str, events: TransportEvents) -> TransportHandle {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tokio::spawn(run_binding(
            binding,
            url.to_string(),
            self.connect_timeout,
            outbound_rx,
            cancel.clone(),
            events,
        ));

        TransportHandle::new(outbound_tx, cancel)
    }
}

async fn run_binding(
    binding: BindingId,
    url: String,
    connect_timeout: Duration,
    outbound: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
    events: TransportEvents,
) {
    let result = drive(binding, &url, connect_timeout, outbound, &cancel, &events).await;

    if let Err(e) = result {
        tracing::warn!(%binding, url = %url, "Binding failed: {}", e);
        let _ = events.send(TransportEvent::new(
            binding,
            TransportEventKind::Error(e.to_string()),
        ));
    }

    tracing::debug!(%binding, url = %url, "Binding closed");
    let _ = events.send(TransportEvent::new(binding, TransportEventKind::Closed));
}

async fn drive(
    binding: BindingId,
    url: &str,
    connect_timeout: Duration,
    mut outbound: mpsc::UnboundedReceiver<String>,
    cancel: &CancellationToken,
    events: &TransportEvents,
) -> Result<(), BindingError> {
    tracing::debug!(%binding, "Connecting to {}", url);

    let connected = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        result = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(url)) => result,
    };
    let (socket, _response) = connected.map_err(|_| BindingError::Timeout(connect_timeout))??;

    let _ = events.send(TransportEvent::new(binding, TransportEventKind::Opened));
    let (mut writer, mut reader) = socket.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = writer.send(Message::Close(None)).await;
                return Ok(());
            }
            frame = outbound.recv() => match frame {
                Some(text) => writer.send(Message::Text(text)).await?,
                None => {
                    let _ = writer.send(Message::Close(None)).await;
                    return Ok(());
                }
            },
            message = reader.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::new(binding, TransportEventKind::Frame(text)));
                }
                Some(Ok(Message::Binary(bytes))) => {
                    // Non-UTF-8 bytes surface as a decode failure downstream
                    let text = String::from_utf8_lossy(&bytes).into_owned();
                    let _ = events.send(TransportEvent::new(binding, TransportEventKind::Frame(text)));
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(%binding, ?frame, "Peer closed connection");
                    return Ok(());
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()),
            },
        }
    }
}
