//! In-process loopback transport
//!
//! Nothing happens on a memory binding unless its [`MemoryPeer`] says so:
//! the peer accepts, pushes frames, fails or hangs up, and reads whatever
//! the client sent.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use dc_core::traits::{Transport, TransportEvent, TransportEventKind, TransportEvents, TransportHandle};
use dc_core::BindingId;
use dc_protocol::{EnvelopeCodec, InboundEnvelope, OutboundEnvelope};

/// Remote end of one memory binding
#[derive(Debug)]
pub struct MemoryPeer {
    binding: BindingId,
    url: String,
    events: TransportEvents,
    outbound: Mutex<mpsc::UnboundedReceiver<String>>,
    cancel: CancellationToken,
}

impl MemoryPeer {
    /// Binding this peer serves
    pub fn binding(&self) -> BindingId {
        self.binding
    }

    /// Address the client opened
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Complete the connection
    pub fn accept(&self) {
        self.emit(TransportEventKind::Opened);
    }

    /// Deliver a raw text frame to the client
    pub fn push(&self, frame: impl Into<String>) {
        self.emit(TransportEventKind::Frame(frame.into()));
    }

    /// Deliver an encoded envelope to the client
    pub fn push_envelope(&self, envelope: &InboundEnvelope) {
        match EnvelopeCodec::new().encode_inbound(envelope) {
            Ok(frame) => self.push(frame),
            Err(e) => tracing::warn!(binding = %self.binding, "Failed to encode envelope: {}", e),
        }
    }

    /// Report a transport error followed by a close
    pub fn fail(&self, reason: impl Into<String>) {
        self.emit(TransportEventKind::Error(reason.into()));
        self.emit(TransportEventKind::Closed);
    }

    /// Close the connection from the remote side
    pub fn hang_up(&self) {
        self.emit(TransportEventKind::Closed);
    }

    /// Next frame the client sent, if any
    pub fn try_recv(&self) -> Option<String> {
        self.outbound.lock().ok()?.try_recv().ok()
    }

    /// Next frame the client sent, decoded
    pub fn try_recv_envelope(&self) -> Option<OutboundEnvelope> {
        let frame = self.try_recv()?;
        EnvelopeCodec::new().decode_outbound(&frame).ok()
    }

    /// Whether the client asked this binding to close
    pub fn is_closed_by_client(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn emit(&self, kind: TransportEventKind) {
        let _ = self.events.send(TransportEvent::new(self.binding, kind));
    }
}

/// Transport whose bindings are [`MemoryPeer`]s
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    peers: Arc<Mutex<Vec<Arc<MemoryPeer>>>>,
}

impl MemoryTransport {
    /// Create a transport with no peers
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently opened peer whose address ends with `suffix`
    pub fn peer(&self, suffix: &str) -> Option<Arc<MemoryPeer>> {
        let peers = self.peers.lock().ok()?;
        let found = peers.iter().rev().find(|p| p.url.ends_with(suffix)).cloned();
        found
    }

    /// Every peer opened so far, oldest first
    pub fn peers(&self) -> Vec<Arc<MemoryPeer>> {
        self.peers
            .lock()
            .map(|peers| peers.clone())
            .unwrap_or_default()
    }
}

impl Transport for MemoryTransport {
    fn open(&self, binding: BindingId, url: &str, events: TransportEvents) -> TransportHandle {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let peer = Arc::new(MemoryPeer {
            binding,
            url: url.to_string(),
            events,
            outbound: Mutex::new(outbound_rx),
            cancel: cancel.clone(),
        });
        if let Ok(mut peers) = self.peers.lock() {
            peers.push(peer);
        }

        TransportHandle::new(outbound_tx, cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_reports_events_in_order() {
        let transport = MemoryTransport::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = transport.open(BindingId::new(7), "mem://log", tx);

        let peer = transport.peer("/log").unwrap();
        peer.accept();
        peer.push("frame");
        peer.fail("reset");

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| {
                assert_eq!(e.binding, BindingId::new(7));
                e.kind
            })
            .collect();
        assert_eq!(
            kinds,
            [
                TransportEventKind::Opened,
                TransportEventKind::Frame("frame".to_string()),
                TransportEventKind::Error("reset".to_string()),
                TransportEventKind::Closed,
            ]
        );
    }

    #[test]
    fn test_peer_receives_client_frames() {
        let transport = MemoryTransport::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = transport.open(BindingId::new(1), "mem://rcon", tx);

        handle.send_frame("hello".to_string()).unwrap();

        let peer = transport.peer("rcon").unwrap();
        assert_eq!(peer.try_recv().as_deref(), Some("hello"));
        assert!(peer.try_recv().is_none());

        handle.close();
        assert!(peer.is_closed_by_client());
    }

    #[test]
    fn test_latest_peer_wins() {
        let transport = MemoryTransport::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        let _first = transport.open(BindingId::new(1), "mem://repl", tx.clone());
        let _second = transport.open(BindingId::new(2), "mem://repl", tx);

        assert_eq!(transport.peer("repl").unwrap().binding(), BindingId::new(2));
        assert_eq!(transport.peers().len(), 2);
    }
}
