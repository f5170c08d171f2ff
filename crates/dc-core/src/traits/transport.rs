//! Transport traits
//!
//! A transport turns a URL into a running binding: a background task that
//! owns one duplex text-message connection, forwards lifecycle changes and
//! inbound frames as [`TransportEvent`]s, and writes outbound frames it
//! receives through its [`TransportHandle`].

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ChannelError;
use crate::types::BindingId;

/// What happened on a binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    /// Connection established
    Opened,
    /// One inbound text frame
    Frame(String),
    /// Connection failed; `Closed` follows
    Error(String),
    /// Connection is gone; no further events for this binding
    Closed,
}

/// Event reported by a binding task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    /// Binding that produced the event
    pub binding: BindingId,
    /// Event payload
    pub kind: TransportEventKind,
}

impl TransportEvent {
    /// Create a new transport event
    pub fn new(binding: BindingId, kind: TransportEventKind) -> Self {
        Self { binding, kind }
    }
}

/// Sender half bindings report into
pub type TransportEvents = mpsc::UnboundedSender<TransportEvent>;

/// Caller-side handle to a running binding
#[derive(Debug, Clone)]
pub struct TransportHandle {
    outbound: mpsc::UnboundedSender<String>,
    cancel: CancellationToken,
}

impl TransportHandle {
    /// Create a new handle from the binding's outbound queue and stop token
    pub fn new(outbound: mpsc::UnboundedSender<String>, cancel: CancellationToken) -> Self {
        Self { outbound, cancel }
    }

    /// Queue a frame for transmission without waiting for the write
    pub fn send_frame(&self, frame: String) -> Result<(), ChannelError> {
        if self.cancel.is_cancelled() {
            return Err(ChannelError::Transport("binding is closing".to_string()));
        }
        self.outbound
            .send(frame)
            .map_err(|_| ChannelError::Transport("binding task has exited".to_string()))
    }

    /// Ask the binding to close its connection
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Whether a close was requested
    pub fn is_closing(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Factory for transport bindings.
///
/// `open` must not block: implementations spawn a task on the current
/// tokio runtime and return immediately. The task reports `Opened` (or
/// `Error` then `Closed`) through `events`, followed by any number of
/// `Frame`s, and always finishes with exactly one `Closed`.
pub trait Transport: Send + Sync {
    /// Start a binding to `url`
    fn open(&self, binding: BindingId, url: &str, events: TransportEvents) -> TransportHandle;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handle_queues_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = TransportHandle::new(tx, CancellationToken::new());

        handle.send_frame("one".to_string()).unwrap();
        handle.send_frame("two".to_string()).unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        assert_eq!(rx.recv().await.as_deref(), Some("two"));
    }

    #[test]
    fn test_handle_rejects_after_close() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = TransportHandle::new(tx, CancellationToken::new());

        handle.close();

        assert!(handle.is_closing());
        assert!(matches!(
            handle.send_frame("late".to_string()),
            Err(ChannelError::Transport(_))
        ));
    }

    #[test]
    fn test_handle_rejects_when_task_gone() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let handle = TransportHandle::new(tx, CancellationToken::new());
        drop(rx);
        assert!(handle.send_frame("lost".to_string()).is_err());
    }
}
