//! Channel client
//!
//! The client owns every channel record, the endpoint bindings carrying
//! them and the sink table. Bindings run as independent tasks and report
//! into a single queue; [`ChannelClient::next_event`] drains that queue on
//! the caller's task, so state and sinks are only ever touched from one
//! place and no locking is needed.
//!
//! # Lifecycle
//!
//! ```text
//! start(["log", "rcon", "repl"])
//!   ├─ endpoint "log"  ── binding 1 ── Connecting → Open → ...
//!   ├─ endpoint "rcon" ── binding 2 ── Connecting → Open → ...
//!   └─ endpoint "repl" ── binding 3 ── Connecting → Open → ...
//! ```
//!
//! In shared mode a single endpoint carries every channel, and its
//! lifecycle events apply to all of them at once.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use dc_core::config::{ClientConfig, ConnectionMode};
use dc_core::traits::{Sink, Transport, TransportEvent, TransportEventKind, TransportHandle};
use dc_core::{BindingId, ChannelError, ChannelState, ConsoleError};
use dc_protocol::{ChannelName, Command, EnvelopeCodec, OutboundEnvelope, Packet, PacketKind};

use crate::channel::Channel;
use crate::markup;
use crate::reconnect::ExponentialBackoff;
use crate::sink::{DispatchOutcome, SinkTable};

/// Something the client did in response to transport activity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// A channel entered a new lifecycle state
    StateChanged {
        channel: ChannelName,
        state: ChannelState,
    },
    /// A packet reached its kind-specific sink
    Dispatched { kind: PacketKind, invocations: usize },
    /// A packet had no kind-specific sink
    Unhandled { kind: PacketKind, fallback: bool },
    /// A frame could not be decoded; the connection stays up
    DecodeFailed { endpoint: String, error: String },
    /// A dropped endpoint will be reopened after `delay`
    ReconnectScheduled {
        endpoint: String,
        attempt: u32,
        delay: Duration,
    },
    /// A dropped endpoint ran out of reconnect attempts
    ReconnectAbandoned { endpoint: String, attempts: u32 },
}

/// One transport target and the channels it carries
struct Endpoint {
    url: String,
    channels: Vec<ChannelName>,
    binding: Option<BindingId>,
    handle: Option<TransportHandle>,
    attempts: u32,
    backoff: ExponentialBackoff,
    /// Closed by the caller; never reopened
    stopped: bool,
}

/// Multiplexed channel client
pub struct ChannelClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    codec: EnvelopeCodec,
    sinks: SinkTable,
    channels: HashMap<ChannelName, Channel>,
    /// Channel names in start order
    order: Vec<ChannelName>,
    endpoints: HashMap<String, Endpoint>,
    /// Live binding to endpoint key
    bindings: HashMap<BindingId, String>,
    next_binding: u64,
    started: bool,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    reconnect_tx: mpsc::UnboundedSender<String>,
    reconnect_rx: mpsc::UnboundedReceiver<String>,
    pending: VecDeque<ClientEvent>,
}

impl ChannelClient {
    /// Create a client; nothing is opened until [`start`](Self::start)
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ConsoleError> {
        config.validate()?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (reconnect_tx, reconnect_rx) = mpsc::unbounded_channel();

        Ok(Self {
            codec: EnvelopeCodec::with_max_frame_size(config.max_frame_size),
            config,
            transport,
            sinks: SinkTable::new(),
            channels: HashMap::new(),
            order: Vec::new(),
            endpoints: HashMap::new(),
            bindings: HashMap::new(),
            next_binding: 1,
            started: false,
            events_tx,
            events_rx,
            reconnect_tx,
            reconnect_rx,
            pending: VecDeque::new(),
        })
    }

    /// Client configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Register the sink for `kind`, returning the one it replaces
    pub fn register_sink(
        &mut self,
        kind: impl Into<PacketKind>,
        sink: Arc<dyn Sink>,
    ) -> Option<Arc<dyn Sink>> {
        self.sinks.register(kind.into(), sink)
    }

    /// Register the sink told about packet kinds nobody handles
    pub fn register_fallback_sink(&mut self, sink: Arc<dyn Sink>) -> Option<Arc<dyn Sink>> {
        self.sinks.register_fallback(sink)
    }

    /// Register the sink for connection status notices.
    ///
    /// Without one, notices go to the `log` sink.
    pub fn register_status_sink(&mut self, sink: Arc<dyn Sink>) -> Option<Arc<dyn Sink>> {
        self.sinks.register_status(sink)
    }

    /// Open every configured channel
    pub fn start_configured(&mut self) -> Result<(), ChannelError> {
        let names = self.config.channels.clone();
        self.start(names)
    }

    /// Open a binding for each channel name.
    ///
    /// Duplicate names are opened once. May only be called once per client.
    pub fn start<I, N>(&mut self, names: I) -> Result<(), ChannelError>
    where
        I: IntoIterator<Item = N>,
        N: Into<ChannelName>,
    {
        if self.started {
            return Err(ChannelError::AlreadyStarted);
        }

        let mut unique: Vec<ChannelName> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        if unique.is_empty() {
            return Err(ChannelError::NoChannels);
        }

        self.started = true;
        self.order = unique.clone();
        self.sinks.notify(&markup::connecting());
        tracing::info!(mode = ?self.config.mode, "Opening channels: {:?}", unique);

        match self.config.mode {
            ConnectionMode::PerChannel => {
                for name in unique {
                    let url = self.config.address.resolve(name.as_str());
                    self.add_endpoint(name.to_string(), url, vec![name]);
                }
            }
            ConnectionMode::Shared => {
                let key = self.config.shared_channel.clone();
                let url = self.config.address.resolve(&key);
                self.add_endpoint(key, url, unique);
            }
        }

        Ok(())
    }

    /// Whether `start` has been called
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Current state of a channel
    pub fn state(&self, channel: &str) -> Option<ChannelState> {
        self.channels.get(channel).map(Channel::state)
    }

    /// Current record of a channel
    pub fn channel(&self, channel: &str) -> Option<&Channel> {
        self.channels.get(channel)
    }

    /// Every channel record, in start order
    pub fn channels(&self) -> Vec<&Channel> {
        self.order
            .iter()
            .filter_map(|name| self.channels.get(name))
            .collect()
    }

    /// Encode `payload` for `channel` and hand it to the binding.
    ///
    /// Returns as soon as the frame is queued; the write happens on the
    /// binding's task.
    pub fn send(&self, payload: impl Into<Command>, channel: &str) -> Result<(), ConsoleError> {
        let record = self
            .channels
            .get(channel)
            .ok_or_else(|| ChannelError::UnknownChannel(channel.to_string()))?;
        record.ensure_open()?;

        let envelope = OutboundEnvelope::new(record.name().clone(), payload);
        let frame = self.codec.encode(&envelope)?;

        let handle = self
            .endpoints
            .get(record.endpoint())
            .and_then(|endpoint| endpoint.handle.as_ref())
            .ok_or_else(|| ChannelError::Transport(format!("no binding for {}", channel)))?;
        handle.send_frame(frame)?;

        tracing::debug!(channel = %channel, "Queued outbound frame");
        Ok(())
    }

    /// Close one channel from this side.
    ///
    /// The channel is `Closed` when this returns. The underlying binding is
    /// released once no channel uses it.
    pub fn close_channel(&mut self, channel: &str) -> Result<(), ChannelError> {
        let record = self
            .channels
            .get(channel)
            .ok_or_else(|| ChannelError::UnknownChannel(channel.to_string()))?;
        let name = record.name().clone();
        let key = record.endpoint().to_string();
        let url = record.url().to_string();

        if let Some(endpoint) = self.endpoints.get_mut(&key) {
            endpoint.channels.retain(|c| c != &name);
            if endpoint.channels.is_empty() {
                endpoint.stopped = true;
                if let Some(handle) = &endpoint.handle {
                    handle.close();
                }
            }
        }

        if self.apply_state(&name, ChannelState::Closed) {
            self.sinks.notify(&markup::closed(&url));
        }
        Ok(())
    }

    /// Close every channel
    pub fn shutdown(&mut self) {
        for name in self.order.clone() {
            let _ = self.close_channel(name.as_str());
        }
    }

    /// Wait for transport activity, handle it and report what happened.
    ///
    /// Returns `None` only if every event source is gone, which cannot
    /// happen while the client is alive.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            tokio::select! {
                biased;
                Some(event) = self.events_rx.recv() => self.handle_transport_event(event),
                Some(key) = self.reconnect_rx.recv() => self.handle_reconnect(&key),
                else => return None,
            }
        }
    }

    /// Handle whatever is already queued, without waiting
    pub fn try_next_event(&mut self) -> Option<ClientEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }

            if let Ok(event) = self.events_rx.try_recv() {
                self.handle_transport_event(event);
            } else if let Ok(key) = self.reconnect_rx.try_recv() {
                self.handle_reconnect(&key);
            } else {
                return None;
            }
        }
    }

    fn add_endpoint(&mut self, key: String, url: String, channels: Vec<ChannelName>) {
        let endpoint = Endpoint {
            url,
            channels,
            binding: None,
            handle: None,
            attempts: 0,
            backoff: ExponentialBackoff::from_config(&self.config.reconnect.backoff),
            stopped: false,
        };
        self.endpoints.insert(key.clone(), endpoint);
        self.bind_endpoint(&key);
    }

    /// Open a fresh binding for an endpoint and fresh records for its channels
    fn bind_endpoint(&mut self, key: &str) {
        let binding = BindingId::new(self.next_binding);
        self.next_binding += 1;

        let Some(endpoint) = self.endpoints.get_mut(key) else {
            return;
        };
        tracing::debug!(%binding, endpoint = %key, "Opening {}", endpoint.url);

        let handle = self
            .transport
            .open(binding, &endpoint.url, self.events_tx.clone());
        endpoint.binding = Some(binding);
        endpoint.handle = Some(handle);
        self.bindings.insert(binding, key.to_string());

        for name in &endpoint.channels {
            let channel = Channel::new(
                name.clone(),
                endpoint.url.clone(),
                key.to_string(),
                binding,
            );
            self.channels.insert(name.clone(), channel);
            self.pending.push_back(ClientEvent::StateChanged {
                channel: name.clone(),
                state: ChannelState::Connecting,
            });
        }
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        let Some(key) = self.bindings.get(&event.binding).cloned() else {
            tracing::debug!(binding = %event.binding, "Ignoring event from retired binding");
            return;
        };

        match event.kind {
            TransportEventKind::Opened => self.on_opened(&key),
            TransportEventKind::Frame(frame) => self.dispatch_frame(&key, &frame),
            TransportEventKind::Error(reason) => self.on_error(&key, &reason),
            TransportEventKind::Closed => {
                self.bindings.remove(&event.binding);
                self.on_closed(&key);
            }
        }
    }

    fn on_opened(&mut self, key: &str) {
        let Some(endpoint) = self.endpoints.get_mut(key) else {
            return;
        };
        endpoint.attempts = 0;
        endpoint.backoff.reset();
        let url = endpoint.url.clone();
        let channels = endpoint.channels.clone();

        tracing::info!(endpoint = %key, "Connected to {}", url);
        if self.apply_all(&channels, ChannelState::Open) {
            self.sinks.notify(&markup::connected(&url));
        }
    }

    fn on_error(&mut self, key: &str, reason: &str) {
        let Some(endpoint) = self.endpoints.get(key) else {
            return;
        };
        let channels = endpoint.channels.clone();

        tracing::warn!(endpoint = %key, "Socket error: {}", reason);
        if self.apply_all(&channels, ChannelState::Errored) {
            self.sinks.notify(&markup::socket_error());
        }
    }

    fn on_closed(&mut self, key: &str) {
        let Some(endpoint) = self.endpoints.get_mut(key) else {
            return;
        };
        endpoint.binding = None;
        endpoint.handle = None;
        let url = endpoint.url.clone();
        let channels = endpoint.channels.clone();
        let stopped = endpoint.stopped;

        tracing::info!(endpoint = %key, "Connection to {} closed", url);
        if self.apply_all(&channels, ChannelState::Closed) {
            self.sinks.notify(&markup::closed(&url));
        }

        if !stopped {
            self.schedule_reconnect(key);
        }
    }

    fn schedule_reconnect(&mut self, key: &str) {
        if !self.config.reconnect.enabled {
            return;
        }
        let max_attempts = self.config.reconnect.max_attempts;
        let Some(endpoint) = self.endpoints.get_mut(key) else {
            return;
        };

        if endpoint.attempts >= max_attempts {
            let attempts = endpoint.attempts;
            let url = endpoint.url.clone();
            tracing::warn!(endpoint = %key, "Giving up after {} reconnect attempts", attempts);
            self.sinks.notify(&markup::gave_up(&url, attempts));
            self.pending.push_back(ClientEvent::ReconnectAbandoned {
                endpoint: key.to_string(),
                attempts,
            });
            return;
        }

        endpoint.attempts += 1;
        let attempt = endpoint.attempts;
        let delay = endpoint.backoff.next_delay();
        let url = endpoint.url.clone();

        tracing::info!(endpoint = %key, attempt, "Reconnecting in {:?}", delay);
        self.sinks.notify(&markup::reconnecting(&url, delay));
        self.pending.push_back(ClientEvent::ReconnectScheduled {
            endpoint: key.to_string(),
            attempt,
            delay,
        });

        let tx = self.reconnect_tx.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(key);
        });
    }

    fn handle_reconnect(&mut self, key: &str) {
        match self.endpoints.get(key) {
            Some(endpoint) if !endpoint.stopped && endpoint.binding.is_none() => {
                self.bind_endpoint(key);
            }
            _ => tracing::debug!(endpoint = %key, "Reconnect no longer needed"),
        }
    }

    fn dispatch_frame(&mut self, key: &str, frame: &str) {
        let envelope = match self.codec.decode(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(endpoint = %key, "Dropping malformed frame: {}", e);
                self.sinks.notify(&markup::malformed(&e.to_string()));
                self.pending.push_back(ClientEvent::DecodeFailed {
                    endpoint: key.to_string(),
                    error: e.to_string(),
                });
                return;
            }
        };

        let event = match self.sinks.dispatch(Packet::from(envelope)) {
            DispatchOutcome::Handled { kind, invocations } => {
                tracing::trace!(endpoint = %key, %kind, invocations, "Dispatched packet");
                ClientEvent::Dispatched { kind, invocations }
            }
            DispatchOutcome::Fallback { kind } => {
                tracing::debug!(endpoint = %key, %kind, "Packet routed to fallback sink");
                ClientEvent::Unhandled {
                    kind,
                    fallback: true,
                }
            }
            DispatchOutcome::Unhandled { kind } => {
                tracing::warn!(endpoint = %key, %kind, "Unhandled packet type");
                ClientEvent::Unhandled {
                    kind,
                    fallback: false,
                }
            }
        };
        self.pending.push_back(event);
    }

    /// Transition every listed channel; true if any of them moved
    fn apply_all(&mut self, channels: &[ChannelName], next: ChannelState) -> bool {
        let mut changed = false;
        for name in channels {
            changed |= self.apply_state(name, next);
        }
        changed
    }

    fn apply_state(&mut self, name: &ChannelName, next: ChannelState) -> bool {
        let Some(channel) = self.channels.get_mut(name) else {
            return false;
        };
        match channel.transition(next) {
            Ok(state) => {
                tracing::debug!(channel = %name, %state, "Channel state changed");
                self.pending.push_back(ClientEvent::StateChanged {
                    channel: name.clone(),
                    state,
                });
                true
            }
            Err(e) => {
                tracing::trace!(channel = %name, "Ignoring transition: {}", e);
                false
            }
        }
    }
}

impl Drop for ChannelClient {
    fn drop(&mut self) {
        for endpoint in self.endpoints.values() {
            if let Some(handle) = &endpoint.handle {
                handle.close();
            }
        }
    }
}
