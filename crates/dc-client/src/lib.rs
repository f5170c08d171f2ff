//! dc-client: Multiplexed channel client for the debug console
//!
//! The client opens one transport binding per channel (or one shared
//! binding), encodes outbound commands, decodes inbound packets and
//! dispatches them to registered sinks. All bookkeeping happens on the
//! task that drives [`ChannelClient::next_event`].

pub mod channel;
pub mod client;
pub mod input;
pub mod markup;
pub mod reconnect;
pub mod sink;
pub mod transport;

pub use channel::Channel;
pub use client::{ChannelClient, ClientEvent};
pub use reconnect::ExponentialBackoff;
pub use sink::{ConsoleSink, DispatchOutcome, SinkTable};
pub use transport::{MemoryPeer, MemoryTransport, WebSocketTransport};
