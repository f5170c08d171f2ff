//! Core trait definitions

mod sink;
mod transport;

pub use sink::Sink;
pub use transport::{Transport, TransportEvent, TransportEventKind, TransportEvents, TransportHandle};
