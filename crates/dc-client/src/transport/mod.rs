//! Transport bindings
//!
//! `WebSocketTransport` talks to a live debug server; `MemoryTransport`
//! is an in-process loopback whose peers are driven by the caller.

mod memory;
mod websocket;

pub use memory::{MemoryPeer, MemoryTransport};
pub use websocket::WebSocketTransport;
