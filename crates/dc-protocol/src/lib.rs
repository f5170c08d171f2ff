//! dc-protocol: Wire protocol for the debug console
//!
//! This crate defines the JSON envelopes exchanged between the console
//! front end and the debug server over persistent text-message
//! connections, one per logical channel (or one shared).

pub mod channel;
pub mod codec;
pub mod error;
pub mod message;

pub use channel::ChannelName;
pub use codec::{EnvelopeCodec, DEFAULT_MAX_FRAME_SIZE};
pub use error::ProtocolError;
pub use message::{Command, InboundEnvelope, OutboundEnvelope, Packet, PacketKind, ReplRequest};
