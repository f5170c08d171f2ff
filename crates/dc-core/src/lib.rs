//! dc-core: Core abstractions and configuration for the debug console
//!
//! This crate provides the error taxonomy, channel lifecycle types,
//! configuration structures, and the `Sink`/`Transport` seams shared by
//! the channel client and the operator binary.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{ChannelError, ConfigError, ConsoleError};
pub use types::{AddressTemplate, BindingId, ChannelState};
