//! Core error types for the debug console

use dc_protocol::ProtocolError;
use std::path::PathBuf;
use thiserror::Error;

use crate::types::ChannelState;

/// Top-level error type for the debug console
#[derive(Error, Debug)]
pub enum ConsoleError {
    /// Protocol error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Channel error
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channel-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// `start` was called on a client that is already running
    #[error("Client already started")]
    AlreadyStarted,

    /// `start` was called with an empty channel set
    #[error("No channels to open")]
    NoChannels,

    /// No channel is registered under this name
    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    /// The channel exists but is not open
    #[error("Channel {channel} is not open (state: {state})")]
    ChannelNotOpen { channel: String, state: ChannelState },

    /// The lifecycle state machine rejected a transition
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition { from: ChannelState, to: ChannelState },

    /// The underlying connection failed
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
