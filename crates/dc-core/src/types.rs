//! Core domain types

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ChannelError;

/// Lifecycle state of a channel.
///
/// ```text
/// Connecting ──> Open ──> Closed
///      │          │         ▲
///      └────> Errored ──────┘
/// ```
///
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    /// Transport is being established
    Connecting,
    /// Transport is established; sends are accepted
    Open,
    /// Transport reported an error; a close follows
    Errored,
    /// Transport is gone
    Closed,
}

impl ChannelState {
    /// Whether the state machine allows moving from `self` to `next`
    pub fn can_transition_to(self, next: ChannelState) -> bool {
        use ChannelState::*;
        matches!(
            (self, next),
            (Connecting, Open)
                | (Connecting, Errored)
                | (Connecting, Closed)
                | (Open, Errored)
                | (Open, Closed)
                | (Errored, Closed)
        )
    }

    /// Validate a transition, returning the new state
    pub fn transition(self, next: ChannelState) -> Result<ChannelState, ChannelError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ChannelError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Whether sends are accepted in this state
    pub fn is_open(self) -> bool {
        self == ChannelState::Open
    }

    /// Whether no transition can leave this state
    pub fn is_terminal(self) -> bool {
        self == ChannelState::Closed
    }
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelState::Connecting => write!(f, "connecting"),
            ChannelState::Open => write!(f, "open"),
            ChannelState::Errored => write!(f, "errored"),
            ChannelState::Closed => write!(f, "closed"),
        }
    }
}

/// Identifier of one opened transport binding.
///
/// Every call to `Transport::open` gets a fresh id, so events from a
/// binding that was replaced by a reconnect can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(pub u64);

impl BindingId {
    /// Create a new binding ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "binding-{}", self.0)
    }
}

/// Endpoint address with a `{channel}` placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressTemplate(String);

impl AddressTemplate {
    /// Placeholder token substituted with the channel name
    pub const PLACEHOLDER: &'static str = "{channel}";

    /// Create a new address template
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    /// Whether the template contains the channel placeholder
    pub fn has_placeholder(&self) -> bool {
        self.0.contains(Self::PLACEHOLDER)
    }

    /// Substitute `channel` for every placeholder
    pub fn resolve(&self, channel: &str) -> String {
        self.0.replace(Self::PLACEHOLDER, channel)
    }

    /// Get the raw template
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AddressTemplate {
    fn default() -> Self {
        Self::new("ws://localhost:32081/{channel}")
    }
}

impl fmt::Display for AddressTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
