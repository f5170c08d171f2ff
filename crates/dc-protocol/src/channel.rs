//! Channel name type

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Name of a logical console channel (`log`, `rcon`, `repl`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    /// Log streaming channel
    pub const LOG: &'static str = "log";
    /// Remote administrative command channel
    pub const RCON: &'static str = "rcon";
    /// Remote script execution channel
    pub const REPL: &'static str = "repl";

    /// Create a new channel name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The channels a console opens when none are configured
    pub fn defaults() -> Vec<ChannelName> {
        vec![
            ChannelName::new(Self::LOG),
            ChannelName::new(Self::RCON),
            ChannelName::new(Self::REPL),
        ]
    }

    /// Get the raw name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ChannelName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for ChannelName {
    fn borrow(&self) -> &str {
        &self.0
    }
}
