//! Channel records

use dc_core::{BindingId, ChannelError, ChannelState};
use dc_protocol::ChannelName;

/// One logical stream and the binding it rides on.
///
/// A record lives from the binding's open until its `Closed` state; a
/// reconnect replaces the record instead of reviving it.
#[derive(Debug, Clone)]
pub struct Channel {
    name: ChannelName,
    url: String,
    endpoint: String,
    binding: BindingId,
    state: ChannelState,
}

impl Channel {
    pub(crate) fn new(name: ChannelName, url: String, endpoint: String, binding: BindingId) -> Self {
        Self {
            name,
            url,
            endpoint,
            binding,
            state: ChannelState::Connecting,
        }
    }

    /// Channel name
    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    /// Address of the connection carrying this channel
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Key of the endpoint carrying this channel
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Binding carrying this channel
    pub fn binding(&self) -> BindingId {
        self.binding
    }

    /// Current lifecycle state
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Move to `next` if the state machine allows it
    pub(crate) fn transition(&mut self, next: ChannelState) -> Result<ChannelState, ChannelError> {
        self.state = self.state.transition(next)?;
        Ok(self.state)
    }

    /// Fail unless the channel accepts sends
    pub(crate) fn ensure_open(&self) -> Result<(), ChannelError> {
        if self.state.is_open() {
            Ok(())
        } else {
            Err(ChannelError::ChannelNotOpen {
                channel: self.name.to_string(),
                state: self.state,
            })
        }
    }
}
