//! Channel client configuration

use dc_protocol::{ChannelName, DEFAULT_MAX_FRAME_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::serde_utils::{duration_millis, duration_secs};
use crate::error::ConfigError;
use crate::types::AddressTemplate;

/// How channels map onto transport connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    /// One connection per channel; a failure only affects its own channel
    #[default]
    PerChannel,
    /// One connection carrying every channel
    Shared,
}

/// Configuration for the channel client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Endpoint address; `{channel}` is replaced by the channel name
    pub address: AddressTemplate,

    /// Channels opened on start
    pub channels: Vec<ChannelName>,

    /// Connection layout
    pub mode: ConnectionMode,

    /// Placeholder value used to build the single endpoint in shared mode
    pub shared_channel: String,

    /// Connection establishment timeout
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Largest frame accepted or sent, in bytes
    pub max_frame_size: usize,

    /// Reconnection policy
    pub reconnect: ReconnectConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: AddressTemplate::default(),
            channels: ChannelName::defaults(),
            mode: ConnectionMode::PerChannel,
            shared_channel: "console".to_string(),
            connect_timeout: Duration::from_secs(10),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Check the configuration for values the client cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::Invalid("no channels configured".to_string()));
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.as_str().is_empty() {
                return Err(ConfigError::Invalid("empty channel name".to_string()));
            }
            if !seen.insert(channel) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate channel: {}",
                    channel
                )));
            }
        }

        if self.mode == ConnectionMode::PerChannel && !self.address.has_placeholder() {
            return Err(ConfigError::Invalid(format!(
                "address {} has no {} placeholder",
                self.address,
                AddressTemplate::PLACEHOLDER
            )));
        }

        if self.max_frame_size == 0 {
            return Err(ConfigError::Invalid("max_frame_size must be positive".to_string()));
        }

        self.reconnect.backoff.validate()
    }
}

/// Reconnection policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Whether dropped connections are re-established
    pub enabled: bool,

    /// Attempts per endpoint before giving up; reset once the endpoint opens
    pub max_attempts: u32,

    /// Delay schedule between attempts
    pub backoff: BackoffConfig,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_attempts: 5,
            backoff: BackoffConfig::default(),
        }
    }
}

/// Exponential backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Initial delay
    #[serde(with = "duration_millis")]
    pub initial: Duration,

    /// Maximum delay
    #[serde(with = "duration_millis")]
    pub max: Duration,

    /// Multiplier for each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: 0.25,
        }
    }
}

impl BackoffConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        // NaN fails the range check too
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(ConfigError::Invalid(format!(
                "backoff jitter {} outside 0.0..=1.0",
                self.jitter
            )));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "backoff multiplier {} must be finite and at least 1.0",
                self.multiplier
            )));
        }
        if self.initial > self.max {
            return Err(ConfigError::Invalid(format!(
                "backoff initial delay {:?} exceeds max {:?}",
                self.initial, self.max
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ClientConfig::default();
        config.validate().unwrap();
        assert_eq!(config.mode, ConnectionMode::PerChannel);
        assert_eq!(config.channels.len(), 3);
        assert!(!config.reconnect.enabled);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str(
            r#"
            address = "ws://debug.local:4000/{channel}"
            channels = ["log", "rcon"]

            [reconnect]
            enabled = true

            [reconnect.backoff]
            initial = 100
            "#,
        )
        .unwrap();

        config.validate().unwrap();
        assert_eq!(config.address.resolve("log"), "ws://debug.local:4000/log");
        assert_eq!(config.channels, vec![ChannelName::from("log"), ChannelName::from("rcon")]);
        assert!(config.reconnect.enabled);
        assert_eq!(config.reconnect.max_attempts, 5);
        assert_eq!(config.reconnect.backoff.initial, Duration::from_millis(100));
        assert_eq!(config.reconnect.backoff.max, Duration::from_secs(30));
    }

    #[test]
    fn test_shared_mode_from_toml() {
        let config: ClientConfig = toml::from_str(
            r#"
            address = "ws://debug.local:4000/"
            mode = "shared"
            "#,
        )
        .unwrap();
        assert_eq!(config.mode, ConnectionMode::Shared);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_missing_placeholder() {
        let config = ClientConfig {
            address: AddressTemplate::new("ws://localhost:32081/"),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_duplicate_channels() {
        let config = ClientConfig {
            channels: vec!["log".into(), "log".into()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate channel: log"));
    }

    #[test]
    fn test_rejects_empty_channels() {
        let config = ClientConfig {
            channels: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_jitter() {
        let mut config = ClientConfig::default();
        config.reconnect.backoff.jitter = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_non_finite_backoff() {
        for multiplier in [f64::NAN, f64::INFINITY, 0.5] {
            let mut config = ClientConfig::default();
            config.reconnect.backoff.multiplier = multiplier;
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "multiplier {} accepted",
                multiplier
            );
        }

        let mut config = ClientConfig::default();
        config.reconnect.backoff.jitter = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_accepts_large_finite_multiplier() {
        let mut config = ClientConfig::default();
        config.reconnect.backoff.multiplier = 1e300;
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_initial_above_max() {
        let mut config = ClientConfig::default();
        config.reconnect.backoff.initial = Duration::from_secs(60);
        config.reconnect.backoff.max = Duration::from_secs(1);
        assert!(config.validate().is_err());
    }
}
