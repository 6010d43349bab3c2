//! Configuration settings structures
//!
//! The root [`Config`] maps one-to-one onto the TOML file. Every section has
//! defaults, so an empty file is a valid configuration.

use crate::error::ConfigError;
use crate::plugin::PluginSettings;
use grant_correlator::{CorrelatorConfig, GrantRule, GroupGrantPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct Config {
    /// Pending-resolution timeout and sweeping
    #[serde(default)]
    pub correlator: CorrelatorSettings,
    /// Server group to channel group rules
    #[serde(default)]
    pub policy: PolicySettings,
    /// Optional logging configuration
    pub logging: Option<LoggingSettings>,
}

/// Correlator tuning
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CorrelatorSettings {
    /// Seconds a resolution may stay unanswered before it is dropped
    ///
    /// Leave unset to keep pending resolutions until answered.
    pub pending_timeout_secs: Option<u64>,

    /// How often the sweeper looks for stale resolutions, in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval() -> u64 {
    5
}

impl Default for CorrelatorSettings {
    fn default() -> Self {
        Self {
            pending_timeout_secs: Some(60),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Grant policy table
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PolicySettings {
    #[serde(default)]
    pub rules: Vec<GrantRule>,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            rules: GroupGrantPolicy::reference().rules(),
        }
    }
}

/// Logging system configuration
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoggingSettings {
    /// Valid values: "trace", "debug", "info", "warn", "error"
    pub level: String,

    /// Enable JSON-formatted log output
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Checks cross-field constraints and builds the policy table.
    pub fn build_policy(&self) -> Result<GroupGrantPolicy, ConfigError> {
        Ok(GroupGrantPolicy::from_rules(self.policy.rules.iter().copied())?)
    }

    pub fn plugin_settings(&self) -> Result<PluginSettings, ConfigError> {
        let pending_timeout = match self.correlator.pending_timeout_secs {
            Some(0) => return Err(ConfigError::ZeroPendingTimeout),
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };
        if self.correlator.sweep_interval_secs == 0 {
            return Err(ConfigError::ZeroSweepInterval);
        }

        Ok(PluginSettings {
            correlator: CorrelatorConfig { pending_timeout },
            sweep_interval: Duration::from_secs(self.correlator.sweep_interval_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grant_correlator::{ChannelGroupId, ChannelId, ServerGroupId};

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.correlator.pending_timeout_secs, Some(60));
        assert_eq!(config.correlator.sweep_interval_secs, 5);
        assert_eq!(config.policy.rules.len(), 1);
        assert_eq!(config.policy.rules[0].server_group, ServerGroupId(27));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            logging: Some(LoggingSettings::default()),
            ..Default::default()
        };
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.correlator, deserialized.correlator);
        assert_eq!(config.policy, deserialized.policy);
        assert_eq!(deserialized.logging.unwrap().level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
[correlator]
sweep_interval_secs = 2

[[policy.rules]]
server_group = 27
channel_group = 13
channel = 19

[[policy.rules]]
server_group = 31
channel_group = 8
channel = 4

[logging]
level = "debug"
json_format = true
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.correlator.pending_timeout_secs, None);
        assert_eq!(config.correlator.sweep_interval_secs, 2);

        let policy = config.build_policy().unwrap();
        assert_eq!(policy.len(), 2);
        let target = policy.lookup(ServerGroupId(31)).unwrap();
        assert_eq!(target.channel_group, ChannelGroupId(8));
        assert_eq!(target.channel, ChannelId(4));

        let settings = config.plugin_settings().unwrap();
        assert_eq!(settings.correlator.pending_timeout, None);
        assert_eq!(settings.sweep_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.correlator, CorrelatorSettings::default());
        assert_eq!(config.policy, PolicySettings::default());
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_duplicate_rules_rejected() {
        let toml_str = r#"
[[policy.rules]]
server_group = 27
channel_group = 13
channel = 19

[[policy.rules]]
server_group = 27
channel_group = 1
channel = 1
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(matches!(config.build_policy(), Err(ConfigError::Policy(_))));
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = Config::default();
        config.correlator.sweep_interval_secs = 0;
        assert!(matches!(config.plugin_settings(), Err(ConfigError::ZeroSweepInterval)));

        let mut config = Config::default();
        config.correlator.pending_timeout_secs = Some(0);
        assert!(matches!(config.plugin_settings(), Err(ConfigError::ZeroPendingTimeout)));
    }
}
