//! Configuration module for CriticalBot
//!
//! Handles command-line arguments and configuration file parsing.

pub mod args;
pub mod settings;

pub use args::Args;
pub use settings::{Config, CorrelatorSettings, LoggingSettings, PolicySettings};

use anyhow::Result;
use tracing::{info, warn};

/// Load configuration from file or create default configuration
///
/// If the file doesn't exist, a default configuration file is written and
/// the defaults are returned.
///
/// # Errors
/// * Returns error if file I/O operations fail
/// * Returns error if TOML parsing fails
pub async fn load_config(args: &Args) -> Result<Config> {
    if args.config.exists() {
        let config_str = tokio::fs::read_to_string(&args.config).await?;
        match toml::from_str::<Config>(&config_str) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to parse config file {}: {}", args.config.display(), e);
                Err(e.into())
            }
        }
    } else {
        warn!("Configuration file not found: {}, using defaults", args.config.display());

        let default_config = Config {
            logging: Some(LoggingSettings::default()),
            ..Default::default()
        };
        let config_str = toml::to_string_pretty(&default_config)?;
        tokio::fs::write(&args.config, config_str).await?;
        info!("Created default configuration file: {}", args.config.display());

        Ok(default_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grant_correlator::ServerGroupId;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_config_default() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args {
            config: dir.path().join("critbot.toml"),
            ..Default::default()
        };

        let config = load_config(&args).await.unwrap();
        assert_eq!(config.correlator.pending_timeout_secs, Some(60));
        assert!(args.config.exists());

        // The written default must load back identically.
        let reloaded = load_config(&args).await.unwrap();
        assert_eq!(reloaded.policy, config.policy);
        assert_eq!(reloaded.correlator, config.correlator);
    }

    #[tokio::test]
    async fn test_load_config_existing() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[correlator]
pending_timeout_secs = 15
sweep_interval_secs = 1

[[policy.rules]]
server_group = 40
channel_group = 2
channel = 7
        "#;
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let args = Args {
            config: temp_file.path().to_path_buf(),
            ..Default::default()
        };

        let config = load_config(&args).await.unwrap();
        assert_eq!(config.correlator.pending_timeout_secs, Some(15));
        assert_eq!(config.policy.rules[0].server_group, ServerGroupId(40));
    }

    #[tokio::test]
    async fn test_load_config_invalid() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[correlator\nbroken").unwrap();

        let args = Args {
            config: temp_file.path().to_path_buf(),
            ..Default::default()
        };
        assert!(load_config(&args).await.is_err());
    }
}
