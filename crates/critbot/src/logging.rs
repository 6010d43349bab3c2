//! Logging system setup
//!
//! Logs go to stderr; stdout is reserved for host requests.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Args, LoggingSettings};

/// Picks the base filter level. `--debug` wins over the configured level.
pub fn log_level(args: &Args, settings: Option<&LoggingSettings>) -> String {
    if args.debug {
        "debug".to_string()
    } else {
        settings
            .map(|s| s.level.clone())
            .unwrap_or_else(|| "info".to_string())
    }
}

/// Initialize the logging system
///
/// `RUST_LOG` overrides the level chosen from arguments and configuration.
/// JSON output is used when either `--json-logs` or `json_format` asks for it.
pub fn setup_logging(args: &Args, settings: Option<&LoggingSettings>) -> Result<()> {
    let level = log_level(args, settings);
    let json_format = args.json_logs || settings.map(|s| s.json_format).unwrap_or(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if json_format {
        registry
            .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    result.map_err(|e| anyhow!("failed to initialize logging: {}", e))
}
