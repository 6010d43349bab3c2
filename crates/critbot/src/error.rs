//! Error types for the host side of CriticalBot.

use grant_correlator::PolicyError;
use std::io::Error as IoError;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid grant policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,

    #[error("pending_timeout_secs must be greater than zero when set")]
    ZeroPendingTimeout,
}

/// Plugin lifecycle errors
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Plugin already initialized")]
    AlreadyInitialized,
}

/// Host bridge errors
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Failed to read host input: {0}")]
    Read(IoError),

    #[error("Failed to write host request: {0}")]
    Write(IoError),

    #[error("Failed to encode host request: {0}")]
    Encode(#[from] serde_json::Error),
}

pub type PluginResult<T> = Result<T, PluginError>;
pub type BridgeResult<T> = Result<T, BridgeError>;
