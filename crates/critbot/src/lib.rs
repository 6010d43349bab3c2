//! # CriticalBot
//!
//! Utility plugin for The Crimson Tempest. When a member joins a configured
//! server group (by default the thief group, 27), CriticalBot grants them a
//! channel group in a channel (by default the officers' room team group).
//!
//! The grant logic lives in [`grant_correlator`]; this crate adds the host
//! side around it:
//!
//! * [`plugin`] - identification, lifecycle, console commands, sweeper
//! * [`host`] - JSON-lines bridge to the voice-chat client's callbacks
//! * [`config`] - TOML configuration and command-line arguments
//! * [`logging`] - tracing subscriber setup
//! * [`signals`] - graceful shutdown

pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod plugin;
pub mod signals;

pub use error::{BridgeError, ConfigError, PluginError};
pub use host::{run_bridge, write_requests, ChannelHost, HostEvent, HostRequest};
pub use plugin::{CommandOutcome, CritBotPlugin, PluginInfo, PluginSettings};
