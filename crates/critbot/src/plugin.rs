//! CriticalBot plugin lifecycle
//!
//! Wraps the [`GroupGrantCorrelator`] in the lifecycle a voice-chat client
//! expects from a plugin:
//!
//! 1. **Identification** - name, version, author, description, API version
//! 2. **Registration** - the host hands over a plugin id to keep
//! 3. **Initialization** - [`CritBotPlugin::init`] starts the stale-entry sweeper
//! 4. **Operation** - host callbacks are forwarded to the correlator
//! 5. **Shutdown** - [`CritBotPlugin::shutdown`] stops the sweeper and drops
//!    in-flight correlations
//!
//! Console commands addressed to the [`COMMAND_KEYWORD`] are answered by
//! [`CritBotPlugin::process_command`].

use crate::error::{PluginError, PluginResult};
use grant_correlator::{
    ClientChannelGroupChanged, ConnectionHandle, CorrelatorConfig, DatabaseIdResolved,
    GroupGrantCorrelator, GroupGrantPolicy, GroupManagementSink, IdentityResolver,
    ServerGroupClientAdded, ServerGroupClientDeleted,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Plugin API major version this plugin is built against.
pub const API_VERSION: u32 = 19;

/// Console keyword routed to this plugin.
pub const COMMAND_KEYWORD: &str = "critbot";

/// Static plugin identification.
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub author: &'static str,
    pub description: &'static str,
    pub api_version: u32,
    pub command_keyword: &'static str,
}

impl PluginInfo {
    pub const fn current() -> Self {
        Self {
            name: "CriticalBot",
            version: env!("CARGO_PKG_VERSION"),
            author: "Skryttlock, Skutov",
            description: "Utility plugin for The Crimson Tempest [CriT].",
            api_version: API_VERSION,
            command_keyword: COMMAND_KEYWORD,
        }
    }

    /// The plugin never asks the host to load it automatically.
    pub fn requests_autoload(&self) -> bool {
        false
    }
}

/// Result of a console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Handled(String),
    NotHandled,
}

/// Settings for the correlator and its sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSettings {
    pub correlator: CorrelatorConfig,
    pub sweep_interval: Duration,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            correlator: CorrelatorConfig::default(),
            sweep_interval: Duration::from_secs(5),
        }
    }
}

struct Sweeper {
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub struct CritBotPlugin {
    info: PluginInfo,
    plugin_id: Option<String>,
    correlator: Arc<GroupGrantCorrelator>,
    sweep_interval: Duration,
    sweeper: Option<Sweeper>,
    initialized: bool,
}

impl CritBotPlugin {
    pub fn new(
        policy: Arc<GroupGrantPolicy>,
        resolver: Arc<dyn IdentityResolver>,
        sink: Arc<dyn GroupManagementSink>,
        settings: PluginSettings,
    ) -> Self {
        let correlator = GroupGrantCorrelator::new(policy, resolver, sink, settings.correlator);
        Self {
            info: PluginInfo::current(),
            plugin_id: None,
            correlator: Arc::new(correlator),
            sweep_interval: settings.sweep_interval,
            sweeper: None,
            initialized: false,
        }
    }

    pub fn info(&self) -> &PluginInfo {
        &self.info
    }

    /// Stores the id the host assigned to this plugin.
    pub fn register_plugin_id(&mut self, id: &str) {
        debug!(plugin_id = id, "Registered plugin id");
        self.plugin_id = Some(id.to_owned());
    }

    pub fn plugin_id(&self) -> Option<&str> {
        self.plugin_id.as_deref()
    }

    pub fn correlator(&self) -> &Arc<GroupGrantCorrelator> {
        &self.correlator
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Starts the plugin. Spawns the stale-entry sweeper when a timeout is configured.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn init(&mut self) -> PluginResult<()> {
        if self.initialized {
            return Err(PluginError::AlreadyInitialized);
        }

        if let Some(timeout) = self.correlator.config().pending_timeout {
            if self.sweep_interval.is_zero() {
                return Err(PluginError::InitializationFailed(
                    "sweep interval must be non-zero".to_string(),
                ));
            }
            self.sweeper = Some(spawn_sweeper(self.correlator.clone(), self.sweep_interval));
            info!(
                timeout_secs = timeout.as_secs(),
                sweep_interval_ms = self.sweep_interval.as_millis() as u64,
                "Stale resolution sweeper started"
            );
        }

        self.initialized = true;
        info!(
            "{} {} ready with {} grant rule(s)",
            self.info.name,
            self.info.version,
            self.correlator.policy().len()
        );
        Ok(())
    }

    /// Stops the sweeper and drops in-flight correlations.
    pub async fn shutdown(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            let _ = sweeper.stop.send(());
            if let Err(e) = sweeper.task.await {
                warn!(error = %e, "Sweeper task ended abnormally");
            }
        }

        let dropped = self.correlator.clear_pending();
        if dropped > 0 {
            warn!(dropped, "Dropping in-flight resolutions on shutdown");
        }

        let stats = self.correlator.stats();
        info!(
            grants_applied = stats.grants_applied,
            resolve_requests = stats.resolve_requests,
            stale_evictions = stats.stale_evictions,
            unknown_correlations = stats.unknown_correlations,
            "{} shut down",
            self.info.name
        );

        self.plugin_id = None;
        self.initialized = false;
    }

    pub async fn on_server_group_client_added(&self, event: &ServerGroupClientAdded) {
        self.correlator.on_membership_added(event).await;
    }

    pub async fn on_client_dbid_from_uid(&self, event: &DatabaseIdResolved) {
        self.correlator.on_identity_resolved(event).await;
    }

    pub fn on_server_group_client_deleted(&self, event: &ServerGroupClientDeleted) {
        self.correlator.on_membership_removed(event);
    }

    pub fn on_client_channel_group_changed(&self, event: &ClientChannelGroupChanged) {
        self.correlator.on_channel_group_changed(event);
    }

    /// Handles a console command addressed to [`COMMAND_KEYWORD`].
    ///
    /// The keyword itself has already been stripped by the host.
    pub fn process_command(&self, connection: ConnectionHandle, command: &str) -> CommandOutcome {
        let mut words = command.split_whitespace();
        let Some(verb) = words.next() else {
            return CommandOutcome::NotHandled;
        };
        debug!(%connection, verb, "Console command");

        match verb {
            "stats" => CommandOutcome::Handled(to_json(&self.correlator.stats())),
            "pending" => {
                let pending = self.correlator.pending_snapshot();
                CommandOutcome::Handled(to_json(&serde_json::json!({
                    "count": pending.len(),
                    "entries": pending,
                })))
            }
            "sweep" => {
                let evicted = self.correlator.evict_stale();
                CommandOutcome::Handled(format!("evicted {} stale resolution(s)", evicted))
            }
            "rules" => CommandOutcome::Handled(to_json(&self.correlator.policy().rules())),
            "help" => CommandOutcome::Handled(format!(
                "{} commands: stats, pending, rules, sweep, help",
                COMMAND_KEYWORD
            )),
            _ => CommandOutcome::NotHandled,
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}", e))
}

fn spawn_sweeper(correlator: Arc<GroupGrantCorrelator>, every: Duration) -> Sweeper {
    let (stop, mut stopped) = oneshot::channel();
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    correlator.evict_stale();
                }
                _ = &mut stopped => break,
            }
        }
    });
    Sweeper { stop, task }
}
