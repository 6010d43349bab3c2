//! JSON-lines host bridge
//!
//! Stands in for the client's native callback interface. Each inbound line is
//! one host callback:
//!
//! ```json
//! {"event": "server_group_client_added", "data": {"connection": 1, "client_id": 5, ...}}
//! {"event": "client_dbid_from_uid", "data": {"connection": 1, "client_unique_identity": "UID-A", "database_id": 9001}}
//! {"event": "command", "data": {"connection": 1, "command": "stats"}}
//! ```
//!
//! Requests the plugin makes of the host are written back one per line:
//!
//! ```json
//! {"request": "request_client_dbid_from_uid", "data": {...}}
//! {"request": "request_set_client_channel_group", "data": {...}}
//! {"request": "command_reply", "data": {...}}
//! ```

use crate::error::{BridgeError, BridgeResult};
use crate::plugin::{CommandOutcome, CritBotPlugin};
use async_trait::async_trait;
use grant_correlator::{
    ChannelGroupGrant, ClientChannelGroupChanged, CollaboratorError, CollaboratorResult,
    ConnectionHandle, DatabaseIdResolved, GroupManagementSink, IdentityResolver, ResolveRequest,
    ServerGroupClientAdded, ServerGroupClientDeleted,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Default capacity of the outbound request queue.
pub const REQUEST_QUEUE_CAPACITY: usize = 1024;

/// A console command routed to the plugin keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleCommand {
    pub connection: ConnectionHandle,
    pub command: String,
}

/// Inbound host callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum HostEvent {
    ServerGroupClientAdded(ServerGroupClientAdded),
    ServerGroupClientDeleted(ServerGroupClientDeleted),
    ClientChannelGroupChanged(ClientChannelGroupChanged),
    #[serde(rename = "client_dbid_from_uid")]
    ClientDbIdFromUid(DatabaseIdResolved),
    Command(ConsoleCommand),
}

/// Reply to a console command. `handled: false` tells the host to try elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReply {
    pub connection: ConnectionHandle,
    pub handled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
}

/// Outbound request to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", content = "data", rename_all = "snake_case")]
pub enum HostRequest {
    #[serde(rename = "request_client_dbid_from_uid")]
    RequestClientDbIdFromUid(ResolveRequest),
    RequestSetClientChannelGroup(ChannelGroupGrant),
    CommandReply(CommandReply),
}

/// Collaborator that forwards resolve and grant requests to the host queue.
#[derive(Debug, Clone)]
pub struct ChannelHost {
    requests: mpsc::Sender<HostRequest>,
}

impl ChannelHost {
    pub fn new(requests: mpsc::Sender<HostRequest>) -> Self {
        Self { requests }
    }

    async fn submit(&self, request: HostRequest) -> CollaboratorResult<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| CollaboratorError::Disconnected)
    }
}

#[async_trait]
impl IdentityResolver for ChannelHost {
    async fn resolve_database_id(&self, request: &ResolveRequest) -> CollaboratorResult<()> {
        self.submit(HostRequest::RequestClientDbIdFromUid(request.clone())).await
    }
}

#[async_trait]
impl GroupManagementSink for ChannelHost {
    async fn set_client_channel_group(&self, grant: &ChannelGroupGrant) -> CollaboratorResult<()> {
        self.submit(HostRequest::RequestSetClientChannelGroup(grant.clone())).await
    }
}

/// Counters reported when the bridge stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeSummary {
    pub lines: u64,
    pub dispatched: u64,
    pub malformed: u64,
}

/// Routes one host callback to the plugin.
pub async fn dispatch(
    plugin: &CritBotPlugin,
    event: HostEvent,
    replies: &mpsc::Sender<HostRequest>,
) {
    match event {
        HostEvent::ServerGroupClientAdded(event) => {
            plugin.on_server_group_client_added(&event).await;
        }
        HostEvent::ServerGroupClientDeleted(event) => {
            plugin.on_server_group_client_deleted(&event);
        }
        HostEvent::ClientChannelGroupChanged(event) => {
            plugin.on_client_channel_group_changed(&event);
        }
        HostEvent::ClientDbIdFromUid(event) => {
            plugin.on_client_dbid_from_uid(&event).await;
        }
        HostEvent::Command(command) => {
            let reply = match plugin.process_command(command.connection, &command.command) {
                CommandOutcome::Handled(reply) => CommandReply {
                    connection: command.connection,
                    handled: true,
                    reply: Some(reply),
                },
                CommandOutcome::NotHandled => CommandReply {
                    connection: command.connection,
                    handled: false,
                    reply: None,
                },
            };
            if replies.send(HostRequest::CommandReply(reply)).await.is_err() {
                warn!("Request queue closed, dropping command reply");
            }
        }
    }
}

/// Reads host callbacks from `input` until EOF or `shutdown` fires.
///
/// Lines that fail to parse are logged and skipped.
pub async fn run_bridge<R>(
    plugin: &CritBotPlugin,
    input: R,
    replies: mpsc::Sender<HostRequest>,
    mut shutdown: oneshot::Receiver<()>,
) -> BridgeResult<BridgeSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = BridgeSummary::default();
    let mut lines = input.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.map_err(BridgeError::Read)?,
            _ = &mut shutdown => {
                info!("Shutdown requested, closing host bridge");
                break;
            }
        };

        let Some(line) = line else {
            debug!("Host input closed");
            break;
        };
        summary.lines += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<HostEvent>(trimmed) {
            Ok(event) => {
                dispatch(plugin, event, &replies).await;
                summary.dispatched += 1;
            }
            Err(e) => {
                warn!(line = summary.lines, error = %e, "Skipping malformed host message");
                summary.malformed += 1;
            }
        }
    }

    Ok(summary)
}

/// Writes queued host requests to `out`, one JSON document per line.
///
/// Returns once every sender has been dropped.
pub async fn write_requests<W>(
    mut requests: mpsc::Receiver<HostRequest>,
    mut out: W,
) -> BridgeResult<u64>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0;
    while let Some(request) = requests.recv().await {
        let mut line = serde_json::to_vec(&request)?;
        line.push(b'\n');
        out.write_all(&line).await.map_err(BridgeError::Write)?;
        out.flush().await.map_err(BridgeError::Write)?;
        written += 1;
    }
    Ok(written)
}
