//! Host bridge sessions driven through JSON lines.

use critbot::host::{run_bridge, ChannelHost, HostRequest};
use critbot::plugin::{CritBotPlugin, PluginSettings};
use grant_correlator::{
    ChannelGroupId, ChannelId, ConnectionHandle, DatabaseId, GroupGrantPolicy,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

fn plugin_with(tx: &mpsc::Sender<HostRequest>) -> CritBotPlugin {
    let host = Arc::new(ChannelHost::new(tx.clone()));
    CritBotPlugin::new(
        Arc::new(GroupGrantPolicy::reference()),
        host.clone(),
        host,
        PluginSettings::default(),
    )
}

fn drain(rx: &mut mpsc::Receiver<HostRequest>) -> Vec<HostRequest> {
    let mut out = Vec::new();
    while let Ok(request) = rx.try_recv() {
        out.push(request);
    }
    out
}

#[tokio::test]
async fn test_reference_session() {
    let (tx, mut rx) = mpsc::channel(64);
    let mut plugin = plugin_with(&tx);
    plugin.init().await.unwrap();

    let input = concat!(
        r#"{"event":"server_group_client_added","data":{"connection":1,"client_id":5,"client_name":"Alice","client_unique_identity":"UID-A","server_group":27,"invoker":{"id":2,"name":"Admin","unique_identity":"UID-ADMIN"}}}"#,
        "\n",
        r#"{"event":"client_channel_group_changed","data":{"connection":1,"channel_group":8,"channel":3,"client_id":6}}"#,
        "\n",
        r#"{"event":"client_dbid_from_uid","data":{"connection":1,"client_unique_identity":"UID-A","database_id":9001}}"#,
        "\n",
    );

    let (_stop, shutdown) = oneshot::channel();
    let summary = run_bridge(&plugin, input.as_bytes(), tx.clone(), shutdown)
        .await
        .unwrap();
    assert_eq!(summary.dispatched, 3);
    assert_eq!(summary.malformed, 0);

    let requests = drain(&mut rx);
    assert_eq!(requests.len(), 2);

    let token = match &requests[0] {
        HostRequest::RequestClientDbIdFromUid(request) => {
            assert_eq!(request.connection, ConnectionHandle(1));
            assert_eq!(request.client_unique_identity, "UID-A");
            request.token
        }
        other => panic!("expected resolve request, got {:?}", other),
    };

    match &requests[1] {
        HostRequest::RequestSetClientChannelGroup(grant) => {
            assert_eq!(grant.connection, ConnectionHandle(1));
            assert_eq!(grant.channel_group, ChannelGroupId(13));
            assert_eq!(grant.channel, ChannelId(19));
            assert_eq!(grant.database_id, DatabaseId(9001));
            assert_eq!(grant.token, token);
        }
        other => panic!("expected grant request, got {:?}", other),
    }

    assert!(plugin.correlator().pending().is_empty());
    plugin.shutdown().await;
}

#[tokio::test]
async fn test_malformed_and_blank_lines_are_skipped() {
    let (tx, mut rx) = mpsc::channel(64);
    let plugin = plugin_with(&tx);

    let input = concat!(
        "not json\n",
        "\n",
        r#"{"event":"unknown_event","data":{}}"#,
        "\n",
        r#"{"event":"server_group_client_added","data":{"connection":1,"client_id":5,"client_unique_identity":"UID-A","server_group":99}}"#,
        "\n",
    );

    let (_stop, shutdown) = oneshot::channel();
    let summary = run_bridge(&plugin, input.as_bytes(), tx.clone(), shutdown)
        .await
        .unwrap();

    assert_eq!(summary.lines, 4);
    assert_eq!(summary.malformed, 2);
    assert_eq!(summary.dispatched, 1);
    assert!(drain(&mut rx).is_empty());
    assert_eq!(plugin.correlator().stats().policy_misses, 1);
}

#[tokio::test]
async fn test_console_commands_reply() {
    let (tx, mut rx) = mpsc::channel(64);
    let plugin = plugin_with(&tx);

    let input = concat!(
        r#"{"event":"command","data":{"connection":4,"command":"help"}}"#,
        "\n",
        r#"{"event":"command","data":{"connection":4,"command":"teleport home"}}"#,
        "\n",
    );

    let (_stop, shutdown) = oneshot::channel();
    run_bridge(&plugin, input.as_bytes(), tx.clone(), shutdown)
        .await
        .unwrap();

    let requests = drain(&mut rx);
    assert_eq!(requests.len(), 2);
    match &requests[0] {
        HostRequest::CommandReply(reply) => {
            assert!(reply.handled);
            assert!(reply.reply.as_deref().unwrap().contains("stats"));
        }
        other => panic!("expected command reply, got {:?}", other),
    }
    match &requests[1] {
        HostRequest::CommandReply(reply) => {
            assert_eq!(reply.connection, ConnectionHandle(4));
            assert!(!reply.handled);
            assert!(reply.reply.is_none());
        }
        other => panic!("expected command reply, got {:?}", other),
    }
}

#[tokio::test]
async fn test_shutdown_signal_stops_bridge() {
    let (tx, _rx) = mpsc::channel(64);
    let plugin = plugin_with(&tx);

    // A reader that never yields a line.
    let (_writer, reader) = tokio::io::duplex(64);
    let reader = tokio::io::BufReader::new(reader);

    let (stop, shutdown) = oneshot::channel();
    stop.send(()).unwrap();

    let summary = run_bridge(&plugin, reader, tx.clone(), shutdown).await.unwrap();
    assert_eq!(summary.lines, 0);
}
