//! Control plane & relay (§4.E): the daemon's own IPC listener at
//! `daemon.sock`, serving status/peer-admin/list/relay/subscribe to local
//! clients and fanning out daemon events.

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::wire::{ErrorFrame, FrameError, FrameReader, ResponseFrame};

use super::protocol::{ControlRequest, ControlRequestEnvelope, PeerSummary, StatusReport, TaggedSessionInfo};
use super::relay::{self, RelayRequest};
use super::state::PeerStatus;
use super::Daemon;

const LOCAL_REQUESTER_KEY: &str = "local";

/// Signal returned by the connection handler so the accept loop (and
/// ultimately `run::serve`) can tell the main daemon to shut down after a
/// `kill` request.
pub enum ConnectionOutcome {
    Continue,
    Shutdown,
}

/// Binds `daemon.sock` (mode 0600) and serves control-plane connections
/// until a `kill` request arrives.
pub async fn listen(daemon: Daemon) -> Result<()> {
    let socket_path = daemon.control_dir.daemon_socket_path();
    if socket_path.exists() {
        let _ = std::fs::remove_file(&socket_path);
    }
    let listener = UnixListener::bind(&socket_path)
        .with_context(|| format!("failed to bind daemon socket {}", socket_path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))
            .context("failed to chmod daemon socket")?;
    }
    info!(path = %socket_path.display(), "control plane listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let daemon = daemon.clone();
        tokio::spawn(async move {
            match handle_connection(daemon.clone(), stream).await {
                Ok(ConnectionOutcome::Shutdown) => daemon.request_shutdown(),
                Ok(ConnectionOutcome::Continue) => {}
                Err(e) => debug!(error = %e, "control connection ended"),
            }
        });
    }
}

async fn handle_connection(daemon: Daemon, stream: UnixStream) -> Result<ConnectionOutcome> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = FrameReader::new(read_half);
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        use tokio::io::AsyncWriteExt;
        while let Some(line) = rx.recv().await {
            if write_half.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let mut subscriber_id: Option<u64> = None;
    let mut outcome = ConnectionOutcome::Continue;

    loop {
        let frame = match reader.next_frame().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(FrameError::TooLarge) => {
                let _ = tx.send(ErrorFrame::size_exceeded().to_line());
                break;
            }
            Err(FrameError::Io(_)) => break,
        };

        daemon.mark_activity().await;

        let envelope: ControlRequestEnvelope = match serde_json::from_str(&frame) {
            Ok(e) => e,
            Err(e) => {
                let _ = tx.send(ResponseFrame::err("unknown", format!("invalid request: {e}"), None).to_line());
                continue;
            }
        };

        let command_name = envelope.request.name();
        let id = envelope.id.clone();

        if matches!(envelope.request, ControlRequest::Subscribe {}) {
            let sub_id = daemon.state.lock().await.add_subscriber(tx.clone());
            subscriber_id = Some(sub_id);
            let _ = tx.send(ResponseFrame::ok(command_name, Some(json!({"subscribed": true})), id).to_line());
            continue;
        }

        if matches!(envelope.request, ControlRequest::Kill) {
            let _ = tx.send(ResponseFrame::ok(command_name, None, id).to_line());
            outcome = ConnectionOutcome::Shutdown;
            break;
        }

        let response = dispatch(&daemon, envelope.request, id.clone()).await;
        let _ = tx.send(response.to_line());
    }

    if let Some(sub_id) = subscriber_id {
        daemon.state.lock().await.remove_subscriber(sub_id);
    }
    drop(tx);
    let _ = writer_task.await;
    Ok(outcome)
}

async fn dispatch(daemon: &Daemon, request: ControlRequest, id: Option<String>) -> ResponseFrame {
    let command_name = request.name();
    match request {
        ControlRequest::Status => {
            let report = build_status(daemon).await;
            ResponseFrame::ok(command_name, Some(serde_json::to_value(report).expect("status serializes")), id)
        }
        ControlRequest::AddPeer { host, port } => handle_add_peer(daemon, command_name, host, port, id).await,
        ControlRequest::RemovePeer { host } => handle_remove_peer(daemon, command_name, host, id).await,
        ControlRequest::ListSessions => {
            let sessions = list_sessions(daemon).await;
            ResponseFrame::ok(command_name, Some(json!({ "sessions": sessions })), id)
        }
        ControlRequest::ListTailscale => handle_list_tailscale(command_name, id).await,
        ControlRequest::Relay {
            target_session_id,
            rpc_command,
            request_id,
            fire_and_forget,
        } => handle_relay(daemon, command_name, target_session_id, rpc_command, request_id, fire_and_forget, id).await,
        ControlRequest::Subscribe {} | ControlRequest::Kill => {
            unreachable!("handled before dispatch")
        }
    }
}

async fn build_status(daemon: &Daemon) -> StatusReport {
    let state = daemon.state.lock().await;
    let peers: Vec<PeerSummary> = state
        .peers
        .values()
        .map(|p| PeerSummary {
            host: p.host.clone(),
            port: p.port,
            status: p.status.as_str().to_string(),
            session_count: p.sessions.len(),
        })
        .collect();
    StatusReport {
        pid: std::process::id(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        port: state.port,
        local_session_count: state.local_sessions.len(),
        connected_peer_count: peers.iter().filter(|p| p.status == "open").count(),
        peers,
    }
}

async fn handle_add_peer(
    daemon: &Daemon,
    command_name: &'static str,
    host: String,
    port: Option<u16>,
    id: Option<String>,
) -> ResponseFrame {
    let port = port.unwrap_or(crate::config::DEFAULT_PORT);

    let already_open = {
        let state = daemon.state.lock().await;
        state.peers.get(&host).map(|p| p.status == PeerStatus::Open).unwrap_or(false)
    };
    if already_open {
        return ResponseFrame::err(command_name, format!("peer {host} is already connected"), id);
    }

    match super::federation::add_peer(daemon, host.clone(), port).await {
        Ok(()) => {
            let address = format!("{host}:{port}");
            let path = daemon.control_dir.config_path();
            let mut config = daemon.config.lock().await;
            if let Err(e) = config.add_peer(&path, &address) {
                debug!(error = %e, "failed to persist new peer to config");
            }
            daemon.mark_activity().await;
            ResponseFrame::ok(command_name, Some(json!({ "host": host, "port": port })), id)
        }
        Err(e) => ResponseFrame::err(command_name, e, id),
    }
}

async fn handle_remove_peer(daemon: &Daemon, command_name: &'static str, host: String, id: Option<String>) -> ResponseFrame {
    let existed = super::federation::remove_peer(daemon, &host).await;
    if existed {
        let path = daemon.control_dir.config_path();
        let mut config = daemon.config.lock().await;
        let matching: Vec<String> = config
            .peers
            .iter()
            .filter(|p| crate::config::parse_peer_address(p).0 == host)
            .cloned()
            .collect();
        for address in matching {
            if let Err(e) = config.remove_peer(&path, &address) {
                debug!(error = %e, "failed to remove peer from config");
            }
        }
    }
    ResponseFrame::ok(command_name, Some(json!({ "removed": existed })), id)
}

async fn list_sessions(daemon: &Daemon) -> Vec<TaggedSessionInfo> {
    let state = daemon.state.lock().await;
    let mut sessions: Vec<TaggedSessionInfo> = state
        .local_sessions
        .values()
        .map(|info| TaggedSessionInfo {
            session_id: info.session_id.clone(),
            name: info.name.clone(),
            aliases: info.aliases.clone(),
            host: state.hostname.clone(),
            is_remote: false,
        })
        .collect();
    for peer in state.peers.values() {
        if peer.status != PeerStatus::Open {
            continue;
        }
        for info in peer.sessions.values() {
            sessions.push(TaggedSessionInfo {
                session_id: info.session_id.clone(),
                name: info.name.clone(),
                aliases: info.aliases.clone(),
                host: peer.host.clone(),
                is_remote: true,
            });
        }
    }
    sessions
}

/// Convenience passthrough to the external Tailscale CLI (§4.E). Fails
/// cleanly — `success:false`, never a crash — if the tool isn't installed.
async fn handle_list_tailscale(command_name: &'static str, id: Option<String>) -> ResponseFrame {
    let output = match tokio::process::Command::new("tailscale").args(["status", "--json"]).output().await {
        Ok(o) => o,
        Err(e) => return ResponseFrame::err(command_name, format!("tailscale CLI unavailable: {e}"), id),
    };
    if !output.status.success() {
        return ResponseFrame::err(command_name, "tailscale status exited with a non-zero status", id);
    }
    let parsed: Value = match serde_json::from_slice(&output.stdout) {
        Ok(v) => v,
        Err(e) => return ResponseFrame::err(command_name, format!("failed to parse tailscale output: {e}"), id),
    };
    let mut peers = Vec::new();
    if let Some(map) = parsed.get("Peer").and_then(Value::as_object) {
        for entry in map.values() {
            let hostname = entry.get("HostName").and_then(Value::as_str).unwrap_or_default();
            let ip = entry
                .get("TailscaleIPs")
                .and_then(Value::as_array)
                .and_then(|ips| ips.first())
                .and_then(Value::as_str)
                .unwrap_or_default();
            if !hostname.is_empty() && !ip.is_empty() {
                peers.push(json!({ "hostname": hostname, "ip": ip }));
            }
        }
    }
    ResponseFrame::ok(command_name, Some(json!({ "peers": peers })), id)
}

#[allow(clippy::too_many_arguments)]
async fn handle_relay(
    daemon: &Daemon,
    command_name: &'static str,
    target_session_id: String,
    rpc_command: Value,
    request_id: String,
    fire_and_forget: bool,
    id: Option<String>,
) -> ResponseFrame {
    if crate::naming::validate_safe_id(&target_session_id).is_err() {
        return ResponseFrame::err(command_name, "invalid target session id", id);
    }

    let outcome = relay::relay(
        daemon,
        LOCAL_REQUESTER_KEY,
        RelayRequest {
            target_session_id,
            command: rpc_command,
            request_id: request_id.clone(),
            fire_and_forget,
        },
    )
    .await;

    if outcome.success {
        ResponseFrame::ok(
            command_name,
            Some(json!({ "requestId": request_id, "response": outcome.response })),
            id,
        )
    } else {
        ResponseFrame::err(command_name, outcome.error.unwrap_or_else(|| "relay failed".into()), id)
    }
}

/// Shared by thin-client subcommands (§6 Command-line surface): connects to
/// `daemon.sock`, writes one request, reads the single matching response.
pub async fn send_request(socket_path: &std::path::Path, request: &Value) -> Result<Value> {
    use tokio::io::AsyncWriteExt;
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("failed to connect to {}", socket_path.display()))?;
    let (read_half, mut write_half) = stream.into_split();
    write_half
        .write_all(format!("{request}\n").as_bytes())
        .await
        .context("failed to write request")?;
    let mut reader = FrameReader::new(read_half);
    match reader.next_frame().await {
        Ok(Some(line)) => serde_json::from_str(&line).context("failed to parse daemon response"),
        Ok(None) => anyhow::bail!("daemon closed the connection without responding"),
        Err(e) => anyhow::bail!("daemon response error: {e}"),
    }
}

/// Subscribes and prints every event frame until the connection closes or
/// `Ctrl-C` is pressed; used by the `subscribe` thin-client subcommand.
pub async fn stream_subscription(socket_path: &std::path::Path) -> Result<()> {
    use tokio::io::AsyncWriteExt;
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("failed to connect to {}", socket_path.display()))?;
    let (read_half, mut write_half) = stream.into_split();
    write_half
        .write_all(b"{\"type\":\"subscribe\"}\n")
        .await
        .context("failed to write subscribe request")?;
    let mut reader = FrameReader::new(read_half);
    reader.next_frame().await.context("no confirmation from daemon")?;
    loop {
        match reader.next_frame().await {
            Ok(Some(line)) => println!("{line}"),
            Ok(None) => return Ok(()),
            Err(e) => anyhow::bail!("subscription stream error: {e}"),
        }
    }
}

#[cfg(test)]
#[path = "tests/control_tests.rs"]
mod control_tests;
