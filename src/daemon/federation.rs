//! Peer federation (§4.D): the TCP listener, the outbound connector, and the
//! hello/heartbeat/delta protocol both directions speak once linked.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::session::SessionInfo;
use crate::wire::{FrameError, FrameReader};

use super::protocol::PeerFrame;
use super::relay::relay_to_local_endpoint;
use super::state::PeerStatus;
use super::Daemon;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Binds the peer TCP listener and serves inbound connections for the
/// lifetime of the daemon.
pub async fn listen(daemon: Daemon, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind peer TCP listener on port {port}"))?;
    info!(port, "peer federation listening");
    loop {
        let (stream, addr) = listener.accept().await?;
        debug!(%addr, "inbound peer connection");
        let daemon = daemon.clone();
        tokio::spawn(async move {
            run_link(daemon, String::new(), None, stream, false, 0).await;
        });
    }
}

/// Reconnects to every peer recorded in `config.json` at startup (§4.D
/// Config persistence: "Startup reconnects to every entry").
pub async fn reconnect_all(daemon: &Daemon, peers: &[String]) {
    for address in peers {
        let (host, port) = crate::config::parse_peer_address(address);
        connect_outbound(daemon.clone(), host, port);
    }
}

/// Spawns the outbound connection lifecycle for one peer (§4.D Connection
/// lifecycle (outbound)). Creates or reuses the peer entry, attempts to
/// connect, and on failure/disconnect schedules exactly one reconnect
/// attempt before giving up.
pub fn connect_outbound(daemon: Daemon, host: String, port: u16) {
    tokio::spawn(async move {
        outbound_attempt(daemon, host, port).await;
    });
}

/// `add_peer`'s synchronous half (§4.E): dials once with its own error
/// surfaced directly to the admin caller, then hands the link off to the
/// same lifecycle `connect_outbound` uses for ongoing reconnects.
pub async fn add_peer(daemon: &Daemon, host: String, port: u16) -> Result<(), String> {
    const ADD_PEER_BUDGET: Duration = Duration::from_secs(10);
    let deadline = tokio::time::Instant::now() + ADD_PEER_BUDGET;

    let generation = {
        let mut state = daemon.state.lock().await;
        let entry = state
            .peers
            .entry(host.clone())
            .or_insert_with(|| super::state::PeerEntry::new(host.clone(), port));
        entry.status = PeerStatus::Connecting;
        entry.removed = false;
        entry.port = port;
        entry.outbound_generation += 1;
        entry.outbound_generation
    };

    let stream = match tokio::time::timeout(ADD_PEER_BUDGET, TcpStream::connect((host.as_str(), port))).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            mark_connect_failed(&daemon, &host, generation).await;
            return Err(e.to_string());
        }
        Err(_) => {
            mark_connect_failed(&daemon, &host, generation).await;
            return Err(format!("connecting to {host}:{port} timed out"));
        }
    };

    let daemon_task = daemon.clone();
    let host_task = host.clone();
    tokio::spawn(async move {
        run_link(daemon_task, host_task, Some(port), stream, true, generation).await;
    });

    loop {
        let status = daemon.state.lock().await.peers.get(&host).map(|e| e.status);
        match status {
            Some(PeerStatus::Open) => return Ok(()),
            Some(PeerStatus::Closed) | Some(PeerStatus::GaveUp) | None => {
                return Err(format!("connection to {host}:{port} closed before the handshake completed"));
            }
            _ => {}
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(format!("timed out waiting for {host}:{port} to finish the peer handshake"));
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

async fn mark_connect_failed(daemon: &Daemon, host: &str, generation: u64) {
    let mut state = daemon.state.lock().await;
    if let Some(entry) = state.peers.get_mut(host) {
        if entry.outbound_generation == generation {
            entry.status = PeerStatus::GaveUp;
        }
    }
}

async fn outbound_attempt(daemon: Daemon, host: String, port: u16) {
    let generation = {
        let mut state = daemon.state.lock().await;
        let entry = state
            .peers
            .entry(host.clone())
            .or_insert_with(|| super::state::PeerEntry::new(host.clone(), port));
        entry.status = PeerStatus::Connecting;
        entry.removed = false;
        entry.port = port;
        entry.outbound_generation += 1;
        entry.outbound_generation
    };

    match TcpStream::connect((host.as_str(), port)).await {
        Ok(stream) => {
            run_link(daemon.clone(), host.clone(), Some(port), stream, true, generation).await;
        }
        Err(e) => {
            debug!(%host, port, error = %e, "outbound peer connect failed");
            schedule_reconnect_or_give_up(daemon, host, port, generation).await;
        }
    }
}

async fn schedule_reconnect_or_give_up(daemon: Daemon, host: String, port: u16, generation: u64) {
    let should_retry = {
        let mut state = daemon.state.lock().await;
        let Some(entry) = state.peers.get_mut(&host) else {
            return;
        };
        if entry.removed || entry.outbound_generation != generation {
            return;
        }
        if entry.reconnected_once {
            entry.status = PeerStatus::GaveUp;
            false
        } else {
            entry.reconnected_once = true;
            true
        }
    };

    if should_retry {
        tokio::time::sleep(RECONNECT_DELAY).await;
        let still_relevant = {
            let state = daemon.state.lock().await;
            state
                .peers
                .get(&host)
                .map(|e| !e.removed && e.outbound_generation == generation)
                .unwrap_or(false)
        };
        if still_relevant {
            connect_outbound(daemon, host, port);
        }
    } else {
        daemon.emit_peer_event("peer_gave_up", &host).await;
    }
}

/// `remove_peer` (§4.E): tears down a peer entry entirely — marks it
/// removed (suppressing any in-flight reconnect), kills its live link if
/// any, and announces `session_removed` for everything it was advertising.
pub async fn remove_peer(daemon: &Daemon, host: &str) -> bool {
    let (existed, sessions, kill_tx) = {
        let mut state = daemon.state.lock().await;
        match state.peers.get_mut(host) {
            Some(entry) => {
                entry.removed = true;
                entry.status = PeerStatus::Removed;
                let sessions: Vec<String> = entry.sessions.drain().map(|(id, _)| id).collect();
                let kill_tx = entry.kill_tx.take();
                entry.frame_tx = None;
                (true, sessions, kill_tx)
            }
            None => (false, Vec::new(), None),
        }
    };
    if let Some(tx) = kill_tx {
        let _ = tx.send(());
    }
    for session_id in sessions {
        daemon.announce_remote_session_removed(host, &session_id).await;
    }
    existed
}

/// Drives one peer TCP link from just after `connect`/`accept` through to
/// disconnection: handshake, heartbeat ticker, frame dispatch, and the
/// disconnect side effects (§4.D). `host_hint`/`port_hint` are known for an
/// outbound link before the handshake; an inbound link only learns them from
/// the peer's own `hello`.
async fn run_link(
    daemon: Daemon,
    mut host_hint: String,
    mut port_hint: Option<u16>,
    stream: TcpStream,
    is_outbound: bool,
    generation: u64,
) {
    let local_hello = build_hello(&daemon).await;
    let (read_half, mut write_half) = stream.into_split();

    let hello_line = serde_json::to_string(&local_hello).expect("hello always serializes");
    if write_half.write_all(format!("{hello_line}\n").as_bytes()).await.is_err() {
        return;
    }

    let mut reader = FrameReader::new(read_half);
    let first = match reader.next_frame().await {
        Ok(Some(line)) => line,
        _ => return,
    };
    let (remote_sessions, remote_port) = match serde_json::from_str::<PeerFrame>(&first) {
        Ok(PeerFrame::Hello { host, port, sessions }) => {
            if host_hint.is_empty() {
                host_hint = host;
            }
            (sessions, port)
        }
        _ => {
            debug!("peer handshake failed: first frame was not hello");
            return;
        }
    };

    let host = host_hint;
    let port = port_hint.take().unwrap_or(remote_port);

    let (frame_tx, mut frame_rx) = mpsc::unbounded_channel::<String>();
    let (kill_tx, mut kill_rx) = oneshot::channel::<()>();

    {
        let mut state = daemon.state.lock().await;
        let entry = state
            .peers
            .entry(host.clone())
            .or_insert_with(|| super::state::PeerEntry::new(host.clone(), port));

        // Duplicate-connection rule: an inbound hello naming a host that
        // already has an open socket replaces the older one.
        if !is_outbound {
            if let Some(old_kill) = entry.kill_tx.take() {
                let _ = old_kill.send(());
            }
        }

        entry.port = port;
        entry.status = PeerStatus::Open;
        entry.removed = false;
        entry.frame_tx = Some(frame_tx.clone());
        entry.kill_tx = Some(kill_tx);
        entry.sessions = remote_sessions
            .into_iter()
            .map(|info| (info.session_id.clone(), info))
            .collect();
        if is_outbound {
            entry.reconnected_once = false;
        }
    }

    daemon.emit_peer_event("peer_connected", &host).await;
    daemon.mark_activity().await;

    let heartbeat_interval = {
        let config = daemon.config.lock().await;
        Duration::from_secs(config.heartbeat_interval_secs)
    };
    let dead_after = heartbeat_interval * 3;

    let writer_task = tokio::spawn(async move {
        while let Some(line) = frame_rx.recv().await {
            if write_half.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                break;
            }
        }
    });

    let heartbeat_tx = frame_tx.clone();
    let heartbeat_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(heartbeat_interval);
        loop {
            interval.tick().await;
            let line = serde_json::to_string(&PeerFrame::Heartbeat {}).expect("heartbeat serializes");
            if heartbeat_tx.send(line).is_err() {
                break;
            }
        }
    });

    let superseded = read_loop(&daemon, &host, &mut reader, dead_after, &mut kill_rx).await;

    heartbeat_task.abort();
    drop(frame_tx);
    let _ = writer_task.await;

    if superseded {
        // The newer link already owns `entry`; don't clobber its state or
        // fire disconnect/reconnect logic on its behalf.
        return;
    }

    let (was_removed, generation_stale) = {
        let mut state = daemon.state.lock().await;
        let Some(entry) = state.peers.get_mut(&host) else {
            return;
        };
        let stale = is_outbound && entry.outbound_generation != generation;
        if !stale {
            entry.status = if entry.removed { PeerStatus::Removed } else { PeerStatus::Closed };
            entry.frame_tx = None;
            entry.kill_tx = None;
        }
        (entry.removed, stale)
    };

    if generation_stale || was_removed {
        return;
    }

    let sessions_to_drop: Vec<String> = {
        let mut state = daemon.state.lock().await;
        state
            .peers
            .get_mut(&host)
            .map(|e| e.sessions.drain().map(|(id, _)| id).collect())
            .unwrap_or_default()
    };
    daemon.emit_peer_event("peer_disconnected", &host).await;
    for session_id in sessions_to_drop {
        daemon.announce_remote_session_removed(&host, &session_id).await;
    }

    if is_outbound {
        schedule_reconnect_or_give_up(daemon, host, port, generation).await;
    }
}

/// Reads frames until EOF, a dead-peer timeout, a parse/size error, or a
/// kill signal from a superseding duplicate connection. Returns `true` iff
/// it exited because of the kill signal.
async fn read_loop(
    daemon: &Daemon,
    host: &str,
    reader: &mut FrameReader<OwnedReadHalf>,
    dead_after: Duration,
    kill_rx: &mut oneshot::Receiver<()>,
) -> bool {
    loop {
        tokio::select! {
            _ = &mut *kill_rx => {
                debug!(%host, "peer link superseded by a newer connection");
                return true;
            }
            result = tokio::time::timeout(dead_after, reader.next_frame()) => {
                let frame = match result {
                    Ok(Ok(Some(line))) => line,
                    Ok(Ok(None)) => return false,
                    Ok(Err(FrameError::TooLarge)) => {
                        warn!(%host, "peer sent an oversized frame, closing link");
                        return false;
                    }
                    Ok(Err(FrameError::Io(_))) => return false,
                    Err(_) => {
                        warn!(%host, "peer link went quiet past the dead-peer threshold");
                        return false;
                    }
                };
                daemon.mark_activity().await;
                if let Err(e) = dispatch_frame(daemon, host, &frame).await {
                    debug!(%host, error = %e, "malformed peer frame");
                    daemon.emit_operational_error(format!("malformed frame from peer {host}: {e}")).await;
                }
            }
        }
    }
}

async fn dispatch_frame(daemon: &Daemon, host: &str, line: &str) -> Result<(), serde_json::Error> {
    let frame: PeerFrame = serde_json::from_str(line)?;
    match frame {
        PeerFrame::Hello { .. } => {
            debug!(%host, "ignoring unexpected second hello");
        }
        PeerFrame::Heartbeat {} => {}
        PeerFrame::SessionAdded { session } => {
            {
                let mut state = daemon.state.lock().await;
                if let Some(entry) = state.peers.get_mut(host) {
                    entry.sessions.insert(session.session_id.clone(), session.clone());
                }
            }
            daemon.announce_remote_session_added(host, session).await;
        }
        PeerFrame::SessionRemoved { session_id } => {
            {
                let mut state = daemon.state.lock().await;
                if let Some(entry) = state.peers.get_mut(host) {
                    entry.sessions.remove(&session_id);
                }
            }
            daemon.announce_remote_session_removed(host, &session_id).await;
        }
        PeerFrame::Rpc {
            target_session_id,
            request_id,
            command,
        } => {
            handle_inbound_rpc(daemon, host, target_session_id, request_id, command).await;
        }
        PeerFrame::RpcResponse { request_id, response } => {
            let resolver = {
                let mut state = daemon.state.lock().await;
                state.pending_relays.remove(&request_id)
            };
            if let Some(pending) = resolver {
                let _ = pending.resolver.send(response);
            }
        }
    }
    Ok(())
}

/// Services an `rpc` frame a peer sent us: meters it against that peer's own
/// rate-limit bucket (§4.E step 1 keys the limiter by the requester's peer
/// identity, remote address included — a federated peer gets the same
/// 30-per-60s budget a local client does), then runs it against our own
/// local endpoint and sends the `rpc_response` back over the same link.
async fn handle_inbound_rpc(
    daemon: &Daemon,
    host: &str,
    target_session_id: String,
    request_id: String,
    command: serde_json::Value,
) {
    let admitted = {
        let mut limiter = daemon.rate_limiter.lock().await;
        limiter.check(host, std::time::Instant::now())
    };

    let response = if !admitted {
        serde_json::json!({ "success": false, "error": crate::error::ErrorKind::RateLimited.to_string() })
    } else {
        let socket_path = daemon.control_dir.endpoint_socket_path(&target_session_id);
        let deadline = super::relay::timeout_for_command(&command);
        match relay_to_local_endpoint(&socket_path, &command, deadline).await {
            Ok(value) => value,
            Err(e) => serde_json::json!({ "success": false, "error": e.to_string() }),
        }
    };

    let frame_tx = {
        let state = daemon.state.lock().await;
        state.peers.get(host).and_then(|p| p.frame_tx.clone())
    };
    if let Some(tx) = frame_tx {
        let reply = PeerFrame::RpcResponse { request_id, response };
        if let Ok(line) = serde_json::to_string(&reply) {
            let _ = tx.send(line);
        }
    }
}

async fn build_hello(daemon: &Daemon) -> PeerFrame {
    let state = daemon.state.lock().await;
    PeerFrame::Hello {
        host: state.hostname.clone(),
        port: state.port,
        sessions: state.local_sessions.values().cloned().collect(),
    }
}

#[cfg(test)]
#[path = "tests/federation_tests.rs"]
mod federation_tests;
