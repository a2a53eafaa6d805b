//! The relay algorithm (§4.E): the daemon's hardest path, routing a
//! control-plane `relay` request to a local endpoint or a federated peer.

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::ErrorKind;
use crate::wire::{FrameReader, MAX_FRAME_BYTES};

use super::audit::{append, AuditEntry};
use super::protocol::PeerFrame;
use super::state::{PeerStatus, PendingRelay};
use super::Daemon;

/// Timeouts by relayed command kind (§4.E step 2).
pub fn timeout_for_command(command: &Value) -> Duration {
    match command.get("type").and_then(Value::as_str) {
        Some("get_message") | Some("clear") => Duration::from_secs(15),
        Some("get_summary") => Duration::from_secs(60),
        Some("send") => Duration::from_secs(5 * 60),
        _ => Duration::from_secs(10),
    }
}

pub struct RelayRequest {
    pub target_session_id: String,
    pub command: Value,
    pub request_id: String,
    pub fire_and_forget: bool,
}

pub struct RelayOutcome {
    pub success: bool,
    pub response: Option<Value>,
    pub error: Option<String>,
}

impl RelayOutcome {
    fn ok(response: Value) -> Self {
        Self {
            success: true,
            response: Some(response),
            error: None,
        }
    }

    fn err(error: ErrorKind) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.to_string()),
        }
    }
}

/// Executes the full relay algorithm for one `relay` control-plane request.
pub async fn relay(daemon: &Daemon, requester_key: &str, request: RelayRequest) -> RelayOutcome {
    {
        let mut limiter = daemon.rate_limiter.lock().await;
        if !limiter.check(requester_key, Instant::now()) {
            let entry = AuditEntry::relay(
                requester_key,
                &request.target_session_id,
                "fail",
                Some(ErrorKind::RateLimited.to_string()),
            );
            let _ = append(&daemon.control_dir.audit_log_path(), &entry);
            return RelayOutcome::err(ErrorKind::RateLimited);
        }
    }

    let deadline = timeout_for_command(&request.command);
    let outcome = dispatch(daemon, &request, deadline).await;

    if !request.fire_and_forget {
        let (result, error) = match &outcome {
            Ok(_) => ("ok".to_string(), None),
            Err(e) => ("fail".to_string(), Some(e.to_string())),
        };
        let entry = AuditEntry::relay(requester_key, &request.target_session_id, &result, error);
        if let Err(e) = append(&daemon.control_dir.audit_log_path(), &entry) {
            debug!(error = %e, "failed to append audit log entry");
        }
    }

    match outcome {
        Ok(response) => RelayOutcome::ok(response),
        Err(e) => RelayOutcome::err(e),
    }
}

/// Resolves `target_session_id` afresh against the control directory (it may
/// be a bare session id or an alias) before routing, per §4.A/§9: readers
/// always reread an alias off disk rather than caching it, so a rename is
/// never served a stale redirect.
async fn dispatch(daemon: &Daemon, request: &RelayRequest, deadline: Duration) -> Result<Value, ErrorKind> {
    let target_session_id = match daemon.control_dir.resolve_target(&request.target_session_id) {
        Ok(Some(id)) => id,
        Ok(None) => return Err(ErrorKind::NotFound),
        Err(e) => return Err(e),
    };

    let is_local = {
        let state = daemon.state.lock().await;
        state.local_sessions.contains_key(&target_session_id)
    };

    if is_local {
        let socket_path = daemon.control_dir.endpoint_socket_path(&target_session_id);
        if request.fire_and_forget {
            let command = request.command.clone();
            tokio::spawn(async move {
                if let Err(e) = relay_to_local_endpoint(&socket_path, &command, deadline).await {
                    debug!(error = %e, "fire-and-forget local relay failed in the background");
                }
            });
            return Ok(Value::Null);
        }
        return relay_to_local_endpoint(&socket_path, &request.command, deadline).await;
    }

    relay_to_peer(daemon, &target_session_id, request, deadline).await
}

/// Opens a fresh connection to a local endpoint socket, writes one command
/// frame, and returns its single response frame verbatim (§4.E step 3).
pub async fn relay_to_local_endpoint(
    socket_path: &std::path::Path,
    command: &Value,
    deadline: Duration,
) -> Result<Value, ErrorKind> {
    let attempt = async {
        let mut stream = UnixStream::connect(socket_path)
            .await
            .map_err(|e| ErrorKind::Transport(e.to_string()))?;
        let line = format!("{command}\n");
        stream
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ErrorKind::Transport(e.to_string()))?;

        let (read_half, _) = stream.into_split();
        let mut reader = FrameReader::new(read_half);
        match reader.next_frame().await {
            Ok(Some(line)) => serde_json::from_str::<Value>(&line).map_err(|e| ErrorKind::Parse(e.to_string())),
            Ok(None) => Err(ErrorKind::Transport("endpoint closed without responding".into())),
            Err(_) => Err(ErrorKind::SizeExceeded(MAX_FRAME_BYTES)),
        }
    };

    match tokio::time::timeout(deadline, attempt).await {
        Ok(result) => result,
        Err(_) => Err(ErrorKind::Timeout(deadline.as_millis() as u64)),
    }
}

async fn relay_to_peer(
    daemon: &Daemon,
    target_session_id: &str,
    request: &RelayRequest,
    deadline: Duration,
) -> Result<Value, ErrorKind> {
    let (peer_host, frame_tx, request_id) = {
        let mut state = daemon.state.lock().await;
        let Some((host, _info)) = state.find_remote_session(target_session_id) else {
            return Err(ErrorKind::NotFound);
        };
        let host = host.to_string();
        let peer = state.peers.get(&host).expect("peer present if session was found on it");
        if peer.status != PeerStatus::Open {
            return Err(ErrorKind::PeerUnreachable);
        }
        let Some(tx) = peer.frame_tx.clone() else {
            return Err(ErrorKind::PeerUnreachable);
        };
        let request_id = state.next_request_id();
        (host, tx, request_id)
    };

    let frame = PeerFrame::Rpc {
        target_session_id: target_session_id.to_string(),
        request_id: request_id.clone(),
        command: request.command.clone(),
    };
    let line = serde_json::to_string(&frame).map_err(|e| ErrorKind::Transport(e.to_string()))?;

    if request.fire_and_forget {
        let _ = frame_tx.send(line);
        return Ok(Value::Null);
    }

    let (resolver, receiver) = oneshot::channel();
    {
        let mut state = daemon.state.lock().await;
        state.pending_relays.insert(request_id.clone(), PendingRelay { resolver });
    }

    if frame_tx.send(line).is_err() {
        daemon.state.lock().await.pending_relays.remove(&request_id);
        return Err(ErrorKind::PeerUnreachable);
    }

    let result = tokio::time::timeout(deadline, receiver).await;
    match result {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(_)) => Err(ErrorKind::Transport(format!("peer {peer_host} connection closed mid-relay"))),
        Err(_) => {
            daemon.state.lock().await.pending_relays.remove(&request_id);
            Err(ErrorKind::Timeout(deadline.as_millis() as u64))
        }
    }
}

#[cfg(test)]
#[path = "tests/relay_tests.rs"]
mod relay_tests;
