//! Wire frame types for the two daemon-facing protocols (§4.D, §4.E, §6):
//! the peer-to-peer federation link and the local control-plane socket.
//!
//! Both are newline-delimited JSON with the same 8 KiB cap as the session
//! endpoint; only the tagged unions differ.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::SessionInfo;

/// Frames exchanged over the peer TCP link (§4.D).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PeerFrame {
    Hello {
        host: String,
        port: u16,
        sessions: Vec<SessionInfo>,
    },
    Heartbeat {},
    SessionAdded {
        session: SessionInfo,
    },
    SessionRemoved {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
    Rpc {
        #[serde(rename = "targetSessionId")]
        target_session_id: String,
        #[serde(rename = "requestId")]
        request_id: String,
        command: Value,
    },
    RpcResponse {
        #[serde(rename = "requestId")]
        request_id: String,
        response: Value,
    },
}

/// Requests accepted on `daemon.sock` (§4.E).
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlRequest {
    Status,
    AddPeer {
        host: String,
        port: Option<u16>,
    },
    RemovePeer {
        host: String,
    },
    ListSessions,
    ListTailscale,
    Relay {
        #[serde(rename = "targetSessionId")]
        target_session_id: String,
        #[serde(rename = "rpcCommand")]
        rpc_command: Value,
        #[serde(rename = "requestId")]
        request_id: String,
        #[serde(default, rename = "fireAndForget")]
        fire_and_forget: bool,
    },
    Subscribe {},
    Kill,
}

impl ControlRequest {
    pub fn name(&self) -> &'static str {
        match self {
            ControlRequest::Status => "status",
            ControlRequest::AddPeer { .. } => "add_peer",
            ControlRequest::RemovePeer { .. } => "remove_peer",
            ControlRequest::ListSessions => "list_sessions",
            ControlRequest::ListTailscale => "list_tailscale",
            ControlRequest::Relay { .. } => "relay",
            ControlRequest::Subscribe {} => "subscribe",
            ControlRequest::Kill => "kill",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlRequestEnvelope {
    #[serde(flatten)]
    pub request: ControlRequest,
    #[serde(default)]
    pub id: Option<String>,
}

/// A session entry as returned by `list_sessions`, tagged with its origin.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedSessionInfo {
    pub session_id: String,
    pub name: String,
    pub aliases: Vec<String>,
    pub host: String,
    pub is_remote: bool,
}

/// One entry of `status`'s per-peer summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerSummary {
    pub host: String,
    pub port: u16,
    pub status: String,
    pub session_count: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub pid: u32,
    pub uptime_secs: u64,
    pub port: u16,
    pub local_session_count: usize,
    pub connected_peer_count: usize,
    pub peers: Vec<PeerSummary>,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod protocol_tests;
