//! Shared daemon state (§5 Shared-resource policy).
//!
//! Every mutation goes through the single `Arc<Mutex<DaemonState>>` guard;
//! there is no cross-thread writer, which is what makes the per-connection
//! FIFO and relay-correlation invariants (§8) trivial to uphold.

use std::collections::HashMap;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};

use crate::session::SessionInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    Connecting,
    Open,
    Closed,
    GaveUp,
    Removed,
}

impl PeerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeerStatus::Connecting => "connecting",
            PeerStatus::Open => "open",
            PeerStatus::Closed => "closed",
            PeerStatus::GaveUp => "gave_up",
            PeerStatus::Removed => "removed",
        }
    }
}

/// One configured peer relationship. `outbound_generation` is bumped every
/// time a fresh outbound attempt starts, so a stale reconnect task that
/// finishes after a newer one started (or after `remove_peer`) can detect
/// it's obsolete and bail out without clobbering current state.
pub struct PeerEntry {
    pub host: String,
    pub port: u16,
    pub status: PeerStatus,
    pub sessions: HashMap<String, SessionInfo>,
    pub frame_tx: Option<mpsc::UnboundedSender<String>>,
    pub outbound_generation: u64,
    pub reconnected_once: bool,
    /// Signals the task currently driving this peer's link to stop, so a
    /// duplicate inbound connection or `remove_peer` can retire the old one
    /// without waiting for it to notice on its own (§4.D Duplicate-connection
    /// rule).
    pub kill_tx: Option<oneshot::Sender<()>>,
    /// Set once `remove_peer` (or a superseding duplicate connection) has
    /// torn this entry down; suppresses the outbound reconnect loop.
    pub removed: bool,
}

impl PeerEntry {
    pub fn new(host: String, port: u16) -> Self {
        Self {
            host,
            port,
            status: PeerStatus::Connecting,
            sessions: HashMap::new(),
            frame_tx: None,
            outbound_generation: 0,
            reconnected_once: false,
            kill_tx: None,
            removed: false,
        }
    }
}

/// A relay awaiting its `rpc_response` from a peer, keyed by `requestId`
/// (§9 Correlating outstanding relays).
pub struct PendingRelay {
    pub resolver: oneshot::Sender<serde_json::Value>,
}

pub struct Subscriber {
    pub tx: mpsc::UnboundedSender<String>,
}

pub struct DaemonState {
    pub hostname: String,
    pub port: u16,
    pub started_at: Instant,
    pub local_sessions: HashMap<String, SessionInfo>,
    pub peers: HashMap<String, PeerEntry>,
    pub pending_relays: HashMap<String, PendingRelay>,
    pub subscribers: HashMap<u64, Subscriber>,
    pub next_subscriber_id: u64,
    pub next_request_id: u64,
}

impl DaemonState {
    pub fn new(hostname: String, port: u16) -> Self {
        Self {
            hostname,
            port,
            started_at: Instant::now(),
            local_sessions: HashMap::new(),
            peers: HashMap::new(),
            pending_relays: HashMap::new(),
            subscribers: HashMap::new(),
            next_subscriber_id: 0,
            next_request_id: 0,
        }
    }

    pub fn next_request_id(&mut self) -> String {
        self.next_request_id += 1;
        format!("{}-{}", self.hostname, self.next_request_id)
    }

    pub fn add_subscriber(&mut self, tx: mpsc::UnboundedSender<String>) -> u64 {
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.insert(id, Subscriber { tx });
        id
    }

    pub fn remove_subscriber(&mut self, id: u64) {
        self.subscribers.remove(&id);
    }

    /// Broadcasts one pre-serialized event line to every subscriber,
    /// quietly dropping any whose queue has gone away (§4.E Event fan-out).
    pub fn broadcast(&mut self, line: &str) {
        self.subscribers.retain(|_, sub| sub.tx.send(line.to_string()).is_ok());
    }

    /// Finds the peer (if any) currently advertising `session_id`.
    pub fn find_remote_session(&self, session_id: &str) -> Option<(&str, &SessionInfo)> {
        self.peers.values().find_map(|peer| {
            peer.sessions
                .get(session_id)
                .map(|info| (peer.host.as_str(), info))
        })
    }

    pub fn is_idle(&self) -> bool {
        self.local_sessions.is_empty()
            && self
                .peers
                .values()
                .all(|p| !matches!(p.status, PeerStatus::Open | PeerStatus::Connecting))
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod state_tests;
