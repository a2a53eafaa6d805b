//! The daemon (§4.C/D/E): discovery watcher, peer federation, and the
//! control-plane/relay listener, tied together behind one shared handle.

pub mod audit;
pub mod control;
pub mod federation;
pub mod protocol;
pub mod rate_limit;
pub mod relay;
pub mod run;
pub mod state;
pub mod watcher;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde_json::json;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

use crate::config::DaemonConfig;
use crate::naming::ControlDir;
use crate::session::SessionInfo;

use rate_limit::RateLimiter;
use state::{DaemonState, PeerStatus};

/// The shared handle passed to every daemon subsystem. Cloning is cheap
/// (everything interesting lives behind `Arc`s); this is what lets the
/// watcher, federation, and control-plane tasks all observe and mutate one
/// consistent picture of the mesh.
#[derive(Clone)]
pub struct Daemon {
    pub control_dir: ControlDir,
    pub state: Arc<Mutex<DaemonState>>,
    pub config: Arc<Mutex<DaemonConfig>>,
    pub rate_limiter: Arc<Mutex<RateLimiter>>,
    pub last_activity: Arc<Mutex<Instant>>,
    shutdown_requested: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl Daemon {
    pub fn new(control_dir: ControlDir, hostname: String, config: DaemonConfig) -> Self {
        let port = config.port;
        Self {
            control_dir,
            state: Arc::new(Mutex::new(DaemonState::new(hostname, port))),
            config: Arc::new(Mutex::new(config)),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new())),
            last_activity: Arc::new(Mutex::new(Instant::now())),
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    /// Requests a clean daemon shutdown (a `kill` control request or an idle
    /// auto-shutdown tick). Synchronous so a connection handler can call it
    /// without holding `state`'s async lock across the notification.
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Resolves once `request_shutdown` has been called.
    pub async fn wait_for_shutdown(&self) {
        if self.shutdown_requested() {
            return;
        }
        self.shutdown_notify.notified().await;
    }

    /// Inserts/updates a local session and fans out `session_added` to every
    /// local subscriber and connected peer (§4.C Side effects on add/remove).
    pub async fn announce_local_session_added(&self, info: SessionInfo) {
        let hostname = {
            let mut state = self.state.lock().await;
            state.local_sessions.insert(info.session_id.clone(), info.clone());
            state.hostname.clone()
        };
        let event = json!({
            "type": "event",
            "event": "session_added",
            "data": { "sessionId": info.session_id, "name": info.name, "aliases": info.aliases, "host": hostname, "isRemote": false },
        });
        self.fan_out_local(&event.to_string()).await;
        self.fan_out_peer_delta(protocol::PeerFrame::SessionAdded { session: info }).await;
    }

    pub async fn announce_local_session_removed(&self, session_id: &str) {
        let hostname = {
            let mut state = self.state.lock().await;
            state.local_sessions.remove(session_id);
            state.hostname.clone()
        };
        let event = json!({
            "type": "event",
            "event": "session_removed",
            "data": { "sessionId": session_id, "host": hostname, "isRemote": false },
        });
        self.fan_out_local(&event.to_string()).await;
        self.fan_out_peer_delta(protocol::PeerFrame::SessionRemoved {
            session_id: session_id.to_string(),
        })
        .await;
    }

    /// Mirrors a peer's `session_added` delta to local subscribers only
    /// (§4.C Side effects on add/remove); remote sessions are never
    /// re-advertised to other peers, each daemon only federates its own.
    pub async fn announce_remote_session_added(&self, host: &str, info: SessionInfo) {
        let event = json!({
            "type": "event",
            "event": "session_added",
            "data": { "sessionId": info.session_id, "name": info.name, "aliases": info.aliases, "host": host, "isRemote": true },
        });
        self.fan_out_local(&event.to_string()).await;
    }

    pub async fn announce_remote_session_removed(&self, host: &str, session_id: &str) {
        let event = json!({
            "type": "event",
            "event": "session_removed",
            "data": { "sessionId": session_id, "host": host, "isRemote": true },
        });
        self.fan_out_local(&event.to_string()).await;
    }

    pub async fn emit_operational_error(&self, message: impl Into<String>) {
        let event = json!({ "type": "event", "event": "error", "data": { "message": message.into() } });
        self.fan_out_local(&event.to_string()).await;
    }

    pub async fn emit_peer_event(&self, event_name: &str, host: &str) {
        let event = json!({ "type": "event", "event": event_name, "data": { "host": host } });
        self.fan_out_local(&event.to_string()).await;
    }

    async fn fan_out_local(&self, line: &str) {
        self.state.lock().await.broadcast(line);
    }

    async fn fan_out_peer_delta(&self, frame: protocol::PeerFrame) {
        let line = match serde_json::to_string(&frame) {
            Ok(l) => l,
            Err(e) => {
                debug!(error = %e, "failed to serialize peer delta frame");
                return;
            }
        };
        let mut state = self.state.lock().await;
        for peer in state.peers.values_mut() {
            if peer.status != PeerStatus::Open {
                continue;
            }
            if let Some(tx) = &peer.frame_tx {
                let _ = tx.send(line.clone());
            }
        }
    }

    /// Marks the current instant as the last meaningful activity, resetting
    /// the auto-shutdown idle timer (§4.E Auto-shutdown).
    pub async fn mark_activity(&self) {
        *self.last_activity.lock().await = Instant::now();
    }
}
