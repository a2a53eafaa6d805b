//! Discovery watcher (§4.C): finds reachable session endpoints and tracks
//! their arrival/departure in the local-session table.

use std::time::Duration;

use anyhow::Result;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::naming::{validate_safe_id, whimsical};
use crate::session::SessionInfo;

use super::Daemon;

const DEBOUNCE: Duration = Duration::from_millis(50);
const PROBE_TIMEOUT: Duration = Duration::from_millis(300);

/// Runs the watcher for the lifetime of the daemon: an initial full
/// enumeration followed by native filesystem-change-driven rechecks, with a
/// polling fallback if the native watch can't be established.
pub async fn run(daemon: Daemon) -> Result<()> {
    reconcile(&daemon).await;

    let (tx, mut rx) = mpsc::unbounded_channel::<()>();
    let watch_result = start_native_watch(daemon.control_dir.root().to_path_buf(), tx);

    match watch_result {
        Ok(_watcher_guard) => {
            // must stay alive for notifications to keep firing
            while rx.recv().await.is_some() {
                tokio::time::sleep(DEBOUNCE).await;
                while rx.try_recv().is_ok() {}
                reconcile(&daemon).await;
            }
        }
        Err(e) => {
            warn!(error = %e, "native filesystem watch unavailable, falling back to polling");
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            loop {
                interval.tick().await;
                reconcile(&daemon).await;
            }
        }
    }
    Ok(())
}

fn start_native_watch(
    root: std::path::PathBuf,
    tx: mpsc::UnboundedSender<()>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if res.is_ok() {
            let _ = tx.send(());
        }
    })?;
    watcher.watch(&root, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Probes a connect to `path`; alive iff it completes within [`PROBE_TIMEOUT`].
async fn probe(path: &std::path::Path) -> bool {
    matches!(
        tokio::time::timeout(PROBE_TIMEOUT, UnixStream::connect(path)).await,
        Ok(Ok(_))
    )
}

async fn reconcile(daemon: &Daemon) {
    let nodes = match daemon.control_dir.list_endpoint_nodes() {
        Ok(n) => n,
        Err(e) => {
            debug!(error = %e, "failed to enumerate control directory");
            return;
        }
    };

    let mut seen = std::collections::HashSet::new();
    for node in &nodes {
        if validate_safe_id(&node.session_id).is_err() {
            continue;
        }
        let alive = probe(&node.socket_path).await;
        if !alive {
            continue;
        }
        seen.insert(node.session_id.clone());

        let already_tracked = {
            let state = daemon.state.lock().await;
            state.local_sessions.contains_key(&node.session_id)
        };
        if already_tracked {
            continue;
        }

        let name = match daemon.control_dir.read_persisted_name(&node.session_id) {
            Some(n) => n,
            None => {
                let generated = whimsical::generate();
                if let Err(e) = daemon.control_dir.persist_name(&node.session_id, &generated) {
                    debug!(error = %e, "failed to persist generated name");
                }
                generated
            }
        };
        let aliases = daemon
            .control_dir
            .aliases_for(&node.session_id)
            .unwrap_or_default();

        daemon
            .announce_local_session_added(SessionInfo {
                session_id: node.session_id.clone(),
                name,
                aliases,
            })
            .await;
        daemon.mark_activity().await;
    }

    let gone: Vec<String> = {
        let state = daemon.state.lock().await;
        state
            .local_sessions
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect()
    };
    for session_id in gone {
        daemon.announce_local_session_removed(&session_id).await;
        daemon.mark_activity().await;
    }
}

#[cfg(test)]
#[path = "tests/watcher_tests.rs"]
mod watcher_tests;
