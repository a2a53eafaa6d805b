//! Daemon process orchestration: wires the watcher, peer federation listener,
//! control-plane listener, and the auto-shutdown idle timer behind one
//! lifetime, and owns the fatal startup conditions (§6 Exit codes, §7 Fatal
//! conditions).

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::DaemonConfig;
use crate::naming::ControlDir;

use super::{control, federation, watcher, Daemon};

const IDLE_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the daemon in the foreground until a `kill` request, an idle
/// auto-shutdown, or a process signal asks it to stop. Returns `Ok(())` on
/// every clean exit path; binding failures and PID-file failures propagate as
/// `Err` so `main` can map them to a non-zero exit code.
pub async fn serve(control_dir: ControlDir, hostname: String) -> Result<()> {
    let config = DaemonConfig::load(&control_dir.config_path()).context("failed to load config.json")?;
    let port = config.port;
    let auto_shutdown = Duration::from_secs(config.auto_shutdown_timeout_secs);
    let peers = config.peers.clone();

    write_pid_file(&control_dir)?;

    let daemon = Daemon::new(control_dir.clone(), hostname, config);

    federation::reconnect_all(&daemon, &peers).await;

    let watcher_daemon = daemon.clone();
    let watcher_task = tokio::spawn(async move {
        if let Err(e) = watcher::run(watcher_daemon).await {
            warn!(error = %e, "discovery watcher exited");
        }
    });

    let control_daemon = daemon.clone();
    let control_task = tokio::spawn(async move {
        if let Err(e) = control::listen(control_daemon).await {
            warn!(error = %e, "control plane listener exited");
        }
    });

    let federation_daemon = daemon.clone();
    let federation_task = tokio::spawn(async move {
        if let Err(e) = federation::listen(federation_daemon, port).await {
            warn!(error = %e, "peer federation listener exited");
        }
    });

    let idle_daemon = daemon.clone();
    let idle_task = tokio::spawn(async move {
        auto_shutdown_loop(idle_daemon, auto_shutdown).await;
    });

    wait_for_shutdown_signal(&daemon).await;

    watcher_task.abort();
    control_task.abort();
    federation_task.abort();
    idle_task.abort();

    cleanup(&control_dir);
    info!("daemon shut down cleanly");
    Ok(())
}

/// Resolves on `Daemon::request_shutdown` (via `kill` or auto-shutdown) or on
/// SIGINT/SIGTERM (Ctrl-C / process manager stop), whichever comes first.
async fn wait_for_shutdown_signal(daemon: &Daemon) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = daemon.wait_for_shutdown() => {}
            _ = tokio::signal::ctrl_c() => { info!("received SIGINT"); }
            _ = sigterm.recv() => { info!("received SIGTERM"); }
        }
    }
    #[cfg(not(unix))]
    {
        tokio::select! {
            _ = daemon.wait_for_shutdown() => {}
            _ = tokio::signal::ctrl_c() => { info!("received ctrl-c"); }
        }
    }
}

/// Ticks every [`IDLE_POLL_INTERVAL`] and requests shutdown once the daemon
/// has had zero local sessions and zero live peers for the configured idle
/// timeout (§4.E Auto-shutdown). Any tracked activity — session add/remove,
/// peer connect, inbound frame — resets `last_activity`, so this loop only
/// has to compare elapsed time against the threshold.
async fn auto_shutdown_loop(daemon: Daemon, timeout: Duration) {
    let mut interval = tokio::time::interval(IDLE_POLL_INTERVAL);
    loop {
        interval.tick().await;
        let idle = daemon.state.lock().await.is_idle();
        if !idle {
            continue;
        }
        let elapsed = daemon.last_activity.lock().await.elapsed();
        if elapsed >= timeout {
            info!(idle_secs = elapsed.as_secs(), "auto-shutdown: no local sessions or peers");
            daemon.request_shutdown();
            return;
        }
    }
}

fn write_pid_file(control_dir: &ControlDir) -> Result<()> {
    let path = control_dir.daemon_pid_path();
    std::fs::write(&path, std::process::id().to_string())
        .with_context(|| format!("failed to write PID file {}", path.display()))
}

fn cleanup(control_dir: &ControlDir) {
    let _ = std::fs::remove_file(control_dir.daemon_socket_path());
    let _ = std::fs::remove_file(control_dir.daemon_pid_path());
}
