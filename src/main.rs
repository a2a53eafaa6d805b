mod config;
mod daemon;
mod error;
mod naming;
mod session;
mod wire;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use naming::ControlDir;
use session::{AgentCollaborator, Endpoint, InMemoryAgent};

const SELF_SPAWN_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SELF_SPAWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "pi-mesh")]
#[command(about = "Multi-session, multi-host agent control mesh")]
#[command(version)]
struct Cli {
    /// Run the control-plane daemon in the foreground.
    #[arg(long)]
    daemon: bool,

    /// Run a session endpoint bound to the given session id.
    #[arg(long, value_name = "SESSION_ID")]
    endpoint: Option<String>,

    /// Overrides the control directory root (also settable via
    /// PI_MESH_CONTROL_DIR).
    #[arg(long)]
    control_dir: Option<PathBuf>,

    /// Log verbosity (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Prints daemon status.
    #[arg(long)]
    status: bool,

    /// Lists local and remote sessions known to the daemon.
    #[arg(long)]
    list_sessions: bool,

    /// Adds a peer by host[:port].
    #[arg(long, value_name = "HOST")]
    add_peer: Option<String>,

    /// Removes a peer by host.
    #[arg(long, value_name = "HOST")]
    remove_peer: Option<String>,

    /// Relays a command to a session id or alias, given as JSON.
    #[arg(long, value_name = "SESSION_ID")]
    relay: Option<String>,

    /// The RPC command JSON body for `--relay` (e.g. '{"type":"get_message"}').
    #[arg(long, value_name = "JSON", requires = "relay")]
    command: Option<String>,

    /// Marks a `--relay` request fire-and-forget (no response is awaited).
    #[arg(long, requires = "relay")]
    fire_and_forget: bool,

    /// Subscribes to the daemon's event stream and prints frames as they arrive.
    #[arg(long)]
    subscribe: bool,
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create tokio runtime");

    let result = runtime.block_on(async_main());
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

async fn async_main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Some(dir) = &cli.control_dir {
        std::env::set_var("PI_MESH_CONTROL_DIR", dir);
    }

    if cli.daemon {
        return run_daemon().await;
    }

    if let Some(session_id) = cli.endpoint {
        return run_endpoint(session_id).await;
    }

    if cli.status {
        return thin_client_request(json!({ "type": "status" })).await.map(print_response);
    }

    if cli.list_sessions {
        return thin_client_request(json!({ "type": "list_sessions" })).await.map(print_response);
    }

    if let Some(host_spec) = cli.add_peer {
        let (host, port) = config::parse_peer_address(&host_spec);
        return thin_client_request(json!({ "type": "add_peer", "host": host, "port": port }))
            .await
            .map(print_response);
    }

    if let Some(host) = cli.remove_peer {
        return thin_client_request(json!({ "type": "remove_peer", "host": host }))
            .await
            .map(print_response);
    }

    if let Some(target_session_id) = cli.relay {
        let rpc_command: Value = match &cli.command {
            Some(raw) => serde_json::from_str(raw).context("--command is not valid JSON")?,
            None => anyhow::bail!("--relay requires --command <json>"),
        };
        let request_id = uuid::Uuid::new_v4().to_string();
        return thin_client_request(json!({
            "type": "relay",
            "targetSessionId": target_session_id,
            "rpcCommand": rpc_command,
            "requestId": request_id,
            "fireAndForget": cli.fire_and_forget,
        }))
        .await
        .map(print_response);
    }

    if cli.subscribe {
        let control_dir = ControlDir::resolve()?;
        ensure_daemon_running(&control_dir).await?;
        return daemon::control::stream_subscription(&control_dir.daemon_socket_path()).await;
    }

    eprintln!("usage: pi-mesh --daemon | --endpoint <session-id> | --status | --list-sessions | --add-peer <host> | --remove-peer <host> | --relay <session-id> --command <json> | --subscribe");
    std::process::exit(2);
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

async fn run_daemon() -> Result<()> {
    let control_dir = ControlDir::resolve()?;
    let hostname = resolve_hostname();
    daemon::run::serve(control_dir, hostname).await
}

async fn run_endpoint(session_id: String) -> Result<()> {
    let control_dir = ControlDir::resolve()?;
    let agent: std::sync::Arc<dyn AgentCollaborator> = std::sync::Arc::new(InMemoryAgent::new(None));
    Endpoint::new(control_dir, session_id, agent).run().await
}

fn resolve_hostname() -> String {
    hostname_from_env().unwrap_or_else(|| "localhost".to_string())
}

fn hostname_from_env() -> Option<String> {
    std::env::var("HOSTNAME").ok().filter(|h| !h.is_empty())
}

/// Issues one request against `daemon.sock`, self-spawning a detached daemon
/// first if none is reachable (§4.E Startup and self-spawn), grounded on the
/// teacher's `connect_or_spawn`/`wait_for_port_file` pattern.
async fn thin_client_request(request: Value) -> Result<Value> {
    let control_dir = ControlDir::resolve()?;
    ensure_daemon_running(&control_dir).await?;
    daemon::control::send_request(&control_dir.daemon_socket_path(), &request).await
}

/// Connects to `daemon.sock`, self-spawning a detached daemon first if none
/// is reachable. Concurrent callers race on an advisory lock file
/// (`daemon.lock`) rather than each spawning their own daemon: the winner of
/// `try_lock_exclusive` spawns, everyone else just polls for the socket,
/// grounded on the teacher's `rpc_client.rs` `connect_or_spawn` lock-file race.
async fn ensure_daemon_running(control_dir: &ControlDir) -> Result<()> {
    let socket_path = control_dir.daemon_socket_path();
    if tokio::net::UnixStream::connect(&socket_path).await.is_ok() {
        return Ok(());
    }

    let lock_path = control_dir.daemon_lock_path();
    let lock_file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .with_context(|| format!("failed to open daemon lock file {}", lock_path.display()))?;

    match fs2::FileExt::try_lock_exclusive(&lock_file) {
        Ok(()) => {
            // Re-check: another process may have finished spawning between
            // our first connect attempt and acquiring the lock.
            if tokio::net::UnixStream::connect(&socket_path).await.is_ok() {
                let _ = fs2::FileExt::unlock(&lock_file);
                return Ok(());
            }
            spawn_detached_daemon(control_dir)?;
            let result = wait_for_socket(&socket_path).await;
            let _ = fs2::FileExt::unlock(&lock_file);
            result
        }
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
            // Another client already holds the lock and is spawning; just wait.
            wait_for_socket(&socket_path).await
        }
        Err(e) => Err(e).context("failed to acquire daemon lock"),
    }
}

async fn wait_for_socket(socket_path: &std::path::Path) -> Result<()> {
    let start = std::time::Instant::now();
    while start.elapsed() < SELF_SPAWN_TIMEOUT {
        if tokio::net::UnixStream::connect(socket_path).await.is_ok() {
            return Ok(());
        }
        tokio::time::sleep(SELF_SPAWN_POLL_INTERVAL).await;
    }
    anyhow::bail!("timed out waiting for self-spawned daemon to open {}", socket_path.display())
}

fn spawn_detached_daemon(control_dir: &ControlDir) -> Result<()> {
    let exe = std::env::current_exe().context("failed to locate current executable")?;
    std::process::Command::new(&exe)
        .arg("--daemon")
        .env("PI_MESH_CONTROL_DIR", control_dir.root())
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .context("failed to spawn daemon process")?;
    Ok(())
}

fn print_response(response: Value) {
    match serde_json::to_string_pretty(&response) {
        Ok(pretty) => println!("{pretty}"),
        Err(_) => println!("{response}"),
    }
}
