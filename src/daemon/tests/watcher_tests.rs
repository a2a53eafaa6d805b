use super::*;
use crate::config::DaemonConfig;
use crate::naming::ControlDir;
use serial_test::serial;
use tempfile::tempdir;
use tokio::net::UnixListener;

async fn test_daemon(root: &std::path::Path) -> Daemon {
    let control_dir = ControlDir::at(root).unwrap();
    Daemon::new(control_dir, "host-a".into(), DaemonConfig::default())
}

#[tokio::test]
#[serial]
async fn reconcile_adds_reachable_endpoint_and_assigns_a_name() {
    let dir = tempdir().unwrap();
    let daemon = test_daemon(dir.path()).await;
    let sock_path = daemon.control_dir.endpoint_socket_path("sess-1");
    let _listener = UnixListener::bind(&sock_path).unwrap();

    reconcile(&daemon).await;

    let state = daemon.state.lock().await;
    assert!(state.local_sessions.contains_key("sess-1"));
    assert!(!state.local_sessions["sess-1"].name.is_empty());
}

#[tokio::test]
#[serial]
async fn reconcile_skips_unreachable_socket_file() {
    let dir = tempdir().unwrap();
    let daemon = test_daemon(dir.path()).await;
    std::fs::File::create(daemon.control_dir.endpoint_socket_path("sess-dead")).unwrap();

    reconcile(&daemon).await;

    let state = daemon.state.lock().await;
    assert!(!state.local_sessions.contains_key("sess-dead"));
}

#[tokio::test]
#[serial]
async fn reconcile_removes_session_whose_socket_disappeared() {
    let dir = tempdir().unwrap();
    let daemon = test_daemon(dir.path()).await;
    let sock_path = daemon.control_dir.endpoint_socket_path("sess-1");
    let listener = UnixListener::bind(&sock_path).unwrap();
    reconcile(&daemon).await;
    assert!(daemon.state.lock().await.local_sessions.contains_key("sess-1"));

    drop(listener);
    std::fs::remove_file(&sock_path).unwrap();
    reconcile(&daemon).await;

    assert!(!daemon.state.lock().await.local_sessions.contains_key("sess-1"));
}

#[tokio::test]
#[serial]
async fn reconcile_reuses_persisted_name() {
    let dir = tempdir().unwrap();
    let daemon = test_daemon(dir.path()).await;
    daemon.control_dir.persist_name("sess-1", "amber-fox").unwrap();
    let sock_path = daemon.control_dir.endpoint_socket_path("sess-1");
    let _listener = UnixListener::bind(&sock_path).unwrap();

    reconcile(&daemon).await;

    let state = daemon.state.lock().await;
    assert_eq!(state.local_sessions["sess-1"].name, "amber-fox");
}
