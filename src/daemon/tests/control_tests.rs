use super::*;
use crate::config::DaemonConfig;
use crate::naming::ControlDir;
use serial_test::serial;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

async fn spawn_test_daemon(root: &std::path::Path) -> Daemon {
    let control_dir = ControlDir::at(root).unwrap();
    let daemon = Daemon::new(control_dir, "host-a".into(), DaemonConfig::default());
    let running = daemon.clone();
    tokio::spawn(async move {
        let _ = listen(running).await;
    });
    let socket_path = daemon.control_dir.daemon_socket_path();
    for _ in 0..50 {
        if socket_path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    daemon
}

#[tokio::test]
#[serial]
async fn status_reports_pid_and_zero_sessions() {
    let dir = tempdir().unwrap();
    let daemon = spawn_test_daemon(dir.path()).await;
    let socket_path = daemon.control_dir.daemon_socket_path();

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    write_half.write_all(b"{\"type\":\"status\"}\n").await.unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let parsed: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["success"], true);
    assert_eq!(parsed["data"]["localSessionCount"], 0);
    assert_eq!(parsed["data"]["pid"], std::process::id());
}

#[tokio::test]
#[serial]
async fn list_sessions_returns_local_entries_tagged_not_remote() {
    let dir = tempdir().unwrap();
    let daemon = spawn_test_daemon(dir.path()).await;
    daemon
        .announce_local_session_added(crate::session::SessionInfo {
            session_id: "11111111-1111-1111-1111-111111111111".into(),
            name: "amber-fox".into(),
            aliases: vec![],
        })
        .await;
    let socket_path = daemon.control_dir.daemon_socket_path();

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    write_half.write_all(b"{\"type\":\"list_sessions\"}\n").await.unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let parsed: Value = serde_json::from_str(&line).unwrap();
    let sessions = parsed["data"]["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0]["isRemote"], false);
}

#[tokio::test]
#[serial]
async fn relay_to_unknown_session_returns_not_found() {
    let dir = tempdir().unwrap();
    let daemon = spawn_test_daemon(dir.path()).await;
    let socket_path = daemon.control_dir.daemon_socket_path();

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    write_half
        .write_all(b"{\"type\":\"relay\",\"targetSessionId\":\"nope\",\"rpcCommand\":{\"type\":\"get_message\"},\"requestId\":\"r1\"}\n")
        .await
        .unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let parsed: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["success"], false);
    assert!(parsed["error"].as_str().unwrap().contains("session not found"));
}

#[tokio::test]
#[serial]
async fn oversized_frame_on_control_socket_gets_one_error_then_close() {
    let dir = tempdir().unwrap();
    let daemon = spawn_test_daemon(dir.path()).await;
    let socket_path = daemon.control_dir.daemon_socket_path();

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let payload = "a".repeat(crate::wire::MAX_FRAME_BYTES + 800);
    write_half.write_all(format!("{payload}\n").as_bytes()).await.unwrap();

    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    assert!(line.contains("Message size exceeds 8192 bytes"));

    let mut next = String::new();
    let n = reader.read_line(&mut next).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
#[serial]
async fn kill_request_stops_the_listener() {
    let dir = tempdir().unwrap();
    let daemon = spawn_test_daemon(dir.path()).await;
    let socket_path = daemon.control_dir.daemon_socket_path();

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    write_half.write_all(b"{\"type\":\"kill\"}\n").await.unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let parsed: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["success"], true);
}
