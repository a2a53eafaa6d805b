use super::*;
use crate::config::DaemonConfig;
use crate::naming::ControlDir;
use serial_test::serial;
use tempfile::tempdir;

async fn test_daemon(root: &std::path::Path, hostname: &str) -> Daemon {
    let control_dir = ControlDir::at(root).unwrap();
    Daemon::new(control_dir, hostname.into(), DaemonConfig::default())
}

#[tokio::test]
#[serial]
async fn hello_exchange_registers_peer_sessions() {
    let dir_a = tempdir().unwrap();
    let dir_b = tempdir().unwrap();
    let daemon_a = test_daemon(dir_a.path(), "host-a").await;
    let daemon_b = test_daemon(dir_b.path(), "host-b").await;
    daemon_b
        .announce_local_session_added(SessionInfo {
            session_id: "s2".into(),
            name: "amber-fox".into(),
            aliases: vec![],
        })
        .await;

    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let accept_daemon = daemon_b.clone();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        run_link(accept_daemon, String::new(), None, stream, false, 0).await;
    });

    connect_outbound(daemon_a.clone(), "127.0.0.1".into(), port);

    for _ in 0..100 {
        if daemon_a
            .state
            .lock()
            .await
            .peers
            .get("127.0.0.1")
            .map(|p| p.sessions.contains_key("s2"))
            .unwrap_or(false)
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let state = daemon_a.state.lock().await;
    let peer = state.peers.get("127.0.0.1").expect("peer registered");
    assert_eq!(peer.status, PeerStatus::Open);
    assert!(peer.sessions.contains_key("s2"));
}

#[tokio::test]
async fn connect_to_closed_port_eventually_gives_up() {
    let dir = tempdir().unwrap();
    let daemon = test_daemon(dir.path(), "host-a").await;
    // Port 1 is privileged/unassigned and should refuse immediately.
    connect_outbound(daemon.clone(), "127.0.0.1".into(), 1);

    for _ in 0..50 {
        let status = daemon.state.lock().await.peers.get("127.0.0.1").map(|p| p.status);
        if matches!(status, Some(PeerStatus::GaveUp)) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("peer never reached gave_up state (this test waits out the 3s reconnect delay)");
}
