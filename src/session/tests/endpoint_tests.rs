use super::*;
use crate::session::agent::InMemoryAgent;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

async fn spawn_test_endpoint(agent: Arc<dyn AgentCollaborator>) -> (Arc<Endpoint>, tempfile::TempDir, String) {
    let dir = tempdir().unwrap();
    let control_dir = ControlDir::at(dir.path()).unwrap();
    let session_id = "sess-1".to_string();
    let endpoint = Endpoint::new(control_dir, session_id.clone(), agent);
    let socket_path = endpoint.control_dir.endpoint_socket_path(&session_id);
    let running = endpoint.clone();
    tokio::spawn(async move {
        let _ = running.run().await;
    });
    for _ in 0..50 {
        if socket_path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    (endpoint, dir, session_id)
}

#[tokio::test]
async fn get_message_round_trip_over_socket() {
    let agent = Arc::new(InMemoryAgent::new(None));
    let (endpoint, _dir, session_id) = spawn_test_endpoint(agent).await;
    let socket_path = endpoint.control_dir.endpoint_socket_path(&session_id);

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half
        .write_all(b"{\"type\":\"get_message\",\"id\":\"r1\"}\n")
        .await
        .unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
    assert_eq!(parsed["success"], true);
    assert_eq!(parsed["data"]["message"], serde_json::Value::Null);
    assert_eq!(parsed["id"], "r1");
}

#[tokio::test]
async fn oversized_frame_gets_one_error_then_close() {
    let agent = Arc::new(InMemoryAgent::new(None));
    let (endpoint, _dir, session_id) = spawn_test_endpoint(agent).await;
    let socket_path = endpoint.control_dir.endpoint_socket_path(&session_id);

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let payload = "a".repeat(crate::wire::MAX_FRAME_BYTES + 100);
    write_half
        .write_all(format!("{payload}\n").as_bytes())
        .await
        .unwrap();

    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    assert!(line.contains("Message size exceeds 8192 bytes"));

    let mut next = String::new();
    let n = reader.read_line(&mut next).await.unwrap();
    assert_eq!(n, 0, "connection should be closed after the size error");
}

#[tokio::test]
async fn malformed_frame_keeps_connection_open_for_next_frame() {
    let agent = Arc::new(InMemoryAgent::new(None));
    let (endpoint, _dir, session_id) = spawn_test_endpoint(agent).await;
    let socket_path = endpoint.control_dir.endpoint_socket_path(&session_id);

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half.write_all(b"not json\n").await.unwrap();
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    assert!(line.contains("\"success\":false"));

    write_half
        .write_all(b"{\"type\":\"abort\"}\n")
        .await
        .unwrap();
    let mut line2 = String::new();
    reader.read_line(&mut line2).await.unwrap();
    assert!(line2.contains("\"success\":true"));
}

#[tokio::test]
async fn subscribe_then_turn_end_delivers_exactly_one_event() {
    let agent = Arc::new(InMemoryAgent::new(None));
    let (endpoint, _dir, session_id) = spawn_test_endpoint(agent.clone()).await;
    let socket_path = endpoint.control_dir.endpoint_socket_path(&session_id);

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    write_half
        .write_all(b"{\"type\":\"subscribe\",\"event\":\"turn_end\"}\n")
        .await
        .unwrap();
    let mut resp_line = String::new();
    reader.read_line(&mut resp_line).await.unwrap();
    let resp: serde_json::Value = serde_json::from_str(&resp_line).unwrap();
    assert_eq!(resp["success"], true);

    agent
        .deliver("hi".into(), true, DeliverAs::Steer)
        .await
        .unwrap();

    let mut event_line = String::new();
    reader.read_line(&mut event_line).await.unwrap();
    let event: serde_json::Value = serde_json::from_str(&event_line).unwrap();
    assert_eq!(event["type"], "event");
    assert_eq!(event["event"], "turn_end");
}

#[tokio::test]
async fn alias_reconciliation_creates_and_removes_link() {
    let agent = Arc::new(InMemoryAgent::new(Some("amber-fox".to_string())));
    let (endpoint, _dir, session_id) = spawn_test_endpoint(agent.clone()).await;

    for _ in 0..50 {
        if endpoint.control_dir.resolve_alias("amber-fox").unwrap().is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(
        endpoint.control_dir.resolve_alias("amber-fox").unwrap().as_deref(),
        Some(session_id.as_str())
    );
}
