use super::*;

#[test]
fn timeout_buckets_match_spec() {
    assert_eq!(timeout_for_command(&serde_json::json!({"type":"get_message"})), Duration::from_secs(15));
    assert_eq!(timeout_for_command(&serde_json::json!({"type":"clear"})), Duration::from_secs(15));
    assert_eq!(timeout_for_command(&serde_json::json!({"type":"get_summary"})), Duration::from_secs(60));
    assert_eq!(timeout_for_command(&serde_json::json!({"type":"send"})), Duration::from_secs(300));
    assert_eq!(timeout_for_command(&serde_json::json!({"type":"abort"})), Duration::from_secs(10));
}

#[tokio::test]
async fn relay_to_missing_local_endpoint_surfaces_transport_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope.sock");
    let err = relay_to_local_endpoint(&path, &serde_json::json!({"type":"get_message"}), Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, ErrorKind::Transport(_)));
}
