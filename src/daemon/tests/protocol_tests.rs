use super::*;

#[test]
fn hello_frame_round_trips() {
    let frame = PeerFrame::Hello {
        host: "alpha".into(),
        port: 7433,
        sessions: vec![],
    };
    let json = serde_json::to_string(&frame).unwrap();
    assert!(json.contains("\"type\":\"hello\""));
    let parsed: PeerFrame = serde_json::from_str(&json).unwrap();
    matches!(parsed, PeerFrame::Hello { .. });
}

#[test]
fn relay_request_parses_with_default_fire_and_forget() {
    let req: ControlRequestEnvelope = serde_json::from_str(
        r#"{"type":"relay","targetSessionId":"s1","rpcCommand":{"type":"get_message"},"requestId":"r1"}"#,
    )
    .unwrap();
    match req.request {
        ControlRequest::Relay {
            target_session_id,
            fire_and_forget,
            ..
        } => {
            assert_eq!(target_session_id, "s1");
            assert!(!fire_and_forget);
        }
        _ => panic!("wrong variant"),
    }
}

#[test]
fn rejects_unknown_control_request() {
    let result: Result<ControlRequestEnvelope, _> = serde_json::from_str(r#"{"type":"bogus"}"#);
    assert!(result.is_err());
}

#[test]
fn control_request_name_matches_wire_tag() {
    assert_eq!(ControlRequest::Status.name(), "status");
    assert_eq!(ControlRequest::ListSessions.name(), "list_sessions");
}
