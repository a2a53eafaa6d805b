use super::*;

#[test]
fn parses_send_with_default_mode() {
    let req: SessionRequest = serde_json::from_str(r#"{"type":"send","message":"hi"}"#).unwrap();
    match req.command {
        SessionCommand::Send { message, mode } => {
            assert_eq!(message, "hi");
            assert_eq!(mode, SendMode::Steer);
        }
        _ => panic!("wrong variant"),
    }
    assert_eq!(req.id, None);
}

#[test]
fn parses_send_with_explicit_follow_up_mode_and_id() {
    let req: SessionRequest =
        serde_json::from_str(r#"{"type":"send","message":"hi","mode":"follow_up","id":"r1"}"#)
            .unwrap();
    match req.command {
        SessionCommand::Send { mode, .. } => assert_eq!(mode, SendMode::FollowUp),
        _ => panic!("wrong variant"),
    }
    assert_eq!(req.id.as_deref(), Some("r1"));
}

#[test]
fn rejects_unknown_command_type() {
    let result: Result<SessionRequest, _> = serde_json::from_str(r#"{"type":"nonsense"}"#);
    assert!(result.is_err());
}

#[test]
fn clear_defaults_summarize_to_false() {
    let req: SessionRequest = serde_json::from_str(r#"{"type":"clear"}"#).unwrap();
    match req.command {
        SessionCommand::Clear { summarize } => assert!(!summarize),
        _ => panic!("wrong variant"),
    }
}

#[test]
fn command_name_matches_wire_tag() {
    assert_eq!(SessionCommand::GetMessage.name(), "get_message");
    assert_eq!(
        SessionCommand::Subscribe {
            event: SubscribeEvent::TurnEnd
        }
        .name(),
        "subscribe"
    );
}

#[test]
fn session_info_serializes_camel_case() {
    let info = SessionInfo {
        session_id: "s1".into(),
        name: "amber-fox".into(),
        aliases: vec!["amber-fox".into()],
    };
    let json = serde_json::to_string(&info).unwrap();
    assert!(json.contains("\"sessionId\""));
}
