use super::*;

#[test]
fn response_omits_absent_optional_fields() {
    let frame = ResponseFrame::ok("get_message", None, None);
    let json = frame.to_line();
    assert!(!json.contains("\"data\""));
    assert!(!json.contains("\"error\""));
    assert!(!json.contains("\"id\""));
    assert!(json.contains("\"type\":\"response\""));
}

#[test]
fn size_exceeded_frame_matches_wire_wording() {
    let frame = ErrorFrame::size_exceeded();
    assert_eq!(frame.to_line(), "{\"type\":\"error\",\"error\":\"Message size exceeds 8192 bytes\"}");
}
