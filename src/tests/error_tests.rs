use super::*;

#[test]
fn size_exceeded_message_matches_wire_contract() {
    let kind = ErrorKind::SizeExceeded(8192);
    assert_eq!(kind.to_string(), "message exceeds 8192 bytes");
}

#[test]
fn timeout_message_matches_scenario_wording() {
    let kind = ErrorKind::Timeout(60_000);
    assert_eq!(kind.to_string(), "Relay timeout after 60000ms");
}

#[test]
fn tag_is_stable_for_every_variant() {
    assert_eq!(ErrorKind::NotFound.tag(), "not_found");
    assert_eq!(ErrorKind::RateLimited.tag(), "rate_limited");
    assert_eq!(ErrorKind::Busy.tag(), "busy");
}
