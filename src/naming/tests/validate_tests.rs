use super::*;

#[test]
fn accepts_plain_uuid() {
    assert!(validate_safe_id("11111111-1111-1111-1111-111111111111").is_ok());
}

#[test]
fn rejects_empty() {
    assert!(validate_safe_id("").is_err());
}

#[test]
fn rejects_path_separators_and_dotdot() {
    assert!(validate_safe_id("../etc/passwd").is_err());
    assert!(validate_safe_id("a/b").is_err());
    assert!(validate_safe_id("a\\b").is_err());
    assert!(validate_safe_id("..").is_err());
}

#[test]
fn rejects_embedded_dotdot_without_separators() {
    assert!(validate_safe_id("a..b").is_err());
}
