use super::*;
use tempfile::tempdir;

#[test]
fn appends_one_line_per_entry() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("audit.log");
    append(&path, &AuditEntry::relay("local", "s1", "ok", None)).unwrap();
    append(
        &path,
        &AuditEntry::relay("local", "s1", "fail", Some("Rate limit exceeded".into())),
    )
    .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].contains("Rate limit exceeded"));
}
