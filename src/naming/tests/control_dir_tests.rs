use super::*;
use tempfile::tempdir;

#[test]
fn alias_round_trips_to_session_id() {
    let dir = tempdir().unwrap();
    let cd = ControlDir::at(dir.path()).unwrap();
    std::fs::File::create(cd.endpoint_socket_path("sess-1")).unwrap();
    cd.create_alias("amber-fox", "sess-1").unwrap();

    assert_eq!(cd.resolve_alias("amber-fox").unwrap().as_deref(), Some("sess-1"));
    assert_eq!(cd.aliases_for("sess-1").unwrap(), vec!["amber-fox".to_string()]);
}

#[test]
fn resolve_target_prefers_direct_session_id_over_alias() {
    let dir = tempdir().unwrap();
    let cd = ControlDir::at(dir.path()).unwrap();
    std::fs::File::create(cd.endpoint_socket_path("sess-1")).unwrap();

    assert_eq!(cd.resolve_target("sess-1").unwrap().as_deref(), Some("sess-1"));
    assert_eq!(cd.resolve_target("no-such-alias").unwrap(), None);
}

#[test]
fn repointing_alias_replaces_old_link() {
    let dir = tempdir().unwrap();
    let cd = ControlDir::at(dir.path()).unwrap();
    std::fs::File::create(cd.endpoint_socket_path("sess-1")).unwrap();
    std::fs::File::create(cd.endpoint_socket_path("sess-2")).unwrap();

    cd.create_alias("amber-fox", "sess-1").unwrap();
    cd.create_alias("amber-fox", "sess-2").unwrap();

    assert_eq!(cd.resolve_alias("amber-fox").unwrap().as_deref(), Some("sess-2"));
    assert!(cd.aliases_for("sess-1").unwrap().is_empty());
}

#[test]
fn rejects_unsafe_ids_at_every_ingress() {
    let dir = tempdir().unwrap();
    let cd = ControlDir::at(dir.path()).unwrap();
    assert!(cd.resolve_alias("../etc").is_err());
    assert!(cd.resolve_target("a/b").is_err());
    assert!(cd.create_alias("x", "../y").is_err());
}

#[test]
fn list_endpoint_nodes_excludes_daemon_socket() {
    let dir = tempdir().unwrap();
    let cd = ControlDir::at(dir.path()).unwrap();
    std::fs::File::create(cd.endpoint_socket_path("sess-1")).unwrap();
    std::fs::File::create(cd.daemon_socket_path()).unwrap();

    let nodes = cd.list_endpoint_nodes().unwrap();
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].session_id, "sess-1");
}

#[test]
fn persisted_name_round_trips() {
    let dir = tempdir().unwrap();
    let cd = ControlDir::at(dir.path()).unwrap();
    assert_eq!(cd.read_persisted_name("sess-1"), None);
    cd.persist_name("sess-1", "amber-fox").unwrap();
    assert_eq!(cd.read_persisted_name("sess-1").as_deref(), Some("amber-fox"));
}
