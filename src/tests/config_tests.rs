use super::*;
use tempfile::tempdir;

#[test]
fn defaults_match_spec() {
    let config = DaemonConfig::default();
    assert_eq!(config.port, 7433);
    assert_eq!(config.auto_shutdown_timeout_secs, 300);
    assert_eq!(config.heartbeat_interval_secs, 15);
    assert!(config.peers.is_empty());
}

#[test]
fn load_missing_file_returns_defaults() {
    let dir = tempdir().unwrap();
    let config = DaemonConfig::load(&dir.path().join("config.json")).unwrap();
    assert_eq!(config, DaemonConfig::default());
}

#[test]
fn add_then_remove_peer_persists_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");
    let mut config = DaemonConfig::default();
    config.add_peer(&path, "alpha:7433").unwrap();

    let reloaded = DaemonConfig::load(&path).unwrap();
    assert_eq!(reloaded.peers, vec!["alpha:7433".to_string()]);

    config.remove_peer(&path, "alpha:7433").unwrap();
    let reloaded = DaemonConfig::load(&path).unwrap();
    assert!(reloaded.peers.is_empty());
}

#[test]
fn parses_explicit_port() {
    assert_eq!(parse_peer_address("alpha:7434"), ("alpha".to_string(), 7434));
}

#[test]
fn falls_back_to_default_port_without_suffix() {
    assert_eq!(parse_peer_address("alpha"), ("alpha".to_string(), DEFAULT_PORT));
}

#[test]
fn treats_zero_port_as_bare_host() {
    assert_eq!(parse_peer_address("alpha:0"), ("alpha:0".to_string(), DEFAULT_PORT));
}

#[test]
fn treats_non_numeric_suffix_as_bare_host() {
    assert_eq!(
        parse_peer_address("alpha:abc"),
        ("alpha:abc".to_string(), DEFAULT_PORT)
    );
}
