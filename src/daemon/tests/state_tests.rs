use super::*;

#[test]
fn broadcast_drops_subscribers_whose_receiver_is_gone() {
    let mut state = DaemonState::new("host-a".into(), 7433);
    let (tx_alive, mut rx_alive) = mpsc::unbounded_channel();
    let (tx_dead, rx_dead) = mpsc::unbounded_channel();
    drop(rx_dead);
    state.add_subscriber(tx_alive);
    state.add_subscriber(tx_dead);

    state.broadcast("{\"type\":\"event\"}");

    assert_eq!(state.subscribers.len(), 1);
    assert_eq!(rx_alive.try_recv().unwrap(), "{\"type\":\"event\"}");
}

#[test]
fn is_idle_requires_no_local_sessions_and_no_live_peers() {
    let mut state = DaemonState::new("host-a".into(), 7433);
    assert!(state.is_idle());

    state.peers.insert("b".into(), PeerEntry::new("b".into(), 7433));
    assert!(!state.is_idle());

    state.peers.get_mut("b").unwrap().status = PeerStatus::GaveUp;
    assert!(state.is_idle());
}

#[test]
fn next_request_id_is_unique_per_call() {
    let mut state = DaemonState::new("host-a".into(), 7433);
    let a = state.next_request_id();
    let b = state.next_request_id();
    assert_ne!(a, b);
}
