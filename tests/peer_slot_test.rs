use dex_gossip::constants::{MAX_PEER_ID, PEER_EPOCH_SECONDS};
use dex_gossip::peers::PeerSlotMap;

const T0: u32 = 1_700_000_000;

#[test]
fn test_slot_is_idempotent_within_epoch() {
    let mut map = PeerSlotMap::new();
    let first = map.slot(T0, 77).unwrap();
    let second = map.slot(T0 + 1, 77).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_slot_zero_is_reserved() {
    let mut map = PeerSlotMap::new();
    assert_eq!(map.slot(T0, 1), Some(1));
    assert_eq!(map.slot(T0, 2), Some(2));
}

#[test]
fn test_distinct_peers_distinct_slots() {
    let mut map = PeerSlotMap::new();
    let a = map.slot(T0, 10).unwrap();
    let b = map.slot(T0, 20).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_epoch_exhaustion() {
    let mut map = PeerSlotMap::new();
    for id in 1..MAX_PEER_ID as u64 {
        assert!(map.slot(T0, id).is_some(), "peer {id} should fit");
    }
    // the 1024th distinct peer is rejected for this epoch
    assert_eq!(map.slot(T0, 99_999), None);
    // known peers still resolve
    assert!(map.slot(T0, 1).is_some());
    // a fresh epoch has room again
    assert!(map.slot(T0 + PEER_EPOCH_SECONDS, 99_999).is_some());
}

#[test]
fn test_reset_clears_all_epochs() {
    let mut map = PeerSlotMap::new();
    let before = map.slot(T0, 5).unwrap();
    map.slot(T0 + PEER_EPOCH_SECONDS, 6).unwrap();
    map.reset();
    // first claim after reset lands on slot 1 again
    let after = map.slot(T0, 123).unwrap();
    assert_eq!(after, 1);
    let _ = before;
}
