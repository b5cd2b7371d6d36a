use dex_gossip::bitset::PeerBitmap;

#[test]
fn test_basic_set_get() {
    let mut mask = PeerBitmap::new();
    assert!(!mask.get(10));
    assert!(mask.set(10));
    assert!(mask.get(10));
    assert!(!mask.set(10)); // already set
    assert_eq!(mask.count_ones(), 1);
}

#[test]
fn test_word_boundaries() {
    let mut mask = PeerBitmap::new();
    for index in [0, 63, 64, 127, 1023] {
        assert!(mask.set(index), "bit {index} should be newly set");
        assert!(mask.get(index));
    }
    assert_eq!(mask.count_ones(), 5);
}

#[test]
fn test_out_of_range() {
    let mut mask = PeerBitmap::new();
    assert!(!mask.set(1024));
    assert!(!mask.get(1024));
    assert!(!mask.get(usize::MAX));
    assert_eq!(mask.count_ones(), 0);
}

#[test]
fn test_clear() {
    let mut mask = PeerBitmap::new();
    mask.set(5);
    mask.set(900);
    mask.clear();
    assert!(!mask.get(5));
    assert!(!mask.get(900));
    assert_eq!(mask.count_ones(), 0);
}
