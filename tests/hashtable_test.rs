use dex_gossip::constants::{HASH_CAPACITY, PENDING_CAPACITY};
use dex_gossip::hashtable::{Find, PendingLookup, PendingTable, ShortHashTable};

#[test]
fn test_find_insert_clear() {
    let mut table = ShortHashTable::new();
    let short = 0x1234_5678;
    let slot = match table.find(short) {
        Find::Open(slot) => slot,
        other => panic!("expected open slot, got {other:?}"),
    };
    table.insert(slot, short);
    assert_eq!(table.find(short), Find::Found(slot));
    table.clear(slot);
    assert_eq!(table.find(short), Find::Open(slot));
}

#[test]
fn test_probe_past_collision() {
    let mut table = ShortHashTable::new();
    // two distinct hashes landing on the same home slot
    let a = 0x0000_0042u32;
    let b = 0x0001_0042u32;
    let slot_a = match table.find(a) {
        Find::Open(slot) => slot,
        other => panic!("{other:?}"),
    };
    table.insert(slot_a, a);
    let slot_b = match table.find(b) {
        Find::Open(slot) => slot,
        other => panic!("{other:?}"),
    };
    assert_eq!(slot_b, slot_a + 1);
    table.insert(slot_b, b);
    assert_eq!(table.find(a), Find::Found(slot_a));
    assert_eq!(table.find(b), Find::Found(slot_b));
}

#[test]
fn test_probe_wraps() {
    let mut table = ShortHashTable::new();
    let last = (HASH_CAPACITY - 1) as u32;
    // occupy the last cell, then probe a second hash homed there
    let a = last;
    let b = last + HASH_CAPACITY as u32;
    let slot_a = match table.find(a) {
        Find::Open(slot) => slot,
        other => panic!("{other:?}"),
    };
    assert_eq!(slot_a as usize, HASH_CAPACITY - 1);
    table.insert(slot_a, a);
    match table.find(b) {
        Find::Open(slot) => assert_eq!(slot, 0),
        other => panic!("{other:?}"),
    }
}

#[test]
fn test_full_table() {
    let mut table = ShortHashTable::new();
    for slot in 0..HASH_CAPACITY as u16 {
        table.insert(slot, 0xdead_beef);
    }
    assert_eq!(table.find(0x1234_5678), Find::Full);
    assert!(matches!(table.find(0xdead_beef), Find::Found(_)));
}

#[test]
fn test_pending_lookup_and_clear() {
    let mut pending = PendingTable::new();
    let short = 0xabcd_0001;
    assert_eq!(pending.lookup(short, false), PendingLookup::Miss);
    pending.insert(short);
    assert_eq!(pending.lookup(short, false), PendingLookup::Hit);
    // still present after a non-clearing probe
    assert_eq!(pending.lookup(short, true), PendingLookup::Hit);
    // cleared by the claiming probe
    assert_eq!(pending.lookup(short, false), PendingLookup::Miss);
}

#[test]
fn test_pending_collision() {
    let mut pending = PendingTable::new();
    let a = 7u32;
    let b = 7u32 + PENDING_CAPACITY as u32;
    pending.insert(a);
    assert_eq!(pending.lookup(b, false), PendingLookup::Collision);
    // inserts overwrite
    pending.insert(b);
    assert_eq!(pending.lookup(b, false), PendingLookup::Hit);
    assert_eq!(pending.lookup(a, false), PendingLookup::Collision);
}
