use std::sync::Arc;

use dex_gossip::constants::{MAX_LAG, PURGE_SECONDS, SECONDS_IN_DAY};
use dex_gossip::protocol::encode_ping;
use dex_gossip::testing::TestPeer;
use dex_gossip::time::ManualClock;
use dex_gossip::{BroadcastRequest, DexGossip, ListFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;

const T0: u32 = 1_700_000_000;

fn engine(clock: &Arc<ManualClock>, seed: u64) -> DexGossip {
    DexGossip::with_rng(clock.clone(), StdRng::seed_from_u64(seed))
}

fn broadcast_tagged(node: &mut DexGossip, tag_a: &str, payload: &str) {
    node.broadcast(&BroadcastRequest {
        payload,
        tag_a,
        vol_a: "1",
        ..Default::default()
    })
    .unwrap();
}

#[test]
fn test_purge_removes_exactly_the_aged_bucket() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut node = engine(&clock, 7);

    broadcast_tagged(&mut node, "x", "aa");
    clock.advance(1);
    broadcast_tagged(&mut node, "x", "bb");
    clock.advance(1);
    broadcast_tagged(&mut node, "x", "cc");
    assert_eq!(node.totals().0, 3);

    let before = node
        .list(&ListFilter { tag_a: "x", ..Default::default() })
        .unwrap();
    assert_eq!(before.n, 3);

    let purged = node.purge(T0);
    assert_eq!(purged, 1);
    assert_eq!(node.totals().0, 2);

    let after = node
        .list(&ListFilter { tag_a: "x", ..Default::default() })
        .unwrap();
    assert_eq!(after.n, 2);
    assert!(after.matches.iter().all(|m| m.timestamp != T0));
    assert!(after.matches.iter().any(|m| m.timestamp == T0 + 1));
    assert!(after.matches.iter().any(|m| m.timestamp == T0 + 2));

    // purging the same second again is a no-op
    assert_eq!(node.purge(T0), 0);
}

#[test]
fn test_purge_unlinks_pair_indices() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut node = engine(&clock, 8);
    node.broadcast(&BroadcastRequest {
        payload: "dd",
        tag_a: "btc",
        tag_b: "usd",
        vol_a: "1",
        ..Default::default()
    })
    .unwrap();
    node.purge(T0);
    for filter in [
        ListFilter { tag_a: "btc", tag_b: "usd", ..Default::default() },
        ListFilter { tag_a: "btc", ..Default::default() },
    ] {
        assert_eq!(node.list(&filter).unwrap().n, 0);
    }
}

#[test]
fn test_poll_catches_up_and_decays_pending() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut node = engine(&clock, 9);
    let mut peer = TestPeer::new(1);

    // establish the purge baseline
    node.on_poll(&mut peer);
    broadcast_tagged(&mut node, "gone", "ee");
    assert_eq!(node.totals().0, 1);

    // leave one get outstanding
    let ping = encode_ping(T0, T0 % PURGE_SECONDS, &[0x0bad_cafe]);
    node.on_message(&mut peer, &ping);
    assert_eq!(node.stats().num_pending, 1);

    // an hour minus the lag window later, the quote's bucket is due
    clock.set(T0 + PURGE_SECONDS - MAX_LAG + 1);
    node.on_poll(&mut peer);
    assert_eq!(node.totals().0, 0);
    assert_eq!(
        node.list(&ListFilter { tag_a: "gone", ..Default::default() })
            .unwrap()
            .n,
        0
    );
    // the decay swept the stuck pending entry down
    assert_eq!(node.stats().num_pending, 0);
}

#[test]
fn test_day_boundary_purge_resets_peer_maps() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut node = engine(&clock, 10);
    // a cutoff at the last second of a day exercises the reset branch
    let cutoff = (T0 / SECONDS_IN_DAY) * SECONDS_IN_DAY + SECONDS_IN_DAY - 1;
    assert_eq!(node.purge(cutoff), 0);
}
