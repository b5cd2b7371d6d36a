use std::sync::Arc;

use dex_gossip::constants::{FUNC_GET, FUNC_PING, FUNC_QUOTE};
use dex_gossip::testing::TestPeer;
use dex_gossip::time::ManualClock;
use dex_gossip::{BroadcastRequest, DexGossip, ListFilter};
use rand::rngs::StdRng;
use rand::SeedableRng;

const T0: u32 = 1_700_000_000;

fn engine(clock: &Arc<ManualClock>, seed: u64) -> DexGossip {
    DexGossip::with_rng(clock.clone(), StdRng::seed_from_u64(seed))
}

/// Chain A - B - C with the B->C link down for the first second: the ping in
/// the second heartbeat advertises the quote and C pulls it with a get.
#[test]
fn test_pull_fills_gap() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut a = engine(&clock, 1);
    let mut b = engine(&clock, 2);
    let mut c = engine(&clock, 3);

    a.broadcast(&BroadcastRequest {
        payload: "cafe",
        tag_a: "btc",
        tag_b: "usd",
        vol_a: "0.5",
        ..Default::default()
    })
    .unwrap();

    // t0: A -> B delivers; the B -> C link is down, so B never polls C
    let mut b_from_a = TestPeer::new(20);
    a.on_poll(&mut b_from_a);
    let mut a_from_b = TestPeer::new(10);
    for frame in b_from_a.drain() {
        b.on_message(&mut a_from_b, &frame);
    }
    assert_eq!(b.totals().0, 1);
    assert_eq!(c.totals().0, 0);

    // t1: the link is back; the quote is no longer fresh so B only pings
    clock.advance(1);
    let mut c_from_b = TestPeer::new(30);
    b.on_poll(&mut c_from_b);
    let frames = c_from_b.drain();
    assert!(frames.iter().all(|f| f[1] != FUNC_QUOTE));
    assert!(frames.iter().any(|f| f[1] == FUNC_PING));

    // C spots the gap and pulls
    let mut b_from_c = TestPeer::new(21);
    for frame in &frames {
        c.on_message(&mut b_from_c, frame);
    }
    let gets = b_from_c.drain();
    assert_eq!(gets.len(), 1);
    assert_eq!(gets[0][1], FUNC_GET);
    assert_eq!(c.stats().num_pending, 1);

    // B answers the get with the blob, relay byte zeroed
    let mut c_from_b = TestPeer::new(30);
    for frame in &gets {
        b.on_message(&mut c_from_b, frame);
    }
    let replies = c_from_b.drain();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0][1], FUNC_QUOTE);
    assert_eq!(replies[0][0], 0);

    for frame in &replies {
        c.on_message(&mut b_from_c, frame);
    }
    assert_eq!(c.totals().0, 1);
    // the returning quote claimed its pending cell
    assert_eq!(c.stats().num_pending, 0);
    let resp = c
        .list(&ListFilter {
            tag_a: "btc",
            tag_b: "usd",
            ..Default::default()
        })
        .unwrap();
    assert_eq!(resp.n, 1);
}

/// A get for a blob the peer is already marked on elicits nothing.
#[test]
fn test_get_served_at_most_once() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut a = engine(&clock, 1);
    let mut b = engine(&clock, 2);

    a.broadcast(&BroadcastRequest {
        payload: "beef",
        tag_a: "one",
        vol_a: "1",
        ..Default::default()
    })
    .unwrap();
    let mut b_from_a = TestPeer::new(20);
    a.on_poll(&mut b_from_a);
    let mut a_from_b = TestPeer::new(10);
    for frame in b_from_a.drain() {
        b.on_message(&mut a_from_b, &frame);
    }

    // C pings B by hand: first get is served, the repeat is suppressed
    let resp = b.list(&ListFilter { tag_a: "one", ..Default::default() }).unwrap();
    let short = resp.matches[0].id;
    let bucket = resp.matches[0].timestamp % dex_gossip::constants::PURGE_SECONDS;
    let get = dex_gossip::protocol::encode_get(clock_now(&clock), short, bucket);

    let mut c_handle = TestPeer::new(30);
    b.on_message(&mut c_handle, &get);
    assert_eq!(c_handle.outbox.len(), 1);
    b.on_message(&mut c_handle, &get);
    assert_eq!(c_handle.outbox.len(), 1, "second get must be suppressed");
    assert_eq!(b.stats().total_sent, 1);
}

fn clock_now(clock: &Arc<ManualClock>) -> u32 {
    use dex_gossip::time::Clock;
    clock.now_epoch()
}

/// Pings advertising hashes the receiver already holds elicit no gets.
#[test]
fn test_ping_of_known_hashes_is_quiet() {
    let clock = Arc::new(ManualClock::new(T0));
    let mut a = engine(&clock, 1);
    let mut b = engine(&clock, 2);

    a.broadcast(&BroadcastRequest {
        payload: "feed",
        tag_a: "tag",
        vol_a: "2",
        ..Default::default()
    })
    .unwrap();
    let mut b_from_a = TestPeer::new(20);
    a.on_poll(&mut b_from_a);
    let frames = b_from_a.drain();
    let mut a_from_b = TestPeer::new(10);
    for frame in &frames {
        b.on_message(&mut a_from_b, frame);
    }
    a_from_b.drain();

    // replaying just the pings changes nothing
    for frame in frames.iter().filter(|f| f[1] == FUNC_PING) {
        b.on_message(&mut a_from_b, frame);
    }
    assert!(a_from_b.outbox.is_empty());
    assert_eq!(b.stats().num_pending, 0);
}
