//! The gossip engine: receive dispatch, push/ping scan, origination and the
//! purge loop.
//!
//! One `DexGossip` owns all protocol state. Every mutating entry point takes
//! `&mut self`; the host serializes calls (a coarse mutex or an actor loop)
//! and drives `on_poll` once per neighbor per heartbeat.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, warn};

use crate::constants::{
    BLAST_QUOTE_SIZE, FANOUT, FUNC_GET, FUNC_PING, FUNC_QUOTE, HASH_CAPACITY, HEARTBEAT, MAX_LAG,
    MAX_PRIORITY, MESSAGE_TAG, NONCE_SIZE, NUM_AXES, PURGE_SECONDS, RELAY_DEPTH, RELAY_SENTINEL,
    ROUTE_SIZE, SATOSHI, SECONDS_IN_DAY, TAG_SIZE,
};
use crate::error::DexError;
use crate::hashtable::{Find, PendingLookup, PendingTable};
use crate::index::IndexSet;
use crate::peers::{Neighbor, PeerSlotMap};
use crate::pow;
use crate::protocol::{self, QuoteHeader, RoutingHeader, TagBuf};
use crate::stats::EngineStats;
use crate::store::{Blob, BlobHandle, BlobStore, QuoteHash};
use crate::time::Clock;

/// Parameters of a locally originated quote.
#[derive(Debug, Clone, Copy, Default)]
pub struct BroadcastRequest<'a> {
    /// Hex payload, plain text payload, or the blast-mode literal `"ffff"`.
    pub payload: &'a str,
    /// Target priority, clamped to `MAX_PRIORITY`.
    pub priority: u8,
    pub tag_a: &'a str,
    pub tag_b: &'a str,
    /// 66 hex chars for a destination pubkey; anything else means none.
    pub dest_pub: &'a str,
    /// Volumes in whole coins, e.g. `"1.5"`; empty means zero.
    pub vol_a: &'a str,
    pub vol_b: &'a str,
}

pub struct DexGossip {
    pub(crate) store: BlobStore,
    pub(crate) indices: IndexSet,
    peers: PeerSlotMap,
    pending: PendingTable,
    pub(crate) stats: EngineStats,
    /// Next ring second to purge; 0 until the first poll establishes a baseline.
    purge_time: u32,
    /// Second of the most recent admission, for burst-mode polling.
    got_recent_quote: u32,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    purge_last_add: u32,
    purge_last_cutoff: u32,
}

impl DexGossip {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_rng(clock, StdRng::from_entropy())
    }

    pub fn with_rng(clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self {
            store: BlobStore::new(),
            indices: IndexSet::new(),
            peers: PeerSlotMap::new(),
            pending: PendingTable::new(),
            stats: EngineStats::default(),
            purge_time: 0,
            got_recent_quote: 0,
            clock,
            rng,
            purge_last_add: 0,
            purge_last_cutoff: 0,
        }
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    /// Ring-wide live blob count and XOR digest of their short-hashes.
    pub fn totals(&self) -> (usize, u32) {
        self.store.totals()
    }

    // --- receive dispatch ---

    /// Entry point for every inbound frame.
    pub fn on_message(&mut self, peer: &mut dyn Neighbor, frame: &[u8]) {
        let now = self.clock.now_epoch();
        let Some(pos) = self.peers.slot(now, peer.id()) else {
            warn!(peer = %peer.addr(), "no peer slot left this epoch, dropping frame");
            return;
        };
        let hdr = match protocol::decode_routing(frame) {
            Ok(hdr) => hdr,
            Err(_) => return,
        };
        let bucket = hdr.timestamp % PURGE_SECONDS;
        let lag = now.saturating_sub(hdr.timestamp);
        if hdr.timestamp > now + HEARTBEAT {
            self.stats.future_drops += 1;
            warn!(t = hdr.timestamp, now, "rejecting frame from the future");
            return;
        }
        if lag > MAX_LAG {
            self.stats.max_lag_drops += 1;
            return;
        }
        match hdr.funcid {
            FUNC_QUOTE => self.recv_quote(peer, pos, frame, hdr, now, bucket, lag),
            FUNC_PING => self.recv_ping(peer, now, frame),
            FUNC_GET => self.recv_get(peer, pos, frame),
            other => warn!(funcid = other, from = %peer.addr(), "unknown funcid"),
        }
    }

    fn recv_quote(
        &mut self,
        peer: &mut dyn Neighbor,
        pos: u16,
        frame: &[u8],
        hdr: RoutingHeader,
        now: u32,
        bucket: u32,
        lag: u32,
    ) {
        let hash = pow::quote_hash(frame);
        self.stats.total_recv += 1;
        if !pow::pow_ok(&hash) {
            self.stats.pow_rejects += 1;
            if self.stats.pow_rejects <= 10 {
                warn!(
                    work = format_args!("{:016x}", hash.work64()),
                    "rejecting quote with invalid work"
                );
            }
            return;
        }
        if hdr.relay > RELAY_DEPTH && hdr.relay != RELAY_SENTINEL {
            warn!(relay = hdr.relay, "unexpected relay depth");
            return;
        }
        let short = hash.short();
        let handle = match self.store.find(bucket, short) {
            Find::Found(slot) => {
                self.stats.duplicates += 1;
                Some(BlobHandle {
                    bucket: bucket as u16,
                    slot,
                })
            }
            Find::Open(slot) => match self.add_quote(now, bucket, slot, hash, frame) {
                Ok(handle) => {
                    if self.pending_lookup(short, true) == PendingLookup::Hit
                        && self.stats.num_pending > 0
                    {
                        self.stats.num_pending -= 1;
                    }
                    self.got_recent_quote = now;
                    if now > hdr.timestamp {
                        self.stats.total_lag += lag as i64;
                    }
                    Some(handle)
                }
                Err(err) => {
                    warn!(%err, from = %peer.addr(), "failed to add quote");
                    None
                }
            },
            Find::Full => {
                warn!(bucket, "hash bucket full");
                None
            }
        };
        if let Some(handle) = handle {
            if let Some(blob) = self.store.get_mut(handle) {
                blob.peers.set(pos as usize);
            }
        }
    }

    fn recv_ping(&mut self, peer: &mut dyn Neighbor, now: u32, frame: &[u8]) {
        let (bucket, recents) = match protocol::decode_ping(frame) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(%err, from = %peer.addr(), "bad ping");
                return;
            }
        };
        for short in recents {
            if self.stats.num_pending > HASH_CAPACITY as i32 {
                break;
            }
            if let Find::Found(_) = self.store.find(bucket, short) {
                continue;
            }
            if self.pending_lookup(short, false) == PendingLookup::Hit {
                continue;
            }
            self.pending.insert(short);
            self.stats.adds32 += 1;
            self.stats.num_pending += 1;
            let get = protocol::encode_get(now, short, bucket);
            peer.push_message(MESSAGE_TAG, &get);
        }
    }

    fn recv_get(&mut self, peer: &mut dyn Neighbor, pos: u16, frame: &[u8]) {
        let (short, bucket) = match protocol::decode_get(frame) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(%err, from = %peer.addr(), "bad get");
                return;
            }
        };
        if let Find::Found(slot) = self.store.find(bucket, short) {
            let handle = BlobHandle {
                bucket: bucket as u16,
                slot,
            };
            let known = self
                .store
                .get(handle)
                .map(|b| b.peers.get(pos as usize))
                .unwrap_or(true);
            if !known {
                // get responses are leaves, never re-broadcast
                self.send_blob(peer, pos, handle, 0);
            }
        }
    }

    fn pending_lookup(&mut self, short: u32, clear: bool) -> PendingLookup {
        self.stats.lookups32 += 1;
        let result = self.pending.lookup(short, clear);
        if result == PendingLookup::Collision {
            self.stats.collisions32 += 1;
        }
        result
    }

    /// Installs a new blob at the open slot a prior find returned: decodes its
    /// header, decrements the hop counter, stores it and updates the indices.
    fn add_quote(
        &mut self,
        now: u32,
        bucket: u32,
        slot: u16,
        hash: QuoteHash,
        frame: &[u8],
    ) -> Result<BlobHandle, DexError> {
        if !pow::pow_ok(&hash) {
            return Err(DexError::PowFailed);
        }
        let (header, header_len) = QuoteHeader::decode(&frame[ROUTE_SIZE..])?;
        let payload_offset = ROUTE_SIZE + header_len;
        if frame.len() < payload_offset + NONCE_SIZE {
            return Err(DexError::Truncated);
        }
        let mut data = frame.to_vec();
        if data[0] != RELAY_SENTINEL {
            data[0] = data[0].saturating_sub(1);
        }
        let blob = Blob {
            hash,
            recv_time: now,
            num_sent: 0,
            payload_offset: payload_offset as u16,
            peers: Default::default(),
            links: Default::default(),
            index_slots: [None; NUM_AXES],
            data,
        };
        let handle = self.store.insert(bucket, slot, blob)?;
        self.stats.total_added += 1;
        let mask = self.indices.update_tips(&mut self.store, handle, &header);
        if mask >> 16 != 0 {
            self.stats.index_full_errors += 1;
            warn!(
                bucket,
                slot,
                mask = format_args!("{mask:08x}"),
                "error updating index tips"
            );
        }
        Ok(handle)
    }

    /// Marks the peer present, rewrites the relay byte and hands the frame to
    /// the host. The presence bit is set before the send so re-entry on the
    /// same blob suppresses a second copy.
    fn send_blob(
        &mut self,
        peer: &mut dyn Neighbor,
        pos: u16,
        handle: BlobHandle,
        relay_byte: u8,
    ) -> usize {
        let packet = match self.store.get_mut(handle) {
            Some(blob) => {
                blob.peers.set(pos as usize);
                let mut packet = blob.data.clone();
                packet[0] = relay_byte;
                packet
            }
            None => return 0,
        };
        peer.push_message(MESSAGE_TAG, &packet);
        self.stats.total_sent += 1;
        packet.len()
    }

    // --- push / ping ---

    /// Scans one bucket for blobs the peer lacks: fresh ones within the fanout
    /// budget are pushed outright, everything else is advertised in a single
    /// ping so the peer can pull the gaps.
    fn push_bucket(&mut self, now: u32, bucket: u32, peer: &mut dyn Neighbor, pos: u16) -> usize {
        if !self.store.has_bucket(bucket) {
            return 0;
        }
        let mut recents = Vec::new();
        for slot in 0..HASH_CAPACITY as u16 {
            let short = self.store.short_at(bucket, slot);
            if short == 0 {
                continue;
            }
            let handle = BlobHandle {
                bucket: bucket as u16,
                slot,
            };
            let Some(blob) = self.store.get(handle) else {
                continue;
            };
            let t = blob.timestamp();
            if now >= t + MAX_LAG {
                continue;
            }
            if blob.peers.get(pos as usize) {
                continue;
            }
            recents.push(short);
            let relay = blob.relay();
            if blob.num_sent < FANOUT
                && self.stats.num_pending < (HASH_CAPACITY / 8) as i32
                && (1..=RELAY_DEPTH).contains(&relay)
                && now < t + HEARTBEAT
            {
                self.send_blob(peer, pos, handle, relay);
                if let Some(blob) = self.store.get_mut(handle) {
                    blob.num_sent += 1;
                }
            }
        }
        if !recents.is_empty() {
            let ping = protocol::encode_ping(now, bucket, &recents);
            peer.push_message(MESSAGE_TAG, &ping);
        }
        recents.len()
    }

    /// Heartbeat hook, called by the host once per neighbor per second.
    ///
    /// Catches the purge clock up first. Then, in burst mode or once per
    /// heartbeat, walks the most recent third of the lag window pushing and
    /// advertising to this peer.
    pub fn on_poll(&mut self, peer: &mut dyn Neighbor) {
        let now = self.clock.now_epoch();
        let ptime = now.saturating_sub(PURGE_SECONDS - MAX_LAG);
        if ptime > self.purge_time {
            if self.purge_time == 0 {
                self.purge_time = ptime;
            } else {
                while self.purge_time < ptime {
                    let cutoff = self.purge_time;
                    self.purge(cutoff);
                    self.purge_time += 1;
                }
            }
            // decay pending to compensate for hash-collision remnants
            self.stats.num_pending = (self.stats.num_pending as f64 * 0.995) as i32;
        }
        let Some(pos) = self.peers.slot(now, peer.id()) else {
            return;
        };
        let burst = now == self.got_recent_quote && now > peer.last_ping();
        if burst || now >= peer.last_ping() + HEARTBEAT {
            for i in 0..MAX_LAG / 3 {
                let bucket = (now + 1).wrapping_sub(i) % PURGE_SECONDS;
                if self.push_bucket(now, bucket, peer, pos) > 0 {
                    peer.set_last_ping(now);
                }
            }
        }
    }

    // --- purge ---

    /// Frees every blob of the ring second `cutoff`, unlinking indices first.
    /// At the last second of a day the peer-slot map is cleared as well.
    pub fn purge(&mut self, cutoff: u32) -> usize {
        if cutoff % SECONDS_IN_DAY == SECONDS_IN_DAY - 1 {
            debug!("resetting peer maps at end of day");
            self.peers.reset();
        }
        let bucket = cutoff % PURGE_SECONDS;
        let mut n = 0usize;
        let mut lag_sum = 0i64;
        if self.store.has_bucket(bucket) {
            for slot in 0..HASH_CAPACITY as u16 {
                let short = self.store.short_at(bucket, slot);
                if short == 0 {
                    continue;
                }
                let handle = BlobHandle {
                    bucket: bucket as u16,
                    slot,
                };
                match self.store.get(handle) {
                    Some(blob) => {
                        let t = blob.timestamp();
                        if t != cutoff {
                            warn!(bucket, slot, t, cutoff, "unexpected timestamp in purge");
                        }
                        if blob.recv_time < t {
                            warn!(lag = blob.recv_time as i64 - t as i64, "timewarped recvtime");
                        } else {
                            lag_sum += (blob.recv_time - t) as i64;
                        }
                        self.indices.unlink(&mut self.store, handle);
                        self.store.remove(bucket, slot);
                        n += 1;
                    }
                    None => {
                        warn!(bucket, slot, short, "hash cell without blob");
                        self.store.clear_hash(bucket, slot);
                    }
                }
            }
        }
        if n != 0 || bucket % 60 == 0 {
            let (total, digest) = self.store.totals();
            let elapsed = cutoff.saturating_sub(self.purge_last_cutoff).max(1);
            debug!(
                bucket,
                cutoff,
                purged = n,
                live = total,
                digest = format_args!("{digest:08x}"),
                recv = self.stats.total_recv,
                sent = self.stats.total_sent,
                added = self.stats.total_added,
                duplicates = self.stats.duplicates,
                pending = self.stats.num_pending,
                ave_purge_lag = if n > 0 { lag_sum as f64 / n as f64 } else { 0.0 },
                adds_per_sec = (self.stats.total_added - self.purge_last_add) / elapsed,
                "purge"
            );
            self.purge_last_add = self.stats.total_added;
            self.purge_last_cutoff = cutoff;
        }
        n
    }

    // --- origination ---

    /// Assembles, grinds and locally ingests a quote, so the originator's own
    /// store and indices see it before the next poll pushes it out. Returns
    /// the frame size, or 0 when the quote was a duplicate at origin.
    pub fn broadcast(&mut self, req: &BroadcastRequest<'_>) -> Result<usize, DexError> {
        if req.tag_a.len() >= TAG_SIZE {
            return Err(DexError::TagTooLong(req.tag_a.len()));
        }
        if req.tag_b.len() >= TAG_SIZE {
            return Err(DexError::TagTooLong(req.tag_b.len()));
        }
        let priority = req.priority.min(MAX_PRIORITY);
        let blast = req.payload == "ffff";
        let amount_a = parse_volume(req.vol_a)?;
        let amount_b = parse_volume(req.vol_b)?;
        let header = QuoteHeader {
            amount_a,
            amount_b,
            dest_pub: parse_destpub(req.dest_pub),
            tag_a: TagBuf::from_slice(req.tag_a.as_bytes()),
            tag_b: TagBuf::from_slice(req.tag_b.as_bytes()),
        };
        let mut sent = 0usize;
        for _ in 0..10 {
            let payload = if blast {
                let mut random = vec![0u8; BLAST_QUOTE_SIZE.saturating_sub(header.encoded_len())];
                self.rng.fill_bytes(&mut random);
                random
            } else {
                payload_bytes(req.payload)
            };
            let now = self.clock.now_epoch();
            let bucket = now % PURGE_SECONDS;
            let mut frame = protocol::encode_quote(now, &header, &payload);
            let hash = pow::grind(&mut frame, priority, &mut self.rng);
            match self.store.find(bucket, hash.short()) {
                Find::Found(_) => {
                    warn!(
                        bucket,
                        short = format_args!("{:08x}", hash.short()),
                        "cannot issue duplicate order"
                    );
                    self.rng = StdRng::seed_from_u64(now as u64);
                }
                Find::Open(slot) => match self.add_quote(now, bucket, slot, hash, &frame) {
                    Ok(_) => sent += frame.len(),
                    Err(err) => warn!(%err, "error issuing order"),
                },
                Find::Full => warn!(bucket, "hash bucket full"),
            }
            if !blast {
                break;
            }
        }
        Ok(sent)
    }
}

fn parse_volume(vol: &str) -> Result<u64, DexError> {
    if vol.is_empty() {
        return Ok(0);
    }
    let coins: f64 = vol
        .parse()
        .map_err(|_| DexError::InvalidVolume(vol.to_string()))?;
    Ok((coins * SATOSHI as f64 + 0.0000000049) as u64)
}

fn parse_destpub(dest_pub: &str) -> Option<[u8; 33]> {
    if dest_pub.len() != 66 {
        return None;
    }
    let raw = hex::decode(dest_pub).ok()?;
    let mut pk = [0u8; 33];
    pk.copy_from_slice(&raw);
    Some(pk)
}

/// A full hex string decodes to raw bytes; anything else is carried as text
/// with a terminating NUL so readers can tell the two apart.
fn payload_bytes(payload: &str) -> Vec<u8> {
    if payload.is_empty() {
        return Vec::new();
    }
    if payload.len() % 2 == 0 {
        if let Ok(raw) = hex::decode(payload) {
            return raw;
        }
    }
    let mut text = payload.as_bytes().to_vec();
    text.push(0);
    text
}
