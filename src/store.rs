use std::fmt;

use crate::bitset::PeerBitmap;
use crate::constants::{HASH_MASK, NONCE_SIZE, NUM_AXES, PURGE_SECONDS};
use crate::error::DexError;
use crate::hashtable::{Find, ShortHashTable};

/// SHA-256 of a quote frame, computed from the byte after the relay byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuoteHash(pub [u8; 32]);

impl QuoteHash {
    /// Low 32 bits, the ring-store key.
    pub fn short(&self) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.0[0..4]);
        u32::from_le_bytes(b)
    }

    /// The second 64-bit word, carrying the admission suffix and priority bits.
    pub fn work64(&self) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&self.0[8..16]);
        u64::from_le_bytes(b)
    }
}

impl fmt::Debug for QuoteHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuoteHash(")?;
        for byte in self.0.iter() {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// Stable identity of a blob for its full lifetime: ring bucket plus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlobHandle {
    pub bucket: u16,
    pub slot: u16,
}

/// Doubly-linked sibling references within one secondary index axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AxisLink {
    pub prev: Option<BlobHandle>,
    pub next: Option<BlobHandle>,
}

/// One gossiped quote: the whole frame owned inline, plus routing metadata.
#[derive(Debug)]
pub struct Blob {
    pub hash: QuoteHash,
    /// Local epoch seconds at first receipt.
    pub recv_time: u32,
    /// Outbound push-forwards so far, capped at FANOUT.
    pub num_sent: u8,
    /// Index into `data` where the post-routing payload begins.
    pub payload_offset: u16,
    pub peers: PeerBitmap,
    pub links: [AxisLink; NUM_AXES],
    /// Owning index slot per axis, recorded on append so unlink can retarget
    /// tips and counts without a key lookup.
    pub index_slots: [Option<u8>; NUM_AXES],
    pub data: Vec<u8>,
}

impl Blob {
    pub fn relay(&self) -> u8 {
        self.data[0]
    }

    pub fn set_relay(&mut self, relay: u8) {
        self.data[0] = relay;
    }

    /// Originator timestamp from the routing header.
    pub fn timestamp(&self) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.data[2..6]);
        u32::from_le_bytes(b)
    }

    pub fn short(&self) -> u32 {
        self.hash.short()
    }

    /// Opaque payload bytes, between the quote header and the trailing nonce.
    pub fn payload(&self) -> &[u8] {
        &self.data[self.payload_offset as usize..self.data.len() - NONCE_SIZE]
    }
}

struct Bucket {
    hashes: ShortHashTable,
    blobs: Box<[Option<Box<Blob>>]>,
    occupied: u32,
}

impl Bucket {
    fn new() -> Self {
        Self {
            hashes: ShortHashTable::new(),
            blobs: (0..crate::constants::HASH_CAPACITY)
                .map(|_| None)
                .collect::<Vec<_>>()
                .into_boxed_slice(),
            occupied: 0,
        }
    }
}

/// Time-bucketed blob arena: a ring of `PURGE_SECONDS` buckets, each pairing a
/// short-hash table with its blob slots.
///
/// Buckets are allocated on first insert and released when their last blob is
/// removed, so resident memory tracks live data rather than ring geometry.
pub struct BlobStore {
    buckets: Vec<Option<Box<Bucket>>>,
}

impl Default for BlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore {
    pub fn new() -> Self {
        Self {
            buckets: (0..PURGE_SECONDS).map(|_| None).collect(),
        }
    }

    pub fn has_bucket(&self, bucket: u32) -> bool {
        self.buckets[bucket as usize].is_some()
    }

    pub fn find(&self, bucket: u32, short: u32) -> Find {
        match &self.buckets[bucket as usize] {
            Some(b) => b.hashes.find(short),
            None => Find::Open((short & HASH_MASK) as u16),
        }
    }

    /// Places a blob at the open slot a prior `find` returned.
    pub fn insert(&mut self, bucket: u32, slot: u16, blob: Blob) -> Result<BlobHandle, DexError> {
        let cell = &mut self.buckets[bucket as usize];
        let b = cell.get_or_insert_with(|| Box::new(Bucket::new()));
        if b.hashes.get(slot) != 0 || b.blobs[slot as usize].is_some() {
            return Err(DexError::SlotOccupied { bucket, slot });
        }
        let short = blob.short();
        b.hashes.insert(slot, short);
        b.blobs[slot as usize] = Some(Box::new(blob));
        b.occupied += 1;
        Ok(BlobHandle {
            bucket: bucket as u16,
            slot,
        })
    }

    /// Short-hash stored at a slot, 0 when empty or the bucket is unallocated.
    pub fn short_at(&self, bucket: u32, slot: u16) -> u32 {
        match &self.buckets[bucket as usize] {
            Some(b) => b.hashes.get(slot),
            None => 0,
        }
    }

    pub fn get(&self, handle: BlobHandle) -> Option<&Blob> {
        self.buckets[handle.bucket as usize]
            .as_ref()?
            .blobs[handle.slot as usize]
            .as_deref()
    }

    pub fn get_mut(&mut self, handle: BlobHandle) -> Option<&mut Blob> {
        self.buckets[handle.bucket as usize]
            .as_mut()?
            .blobs[handle.slot as usize]
            .as_deref_mut()
    }

    /// Removes a blob and clears its short-hash cell; releases the bucket when
    /// it empties.
    pub fn remove(&mut self, bucket: u32, slot: u16) -> Option<Box<Blob>> {
        let cell = &mut self.buckets[bucket as usize];
        let b = cell.as_mut()?;
        let blob = b.blobs[slot as usize].take()?;
        b.hashes.clear(slot);
        b.occupied -= 1;
        if b.occupied == 0 {
            *cell = None;
        }
        Some(blob)
    }

    /// Clears a short-hash cell that has no blob behind it.
    pub fn clear_hash(&mut self, bucket: u32, slot: u16) {
        if let Some(b) = self.buckets[bucket as usize].as_mut() {
            b.hashes.clear(slot);
        }
    }

    pub fn live_in_bucket(&self, bucket: u32) -> usize {
        self.buckets[bucket as usize]
            .as_ref()
            .map(|b| b.occupied as usize)
            .unwrap_or(0)
    }

    /// Ring-wide live count and XOR digest of stored short-hashes.
    pub fn totals(&self) -> (usize, u32) {
        let mut total = 0usize;
        let mut digest = 0u32;
        for bucket in self.buckets.iter().flatten() {
            for slot in 0..crate::constants::HASH_CAPACITY {
                let short = bucket.hashes.get(slot as u16);
                if short != 0 {
                    total += 1;
                    digest ^= short;
                }
            }
        }
        (total, digest)
    }
}
