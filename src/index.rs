//! Secondary indices over live blobs.
//!
//! Three axes, each an array of up to 64 indices: destination pubkey, single
//! tag, and ordered tag pair. Each index is a doubly-linked list threaded
//! through the blobs themselves, tip pointing at the most recent append.

use std::fmt;

use tracing::warn;

use crate::constants::{MAX_INDEX, MAX_KEY_SIZE, NUM_AXES, TAG_SIZE};
use crate::error::DexError;
use crate::protocol::QuoteHeader;
use crate::store::{AxisLink, BlobHandle, BlobStore};

pub const AXIS_DESTPUB: usize = 0;
pub const AXIS_TAG: usize = 1;
pub const AXIS_TAG_PAIR: usize = 2;

/// Length-prefixed index key, at most 34 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexKey {
    len: u8,
    bytes: [u8; MAX_KEY_SIZE],
}

impl IndexKey {
    const EMPTY: IndexKey = IndexKey {
        len: 0,
        bytes: [0; MAX_KEY_SIZE],
    };

    /// `[33][33 bytes pubkey]`
    pub fn destpub(pk: &[u8; 33]) -> Self {
        let mut bytes = [0u8; MAX_KEY_SIZE];
        bytes[0] = 33;
        bytes[1..34].copy_from_slice(pk);
        Self { len: 34, bytes }
    }

    /// `[len][tag bytes]`
    pub fn single_tag(tag: &[u8]) -> Self {
        debug_assert!(tag.len() <= TAG_SIZE);
        let mut bytes = [0u8; MAX_KEY_SIZE];
        bytes[0] = tag.len() as u8;
        bytes[1..1 + tag.len()].copy_from_slice(tag);
        Self {
            len: (1 + tag.len()) as u8,
            bytes,
        }
    }

    /// `[lenA][tagA][lenB][tagB]`
    pub fn tag_pair(tag_a: &[u8], tag_b: &[u8]) -> Self {
        debug_assert!(tag_a.len() <= TAG_SIZE && tag_b.len() <= TAG_SIZE);
        let mut bytes = [0u8; MAX_KEY_SIZE];
        let mut len = 0usize;
        bytes[len] = tag_a.len() as u8;
        len += 1;
        bytes[len..len + tag_a.len()].copy_from_slice(tag_a);
        len += tag_a.len();
        bytes[len] = tag_b.len() as u8;
        len += 1;
        bytes[len..len + tag_b.len()].copy_from_slice(tag_b);
        len += tag_b.len();
        Self {
            len: len as u8,
            bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let key = self.as_bytes();
        if key.is_empty() {
            return Ok(());
        }
        if key.len() == 34 {
            for byte in &key[1..] {
                write!(f, "{:02x}", byte)?;
            }
            return Ok(());
        }
        let len_a = key[0] as usize;
        if len_a + 1 == key.len() {
            write!(f, "{}", String::from_utf8_lossy(&key[1..1 + len_a]))
        } else if len_a + 2 <= key.len() {
            let len_b = key[1 + len_a] as usize;
            write!(
                f,
                "{}/{}",
                String::from_utf8_lossy(&key[1..1 + len_a]),
                String::from_utf8_lossy(&key[2 + len_a..2 + len_a + len_b])
            )
        } else {
            write!(f, "?")
        }
    }
}

/// One index: its key, the most-recently-appended blob, and a live count.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    pub key: IndexKey,
    pub tip: Option<BlobHandle>,
    pub count: u32,
}

impl IndexEntry {
    const EMPTY: IndexEntry = IndexEntry {
        key: IndexKey::EMPTY,
        tip: None,
        count: 0,
    };
}

/// The three axis arrays.
pub struct IndexSet {
    axes: [[IndexEntry; MAX_INDEX]; NUM_AXES],
}

impl Default for IndexSet {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexSet {
    pub fn new() -> Self {
        Self {
            axes: [[IndexEntry::EMPTY; MAX_INDEX]; NUM_AXES],
        }
    }

    pub fn entry(&self, axis: usize, slot: usize) -> &IndexEntry {
        &self.axes[axis][slot]
    }

    /// Finds the index holding this key. An index keeps its key once claimed,
    /// even while its list is empty, so a drained index is found again when a
    /// matching quote next arrives.
    pub fn search(&self, axis: usize, key: &IndexKey) -> Option<usize> {
        self.axes[axis]
            .iter()
            .position(|e| !e.key.is_empty() && e.key == *key)
    }

    fn append(&mut self, store: &mut BlobStore, axis: usize, slot: usize, handle: BlobHandle) {
        let prev_tip = self.axes[axis][slot].tip;
        if let Some(blob) = store.get_mut(handle) {
            blob.links[axis] = AxisLink {
                prev: prev_tip,
                next: None,
            };
            blob.index_slots[axis] = Some(slot as u8);
        }
        if let Some(old) = prev_tip {
            if let Some(old_tip) = store.get_mut(old) {
                old_tip.links[axis].next = Some(handle);
            }
        }
        let entry = &mut self.axes[axis][slot];
        entry.tip = Some(handle);
        entry.count += 1;
    }

    /// Appends the blob to the index with this key, claiming a free index when
    /// the key is new. A full axis fails; the blob stays stored unindexed on
    /// that axis.
    pub fn search_or_create(
        &mut self,
        store: &mut BlobStore,
        axis: usize,
        key: &IndexKey,
        handle: BlobHandle,
    ) -> Result<usize, DexError> {
        let slot = match self.search(axis, key) {
            Some(slot) => slot,
            None => {
                let slot = self.axes[axis]
                    .iter()
                    .position(|e| e.key.is_empty())
                    .ok_or(DexError::AxisFull(axis))?;
                self.axes[axis][slot].key = *key;
                slot
            }
        };
        self.append(store, axis, slot, handle);
        Ok(slot)
    }

    /// Registers a freshly stored blob on every axis its header names.
    ///
    /// Axis 1 carries the single tag: tagA when present, else tagB alone.
    /// Returns a bitmask of updated axes, with failure bits shifted 16.
    pub fn update_tips(
        &mut self,
        store: &mut BlobStore,
        handle: BlobHandle,
        header: &QuoteHeader,
    ) -> u32 {
        let mut mask = 0u32;
        let has_a = !header.tag_a.is_empty();
        let has_b = !header.tag_b.is_empty();
        if header.dest_pub.is_none() && !has_a && !has_b {
            return 0;
        }
        if let Some(pk) = &header.dest_pub {
            mask |= self.apply(store, AXIS_DESTPUB, &IndexKey::destpub(pk), handle);
        }
        if has_a {
            mask |= self.apply(store, AXIS_TAG, &IndexKey::single_tag(&header.tag_a), handle);
            if has_b {
                mask |= self.apply(
                    store,
                    AXIS_TAG_PAIR,
                    &IndexKey::tag_pair(&header.tag_a, &header.tag_b),
                    handle,
                );
            }
        } else if has_b {
            mask |= self.apply(store, AXIS_TAG, &IndexKey::single_tag(&header.tag_b), handle);
        }
        mask
    }

    fn apply(
        &mut self,
        store: &mut BlobStore,
        axis: usize,
        key: &IndexKey,
        handle: BlobHandle,
    ) -> u32 {
        match self.search_or_create(store, axis, key, handle) {
            Ok(_) => 1 << axis,
            Err(_) => {
                warn!(axis, key = %key, "index axis full, quote stored unindexed");
                1 << (axis + 16)
            }
        }
    }

    /// Splices the blob out of every axis list it is on, retargeting tips and
    /// counts through the owning slots recorded at append time.
    pub fn unlink(&mut self, store: &mut BlobStore, handle: BlobHandle) {
        for axis in 0..NUM_AXES {
            let (link, owner) = match store.get(handle) {
                Some(blob) => (blob.links[axis], blob.index_slots[axis]),
                None => return,
            };
            if let Some(next) = link.next {
                if let Some(next_blob) = store.get_mut(next) {
                    if next_blob.links[axis].prev != Some(handle) {
                        warn!(axis, ?next, "unlink found inconsistent sibling link");
                    }
                    next_blob.links[axis].prev = link.prev;
                }
            }
            if let Some(prev) = link.prev {
                if let Some(prev_blob) = store.get_mut(prev) {
                    prev_blob.links[axis].next = link.next;
                }
            }
            if let Some(slot) = owner {
                let entry = &mut self.axes[axis][slot as usize];
                if entry.tip == Some(handle) {
                    entry.tip = link.prev;
                }
                entry.count = entry.count.saturating_sub(1);
            }
            if let Some(blob) = store.get_mut(handle) {
                blob.links[axis] = AxisLink::default();
                blob.index_slots[axis] = None;
            }
        }
    }
}
