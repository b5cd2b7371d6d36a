//! Fundamental and derived constants of the quote-gossip protocol.

// --- Routing ---

/// Size of the routing header present on every frame: relay + funcid + timestamp.
pub const ROUTE_SIZE: usize = 6;

/// Poll cadence in seconds. The host calls `on_poll` once per neighbor per heartbeat.
pub const HEARTBEAT: u32 = 1;

/// Most distant node pair after the push phase.
pub const MAX_HOPS: u32 = 10;

/// Maximum acceptable frame age. Two thirds of this budget is left for the
/// ping/get round trip after the push phase.
pub const MAX_LAG: u32 = 60 + HEARTBEAT * MAX_HOPS;

/// Initial hop counter of an originated quote.
pub const RELAY_DEPTH: u8 = MAX_HOPS as u8;

/// Relay byte value that is never decremented and never decays.
pub const RELAY_SENTINEL: u8 = 0xff;

/// Maximum number of peers a single blob is push-forwarded to from one node.
pub const FANOUT: u8 = 3;

// --- Store geometry ---

pub const HASH_LOG2: u32 = 14;

/// Slots per time bucket; the effective limit of sustained quotes per second.
pub const HASH_CAPACITY: usize = 1 << HASH_LOG2;

pub const HASH_MASK: u32 = (HASH_CAPACITY - 1) as u32;

/// Ring length in seconds. A bucket is reused (and must be purged) after this long.
pub const PURGE_SECONDS: u32 = 3600;

// --- Peers ---

/// Words of the per-blob presence bitmap (1024 bits).
pub const PEER_MASK_WORDS: usize = 16;

/// Peer-slot ids per epoch. Slot 0 is the reserved empty sentinel.
pub const MAX_PEER_ID: usize = PEER_MASK_WORDS * 64;

pub const SECONDS_IN_DAY: u32 = 24 * 3600;

/// Length of one peer-slot epoch. Must divide SECONDS_IN_DAY evenly.
pub const PEER_EPOCH_SECONDS: u32 = 300;

pub const PEER_EPOCHS: usize = (SECONDS_IN_DAY / PEER_EPOCH_SECONDS) as usize;

// --- Secondary indices ---

/// Maximum tag length accepted at decode.
pub const TAG_SIZE: usize = 16;

/// Longest index key: destpub is 1+33, a tag pair is 1+16+1+16.
pub const MAX_KEY_SIZE: usize = 34;

/// Indices per axis.
pub const MAX_INDEX: usize = 64;

/// Axes: destpub, single tag, ordered tag pair.
pub const NUM_AXES: usize = 3;

// --- Proof of work ---

/// Highest originator-selectable priority.
pub const MAX_PRIORITY: u8 = 20;

/// Admission difficulty: a valid quote costs 2^TXPOW_BITS hash attempts on average.
pub const TXPOW_BITS: u32 = 12;

pub const TXPOW_MASK: u64 = (1 << TXPOW_BITS) - 1;

/// Required value of the masked work word.
pub const TXPOW_MAGIC: u64 = 0x777 & TXPOW_MASK;

/// Trailing nonce length of a quote frame.
pub const NONCE_SIZE: usize = 4;

// --- Pull bookkeeping ---

/// Cells of the outstanding-get table.
pub const PENDING_CAPACITY: usize = MAX_LAG as usize * HASH_CAPACITY - 1;

// --- Misc ---

/// Satoshi units per whole coin, for volume parsing.
pub const SATOSHI: u64 = 100_000_000;

/// Host message tag for all frames of this protocol.
pub const MESSAGE_TAG: &str = "DEX";

/// Total quote size (header + random payload) minted per iteration in blast mode.
pub const BLAST_QUOTE_SIZE: usize = 512;

pub const FUNC_QUOTE: u8 = b'Q';
pub const FUNC_PING: u8 = b'P';
pub const FUNC_GET: u8 = b'G';
