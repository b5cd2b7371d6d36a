//! # DEX Gossip
//!
//! A sans-I/O gossip engine for short-lived trading quotes on a peer-to-peer
//! overlay. Peers exchange opaque datablobs carrying volumes and tags using a
//! hybrid push/poll/pull protocol: new quotes are pushed a bounded number of
//! hops deep, per-peer pings advertise recent short-hashes, and gaps are
//! pulled with direct get requests.
//!
//! ## Architecture
//!
//! - **Store**: a ring of per-second buckets pairing an open-addressed
//!   short-hash table with owned blob slots; blobs die when the ring pointer
//!   returns to their bucket.
//! - **Indices**: three axes (destination pubkey, single tag, tag pair) of
//!   doubly-linked lists threaded through the blobs, newest first.
//! - **Admission**: a SHA-256 proof-of-work suffix; extra leading work encodes
//!   an originator-chosen priority.
//! - **Delivery**: at most once per peer, enforced by a per-blob presence
//!   bitmap that is set before any send.
//! - **Host seam**: the engine never performs I/O. The host feeds frames to
//!   [`DexGossip::on_message`], drives [`DexGossip::on_poll`] once per
//!   neighbor per heartbeat, and implements [`Neighbor`] for its peer handles.
//!
//! All state is in-memory and time-bounded; nothing survives a restart.

pub mod bitset;
pub mod constants;
pub mod engine;
pub mod error;
pub mod hashtable;
pub mod index;
pub mod peers;
pub mod pow;
pub mod protocol;
pub mod query;
pub mod stats;
pub mod store;
pub mod testing;
pub mod time;

pub use bitset::PeerBitmap;
pub use engine::{BroadcastRequest, DexGossip};
pub use error::DexError;
pub use peers::Neighbor;
pub use query::{ListFilter, ListResponse, QuoteItem};
pub use stats::EngineStats;
pub use store::{BlobHandle, QuoteHash};
pub use time::{Clock, ManualClock, SystemClock};
