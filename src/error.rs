use thiserror::Error;

/// Errors surfaced by the gossip core.
///
/// All ingress errors are local: a malformed or rejected frame is logged,
/// counted and dropped, never answered. Only the origination and query entry
/// points return errors to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DexError {
    #[error("frame truncated")]
    Truncated,
    #[error("invalid destination pubkey length {0}")]
    InvalidPubkeyLength(u8),
    #[error("invalid tag length {0}")]
    InvalidTagLength(u8),
    #[error("ping size mismatch")]
    BadPingSize,
    #[error("illegal bucket {0}")]
    IllegalBucket(u32),
    #[error("tag too long ({0} bytes)")]
    TagTooLong(usize),
    #[error("invalid volume: {0}")]
    InvalidVolume(String),
    #[error("illegal amount range")]
    InvalidRange,
    #[error("slot {slot} of bucket {bucket} already occupied")]
    SlotOccupied { bucket: u32, slot: u16 },
    #[error("hash bucket {0} full")]
    BucketFull(u32),
    #[error("index axis {0} full")]
    AxisFull(usize),
    #[error("quote failed proof of work")]
    PowFailed,
}
