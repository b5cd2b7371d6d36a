use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::constants::{NONCE_SIZE, TXPOW_BITS, TXPOW_MAGIC, TXPOW_MASK};
use crate::store::QuoteHash;

/// Hashes a frame from the byte after the relay byte, so forwarding (which
/// rewrites the relay byte) never changes a quote's identity.
pub fn quote_hash(frame: &[u8]) -> QuoteHash {
    let mut hasher = Sha256::new();
    hasher.update(&frame[1..]);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    QuoteHash(bytes)
}

/// Admission rule: the low TXPOW_BITS of the work word must equal the magic.
pub fn pow_ok(hash: &QuoteHash) -> bool {
    hash.work64() & TXPOW_MASK == TXPOW_MAGIC
}

/// Priority is the number of trailing zero bits above the admission suffix,
/// saturating at 64. Higher priorities cost the originator proportionally more
/// grinding.
pub fn priority(hash: &QuoteHash) -> u8 {
    (hash.work64() >> TXPOW_BITS).trailing_zeros() as u8
}

/// Grinds the trailing nonce until the frame passes admission and reaches the
/// target priority. Expected cost is `2^TXPOW_BITS * 2^target_priority` hashes.
pub fn grind(frame: &mut [u8], target_priority: u8, rng: &mut dyn RngCore) -> QuoteHash {
    let len = frame.len();
    let mut nonce = rng.next_u32();
    loop {
        frame[len - NONCE_SIZE..].copy_from_slice(&nonce.to_le_bytes());
        let hash = quote_hash(frame);
        if pow_ok(&hash) && priority(&hash) >= target_priority {
            return hash;
        }
        nonce = nonce.wrapping_add(1);
    }
}
