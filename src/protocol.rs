//! Wire codec for the three frame kinds.
//!
//! Every frame starts with the 6-byte routing header
//! `[relay][funcid][timestamp u32]`. All multi-byte integers are
//! little-endian.

use smallvec::SmallVec;

use crate::constants::{
    FUNC_GET, FUNC_PING, FUNC_QUOTE, NONCE_SIZE, PURGE_SECONDS, RELAY_DEPTH, ROUTE_SIZE, TAG_SIZE,
};
use crate::error::DexError;

/// Inline-allocated tag bytes.
pub type TagBuf = SmallVec<[u8; TAG_SIZE]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingHeader {
    pub relay: u8,
    pub funcid: u8,
    pub timestamp: u32,
}

fn read_u16(buf: &[u8], at: usize) -> u16 {
    let mut b = [0u8; 2];
    b.copy_from_slice(&buf[at..at + 2]);
    u16::from_le_bytes(b)
}

fn read_u32(buf: &[u8], at: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[at..at + 4]);
    u32::from_le_bytes(b)
}

fn read_u64(buf: &[u8], at: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[at..at + 8]);
    u64::from_le_bytes(b)
}

pub fn decode_routing(frame: &[u8]) -> Result<RoutingHeader, DexError> {
    if frame.len() < ROUTE_SIZE {
        return Err(DexError::Truncated);
    }
    Ok(RoutingHeader {
        relay: frame[0],
        funcid: frame[1],
        timestamp: read_u32(frame, 2),
    })
}

/// Decoded quote header: volumes, optional destination pubkey and up to two
/// tags, in their wire order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QuoteHeader {
    pub amount_a: u64,
    pub amount_b: u64,
    pub dest_pub: Option<[u8; 33]>,
    pub tag_a: TagBuf,
    pub tag_b: TagBuf,
}

impl QuoteHeader {
    pub fn encoded_len(&self) -> usize {
        let mut len = 8 + 8 + 3;
        if self.dest_pub.is_some() {
            len += 33;
        }
        len + self.tag_a.len() + self.tag_b.len()
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&self.amount_a.to_le_bytes());
        out.extend_from_slice(&self.amount_b.to_le_bytes());
        match &self.dest_pub {
            Some(pk) => {
                out.push(33);
                out.extend_from_slice(pk);
            }
            None => out.push(0),
        }
        out.push(self.tag_a.len() as u8);
        out.extend_from_slice(&self.tag_a);
        out.push(self.tag_b.len() as u8);
        out.extend_from_slice(&self.tag_b);
        out
    }

    /// Decodes a quote header from the body after the routing header, returning
    /// it with the number of bytes consumed.
    pub fn decode(body: &[u8]) -> Result<(Self, usize), DexError> {
        if body.len() < 8 + 8 + 3 {
            return Err(DexError::Truncated);
        }
        let mut offset = 0usize;
        let amount_a = read_u64(body, offset);
        offset += 8;
        let amount_b = read_u64(body, offset);
        offset += 8;
        let plen = body[offset];
        offset += 1;
        let dest_pub = match plen {
            0 => None,
            33 => {
                if body.len() < offset + 33 + 2 {
                    return Err(DexError::Truncated);
                }
                let mut pk = [0u8; 33];
                pk.copy_from_slice(&body[offset..offset + 33]);
                offset += 33;
                Some(pk)
            }
            other => return Err(DexError::InvalidPubkeyLength(other)),
        };
        let len_a = body[offset] as usize;
        offset += 1;
        if len_a > TAG_SIZE {
            return Err(DexError::InvalidTagLength(len_a as u8));
        }
        if body.len() < offset + len_a + 1 {
            return Err(DexError::Truncated);
        }
        let tag_a = TagBuf::from_slice(&body[offset..offset + len_a]);
        offset += len_a;
        let len_b = body[offset] as usize;
        offset += 1;
        if len_b > TAG_SIZE {
            return Err(DexError::InvalidTagLength(len_b as u8));
        }
        if body.len() < offset + len_b {
            return Err(DexError::Truncated);
        }
        let tag_b = TagBuf::from_slice(&body[offset..offset + len_b]);
        offset += len_b;
        Ok((
            Self {
                amount_a,
                amount_b,
                dest_pub,
                tag_a,
                tag_b,
            },
            offset,
        ))
    }
}

/// Assembles a Q frame with the initial relay depth and a zeroed nonce, ready
/// for grinding.
pub fn encode_quote(timestamp: u32, header: &QuoteHeader, payload: &[u8]) -> Vec<u8> {
    let mut frame =
        Vec::with_capacity(ROUTE_SIZE + header.encoded_len() + payload.len() + NONCE_SIZE);
    frame.push(RELAY_DEPTH);
    frame.push(FUNC_QUOTE);
    frame.extend_from_slice(&timestamp.to_le_bytes());
    frame.extend_from_slice(&header.encode());
    frame.extend_from_slice(payload);
    frame.extend_from_slice(&[0u8; NONCE_SIZE]);
    frame
}

/// Assembles a P frame advertising recent short-hashes of one bucket.
pub fn encode_ping(timestamp: u32, bucket: u32, recents: &[u32]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(ROUTE_SIZE + 6 + recents.len() * 4);
    frame.push(0);
    frame.push(FUNC_PING);
    frame.extend_from_slice(&timestamp.to_le_bytes());
    frame.extend_from_slice(&(recents.len() as u16).to_le_bytes());
    frame.extend_from_slice(&bucket.to_le_bytes());
    for short in recents {
        frame.extend_from_slice(&short.to_le_bytes());
    }
    frame
}

/// Decodes a P frame body, returning the bucket and the advertised hashes.
pub fn decode_ping(frame: &[u8]) -> Result<(u32, Vec<u32>), DexError> {
    if frame.len() < ROUTE_SIZE + 6 {
        return Err(DexError::BadPingSize);
    }
    let n = read_u16(frame, ROUTE_SIZE) as usize;
    let bucket = read_u32(frame, ROUTE_SIZE + 2);
    if ROUTE_SIZE + 6 + n * 4 != frame.len() {
        return Err(DexError::BadPingSize);
    }
    if bucket >= PURGE_SECONDS {
        return Err(DexError::IllegalBucket(bucket));
    }
    let mut recents = Vec::with_capacity(n);
    for i in 0..n {
        recents.push(read_u32(frame, ROUTE_SIZE + 6 + i * 4));
    }
    Ok((bucket, recents))
}

/// Assembles a G frame requesting one short-hash from one bucket.
pub fn encode_get(timestamp: u32, short: u32, bucket: u32) -> Vec<u8> {
    let mut frame = Vec::with_capacity(ROUTE_SIZE + 8);
    frame.push(0);
    frame.push(FUNC_GET);
    frame.extend_from_slice(&timestamp.to_le_bytes());
    frame.extend_from_slice(&short.to_le_bytes());
    frame.extend_from_slice(&bucket.to_le_bytes());
    frame
}

/// Decodes a G frame body into its short-hash and bucket.
pub fn decode_get(frame: &[u8]) -> Result<(u32, u32), DexError> {
    if frame.len() != ROUTE_SIZE + 8 {
        return Err(DexError::Truncated);
    }
    let short = read_u32(frame, ROUTE_SIZE);
    let bucket = read_u32(frame, ROUTE_SIZE + 4);
    if bucket >= PURGE_SECONDS {
        return Err(DexError::IllegalBucket(bucket));
    }
    Ok((short, bucket))
}
