//! Query surface over the secondary indices.
//!
//! `list` walks every axis the filter names, newest first, applying priority
//! and volume-range filters. The response types serialize directly for a thin
//! RPC wrapper.

use std::collections::HashSet;

use serde::Serialize;

use crate::constants::{ROUTE_SIZE, SATOSHI, TAG_SIZE};
use crate::engine::DexGossip;
use crate::error::DexError;
use crate::index::{IndexKey, AXIS_DESTPUB, AXIS_TAG, AXIS_TAG_PAIR};
use crate::pow;
use crate::protocol::QuoteHeader;
use crate::store::Blob;

/// Filter of a `list` call. Empty strings leave a dimension unconstrained.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter<'a> {
    /// Walk each axis until this id is reached (exclusive); 0 walks everything.
    pub stop_at: u32,
    pub min_priority: u8,
    pub tag_a: &'a str,
    pub tag_b: &'a str,
    /// 66 hex chars for a destination pubkey; anything else means none.
    pub dest_pub: &'a str,
    /// Volume bounds in whole coins.
    pub min_a: &'a str,
    pub max_a: &'a str,
    pub min_b: &'a str,
    pub max_b: &'a str,
}

/// One matched quote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteItem {
    pub timestamp: u32,
    /// Short-hash of the quote, usable as `stop_at` in a follow-up query.
    pub id: u32,
    /// Payload as text, or hex when `hex` is set.
    pub payload: String,
    pub hex: bool,
    #[serde(rename = "amountA")]
    pub amount_a: u64,
    #[serde(rename = "amountB")]
    pub amount_b: u64,
    pub priority: u8,
    #[serde(rename = "tagA")]
    pub tag_a: String,
    #[serde(rename = "tagB")]
    pub tag_b: String,
    #[serde(rename = "destpub")]
    pub dest_pub: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListResponse {
    pub matches: Vec<QuoteItem>,
    #[serde(rename = "tagA")]
    pub tag_a: String,
    #[serde(rename = "tagB")]
    pub tag_b: String,
    #[serde(rename = "destpub")]
    pub dest_pub: String,
    pub n: usize,
}

fn parse_bound(bound: &str, default: u64) -> Result<u64, DexError> {
    if bound.is_empty() {
        return Ok(default);
    }
    let coins: f64 = bound
        .parse()
        .map_err(|_| DexError::InvalidVolume(bound.to_string()))?;
    Ok((coins * SATOSHI as f64 + 0.0000000049) as u64)
}

fn item_payload(blob: &Blob) -> (String, bool) {
    let payload = blob.payload();
    let printable = !payload.is_empty()
        && payload[payload.len() - 1] == 0
        && payload[..payload.len() - 1]
            .iter()
            .all(|&b| (0x20..0x7f).contains(&b));
    if printable {
        (
            String::from_utf8_lossy(&payload[..payload.len() - 1]).into_owned(),
            false,
        )
    } else {
        (hex::encode(payload), true)
    }
}

impl DexGossip {
    /// Walks the indices matching the filter, newest first, deduplicating
    /// quotes that appear on more than one axis.
    pub fn list(&self, filter: &ListFilter<'_>) -> Result<ListResponse, DexError> {
        if filter.tag_a.len() >= TAG_SIZE {
            return Err(DexError::TagTooLong(filter.tag_a.len()));
        }
        if filter.tag_b.len() >= TAG_SIZE {
            return Err(DexError::TagTooLong(filter.tag_b.len()));
        }
        let min_a = parse_bound(filter.min_a, 0)?;
        let max_a = parse_bound(filter.max_a, 1 << 63)?;
        let min_b = parse_bound(filter.min_b, 0)?;
        let max_b = parse_bound(filter.max_b, 1 << 63)?;
        if min_a > max_a || min_b > max_b {
            return Err(DexError::InvalidRange);
        }
        let dest_pub = if filter.dest_pub.len() == 66 {
            hex::decode(filter.dest_pub).ok().map(|raw| {
                let mut pk = [0u8; 33];
                pk.copy_from_slice(&raw);
                pk
            })
        } else {
            None
        };

        let has_a = !filter.tag_a.is_empty();
        let has_b = !filter.tag_b.is_empty();
        let mut axes = Vec::new();
        if let Some(pk) = &dest_pub {
            axes.push((AXIS_DESTPUB, IndexKey::destpub(pk)));
        }
        if has_a {
            axes.push((AXIS_TAG, IndexKey::single_tag(filter.tag_a.as_bytes())));
            if has_b {
                axes.push((
                    AXIS_TAG_PAIR,
                    IndexKey::tag_pair(filter.tag_a.as_bytes(), filter.tag_b.as_bytes()),
                ));
            }
        } else if has_b {
            axes.push((AXIS_TAG, IndexKey::single_tag(filter.tag_b.as_bytes())));
        }

        let mut matches = Vec::new();
        let mut seen = HashSet::new();
        for (axis, key) in axes {
            let Some(slot) = self.indices.search(axis, &key) else {
                continue;
            };
            let mut cursor = self.indices.entry(axis, slot).tip;
            while let Some(handle) = cursor {
                let Some(blob) = self.store.get(handle) else {
                    break;
                };
                if blob.short() == filter.stop_at {
                    break;
                }
                cursor = blob.links[axis].prev;
                let priority = pow::priority(&blob.hash);
                if priority < filter.min_priority {
                    continue;
                }
                let (header, _) = QuoteHeader::decode(&blob.data[ROUTE_SIZE..])?;
                if header.amount_a < min_a || header.amount_a > max_a {
                    continue;
                }
                if header.amount_b < min_b || header.amount_b > max_b {
                    continue;
                }
                if !seen.insert(blob.short()) {
                    continue;
                }
                let (payload, hex_flag) = item_payload(blob);
                matches.push(QuoteItem {
                    timestamp: blob.timestamp(),
                    id: blob.short(),
                    payload,
                    hex: hex_flag,
                    amount_a: header.amount_a,
                    amount_b: header.amount_b,
                    priority,
                    tag_a: String::from_utf8_lossy(&header.tag_a).into_owned(),
                    tag_b: String::from_utf8_lossy(&header.tag_b).into_owned(),
                    dest_pub: header.dest_pub.map(hex::encode).unwrap_or_default(),
                });
            }
        }
        let n = matches.len();
        Ok(ListResponse {
            matches,
            tag_a: filter.tag_a.to_string(),
            tag_b: filter.tag_b.to_string(),
            dest_pub: filter.dest_pub.to_string(),
            n,
        })
    }
}
