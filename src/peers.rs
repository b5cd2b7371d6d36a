use crate::constants::{MAX_PEER_ID, PEER_EPOCHS, PEER_EPOCH_SECONDS, SECONDS_IN_DAY};

/// Host-provided neighbor handle.
///
/// The core never touches the network directly; every outbound frame goes
/// through `push_message`, which the host must treat as non-blocking. Peer ids
/// are stable for the life of the connection and must be nonzero.
pub trait Neighbor {
    fn id(&self) -> u64;
    fn addr(&self) -> String;
    fn push_message(&mut self, tag: &str, bytes: &[u8]);
    fn last_ping(&self) -> u32;
    fn set_last_ping(&mut self, t: u32);
}

/// Maps opaque peer ids to compact 10-bit slots, per 5-minute epoch.
///
/// Slot 0 is reserved. When an epoch's 1023 slots are exhausted, further peers
/// are rejected for that epoch (sybil defense). The whole map is cleared at
/// each day boundary by the purge loop.
#[derive(Debug)]
pub struct PeerSlotMap {
    cells: Box<[u64]>,
}

impl Default for PeerSlotMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerSlotMap {
    pub fn new() -> Self {
        Self {
            cells: vec![0u64; PEER_EPOCHS * MAX_PEER_ID].into_boxed_slice(),
        }
    }

    fn epoch(timestamp: u32) -> usize {
        ((timestamp % SECONDS_IN_DAY) / PEER_EPOCH_SECONDS) as usize
    }

    /// Returns the peer's slot within the current epoch, claiming the first
    /// empty cell on first sight. `None` means the epoch is exhausted.
    pub fn slot(&mut self, timestamp: u32, peer_id: u64) -> Option<u16> {
        debug_assert!(peer_id != 0, "peer id 0 is the empty-cell sentinel");
        let row = &mut self.cells[Self::epoch(timestamp) * MAX_PEER_ID..][..MAX_PEER_ID];
        for (i, cell) in row.iter_mut().enumerate().skip(1) {
            if *cell == 0 {
                *cell = peer_id;
                return Some(i as u16);
            }
            if *cell == peer_id {
                return Some(i as u16);
            }
        }
        None
    }

    /// Clears every epoch row.
    pub fn reset(&mut self) {
        self.cells.fill(0);
    }
}
