//! In-crate helpers for tests and benches.

use crate::peers::Neighbor;

/// A neighbor that records every outbound frame.
#[derive(Debug, Default)]
pub struct TestPeer {
    pub id: u64,
    pub last_ping: u32,
    pub outbox: Vec<Vec<u8>>,
}

impl TestPeer {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            last_ping: 0,
            outbox: Vec::new(),
        }
    }

    /// Takes everything queued so far.
    pub fn drain(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.outbox)
    }
}

impl Neighbor for TestPeer {
    fn id(&self) -> u64 {
        self.id
    }

    fn addr(&self) -> String {
        format!("test-peer-{}", self.id)
    }

    fn push_message(&mut self, _tag: &str, bytes: &[u8]) {
        self.outbox.push(bytes.to_vec());
    }

    fn last_ping(&self) -> u32 {
        self.last_ping
    }

    fn set_last_ping(&mut self, t: u32) {
        self.last_ping = t;
    }
}
