use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of protocol time, in whole epoch seconds.
///
/// The engine never reads the system clock directly; it is handed a provider
/// at construction so simulations can drive time by hand.
pub trait Clock: Send + Sync {
    fn now_epoch(&self) -> u32;
}

/// Wall-clock provider for production hosts.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch(&self) -> u32 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0)
    }
}

/// A manual clock for deterministic simulations.
#[derive(Debug)]
pub struct ManualClock {
    secs: RwLock<u32>,
}

impl ManualClock {
    pub fn new(secs: u32) -> Self {
        Self {
            secs: RwLock::new(secs),
        }
    }

    pub fn set(&self, secs: u32) {
        *self.secs.write().unwrap() = secs;
    }

    pub fn advance(&self, secs: u32) {
        *self.secs.write().unwrap() += secs;
    }
}

impl Clock for ManualClock {
    fn now_epoch(&self) -> u32 {
        *self.secs.read().unwrap()
    }
}
