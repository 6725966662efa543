//! Single-slot handoff of the latest lux value.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Sentinel stored until the first value arrives.
pub const NO_VALUE: i64 = -1;

/// Latest lux value, overwritten by each new sample.
///
/// Publishing never blocks and never queues: a value the dispatcher has not
/// picked up yet is simply replaced.
#[derive(Debug, Clone)]
pub struct LatestLux(Arc<AtomicI64>);

impl LatestLux {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self(Arc::new(AtomicI64::new(NO_VALUE)))
    }

    /// Replaces the stored value.
    pub fn publish(&self, lux: u64) {
        let value = i64::try_from(lux).unwrap_or(i64::MAX);
        self.0.store(value, Ordering::Release);
    }

    /// Returns the most recent value, or `None` before the first publish.
    pub fn latest(&self) -> Option<u64> {
        u64::try_from(self.0.load(Ordering::Acquire)).ok()
    }
}

impl Default for LatestLux {
    fn default() -> Self {
        Self::new()
    }
}
