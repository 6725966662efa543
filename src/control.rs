//! Flags shared between the long-running tasks and whoever drives them.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Default scheduling unit of both loops.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Cooperative shutdown request, polled once per tick.
#[derive(Debug, Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
    /// Creates an untriggered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks every task holding a clone to stop.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once shutdown was requested.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Fast refresh flag, set while the consuming UI is in the foreground.
///
/// The sampling loop only reads it.
#[derive(Debug, Clone, Default)]
pub struct RefreshMode(Arc<AtomicBool>);

impl RefreshMode {
    /// Creates the flag in slow mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switches fast refresh on or off.
    pub fn set_fast(&self, fast: bool) {
        self.0.store(fast, Ordering::Release);
    }

    /// Returns true while fast refresh is active.
    pub fn is_fast(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Sleeps up to `ticks` ticks, stopping early once `interrupt` returns true.
///
/// `interrupt` is checked after every tick. Returns the number of ticks slept.
pub fn sleep_ticks(ticks: u64, tick: Duration, mut interrupt: impl FnMut() -> bool) -> u64 {
    for slept in 1..=ticks {
        thread::sleep(tick);
        if interrupt() {
            return slept;
        }
    }
    ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_shutdown_is_shared_between_clones() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        assert!(!other.is_triggered());
        shutdown.trigger();
        assert!(other.is_triggered());
    }

    #[test]
    fn test_refresh_mode_toggles() {
        let mode = RefreshMode::new();
        assert!(!mode.is_fast());
        mode.clone().set_fast(true);
        assert!(mode.is_fast());
    }

    #[test]
    fn test_sleep_ticks_full_length() {
        let tick = Duration::from_millis(2);
        let start = Instant::now();
        assert_eq!(sleep_ticks(5, tick, || false), 5);
        assert!(start.elapsed() >= tick * 5);
    }

    #[test]
    fn test_sleep_ticks_interrupted() {
        let mut calls = 0;
        let slept = sleep_ticks(100, Duration::from_millis(1), || {
            calls += 1;
            calls == 3
        });
        assert_eq!(slept, 3);
    }
}
