//! Clock abstraction for fix timestamps.
//!
//! The engine never reads wall-clock time directly. Freshness checks, the
//! prompt debounce and request timing all go through a [`Clock`] so tests can
//! drive time explicitly with [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::fix::FixTime;

/// Source of the current time in [`FixTime`] units.
pub trait Clock: Send + Sync {
    /// Current time.
    fn now(&self) -> FixTime;
}

/// Wall-clock time as milliseconds since the Unix epoch.
///
/// This matches the timestamp convention most positioning stacks use for
/// their fixes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> FixTime {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        FixTime::from_millis(millis)
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: FixTime) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(by, Ordering::SeqCst);
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: FixTime) {
        self.millis.store(to.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> FixTime {
        FixTime::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new(FixTime::from_millis(1_000));
        clock.advance(Duration::from_secs(2));

        assert_eq!(clock.now(), FixTime::from_millis(3_000));

        clock.set(FixTime::from_millis(5));
        assert_eq!(clock.now(), FixTime::from_millis(5));
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        // 2020-01-01T00:00:00Z
        assert!(SystemClock.now().as_millis() > 1_577_836_800_000);
    }
}
