//! Time sources for load timestamps.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A source of wall-clock time used to stamp module loads.
///
/// Load timestamps are compared against file modification times, so a clock
/// must report wall-clock time, not a monotonic instant.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
///
/// Useful for tests and simulations that need exact control over load timestamps.
///
/// # Examples
///
/// ```rust
/// use hotswap_modules::core::{Clock, ManualClock};
///
/// let clock = ManualClock::at_unix_secs(100);
/// clock.advance_secs(50);
/// assert_eq!(clock.now().timestamp(), 150);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock fixed at the given time.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Create a clock fixed at `secs` seconds after the Unix epoch.
    pub fn at_unix_secs(secs: u64) -> Self {
        Self::new(unix_secs(secs))
    }

    /// Move the clock to an absolute time.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward (or backward, for negative values) by whole seconds.
    pub fn advance_secs(&self, secs: i64) {
        let mut now = self.now.lock();
        *now += TimeDelta::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// The time `secs` seconds after the Unix epoch.
pub fn unix_secs(secs: u64) -> DateTime<Utc> {
    DateTime::<Utc>::from(UNIX_EPOCH + Duration::from_secs(secs))
}

/// Convert a filesystem timestamp into the clock's representation.
pub(crate) fn from_system_time(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_fixed() {
        let clock = ManualClock::at_unix_secs(100);
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().timestamp(), 100);
    }

    #[test]
    fn test_manual_clock_advance_and_set() {
        let clock = ManualClock::at_unix_secs(100);
        clock.advance_secs(50);
        assert_eq!(clock.now().timestamp(), 150);

        clock.set(unix_secs(90));
        assert_eq!(clock.now().timestamp(), 90);
    }

    #[test]
    fn test_system_time_conversion_is_exact() {
        let time = UNIX_EPOCH + Duration::from_secs(150);
        assert_eq!(from_system_time(time), unix_secs(150));
    }
}
