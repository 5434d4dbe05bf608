//! Time source for token issuance and validation.
//!
//! Token timestamps travel as whole seconds, so every clock here truncates to
//! second precision.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use time::{Duration, OffsetDateTime};

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current UTC instant, truncated to whole seconds.
    fn now(&self) -> OffsetDateTime;
}

/// Truncates an instant to whole seconds.
#[must_use]
pub fn truncate_to_seconds(instant: OffsetDateTime) -> OffsetDateTime {
    instant - Duration::nanoseconds(i64::from(instant.nanosecond()))
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        truncate_to_seconds(OffsetDateTime::now_utc())
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    unix_seconds: AtomicI64,
}

impl ManualClock {
    /// Creates a clock frozen at `instant`.
    #[must_use]
    pub fn new(instant: OffsetDateTime) -> Self {
        Self {
            unix_seconds: AtomicI64::new(instant.unix_timestamp()),
        }
    }

    /// Moves the clock to `instant`.
    pub fn set(&self, instant: OffsetDateTime) {
        self.unix_seconds
            .store(instant.unix_timestamp(), Ordering::SeqCst);
    }

    /// Moves the clock forward (or backward, for negative values).
    pub fn advance(&self, by: Duration) {
        self.unix_seconds
            .fetch_add(by.whole_seconds(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        let seconds = self.unix_seconds.load(Ordering::SeqCst);
        OffsetDateTime::from_unix_timestamp(seconds).unwrap_or(OffsetDateTime::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_system_clock_has_no_subseconds() {
        assert_eq!(SystemClock.now().nanosecond(), 0);
    }

    #[test]
    fn test_truncate() {
        let t = datetime!(2021-07-01 12:00:00.987 UTC);
        assert_eq!(truncate_to_seconds(t), datetime!(2021-07-01 12:00:00 UTC));
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(datetime!(2021-07-01 12:00:00 UTC));
        assert_eq!(clock.now(), datetime!(2021-07-01 12:00:00 UTC));

        clock.advance(Duration::seconds(61));
        assert_eq!(clock.now(), datetime!(2021-07-01 12:01:01 UTC));

        clock.set(datetime!(2030-01-01 00:00:00 UTC));
        assert_eq!(clock.now(), datetime!(2030-01-01 00:00:00 UTC));
    }
}
