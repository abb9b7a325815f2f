use chrono::{DateTime, Timelike, Utc};
use std::time::Duration;

/// Source of wall-clock time, injectable for tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Fires on every UTC minute boundary (`hh:mm:00.000`).
///
/// The wait is always computed from the current time, so drift from a late
/// wake-up never accumulates. At exactly `:00.000` the next boundary is a
/// full minute away.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinuteCadence;

impl MinuteCadence {
    const PERIOD: Duration = Duration::from_secs(60);

    pub fn duration_until_next_tick(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = Duration::from_secs(u64::from(now.second()))
            // chrono reports leap seconds as nanosecond >= 1e9
            + Duration::from_nanos(u64::from(now.nanosecond().min(999_999_999)));
        Self::PERIOD.saturating_sub(elapsed)
    }

    pub fn next_tick_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let wait = self.duration_until_next_tick(now);
        now + chrono::Duration::from_std(wait).unwrap_or_else(|_| chrono::Duration::zero())
    }
}
