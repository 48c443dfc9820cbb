use chrono::{DateTime, Duration, DurationRound, Utc};
use parking_lot::Mutex;

/// Source of "now" for the store (write timestamps) and the query engine
/// (trailing windows). Timestamps are whole seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock, truncated to the store's one-second resolution.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        truncate_to_seconds(Utc::now())
    }
}

/// Hand-driven clock for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(truncate_to_seconds(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock() = truncate_to_seconds(at);
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now = truncate_to_seconds(*now + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

pub fn truncate_to_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    at.duration_trunc(Duration::seconds(1)).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_drops_sub_second_precision() {
        let start = Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap()
            + Duration::milliseconds(750);
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2021, 6, 1, 12, 0, 0).unwrap());

        clock.advance(Duration::minutes(5));
        assert_eq!(clock.now(), Utc.with_ymd_and_hms(2021, 6, 1, 12, 5, 0).unwrap());
    }

    #[test]
    fn system_clock_has_no_fractional_seconds() {
        assert_eq!(SystemClock.now().timestamp_subsec_nanos(), 0);
    }
}
