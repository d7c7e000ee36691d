//! The injectable clock.
//!
//! Relative instants (`now`, `today`, `2 days ago`) read the current
//! time and the system timezone through this seam, so documents are
//! reproducible under test with a [`FixedClock`].

use web_time::SystemTime;

use crate::tz::TimeZone;

use super::instant::Instant;

/// Source of the current instant and the system timezone.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;

    /// The system timezone, used when plain values are normalised to
    /// instants.
    fn system_timezone(&self) -> TimeZone;

    /// The current instant.
    fn now(&self) -> Instant {
        Instant::from_epoch_ms(self.now_ms())
    }
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default()
    }

    fn system_timezone(&self) -> TimeZone {
        iana_time_zone::get_timezone()
            .map(TimeZone::new)
            .unwrap_or_else(|_| TimeZone::utc())
    }
}

/// A pinned clock for tests and reproducible runs.
#[derive(Debug, Clone)]
pub struct FixedClock {
    pub epoch_ms: i64,
    pub tz: TimeZone,
}

impl FixedClock {
    #[must_use]
    pub fn new(epoch_ms: i64, tz: TimeZone) -> Self {
        Self { epoch_ms, tz }
    }
}

impl Clock for FixedClock {
    fn now_ms(&self) -> i64 {
        self.epoch_ms
    }

    fn system_timezone(&self) -> TimeZone {
        self.tz.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_deterministic() {
        let clock = FixedClock::new(1_000_000, TimeZone::utc());
        assert_eq!(clock.now().epoch_ms, 1_000_000);
        assert_eq!(clock.system_timezone(), TimeZone::utc());
    }
}
