//! The exact-time component.

use super::datetime::PlainDateTime;
use super::duration::Duration;
use super::util::MS_PER_SECOND;

/// An exact point on the UTC timeline, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant {
    pub epoch_ms: i64,
}

impl Instant {
    #[must_use]
    pub fn from_epoch_ms(epoch_ms: i64) -> Self {
        Self { epoch_ms }
    }

    /// Epoch seconds, truncated.
    #[must_use]
    pub fn epoch_seconds(&self) -> i64 {
        self.epoch_ms.div_euclid(MS_PER_SECOND)
    }

    /// Shifts by a millisecond offset.
    #[must_use]
    pub fn add_ms(&self, ms: i64) -> Self {
        Self {
            epoch_ms: self.epoch_ms + ms,
        }
    }

    /// Adds a duration. Calendar components are not meaningful on the
    /// instant timeline, so the whole duration collapses to its total
    /// (average-month) millisecond offset.
    #[must_use]
    pub fn add_duration(&self, duration: &Duration) -> Self {
        self.add_ms(duration.total_ms().round() as i64)
    }

    /// The exact difference `other - self` in seconds and
    /// milliseconds.
    #[must_use]
    pub fn until(&self, other: &Self) -> Duration {
        Duration::from_ms((other.epoch_ms - self.epoch_ms) as f64)
    }

    /// The UTC wall-clock reading of this instant shifted by an
    /// offset in seconds.
    #[must_use]
    pub fn to_datetime_with_offset(&self, offset_seconds: i64) -> PlainDateTime {
        PlainDateTime::from_local_ms(self.epoch_ms + offset_seconds * MS_PER_SECOND)
    }

    /// The instant reading a local wall-clock time with a known
    /// offset.
    #[must_use]
    pub fn from_datetime_with_offset(datetime: &PlainDateTime, offset_seconds: i64) -> Self {
        Self {
            epoch_ms: datetime.local_ms() - offset_seconds * MS_PER_SECOND,
        }
    }

}
