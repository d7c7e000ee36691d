//! The wall-clock time component.

use crate::error::CalcError;
use crate::CalcResult;

use super::duration::Duration;
use super::util::{MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};

/// A wall-clock time without date or timezone.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlainTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub millisecond: u16,
}

impl PlainTime {
    /// Creates a validated time.
    pub fn new(hour: u8, minute: u8, second: u8, millisecond: u16) -> CalcResult<Self> {
        if hour > 23 || minute > 59 || second > 59 || millisecond > 999 {
            return Err(CalcError::calendar().with_message(format!(
                "{hour:02}:{minute:02}:{second:02}.{millisecond:03} is not a valid time"
            )));
        }
        Ok(Self {
            hour,
            minute,
            second,
            millisecond,
        })
    }

    pub(crate) fn new_unchecked(hour: u8, minute: u8, second: u8, millisecond: u16) -> Self {
        Self {
            hour,
            minute,
            second,
            millisecond,
        }
    }

    /// Milliseconds since midnight.
    #[must_use]
    pub fn ms_of_day(&self) -> i64 {
        i64::from(self.hour) * MS_PER_HOUR
            + i64::from(self.minute) * MS_PER_MINUTE
            + i64::from(self.second) * MS_PER_SECOND
            + i64::from(self.millisecond)
    }

    /// The time at a millisecond-of-day value in `0..MS_PER_DAY`.
    #[must_use]
    pub fn from_ms_of_day(ms: i64) -> Self {
        let ms = ms.rem_euclid(MS_PER_DAY);
        Self {
            hour: (ms / MS_PER_HOUR) as u8,
            minute: (ms / MS_PER_MINUTE % 60) as u8,
            second: (ms / MS_PER_SECOND % 60) as u8,
            millisecond: (ms % 1000) as u16,
        }
    }

    /// Adds milliseconds, balancing into day overflow: returns the
    /// number of days carried and the wrapped time.
    #[must_use]
    pub fn add_ms(&self, ms: i64) -> (i64, Self) {
        let total = self.ms_of_day() + ms;
        let days = total.div_euclid(MS_PER_DAY);
        (days, Self::from_ms_of_day(total))
    }

    /// The time-only difference `other - self`, in hours through
    /// milliseconds.
    #[must_use]
    pub fn until(&self, other: &Self) -> Duration {
        let diff = other.ms_of_day() - self.ms_of_day();
        let sign = if diff < 0 { -1.0 } else { 1.0 };
        let abs = diff.abs();
        Duration {
            hours: sign * (abs / MS_PER_HOUR) as f64,
            minutes: sign * (abs / MS_PER_MINUTE % 60) as f64,
            seconds: sign * (abs / MS_PER_SECOND % 60) as f64,
            milliseconds: sign * (abs % 1000) as f64,
            ..Duration::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(PlainTime::new(24, 0, 0, 0).is_err());
        assert!(PlainTime::new(23, 59, 59, 999).is_ok());
    }

    #[test]
    fn add_ms_balances_across_days() {
        let time = PlainTime::new(23, 30, 0, 0).unwrap();
        let (days, wrapped) = time.add_ms(45 * MS_PER_MINUTE);
        assert_eq!(days, 1);
        assert_eq!(wrapped, PlainTime::new_unchecked(0, 15, 0, 0));

        let (days, wrapped) = time.add_ms(-24 * MS_PER_HOUR);
        assert_eq!(days, -1);
        assert_eq!(wrapped, PlainTime::new_unchecked(23, 30, 0, 0));
    }

    #[test]
    fn until_is_time_only_and_signed() {
        let a = PlainTime::new(10, 0, 0, 0).unwrap();
        let b = PlainTime::new(12, 30, 15, 250).unwrap();
        let duration = a.until(&b);
        assert_eq!(duration.hours, 2.0);
        assert_eq!(duration.minutes, 30.0);
        assert_eq!(duration.seconds, 15.0);
        assert_eq!(duration.milliseconds, 250.0);
        assert!(duration.is_time_only());

        let negative = b.until(&a);
        assert_eq!(negative.hours, -2.0);
        assert_eq!(negative.minutes, -30.0);
    }
}
