//! The combined date-time component.

use crate::CalcResult;

use super::date::PlainDate;
use super::duration::Duration;
use super::time::PlainTime;
use super::util::MS_PER_DAY;

/// A calendar date with a wall-clock time, no timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlainDateTime {
    pub date: PlainDate,
    pub time: PlainTime,
}

impl PlainDateTime {
    #[must_use]
    pub fn new(date: PlainDate, time: PlainTime) -> Self {
        Self { date, time }
    }

    /// Midnight at the given date.
    #[must_use]
    pub fn at_midnight(date: PlainDate) -> Self {
        Self {
            date,
            time: PlainTime::default(),
        }
    }

    /// Local milliseconds since the epoch, read without any timezone.
    #[must_use]
    pub fn local_ms(&self) -> i64 {
        self.date.epoch_days() * MS_PER_DAY + self.time.ms_of_day()
    }

    /// The date-time at a local millisecond count.
    #[must_use]
    pub fn from_local_ms(ms: i64) -> Self {
        let days = ms.div_euclid(MS_PER_DAY);
        Self {
            date: PlainDate::from_epoch_days(days),
            time: PlainTime::from_ms_of_day(ms.rem_euclid(MS_PER_DAY)),
        }
    }

    /// Adds a duration: calendar components through constrained date
    /// arithmetic, time components as a millisecond offset. A duration
    /// with fractional components falls back to one uniform offset at
    /// average month/year lengths.
    pub fn add(&self, duration: &Duration) -> CalcResult<Self> {
        if !duration.is_calendar_safe() {
            return Ok(Self::from_local_ms(
                self.local_ms() + duration.total_ms().round() as i64,
            ));
        }
        let date_part = Duration {
            years: duration.years,
            months: duration.months,
            weeks: duration.weeks,
            days: duration.days,
            ..Duration::default()
        };
        let date = self.date.add(&date_part)?;
        let (day_overflow, time) = self.time.add_ms(duration.time_ms().round() as i64);
        Ok(Self {
            date: date.add_days(day_overflow),
            time,
        })
    }

    /// The difference `other - self` as calendar date components plus
    /// a time-of-day remainder.
    #[must_use]
    pub fn until(&self, other: &Self) -> Duration {
        if other < self {
            return other.until(self).negated();
        }
        let mut date_end = other.date;
        let mut time_diff = other.time.ms_of_day() - self.time.ms_of_day();
        if time_diff < 0 {
            // Borrow one day into the time components.
            time_diff += MS_PER_DAY;
            date_end = date_end.add_days(-1);
        }
        let time = PlainTime::default().until(&PlainTime::from_ms_of_day(time_diff));
        let date = self.date.until(&date_end);
        Duration {
            years: date.years,
            months: date.months,
            weeks: date.weeks,
            days: date.days,
            hours: time.hours,
            minutes: time.minutes,
            seconds: time.seconds,
            milliseconds: time.milliseconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, mo: u8, d: u8, h: u8, mi: u8) -> PlainDateTime {
        PlainDateTime::new(
            PlainDate::new(y, mo, d).unwrap(),
            PlainTime::new(h, mi, 0, 0).unwrap(),
        )
    }

    #[test]
    fn local_ms_round_trips() {
        let value = dt(2026, 8, 1, 13, 45);
        assert_eq!(PlainDateTime::from_local_ms(value.local_ms()), value);
        let before_epoch = dt(1969, 12, 31, 23, 59);
        assert_eq!(
            PlainDateTime::from_local_ms(before_epoch.local_ms()),
            before_epoch
        );
    }

    #[test]
    fn add_clamps_calendar_and_carries_time() {
        let value = dt(1970, 1, 31, 23, 0);
        let duration = Duration {
            months: 1.0,
            hours: 2.0,
            ..Duration::default()
        };
        // Month add clamps to Feb 28, then two hours cross midnight.
        assert_eq!(value.add(&duration).unwrap(), dt(1970, 3, 1, 1, 0));
    }

    #[test]
    fn fractional_duration_falls_back_to_uniform_offset() {
        let value = dt(2026, 1, 1, 0, 0);
        let duration = Duration {
            hours: 1.5,
            ..Duration::default()
        };
        assert_eq!(value.add(&duration).unwrap(), dt(2026, 1, 1, 1, 30));
    }

    #[test]
    fn until_borrows_a_day_when_time_runs_backwards() {
        let a = dt(2026, 1, 1, 22, 0);
        let b = dt(2026, 1, 3, 2, 0);
        let duration = a.until(&b);
        assert_eq!(duration.days, 1.0);
        assert_eq!(duration.hours, 4.0);

        let back = b.until(&a);
        assert_eq!(back.days, -1.0);
        assert_eq!(back.hours, -4.0);
    }
}
