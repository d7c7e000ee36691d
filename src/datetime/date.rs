//! The calendar date component.

use crate::error::CalcError;
use crate::CalcResult;

use super::duration::Duration;
use super::util;

/// An ISO-8601 calendar date without time or timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlainDate {
    pub year: i32,
    pub month: u8,
    pub day: u8,
}

impl PlainDate {
    /// Creates a validated date.
    pub fn new(year: i32, month: u8, day: u8) -> CalcResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(CalcError::calendar()
                .with_message(format!("month {month} is out of range")));
        }
        if day < 1 || day > util::days_in_month(year, month) {
            return Err(CalcError::calendar().with_message(format!(
                "{year:04}-{month:02} has no day {day}"
            )));
        }
        Ok(Self { year, month, day })
    }

    pub(crate) fn new_unchecked(year: i32, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// Days since the Unix epoch.
    #[must_use]
    pub fn epoch_days(&self) -> i64 {
        util::epoch_days_from_gregorian(self.year, self.month, self.day)
    }

    /// The date of an epoch day count.
    #[must_use]
    pub fn from_epoch_days(epoch_days: i64) -> Self {
        let (year, month, day) = util::gregorian_from_epoch_days(epoch_days);
        Self { year, month, day }
    }

    /// ISO day of week, 1 = Monday through 7 = Sunday.
    #[must_use]
    pub fn day_of_week(&self) -> u8 {
        util::iso_day_of_week(self.epoch_days())
    }

    /// Day of year, 1-based.
    #[must_use]
    pub fn day_of_year(&self) -> u16 {
        util::day_of_year(self.year, self.month, self.day)
    }

    /// ISO-8601 week of year.
    #[must_use]
    pub fn week_of_year(&self) -> u8 {
        util::iso_week_of_year(self.year, self.month, self.day)
    }

    /// Adds whole months, clamping the day-of-month to the last valid
    /// day of the target month (constrained overflow).
    #[must_use]
    pub fn add_months(&self, months: i64) -> Self {
        let total = i64::from(self.year) * 12 + i64::from(self.month) - 1 + months;
        let year = total.div_euclid(12) as i32;
        let month = total.rem_euclid(12) as u8 + 1;
        let day = self.day.min(util::days_in_month(year, month));
        Self::new_unchecked(year, month, day)
    }

    /// Adds whole days.
    #[must_use]
    pub fn add_days(&self, days: i64) -> Self {
        Self::from_epoch_days(self.epoch_days() + days)
    }

    /// Adds the calendar components of a duration, unit by unit in
    /// descending order, clamping after the year and month steps.
    ///
    /// The duration must be calendar-safe and date-only; callers fall
    /// back to uniform instant offsets otherwise.
    pub fn add(&self, duration: &Duration) -> CalcResult<Self> {
        if !duration.is_calendar_safe() || !duration.is_date_only() {
            return Err(CalcError::calendar()
                .with_message("calendar addition requires whole date components"));
        }
        let with_months = self.add_months(duration.years as i64 * 12 + duration.months as i64);
        Ok(with_months.add_days(duration.weeks as i64 * 7 + duration.days as i64))
    }

    /// The calendar difference `other - self` in years, months and
    /// days, signed.
    #[must_use]
    pub fn until(&self, other: &Self) -> Duration {
        if other < self {
            return other.until(self).negated();
        }
        let mut years = i64::from(other.year - self.year);
        let mut months = i64::from(other.month) - i64::from(self.month);
        let mut days = i64::from(other.day) - i64::from(self.day);
        if days < 0 {
            months -= 1;
            // Borrow the length of the month preceding `other`.
            let borrowed = self.add_months(years * 12 + months);
            days = other.epoch_days() - borrowed.epoch_days();
        }
        if months < 0 {
            years -= 1;
            months += 12;
        }
        Duration {
            years: years as f64,
            months: months as f64,
            days: days as f64,
            ..Duration::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert!(PlainDate::new(2026, 2, 29).is_err());
        assert!(PlainDate::new(2024, 2, 29).is_ok());
        assert!(PlainDate::new(2026, 13, 1).is_err());
        assert!(PlainDate::new(2026, 0, 1).is_err());
    }

    #[test]
    fn adding_months_clamps_to_month_end() {
        let date = PlainDate::new(1970, 1, 31).unwrap();
        assert_eq!(date.add_months(1), PlainDate::new_unchecked(1970, 2, 28));
        let leap = PlainDate::new(2024, 1, 31).unwrap();
        assert_eq!(leap.add_months(1), PlainDate::new_unchecked(2024, 2, 29));
        assert_eq!(leap.add_months(13), PlainDate::new_unchecked(2025, 2, 28));
        assert_eq!(date.add_months(-2), PlainDate::new_unchecked(1969, 11, 30));
    }

    #[test]
    fn month_add_matches_div_rem_identity() {
        // day = min(d, daysInMonth(y', m')) with (y', m') from the
        // div/mod decomposition.
        let date = PlainDate::new(2021, 5, 31).unwrap();
        for k in -30i64..=30 {
            let added = date.add_months(k);
            let total = 2021 * 12 + 5 - 1 + k;
            let expected_year = total.div_euclid(12) as i32;
            let expected_month = total.rem_euclid(12) as u8 + 1;
            assert_eq!(added.year, expected_year);
            assert_eq!(added.month, expected_month);
            assert_eq!(
                added.day,
                31u8.min(crate::datetime::util::days_in_month(
                    expected_year,
                    expected_month
                ))
            );
        }
    }

    #[test]
    fn duration_add_applies_descending() {
        let date = PlainDate::new(2023, 1, 31).unwrap();
        let duration = Duration {
            years: 1.0,
            months: 1.0,
            days: 1.0,
            ..Duration::default()
        };
        // 2023-01-31 + 1y -> 2024-01-31, + 1mo -> 2024-02-29, + 1d -> 2024-03-01
        assert_eq!(
            date.add(&duration).unwrap(),
            PlainDate::new_unchecked(2024, 3, 1)
        );
    }

    #[test]
    fn add_rejects_fractional_and_timeful_durations() {
        let date = PlainDate::new(2023, 1, 1).unwrap();
        let fractional = Duration {
            months: 1.5,
            ..Duration::default()
        };
        assert!(date.add(&fractional).is_err());
        let timeful = Duration {
            hours: 1.0,
            ..Duration::default()
        };
        assert!(date.add(&timeful).is_err());
    }

    #[test]
    fn until_returns_calendar_components() {
        let a = PlainDate::new(2023, 1, 31).unwrap();
        let b = PlainDate::new(2023, 3, 1).unwrap();
        let duration = a.until(&b);
        assert_eq!(duration.months, 1.0);
        assert_eq!(duration.days, 1.0);

        let back = b.until(&a);
        assert_eq!(back.months, -1.0);
        assert_eq!(back.days, -1.0);

        let c = PlainDate::new(2024, 1, 15).unwrap();
        let d = a.until(&c);
        assert_eq!((d.years, d.months), (0.0, 11.0));
        assert_eq!(d.days, 15.0);
    }

    #[test]
    fn week_and_day_properties() {
        let date = PlainDate::new(2026, 8, 1).unwrap();
        assert_eq!(date.day_of_week(), 6); // Saturday
        assert_eq!(date.day_of_year(), 213);
    }
}
