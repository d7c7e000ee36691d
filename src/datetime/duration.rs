//! The signed component duration.

use crate::error::CalcError;
use crate::CalcResult;

use super::util::{MS_PER_AVG_MONTH, MS_PER_AVG_YEAR, MS_PER_DAY, MS_PER_HOUR, MS_PER_MINUTE, MS_PER_SECOND};

/// A signed duration with calendar and time components.
///
/// Components are stored as doubles so intermediate arithmetic can
/// produce fractions; *calendar* addition to a date requires every
/// component to be integral, otherwise the caller falls back to a
/// uniform total-milliseconds offset.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Duration {
    pub years: f64,
    pub months: f64,
    pub weeks: f64,
    pub days: f64,
    pub hours: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub milliseconds: f64,
}

impl Duration {
    /// Creates a duration, validating that every component is finite.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        years: f64,
        months: f64,
        weeks: f64,
        days: f64,
        hours: f64,
        minutes: f64,
        seconds: f64,
        milliseconds: f64,
    ) -> CalcResult<Self> {
        let duration = Self {
            years,
            months,
            weeks,
            days,
            hours,
            minutes,
            seconds,
            milliseconds,
        };
        if !duration.fields().iter().all(|f| f.is_finite()) {
            return Err(CalcError::calendar().with_message("duration components must be finite"));
        }
        Ok(duration)
    }

    /// A duration with a single field set.
    #[must_use]
    pub fn from_field(field: DurationField, value: f64) -> Self {
        let mut duration = Self::default();
        match field {
            DurationField::Years => duration.years = value,
            DurationField::Months => duration.months = value,
            DurationField::Weeks => duration.weeks = value,
            DurationField::Days => duration.days = value,
            DurationField::Hours => duration.hours = value,
            DurationField::Minutes => duration.minutes = value,
            DurationField::Seconds => duration.seconds = value,
            DurationField::Milliseconds => duration.milliseconds = value,
        }
        duration
    }

    /// A seconds/milliseconds duration from a millisecond count.
    #[must_use]
    pub fn from_ms(ms: f64) -> Self {
        let seconds = (ms / 1000.0).trunc();
        Self {
            seconds,
            milliseconds: ms - seconds * 1000.0,
            ..Self::default()
        }
    }

    fn fields(&self) -> [f64; 8] {
        [
            self.years,
            self.months,
            self.weeks,
            self.days,
            self.hours,
            self.minutes,
            self.seconds,
            self.milliseconds,
        ]
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.fields().iter().all(|f| *f == 0.0)
    }

    #[must_use]
    pub fn negated(&self) -> Self {
        Self {
            years: -self.years,
            months: -self.months,
            weeks: -self.weeks,
            days: -self.days,
            hours: -self.hours,
            minutes: -self.minutes,
            seconds: -self.seconds,
            milliseconds: -self.milliseconds,
        }
    }

    /// Component-wise sum.
    #[must_use]
    pub fn checked_add(&self, other: &Self) -> CalcResult<Self> {
        Self::new(
            self.years + other.years,
            self.months + other.months,
            self.weeks + other.weeks,
            self.days + other.days,
            self.hours + other.hours,
            self.minutes + other.minutes,
            self.seconds + other.seconds,
            self.milliseconds + other.milliseconds,
        )
    }

    /// Whether the time components (hours and below) are all zero.
    #[must_use]
    pub fn is_date_only(&self) -> bool {
        self.hours == 0.0 && self.minutes == 0.0 && self.seconds == 0.0 && self.milliseconds == 0.0
    }

    /// Whether the calendar components (days and above) are all zero.
    #[must_use]
    pub fn is_time_only(&self) -> bool {
        self.years == 0.0 && self.months == 0.0 && self.weeks == 0.0 && self.days == 0.0
    }

    /// Whether every component is integral, making the duration
    /// eligible for constrained calendar arithmetic.
    #[must_use]
    pub fn is_calendar_safe(&self) -> bool {
        self.fields().iter().all(|f| f.fract() == 0.0)
    }

    /// The time components (hours and below) in milliseconds.
    #[must_use]
    pub fn time_ms(&self) -> f64 {
        self.hours * MS_PER_HOUR as f64
            + self.minutes * MS_PER_MINUTE as f64
            + self.seconds * MS_PER_SECOND as f64
            + self.milliseconds
    }

    /// The whole duration in milliseconds, months and years taken at
    /// their average lengths (30.4375 and 365.25 days).
    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.years * MS_PER_AVG_YEAR
            + self.months * MS_PER_AVG_MONTH
            + self.weeks * 7.0 * MS_PER_DAY as f64
            + self.days * MS_PER_DAY as f64
            + self.time_ms()
    }
}

/// A single duration component, also the promotion target for
/// time-dimensioned numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationField {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl DurationField {
    /// Maps a time unit id onto the duration component it denotes.
    /// Units without a calendar meaning (fortnights, centuries) have
    /// none and promote through seconds instead.
    #[must_use]
    pub fn from_unit_id(id: &str) -> Option<Self> {
        match id {
            "year" => Some(Self::Years),
            "month" => Some(Self::Months),
            "week" => Some(Self::Weeks),
            "day" => Some(Self::Days),
            "hour" => Some(Self::Hours),
            "minute" => Some(Self::Minutes),
            "second" => Some(Self::Seconds),
            "millisecond" => Some(Self::Milliseconds),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_ms_uses_average_month_and_year() {
        let one_month = Duration::from_field(DurationField::Months, 1.0);
        assert!((one_month.total_ms() - 2_629_800_000.0).abs() < 1e-3);
        let one_year = Duration::from_field(DurationField::Years, 1.0);
        assert!((one_year.total_ms() - 31_557_600_000.0).abs() < 1e-3);
    }

    #[test]
    fn calendar_safety() {
        let ok = Duration::new(1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0).unwrap();
        assert!(ok.is_calendar_safe());
        let fractional = Duration::new(0.0, 1.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0).unwrap();
        assert!(!fractional.is_calendar_safe());
    }

    #[test]
    fn from_ms_splits_seconds_and_milliseconds() {
        let duration = Duration::from_ms(90_500.0);
        assert_eq!(duration.seconds, 90.0);
        assert_eq!(duration.milliseconds, 500.0);
        let negative = Duration::from_ms(-1500.0);
        assert_eq!(negative.seconds, -1.0);
        assert_eq!(negative.milliseconds, -500.0);
    }

    #[test]
    fn date_and_time_splits() {
        let duration = Duration::new(0.0, 1.0, 0.0, 2.0, 3.0, 0.0, 0.0, 0.0).unwrap();
        assert!(!duration.is_date_only());
        assert!(!duration.is_time_only());
        assert_eq!(duration.time_ms(), 3.0 * 3_600_000.0);
    }

    #[test]
    fn non_finite_components_are_rejected() {
        assert!(Duration::new(f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0).is_err());
    }
}
