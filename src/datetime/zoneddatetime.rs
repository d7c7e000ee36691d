//! The timezone-aware date-time component.

use crate::tz::{TimeZone, TimeZoneProvider};
use crate::CalcResult;

use super::datetime::PlainDateTime;
use super::duration::Duration;
use super::instant::Instant;

/// An exact instant paired with the timezone it is read in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZonedDateTime {
    pub instant: Instant,
    pub tz: TimeZone,
}

impl ZonedDateTime {
    #[must_use]
    pub fn new(instant: Instant, tz: TimeZone) -> Self {
        Self { instant, tz }
    }

    /// Interprets a local wall-clock reading in a zone.
    pub fn from_local(
        datetime: &PlainDateTime,
        tz: TimeZone,
        provider: &dyn TimeZoneProvider,
    ) -> CalcResult<Self> {
        let offset = provider.offset_seconds_for_local(tz.iana(), datetime.local_ms())?;
        Ok(Self {
            instant: Instant::from_datetime_with_offset(datetime, offset),
            tz,
        })
    }

    /// The local wall-clock reading of this value.
    pub fn local(&self, provider: &dyn TimeZoneProvider) -> CalcResult<PlainDateTime> {
        let offset = provider.offset_seconds_at(self.tz.iana(), self.instant.epoch_ms)?;
        Ok(self.instant.to_datetime_with_offset(offset))
    }

    /// Moves this value into another timezone; the instant is
    /// unchanged.
    #[must_use]
    pub fn with_timezone(&self, tz: TimeZone) -> Self {
        Self {
            instant: self.instant,
            tz,
        }
    }

    /// Adds a duration: calendar components in local time (so adding a
    /// day across a transition keeps the wall-clock time), time
    /// components as an exact offset on the instant.
    pub fn add(&self, duration: &Duration, provider: &dyn TimeZoneProvider) -> CalcResult<Self> {
        let mut instant = self.instant;
        if duration.is_calendar_safe() && !duration.is_time_only() {
            let date_part = Duration {
                years: duration.years,
                months: duration.months,
                weeks: duration.weeks,
                days: duration.days,
                ..Duration::default()
            };
            let local = self.local(provider)?.add(&date_part)?;
            let offset = provider.offset_seconds_for_local(self.tz.iana(), local.local_ms())?;
            instant = Instant::from_datetime_with_offset(&local, offset);
            instant = instant.add_ms(duration.time_ms().round() as i64);
        } else {
            instant = instant.add_duration(duration);
        }
        Ok(Self {
            instant,
            tz: self.tz.clone(),
        })
    }

    /// The exact difference `other - self`.
    #[must_use]
    pub fn until(&self, other: &Self) -> Duration {
        self.instant.until(&other.instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::{PlainDate, PlainTime};
    use crate::tz::FixedOffsetProvider;

    fn provider() -> FixedOffsetProvider {
        FixedOffsetProvider::new()
            .with_zone("Asia/Tokyo", 9 * 3600)
            .with_zone("America/New_York", -5 * 3600)
    }

    fn local(y: i32, mo: u8, d: u8, h: u8) -> PlainDateTime {
        PlainDateTime::new(
            PlainDate::new(y, mo, d).unwrap(),
            PlainTime::new(h, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn local_round_trip() {
        let provider = provider();
        let tokyo = TimeZone::new("Asia/Tokyo");
        let zoned =
            ZonedDateTime::from_local(&local(2026, 8, 1, 9), tokyo, &provider).unwrap();
        assert_eq!(zoned.instant.epoch_ms % 86_400_000, 0); // midnight UTC
        assert_eq!(zoned.local(&provider).unwrap(), local(2026, 8, 1, 9));
    }

    #[test]
    fn timezone_shift_keeps_the_instant() {
        let provider = provider();
        let tokyo = TimeZone::new("Asia/Tokyo");
        let new_york = TimeZone::new("America/New_York");
        let zoned =
            ZonedDateTime::from_local(&local(2026, 8, 1, 9), tokyo, &provider).unwrap();
        let shifted = zoned.with_timezone(new_york);
        assert_eq!(shifted.instant, zoned.instant);
        assert_eq!(shifted.local(&provider).unwrap(), local(2026, 7, 31, 19));
    }

    #[test]
    fn calendar_add_goes_through_local_time() {
        let provider = provider();
        let tokyo = TimeZone::new("Asia/Tokyo");
        let zoned =
            ZonedDateTime::from_local(&local(2026, 1, 31, 12), tokyo, &provider).unwrap();
        let added = zoned
            .add(
                &Duration {
                    months: 1.0,
                    ..Duration::default()
                },
                &provider,
            )
            .unwrap();
        assert_eq!(added.local(&provider).unwrap(), local(2026, 2, 28, 12));
    }

    #[test]
    fn until_is_exact() {
        let provider = provider();
        let tokyo = TimeZone::new("Asia/Tokyo");
        let a = ZonedDateTime::from_local(&local(2026, 8, 1, 0), tokyo.clone(), &provider).unwrap();
        let b = ZonedDateTime::from_local(&local(2026, 8, 2, 0), tokyo, &provider).unwrap();
        let duration = a.until(&b);
        assert_eq!(duration.seconds, 86_400.0);
    }
}
