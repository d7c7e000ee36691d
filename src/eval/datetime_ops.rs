//! The date/time arithmetic matrix.
//!
//! Implements the pairwise `+`/`-` behaviour between date-like values
//! and durations: same-kind subtraction produces component durations,
//! cross-kind subtraction normalises both sides to instants in the
//! system timezone, and time-dimensioned numbers promote to durations
//! when a date-like operand is involved.

use crate::datetime::duration::DurationField;
use crate::datetime::{Duration, Instant, PlainDateTime, ZonedDateTime};
use crate::error::CalcError;
use crate::settings::Settings;
use crate::CalcResult;

use super::value::{NumberValue, Value};
use super::Evaluator;

/// Reads a value as a duration: duration values pass through, numbers
/// and composites with time dimension promote.
#[must_use]
pub fn promote_to_duration(value: &Value, settings: Settings) -> Option<Duration> {
    match value {
        Value::Duration(duration) => Some(*duration),
        Value::Number(NumberValue {
            value,
            unit: Some(unit),
            ..
        }) => {
            if unit.dimension.id.as_ref() != "time" {
                return None;
            }
            if let Some(field) = DurationField::from_unit_id(&unit.id) {
                return Some(Duration::from_field(field, *value));
            }
            let factor = unit.conversion.linear_factor(settings.variant).ok()?;
            Some(Duration::from_ms(value * factor * 1000.0))
        }
        Value::Composite(parts) => {
            let mut total = Duration::default();
            for (value, unit) in parts {
                let part = promote_to_duration(
                    &Value::Number(NumberValue::with_unit(*value, unit.clone())),
                    settings,
                )?;
                total = total.checked_add(&part).ok()?;
            }
            Some(total)
        }
        _ => None,
    }
}

/// Adds a duration to an instant: whole calendar components apply in
/// the system timezone's local calendar, everything else as a uniform
/// offset.
pub fn instant_add(
    evaluator: &Evaluator<'_>,
    instant: Instant,
    duration: &Duration,
) -> CalcResult<Instant> {
    if duration.is_calendar_safe() && !duration.is_time_only() {
        let tz = evaluator.clock.system_timezone();
        let zoned = ZonedDateTime::new(instant, tz);
        if let Ok(added) = zoned.add(duration, evaluator.tz_provider) {
            return Ok(added.instant);
        }
    }
    Ok(instant.add_duration(duration))
}

fn local_now(evaluator: &Evaluator<'_>) -> CalcResult<PlainDateTime> {
    let now = evaluator.now();
    let tz = evaluator.clock.system_timezone();
    let offset = evaluator
        .tz_provider
        .offset_seconds_at(tz.iana(), now.epoch_ms)
        .unwrap_or(0);
    Ok(now.to_datetime_with_offset(offset))
}

/// Normalises any date-like value to an instant, reading plain values
/// in the system timezone.
pub(crate) fn normalize_to_instant(
    evaluator: &Evaluator<'_>,
    value: &Value,
) -> CalcResult<Instant> {
    let tz = evaluator.clock.system_timezone();
    match value {
        Value::Instant(instant) => Ok(*instant),
        Value::Zoned(zoned) => Ok(zoned.instant),
        Value::Date(date) => {
            let datetime = PlainDateTime::at_midnight(*date);
            Ok(ZonedDateTime::from_local(&datetime, tz, evaluator.tz_provider)?.instant)
        }
        Value::Time(time) => {
            let today = local_now(evaluator)?.date;
            let datetime = PlainDateTime::new(today, *time);
            Ok(ZonedDateTime::from_local(&datetime, tz, evaluator.tz_provider)?.instant)
        }
        Value::DateTime(datetime) => {
            Ok(ZonedDateTime::from_local(datetime, tz, evaluator.tz_provider)?.instant)
        }
        _ => Err(CalcError::internal().with_message("not a date-like value")),
    }
}

/// The `+`/`-` matrix. Returns `Ok(None)` when neither operand is
/// date-like or a duration, handing control back to numeric addition.
pub(crate) fn add_or_sub(
    evaluator: &Evaluator<'_>,
    lhs: &Value,
    rhs: &Value,
    subtract: bool,
) -> CalcResult<Option<Value>> {
    let settings = evaluator.settings;

    // Duration ± Duration.
    if let (Value::Duration(a), Value::Duration(b)) = (lhs, rhs) {
        let b = if subtract { b.negated() } else { *b };
        return Ok(Some(Value::Duration(a.checked_add(&b)?)));
    }

    if lhs.is_date_like() {
        // date-like ± duration-or-promotable.
        if let Some(duration) = promote_to_duration(rhs, settings) {
            let duration = if subtract { duration.negated() } else { duration };
            return add_duration_to(evaluator, lhs, &duration).map(Some);
        }
        // date-like − date-like.
        if rhs.is_date_like() {
            if subtract {
                return subtract_date_likes(evaluator, lhs, rhs).map(Some);
            }
            // PlainDate + PlainTime assembles a date-time.
            if let (Value::Date(date), Value::Time(time)) = (lhs, rhs) {
                return Ok(Some(Value::DateTime(PlainDateTime::new(*date, *time))));
            }
            return Err(CalcError::dimension()
                .with_message("cannot add two date/time values"));
        }
        return Err(CalcError::dimension()
            .with_message("cannot combine a date/time value with this operand"));
    }

    // Duration ± promotable number (so `2 h + 30 min ago` chains work).
    if let Value::Duration(a) = lhs {
        if let Some(b) = promote_to_duration(rhs, settings) {
            let b = if subtract { b.negated() } else { b };
            return Ok(Some(Value::Duration(a.checked_add(&b)?)));
        }
        return Err(CalcError::dimension()
            .with_message("durations only combine with time-dimensioned values"));
    }
    if matches!(rhs, Value::Duration(_)) {
        if let Some(a) = promote_to_duration(lhs, settings) {
            let Value::Duration(b) = rhs else { unreachable!() };
            let b = if subtract { b.negated() } else { *b };
            return Ok(Some(Value::Duration(a.checked_add(&b)?)));
        }
    }
    if rhs.is_date_like() {
        return Err(CalcError::dimension()
            .with_message("a date/time value must be the left operand"));
    }

    Ok(None)
}

fn add_duration_to(
    evaluator: &Evaluator<'_>,
    lhs: &Value,
    duration: &Duration,
) -> CalcResult<Value> {
    match lhs {
        Value::Date(date) => {
            if duration.is_date_only() && duration.is_calendar_safe() {
                return Ok(Value::Date(date.add(duration)?));
            }
            // Time components lift the date to a midnight date-time.
            let datetime = PlainDateTime::at_midnight(*date).add(duration)?;
            Ok(Value::DateTime(datetime))
        }
        Value::Time(time) => {
            if duration.is_time_only() && duration.is_calendar_safe() {
                let (overflow, wrapped) = time.add_ms(duration.time_ms().round() as i64);
                if overflow == 0 {
                    return Ok(Value::Time(wrapped));
                }
            }
            // Crossing a day boundary (or calendar components) brings
            // today's date in.
            let today = local_now(evaluator)?.date;
            let datetime = PlainDateTime::new(today, *time).add(duration)?;
            Ok(Value::DateTime(datetime))
        }
        Value::DateTime(datetime) => Ok(Value::DateTime(datetime.add(duration)?)),
        Value::Instant(instant) => {
            instant_add(evaluator, *instant, duration).map(Value::Instant)
        }
        Value::Zoned(zoned) => Ok(Value::Zoned(zoned.add(duration, evaluator.tz_provider)?)),
        _ => Err(CalcError::internal().with_message("not a date-like value")),
    }
}

fn subtract_date_likes(
    evaluator: &Evaluator<'_>,
    lhs: &Value,
    rhs: &Value,
) -> CalcResult<Value> {
    match (lhs, rhs) {
        // Same-kind differences keep calendar components.
        (Value::Date(a), Value::Date(b)) => Ok(Value::Duration(b.until(a))),
        (Value::Time(a), Value::Time(b)) => Ok(Value::Duration(b.until(a))),
        (Value::DateTime(a), Value::DateTime(b)) => Ok(Value::Duration(b.until(a))),
        (Value::Instant(a), Value::Instant(b)) => Ok(Value::Duration(b.until(a))),
        (Value::Zoned(a), Value::Zoned(b)) => Ok(Value::Duration(b.until(a))),
        // Cross-kind differences normalise to instants.
        _ => {
            let a = normalize_to_instant(evaluator, lhs)?;
            let b = normalize_to_instant(evaluator, rhs)?;
            Ok(Value::Duration(b.until(&a)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::{FixedClock, PlainDate, PlainTime};
    use crate::eval::EvaluationContext;
    use crate::settings::Settings;
    use crate::syntax::Parser;
    use crate::tz::{TimezoneTable, UtcProvider};
    use crate::units::UnitRegistry;

    struct Fixture {
        registry: UnitRegistry,
        timezones: TimezoneTable,
        clock: FixedClock,
        provider: UtcProvider,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                registry: UnitRegistry::builtin(),
                timezones: TimezoneTable::builtin(),
                // 2026-08-01T12:00:00Z
                clock: FixedClock::new(1_785_585_600_000, crate::tz::TimeZone::utc()),
                provider: UtcProvider,
            }
        }

        fn eval(&self, src: &str) -> Value {
            let parser = Parser::new(&self.registry, &self.timezones);
            let outcome = parser.parse_line(src);
            let evaluator = Evaluator::new(
                &self.registry,
                &self.timezones,
                Settings::default(),
                &self.clock,
                &self.provider,
            );
            let context = EvaluationContext::new();
            for candidate in &outcome.candidates {
                let trial = evaluator.try_evaluate_line(candidate, &context);
                if !trial.value.is_error() {
                    return trial.value;
                }
            }
            evaluator
                .try_evaluate_line(&outcome.candidates[0], &context)
                .value
        }
    }

    #[test]
    fn date_plus_month_clamps() {
        let fixture = Fixture::new();
        let value = fixture.eval("1970 Jan 31 + 1 month");
        assert_eq!(value, Value::Date(PlainDate::new(1970, 2, 28).unwrap()));
    }

    #[test]
    fn date_plus_timeful_duration_becomes_datetime() {
        let fixture = Fixture::new();
        let value = fixture.eval("1970 Jan 1 + 90 minutes");
        let Value::DateTime(datetime) = value else {
            panic!("expected a date-time, got {value:?}");
        };
        assert_eq!(datetime.time, PlainTime::new(1, 30, 0, 0).unwrap());
    }

    #[test]
    fn date_difference_is_calendar_components() {
        let fixture = Fixture::new();
        let value = fixture.eval("2024-03-01 - 2024-01-31");
        let Value::Duration(duration) = value else {
            panic!("expected a duration, got {value:?}");
        };
        assert_eq!(duration.months, 1.0);
        assert_eq!(duration.days, 1.0);
    }

    #[test]
    fn instant_difference_is_seconds() {
        let fixture = Fixture::new();
        let value =
            fixture.eval("2024-01-15T10:31:00Z - 2024-01-15T10:30:00Z");
        let Value::Duration(duration) = value else {
            panic!("expected a duration, got {value:?}");
        };
        assert_eq!(duration.seconds, 60.0);
        assert_eq!(duration.years, 0.0);
    }

    #[test]
    fn time_plus_duration_wraps_into_datetime() {
        let fixture = Fixture::new();
        let value = fixture.eval("23:30 + 45 minutes");
        let Value::DateTime(datetime) = value else {
            panic!("expected a date-time, got {value:?}");
        };
        assert_eq!(datetime.date, PlainDate::new(2026, 8, 2).unwrap());
        assert_eq!(datetime.time, PlainTime::new(0, 15, 0, 0).unwrap());

        let value = fixture.eval("10:00 + 30 minutes");
        assert_eq!(value, Value::Time(PlainTime::new(10, 30, 0, 0).unwrap()));
    }

    #[test]
    fn composite_time_promotes_to_duration() {
        let fixture = Fixture::new();
        let value = fixture.eval("2026-01-01 + 1h 30min");
        let Value::DateTime(datetime) = value else {
            panic!("expected a date-time, got {value:?}");
        };
        assert_eq!(datetime.time, PlainTime::new(1, 30, 0, 0).unwrap());
    }

    #[test]
    fn relative_instants() {
        let fixture = Fixture::new();
        let value = fixture.eval("2 days ago");
        let Value::Instant(instant) = value else {
            panic!("expected an instant, got {value:?}");
        };
        assert_eq!(instant.epoch_ms, 1_785_585_600_000 - 2 * 86_400_000);
    }
}
