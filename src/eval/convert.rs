//! Conversion-operator dispatch.
//!
//! `to | in | as | →` routes by target kind: unit and composite
//! targets go through the converter, timezone targets re-zone
//! date-like values, property targets extract date/time fields, and
//! presentation targets wrap the value for the display layer.

use std::sync::Arc;

use crate::datetime::{PlainDateTime, ZonedDateTime};
use crate::error::CalcError;
use crate::syntax::ast::{ConvertTarget, DateProperty, UnitExpr};
use crate::tz::TimeZone;
use crate::units::convert as unit_convert;
use crate::units::dimension::UnitTerm;
use crate::units::Unit;
use crate::CalcResult;

use super::value::{
    self, composite_as_leading_unit, strip_presentation, wrap_presentation, NumberValue, Value,
};
use super::Evaluator;

pub(crate) fn dispatch(
    evaluator: &Evaluator<'_>,
    value: Value,
    target: &ConvertTarget,
) -> CalcResult<Value> {
    match target {
        ConvertTarget::Presentation(format) => Ok(wrap_presentation(value, *format)),
        ConvertTarget::Timezone(iana) => {
            to_timezone(evaluator, strip_presentation(value), iana)
        }
        ConvertTarget::Property(property) => {
            extract_property(evaluator, strip_presentation(value), *property)
        }
        ConvertTarget::Unit(unit_expr) => {
            to_unit(evaluator, strip_presentation(value), unit_expr)
        }
        ConvertTarget::Composite(units) => {
            to_composite(evaluator, strip_presentation(value), units)
        }
    }
}

fn to_timezone(evaluator: &Evaluator<'_>, value: Value, iana: &str) -> CalcResult<Value> {
    // The parser stores canonical IANA names; re-resolving here keeps
    // host-supplied targets (variables, API calls) working too.
    let tz = evaluator
        .timezones
        .resolve(iana)
        .unwrap_or_else(|| TimeZone::new(iana));
    let provider = evaluator.tz_provider;
    match value {
        Value::Instant(instant) => Ok(Value::Zoned(ZonedDateTime::new(instant, tz))),
        Value::Zoned(zoned) => Ok(Value::Zoned(zoned.with_timezone(tz))),
        Value::DateTime(datetime) => Ok(Value::Zoned(ZonedDateTime::from_local(
            &datetime, tz, provider,
        )?)),
        Value::Date(date) => Ok(Value::Zoned(ZonedDateTime::from_local(
            &PlainDateTime::at_midnight(date),
            tz,
            provider,
        )?)),
        Value::Time(time) => {
            // A bare time reads as that wall-clock time in the target
            // zone, today.
            let now = evaluator.now();
            let offset = provider.offset_seconds_at(tz.iana(), now.epoch_ms)?;
            let today = now.to_datetime_with_offset(offset).date;
            Ok(Value::Zoned(ZonedDateTime::from_local(
                &PlainDateTime::new(today, time),
                tz,
                provider,
            )?))
        }
        _ => Err(CalcError::conversion()
            .with_message("only date/time values convert to a timezone")),
    }
}

fn extract_property(
    evaluator: &Evaluator<'_>,
    value: Value,
    property: DateProperty,
) -> CalcResult<Value> {
    use DateProperty::*;

    // Everything reduces to a local date-time plus an offset.
    let (datetime, offset_minutes) = match &value {
        Value::Date(date) => (PlainDateTime::at_midnight(*date), 0i64),
        Value::Time(time) => (
            PlainDateTime::new(crate::datetime::PlainDate::new(1970, 1, 1)?, *time),
            0,
        ),
        Value::DateTime(datetime) => (*datetime, 0),
        Value::Instant(instant) => {
            let tz = evaluator.clock.system_timezone();
            let offset = evaluator
                .tz_provider
                .offset_seconds_at(tz.iana(), instant.epoch_ms)?;
            (instant.to_datetime_with_offset(offset), offset / 60)
        }
        Value::Zoned(zoned) => {
            let offset = evaluator
                .tz_provider
                .offset_seconds_at(zoned.tz.iana(), zoned.instant.epoch_ms)?;
            (
                zoned.instant.to_datetime_with_offset(offset),
                offset / 60,
            )
        }
        _ => {
            return Err(CalcError::conversion()
                .with_message("property extraction needs a date/time value"))
        }
    };

    // Date-only values have no clock properties and vice versa.
    let time_only = matches!(value, Value::Time(_));
    let date_only = matches!(value, Value::Date(_));
    let result = match property {
        Year if !time_only => f64::from(datetime.date.year),
        Month if !time_only => f64::from(datetime.date.month),
        Day if !time_only => f64::from(datetime.date.day),
        Weekday if !time_only => f64::from(datetime.date.day_of_week()),
        DayOfYear if !time_only => f64::from(datetime.date.day_of_year()),
        WeekOfYear if !time_only => f64::from(datetime.date.week_of_year()),
        Hour if !date_only => f64::from(datetime.time.hour),
        Minute if !date_only => f64::from(datetime.time.minute),
        Second if !date_only => f64::from(datetime.time.second),
        Millisecond if !date_only => f64::from(datetime.time.millisecond),
        Offset => {
            let minute = evaluator
                .registry
                .unit_by_id("minute")
                .ok_or_else(CalcError::internal)?;
            return Ok(Value::Number(NumberValue::with_unit(
                offset_minutes as f64,
                minute,
            )));
        }
        _ => {
            return Err(CalcError::conversion()
                .with_message("this value does not have that property"))
        }
    };
    Ok(Value::Number(NumberValue::plain(result)))
}

fn resolve_terms(
    evaluator: &Evaluator<'_>,
    unit_expr: &UnitExpr,
) -> CalcResult<Vec<UnitTerm>> {
    unit_expr
        .terms
        .iter()
        .map(|(unit_ref, exponent)| {
            Ok(UnitTerm::new(unit_ref.resolve(evaluator.registry)?, *exponent))
        })
        .collect()
}

fn to_unit(
    evaluator: &Evaluator<'_>,
    value: Value,
    unit_expr: &UnitExpr,
) -> CalcResult<Value> {
    let settings = evaluator.settings;
    let target_terms = resolve_terms(evaluator, unit_expr)?;

    // Durations convert through seconds.
    let value = match value {
        Value::Duration(duration) => {
            let second = evaluator
                .registry
                .unit_by_id("second")
                .ok_or_else(CalcError::internal)?;
            Value::Number(NumberValue::with_unit(duration.total_ms() / 1000.0, second))
        }
        other => other,
    };

    // Simple-to-simple keeps affine conversions available.
    if let [UnitTerm {
        unit: target,
        exponent: 1,
    }] = target_terms.as_slice()
    {
        let simple_source: Option<(f64, Arc<Unit>)> = match &value {
            Value::Number(NumberValue {
                value,
                unit: Some(unit),
                ..
            }) => Some((*value, unit.clone())),
            Value::Composite(parts) => Some(composite_as_leading_unit(parts, settings)?),
            _ => None,
        };
        if let Some((source_value, source_unit)) = simple_source {
            let converted =
                unit_convert::convert_simple(source_value, &source_unit, target, settings.variant)?;
            return Ok(Value::Number(NumberValue::with_unit(
                converted,
                target.clone(),
            )));
        }
    }

    let (source_value, source_terms) = value::terms_of(&value, settings)?;
    let converted = unit_convert::convert_derived(
        source_value,
        &source_terms,
        &target_terms,
        settings.variant,
    )?;
    if let [UnitTerm {
        unit: target,
        exponent: 1,
    }] = target_terms.as_slice()
    {
        return Ok(Value::Number(NumberValue::with_unit(
            converted,
            target.clone(),
        )));
    }
    Ok(Value::Derived(super::value::DerivedValue {
        value: converted,
        terms: target_terms,
    }))
}

fn to_composite(
    evaluator: &Evaluator<'_>,
    value: Value,
    units: &[crate::syntax::ast::UnitRef],
) -> CalcResult<Value> {
    let settings = evaluator.settings;
    let targets: Vec<Arc<Unit>> = units
        .iter()
        .map(|unit_ref| unit_ref.resolve(evaluator.registry))
        .collect::<CalcResult<_>>()?;

    let (source_value, source_unit) = match &value {
        Value::Number(NumberValue {
            value,
            unit: Some(unit),
            ..
        }) => (*value, unit.clone()),
        Value::Composite(parts) => composite_as_leading_unit(parts, settings)?,
        Value::Duration(duration) => {
            let second = evaluator
                .registry
                .unit_by_id("second")
                .ok_or_else(CalcError::internal)?;
            (duration.total_ms() / 1000.0, second)
        }
        _ => {
            return Err(CalcError::conversion()
                .with_message("composite targets need a united value"))
        }
    };
    let parts =
        unit_convert::distribute_composite(source_value, &source_unit, &targets, settings.variant)?;
    Ok(Value::Composite(parts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::FixedClock;
    use crate::eval::EvaluationContext;
    use crate::settings::Settings;
    use crate::syntax::Parser;
    use crate::tz::{FixedOffsetProvider, TimezoneTable};
    use crate::units::UnitRegistry;

    fn eval_with(src: &str) -> Value {
        let registry = UnitRegistry::builtin();
        let timezones = TimezoneTable::builtin();
        let clock = FixedClock::new(1_785_585_600_000, TimeZone::utc()); // 2026-08-01T12:00Z
        let provider = FixedOffsetProvider::new().with_zone("Asia/Tokyo", 9 * 3600);
        let parser = Parser::new(&registry, &timezones);
        let outcome = parser.parse_line(src);
        let evaluator = Evaluator::new(
            &registry,
            &timezones,
            Settings::default(),
            &clock,
            &provider,
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

    #[test]
    fn simple_unit_conversion() {
        let Value::Number(n) = eval_with("2 km to mi") else {
            panic!("expected number");
        };
        assert!((n.value - 1.242_742_384_474_668_6).abs() < 1e-9);
        assert_eq!(n.unit.unwrap().id.as_ref(), "mile");
    }

    #[test]
    fn composite_conversion_distributes() {
        let Value::Composite(parts) = eval_with("171 cm to ft in") else {
            panic!("expected composite");
        };
        assert_eq!(parts.len(), 2);
        assert!((parts[0].0 - 5.0).abs() < 1e-12);
        assert!((parts[1].0 - 7.32283464566929).abs() < 1e-9);
    }

    #[test]
    fn derived_conversion() {
        let Value::Derived(derived) = eval_with("100 km/h to m/s") else {
            panic!("expected derived value");
        };
        assert!((derived.value - 27.7777777777778).abs() < 1e-9);
    }

    #[test]
    fn timezone_conversion_rezones_instants() {
        let Value::Zoned(zoned) = eval_with("2026-08-01T00:00:00Z to Tokyo") else {
            panic!("expected zoned value");
        };
        assert_eq!(zoned.tz.iana(), "Asia/Tokyo");
    }

    #[test]
    fn weekday_property() {
        let Value::Number(n) = eval_with("2026-08-01 to weekday") else {
            panic!("expected number");
        };
        assert_eq!(n.value, 6.0); // Saturday

        let Value::Number(n) = eval_with("2026-08-01 to dayOfYear") else {
            panic!("expected number");
        };
        assert_eq!(n.value, 213.0);
    }

    #[test]
    fn presentation_wrapping() {
        let Value::Presentation(wrapped) = eval_with("255 to hex") else {
            panic!("expected presentation");
        };
        assert_eq!(wrapped.format, super::super::Format::Hex);
    }

    #[test]
    fn duration_to_unit() {
        let Value::Number(n) = eval_with("(14:30 - 13:00) to minutes") else {
            panic!("expected number");
        };
        assert!((n.value - 90.0).abs() < 1e-9);
        assert_eq!(n.unit.unwrap().id.as_ref(), "minute");
    }

    #[test]
    fn percent_target() {
        let Value::Number(n) = eval_with("0.5 to %") else {
            panic!("expected number");
        };
        assert!((n.value - 50.0).abs() < 1e-12);
    }
}
