//! End-to-end documents through the whole pipeline.

use numdown::datetime::FixedClock;
use numdown::eval::Value;
use numdown::tz::FixedOffsetProvider;
use numdown::units::database::RateTable;
use numdown::{PlainDate, Session, Settings, TimeZone};

/// 2026-08-01T12:00:00Z.
const NOW_MS: i64 = 1_785_585_600_000;

fn session() -> Session {
    Session::new()
        .with_clock(FixedClock::new(NOW_MS, TimeZone::utc()))
        .with_tz_provider(
            FixedOffsetProvider::new()
                .with_zone("Asia/Tokyo", 9 * 3600)
                .with_zone("America/New_York", -5 * 3600),
        )
}

fn eval_line(session: &mut Session, line: &str) -> Value {
    let result = session.evaluate_document(line);
    result.lines[0]
        .clone()
        .unwrap_or_else(|| panic!("no value for {line:?}: {:?}", result.errors))
}

fn expect_number(session: &mut Session, line: &str) -> (f64, Option<String>) {
    match eval_line(session, line) {
        Value::Number(number) => (
            number.value,
            number.unit.map(|unit| unit.id.as_ref().to_string()),
        ),
        other => panic!("{line:?}: expected a number, got {other:?}"),
    }
}

#[test]
fn metric_addition_keeps_left_unit() {
    let mut session = session();
    let (value, unit) = expect_number(&mut session, "5 m + 20 cm");
    assert!((value - 5.2).abs() < 1e-12);
    assert_eq!(unit.as_deref(), Some("meter"));
}

#[test]
fn height_converts_to_feet_and_inches() {
    let mut session = session();
    let value = eval_line(&mut session, "171 cm to ft in");
    let Value::Composite(parts) = value else {
        panic!("expected a composite, got {value:?}");
    };
    assert_eq!(parts[0].1.id.as_ref(), "foot");
    assert!((parts[0].0 - 5.0).abs() < 1e-12);
    assert_eq!(parts[1].1.id.as_ref(), "inch");
    // The last component carries the fractional residue.
    assert!((parts[1].0 - 7.32283464566929).abs() < 1e-9);
}

#[test]
fn shuffled_composite_targets_distribute_largest_first() {
    let mut session = session();
    let value = eval_line(&mut session, "171 cm to in ft");
    let Value::Composite(parts) = value else {
        panic!("expected a composite, got {value:?}");
    };
    assert_eq!(parts[0].1.id.as_ref(), "foot");
    assert!((parts[0].0 - 5.0).abs() < 1e-12);
    assert_eq!(parts[1].1.id.as_ref(), "inch");
    assert!((parts[1].0 - 7.32283464566929).abs() < 1e-9);
}

#[test]
fn speed_converts_between_derived_units() {
    let mut session = session();
    let value = eval_line(&mut session, "100 km/h to m/s");
    let Value::Derived(derived) = value else {
        panic!("expected a derived value, got {value:?}");
    };
    assert!((derived.value - 27.777777777777779).abs() < 1e-9);
}

#[test]
fn prime_glyphs_follow_degree_context() {
    let mut session = session();

    let value = eval_line(&mut session, "30° 15' 30\"");
    let Value::Composite(parts) = value else {
        panic!("expected a composite, got {value:?}");
    };
    let ids: Vec<&str> = parts.iter().map(|(_, unit)| unit.id.as_ref()).collect();
    assert_eq!(ids, ["degree", "arcminute", "arcsecond"]);

    let value = eval_line(&mut session, "6' 10\"");
    let Value::Composite(parts) = value else {
        panic!("expected a composite, got {value:?}");
    };
    let ids: Vec<&str> = parts.iter().map(|(_, unit)| unit.id.as_ref()).collect();
    assert_eq!(ids, ["foot", "inch"]);
}

#[test]
fn constrained_month_addition() {
    let mut session = session();
    let value = eval_line(&mut session, "1970 Jan 31 + 1 month");
    assert_eq!(value, Value::Date(PlainDate::new(1970, 2, 28).unwrap()));
}

#[test]
fn conditional_expression() {
    let mut session = session();
    let (value, _) = expect_number(&mut session, "if 5 > 3 then 10 else 20");
    assert_eq!(value, 10.0);
}

#[test]
fn variables_carry_units_across_lines() {
    let mut session = session();
    let result = session.evaluate_document("x = 10 m\nx + 20 cm");
    let Some(Value::Number(number)) = result.lines[1].clone() else {
        panic!("expected a number");
    };
    assert!((number.value - 10.2).abs() < 1e-12);
    assert_eq!(number.unit.unwrap().id.as_ref(), "meter");
}

#[test]
fn scientific_notation_beats_eulers_number() {
    let mut session = session();
    let (value, unit) = expect_number(&mut session, "2e3");
    assert_eq!(value, 2000.0);
    assert_eq!(unit, None);

    // A spaced-out `e` is the constant.
    let (value, _) = expect_number(&mut session, "2 * e");
    assert!((value - 2.0 * std::f64::consts::E).abs() < 1e-12);
}

#[test]
fn currency_conversion_uses_the_rate_table() {
    let mut session = session();
    let rates: RateTable = serde_json::from_str(
        r#"{"date":"2026-08-01","usd":{"eur":0.5,"jpy":100.0}}"#,
    )
    .unwrap();
    session.set_rate_table(rates);

    let (value, unit) = expect_number(&mut session, "10 EUR to USD");
    assert!((value - 20.0).abs() < 1e-9);
    assert_eq!(unit.as_deref(), Some("usd"));

    let (value, _) = expect_number(&mut session, "10 EUR to JPY");
    assert!((value - 2000.0).abs() < 1e-9);
}

#[test]
fn ambiguous_currency_symbols_do_not_interconvert() {
    let mut session = session();
    let rates: RateTable =
        serde_json::from_str(r#"{"date":"2026-08-01","usd":{"eur":0.5}}"#).unwrap();
    session.set_rate_table(rates);

    let result = session.evaluate_document("$100 + ¥100");
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, numdown::ErrorKind::Dimension);

    // The same symbol works fine.
    let result = session.evaluate_document("$100 + $50");
    assert!(result.errors.is_empty());
}

#[test]
fn rate_swap_changes_the_next_document() {
    let mut session = session();
    let rates: RateTable =
        serde_json::from_str(r#"{"date":"2026-08-01","usd":{"eur":0.5}}"#).unwrap();
    session.set_rate_table(rates);
    let (before, _) = expect_number(&mut session, "10 EUR to USD");

    let rates: RateTable =
        serde_json::from_str(r#"{"date":"2026-08-02","usd":{"eur":1.0}}"#).unwrap();
    session.set_rate_table(rates);
    let (after, _) = expect_number(&mut session, "10 EUR to USD");

    assert!((before - 20.0).abs() < 1e-9);
    assert!((after - 10.0).abs() < 1e-9);
}

#[test]
fn timezone_conversion_end_to_end() {
    let mut session = session();
    let value = eval_line(&mut session, "2026-08-01T00:00:00Z in Tokyo");
    let Value::Zoned(zoned) = value else {
        panic!("expected a zoned value, got {value:?}");
    };
    assert_eq!(zoned.tz.iana(), "Asia/Tokyo");
    assert_eq!(zoned.instant.epoch_ms, NOW_MS - 12 * 3_600_000);
}

#[test]
fn durations_between_datetimes_convert_to_units() {
    let mut session = session();
    let (value, unit) =
        expect_number(&mut session, "(2026-08-02T06:00 - 2026-08-01T18:00) to hours");
    assert!((value - 12.0).abs() < 1e-9);
    assert_eq!(unit.as_deref(), Some("hour"));
}

#[test]
fn percentages_apply_relatively() {
    let mut session = session();
    let (value, _) = expect_number(&mut session, "100 + 10%");
    assert!((value - 110.0).abs() < 1e-12);
    let (value, unit) = expect_number(&mut session, "80 kg - 25%");
    assert!((value - 60.0).abs() < 1e-12);
    assert_eq!(unit.as_deref(), Some("kilogram"));
}

#[test]
fn presentation_targets_wrap_without_changing_the_value() {
    let mut session = session();
    let value = eval_line(&mut session, "255 to hex");
    let Value::Presentation(wrapped) = value else {
        panic!("expected a presentation, got {value:?}");
    };
    assert_eq!(wrapped.format, numdown::Format::Hex);
    let Value::Number(number) = wrapped.inner else {
        panic!("expected a number inside");
    };
    assert_eq!(number.value, 255.0);
}

#[test]
fn uk_variant_changes_gallons() {
    let us = expect_number(&mut session(), "1 gallon to l").0;
    let mut uk_session = session().with_settings(
        serde_json::from_str::<Settings>(r#"{"variant":"uk"}"#).unwrap(),
    );
    let uk = expect_number(&mut uk_session, "1 gallon to l").0;
    assert!((us - 3.785411784).abs() < 1e-9);
    assert!((uk - 4.54609).abs() < 1e-9);
}

#[test]
fn selector_is_stable_across_reruns() {
    let doc = "x = 171 cm\nx to ft in\n100 km/h to m/s\n1970 Jan 31 + 1 month";
    let mut a = session();
    let mut b = session();
    assert_eq!(a.evaluate_document(doc).lines, b.evaluate_document(doc).lines);
}

#[test]
fn leading_text_is_skipped_for_embedded_math() {
    let mut session = session();
    let result = session.evaluate_document("Rent 1200 + 300");
    let Some(Value::Number(number)) = result.lines[0].clone() else {
        panic!("expected a number, got {:?}", result.lines[0]);
    };
    assert_eq!(number.value, 1500.0);
}

#[test]
fn round_trip_conversion_property() {
    let mut session = session();
    // Linear conversions invert to within 1e-9 relative tolerance.
    for (a, b) in [("km", "mi"), ("kg", "lb"), ("l", "floz"), ("J", "BTU")] {
        let (there, _) = expect_number(&mut session, &format!("123.456 {a} to {b}"));
        let (back, _) = expect_number(&mut session, &format!("{there} {b} to {a}"));
        assert!(
            (back - 123.456).abs() / 123.456 < 1e-9,
            "{a}->{b} round trip drifted: {back}"
        );
    }
}
