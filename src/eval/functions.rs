//! Built-in functions.

use crate::error::CalcError;
use crate::settings::AngleUnit;
use crate::units::dimension;
use crate::CalcResult;

use super::value::{self, strip_presentation, NumberValue, Value};
use super::Evaluator;

const FUNCTION_NAMES: &[&str] = &[
    "sin", "cos", "tan", "asin", "acos", "atan", "sinh", "cosh", "tanh", "asinh", "acosh",
    "atanh", "ln", "log", "log2", "log10", "exp", "sqrt", "cbrt", "abs", "round", "floor",
    "ceil", "trunc", "frac", "min", "max",
];

/// Whether a word names a built-in function; the parser uses this to
/// decide between a call and implicit multiplication.
#[must_use]
pub fn is_builtin_function(name: &str) -> bool {
    FUNCTION_NAMES.contains(&name)
}

fn arity(name: &str, args: &[Value], expected: usize) -> CalcResult<()> {
    if args.len() != expected {
        return Err(CalcError::domain().with_message(format!(
            "{name} takes {expected} argument{}",
            if expected == 1 { "" } else { "s" }
        )));
    }
    Ok(())
}

fn plain_argument(name: &str, value: &Value) -> CalcResult<f64> {
    match value {
        Value::Number(NumberValue { value, unit: None, .. }) => Ok(*value),
        _ => Err(CalcError::dimension()
            .with_message(format!("{name} needs a dimensionless argument"))),
    }
}

/// The argument of a trigonometric function in radians: explicit angle
/// units convert, bare numbers follow the `angle_unit` setting.
fn radians_argument(evaluator: &Evaluator<'_>, name: &str, value: &Value) -> CalcResult<f64> {
    match value {
        Value::Number(NumberValue {
            value,
            unit: Some(unit),
            ..
        }) if unit.dimension.id.as_ref() == "cycle" => {
            let factor = unit.conversion.linear_factor(evaluator.settings.variant)?;
            Ok(value * factor * core::f64::consts::TAU)
        }
        Value::Number(NumberValue { value, unit: None, .. }) => {
            match evaluator.settings.angle_unit {
                AngleUnit::Radian => Ok(*value),
                AngleUnit::Degree => Ok(value.to_radians()),
            }
        }
        _ => Err(CalcError::dimension()
            .with_message(format!("{name} needs an angle or a plain number"))),
    }
}

/// Tags an inverse-trig result in radians with the configured angle
/// unit.
fn angle_result(evaluator: &Evaluator<'_>, radians: f64) -> CalcResult<Value> {
    let unit = evaluator.angle_unit()?;
    let value = match evaluator.settings.angle_unit {
        AngleUnit::Radian => radians,
        AngleUnit::Degree => radians.to_degrees(),
    };
    Ok(Value::Number(NumberValue::with_unit(value, unit)))
}

pub(crate) fn call(
    evaluator: &Evaluator<'_>,
    name: &str,
    args: Vec<Value>,
) -> CalcResult<Value> {
    let args: Vec<Value> = args.into_iter().map(strip_presentation).collect();
    match name {
        "sin" | "cos" | "tan" => {
            arity(name, &args, 1)?;
            let radians = radians_argument(evaluator, name, &args[0])?;
            let result = match name {
                "sin" => radians.sin(),
                "cos" => radians.cos(),
                _ => radians.tan(),
            };
            Ok(Value::Number(NumberValue::plain(result)))
        }
        "asin" | "acos" => {
            arity(name, &args, 1)?;
            let x = plain_argument(name, &args[0])?;
            if !(-1.0..=1.0).contains(&x) {
                return Err(CalcError::domain()
                    .with_message(format!("{name} is defined on [-1, 1]")));
            }
            let radians = if name == "asin" { x.asin() } else { x.acos() };
            angle_result(evaluator, radians)
        }
        "atan" => {
            arity(name, &args, 1)?;
            let x = plain_argument(name, &args[0])?;
            angle_result(evaluator, x.atan())
        }
        "sinh" | "cosh" | "tanh" => {
            arity(name, &args, 1)?;
            let x = plain_argument(name, &args[0])?;
            let result = match name {
                "sinh" => x.sinh(),
                "cosh" => x.cosh(),
                _ => x.tanh(),
            };
            Ok(Value::Number(NumberValue::plain(result)))
        }
        "asinh" => {
            arity(name, &args, 1)?;
            let x = plain_argument(name, &args[0])?;
            Ok(Value::Number(NumberValue::plain(x.asinh())))
        }
        "acosh" => {
            arity(name, &args, 1)?;
            let x = plain_argument(name, &args[0])?;
            if x < 1.0 {
                return Err(CalcError::domain().with_message("acosh is defined on [1, ∞)"));
            }
            Ok(Value::Number(NumberValue::plain(x.acosh())))
        }
        "atanh" => {
            arity(name, &args, 1)?;
            let x = plain_argument(name, &args[0])?;
            if x <= -1.0 || x >= 1.0 {
                return Err(CalcError::domain().with_message("atanh is defined on (-1, 1)"));
            }
            Ok(Value::Number(NumberValue::plain(x.atanh())))
        }
        "ln" | "log" | "log2" | "log10" => {
            arity(name, &args, 1)?;
            let x = plain_argument(name, &args[0])?;
            if x <= 0.0 {
                return Err(CalcError::domain()
                    .with_message("logarithm of a non-positive number"));
            }
            let result = match name {
                "ln" => x.ln(),
                "log2" => x.log2(),
                _ => x.log10(),
            };
            Ok(Value::Number(NumberValue::plain(result)))
        }
        "exp" => {
            arity(name, &args, 1)?;
            let x = plain_argument(name, &args[0])?;
            Ok(Value::Number(NumberValue::plain(x.exp())))
        }
        "sqrt" | "cbrt" => {
            arity(name, &args, 1)?;
            root(evaluator, name, &args[0], if name == "sqrt" { 2 } else { 3 })
        }
        "abs" | "floor" | "ceil" | "trunc" | "frac" => {
            arity(name, &args, 1)?;
            unit_preserving(name, &args[0])
        }
        "round" => {
            if args.len() == 2 {
                return round_to_nearest(evaluator, &args[0], &args[1]);
            }
            arity(name, &args, 1)?;
            unit_preserving(name, &args[0])
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(CalcError::domain()
                    .with_message(format!("{name} needs at least one argument")));
            }
            extremum(evaluator, name == "min", args)
        }
        _ => Err(CalcError::unknown_function()
            .with_message(format!("unknown function {name}"))),
    }
}

/// `sqrt`/`cbrt`: on united values, every term exponent must divide
/// evenly.
fn root(
    evaluator: &Evaluator<'_>,
    name: &str,
    value: &Value,
    degree: i32,
) -> CalcResult<Value> {
    let (magnitude, terms) = value::terms_of(value, evaluator.settings)?;
    if terms.is_empty() {
        if degree == 2 && magnitude < 0.0 {
            return Err(CalcError::domain()
                .with_message("square root of a negative number"));
        }
        let result = if degree == 2 {
            magnitude.sqrt()
        } else {
            magnitude.cbrt()
        };
        return Ok(Value::Number(NumberValue::plain(result)));
    }
    if terms.iter().any(|t| t.exponent % degree != 0) {
        return Err(CalcError::dimension().with_message(format!(
            "{name} needs unit exponents divisible by {degree}"
        )));
    }
    if degree == 2 && magnitude < 0.0 {
        return Err(CalcError::domain().with_message("square root of a negative number"));
    }
    let result = if degree == 2 {
        magnitude.sqrt()
    } else {
        magnitude.cbrt()
    };
    let rooted = terms
        .iter()
        .map(|t| dimension::UnitTerm::new(t.unit.clone(), t.exponent / degree))
        .collect();
    Ok(value::collapse_terms(result, rooted, 0))
}

/// Functions that keep their argument's unit.
fn unit_preserving(name: &str, value: &Value) -> CalcResult<Value> {
    let apply = |x: f64| match name {
        "abs" => x.abs(),
        "floor" => x.floor(),
        "ceil" => x.ceil(),
        "trunc" => x.trunc(),
        "frac" => x - x.trunc(),
        _ => x.round(),
    };
    match value {
        Value::Number(number) => {
            let mut number = number.clone();
            number.value = apply(number.value);
            number.percent = false;
            Ok(Value::Number(number))
        }
        Value::Derived(derived) => {
            let mut derived = derived.clone();
            derived.value = apply(derived.value);
            Ok(Value::Derived(derived))
        }
        _ => Err(CalcError::dimension()
            .with_message(format!("{name} needs a numeric argument"))),
    }
}

/// `round(x, nearest)`: rounds x to the nearest multiple of `nearest`
/// and expresses the result in `nearest`'s unit.
fn round_to_nearest(
    evaluator: &Evaluator<'_>,
    x: &Value,
    nearest: &Value,
) -> CalcResult<Value> {
    let settings = evaluator.settings;
    let (x_value, x_terms) = value::terms_of(x, settings)?;
    let (n_value, n_terms) = value::terms_of(nearest, settings)?;
    if !dimension::compatible(&x_terms, &n_terms) {
        return Err(CalcError::dimension()
            .with_message("round target must match the value's dimension"));
    }
    if n_value == 0.0 {
        return Err(CalcError::domain().with_message("cannot round to a zero step"));
    }
    let x_in_n =
        crate::units::convert::convert_derived(x_value, &x_terms, &n_terms, settings.variant)?;
    let rounded = (x_in_n / n_value).round() * n_value;
    Ok(value::collapse_terms(rounded, n_terms, 0))
}

fn extremum(evaluator: &Evaluator<'_>, minimum: bool, args: Vec<Value>) -> CalcResult<Value> {
    let settings = evaluator.settings;
    let mut best: Option<(f64, Value)> = None;
    let (_, reference_terms) = value::terms_of(&args[0], settings)?;
    for arg in args {
        let (arg_value, arg_terms) = value::terms_of(&arg, settings)?;
        if !dimension::compatible(&arg_terms, &reference_terms) {
            return Err(CalcError::dimension()
                .with_message("min/max arguments must share a dimension"));
        }
        let comparable = crate::units::convert::convert_derived(
            arg_value,
            &arg_terms,
            &reference_terms,
            settings.variant,
        )?;
        let better = match &best {
            None => true,
            Some((current, _)) => {
                if minimum {
                    comparable < *current
                } else {
                    comparable > *current
                }
            }
        };
        if better {
            best = Some((comparable, arg));
        }
    }
    best.map(|(_, value)| value)
        .ok_or_else(CalcError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::FixedClock;
    use crate::settings::Settings;
    use crate::tz::{TimeZone, TimezoneTable, UtcProvider};
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
                clock: FixedClock::new(0, TimeZone::utc()),
                provider: UtcProvider,
            }
        }

        fn evaluator(&self, settings: Settings) -> Evaluator<'_> {
            Evaluator::new(
                &self.registry,
                &self.timezones,
                settings,
                &self.clock,
                &self.provider,
            )
        }
    }

    fn number(value: f64) -> Value {
        Value::Number(NumberValue::plain(value))
    }

    #[test]
    fn trig_uses_explicit_degree_units() {
        let fixture = Fixture::new();
        let evaluator = fixture.evaluator(Settings::default());
        let degree = fixture.registry.unit_by_id("degree").unwrap();
        let arg = Value::Number(NumberValue::with_unit(90.0, degree));
        let Value::Number(result) = call(&evaluator, "sin", vec![arg]).unwrap() else {
            panic!()
        };
        assert!((result.value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn trig_follows_the_angle_setting() {
        let fixture = Fixture::new();
        let settings: Settings =
            serde_json::from_str(r#"{"angleUnit":"degree"}"#).unwrap();
        let evaluator = fixture.evaluator(settings);
        let Value::Number(result) = call(&evaluator, "cos", vec![number(180.0)]).unwrap()
        else {
            panic!()
        };
        assert!((result.value + 1.0).abs() < 1e-12);
    }

    #[test]
    fn inverse_trig_is_tagged_with_the_angle_unit() {
        let fixture = Fixture::new();
        let evaluator = fixture.evaluator(Settings::default());
        let Value::Number(result) = call(&evaluator, "asin", vec![number(1.0)]).unwrap()
        else {
            panic!()
        };
        assert_eq!(result.unit.unwrap().id.as_ref(), "radian");
        assert!((result.value - core::f64::consts::FRAC_PI_2).abs() < 1e-12);

        let settings: Settings =
            serde_json::from_str(r#"{"angleUnit":"degree"}"#).unwrap();
        let evaluator = fixture.evaluator(settings);
        let Value::Number(result) = call(&evaluator, "asin", vec![number(1.0)]).unwrap()
        else {
            panic!()
        };
        assert_eq!(result.unit.unwrap().id.as_ref(), "degree");
        assert!((result.value - 90.0).abs() < 1e-12);
    }

    #[test]
    fn sqrt_halves_unit_exponents() {
        let fixture = Fixture::new();
        let evaluator = fixture.evaluator(Settings::default());
        let meter = fixture.registry.unit_by_id("meter").unwrap();
        let area = Value::Derived(crate::eval::value::DerivedValue {
            value: 9.0,
            terms: vec![dimension::UnitTerm::new(meter, 2)],
        });
        let Value::Number(result) = call(&evaluator, "sqrt", vec![area]).unwrap() else {
            panic!()
        };
        assert_eq!(result.value, 3.0);
        assert_eq!(result.unit.unwrap().id.as_ref(), "meter");
    }

    #[test]
    fn round_to_nearest_converts_into_the_step_unit() {
        let fixture = Fixture::new();
        let evaluator = fixture.evaluator(Settings::default());
        let meter = fixture.registry.unit_by_id("meter").unwrap();
        let centimeter = fixture.registry.unit_by_id("centimeter").unwrap();
        let x = Value::Number(NumberValue::with_unit(1.234, meter));
        let step = Value::Number(NumberValue::with_unit(10.0, centimeter));
        let Value::Number(result) = call(&evaluator, "round", vec![x, step]).unwrap() else {
            panic!()
        };
        assert!((result.value - 120.0).abs() < 1e-9);
        assert_eq!(result.unit.unwrap().id.as_ref(), "centimeter");
    }

    #[test]
    fn domain_errors_surface() {
        let fixture = Fixture::new();
        let evaluator = fixture.evaluator(Settings::default());
        assert_eq!(
            call(&evaluator, "ln", vec![number(-1.0)]).unwrap_err().kind(),
            crate::ErrorKind::Domain
        );
        assert_eq!(
            call(&evaluator, "asin", vec![number(2.0)]).unwrap_err().kind(),
            crate::ErrorKind::Domain
        );
    }

    #[test]
    fn min_keeps_the_winning_argument() {
        let fixture = Fixture::new();
        let evaluator = fixture.evaluator(Settings::default());
        let meter = fixture.registry.unit_by_id("meter").unwrap();
        let kilometer = fixture.registry.unit_by_id("kilometer").unwrap();
        let a = Value::Number(NumberValue::with_unit(1.0, kilometer));
        let b = Value::Number(NumberValue::with_unit(50.0, meter));
        let Value::Number(result) = call(&evaluator, "min", vec![a, b]).unwrap() else {
            panic!()
        };
        assert_eq!(result.value, 50.0);
        assert_eq!(result.unit.unwrap().id.as_ref(), "meter");
    }
}
