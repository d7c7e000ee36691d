//! Runtime values and the numeric operator semantics over them.

use std::sync::Arc;

use num_traits::ToPrimitive;

use crate::datetime::{Duration, Instant, PlainDate, PlainDateTime, PlainTime, ZonedDateTime};
use crate::error::CalcError;
use crate::settings::Settings;
use crate::syntax::ast::BinaryOp;
use crate::units::dimension::{self, Collapsed, UnitTerm};
use crate::units::{Unit, UnitRegistry};
use crate::CalcResult;

/// A display directive carried by a presentation value; resolved by
/// the host's formatter, never by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Binary,
    Octal,
    Decimal,
    Hex,
    Base(u8),
    Fraction,
    Ordinal,
    Scientific,
    Iso8601,
    Rfc2822,
    UnixSeconds,
    UnixMillis,
    Decimals(u8),
    SigFigs(u8),
}

/// A number with an optional simple unit.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberValue {
    pub value: f64,
    pub unit: Option<Arc<Unit>>,
    /// Display-precision hint from the source literal.
    pub precision: Option<u8>,
    /// Whether this number was written as a percentage; `100 + 10%`
    /// reads the percent relatively.
    pub percent: bool,
}

impl NumberValue {
    #[must_use]
    pub fn plain(value: f64) -> Self {
        Self {
            value,
            unit: None,
            precision: None,
            percent: false,
        }
    }

    #[must_use]
    pub fn with_unit(value: f64, unit: Arc<Unit>) -> Self {
        Self {
            value,
            unit: Some(unit),
            precision: None,
            percent: false,
        }
    }
}

/// A number carrying a derived unit as `(unit, exponent)` terms.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedValue {
    pub value: f64,
    pub terms: Vec<UnitTerm>,
}

/// A value wrapped with a presentation directive.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationValue {
    pub inner: Value,
    pub format: Format,
}

/// The typed result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(NumberValue),
    Derived(DerivedValue),
    Composite(Vec<(f64, Arc<Unit>)>),
    Date(PlainDate),
    Time(PlainTime),
    DateTime(PlainDateTime),
    Instant(Instant),
    Zoned(ZonedDateTime),
    Duration(Duration),
    Presentation(Box<PresentationValue>),
    Bool(bool),
    Error(CalcError),
}

impl Value {
    /// Whether this value is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Whether this value is a date/time shape.
    #[must_use]
    pub fn is_date_like(&self) -> bool {
        matches!(
            self,
            Self::Date(_) | Self::Time(_) | Self::DateTime(_) | Self::Instant(_) | Self::Zoned(_)
        )
    }
}

/// Unwraps presentation layers; operators work on the inner value.
#[must_use]
pub fn strip_presentation(value: Value) -> Value {
    match value {
        Value::Presentation(wrapped) => strip_presentation(wrapped.inner),
        other => other,
    }
}

/// Wraps a value with a format; an already-wrapped value keeps only
/// the outermost directive.
#[must_use]
pub fn wrap_presentation(value: Value, format: Format) -> Value {
    Value::Presentation(Box::new(PresentationValue {
        inner: strip_presentation(value),
        format,
    }))
}

/// Collapses a term list into the narrowest value shape.
#[must_use]
pub fn collapse_terms(value: f64, terms: Vec<UnitTerm>, decimals: u8) -> Value {
    match dimension::collapse(terms) {
        Collapsed::Dimensionless => Value::Number(NumberValue {
            value,
            unit: None,
            precision: (decimals > 0).then_some(decimals),
            percent: false,
        }),
        Collapsed::Simple(unit) => Value::Number(NumberValue {
            value,
            unit: Some(unit),
            precision: (decimals > 0).then_some(decimals),
            percent: false,
        }),
        Collapsed::Derived(terms) => Value::Derived(DerivedValue { value, terms }),
    }
}

/// A numeric value as `(magnitude, unit terms)`, collapsing composites
/// into their leading unit.
pub(crate) fn terms_of(value: &Value, settings: Settings) -> CalcResult<(f64, Vec<UnitTerm>)> {
    match value {
        Value::Number(number) => Ok((
            number.value,
            number
                .unit
                .as_ref()
                .map(|unit| vec![UnitTerm::new(unit.clone(), 1)])
                .unwrap_or_default(),
        )),
        Value::Derived(derived) => Ok((derived.value, derived.terms.clone())),
        Value::Composite(parts) => {
            let (value, unit) = composite_as_leading_unit(parts, settings)?;
            Ok((value, vec![UnitTerm::new(unit, 1)]))
        }
        _ => Err(CalcError::dimension().with_message("expected a numeric value")),
    }
}

/// Sums a composite into its leading component's unit.
pub(crate) fn composite_as_leading_unit(
    parts: &[(f64, Arc<Unit>)],
    settings: Settings,
) -> CalcResult<(f64, Arc<Unit>)> {
    let Some((_, first)) = parts.first() else {
        return Err(CalcError::internal().with_message("empty composite"));
    };
    let mut base = 0.0;
    for (value, unit) in parts {
        base += unit.conversion.to_base(*value, settings.variant);
    }
    Ok((
        first.conversion.from_base(base, settings.variant),
        first.clone(),
    ))
}

/// Requires a dimensionless value and truncates it to an integer.
pub(crate) fn expect_dimensionless_integer(value: &Value, op: &str) -> CalcResult<i64> {
    let Value::Number(NumberValue {
        value, unit: None, ..
    }) = value
    else {
        return Err(CalcError::dimension()
            .with_message(format!("{op} needs a dimensionless number")));
    };
    value.trunc().to_i64().ok_or_else(|| {
        CalcError::domain().with_message(format!("{op} operand does not fit a 64-bit integer"))
    })
}

pub(crate) fn negate(value: Value) -> CalcResult<Value> {
    match value {
        Value::Number(mut number) => {
            number.value = -number.value;
            number.percent = false;
            Ok(Value::Number(number))
        }
        Value::Derived(mut derived) => {
            derived.value = -derived.value;
            Ok(Value::Derived(derived))
        }
        Value::Composite(parts) => Ok(Value::Composite(
            parts.into_iter().map(|(v, u)| (-v, u)).collect(),
        )),
        Value::Duration(duration) => Ok(Value::Duration(duration.negated())),
        _ => Err(CalcError::domain().with_message("cannot negate this value")),
    }
}

fn dimension_mismatch(a: &[UnitTerm], b: &[UnitTerm]) -> CalcError {
    let describe = |terms: &[UnitTerm]| {
        if terms.is_empty() {
            "a plain number".to_string()
        } else {
            terms
                .iter()
                .map(|t| {
                    if t.exponent == 1 {
                        t.unit.id.to_string()
                    } else {
                        format!("{}^{}", t.unit.id, t.exponent)
                    }
                })
                .collect::<Vec<_>>()
                .join("·")
        }
    };
    CalcError::dimension().with_message(format!(
        "cannot combine {} with {}",
        describe(a),
        describe(b)
    ))
}

/// Addition and subtraction over numeric shapes, including the
/// relative-percent rule and affine temperature handling.
pub(crate) fn add_sub(
    registry: &UnitRegistry,
    lhs: Value,
    rhs: Value,
    subtract: bool,
    settings: Settings,
) -> CalcResult<Value> {
    // `x + p%` applies the percentage of x.
    if let Value::Number(NumberValue {
        value: fraction,
        unit: None,
        percent: true,
        ..
    }) = rhs
    {
        if !matches!(lhs, Value::Number(NumberValue { percent: true, .. })) {
            let applied = if subtract {
                1.0 - fraction
            } else {
                1.0 + fraction
            };
            return scale(lhs, applied);
        }
    }

    // Affine units only combine through their base.
    let affine = |value: &Value| match value {
        Value::Number(NumberValue {
            unit: Some(unit), ..
        }) => unit.conversion.is_affine(settings.variant),
        _ => false,
    };
    if affine(&lhs) || affine(&rhs) {
        let (Value::Number(a), Value::Number(b)) = (&lhs, &rhs) else {
            return Err(CalcError::dimension()
                .with_message("offset-scale units only combine with simple units"));
        };
        let (Some(unit_a), Some(unit_b)) = (&a.unit, &b.unit) else {
            return Err(dimension_mismatch(&[], &[]));
        };
        if unit_a.dimension.base_map != unit_b.dimension.base_map {
            return Err(dimension_mismatch(
                &[UnitTerm::new(unit_a.clone(), 1)],
                &[UnitTerm::new(unit_b.clone(), 1)],
            ));
        }
        let base_a = unit_a.conversion.to_base(a.value, settings.variant);
        let base_b = unit_b.conversion.to_base(b.value, settings.variant);
        let base = if subtract { base_a - base_b } else { base_a + base_b };
        let base_unit = registry.base_unit_of(&unit_a.dimension)?;
        return Ok(Value::Number(NumberValue::with_unit(base, base_unit)));
    }

    let (a_value, a_terms) = terms_of(&lhs, settings)?;
    let (b_value, b_terms) = terms_of(&rhs, settings)?;
    if !dimension::compatible(&a_terms, &b_terms) {
        return Err(dimension_mismatch(&a_terms, &b_terms));
    }
    let b_in_a = crate::units::convert::convert_derived(
        b_value,
        &b_terms,
        &a_terms,
        settings.variant,
    )?;
    let result = if subtract {
        a_value - b_in_a
    } else {
        a_value + b_in_a
    };
    Ok(collapse_terms(result, a_terms, 0))
}

fn scale(value: Value, factor: f64) -> CalcResult<Value> {
    match value {
        Value::Number(mut number) => {
            number.value *= factor;
            number.percent = false;
            Ok(Value::Number(number))
        }
        Value::Derived(mut derived) => {
            derived.value *= factor;
            Ok(Value::Derived(derived))
        }
        Value::Composite(parts) => Ok(Value::Composite(
            parts.into_iter().map(|(v, u)| (v * factor, u)).collect(),
        )),
        _ => Err(CalcError::dimension().with_message("expected a numeric value")),
    }
}

pub(crate) fn multiply(lhs: Value, rhs: Value, settings: Settings) -> CalcResult<Value> {
    let (a_value, a_terms) = terms_of(&lhs, settings)?;
    let (b_value, b_terms) = terms_of(&rhs, settings)?;
    let combined = dimension::combine(&a_terms, &b_terms);
    let (value, terms) = dimension::simplify(a_value * b_value, combined, settings.variant)?;
    Ok(collapse_terms(value, terms, 0))
}

pub(crate) fn divide(lhs: Value, rhs: Value, settings: Settings) -> CalcResult<Value> {
    let (a_value, a_terms) = terms_of(&lhs, settings)?;
    let (b_value, b_terms) = terms_of(&rhs, settings)?;
    if b_value == 0.0 {
        return Err(CalcError::division_by_zero());
    }
    let inverted: Vec<UnitTerm> = b_terms
        .iter()
        .map(|t| UnitTerm::new(t.unit.clone(), -t.exponent))
        .collect();
    let combined = dimension::combine(&a_terms, &inverted);
    let (value, terms) = dimension::simplify(a_value / b_value, combined, settings.variant)?;
    Ok(collapse_terms(value, terms, 0))
}

pub(crate) fn remainder(
    lhs: Value,
    rhs: Value,
    euclidean: bool,
    settings: Settings,
) -> CalcResult<Value> {
    let (a_value, a_terms) = terms_of(&lhs, settings)?;
    let (b_value, b_terms) = terms_of(&rhs, settings)?;
    if !dimension::compatible(&a_terms, &b_terms) {
        return Err(dimension_mismatch(&a_terms, &b_terms));
    }
    let b_in_a = crate::units::convert::convert_derived(
        b_value,
        &b_terms,
        &a_terms,
        settings.variant,
    )?;
    if b_in_a == 0.0 {
        return Err(CalcError::modulo_by_zero());
    }
    let value = if euclidean {
        a_value.rem_euclid(b_in_a)
    } else {
        a_value % b_in_a
    };
    Ok(collapse_terms(value, a_terms, 0))
}

pub(crate) fn power(
    registry: &UnitRegistry,
    lhs: Value,
    rhs: Value,
    settings: Settings,
) -> CalcResult<Value> {
    let Value::Number(NumberValue {
        value: exponent,
        unit: None,
        ..
    }) = rhs
    else {
        return Err(CalcError::dimension().with_message("the exponent must be dimensionless"));
    };
    let (base_value, base_terms) = terms_of(&lhs, settings)?;
    if base_terms.is_empty() {
        let result = base_value.powf(exponent);
        if result.is_nan() {
            return Err(CalcError::domain().with_message("result is not a real number"));
        }
        return Ok(Value::Number(NumberValue::plain(result)));
    }
    if exponent.fract() != 0.0 {
        return Err(CalcError::dimension()
            .with_message("raising a united value needs an integer exponent"));
    }
    let n = exponent
        .to_i32()
        .ok_or_else(|| CalcError::domain().with_message("exponent out of range"))?;
    let value = base_value.powi(n);
    let (value, terms) = dimension::pow_terms(registry, value, &base_terms, n, settings.variant)?;
    Ok(collapse_terms(value, terms, 0))
}

pub(crate) fn compare(
    op: BinaryOp,
    lhs: Value,
    rhs: Value,
    settings: Settings,
) -> CalcResult<Value> {
    use core::cmp::Ordering;

    let ordering: Option<Ordering> = match (&lhs, &rhs) {
        (Value::Bool(a), Value::Bool(b)) => {
            return match op {
                BinaryOp::Eq => Ok(Value::Bool(a == b)),
                BinaryOp::Ne => Ok(Value::Bool(a != b)),
                _ => Err(CalcError::domain().with_message("booleans only support == and !=")),
            }
        }
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
        (Value::Instant(a), Value::Instant(b)) => Some(a.cmp(b)),
        (Value::Zoned(a), Value::Zoned(b)) => Some(a.instant.cmp(&b.instant)),
        (Value::Duration(a), Value::Duration(b)) => a.total_ms().partial_cmp(&b.total_ms()),
        _ => {
            let (a_value, a_terms) = terms_of(&lhs, settings)?;
            let (b_value, b_terms) = terms_of(&rhs, settings)?;
            if !dimension::compatible(&a_terms, &b_terms) {
                return Err(dimension_mismatch(&a_terms, &b_terms));
            }
            let b_in_a = crate::units::convert::convert_derived(
                b_value,
                &b_terms,
                &a_terms,
                settings.variant,
            )?;
            a_value.partial_cmp(&b_in_a)
        }
    };
    let Some(ordering) = ordering else {
        return Err(CalcError::domain().with_message("values cannot be ordered"));
    };
    let result = match op {
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        _ => return Err(CalcError::internal()),
    };
    Ok(Value::Bool(result))
}
