//! The dimensional algebra.
//!
//! Every unit term list normalises to a map of base-dimension exponents;
//! two values are compatible iff their maps are equal. Multiplication
//! concatenates term lists, simplification folds same-dimension terms
//! into one representative term, and exponentiation scales exponents.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::CalcError;
use crate::settings::UnitVariant;
use crate::CalcResult;

use super::{Unit, UnitRegistry};

/// Integer exponents over base-dimension ids. Ordered so compatibility
/// checks and diagnostics are deterministic.
pub type DimensionMap = BTreeMap<Box<str>, i32>;

/// One term of a derived unit: a unit raised to an integer exponent.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitTerm {
    pub unit: Arc<Unit>,
    pub exponent: i32,
}

impl UnitTerm {
    #[must_use]
    pub fn new(unit: Arc<Unit>, exponent: i32) -> Self {
        Self { unit, exponent }
    }
}

/// Adds `map * exponent` into `acc`, dropping zero entries.
pub(crate) fn accumulate(acc: &mut DimensionMap, map: &DimensionMap, exponent: i32) {
    for (dim, exp) in map {
        let entry = acc.entry(dim.clone()).or_insert(0);
        *entry += exp * exponent;
        if *entry == 0 {
            acc.remove(dim);
        }
    }
}

/// Normalises a term list into base-dimension exponents.
#[must_use]
pub fn normalize(terms: &[UnitTerm]) -> DimensionMap {
    let mut map = DimensionMap::new();
    for term in terms {
        accumulate(&mut map, &term.unit.dimension.base_map, term.exponent);
    }
    map
}

/// Whether two term lists are dimensionally compatible.
#[must_use]
pub fn compatible(a: &[UnitTerm], b: &[UnitTerm]) -> bool {
    normalize(a) == normalize(b)
}

/// Multiplies two term lists: concatenation, with terms sharing a unit
/// id folded by adding exponents.
#[must_use]
pub fn combine(a: &[UnitTerm], b: &[UnitTerm]) -> Vec<UnitTerm> {
    let mut out: Vec<UnitTerm> = Vec::with_capacity(a.len() + b.len());
    for term in a.iter().chain(b) {
        match out.iter().position(|t| t.unit.id == term.unit.id) {
            Some(idx) => out[idx].exponent += term.exponent,
            None => out.push(term.clone()),
        }
    }
    out.retain(|t| t.exponent != 0);
    out
}

/// Folds terms of the same dimension into one representative term,
/// multiplying `value` by each folded contributor's linear factor ratio
/// raised to its exponent.
///
/// Affine conversions are forbidden here; variant conversions are never
/// folded (their arm is resolved only at conversion boundaries).
pub fn simplify(
    value: f64,
    terms: Vec<UnitTerm>,
    variant: UnitVariant,
) -> CalcResult<(f64, Vec<UnitTerm>)> {
    let mut value = value;
    let mut out: Vec<UnitTerm> = Vec::with_capacity(terms.len());
    for term in terms {
        if term.unit.conversion.is_affine(variant) {
            return Err(CalcError::dimension().with_message(format!(
                "{} cannot be combined multiplicatively",
                term.unit.id
            )));
        }
        let term_is_variant = matches!(term.unit.conversion, super::Conversion::Variant { .. });
        let representative = out.iter().position(|t| {
            t.unit.dimension.id == term.unit.dimension.id
                && !matches!(t.unit.conversion, super::Conversion::Variant { .. })
        });
        match representative {
            Some(idx) if !term_is_variant => {
                if out[idx].unit.id != term.unit.id {
                    let ratio = term.unit.conversion.linear_factor(variant)?
                        / out[idx].unit.conversion.linear_factor(variant)?;
                    value *= ratio.powi(term.exponent);
                }
                out[idx].exponent += term.exponent;
            }
            _ => out.push(term),
        }
    }
    out.retain(|t| t.exponent != 0);
    Ok((value, out))
}

/// Raises a term list to an integer power, expanding terms whose unit's
/// dimension is itself derived into base units first.
///
/// Returns the adjusted value alongside the new terms; `value` must
/// already be the numerically exponentiated magnitude.
pub fn pow_terms(
    registry: &UnitRegistry,
    value: f64,
    terms: &[UnitTerm],
    n: i32,
    variant: UnitVariant,
) -> CalcResult<(f64, Vec<UnitTerm>)> {
    let mut out_value = value;
    let mut out: Vec<UnitTerm> = Vec::new();
    for term in terms {
        if term.unit.dimension.is_base() {
            out = combine(&out, &[UnitTerm::new(term.unit.clone(), term.exponent * n)]);
            continue;
        }
        let factor = term.unit.conversion.linear_factor(variant)?;
        out_value *= factor.powi(term.exponent * n);
        for (dim_id, dim_exp) in &term.unit.dimension.base_map {
            let dim = registry
                .dimension(dim_id)
                .ok_or_else(|| CalcError::internal())?;
            let base = registry.base_unit_of(&dim)?;
            out = combine(
                &out,
                &[UnitTerm::new(base, dim_exp * term.exponent * n)],
            );
        }
    }
    Ok((out_value, out))
}

/// The shape a term list collapses to.
#[derive(Debug, Clone, PartialEq)]
pub enum Collapsed {
    /// Zero terms.
    Dimensionless,
    /// One term with exponent 1.
    Simple(Arc<Unit>),
    /// Everything else.
    Derived(Vec<UnitTerm>),
}

/// Collapses a term list: zero terms are dimensionless, a single
/// exponent-1 term is a simple unit, anything else stays derived.
#[must_use]
pub fn collapse(terms: Vec<UnitTerm>) -> Collapsed {
    match terms.as_slice() {
        [] => Collapsed::Dimensionless,
        [term] if term.exponent == 1 => Collapsed::Simple(term.unit.clone()),
        _ => Collapsed::Derived(terms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::UnitRegistry;

    fn registry() -> UnitRegistry {
        UnitRegistry::builtin()
    }

    fn term(registry: &UnitRegistry, id: &str, exponent: i32) -> UnitTerm {
        UnitTerm::new(registry.unit_by_id(id).unwrap(), exponent)
    }

    #[test]
    fn speed_normalizes_to_length_over_time() {
        let registry = registry();
        let terms = vec![
            term(&registry, "kilometer", 1),
            term(&registry, "hour", -1),
        ];
        let map = normalize(&terms);
        assert_eq!(map.get("length"), Some(&1));
        assert_eq!(map.get("time"), Some(&-1));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn compatibility_is_exact_map_equality() {
        let registry = registry();
        let kmh = vec![
            term(&registry, "kilometer", 1),
            term(&registry, "hour", -1),
        ];
        let mps = vec![
            term(&registry, "meter", 1),
            term(&registry, "second", -1),
        ];
        let area = vec![term(&registry, "meter", 2)];
        assert!(compatible(&kmh, &mps));
        assert!(!compatible(&kmh, &area));
    }

    #[test]
    fn combine_folds_shared_units_and_drops_zeros() {
        let registry = registry();
        let a = vec![term(&registry, "meter", 1)];
        let b = vec![term(&registry, "meter", -1), term(&registry, "second", 1)];
        let combined = combine(&a, &b);
        assert_eq!(combined, vec![term(&registry, "second", 1)]);
    }

    #[test]
    fn simplify_folds_same_dimension_terms() {
        let registry = registry();
        // 10 (m * cm) = 0.1 m^2
        let terms = vec![term(&registry, "meter", 1), term(&registry, "centimeter", 1)];
        let (value, simplified) = simplify(10.0, terms, UnitVariant::Us).unwrap();
        assert!((value - 0.1).abs() < 1e-12);
        assert_eq!(simplified, vec![term(&registry, "meter", 2)]);
    }

    #[test]
    fn simplify_cancels_to_dimensionless() {
        let registry = registry();
        // km / m = 1000
        let terms = vec![term(&registry, "kilometer", 1), term(&registry, "meter", -1)];
        let (value, simplified) = simplify(1.0, terms, UnitVariant::Us).unwrap();
        assert!((value - 1000.0).abs() < 1e-9);
        assert!(simplified.is_empty());
    }

    #[test]
    fn simplify_rejects_affine_units() {
        let registry = registry();
        let terms = vec![term(&registry, "celsius", 1), term(&registry, "meter", 1)];
        let err = simplify(1.0, terms, UnitVariant::Us).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Dimension);
    }

    #[test]
    fn pow_expands_derived_dimension_units() {
        let registry = registry();
        // (1 hectare)^2 = (10^4 m^2)^2 = 10^8 m^4
        let terms = vec![term(&registry, "hectare", 1)];
        let (value, powed) = pow_terms(&registry, 1.0, &terms, 2, UnitVariant::Us).unwrap();
        assert!((value - 1.0e8).abs() / 1.0e8 < 1e-12);
        assert_eq!(powed, vec![term(&registry, "meter", 4)]);
    }

    #[test]
    fn collapse_shapes() {
        let registry = registry();
        assert_eq!(collapse(vec![]), Collapsed::Dimensionless);
        let meter = registry.unit_by_id("meter").unwrap();
        assert_eq!(
            collapse(vec![UnitTerm::new(meter.clone(), 1)]),
            Collapsed::Simple(meter.clone())
        );
        assert!(matches!(
            collapse(vec![UnitTerm::new(meter, 2)]),
            Collapsed::Derived(_)
        ));
    }
}
