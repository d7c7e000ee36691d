//! The unit conversion engine.
//!
//! All conversions go through the dimension's base unit: linear units
//! scale, affine units offset-and-scale, variant units first resolve
//! their `us`/`uk` arm. Composite targets distribute a magnitude
//! largest-to-smallest with the final component carrying the residue.

use std::sync::Arc;

use crate::error::CalcError;
use crate::settings::UnitVariant;
use crate::CalcResult;

use super::dimension::{self, UnitTerm};
use super::Unit;

/// Converts a magnitude between two units of the same dimension.
pub fn convert_simple(
    value: f64,
    from: &Unit,
    to: &Unit,
    variant: UnitVariant,
) -> CalcResult<f64> {
    if from.dimension.base_map != to.dimension.base_map {
        return Err(CalcError::conversion().with_message(format!(
            "cannot convert {} to {}",
            from.id, to.id
        )));
    }
    let base = from.conversion.to_base(value, variant);
    Ok(to.conversion.from_base(base, variant))
}

/// Distributes a magnitude over a list of same-dimension units
/// (`171 cm to ft in`): targets are ordered by base factor descending,
/// every target but the smallest takes its integer part, and the
/// smallest carries the full fractional residue.
pub fn distribute_composite(
    value: f64,
    from: &Unit,
    targets: &[Arc<Unit>],
    variant: UnitVariant,
) -> CalcResult<Vec<(f64, Arc<Unit>)>> {
    if targets.is_empty() {
        return Err(CalcError::conversion().with_message("no composite target units"));
    }
    for target in targets {
        if target.dimension.base_map != from.dimension.base_map {
            return Err(CalcError::conversion().with_message(format!(
                "composite target {} does not match the source dimension",
                target.id
            )));
        }
        if target.conversion.is_affine(variant) {
            return Err(CalcError::conversion()
                .with_message("offset-scale units cannot form a composite"));
        }
    }

    // Order target units by base factor descending, regardless of how
    // the request spelled them.
    let mut ordered: Vec<(f64, Arc<Unit>)> = targets
        .iter()
        .map(|target| {
            Ok((
                target.conversion.linear_factor(variant)?,
                target.clone(),
            ))
        })
        .collect::<CalcResult<_>>()?;
    ordered.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(core::cmp::Ordering::Equal));

    let mut remaining = from.conversion.to_base(value, variant).abs();
    let sign = if value < 0.0 { -1.0 } else { 1.0 };
    let mut parts = Vec::with_capacity(ordered.len());
    for (idx, (factor, target)) in ordered.iter().enumerate() {
        if idx + 1 == ordered.len() {
            parts.push((sign * remaining / factor, target.clone()));
        } else {
            let amount = (remaining / factor).floor();
            remaining -= amount * factor;
            parts.push((sign * amount, target.clone()));
        }
    }
    Ok(parts)
}

/// Converts a term-list magnitude into target terms (`100 km/h` to
/// `m/s`). The normalised dimension maps must be equal; each side
/// passes through base units term-by-term, factors raised to their
/// exponents.
pub fn convert_derived(
    value: f64,
    from: &[UnitTerm],
    to: &[UnitTerm],
    variant: UnitVariant,
) -> CalcResult<f64> {
    if dimension::normalize(from) != dimension::normalize(to) {
        return Err(CalcError::conversion()
            .with_message("source and target dimensions do not match"));
    }
    let mut base = value;
    for term in from {
        base *= term.unit.conversion.linear_factor(variant)?.powi(term.exponent);
    }
    for term in to {
        base /= term.unit.conversion.linear_factor(variant)?.powi(term.exponent);
    }
    Ok(base)
}
