//! The unit database and the operations defined over it.
//!
//! The registry is loaded once at startup and is immutable afterwards,
//! with one exception: the exchange-rate table may be swapped at any
//! time, and currency units re-derive their conversion factor from it
//! on the next lookup.

pub mod catalog;
pub mod convert;
pub mod currency;
pub mod database;
pub mod dimension;
mod lookup;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::error::CalcError;
use crate::settings::UnitVariant;
use crate::CalcResult;

use database::{ConversionData, CurrencyDatabase, DisplayName, RateTable, UnitDatabase};
use dimension::DimensionMap;

/// Unit names that may legitimately refer to two units; prime and
/// doubleprime glyphs mean foot/inch next to lengths and
/// arcminute/arcsecond next to a degree.
pub(crate) const COLLISION_ALLOWLIST: &[&str] = &["'", "′", "\"", "″"];

/// A dimension: an equivalence class of units.
#[derive(Debug)]
pub struct Dimension {
    pub id: Box<str>,
    pub name: Box<str>,
    /// Id of the canonical unit of this dimension.
    pub base_unit: Box<str>,
    /// Empty for base dimensions.
    pub derived_from: Vec<(Box<str>, i32)>,
    /// Exponents over base dimensions, resolved at registry build time.
    pub(crate) base_map: DimensionMap,
}

impl Dimension {
    /// Whether this is a base dimension.
    #[must_use]
    pub fn is_base(&self) -> bool {
        self.derived_from.is_empty()
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Dimension {}

/// How a unit converts to its dimension's base unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Linear { factor: f64 },
    Affine { offset: f64, factor: f64 },
    Variant { us: Box<Conversion>, uk: Box<Conversion> },
}

impl Conversion {
    /// Resolves a variant conversion to the arm selected by `variant`.
    /// Linear and affine conversions resolve to themselves.
    #[must_use]
    pub fn resolve(&self, variant: UnitVariant) -> &Self {
        match self {
            Self::Variant { us, uk } => match variant {
                UnitVariant::Us => us.resolve(variant),
                UnitVariant::Uk => uk.resolve(variant),
            },
            _ => self,
        }
    }

    /// Whether the resolved conversion carries an offset.
    #[must_use]
    pub fn is_affine(&self, variant: UnitVariant) -> bool {
        matches!(self.resolve(variant), Self::Affine { .. })
    }

    /// The linear factor of this conversion, erroring on affine units,
    /// which must not participate in multiplicative combining.
    pub fn linear_factor(&self, variant: UnitVariant) -> CalcResult<f64> {
        match self.resolve(variant) {
            Self::Linear { factor } => Ok(*factor),
            Self::Affine { .. } => Err(CalcError::dimension()
                .with_message("an offset-scale unit cannot be multiplied or divided")),
            Self::Variant { .. } => Err(CalcError::internal()),
        }
    }

    /// Converts a magnitude in this unit to the dimension's base unit.
    #[must_use]
    pub fn to_base(&self, value: f64, variant: UnitVariant) -> f64 {
        match self.resolve(variant) {
            Self::Linear { factor } => value * factor,
            Self::Affine { offset, factor } => (value + offset) * factor,
            Self::Variant { .. } => value,
        }
    }

    /// Converts a magnitude in the dimension's base unit to this unit.
    #[must_use]
    pub fn from_base(&self, value: f64, variant: UnitVariant) -> f64 {
        match self.resolve(variant) {
            Self::Linear { factor } => value / factor,
            Self::Affine { offset, factor } => value / factor - offset,
            Self::Variant { .. } => value,
        }
    }

    fn from_data(data: &ConversionData) -> Self {
        match data {
            ConversionData::Linear { factor } => Self::Linear { factor: *factor },
            ConversionData::Affine { offset, factor } => Self::Affine {
                offset: *offset,
                factor: *factor,
            },
            ConversionData::Variant { variants } => Self::Variant {
                us: Box::new(Self::from_data(&variants.us)),
                uk: Box::new(Self::from_data(&variants.uk)),
            },
        }
    }
}

/// A unit of measurement.
#[derive(Debug)]
pub struct Unit {
    pub id: Box<str>,
    pub dimension: Arc<Dimension>,
    pub display: DisplayName,
    pub names: Vec<Box<str>>,
    pub conversion: Conversion,
    pub is_base: bool,
    /// Visual term count (kWh counts as 2).
    pub count_as_terms: u8,
}

impl Unit {
    /// Whether this unit's dimension is the dimensionless dimension.
    #[must_use]
    pub fn is_dimensionless(&self) -> bool {
        self.dimension.base_map.is_empty()
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Unit {}

/// The startup-loaded unit database with its lookup indices.
#[derive(Debug)]
pub struct UnitRegistry {
    dimensions: FxHashMap<Box<str>, Arc<Dimension>>,
    units: Vec<Arc<Unit>>,
    by_id: FxHashMap<Box<str>, usize>,
    by_name: FxHashMap<Box<str>, Vec<usize>>,
    by_name_ci: FxHashMap<String, Vec<usize>>,
    currencies: currency::CurrencyTable,
    rates: RateTable,
}

impl UnitRegistry {
    /// Builds a registry from database documents, validating every
    /// invariant the runtime relies on.
    pub fn from_databases(
        units: &UnitDatabase,
        currencies: &CurrencyDatabase,
    ) -> CalcResult<Self> {
        let dimensions = Self::resolve_dimensions(units)?;

        let mut registry = Self {
            dimensions,
            units: Vec::with_capacity(units.units.len()),
            by_id: FxHashMap::default(),
            by_name: FxHashMap::default(),
            by_name_ci: FxHashMap::default(),
            currencies: currency::CurrencyTable::from_database(currencies)?,
            rates: RateTable::default(),
        };

        for data in &units.units {
            let dimension = registry
                .dimensions
                .get(data.dimension.as_str())
                .cloned()
                .ok_or_else(|| {
                    CalcError::internal()
                        .with_message(format!("unit {} references unknown dimension", data.id))
                })?;
            let unit = Arc::new(Unit {
                id: data.id.clone().into_boxed_str(),
                dimension,
                display: data.display_name.clone(),
                names: data.names.iter().map(|n| n.clone().into_boxed_str()).collect(),
                conversion: Conversion::from_data(&data.conversion),
                is_base: data.is_base_unit,
                count_as_terms: data.count_as_terms.unwrap_or(1),
            });
            registry.insert_unit(unit)?;
        }

        registry.install_ambiguous_currencies()?;
        registry.validate_base_units()?;
        Ok(registry)
    }

    /// The built-in registry generated from the compact catalogue.
    #[must_use]
    pub fn builtin() -> Self {
        Self::from_databases(&catalog::unit_database(), &catalog::currency_database())
            .expect("the generated catalogue upholds the database invariants")
    }

    /// Swaps the exchange-rate table. Currency units derive their factor
    /// from the new table on next lookup.
    pub fn set_rate_table(&mut self, rates: RateTable) {
        log::debug!(
            "exchange rates updated: {} currencies as of {}",
            rates.usd.len(),
            rates.date
        );
        self.rates = rates;
    }

    /// The currently loaded rate table.
    #[must_use]
    pub fn rate_table(&self) -> &RateTable {
        &self.rates
    }

    /// Looks a dimension up by id.
    #[must_use]
    pub fn dimension(&self, id: &str) -> Option<Arc<Dimension>> {
        self.dimensions.get(id).cloned()
    }

    /// Looks a unit up by id.
    #[must_use]
    pub fn unit_by_id(&self, id: &str) -> Option<Arc<Unit>> {
        self.by_id.get(id).map(|&idx| self.units[idx].clone())
    }

    /// The base unit of a dimension.
    pub(crate) fn base_unit_of(&self, dimension: &Dimension) -> CalcResult<Arc<Unit>> {
        self.unit_by_id(&dimension.base_unit)
            .ok_or_else(|| CalcError::internal().with_message("dimension lost its base unit"))
    }

    fn insert_unit(&mut self, unit: Arc<Unit>) -> CalcResult<()> {
        let idx = self.units.len();
        if self.by_id.insert(unit.id.clone(), idx).is_some() {
            return Err(CalcError::internal()
                .with_message(format!("duplicate unit id {}", unit.id)));
        }
        for name in &unit.names {
            let slot = self.by_name.entry(name.clone()).or_default();
            if !slot.is_empty() && !COLLISION_ALLOWLIST.contains(&name.as_ref()) {
                return Err(CalcError::internal()
                    .with_message(format!("unit name collision on {name}")));
            }
            slot.push(idx);
            self.by_name_ci
                .entry(name.to_lowercase())
                .or_default()
                .push(idx);
        }
        self.units.push(unit);
        Ok(())
    }

    fn resolve_dimensions(db: &UnitDatabase) -> CalcResult<FxHashMap<Box<str>, Arc<Dimension>>> {
        let declared: FxHashMap<&str, &database::DimensionData> = db
            .dimensions
            .iter()
            .map(|d| (d.id.as_str(), d))
            .collect();

        let mut resolved: FxHashMap<Box<str>, Arc<Dimension>> = FxHashMap::default();
        for data in &db.dimensions {
            let mut in_progress = Vec::new();
            Self::resolve_dimension(data.id.as_str(), &declared, &mut resolved, &mut in_progress)?;
        }
        Ok(resolved)
    }

    fn resolve_dimension(
        id: &str,
        declared: &FxHashMap<&str, &database::DimensionData>,
        resolved: &mut FxHashMap<Box<str>, Arc<Dimension>>,
        in_progress: &mut Vec<Box<str>>,
    ) -> CalcResult<DimensionMap> {
        if let Some(dim) = resolved.get(id) {
            return Ok(dim.base_map.clone());
        }
        if in_progress.iter().any(|d| d.as_ref() == id) {
            return Err(CalcError::internal()
                .with_message(format!("dimension cycle through {id}")));
        }
        let data = declared.get(id).ok_or_else(|| {
            CalcError::internal().with_message(format!("unknown dimension {id}"))
        })?;

        in_progress.push(id.into());
        let mut base_map = DimensionMap::new();
        if data.derived_from.is_empty() {
            // The dimensionless dimension normalises to the empty map so
            // dimensionless units collapse to plain numbers.
            if id != "dimensionless" {
                base_map.insert(id.into(), 1);
            }
        } else {
            for factor in &data.derived_from {
                let inner =
                    Self::resolve_dimension(&factor.dimension, declared, resolved, in_progress)?;
                dimension::accumulate(&mut base_map, &inner, factor.exponent);
            }
        }
        in_progress.pop();

        let dim = Arc::new(Dimension {
            id: data.id.clone().into_boxed_str(),
            name: data.name.clone().into_boxed_str(),
            base_unit: data.base_unit.clone().into_boxed_str(),
            derived_from: data
                .derived_from
                .iter()
                .map(|f| (f.dimension.clone().into_boxed_str(), f.exponent))
                .collect(),
            base_map: base_map.clone(),
        });
        resolved.insert(dim.id.clone(), dim);
        Ok(base_map)
    }

    fn validate_base_units(&self) -> CalcResult<()> {
        for dimension in self.dimensions.values() {
            let base = self.unit_by_id(&dimension.base_unit).ok_or_else(|| {
                CalcError::internal().with_message(format!(
                    "dimension {} has no base unit {}",
                    dimension.id, dimension.base_unit
                ))
            })?;
            if base.dimension.id != dimension.id {
                return Err(CalcError::internal().with_message(format!(
                    "base unit {} belongs to a different dimension",
                    base.id
                )));
            }
        }
        // Exactly one base unit per dimension.
        let mut seen: FxHashMap<&str, &str> = FxHashMap::default();
        for unit in &self.units {
            if unit.is_base {
                if let Some(other) = seen.insert(&unit.dimension.id, &unit.id) {
                    return Err(CalcError::internal().with_message(format!(
                        "dimension {} has two base units: {} and {}",
                        unit.dimension.id, other, unit.id
                    )));
                }
            }
        }
        Ok(())
    }
}
