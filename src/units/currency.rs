//! Currency support.
//!
//! Unambiguous currencies share the single `currency` dimension; their
//! linear factor is derived from the rate table at lookup time, so a
//! rate swap is visible on the very next resolution. Ambiguous symbols
//! (`$`, `¥`, `kr`) live in their own single-member dimensions and can
//! never silently inter-convert.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use tinystr::TinyAsciiStr;

use crate::error::CalcError;
use crate::CalcResult;

use super::database::{CurrencyDatabase, CurrencyDisplayName, DisplayName};
use super::{Conversion, Dimension, Unit, UnitRegistry};

/// An ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Currency {
    pub code: TinyAsciiStr<3>,
    pub minor_units: u8,
    pub display: CurrencyDisplayName,
    pub names: Vec<Box<str>>,
}

/// The loaded currency catalogue with its lookup indices.
#[derive(Debug, Default)]
pub struct CurrencyTable {
    list: Vec<Currency>,
    by_code: FxHashMap<TinyAsciiStr<3>, usize>,
    by_name: FxHashMap<String, usize>,
    ambiguous: Vec<(Box<str>, Box<str>)>,
}

impl CurrencyTable {
    pub(super) fn from_database(db: &CurrencyDatabase) -> CalcResult<Self> {
        let mut table = Self::default();
        for data in &db.unambiguous {
            let code: TinyAsciiStr<3> = data.code.parse().map_err(|_| {
                CalcError::internal()
                    .with_message(format!("currency code {} is not ISO 4217", data.code))
            })?;
            let code = code.to_ascii_uppercase();
            let idx = table.list.len();
            if table.by_code.insert(code, idx).is_some() {
                return Err(CalcError::internal()
                    .with_message(format!("duplicate currency code {code}")));
            }
            for name in &data.names {
                table.by_name.insert(name.to_lowercase(), idx);
            }
            table.list.push(Currency {
                code,
                minor_units: data.minor_units,
                display: data.display_name.clone(),
                names: data.names.iter().map(|n| n.clone().into_boxed_str()).collect(),
            });
        }
        for symbol in &db.ambiguous {
            table.ambiguous.push((
                symbol.symbol.clone().into_boxed_str(),
                symbol.dimension.clone().into_boxed_str(),
            ));
        }
        Ok(table)
    }

    fn by_code(&self, query: &str) -> Option<&Currency> {
        let code: TinyAsciiStr<3> = query.parse().ok()?;
        self.by_code
            .get(&code.to_ascii_uppercase())
            .map(|&idx| &self.list[idx])
    }

    fn by_name(&self, query: &str) -> Option<&Currency> {
        self.by_name
            .get(&query.to_lowercase())
            .map(|&idx| &self.list[idx])
    }

    pub(super) fn ambiguous(&self) -> &[(Box<str>, Box<str>)] {
        &self.ambiguous
    }
}

impl UnitRegistry {
    /// Looks a currency up by ISO code.
    #[must_use]
    pub fn currency_by_code(&self, code: &str) -> Option<&Currency> {
        self.currencies.by_code(code)
    }

    /// Looks a currency up by display name ("euros", "yen", ...).
    #[must_use]
    pub fn currency_by_name(&self, name: &str) -> Option<&Currency> {
        self.currencies.by_name(name)
    }

    /// Resolves a currency code or name into a unit of the `currency`
    /// dimension, deriving its factor from the current rate table.
    ///
    /// Returns `None` when the name is no currency, or when no rate is
    /// loaded for it (an absent rate makes the name an unknown unit).
    #[must_use]
    pub fn lookup_currency(&self, query: &str) -> Option<Arc<Unit>> {
        let currency = self
            .currencies
            .by_code(query)
            .or_else(|| self.currencies.by_name(query))?;
        self.synthesize_currency_unit(currency)
    }

    fn synthesize_currency_unit(&self, currency: &Currency) -> Option<Arc<Unit>> {
        // The table is USD-based: rate is the value of 1 USD in this
        // currency, so 1 unit of it is worth 1/rate USD.
        let rate = if currency.code.as_str() == "USD" {
            1.0
        } else {
            let rate = self.rates.rate(currency.code.as_str())?;
            if rate <= 0.0 || !rate.is_finite() {
                return None;
            }
            rate
        };
        let dimension = self.dimension("currency")?;
        Some(Arc::new(Unit {
            id: currency.code.to_ascii_lowercase().as_str().into(),
            dimension,
            display: DisplayName {
                symbol: currency.code.as_str().to_string(),
                singular: currency.display.singular.clone(),
                plural: currency.display.plural.clone(),
            },
            names: vec![currency.code.as_str().into()],
            conversion: Conversion::Linear { factor: 1.0 / rate },
            is_base: currency.code.as_str() == "USD",
            count_as_terms: 1,
        }))
    }

    /// Installs the synthetic per-symbol dimensions and units for
    /// ambiguous currency symbols. Called once at registry build.
    pub(super) fn install_ambiguous_currencies(&mut self) -> CalcResult<()> {
        let ambiguous: Vec<(Box<str>, Box<str>)> = self.currencies.ambiguous().to_vec();
        for (symbol, dimension_id) in ambiguous {
            let unit_id: Box<str> = format!("currency_symbol_{symbol}").into_boxed_str();
            let mut base_map = super::dimension::DimensionMap::new();
            base_map.insert(dimension_id.clone(), 1);
            let dimension = Arc::new(Dimension {
                id: dimension_id.clone(),
                name: format!("Currency ({symbol})").into_boxed_str(),
                base_unit: unit_id.clone(),
                derived_from: Vec::new(),
                base_map,
            });
            self.dimensions.insert(dimension_id, dimension.clone());
            self.insert_unit(Arc::new(Unit {
                id: unit_id,
                dimension,
                display: DisplayName {
                    symbol: symbol.to_string(),
                    singular: symbol.to_string(),
                    plural: symbol.to_string(),
                },
                names: vec![symbol],
                conversion: Conversion::Linear { factor: 1.0 },
                is_base: true,
                count_as_terms: 1,
            }))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::units::database::RateTable;
    use crate::units::UnitRegistry;

    fn rates() -> RateTable {
        serde_json::from_str(r#"{"date":"2026-08-01","usd":{"eur":0.92,"jpy":155.0}}"#).unwrap()
    }

    #[test]
    fn currency_units_derive_factor_from_rates() {
        let mut registry = UnitRegistry::builtin();
        registry.set_rate_table(rates());
        let eur = registry.lookup_currency("EUR").unwrap();
        let factor = eur.conversion.linear_factor(Default::default()).unwrap();
        assert!((factor - 1.0 / 0.92).abs() < 1e-12);
        assert_eq!(eur.dimension.id.as_ref(), "currency");
    }

    #[test]
    fn currency_resolves_by_name() {
        let mut registry = UnitRegistry::builtin();
        registry.set_rate_table(rates());
        let yen = registry.lookup_currency("yen").unwrap();
        assert_eq!(yen.display.symbol, "JPY");
    }

    #[test]
    fn absent_rate_means_unknown_unit() {
        let mut registry = UnitRegistry::builtin();
        registry.set_rate_table(rates());
        assert!(registry.lookup_currency("CHF").is_none());
        // USD needs no rate.
        assert!(registry.lookup_currency("USD").is_some());
    }

    #[test]
    fn rate_swap_is_visible_on_next_lookup() {
        let mut registry = UnitRegistry::builtin();
        registry.set_rate_table(rates());
        let before = registry.lookup_currency("EUR").unwrap();
        let table: RateTable =
            serde_json::from_str(r#"{"date":"2026-08-02","usd":{"eur":0.5}}"#).unwrap();
        registry.set_rate_table(table);
        let after = registry.lookup_currency("EUR").unwrap();
        let f_before = before.conversion.linear_factor(Default::default()).unwrap();
        let f_after = after.conversion.linear_factor(Default::default()).unwrap();
        assert!((f_before - 1.0 / 0.92).abs() < 1e-12);
        assert!((f_after - 2.0).abs() < 1e-12);
    }

    #[test]
    fn ambiguous_symbols_have_their_own_dimension() {
        let registry = UnitRegistry::builtin();
        let dollar = registry.lookup_unit("$").unwrap();
        let yen_sign = registry.lookup_unit("¥").unwrap();
        assert_eq!(dollar.dimension.id.as_ref(), "currency_dollar_sign");
        assert_eq!(yen_sign.dimension.id.as_ref(), "currency_yen_sign");
        assert_ne!(dollar.dimension.id, yen_sign.dimension.id);
    }
}
