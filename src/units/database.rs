//! Serde schemas for the data the core consumes.
//!
//! The unit database is produced by a build step (see `tools/unitgen`)
//! and injected as immutable data; the currency and timezone databases
//! are static; the rate table is hot-swappable.

use serde::{Deserialize, Serialize};

/// Top-level unit database document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitDatabase {
    pub dimensions: Vec<DimensionData>,
    pub units: Vec<UnitData>,
}

/// A dimension declaration.
///
/// A dimension without `derived_from` entries is a base dimension;
/// otherwise it is an integer-exponent product over other dimensions
/// that must resolve, acyclically, to base dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DimensionData {
    pub id: String,
    pub name: String,
    /// Id of this dimension's canonical unit (linear factor 1).
    pub base_unit: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived_from: Vec<DimensionFactor>,
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub has_named_units: bool,
}

/// One factor of a derived dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionFactor {
    pub dimension: String,
    pub exponent: i32,
}

/// A unit declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitData {
    pub id: String,
    pub dimension: String,
    pub display_name: DisplayName,
    /// Every name and alias this unit is recognised under.
    pub names: Vec<String>,
    pub conversion: ConversionData,
    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub is_base_unit: bool,
    /// Visual term count hint (kWh counts as 2).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_as_terms: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName {
    pub symbol: String,
    pub singular: String,
    pub plural: String,
}

/// How a unit converts to its dimension's base unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ConversionData {
    /// `base = input * factor`
    Linear { factor: f64 },
    /// `base = (input + offset) * factor`
    Affine { offset: f64, factor: f64 },
    /// Branch on the `us`/`uk` setting.
    Variant { variants: VariantArms },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantArms {
    pub us: Box<ConversionData>,
    pub uk: Box<ConversionData>,
}

/// Top-level currency database document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyDatabase {
    pub unambiguous: Vec<CurrencyData>,
    pub ambiguous: Vec<AmbiguousSymbolData>,
}

/// An ISO 4217 currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyData {
    pub code: String,
    pub minor_units: u8,
    pub display_name: CurrencyDisplayName,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyDisplayName {
    pub singular: String,
    pub plural: String,
}

/// A currency symbol that must not silently convert ($ is not one
/// currency); each gets its own synthetic dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmbiguousSymbolData {
    pub symbol: String,
    pub dimension: String,
}

/// Timezone database: IANA zones and the aliases they resolve from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneData {
    pub iana: String,
    pub names: Vec<TimezoneAlias>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneAlias {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub territory: Option<String>,
}

/// The exchange-rate table. `usd` maps a lowercase ISO code to the
/// value of 1 USD expressed in that currency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub date: String,
    pub usd: std::collections::BTreeMap<String, f64>,
}

impl RateTable {
    /// Rate for an ISO code, matched case-insensitively.
    #[must_use]
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.usd.get(&code.to_ascii_lowercase()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_serde_shape() {
        let linear: ConversionData = serde_json::from_str(r#"{"type":"linear","factor":0.3048}"#)
            .unwrap();
        assert_eq!(linear, ConversionData::Linear { factor: 0.3048 });

        let affine: ConversionData =
            serde_json::from_str(r#"{"type":"affine","offset":273.15,"factor":1.0}"#).unwrap();
        assert_eq!(
            affine,
            ConversionData::Affine {
                offset: 273.15,
                factor: 1.0
            }
        );

        let variant: ConversionData = serde_json::from_str(
            r#"{"type":"variant","variants":{
                "us":{"type":"linear","factor":0.003785411784},
                "uk":{"type":"linear","factor":0.00454609}}}"#,
        )
        .unwrap();
        let ConversionData::Variant { variants } = variant else {
            panic!("expected variant conversion");
        };
        assert_eq!(
            *variants.us,
            ConversionData::Linear {
                factor: 0.003785411784
            }
        );
    }

    #[test]
    fn rate_table_lookup_is_case_insensitive() {
        let table: RateTable =
            serde_json::from_str(r#"{"date":"2026-08-01","usd":{"eur":0.92,"jpy":155.2}}"#)
                .unwrap();
        assert_eq!(table.rate("EUR"), Some(0.92));
        assert_eq!(table.rate("jpy"), Some(155.2));
        assert_eq!(table.rate("CHF"), None);
    }
}
