//! Evaluator settings.
//!
//! Settings are provided by the embedding host (UI, CLI) and consumed by
//! unit resolution and the evaluator. They never change mid-document.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{CalcError, CalcResult};

/// Selects the `us` or `uk` arm of a variant unit conversion
/// (gallons, teaspoons, tons, ...).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitVariant {
    #[default]
    Us,
    Uk,
}

impl FromStr for UnitVariant {
    type Err = CalcError;

    fn from_str(s: &str) -> CalcResult<Self> {
        match s {
            "us" => Ok(Self::Us),
            "uk" => Ok(Self::Uk),
            _ => Err(CalcError::internal().with_message("not a valid unit variant")),
        }
    }
}

impl fmt::Display for UnitVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Us => f.write_str("us"),
            Self::Uk => f.write_str("uk"),
        }
    }
}

/// The unit trigonometric functions assume for plain-number arguments,
/// and the unit inverse trigonometric functions tag their results with.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Radian,
    Degree,
}

impl FromStr for AngleUnit {
    type Err = CalcError;

    fn from_str(s: &str) -> CalcResult<Self> {
        match s {
            "radian" => Ok(Self::Radian),
            "degree" => Ok(Self::Degree),
            _ => Err(CalcError::internal().with_message("not a valid angle unit")),
        }
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Radian => f.write_str("radian"),
            Self::Degree => f.write_str("degree"),
        }
    }
}

/// Host-provided evaluator settings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub variant: UnitVariant,
    pub angle_unit: AngleUnit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.variant, UnitVariant::Us);
        assert_eq!(settings.angle_unit, AngleUnit::Radian);

        let settings: Settings =
            serde_json::from_str(r#"{"variant":"uk","angleUnit":"degree"}"#).unwrap();
        assert_eq!(settings.variant, UnitVariant::Uk);
        assert_eq!(settings.angle_unit, AngleUnit::Degree);
    }

    #[test]
    fn from_str_round_trips() {
        assert_eq!("uk".parse::<UnitVariant>().unwrap(), UnitVariant::Uk);
        assert_eq!("degree".parse::<AngleUnit>().unwrap(), AngleUnit::Degree);
        assert!("metric".parse::<UnitVariant>().is_err());
    }
}
