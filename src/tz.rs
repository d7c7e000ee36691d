//! Timezone identification and the offset-provider seam.
//!
//! The core only knows timezone *names*: a static alias table maps
//! codes and major cities to canonical IANA identifiers. Actual offset
//! computation is delegated to a [`TimeZoneProvider`] injected by the
//! host, so real tzdata never enters the hot path. A fixed-offset table
//! provider is included for hosts and tests that do not carry tzdata.

use rustc_hash::FxHashMap;

use crate::error::CalcError;
use crate::units::database::{TimezoneAlias, TimezoneData};
use crate::CalcResult;

/// A resolved timezone, identified by its IANA name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeZone {
    iana: Box<str>,
}

impl TimeZone {
    #[must_use]
    pub fn new(iana: impl Into<Box<str>>) -> Self {
        Self { iana: iana.into() }
    }

    #[must_use]
    pub fn utc() -> Self {
        Self::new("UTC")
    }

    #[must_use]
    pub fn iana(&self) -> &str {
        &self.iana
    }
}

/// The alias table resolving codes and city names to IANA identifiers.
#[derive(Debug, Default)]
pub struct TimezoneTable {
    aliases: FxHashMap<String, Box<str>>,
}

impl TimezoneTable {
    /// Builds the table from database documents.
    #[must_use]
    pub fn from_database(zones: &[TimezoneData]) -> Self {
        let mut aliases = FxHashMap::default();
        for zone in zones {
            let iana: Box<str> = zone.iana.clone().into_boxed_str();
            aliases.insert(zone.iana.to_lowercase(), iana.clone());
            // "America/New_York" is also reachable as "New York".
            if let Some(city) = zone.iana.rsplit('/').next() {
                aliases.insert(city.replace('_', " ").to_lowercase(), iana.clone());
            }
            for alias in &zone.names {
                aliases.insert(alias.name.to_lowercase(), iana.clone());
            }
        }
        Self { aliases }
    }

    /// The built-in table covering major zones, their codes and cities.
    #[must_use]
    pub fn builtin() -> Self {
        fn zone(iana: &str, names: &[&str]) -> TimezoneData {
            TimezoneData {
                iana: iana.to_string(),
                names: names
                    .iter()
                    .map(|n| TimezoneAlias {
                        name: (*n).to_string(),
                        territory: None,
                    })
                    .collect(),
            }
        }
        Self::from_database(&[
            zone("UTC", &["GMT", "Z"]),
            zone("Europe/London", &["BST", "London"]),
            zone("Europe/Paris", &["CET", "CEST", "Paris"]),
            zone("Europe/Berlin", &["Berlin", "Munich"]),
            zone("Europe/Madrid", &["Madrid"]),
            zone("Europe/Rome", &["Rome"]),
            zone("Europe/Amsterdam", &["Amsterdam"]),
            zone("Europe/Stockholm", &["Stockholm"]),
            zone("Europe/Helsinki", &["EET", "Helsinki"]),
            zone("Europe/Moscow", &["MSK", "Moscow"]),
            zone("America/New_York", &["EST", "EDT", "NYC", "Eastern"]),
            zone("America/Chicago", &["CDT", "Chicago", "Central"]),
            zone("America/Denver", &["MST", "MDT", "Denver", "Mountain"]),
            zone("America/Los_Angeles", &["PST", "PDT", "Pacific"]),
            zone("America/Anchorage", &["AKST", "Anchorage"]),
            zone("America/Toronto", &["Toronto"]),
            zone("America/Vancouver", &["Vancouver"]),
            zone("America/Mexico_City", &["Mexico City"]),
            zone("America/Sao_Paulo", &["BRT", "Sao Paulo"]),
            zone("America/Buenos_Aires", &["Buenos Aires"]),
            zone("Asia/Tokyo", &["JST", "Tokyo", "Osaka"]),
            zone("Asia/Seoul", &["KST", "Seoul"]),
            zone("Asia/Shanghai", &["Beijing", "Shanghai"]),
            zone("Asia/Hong_Kong", &["HKT"]),
            zone("Asia/Taipei", &["Taipei"]),
            zone("Asia/Singapore", &["SGT"]),
            zone("Asia/Bangkok", &["ICT", "Bangkok"]),
            zone("Asia/Kolkata", &["IST", "Mumbai", "Delhi", "Kolkata"]),
            zone("Asia/Dubai", &["GST", "Dubai"]),
            zone("Asia/Jerusalem", &["Jerusalem", "Tel Aviv"]),
            zone("Africa/Cairo", &["Cairo"]),
            zone("Africa/Johannesburg", &["SAST", "Johannesburg"]),
            zone("Africa/Lagos", &["WAT", "Lagos"]),
            zone("Australia/Sydney", &["AEST", "AEDT", "Sydney", "Melbourne"]),
            zone("Australia/Perth", &["AWST", "Perth"]),
            zone("Pacific/Auckland", &["NZST", "NZDT", "Auckland", "Wellington"]),
            zone("Pacific/Honolulu", &["HST", "Honolulu", "Hawaii"]),
        ])
    }

    /// Resolves any recognised alias to a timezone.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<TimeZone> {
        self.aliases
            .get(&name.to_lowercase())
            .map(|iana| TimeZone::new(iana.clone()))
    }

    /// Whether a name is a recognised timezone alias.
    #[must_use]
    pub fn is_timezone(&self, name: &str) -> bool {
        self.aliases.contains_key(&name.to_lowercase())
    }
}

/// Host-injected offset computation.
pub trait TimeZoneProvider {
    /// UTC offset of `iana` at the given instant, in seconds.
    fn offset_seconds_at(&self, iana: &str, epoch_ms: i64) -> CalcResult<i64>;

    /// UTC offset to assume when interpreting a *local* wall-clock
    /// time in `iana`. The default asks [`Self::offset_seconds_at`]
    /// with the local milliseconds read as UTC, which is exact for
    /// fixed-offset zones and off by at most one transition otherwise.
    fn offset_seconds_for_local(&self, iana: &str, local_epoch_ms: i64) -> CalcResult<i64> {
        self.offset_seconds_at(iana, local_epoch_ms)
    }
}

/// Treats every zone as UTC. The fallback when the host injects no
/// real provider; alias resolution still works, offsets are zero.
#[derive(Debug, Default, Clone, Copy)]
pub struct UtcProvider;

impl TimeZoneProvider for UtcProvider {
    fn offset_seconds_at(&self, _iana: &str, _epoch_ms: i64) -> CalcResult<i64> {
        Ok(0)
    }
}

/// A table of fixed offsets per IANA name.
#[derive(Debug, Default)]
pub struct FixedOffsetProvider {
    offsets: FxHashMap<Box<str>, i64>,
}

impl FixedOffsetProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a zone at a fixed offset in seconds east of UTC.
    pub fn with_zone(mut self, iana: &str, offset_seconds: i64) -> Self {
        self.offsets.insert(iana.into(), offset_seconds);
        self
    }
}

impl TimeZoneProvider for FixedOffsetProvider {
    fn offset_seconds_at(&self, iana: &str, _epoch_ms: i64) -> CalcResult<i64> {
        if iana == "UTC" {
            return Ok(0);
        }
        self.offsets.get(iana).copied().ok_or_else(|| {
            CalcError::calendar().with_message(format!("no offset data for timezone {iana}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_case_insensitively() {
        let table = TimezoneTable::builtin();
        assert_eq!(table.resolve("jst").unwrap().iana(), "Asia/Tokyo");
        assert_eq!(table.resolve("Tokyo").unwrap().iana(), "Asia/Tokyo");
        assert_eq!(
            table.resolve("new york").unwrap().iana(),
            "America/New_York"
        );
        assert_eq!(
            table.resolve("America/New_York").unwrap().iana(),
            "America/New_York"
        );
        assert!(table.resolve("Narnia").is_none());
    }

    #[test]
    fn fixed_offset_provider_reports_registered_zones() {
        let provider = FixedOffsetProvider::new().with_zone("Asia/Tokyo", 9 * 3600);
        assert_eq!(provider.offset_seconds_at("Asia/Tokyo", 0).unwrap(), 32400);
        assert_eq!(provider.offset_seconds_at("UTC", 0).unwrap(), 0);
        assert!(provider.offset_seconds_at("Europe/Paris", 0).is_err());
    }
}
