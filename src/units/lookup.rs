//! Name resolution over the registry.
//!
//! Lookup is case-sensitive first; failing that, case-insensitive with
//! a similarity tiebreaker counting positionally matching characters,
//! so `KB` prefers `kB` over `Kib`-style near-misses.

use std::sync::Arc;

use super::{Unit, UnitRegistry};

fn positional_matches(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).filter(|(x, y)| x == y).count()
}

impl UnitRegistry {
    /// All units registered under a name. More than one element only
    /// for the prime/doubleprime allowlist.
    #[must_use]
    pub fn lookup_units(&self, name: &str) -> Vec<Arc<Unit>> {
        if let Some(indices) = self.by_name.get(name) {
            return indices.iter().map(|&idx| self.units[idx].clone()).collect();
        }
        let lower = name.to_lowercase();
        let Some(indices) = self.by_name_ci.get(&lower) else {
            return Vec::new();
        };
        let mut best: Option<(usize, usize)> = None;
        for &idx in indices {
            let unit = &self.units[idx];
            let score = unit
                .names
                .iter()
                .filter(|n| n.to_lowercase() == lower)
                .map(|n| positional_matches(name, n))
                .max()
                .unwrap_or(0);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((idx, score)),
            }
        }
        best.map(|(idx, _)| vec![self.units[idx].clone()])
            .unwrap_or_default()
    }

    /// Looks a unit up by name.
    #[must_use]
    pub fn lookup_unit(&self, name: &str) -> Option<Arc<Unit>> {
        self.lookup_units(name).into_iter().next()
    }

    /// Resolves a name as a unit, falling back to currency codes,
    /// currency names, and ambiguous currency symbols.
    #[must_use]
    pub fn resolve_unit_name(&self, name: &str) -> Option<Arc<Unit>> {
        self.lookup_unit(name)
            .or_else(|| self.lookup_currency(name))
    }

    /// Whether a name denotes any unit or currency at all.
    #[must_use]
    pub fn is_unit_name(&self, name: &str) -> bool {
        self.resolve_unit_name(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_sensitive_match_wins() {
        let registry = UnitRegistry::builtin();
        // Mb is a megabit, MB a megabyte.
        assert_eq!(registry.lookup_unit("Mb").unwrap().id.as_ref(), "megabit");
        assert_eq!(registry.lookup_unit("MB").unwrap().id.as_ref(), "megabyte");
    }

    #[test]
    fn case_insensitive_fallback_uses_positional_similarity() {
        let registry = UnitRegistry::builtin();
        // "KM" matches kilometer via its "km" symbol.
        assert_eq!(
            registry.lookup_unit("KM").unwrap().id.as_ref(),
            "kilometer"
        );
        // "Kg" is not registered verbatim but kilogram's "kg" is the
        // closest name.
        assert_eq!(registry.lookup_unit("Kg").unwrap().id.as_ref(), "kilogram");
    }

    #[test]
    fn prime_glyphs_resolve_to_both_readings() {
        let registry = UnitRegistry::builtin();
        let units = registry.lookup_units("'");
        let ids: Vec<&str> = units.iter().map(|u| u.id.as_ref()).collect();
        assert!(ids.contains(&"foot"));
        assert!(ids.contains(&"arcminute"));
    }

    #[test]
    fn multi_word_names_resolve() {
        let registry = UnitRegistry::builtin();
        assert_eq!(
            registry.lookup_unit("nautical mile").unwrap().id.as_ref(),
            "nautical_mile"
        );
        assert_eq!(
            registry.lookup_unit("fl oz").unwrap().id.as_ref(),
            "fluid_ounce"
        );
    }

    #[test]
    fn unknown_names_resolve_to_nothing() {
        let registry = UnitRegistry::builtin();
        assert!(registry.lookup_unit("wombats").is_none());
    }
}
