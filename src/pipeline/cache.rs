//! The per-parser parse cache.
//!
//! Keyed by raw expression text. At document end, entries the current
//! document did not touch are evicted, keeping the cache at the
//! working set.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::syntax::{ParseOutcome, Parser};

#[derive(Default)]
pub struct ParseCache {
    entries: FxHashMap<Box<str>, Arc<ParseOutcome>>,
    used: FxHashSet<Box<str>>,
}

impl ParseCache {
    /// Returns the cached parse for a line, parsing on miss.
    pub fn get_or_parse(&mut self, src: &str, parser: &Parser<'_>) -> Arc<ParseOutcome> {
        self.used.insert(src.into());
        if let Some(cached) = self.entries.get(src) {
            return cached.clone();
        }
        let outcome = Arc::new(parser.parse_line(src));
        self.entries.insert(src.into(), outcome.clone());
        outcome
    }

    /// Evicts entries the current document did not reference.
    pub fn end_document(&mut self) {
        let before = self.entries.len();
        self.entries.retain(|key, _| self.used.contains(key));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            log::trace!("parse cache evicted {evicted} stale lines");
        }
        self.used.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tz::TimezoneTable;
    use crate::units::UnitRegistry;

    #[test]
    fn eviction_keeps_the_working_set() {
        let registry = UnitRegistry::builtin();
        let timezones = TimezoneTable::builtin();
        let parser = Parser::new(&registry, &timezones);
        let mut cache = ParseCache::default();

        cache.get_or_parse("1 + 1", &parser);
        cache.get_or_parse("2 + 2", &parser);
        cache.end_document();
        assert_eq!(cache.len(), 2);

        cache.get_or_parse("1 + 1", &parser);
        cache.end_document();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn cached_parses_are_reused() {
        let registry = UnitRegistry::builtin();
        let timezones = TimezoneTable::builtin();
        let parser = Parser::new(&registry, &timezones);
        let mut cache = ParseCache::default();

        let first = cache.get_or_parse("5 km", &parser);
        let second = cache.get_or_parse("5 km", &parser);
        assert!(Arc::ptr_eq(&first, &second));
    }
}
