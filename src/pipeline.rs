//! The per-document pipeline.
//!
//! For every expression line: parse (cached) → prune against the
//! variables defined so far → trial-evaluate every surviving candidate
//! → select from the candidates that evaluated cleanly → commit the
//! winner's assignment. Errors never abort the document.

pub mod cache;
pub mod prune;
pub mod select;

use crate::datetime::now::{Clock, SystemClock};
use crate::error::{CalcError, ErrorKind};
use crate::eval::{EvaluationContext, Evaluator, Value};
use crate::settings::Settings;
use crate::syntax::preprocess::{preprocess, LineKind};
use crate::syntax::Parser;
use crate::tz::{TimeZoneProvider, TimezoneTable, UtcProvider};
use crate::units::database::RateTable;
use crate::units::UnitRegistry;

use cache::ParseCache;

/// An error attributed to a document line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineError {
    /// 1-based line number.
    pub line: usize,
    pub kind: ErrorKind,
    pub message: String,
}

impl LineError {
    fn new(line: usize, error: &CalcError) -> Self {
        Self {
            line,
            kind: error.kind(),
            message: error.message().to_string(),
        }
    }
}

/// The ordered result of evaluating one document.
#[derive(Debug, Clone, Default)]
pub struct DocumentResult {
    /// One entry per input line; `None` for empty, heading and
    /// plain-text lines.
    pub lines: Vec<Option<Value>>,
    pub errors: Vec<LineError>,
}

/// A long-lived evaluation session: the immutable databases, the
/// host-injected services, and the parse cache.
pub struct Session {
    registry: UnitRegistry,
    timezones: TimezoneTable,
    settings: Settings,
    clock: Box<dyn Clock>,
    tz_provider: Box<dyn TimeZoneProvider>,
    cache: ParseCache,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A session over the built-in databases, the system clock, and
    /// UTC-only timezone offsets.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: UnitRegistry::builtin(),
            timezones: TimezoneTable::builtin(),
            settings: Settings::default(),
            clock: Box::new(SystemClock),
            tz_provider: Box::new(UtcProvider),
            cache: ParseCache::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_tz_provider(mut self, provider: impl TimeZoneProvider + 'static) -> Self {
        self.tz_provider = Box::new(provider);
        self
    }

    /// Swaps the exchange-rate table.
    pub fn set_rate_table(&mut self, rates: RateTable) {
        self.registry.set_rate_table(rates);
    }

    #[must_use]
    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Runs the whole pipeline over a document.
    pub fn evaluate_document(&mut self, text: &str) -> DocumentResult {
        let parser = Parser::new(&self.registry, &self.timezones);
        let evaluator = Evaluator::new(
            &self.registry,
            &self.timezones,
            self.settings,
            self.clock.as_ref(),
            self.tz_provider.as_ref(),
        );
        let mut context = EvaluationContext::new();
        let mut result = DocumentResult::default();

        for line in preprocess(text) {
            if line.kind != LineKind::Expression {
                result.lines.push(None);
                continue;
            }
            let parsed = self.cache.get_or_parse(&line.content, &parser);

            let (pruned, prune_error) =
                prune::prune(&parsed.candidates, &context, &self.registry);
            let mut surviving: Vec<_> = pruned.into_iter().cloned().collect();
            if surviving.is_empty() {
                // Retry with plain-text skipping before giving up on
                // the line.
                let fallback = parser.parse_line_text_skip(&line.content);
                let (pruned, _) = prune::prune(&fallback.candidates, &context, &self.registry);
                surviving = pruned.into_iter().cloned().collect();
            }
            if surviving.is_empty() {
                // The line degrades to plain text and reports a parse
                // error.
                let error = prune_error
                    .or_else(|| parsed.error.clone())
                    .unwrap_or_else(|| CalcError::parse().with_message("unable to parse"));
                result.errors.push(LineError::new(line.number, &error));
                result.lines.push(None);
                continue;
            }

            // Evaluate-then-pick: candidates that evaluate without
            // error compete first; only then is anything committed.
            let trials: Vec<_> = surviving
                .iter()
                .map(|candidate| evaluator.try_evaluate_line(candidate, &context))
                .collect();
            let success_pool: Vec<usize> = (0..trials.len())
                .filter(|&idx| !trials[idx].value.is_error())
                .collect();
            let pool: Vec<usize> = if success_pool.is_empty() {
                (0..trials.len()).collect()
            } else {
                success_pool
            };
            let winner = select::pick(&pool, &surviving);
            log::trace!(
                "line {}: {} candidates, {} evaluated cleanly, picked ordinal {}",
                line.number,
                surviving.len(),
                pool.len(),
                surviving[winner].stats.ordinal,
            );
            let trial = &trials[winner];

            if let Value::Error(error) = &trial.value {
                result.errors.push(LineError::new(line.number, error));
            }
            if let Some(name) = &trial.assign {
                context.commit_assignment(name, trial.value.clone());
            }
            result.lines.push(Some(trial.value.clone()));
        }

        self.cache.end_document();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::FixedClock;
    use crate::eval::NumberValue;
    use crate::tz::TimeZone;

    fn session() -> Session {
        // 2026-08-01T12:00:00Z
        Session::new().with_clock(FixedClock::new(1_785_585_600_000, TimeZone::utc()))
    }

    fn single_number(result: &DocumentResult, idx: usize) -> &NumberValue {
        match result.lines[idx].as_ref() {
            Some(Value::Number(number)) => number,
            other => panic!("line {idx}: expected a number, got {other:?}"),
        }
    }

    #[test]
    fn assignments_flow_to_later_lines() {
        let mut session = session();
        let result = session.evaluate_document("x = 10 m\nx + 20 cm");
        assert!(result.errors.is_empty());
        let value = single_number(&result, 1);
        assert!((value.value - 10.2).abs() < 1e-12);
        assert_eq!(value.unit.as_ref().unwrap().id.as_ref(), "meter");
    }

    #[test]
    fn headings_and_empty_lines_produce_none() {
        let mut session = session();
        let result = session.evaluate_document("# Title\n\n1 + 1");
        assert_eq!(result.lines[0], None);
        assert_eq!(result.lines[1], None);
        assert_eq!(single_number(&result, 2).value, 2.0);
    }

    #[test]
    fn undefined_variables_surface_as_parse_errors() {
        let mut session = session();
        let result = session.evaluate_document("y + 1");
        assert_eq!(result.lines[0], None);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Parse);
        assert!(result.errors[0].message.contains('y'));
    }

    #[test]
    fn evaluate_then_pick_prefers_clean_candidates() {
        let mut session = session();
        // `m` is defined, so `5 m` admits both the meter reading and
        // the multiplication reading; both evaluate, and the unit
        // reading wins on unit characters.
        let result = session.evaluate_document("m = 3\n5 m");
        let value = single_number(&result, 1);
        assert!(value.unit.is_some());

        // With a non-numeric variable shadowing the unit, the unit
        // reading still evaluates cleanly while the multiplication
        // errors out; the clean one must win.
        let result = session.evaluate_document("m = true\n5 m");
        assert!(result.errors.is_empty());
        let value = single_number(&result, 1);
        assert_eq!(value.unit.as_ref().unwrap().id.as_ref(), "meter");
    }

    #[test]
    fn errors_do_not_stop_the_document() {
        let mut session = session();
        let result = session.evaluate_document("1 / 0\n2 + 2");
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::DivisionByZero);
        assert_eq!(single_number(&result, 1).value, 4.0);
    }

    #[test]
    fn error_assignments_poison_uses() {
        let mut session = session();
        let result = session.evaluate_document("x = 1 / 0\nx + 1");
        assert_eq!(result.errors.len(), 2);
        assert!(matches!(
            result.lines[1],
            Some(Value::Error(ref err)) if err.kind() == ErrorKind::DivisionByZero
        ));
    }

    #[test]
    fn reruns_are_deterministic() {
        let mut session = session();
        let doc = "x = 171 cm\nx to ft in\n100 km/h to m/s";
        let first = session.evaluate_document(doc);
        let second = session.evaluate_document(doc);
        assert_eq!(first.lines, second.lines);
    }
}
