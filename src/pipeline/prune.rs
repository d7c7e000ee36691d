//! Candidate pruning against the defined-variable set.

use crate::error::CalcError;
use crate::eval::{functions, EvaluationContext};
use crate::syntax::ast::Candidate;
use crate::units::UnitRegistry;

/// Rejects candidates that reference identifiers which are neither
/// in scope nor known units, currencies or functions.
///
/// When everything is rejected and every candidate misses the same
/// variables, that set becomes the line's diagnostic.
pub fn prune<'c>(
    candidates: &'c [Candidate],
    context: &EvaluationContext,
    registry: &UnitRegistry,
) -> (Vec<&'c Candidate>, Option<CalcError>) {
    let mut surviving = Vec::with_capacity(candidates.len());
    let mut undefined_sets: Vec<Vec<&str>> = Vec::new();

    for candidate in candidates {
        let mut idents = Vec::new();
        candidate.expr.collect_idents(&mut idents);
        let mut undefined: Vec<&str> = idents
            .into_iter()
            .filter(|name| {
                !context.is_defined(name)
                    && !registry.is_unit_name(name)
                    && !functions::is_builtin_function(name)
            })
            .collect();
        if undefined.is_empty() {
            surviving.push(candidate);
        } else {
            undefined.sort_unstable();
            undefined.dedup();
            undefined_sets.push(undefined);
        }
    }

    if !surviving.is_empty() || undefined_sets.is_empty() {
        return (surviving, None);
    }

    let diagnostic = if undefined_sets.windows(2).all(|w| w[0] == w[1]) {
        let names = undefined_sets[0].join(", ");
        Some(CalcError::parse().with_message(if undefined_sets[0].len() == 1 {
            format!("{names} is not defined")
        } else {
            format!("{names} are not defined")
        }))
    } else {
        Some(CalcError::parse().with_message("line references undefined variables"))
    };
    (surviving, diagnostic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{NumberValue, Value};
    use crate::syntax::Parser;
    use crate::tz::TimezoneTable;

    #[test]
    fn known_units_and_functions_are_not_free_variables() {
        let registry = UnitRegistry::builtin();
        let timezones = TimezoneTable::builtin();
        let parser = Parser::new(&registry, &timezones);
        let context = EvaluationContext::new();

        let outcome = parser.parse_line("5 / km");
        let (surviving, error) = prune(&outcome.candidates, &context, &registry);
        assert!(!surviving.is_empty());
        assert!(error.is_none());
    }

    #[test]
    fn undefined_variables_reject_candidates_with_diagnostic() {
        let registry = UnitRegistry::builtin();
        let timezones = TimezoneTable::builtin();
        let parser = Parser::new(&registry, &timezones);
        let context = EvaluationContext::new();

        let outcome = parser.parse_line("frobnicate + 1");
        let (surviving, error) = prune(&outcome.candidates, &context, &registry);
        assert!(surviving.is_empty());
        assert!(error.unwrap().message().contains("frobnicate"));
    }

    #[test]
    fn defined_variables_survive() {
        let registry = UnitRegistry::builtin();
        let timezones = TimezoneTable::builtin();
        let parser = Parser::new(&registry, &timezones);
        let mut context = EvaluationContext::new();
        context.commit_assignment("frobnicate", Value::Number(NumberValue::plain(1.0)));

        let outcome = parser.parse_line("frobnicate + 1");
        let (surviving, _) = prune(&outcome.candidates, &context, &registry);
        assert!(!surviving.is_empty());
    }
}
