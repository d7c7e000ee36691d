//! Structural candidate scoring.

use core::cmp::Reverse;

use crate::syntax::ast::Candidate;

/// Picks the best candidate index out of `pool` (indices into
/// `candidates`).
///
/// Preference order: more source characters matched as units, fewer
/// plain-text fragments, more recognised timezone aliases, more
/// composite-magnitude literals, and finally the grammar's candidate
/// order.
pub fn pick(pool: &[usize], candidates: &[Candidate]) -> usize {
    debug_assert!(!pool.is_empty());
    pool.iter()
        .copied()
        .max_by_key(|&idx| {
            let stats = &candidates[idx].stats;
            (
                stats.unit_chars,
                Reverse(stats.text_fragments),
                stats.timezone_hits,
                stats.composite_literals,
                stats.per_divisor,
                Reverse(stats.ordinal),
            )
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::{CandidateStats, Expr};

    fn candidate(stats: CandidateStats) -> Candidate {
        Candidate {
            expr: Expr::Bool(true),
            assign: None,
            stats,
        }
    }

    #[test]
    fn unit_characters_dominate() {
        let a = candidate(CandidateStats {
            unit_chars: 2,
            ordinal: 1,
            ..CandidateStats::default()
        });
        let b = candidate(CandidateStats {
            unit_chars: 5,
            ordinal: 2,
            ..CandidateStats::default()
        });
        assert_eq!(pick(&[0, 1], &[a, b]), 1);
    }

    #[test]
    fn text_fragments_penalise() {
        let a = candidate(CandidateStats {
            text_fragments: 2,
            ordinal: 0,
            ..CandidateStats::default()
        });
        let b = candidate(CandidateStats {
            text_fragments: 0,
            ordinal: 1,
            ..CandidateStats::default()
        });
        assert_eq!(pick(&[0, 1], &[a, b]), 1);
    }

    #[test]
    fn ties_break_to_the_grammar_order() {
        let a = candidate(CandidateStats {
            ordinal: 0,
            ..CandidateStats::default()
        });
        let b = candidate(CandidateStats {
            ordinal: 1,
            ..CandidateStats::default()
        });
        assert_eq!(pick(&[0, 1], &[a, b]), 0);
    }
}
