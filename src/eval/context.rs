//! The per-document variable scope.

use rustc_hash::FxHashMap;

use super::value::Value;

/// Insertion-ordered variable scope. Created fresh per document and
/// mutated only through [`EvaluationContext::commit_assignment`].
#[derive(Debug, Default)]
pub struct EvaluationContext {
    entries: Vec<(Box<str>, Value)>,
    index: FxHashMap<Box<str>, usize>,
}

impl EvaluationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks a variable up.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&idx| &self.entries[idx].1)
    }

    /// Whether a variable is defined.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Stores an assignment. Re-assignments keep their original
    /// position in the insertion order.
    pub fn commit_assignment(&mut self, name: &str, value: Value) {
        if let Some(&idx) = self.index.get(name) {
            self.entries[idx].1 = value;
            return;
        }
        let idx = self.entries.len();
        self.entries.push((name.into(), value));
        self.index.insert(name.into(), idx);
    }

    /// Variables in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_ref(), value))
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
    use crate::eval::value::NumberValue;

    #[test]
    fn insertion_order_is_preserved_across_reassignment() {
        let mut context = EvaluationContext::new();
        context.commit_assignment("a", Value::Number(NumberValue::plain(1.0)));
        context.commit_assignment("b", Value::Number(NumberValue::plain(2.0)));
        context.commit_assignment("a", Value::Number(NumberValue::plain(3.0)));

        let names: Vec<&str> = context.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            context.get("a"),
            Some(&Value::Number(NumberValue::plain(3.0)))
        );
    }
}
