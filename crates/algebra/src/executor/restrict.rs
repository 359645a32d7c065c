//! Restrict executor.

use relvar_core::{Relation, Result, Row};

/// Restrict executor - keeps the rows for which a predicate holds.
pub struct RestrictExecutor<F> {
    predicate: F,
}

impl<F> RestrictExecutor<F>
where
    F: Fn(&Row) -> Result<bool>,
{
    /// Creates a new restrict executor.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }

    /// Executes the restriction on the input relation. The result has the
    /// input's type.
    pub fn execute(&self, input: &Relation) -> Result<Relation> {
        let mut rows = Vec::new();
        for row in input.iter() {
            if (self.predicate)(row)? {
                rows.push(row.clone());
            }
        }
        Relation::build(input.relation_type(), rows)
    }
}

/// The rows of `relation` satisfying `predicate` (Tutorial D `WHERE`).
pub fn restrict<F>(relation: &Relation, predicate: F) -> Result<Relation>
where
    F: Fn(&Row) -> Result<bool>,
{
    RestrictExecutor::new(predicate).execute(relation)
}
