//! Constraint checking for relvar databases.
//!
//! Row constraints are predicates over single rows of one relation, checked
//! against the relation's pending value after every statement that changes
//! it. Database constraints are predicates over the whole namespace, each
//! optionally paired with a fixer that repairs derived state; they are
//! evaluated in rounds until every constraint holds.

use crate::key;
use relvar_core::{Error, Relation, Result, Row};
use relvar_storage::{Namespace, RelationDiff};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{trace, warn};

/// A row predicate. Receives the row and a read-only view of the pending
/// namespace.
pub type RowPredicate = Arc<dyn Fn(&Row, &Namespace) -> Result<bool>>;

/// A database-constraint predicate.
pub type DbPredicate = Arc<dyn Fn(&Namespace) -> Result<bool>>;

/// Repairs state so that a failing database constraint holds again.
/// Returns `false` when it cannot.
pub type Fixer = Arc<dyn Fn(&mut Namespace) -> Result<bool>>;

/// Turns persisted row-constraint text back into a predicate when a
/// database is reopened.
pub trait ConstraintCompiler {
    /// Returns `None` when `text` cannot be compiled.
    fn compile(&self, relation: &str, constraint: &str, text: &str) -> Option<RowPredicate>;
}

/// What a row constraint checks.
#[derive(Clone)]
pub enum RowCheck {
    /// A user predicate, evaluated on every row.
    Predicate(RowPredicate),
    /// Uniqueness on the given attributes.
    Key(Vec<String>),
}

/// A named row constraint of one relation.
#[derive(Clone)]
pub struct RowConstraint {
    /// Source text, as persisted and as reported on violation.
    pub text: String,
    pub check: RowCheck,
}

impl RowConstraint {
    pub fn predicate(text: impl Into<String>, predicate: RowPredicate) -> Self {
        Self {
            text: text.into(),
            check: RowCheck::Predicate(predicate),
        }
    }

    pub fn key(attributes: Vec<String>) -> Self {
        Self {
            text: format!("unique ({})", attributes.join(", ")),
            check: RowCheck::Key(attributes),
        }
    }
}

/// A named database constraint.
#[derive(Clone)]
pub struct DbConstraint {
    pub description: String,
    pub predicate: DbPredicate,
    pub fixer: Option<Fixer>,
}

/// Constraint checker.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Checks the row constraints of `relation` against its value.
    ///
    /// `changes` holds the rows the current statement added and removed; key
    /// constraints only reject added rows, looking their keys up in the key
    /// relation. On violation the smallest failing row is reported together
    /// with the smallest-named constraint it fails.
    pub fn check_rows(
        relation: &str,
        value: &Relation,
        constraints: &BTreeMap<String, RowConstraint>,
        ns: &Namespace,
        changes: &RelationDiff,
    ) -> Result<()> {
        if constraints.is_empty() {
            return Ok(());
        }
        let mut key_failures: BTreeMap<&str, BTreeSet<Row>> = BTreeMap::new();
        for (name, constraint) in constraints {
            if let RowCheck::Key(attributes) = &constraint.check {
                key_failures.insert(
                    name.as_str(),
                    key::taken_rows(relation, value, attributes, ns, changes)?,
                );
            }
        }

        for row in value.sorted_rows() {
            for (name, constraint) in constraints {
                let holds = match &constraint.check {
                    RowCheck::Predicate(predicate) => predicate(row, ns)?,
                    RowCheck::Key(_) => !key_failures
                        .get(name.as_str())
                        .is_some_and(|failing| failing.contains(row)),
                };
                if !holds {
                    trace!(relation, constraint = %name, %row, "row constraint violated");
                    return Err(Error::RowConstraint {
                        relation: relation.to_string(),
                        constraint: name.clone(),
                        text: constraint.text.clone(),
                        row: row.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Evaluates the database constraints until all hold.
    ///
    /// Each round evaluates every constraint in name order. A failing
    /// constraint with a fixer has the fixer applied and makes the round
    /// unstable; one without a fixer (or whose fixer gives up) fails at once.
    /// A round in which nothing failed ends the loop. Running out of rounds
    /// is [`Error::ConstraintLoop`].
    pub fn check_database(
        constraints: &BTreeMap<String, DbConstraint>,
        ns: &mut Namespace,
        max_rounds: usize,
    ) -> Result<()> {
        for round in 1..=max_rounds {
            let mut stable = true;
            for (name, constraint) in constraints {
                if (constraint.predicate)(ns)? {
                    continue;
                }
                let fixed = match &constraint.fixer {
                    Some(fixer) => {
                        trace!(round, constraint = %name, "invoking fixer");
                        fixer(ns)?
                    }
                    None => false,
                };
                if !fixed {
                    return Err(Error::DbConstraint {
                        name: name.clone(),
                        description: constraint.description.clone(),
                        fixer_attempted: constraint.fixer.is_some(),
                    });
                }
                stable = false;
            }
            trace!(round, stable, "database constraint round");
            if stable {
                return Ok(());
            }
        }
        warn!(rounds = max_rounds, "database constraints did not converge");
        Err(Error::ConstraintLoop { rounds: max_rounds })
    }
}
