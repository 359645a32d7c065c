//! Candidate keys.
//!
//! A key on relation `M` is maintained as a derived relation `K` bound in the
//! namespace under [`key_relation_name`], holding the projection of `M` onto
//! the key attributes. Uniqueness is enforced by a row constraint that looks
//! the keys of a statement's new rows up in `K`; keeping `K` in step with `M`
//! is the job of a database constraint whose fixer updates `K` incrementally
//! from the difference between the two.

use crate::constraint::{DbConstraint, DbPredicate, Fixer};
use hashbrown::HashSet;
use relvar_algebra::{matching, notmatching, project, union};
use relvar_core::{Relation, Result, Row, Value};
use relvar_storage::{Namespace, RelationDiff};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::trace;

/// Prefix of the namespace binding holding a relation's key relation.
pub const KEY_PREFIX: &str = "_key_";

/// Name of the key relation (and key constraints) of `relation`.
pub fn key_relation_name(relation: &str) -> String {
    format!("{}{}", KEY_PREFIX, relation)
}

/// Rows added by `changes` whose key is already taken.
///
/// A key is taken when the key relation of `relation` holds it and no row
/// removed by `changes` released it, or when a smaller added row took it
/// first.
pub fn taken_rows(
    relation: &str,
    value: &Relation,
    attributes: &[String],
    ns: &Namespace,
    changes: &RelationDiff,
) -> Result<BTreeSet<Row>> {
    let key = ns.require(&key_relation_name(relation))?;
    let key_of = |row: &Row| -> Result<Row> {
        let pairs = attributes
            .iter()
            .map(|name| Ok((name.as_str(), row.get(name)?.clone())))
            .collect::<Result<Vec<_>>>()?;
        Row::new(key.row_type(), pairs)
    };

    let released: HashSet<Row> = changes
        .removed()
        .iter()
        .map(|row| key_of(row))
        .collect::<Result<_>>()?;
    let mut claimed: HashSet<Row> = HashSet::new();
    let mut taken = BTreeSet::new();
    for row in changes.added().iter().filter(|row| value.contains(row)) {
        let row_key = key_of(row)?;
        let held = key.contains(&row_key) && !released.contains(&row_key);
        if held || !claimed.insert(row_key) {
            taken.insert(row.clone());
        }
    }
    Ok(taken)
}

/// Rows of `added` whose key is already claimed, either by a row of `value`
/// that is not in `added` or by a smaller row of `added`. Used to validate a
/// key before its key relation exists.
pub fn claimed_rows(
    value: &Relation,
    attributes: &[String],
    added: &BTreeSet<Row>,
) -> Result<BTreeSet<Row>> {
    value
        .header()
        .require(attributes.iter().map(String::as_str))?;
    let positions: Vec<usize> = attributes
        .iter()
        .filter_map(|name| value.header().index_of(name))
        .collect();
    let key_of = |row: &Row| -> Vec<Value> {
        let values = row.values();
        positions.iter().map(|&i| values[i].clone()).collect()
    };

    let mut claimed: HashSet<Vec<Value>> = value
        .iter()
        .filter(|row| !added.contains(*row))
        .map(key_of)
        .collect();
    let mut failing = BTreeSet::new();
    for row in added.iter().filter(|row| value.contains(row)) {
        if !claimed.insert(key_of(row)) {
            failing.insert(row.clone());
        }
    }
    Ok(failing)
}

/// `K` holds exactly the key projection of `M`.
fn key_holds(main: &Relation, key: &Relation) -> Result<bool> {
    Ok(main.len() == key.len() && notmatching(main, key)?.is_empty())
}

/// The next key relation, derived incrementally from the old one.
///
/// When `M` grew, the keys of the rows `M` gained are added to `K`; when it
/// shrank, `K` keeps only the keys `M` still matches. When the sizes agree
/// (an update that changed key values) both adjustments apply.
pub fn next_key(main: &Relation, key: &Relation, attributes: &[String]) -> Result<Relation> {
    let gained = || -> Result<Relation> {
        project(&notmatching(main, key)?, attributes.to_vec())
    };
    if main.len() > key.len() {
        union([key, &gained()?])
    } else if main.len() < key.len() {
        matching(key, main)
    } else {
        union([&matching(key, main)?, &gained()?])
    }
}

/// The database constraint keeping the key relation of `relation` in step
/// with the relation itself.
pub fn key_constraint(relation: &str, attributes: &[String]) -> DbConstraint {
    let main_name = relation.to_string();
    let key_name = key_relation_name(relation);

    let predicate: DbPredicate = {
        let (main_name, key_name) = (main_name.clone(), key_name.clone());
        Arc::new(move |ns: &Namespace| -> Result<bool> {
            key_holds(ns.require(&main_name)?, ns.require(&key_name)?)
        })
    };

    let fixer: Fixer = {
        let attributes = attributes.to_vec();
        let key_name = key_name.clone();
        Arc::new(move |ns: &mut Namespace| -> Result<bool> {
            let main = ns.require(&main_name)?;
            let key = ns.require(&key_name)?;
            let next = next_key(main, key, &attributes)?;
            trace!(
                relation = %main_name,
                before = key.len(),
                after = next.len(),
                "key relation updated"
            );
            ns.set(key_name.as_str(), next)?;
            Ok(true)
        })
    };

    DbConstraint {
        description: format!("len({}) == len({})", relation, key_name),
        predicate,
        fixer: Some(fixer),
    }
}
