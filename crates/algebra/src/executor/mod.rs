//! Operator executors.
//!
//! Every operator is a pure function from relations (and parameters) to a new
//! relation. Operators that need more than one pass over their input keep the
//! executor-struct shape: construction resolves attribute positions once, then
//! `execute` runs over the rows.

mod extend;
mod join;
mod nest;
mod project;
mod rename;
mod restrict;
mod set_ops;
mod summarize;

pub use extend::{extend, extend_typed, Computations};
pub use join::{join, times, HashJoin};
pub use nest::{group, ungroup, unwrap, wrap};
pub use project::{project, project_away, ProjectExecutor, Projection};
pub use rename::rename;
pub use restrict::{restrict, RestrictExecutor};
pub use set_ops::{compose, intersect, matching, minus, notmatching, union, Matcher};
pub use summarize::{summarize, summarize_by, Summaries};

use core::hash::{Hash, Hasher};
use relvar_core::{Header, Row, Value};

/// A wrapper around a Value reference that implements Hash and Eq for use as a
/// HashMap key. This avoids cloning values while building join and match
/// indexes.
#[derive(Clone, Copy)]
pub(crate) struct ValueRef<'a>(&'a Value);

impl<'a> Hash for ValueRef<'a> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<'a> PartialEq for ValueRef<'a> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<'a> Eq for ValueRef<'a> {}

/// Positions of `names` in `header`. Callers have already checked that every
/// name is present.
pub(crate) fn positions(header: &Header, names: &[String]) -> Vec<usize> {
    names.iter().filter_map(|n| header.index_of(n)).collect()
}

/// The values of `row` at `positions`, borrowed, for use as a hash key.
#[inline]
pub(crate) fn key_of<'a>(row: &'a Row, positions: &[usize]) -> Vec<ValueRef<'a>> {
    let values = row.values();
    positions.iter().map(|&i| ValueRef(&values[i])).collect()
}
