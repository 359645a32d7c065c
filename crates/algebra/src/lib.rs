//! Relvar Algebra - relational operators for the relvar relational engine.
//!
//! This crate provides the operators of the algebra over `relvar_core`
//! relations:
//!
//! - `join`, `times`, `compose`: natural join, cartesian product, join then
//!   drop the shared attributes
//! - `union`, `intersect`, `minus`, `matching`, `notmatching`: set operators
//!   and semijoins
//! - `project`, `project_away`, `rename`, `restrict`, `extend`
//! - `group`/`ungroup`, `wrap`/`unwrap`: nesting into relation- and
//!   row-valued attributes
//! - `summarize`, `summarize_by` and the folds in [`aggregate`]
//! - `RelationOps`, `RowOps`: the same operators as chainable methods
//!
//! Operators never modify their inputs; each returns a new relation.

pub mod aggregate;
mod executor;
mod ops;

pub use executor::{
    compose, extend, extend_typed, group, intersect, join, matching, minus, notmatching, project,
    project_away, rename, restrict, summarize, summarize_by, times, ungroup, union, unwrap, wrap,
    Computations, HashJoin, Matcher, ProjectExecutor, Projection, RestrictExecutor, Summaries,
};
pub use ops::{RelationOps, RowOps};
