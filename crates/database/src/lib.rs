//! Relvar Database - relation variables with constraints and transactions.
//!
//! This crate provides the public API of the relvar engine:
//!
//! - `Database`: declared relation variables over a `RelationStore`, with
//!   insert/update/delete/assign statements and nested transactions
//! - `DatabaseOptions`: tunables such as the bound on constraint rounds
//! - Row constraints (per-row predicates of one relation) and database
//!   constraints (predicates over the whole namespace, optionally with a
//!   fixer)
//! - Candidate keys, maintained as derived `_key_<relation>` relations
//!
//! # Example
//!
//! ```rust
//! use relvar_core::{DataType, Error, Header, Row, Value};
//! use relvar_database::Database;
//!
//! let mut db = Database::in_memory();
//! db.declare(
//!     "parts",
//!     Header::new([("pid", DataType::String), ("qty", DataType::Int64)]).unwrap(),
//! )
//! .unwrap();
//! db.set_key("parts", ["pid"]).unwrap();
//!
//! let part = |pid: &str, qty: i64| {
//!     Row::literal([("pid", Value::from(pid)), ("qty", Value::Int64(qty))]).unwrap()
//! };
//! db.insert("parts", [part("P1", 10), part("P2", 5)]).unwrap();
//!
//! let err = db.insert("parts", [part("P1", 99)]).unwrap_err();
//! assert!(matches!(err, Error::RowConstraint { constraint, .. } if constraint == "_key_parts"));
//! assert_eq!(db.get("parts").unwrap().len(), 2);
//! ```

pub mod constraint;
pub mod database;
pub mod key;
pub mod options;

pub use constraint::{
    ConstraintChecker, ConstraintCompiler, DbConstraint, DbPredicate, Fixer, RowCheck,
    RowConstraint, RowPredicate,
};
pub use database::{Database, DatabaseBuilder};
pub use key::{key_relation_name, KEY_PREFIX};
pub use options::{DatabaseOptions, DEFAULT_MAX_CONSTRAINT_ROUNDS};
