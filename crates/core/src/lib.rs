//! Relvar Core - structural types, rows and relation values.
//!
//! This crate provides the foundational value model of the relvar relational
//! engine:
//!
//! - `DataType`, `Domain`, `AttrType`: attribute types (built-in scalars, user
//!   domains, nested row and relation types)
//! - `Value`: attribute values
//! - `Header`: the attribute-name to attribute-type mapping that determines a type
//! - `TypeRegistry`, `RowType`, `RelationType`: canonical, memoized types
//! - `Row`, `Relation`: immutable typed tuples and duplicate-free sets of them
//! - `Error`: error types shared by every relvar crate
//!
//! # Example
//!
//! ```rust
//! use relvar_core::{DataType, Header, Relation, RelationType, Row, Value};
//!
//! let parts = RelationType::new(
//!     Header::new([("pid", DataType::String), ("qty", DataType::Int64)]).unwrap(),
//! );
//! let p1 = Row::new(parts.row_type(), [("pid", Value::from("P1")), ("qty", Value::Int64(10))])
//!     .unwrap();
//! let rel = Relation::from_rows(&parts, vec![p1.clone()]).unwrap();
//!
//! assert_eq!(rel.len(), 1);
//! assert_eq!(p1.get("qty").unwrap(), &Value::Int64(10));
//!
//! // Structurally equal headers give the same type.
//! let again = RelationType::new(
//!     Header::new([("qty", DataType::Int64), ("pid", DataType::String)]).unwrap(),
//! );
//! assert_eq!(parts, again);
//! ```

mod error;
mod header;
mod registry;
mod relation;
mod row;
mod types;
mod value;

pub use error::{Error, Result, StoreError};
pub use header::{check_name, Header, RESERVED_PREFIX};
pub use registry::{RelationType, RowType, TypeDescriptor, TypeKind, TypeRegistry};
pub use relation::Relation;
pub use row::Row;
pub use types::{AttrType, CoercionError, DataType, Domain};
pub use value::{DomainValue, Value};
