//! Relvar Storage - transaction namespace and store boundary.
//!
//! This crate provides:
//!
//! - `Namespace`: committed relation bindings under a stack of nested
//!   transaction overlays
//! - `Journal`: the store writes pending in one overlay, with the net row
//!   changes per relation
//! - `RelationStore`: the trait a durable store implements
//! - `MemoryStore`: an in-memory `RelationStore` that logs every write
//!
//! # Example
//!
//! ```rust
//! use relvar_core::{Relation, Row, Value};
//! use relvar_storage::{MemoryStore, Namespace, RelationStore};
//!
//! let p1 = Row::literal([("pid", Value::from("P1"))]).unwrap();
//! let parts = Relation::literal(vec![p1.clone()]).unwrap();
//!
//! let mut store = MemoryStore::new();
//! store.declare_type("parts", parts.header()).unwrap();
//!
//! let mut ns = Namespace::new();
//! ns.set_committed("parts", Relation::empty(parts.relation_type())).unwrap();
//! ns.begin();
//! ns.set("parts", parts.clone()).unwrap();
//! ns.journal_mut().unwrap().record_insert("parts", p1);
//! store.apply_all(&ns.commit().unwrap()).unwrap();
//!
//! assert_eq!(ns.get("parts"), Some(&parts));
//! assert_eq!(store.rows("parts").unwrap().len(), 1);
//! ```

pub mod journal;
pub mod memory;
pub mod namespace;
pub mod store;

pub use journal::{Journal, JournalEntry, RelationDiff};
pub use memory::{MemoryStore, StoreOp};
pub use namespace::Namespace;
pub use store::{RelationStore, StoredRelation, StoredRowConstraints};
