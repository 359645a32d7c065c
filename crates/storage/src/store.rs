//! The durable-store boundary.

use crate::journal::JournalEntry;
use relvar_core::{Header, Relation, Result, Row};
use std::collections::BTreeMap;
use tracing::warn;

/// A relation as persisted: its name, header and rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredRelation {
    pub name: String,
    pub header: Header,
    pub rows: Vec<Row>,
}

/// Persisted row-constraint texts: relation name → constraint name → text.
pub type StoredRowConstraints = BTreeMap<String, BTreeMap<String, String>>;

/// Durable storage for relation variables and their constraints.
///
/// The database calls each write method exactly once per committed write,
/// in the order the writes were issued. Implementations report their own
/// failures through [`relvar_core::Error::store`].
pub trait RelationStore {
    /// Every persisted relation.
    fn load(&self) -> Result<Vec<StoredRelation>>;

    /// Persists the type of a newly declared relation.
    fn declare_type(&mut self, name: &str, header: &Header) -> Result<()>;

    fn replace_body(&mut self, name: &str, body: &Relation) -> Result<()>;

    fn insert_row(&mut self, name: &str, row: &Row) -> Result<()>;

    /// Sets the attributes of `changed` on the row whose attributes agree
    /// with `key`.
    fn update_row(&mut self, name: &str, key: &Row, changed: &Row) -> Result<()>;

    fn delete_row(&mut self, name: &str, row: &Row) -> Result<()>;

    fn load_row_constraints(&self) -> Result<StoredRowConstraints>;

    fn save_row_constraint(&mut self, relation: &str, constraint: &str, text: &str) -> Result<()>;

    fn delete_row_constraint(&mut self, relation: &str, constraint: &str) -> Result<()>;

    /// Persists the key attributes declared for `relation`.
    fn save_key(&mut self, relation: &str, attributes: &[String]) -> Result<()>;

    /// Relation name → declared key attributes.
    fn load_keys(&self) -> Result<BTreeMap<String, Vec<String>>>;

    /// Performs one journaled write.
    fn apply(&mut self, entry: &JournalEntry) -> Result<()> {
        match entry {
            JournalEntry::ReplaceBody { relation, body, .. } => self.replace_body(relation, body),
            JournalEntry::InsertRow { relation, row } => self.insert_row(relation, row),
            JournalEntry::UpdateRow {
                relation,
                key,
                changed,
                ..
            } => self.update_row(relation, key, changed),
            JournalEntry::DeleteRow { relation, row } => self.delete_row(relation, row),
        }
    }

    /// Performs the writes of one commit, all or none.
    ///
    /// When a write fails, the writes already performed are undone in
    /// reverse order and the original error is returned. Stores with native
    /// transactions can override this with a single atomic batch.
    fn apply_all(&mut self, entries: &[JournalEntry]) -> Result<()> {
        for (applied, entry) in entries.iter().enumerate() {
            if let Err(err) = self.apply(entry) {
                for done in entries[..applied].iter().rev() {
                    if let Err(undo) = done.inverse().and_then(|inverse| self.apply(&inverse)) {
                        warn!(relation = done.relation(), error = %undo, "failed to undo store write");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}
