//! Journal of pending store writes.
//!
//! Every transaction overlay owns a `Journal`. Statements record the store
//! side effects they imply as they run; committing a nested overlay appends
//! its journal to the parent's, and committing the outermost overlay hands
//! the entries to the store in the order they were recorded. A rolled-back
//! overlay drops its journal, so its writes never reach the store.
//!
//! Entries keep the values they overwrite, so a partly applied list can be
//! undone with [`JournalEntry::inverse`].

use relvar_core::{Relation, Result, Row};
use std::collections::{BTreeMap, BTreeSet};

/// A single store write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalEntry {
    /// The whole body of a relation was replaced.
    ReplaceBody {
        relation: String,
        body: Relation,
        previous: Relation,
    },
    /// A row was inserted.
    InsertRow { relation: String, row: Row },
    /// The row identified by `key` had the attributes of `changed` set,
    /// turning `old` into `new`.
    UpdateRow {
        relation: String,
        key: Row,
        changed: Row,
        old: Row,
        new: Row,
    },
    /// A row was deleted.
    DeleteRow { relation: String, row: Row },
}

impl JournalEntry {
    /// Returns the relation name for this entry.
    pub fn relation(&self) -> &str {
        match self {
            JournalEntry::ReplaceBody { relation, .. } => relation,
            JournalEntry::InsertRow { relation, .. } => relation,
            JournalEntry::UpdateRow { relation, .. } => relation,
            JournalEntry::DeleteRow { relation, .. } => relation,
        }
    }

    /// The write that undoes this one.
    pub fn inverse(&self) -> Result<JournalEntry> {
        Ok(match self {
            JournalEntry::ReplaceBody {
                relation,
                body,
                previous,
            } => JournalEntry::ReplaceBody {
                relation: relation.clone(),
                body: previous.clone(),
                previous: body.clone(),
            },
            JournalEntry::InsertRow { relation, row } => JournalEntry::DeleteRow {
                relation: relation.clone(),
                row: row.clone(),
            },
            JournalEntry::DeleteRow { relation, row } => JournalEntry::InsertRow {
                relation: relation.clone(),
                row: row.clone(),
            },
            JournalEntry::UpdateRow {
                relation,
                key,
                changed,
                old,
                new,
            } => JournalEntry::UpdateRow {
                relation: relation.clone(),
                key: values_like(new, key)?,
                changed: values_like(old, changed)?,
                old: new.clone(),
                new: old.clone(),
            },
        })
    }
}

/// The values of `row` for the attributes of `like`.
fn values_like(row: &Row, like: &Row) -> Result<Row> {
    let pairs = like
        .iter()
        .map(|(name, _)| Ok((name.to_string(), row.get(name)?.clone())))
        .collect::<Result<Vec<_>>>()?;
    Row::new(like.row_type(), pairs)
}

/// Net row changes to one relation.
///
/// Adding a row that was removed earlier (or removing one that was added)
/// cancels out, so the diff always describes the difference between the
/// value before the journal began and the current value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RelationDiff {
    added: BTreeSet<Row>,
    removed: BTreeSet<Row>,
}

impl RelationDiff {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an addition.
    pub fn add(&mut self, row: Row) {
        if !self.removed.remove(&row) {
            self.added.insert(row);
        }
    }

    /// Records a removal.
    pub fn remove(&mut self, row: Row) {
        if !self.added.remove(&row) {
            self.removed.insert(row);
        }
    }

    /// Records the replacement of `old` by `new`.
    pub fn replace(&mut self, old: &Relation, new: &Relation) {
        for row in old.iter().filter(|r| !new.contains(r)) {
            self.remove(row.clone());
        }
        for row in new.iter().filter(|r| !old.contains(r)) {
            self.add(row.clone());
        }
    }

    /// Applies the changes of a later diff on top of this one.
    pub fn merge(&mut self, later: RelationDiff) {
        for row in later.removed {
            self.remove(row);
        }
        for row in later.added {
            self.add(row);
        }
    }

    /// Rows added, in ascending order.
    pub fn added(&self) -> &BTreeSet<Row> {
        &self.added
    }

    /// Rows removed, in ascending order.
    pub fn removed(&self) -> &BTreeSet<Row> {
        &self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Ordered store writes plus the net row changes they describe.
#[derive(Clone, Debug, Default)]
pub struct Journal {
    /// Relation name → net row changes.
    diffs: BTreeMap<String, RelationDiff>,
    /// Ordered list of entries for replay against the store.
    entries: Vec<JournalEntry>,
}

impl Journal {
    /// Creates a new empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an insert.
    pub fn record_insert(&mut self, relation: &str, row: Row) {
        self.diff_mut(relation).add(row.clone());
        self.entries.push(JournalEntry::InsertRow {
            relation: relation.into(),
            row,
        });
    }

    /// Records an update of `old` to `new`. `key` identifies the row to the
    /// store and `changed` carries the new values of the updated attributes.
    pub fn record_update(&mut self, relation: &str, old: Row, new: Row, key: Row, changed: Row) {
        let diff = self.diff_mut(relation);
        diff.remove(old.clone());
        diff.add(new.clone());
        self.entries.push(JournalEntry::UpdateRow {
            relation: relation.into(),
            key,
            changed,
            old,
            new,
        });
    }

    /// Records a delete.
    pub fn record_delete(&mut self, relation: &str, row: Row) {
        self.diff_mut(relation).remove(row.clone());
        self.entries.push(JournalEntry::DeleteRow {
            relation: relation.into(),
            row,
        });
    }

    /// Records the wholesale replacement of `old` by `new`.
    pub fn record_replace(&mut self, relation: &str, old: &Relation, new: &Relation) {
        self.diff_mut(relation).replace(old, new);
        self.entries.push(JournalEntry::ReplaceBody {
            relation: relation.into(),
            body: new.clone(),
            previous: old.clone(),
        });
    }

    fn diff_mut(&mut self, relation: &str) -> &mut RelationDiff {
        self.diffs.entry(relation.to_string()).or_default()
    }

    /// Returns all journal entries in recording order.
    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Returns the net changes to `relation`.
    pub fn diff(&self, relation: &str) -> Option<&RelationDiff> {
        self.diffs.get(relation)
    }

    /// Returns the net changes to every relation touched.
    pub fn diffs(&self) -> &BTreeMap<String, RelationDiff> {
        &self.diffs
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends the entries of a journal recorded after this one.
    pub fn append(&mut self, later: Journal) {
        for (relation, diff) in later.diffs {
            self.diff_mut(&relation).merge(diff);
        }
        self.entries.extend(later.entries);
    }

    /// Takes the entries out of the journal, leaving it empty.
    pub fn commit(&mut self) -> Vec<JournalEntry> {
        self.diffs.clear();
        std::mem::take(&mut self.entries)
    }
}
