//! Transaction namespace.
//!
//! A `Namespace` binds relation names to relation values. Committed bindings
//! sit at the bottom; each open transaction pushes an overlay holding the
//! bindings written inside it and the journal of store writes they imply.
//! Reads look through the overlays from the innermost outwards and fall
//! through to the committed bindings; writes go to the innermost overlay.

use crate::journal::{Journal, JournalEntry};
use relvar_core::{Error, Relation, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Default)]
struct Overlay {
    bindings: BTreeMap<String, Relation>,
    journal: Journal,
}

/// Committed relation bindings plus a stack of transaction overlays.
#[derive(Debug, Default)]
pub struct Namespace {
    committed: BTreeMap<String, Relation>,
    overlays: Vec<Overlay>,
}

impl Namespace {
    /// Creates an empty namespace with no open transaction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a namespace over already-committed bindings.
    pub fn with_committed(committed: BTreeMap<String, Relation>) -> Self {
        Self {
            committed,
            overlays: Vec::new(),
        }
    }

    /// Number of open transactions.
    #[inline]
    pub fn depth(&self) -> usize {
        self.overlays.len()
    }

    #[inline]
    pub fn in_transaction(&self) -> bool {
        !self.overlays.is_empty()
    }

    /// Opens a (possibly nested) transaction.
    pub fn begin(&mut self) {
        self.overlays.push(Overlay::default());
        debug!(depth = self.depth(), "begin transaction");
    }

    /// Commits the innermost transaction.
    ///
    /// A nested commit folds the overlay's bindings and journal into its
    /// parent and returns no entries. The outermost commit folds the bindings
    /// into the committed state and returns the journal entries the store
    /// must now perform, in recording order.
    pub fn commit(&mut self) -> Result<Vec<JournalEntry>> {
        let overlay = self.overlays.pop().ok_or(Error::NoTransaction)?;
        let depth = self.depth();
        match self.overlays.last_mut() {
            Some(parent) => {
                parent.bindings.extend(overlay.bindings);
                parent.journal.append(overlay.journal);
                debug!(depth = depth + 1, "commit nested transaction");
                Ok(Vec::new())
            }
            None => {
                let Overlay {
                    bindings,
                    mut journal,
                } = overlay;
                self.committed.extend(bindings);
                let entries = journal.commit();
                debug!(writes = entries.len(), "commit transaction");
                Ok(entries)
            }
        }
    }

    /// Discards the innermost transaction, leaving its parent exactly as it
    /// was before the matching [`Namespace::begin`].
    pub fn rollback(&mut self) -> Result<()> {
        let overlay = self.overlays.pop().ok_or(Error::NoTransaction)?;
        debug!(
            depth = self.depth() + 1,
            discarded = overlay.journal.entries().len(),
            "rollback transaction"
        );
        Ok(())
    }

    /// Resolves `name`, innermost overlay first.
    pub fn get(&self, name: &str) -> Option<&Relation> {
        self.overlays
            .iter()
            .rev()
            .find_map(|overlay| overlay.bindings.get(name))
            .or_else(|| self.committed.get(name))
    }

    /// Like [`Namespace::get`], failing when `name` is unbound.
    pub fn require(&self, name: &str) -> Result<&Relation> {
        self.get(name).ok_or_else(|| Error::relation_not_found(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Every bound name, in ascending order.
    pub fn names(&self) -> Vec<String> {
        let mut names: BTreeSet<&String> = self.committed.keys().collect();
        for overlay in &self.overlays {
            names.extend(overlay.bindings.keys());
        }
        names.into_iter().cloned().collect()
    }

    /// Binds `name` in the innermost overlay.
    pub fn set(&mut self, name: impl Into<String>, value: Relation) -> Result<()> {
        let overlay = self.overlays.last_mut().ok_or(Error::NoTransaction)?;
        overlay.bindings.insert(name.into(), value);
        Ok(())
    }

    /// Binds `name` directly in the committed state. Only valid outside a
    /// transaction; used by schema operations, which are not transactional.
    pub fn set_committed(&mut self, name: impl Into<String>, value: Relation) -> Result<()> {
        if self.in_transaction() {
            return Err(Error::TransactionActive {
                operation: "set_committed",
            });
        }
        self.committed.insert(name.into(), value);
        Ok(())
    }

    /// The journal of the innermost overlay.
    pub fn journal(&self) -> Option<&Journal> {
        self.overlays.last().map(|overlay| &overlay.journal)
    }

    /// Mutable access to the journal of the innermost overlay.
    pub fn journal_mut(&mut self) -> Result<&mut Journal> {
        self.overlays
            .last_mut()
            .map(|overlay| &mut overlay.journal)
            .ok_or(Error::NoTransaction)
    }
}
