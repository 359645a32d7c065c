//! The database: relation variables over a relation store.
//!
//! Every mutating statement runs in its own nested transaction overlay. The
//! statement applies its change, then the row constraints of the changed
//! relation and the database constraints are checked; on success the overlay
//! is committed into the enclosing transaction, on any error it is discarded.
//! A statement issued outside a transaction is wrapped in one, so it is
//! atomic and reaches the store as soon as it completes.

use crate::constraint::{
    ConstraintChecker, ConstraintCompiler, DbConstraint, Fixer, RowConstraint,
};
use crate::key::{self, key_relation_name};
use crate::options::DatabaseOptions;
use hashbrown::HashSet;
use relvar_algebra::{project, restrict, RowOps};
use relvar_core::{
    check_name, AttrType, Error, Header, Relation, RelationType, Result, Row, RowType, Value,
    RESERVED_PREFIX,
};
use relvar_storage::{JournalEntry, MemoryStore, Namespace, RelationDiff, RelationStore};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Configures and opens a [`Database`].
pub struct DatabaseBuilder<S> {
    store: S,
    options: DatabaseOptions,
    compiler: Option<Box<dyn ConstraintCompiler>>,
}

impl<S: RelationStore> DatabaseBuilder<S> {
    pub fn options(mut self, options: DatabaseOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the compiler used to restore persisted row constraints.
    pub fn compiler(mut self, compiler: impl ConstraintCompiler + 'static) -> Self {
        self.compiler = Some(Box::new(compiler));
        self
    }

    /// Opens the database, loading every relation, key and row constraint
    /// the store holds.
    pub fn open(self) -> Result<Database<S>> {
        self.options.validate()?;
        let mut db = Database {
            store: self.store,
            options: self.options,
            compiler: self.compiler,
            ns: Namespace::new(),
            types: BTreeMap::new(),
            row_constraints: BTreeMap::new(),
            db_constraints: BTreeMap::new(),
            keys: BTreeMap::new(),
        };

        for stored in db.store.load()? {
            let ty = RelationType::new(stored.header);
            let value = Relation::from_rows(&ty, stored.rows)?;
            db.ns.set_committed(stored.name.clone(), value)?;
            db.types.insert(stored.name, ty);
        }
        for (relation, attributes) in db.store.load_keys()? {
            db.install_key(&relation, attributes)?;
        }
        for (relation, constraints) in db.store.load_row_constraints()? {
            db.relation_type(&relation)?;
            for (name, text) in constraints {
                let predicate = db
                    .compiler
                    .as_ref()
                    .and_then(|compiler| compiler.compile(&relation, &name, &text))
                    .ok_or_else(|| Error::UncompiledConstraint {
                        relation: relation.clone(),
                        constraint: name.clone(),
                        text: text.clone(),
                    })?;
                db.row_constraints
                    .entry(relation.clone())
                    .or_default()
                    .insert(name, RowConstraint::predicate(text, predicate));
            }
        }
        debug!(
            relations = db.types.len(),
            keys = db.keys.len(),
            "database opened"
        );
        Ok(db)
    }
}

/// Relation variables with constraints, keys and nested transactions.
pub struct Database<S = MemoryStore> {
    store: S,
    options: DatabaseOptions,
    compiler: Option<Box<dyn ConstraintCompiler>>,
    ns: Namespace,
    /// Declared relation variables and their types.
    types: BTreeMap<String, RelationType>,
    /// Relation name → constraint name → constraint.
    row_constraints: BTreeMap<String, BTreeMap<String, RowConstraint>>,
    db_constraints: BTreeMap<String, DbConstraint>,
    /// Relation name → key attributes.
    keys: BTreeMap<String, Vec<String>>,
}

impl Database<MemoryStore> {
    /// An empty database over a fresh [`MemoryStore`].
    pub fn in_memory() -> Self {
        Self {
            store: MemoryStore::new(),
            options: DatabaseOptions::default(),
            compiler: None,
            ns: Namespace::new(),
            types: BTreeMap::new(),
            row_constraints: BTreeMap::new(),
            db_constraints: BTreeMap::new(),
            keys: BTreeMap::new(),
        }
    }
}

impl<S: RelationStore> Database<S> {
    pub fn builder(store: S) -> DatabaseBuilder<S> {
        DatabaseBuilder {
            store,
            options: DatabaseOptions::default(),
            compiler: None,
        }
    }

    /// Opens a database over `store` with default options.
    pub fn open(store: S) -> Result<Self> {
        Self::builder(store).open()
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// The transaction namespace, including derived key relations.
    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    // ------------------------------------------------------------------
    // Relation variables
    // ------------------------------------------------------------------

    /// Names of the declared relation variables, in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    pub fn relation_type(&self, name: &str) -> Result<&RelationType> {
        self.types
            .get(name)
            .ok_or_else(|| Error::relation_not_found(name))
    }

    /// Current value of relation variable `name`, including the writes of
    /// any open transaction.
    pub fn get(&self, name: &str) -> Result<&Relation> {
        self.relation_type(name)?;
        self.ns.require(name)
    }

    /// Declares relation variable `name` with an empty value.
    pub fn declare(&mut self, name: &str, header: Header) -> Result<RelationType> {
        self.require_no_transaction("declare")?;
        check_name(name, false)?;
        if self.types.contains_key(name) {
            return Err(Error::RelationExists {
                name: name.to_string(),
            });
        }
        self.store.declare_type(name, &header)?;
        let ty = RelationType::new(header);
        self.ns.set_committed(name, Relation::empty(&ty))?;
        self.types.insert(name.to_string(), ty.clone());
        debug!(relation = name, header = %ty.header(), "relation declared");
        Ok(ty)
    }

    /// Declares relation variable `name` with the type of `initial` and
    /// assigns it.
    pub fn create(&mut self, name: &str, initial: Relation) -> Result<()> {
        self.declare(name, initial.header().clone())?;
        if !initial.is_empty() {
            self.assign(name, initial)?;
        }
        Ok(())
    }

    /// Replaces the value of `name`. The new value must have its declared
    /// type.
    pub fn assign(&mut self, name: &str, value: Relation) -> Result<()> {
        self.statement(name, |db| {
            let ty = db.relation_type(name)?;
            if value.relation_type() != ty {
                return Err(Error::relation_type_mismatch(
                    "assign",
                    ty.header(),
                    value.header(),
                ));
            }
            let old = db.ns.require(name)?.clone();
            db.ns.journal_mut()?.record_replace(name, &old, &value);
            db.ns.set(name, value)
        })
    }

    /// Adds rows to `name`. Each row must have the relation's row type; a
    /// row already present (or given twice) is a [`Error::DuplicateRow`].
    /// Returns the number of rows added.
    pub fn insert<I>(&mut self, name: &str, rows: I) -> Result<usize>
    where
        I: IntoIterator<Item = Row>,
    {
        self.statement(name, |db| {
            let current = db.ns.require(name)?.clone();
            let mut added: Vec<Row> = Vec::new();
            let mut seen: HashSet<Row> = HashSet::new();
            for (position, row) in rows.into_iter().enumerate() {
                let row = Row::cast(current.row_type(), &row).map_err(|e| e.in_row(position))?;
                if current.contains(&row) || !seen.insert(row.clone()) {
                    return Err(Error::DuplicateRow { row, position });
                }
                added.push(row);
            }

            let value = Relation::build(
                current.relation_type(),
                current.iter().cloned().chain(added.iter().cloned()),
            )?;
            let journal = db.ns.journal_mut()?;
            for row in &added {
                journal.record_insert(name, row.clone());
            }
            db.ns.set(name, value)?;
            Ok(added.len())
        })
    }

    /// Updates the rows of `name` selected by `predicate`, setting the
    /// attribute/value pairs `changes` computes for each. Returns the number
    /// of rows selected.
    ///
    /// Rows whose store key stays put reach the store as in-place updates.
    /// When a key value changes, or a new row coincides with another current
    /// row, the net change is written as deletes followed by inserts so no
    /// write can land on a row rewritten earlier in the statement.
    pub fn update<P, C, I, N, V>(&mut self, name: &str, predicate: P, changes: C) -> Result<usize>
    where
        P: Fn(&Row) -> Result<bool>,
        C: Fn(&Row) -> Result<I>,
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<Value>,
    {
        let key = self.keys.get(name).cloned();
        self.statement(name, |db| {
            let current = db.ns.require(name)?.clone();
            let header = current.header();
            let selected = restrict(&current, &predicate)?;

            // (old, new, store key, changed attributes)
            let mut updates: Vec<(Row, Row, Row, Row)> = Vec::with_capacity(selected.len());
            for old in selected.sorted_rows() {
                let pairs: Vec<(String, Value)> = changes(old)?
                    .into_iter()
                    .map(|(n, v)| (n.into(), v.into()))
                    .collect();
                let changed_header = Header::new(
                    pairs
                        .iter()
                        .map(|(n, _)| {
                            header
                                .get(n)
                                .cloned()
                                .map(|ty| (n.clone(), ty))
                                .ok_or_else(|| Error::unknown_attribute(n.as_str(), header))
                        })
                        .collect::<Result<Vec<(String, AttrType)>>>()?,
                )?;
                let changed = Row::new(&RowType::new(changed_header), pairs)?;
                let new = Row::new(
                    old.row_type(),
                    old.iter().map(|(attr, value)| {
                        (attr.to_string(), changed.value(attr).unwrap_or(value).clone())
                    }),
                )?;
                let store_key = match &key {
                    Some(attributes) => old.project(attributes.clone())?,
                    None => old.clone(),
                };
                updates.push((old.clone(), new, store_key, changed));
            }

            let value = {
                let replaced: HashSet<&Row> = updates.iter().map(|u| &u.0).collect();
                Relation::build(
                    current.relation_type(),
                    current
                        .iter()
                        .filter(|row| !replaced.contains(row))
                        .cloned()
                        .chain(updates.iter().map(|u| u.1.clone())),
                )?
            };
            let in_place = match &key {
                Some(attributes) => updates.iter().all(|(old, new, _, _)| {
                    attributes.iter().all(|a| old.value(a) == new.value(a))
                }),
                None => {
                    let mut targets: HashSet<&Row> = HashSet::new();
                    updates.iter().all(|(old, new, _, _)| {
                        (old == new || !current.contains(new)) && targets.insert(new)
                    })
                }
            };

            let count = updates.len();
            let journal = db.ns.journal_mut()?;
            if in_place {
                for (old, new, store_key, changed) in updates {
                    journal.record_update(name, old, new, store_key, changed);
                }
            } else {
                for row in current.sorted_rows() {
                    if !value.contains(row) {
                        journal.record_delete(name, row.clone());
                    }
                }
                for row in value.sorted_rows() {
                    if !current.contains(row) {
                        journal.record_insert(name, row.clone());
                    }
                }
            }
            db.ns.set(name, value)?;
            Ok(count)
        })
    }

    /// Deletes the rows of `name` selected by `predicate`. Returns the number
    /// of rows deleted.
    pub fn delete<P>(&mut self, name: &str, predicate: P) -> Result<usize>
    where
        P: Fn(&Row) -> Result<bool>,
    {
        self.statement(name, |db| {
            let current = db.ns.require(name)?.clone();
            let doomed = restrict(&current, &predicate)?;
            let value = Relation::build(
                current.relation_type(),
                current.iter().filter(|row| !doomed.contains(row)).cloned(),
            )?;
            let journal = db.ns.journal_mut()?;
            for row in doomed.sorted_rows() {
                journal.record_delete(name, row.clone());
            }
            db.ns.set(name, value)?;
            Ok(doomed.len())
        })
    }

    /// Runs `apply` as one statement on relation `relation`.
    fn statement<T>(&mut self, relation: &str, apply: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.relation_type(relation)?;
        let implicit = !self.ns.in_transaction();
        if implicit {
            self.begin();
        }

        self.ns.begin();
        let result = apply(self).and_then(|value| {
            self.check_constraints(relation)?;
            Ok(value)
        });
        let result = match result {
            Ok(value) => {
                if let Some(diff) = self.ns.journal().and_then(|j| j.diff(relation)) {
                    debug!(
                        relation,
                        added = diff.added().len(),
                        removed = diff.removed().len(),
                        "statement applied"
                    );
                }
                self.ns.commit()?;
                Ok(value)
            }
            Err(err) => {
                self.ns.rollback()?;
                Err(err)
            }
        };

        if implicit {
            match &result {
                Ok(_) => self.commit()?,
                Err(_) => self.rollback()?,
            }
        }
        result
    }

    /// Checks the row constraints of `relation` and the database constraints
    /// against the innermost overlay.
    fn check_constraints(&mut self, relation: &str) -> Result<()> {
        if let Some(constraints) = self.row_constraints.get(relation) {
            let value = self.ns.require(relation)?;
            let unchanged = RelationDiff::new();
            let changes = self
                .ns
                .journal()
                .and_then(|j| j.diff(relation))
                .unwrap_or(&unchanged);
            ConstraintChecker::check_rows(relation, value, constraints, &self.ns, changes)?;
        }
        self.check_database()
    }

    fn check_database(&mut self) -> Result<()> {
        ConstraintChecker::check_database(
            &self.db_constraints,
            &mut self.ns,
            self.options.max_constraint_rounds,
        )
    }

    // ------------------------------------------------------------------
    // Transactions
    // ------------------------------------------------------------------

    /// Opens a (possibly nested) transaction.
    pub fn begin(&mut self) {
        self.ns.begin();
    }

    /// Commits the innermost transaction. Committing the outermost one
    /// performs its journaled writes on the store; if the store fails, the
    /// transaction is rolled back.
    pub fn commit(&mut self) -> Result<()> {
        if self.ns.depth() == 1 {
            if let Err(err) = self.flush() {
                self.ns.rollback()?;
                return Err(err);
            }
        }
        self.ns.commit().map(|_| ())
    }

    /// Discards the innermost transaction.
    pub fn rollback(&mut self) -> Result<()> {
        self.ns.rollback()
    }

    pub fn in_transaction(&self) -> bool {
        self.ns.in_transaction()
    }

    /// Number of open transactions.
    pub fn depth(&self) -> usize {
        self.ns.depth()
    }

    /// Runs `f` in a transaction, committing if it succeeds and rolling
    /// back if it fails.
    pub fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.begin();
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => {
                self.rollback()?;
                Err(err)
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        if self.options.verify_keys {
            self.verify_keys()?;
        }
        let entries: Vec<JournalEntry> = self
            .ns
            .journal()
            .map(|journal| journal.entries().to_vec())
            .unwrap_or_default();
        self.store.apply_all(&entries)
    }

    fn verify_keys(&self) -> Result<()> {
        for (relation, attributes) in &self.keys {
            let fresh = project(self.ns.require(relation)?, attributes.clone())?;
            if self.ns.require(&key_relation_name(relation))? != &fresh {
                return Err(Error::invalid_operation(format!(
                    "key relation of {} differs from its projection",
                    relation
                )));
            }
        }
        Ok(())
    }

    fn require_no_transaction(&self, operation: &'static str) -> Result<()> {
        if self.ns.in_transaction() {
            return Err(Error::TransactionActive { operation });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Constraints
    // ------------------------------------------------------------------

    /// Adds row constraint `name` to `relation`. The current value must
    /// satisfy it; `text` is persisted so a [`ConstraintCompiler`] can
    /// restore the predicate when the database is reopened.
    pub fn constrain_rows<F>(
        &mut self,
        relation: &str,
        name: &str,
        text: impl Into<String>,
        predicate: F,
    ) -> Result<()>
    where
        F: Fn(&Row, &Namespace) -> Result<bool> + 'static,
    {
        self.require_no_transaction("constrain_rows")?;
        self.relation_type(relation)?;
        check_name(name, false)?;
        let constraint = RowConstraint::predicate(text, Arc::new(predicate));
        let text = constraint.text.clone();
        let previous = self
            .row_constraints
            .entry(relation.to_string())
            .or_default()
            .insert(name.to_string(), constraint);

        let unchanged = RelationDiff::new();
        let checked = match (self.ns.require(relation), self.row_constraints.get(relation)) {
            (Ok(value), Some(constraints)) => {
                ConstraintChecker::check_rows(relation, value, constraints, &self.ns, &unchanged)
            }
            (Err(err), _) => Err(err),
            (Ok(_), None) => Ok(()),
        };
        let result = checked.and_then(|_| self.store.save_row_constraint(relation, name, &text));
        if let Err(err) = result {
            let constraints = self.row_constraints.entry(relation.to_string()).or_default();
            match previous {
                Some(previous) => {
                    constraints.insert(name.to_string(), previous);
                }
                None => {
                    constraints.remove(name);
                }
            }
            return Err(err);
        }
        debug!(relation, constraint = name, "row constraint added");
        Ok(())
    }

    /// Removes row constraint `name` from `relation`.
    pub fn remove_row_constraint(&mut self, relation: &str, name: &str) -> Result<()> {
        self.require_no_transaction("remove_row_constraint")?;
        self.relation_type(relation)?;
        if name.starts_with(RESERVED_PREFIX) {
            return Err(Error::invalid_operation(format!(
                "{} is maintained by the database and cannot be removed",
                name
            )));
        }
        let removed = self
            .row_constraints
            .get_mut(relation)
            .and_then(|constraints| constraints.remove(name));
        if removed.is_none() {
            return Err(Error::invalid_operation(format!(
                "{} has no row constraint {}",
                relation, name
            )));
        }
        self.store.delete_row_constraint(relation, name)?;
        debug!(relation, constraint = name, "row constraint removed");
        Ok(())
    }

    /// Adds database constraint `name`. The current state must satisfy it.
    pub fn add_constraint<P>(&mut self, name: &str, description: impl Into<String>, predicate: P) -> Result<()>
    where
        P: Fn(&Namespace) -> Result<bool> + 'static,
    {
        self.register_constraint(
            name,
            DbConstraint {
                description: description.into(),
                predicate: Arc::new(predicate),
                fixer: None,
            },
        )
    }

    /// Adds database constraint `name` with a fixer that is invoked whenever
    /// the constraint fails. The fixer may rebind names in the namespace;
    /// its writes are not journaled, so it should only maintain derived
    /// relations.
    pub fn add_constraint_with_fixer<P, F>(
        &mut self,
        name: &str,
        description: impl Into<String>,
        predicate: P,
        fixer: F,
    ) -> Result<()>
    where
        P: Fn(&Namespace) -> Result<bool> + 'static,
        F: Fn(&mut Namespace) -> Result<bool> + 'static,
    {
        let fixer: Fixer = Arc::new(fixer);
        self.register_constraint(
            name,
            DbConstraint {
                description: description.into(),
                predicate: Arc::new(predicate),
                fixer: Some(fixer),
            },
        )
    }

    fn register_constraint(&mut self, name: &str, constraint: DbConstraint) -> Result<()> {
        self.require_no_transaction("add_constraint")?;
        check_name(name, false)?;
        if self.db_constraints.contains_key(name) {
            return Err(Error::invalid_operation(format!(
                "database constraint {} already exists",
                name
            )));
        }
        self.db_constraints.insert(name.to_string(), constraint);
        let checked = self.transaction(|db| db.check_database());
        if checked.is_err() {
            self.db_constraints.remove(name);
        } else {
            debug!(constraint = name, "database constraint added");
        }
        checked
    }

    /// Removes database constraint `name`.
    pub fn remove_constraint(&mut self, name: &str) -> Result<()> {
        self.require_no_transaction("remove_constraint")?;
        if name.starts_with(RESERVED_PREFIX) {
            return Err(Error::invalid_operation(format!(
                "{} is maintained by the database and cannot be removed",
                name
            )));
        }
        if self.db_constraints.remove(name).is_none() {
            return Err(Error::invalid_operation(format!(
                "no database constraint {}",
                name
            )));
        }
        debug!(constraint = name, "database constraint removed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------

    /// Declares `attributes` a candidate key of `relation`, replacing any
    /// previous key. The current value must be unique on them.
    pub fn set_key<I, A>(&mut self, relation: &str, attributes: I) -> Result<()>
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.require_no_transaction("set_key")?;
        let attributes: Vec<String> = attributes.into_iter().map(Into::into).collect();
        let value = self.get(relation)?;
        let all: BTreeSet<Row> = value.iter().cloned().collect();
        if let Some(row) = key::claimed_rows(value, &attributes, &all)?.into_iter().next() {
            return Err(Error::RowConstraint {
                relation: relation.to_string(),
                constraint: key_relation_name(relation),
                text: RowConstraint::key(attributes).text,
                row,
            });
        }
        self.install_key(relation, attributes.clone())?;
        self.store.save_key(relation, &attributes)?;
        debug!(relation, key = ?attributes, "key declared");
        Ok(())
    }

    /// The key attributes declared for `relation`, if any.
    pub fn key(&self, relation: &str) -> Result<Option<&[String]>> {
        self.relation_type(relation)?;
        Ok(self.keys.get(relation).map(Vec::as_slice))
    }

    /// Materialises the key relation and registers the key's constraints.
    fn install_key(&mut self, relation: &str, attributes: Vec<String>) -> Result<()> {
        let value = self.get(relation)?;
        let key_name = key_relation_name(relation);
        let key_value = project(value, attributes.clone())?;
        self.ns.set_committed(key_name.clone(), key_value)?;
        self.row_constraints
            .entry(relation.to_string())
            .or_default()
            .insert(key_name.clone(), RowConstraint::key(attributes.clone()));
        self.db_constraints
            .insert(key_name, key::key_constraint(relation, &attributes));
        self.keys.insert(relation.to_string(), attributes);
        Ok(())
    }
}
