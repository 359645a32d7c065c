//! In-memory relation store.

use crate::store::{RelationStore, StoredRelation, StoredRowConstraints};
use relvar_core::{Error, Header, Relation, Result, Row};
use std::collections::{BTreeMap, BTreeSet};

/// A store write, as recorded in [`MemoryStore::log`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreOp {
    DeclareType(String),
    ReplaceBody(String),
    InsertRow(String, Row),
    UpdateRow(String, Row, Row),
    DeleteRow(String, Row),
    SaveRowConstraint(String, String),
    DeleteRowConstraint(String, String),
    SaveKey(String, Vec<String>),
}

#[derive(Clone, Debug)]
struct StoredBody {
    header: Header,
    rows: BTreeSet<Row>,
}

/// Relation store kept in ordered maps.
///
/// Every write is appended to an operation log, which makes the store a
/// convenient way to observe exactly which writes a database performed.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    relations: BTreeMap<String, StoredBody>,
    row_constraints: StoredRowConstraints,
    keys: BTreeMap<String, Vec<String>>,
    log: Vec<StoreOp>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes performed so far, oldest first.
    pub fn log(&self) -> &[StoreOp] {
        &self.log
    }

    /// Persisted rows of `name`, in ascending order.
    pub fn rows(&self, name: &str) -> Option<Vec<Row>> {
        self.relations
            .get(name)
            .map(|body| body.rows.iter().cloned().collect())
    }

    fn body_mut(&mut self, name: &str) -> Result<&mut StoredBody> {
        self.relations
            .get_mut(name)
            .ok_or_else(|| Error::relation_not_found(name))
    }
}

impl RelationStore for MemoryStore {
    fn load(&self) -> Result<Vec<StoredRelation>> {
        Ok(self
            .relations
            .iter()
            .map(|(name, body)| StoredRelation {
                name: name.clone(),
                header: body.header.clone(),
                rows: body.rows.iter().cloned().collect(),
            })
            .collect())
    }

    fn declare_type(&mut self, name: &str, header: &Header) -> Result<()> {
        if self.relations.contains_key(name) {
            return Err(Error::RelationExists {
                name: name.to_string(),
            });
        }
        self.relations.insert(
            name.to_string(),
            StoredBody {
                header: header.clone(),
                rows: BTreeSet::new(),
            },
        );
        self.log.push(StoreOp::DeclareType(name.to_string()));
        Ok(())
    }

    fn replace_body(&mut self, name: &str, body: &Relation) -> Result<()> {
        let stored = self.body_mut(name)?;
        if body.header() != &stored.header {
            return Err(Error::relation_type_mismatch(
                "replace_body",
                &stored.header,
                body.header(),
            ));
        }
        stored.rows = body.iter().cloned().collect();
        self.log.push(StoreOp::ReplaceBody(name.to_string()));
        Ok(())
    }

    fn insert_row(&mut self, name: &str, row: &Row) -> Result<()> {
        if !self.body_mut(name)?.rows.insert(row.clone()) {
            return Err(Error::store(format!("row {} already stored in {}", row, name)));
        }
        self.log.push(StoreOp::InsertRow(name.to_string(), row.clone()));
        Ok(())
    }

    fn update_row(&mut self, name: &str, key: &Row, changed: &Row) -> Result<()> {
        let stored = self.body_mut(name)?;
        let old = stored
            .rows
            .iter()
            .find(|row| key.iter().all(|(attr, value)| row.value(attr) == Some(value)))
            .cloned()
            .ok_or_else(|| Error::store(format!("no row of {} matches {}", name, key)))?;
        let new = Row::new(
            old.row_type(),
            old.iter().map(|(attr, value)| {
                (attr.to_string(), changed.value(attr).unwrap_or(value).clone())
            }),
        )?;
        stored.rows.remove(&old);
        stored.rows.insert(new);
        self.log.push(StoreOp::UpdateRow(
            name.to_string(),
            key.clone(),
            changed.clone(),
        ));
        Ok(())
    }

    fn delete_row(&mut self, name: &str, row: &Row) -> Result<()> {
        if !self.body_mut(name)?.rows.remove(row) {
            return Err(Error::store(format!("row {} not stored in {}", row, name)));
        }
        self.log.push(StoreOp::DeleteRow(name.to_string(), row.clone()));
        Ok(())
    }

    fn load_row_constraints(&self) -> Result<StoredRowConstraints> {
        Ok(self.row_constraints.clone())
    }

    fn save_row_constraint(&mut self, relation: &str, constraint: &str, text: &str) -> Result<()> {
        self.row_constraints
            .entry(relation.to_string())
            .or_default()
            .insert(constraint.to_string(), text.to_string());
        self.log.push(StoreOp::SaveRowConstraint(
            relation.to_string(),
            constraint.to_string(),
        ));
        Ok(())
    }

    fn delete_row_constraint(&mut self, relation: &str, constraint: &str) -> Result<()> {
        if let Some(constraints) = self.row_constraints.get_mut(relation) {
            constraints.remove(constraint);
            if constraints.is_empty() {
                self.row_constraints.remove(relation);
            }
        }
        self.log.push(StoreOp::DeleteRowConstraint(
            relation.to_string(),
            constraint.to_string(),
        ));
        Ok(())
    }

    fn save_key(&mut self, relation: &str, attributes: &[String]) -> Result<()> {
        self.keys.insert(relation.to_string(), attributes.to_vec());
        self.log
            .push(StoreOp::SaveKey(relation.to_string(), attributes.to_vec()));
        Ok(())
    }

    fn load_keys(&self) -> Result<BTreeMap<String, Vec<String>>> {
        Ok(self.keys.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::JournalEntry;
    use relvar_core::{DataType, RelationType, Value};

    fn part_type() -> RelationType {
        RelationType::new(
            Header::new([("pid", DataType::String), ("qty", DataType::Int64)]).unwrap(),
        )
    }

    fn part(pid: &str, qty: i64) -> Row {
        Row::new(
            part_type().row_type(),
            [("pid", Value::from(pid)), ("qty", Value::Int64(qty))],
        )
        .unwrap()
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.declare_type("parts", part_type().header()).unwrap();
        store
    }

    #[test]
    fn test_declare_and_load() {
        let mut store = store();
        store.insert_row("parts", &part("P1", 10)).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "parts");
        assert_eq!(&loaded[0].header, part_type().header());
        assert_eq!(loaded[0].rows, vec![part("P1", 10)]);

        assert!(matches!(
            store.declare_type("parts", part_type().header()),
            Err(Error::RelationExists { .. })
        ));
    }

    #[test]
    fn test_update_row_by_key() {
        let mut store = store();
        store.insert_row("parts", &part("P1", 10)).unwrap();
        store.insert_row("parts", &part("P2", 5)).unwrap();

        let key = Row::literal([("pid", "P2")]).unwrap();
        let changed = Row::literal([("qty", Value::Int64(7))]).unwrap();
        store.update_row("parts", &key, &changed).unwrap();
        assert_eq!(
            store.rows("parts").unwrap(),
            vec![part("P1", 10), part("P2", 7)]
        );

        let missing = Row::literal([("pid", "P9")]).unwrap();
        assert!(matches!(
            store.update_row("parts", &missing, &changed),
            Err(Error::Store(_))
        ));
    }

    #[test]
    fn test_apply_journal_entries_in_order() {
        let mut store = store();
        let entries = vec![
            JournalEntry::InsertRow {
                relation: "parts".into(),
                row: part("P1", 10),
            },
            JournalEntry::DeleteRow {
                relation: "parts".into(),
                row: part("P1", 10),
            },
        ];
        for entry in &entries {
            store.apply(entry).unwrap();
        }
        assert!(store.rows("parts").unwrap().is_empty());
        assert_eq!(
            store.log()[1..],
            [
                StoreOp::InsertRow("parts".into(), part("P1", 10)),
                StoreOp::DeleteRow("parts".into(), part("P1", 10)),
            ]
        );
    }

    #[test]
    fn test_apply_all_undoes_on_failure() {
        let mut store = store();
        store.insert_row("parts", &part("P2", 5)).unwrap();
        let before = store.rows("parts").unwrap();

        let entries = vec![
            JournalEntry::InsertRow {
                relation: "parts".into(),
                row: part("P3", 7),
            },
            JournalEntry::UpdateRow {
                relation: "parts".into(),
                key: Row::literal([("pid", "P2")]).unwrap(),
                changed: Row::literal([("qty", Value::Int64(6))]).unwrap(),
                old: part("P2", 5),
                new: part("P2", 6),
            },
            JournalEntry::InsertRow {
                relation: "parts".into(),
                row: part("P3", 7),
            },
        ];
        let err = store.apply_all(&entries).unwrap_err();
        assert!(matches!(err, Error::Store(_)));
        assert_eq!(store.rows("parts").unwrap(), before);
        assert_eq!(
            store.log().last(),
            Some(&StoreOp::DeleteRow("parts".into(), part("P3", 7)))
        );

        store.apply_all(&entries[..2]).unwrap();
        assert_eq!(
            store.rows("parts").unwrap(),
            vec![part("P2", 6), part("P3", 7)]
        );
    }

    #[test]
    fn test_replace_body_checks_header() {
        let mut store = store();
        let body = Relation::from_rows(&part_type(), vec![part("P1", 1), part("P2", 2)]).unwrap();
        store.replace_body("parts", &body).unwrap();
        assert_eq!(store.rows("parts").unwrap().len(), 2);

        let other = Relation::literal(vec![Row::literal([("sid", "S1")]).unwrap()]).unwrap();
        assert!(store.replace_body("parts", &other).is_err());
        assert!(store.replace_body("nope", &body).is_err());
    }

    #[test]
    fn test_row_constraints_and_keys() {
        let mut store = store();
        store.save_row_constraint("parts", "positive", "qty > 0").unwrap();
        store.save_key("parts", &["pid".to_string()]).unwrap();
        assert_eq!(
            store.load_row_constraints().unwrap()["parts"]["positive"],
            "qty > 0"
        );
        assert_eq!(store.load_keys().unwrap()["parts"], vec!["pid".to_string()]);

        store.delete_row_constraint("parts", "positive").unwrap();
        assert!(store.load_row_constraints().unwrap().is_empty());
    }
}
