//! Integration tests for candidate keys and reopening a database.

use relvar_algebra::project;
use relvar_core::{DataType, Error, Header, Relation, Result, Row, Value};
use relvar_database::{
    key_relation_name, ConstraintCompiler, Database, DatabaseOptions, RowPredicate,
};
use relvar_storage::{MemoryStore, Namespace, StoreOp};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn part(pid: &str, qty: i64) -> Row {
    Row::literal([("pid", Value::from(pid)), ("qty", Value::Int64(qty))]).unwrap()
}

fn keyed_parts() -> Database {
    init_tracing();
    let mut db = Database::builder(MemoryStore::new())
        .options(DatabaseOptions::new().verify_keys(true))
        .open()
        .unwrap();
    db.declare(
        "parts",
        Header::new([("pid", DataType::String), ("qty", DataType::Int64)]).unwrap(),
    )
    .unwrap();
    db.set_key("parts", ["pid"]).unwrap();
    db.insert("parts", [part("P1", 10), part("P2", 5)]).unwrap();
    db
}

fn key_relation(db: &Database) -> Relation {
    db.namespace()
        .require(&key_relation_name("parts"))
        .unwrap()
        .clone()
}

fn assert_key_in_step(db: &Database) {
    let expected = project(db.get("parts").unwrap(), ["pid"]).unwrap();
    assert_eq!(key_relation(db), expected);
}

#[test]
fn test_duplicate_key_rejected() {
    let mut db = keyed_parts();
    let err = db.insert("parts", [part("P1", 99)]).unwrap_err();
    match err {
        Error::RowConstraint {
            relation,
            constraint,
            text,
            row,
        } => {
            assert_eq!(relation, "parts");
            assert_eq!(constraint, "_key_parts");
            assert_eq!(text, "unique (pid)");
            assert_eq!(row, part("P1", 99));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(db.get("parts").unwrap().len(), 2);
    assert_key_in_step(&db);
}

#[test]
fn test_key_relation_follows_statements() {
    let mut db = keyed_parts();
    assert_key_in_step(&db);

    db.insert("parts", [part("P3", 1)]).unwrap();
    assert_key_in_step(&db);

    db.delete("parts", |row| Ok(row.get("pid")? == &Value::from("P1")))
        .unwrap();
    assert_key_in_step(&db);

    db.update(
        "parts",
        |row| Ok(row.get("pid")? == &Value::from("P2")),
        |_| Ok([("pid", Value::from("P9"))]),
    )
    .unwrap();
    assert_key_in_step(&db);
    assert_eq!(key_relation(&db).len(), 2);
}

#[test]
fn test_update_onto_existing_key_rejected() {
    let mut db = keyed_parts();
    let err = db
        .update(
            "parts",
            |row| Ok(row.get("pid")? == &Value::from("P1")),
            |_| Ok([("pid", Value::from("P2"))]),
        )
        .unwrap_err();
    assert!(matches!(err, Error::RowConstraint { constraint, .. } if constraint == "_key_parts"));
    assert!(db.get("parts").unwrap().contains(&part("P1", 10)));
}

#[test]
fn test_update_sends_key_to_store() {
    let mut db = keyed_parts();
    db.update(
        "parts",
        |row| Ok(row.get("pid")? == &Value::from("P2")),
        |_| Ok([("qty", Value::Int64(7))]),
    )
    .unwrap();
    assert_eq!(
        db.store().log().last(),
        Some(&StoreOp::UpdateRow(
            "parts".into(),
            Row::literal([("pid", "P2")]).unwrap(),
            Row::literal([("qty", Value::Int64(7))]).unwrap(),
        ))
    );
    assert_eq!(
        db.store().rows("parts").unwrap(),
        vec![part("P1", 10), part("P2", 7)]
    );
}

#[test]
fn test_key_swap_keeps_store_in_step() {
    let mut db = keyed_parts();
    let updated = db
        .update(
            "parts",
            |_| Ok(true),
            |row| {
                let other = if row.get("pid")? == &Value::from("P1") { "P2" } else { "P1" };
                Ok([("pid", Value::from(other))])
            },
        )
        .unwrap();
    assert_eq!(updated, 2);
    assert_key_in_step(&db);

    let swapped = vec![part("P1", 5), part("P2", 10)];
    assert_eq!(db.store().rows("parts").unwrap(), swapped);
    let log = db.store().log();
    assert_eq!(
        log[log.len() - 4..],
        [
            StoreOp::DeleteRow("parts".into(), part("P1", 10)),
            StoreOp::DeleteRow("parts".into(), part("P2", 5)),
            StoreOp::InsertRow("parts".into(), part("P1", 5)),
            StoreOp::InsertRow("parts".into(), part("P2", 10)),
        ]
    );

    let db = Database::open(db.into_store()).unwrap();
    let reopened: Vec<Row> = db.get("parts").unwrap().sorted_rows().into_iter().cloned().collect();
    assert_eq!(reopened, swapped);
    assert_key_in_step(&db);
}

#[test]
fn test_key_chain_reuses_released_key() {
    let mut db = keyed_parts();
    db.update(
        "parts",
        |_| Ok(true),
        |row| {
            let next = if row.get("pid")? == &Value::from("P1") { "P2" } else { "P3" };
            Ok([("pid", Value::from(next))])
        },
    )
    .unwrap();
    assert_eq!(
        db.store().rows("parts").unwrap(),
        vec![part("P2", 10), part("P3", 5)]
    );
    assert_key_in_step(&db);
}

#[test]
fn test_key_rollback_restores_key_relation() {
    let mut db = keyed_parts();
    let before = key_relation(&db);
    db.begin();
    db.insert("parts", [part("P3", 1)]).unwrap();
    assert_eq!(key_relation(&db).len(), 3);
    db.rollback().unwrap();
    assert_eq!(key_relation(&db), before);
}

#[test]
fn test_set_key_on_duplicated_data() {
    init_tracing();
    let mut db = Database::in_memory();
    let initial = Relation::literal(vec![part("P1", 10), part("P1", 20)]).unwrap();
    db.create("parts", initial).unwrap();
    assert!(matches!(
        db.set_key("parts", ["pid"]),
        Err(Error::RowConstraint { .. })
    ));
    assert_eq!(db.key("parts").unwrap(), None);
    assert!(matches!(
        db.set_key("parts", ["weight"]),
        Err(Error::UnknownAttribute { .. })
    ));

    db.set_key("parts", ["pid", "qty"]).unwrap();
    assert_eq!(
        db.key("parts").unwrap(),
        Some(&["pid".to_string(), "qty".to_string()][..])
    );
}

#[test]
fn test_key_constraints_cannot_be_removed() {
    let mut db = keyed_parts();
    assert!(db.remove_row_constraint("parts", "_key_parts").is_err());
    assert!(db.remove_constraint("_key_parts").is_err());
}

struct QtyCompiler;

impl ConstraintCompiler for QtyCompiler {
    fn compile(&self, _relation: &str, _constraint: &str, text: &str) -> Option<RowPredicate> {
        match text {
            "qty > 0" => Some(Arc::new(|row: &Row, _: &Namespace| -> Result<bool> {
                Ok(row.get("qty")? > &Value::Int64(0))
            })),
            _ => None,
        }
    }
}

#[test]
fn test_reopen_restores_keys_and_constraints() {
    let mut db = keyed_parts();
    db.constrain_rows("parts", "positive", "qty > 0", |row, _| {
        Ok(row.get("qty")? > &Value::Int64(0))
    })
    .unwrap();
    let store = db.into_store();

    let mut db = Database::builder(store).compiler(QtyCompiler).open().unwrap();
    assert_eq!(db.names(), vec!["parts".to_string()]);
    assert_eq!(db.get("parts").unwrap().len(), 2);
    assert_eq!(db.key("parts").unwrap(), Some(&["pid".to_string()][..]));
    assert_key_in_step(&db);

    assert!(matches!(
        db.insert("parts", [part("P1", 1)]),
        Err(Error::RowConstraint { constraint, .. }) if constraint == "_key_parts"
    ));
    assert!(matches!(
        db.insert("parts", [part("P3", -1)]),
        Err(Error::RowConstraint { constraint, .. }) if constraint == "positive"
    ));
    db.insert("parts", [part("P3", 1)]).unwrap();
    assert_key_in_step(&db);
}

#[test]
fn test_reopen_without_compiler() {
    let mut db = keyed_parts();
    db.constrain_rows("parts", "positive", "qty > 0", |row, _| {
        Ok(row.get("qty")? > &Value::Int64(0))
    })
    .unwrap();
    let store = db.into_store();

    let err = Database::open(store).err().unwrap();
    assert!(matches!(
        err,
        Error::UncompiledConstraint { constraint, .. } if constraint == "positive"
    ));
}
