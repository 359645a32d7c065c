//! Property-based tests for headers, rows and relation bodies.

use proptest::prelude::*;
use relvar_core::{DataType, Error, Header, Relation, RelationType, Row, Value};
use std::collections::BTreeSet;

fn pair_type() -> RelationType {
    RelationType::new(Header::new([("a", DataType::Int64), ("b", DataType::Int64)]).unwrap())
}

fn rows(ty: &RelationType, pairs: &[(i64, i64)]) -> Vec<Row> {
    pairs
        .iter()
        .map(|&(a, b)| Row::new(ty.row_type(), [("a", Value::Int64(a)), ("b", Value::Int64(b))]).unwrap())
        .collect()
}

proptest! {
    /// Property: a relation body is a set; building ignores order and
    /// repetition.
    #[test]
    fn build_is_a_set(pairs in prop::collection::vec((0i64..6, 0i64..6), 0..40)) {
        let ty = pair_type();
        let forward = Relation::build(&ty, rows(&ty, &pairs)).unwrap();
        let mut reversed_pairs = pairs.clone();
        reversed_pairs.reverse();
        let reversed = Relation::build(&ty, rows(&ty, &reversed_pairs)).unwrap();

        let distinct: BTreeSet<(i64, i64)> = pairs.iter().cloned().collect();
        prop_assert_eq!(forward.len(), distinct.len());
        prop_assert_eq!(&forward, &reversed);
    }

    /// Property: strict construction reports the first repeated row.
    #[test]
    fn from_rows_rejects_first_repeat(pairs in prop::collection::vec((0i64..4, 0i64..4), 0..20)) {
        let ty = pair_type();
        let mut seen = BTreeSet::new();
        let first_repeat = pairs.iter().position(|pair| !seen.insert(*pair));

        match (Relation::from_rows(&ty, rows(&ty, &pairs)), first_repeat) {
            (Ok(relation), None) => prop_assert_eq!(relation.len(), pairs.len()),
            (Err(Error::DuplicateRow { position, .. }), Some(expected)) => {
                prop_assert_eq!(position, expected)
            }
            (other, expected) => prop_assert!(false, "{:?} with repeat at {:?}", other.map(|r| r.len()), expected),
        }
    }

    /// Property: sorted_rows lists every row once, in ascending order.
    #[test]
    fn sorted_rows_are_ascending(pairs in prop::collection::vec((-5i64..5, -5i64..5), 0..30)) {
        let ty = pair_type();
        let relation = Relation::build(&ty, rows(&ty, &pairs)).unwrap();
        let sorted = relation.sorted_rows();
        prop_assert_eq!(sorted.len(), relation.len());
        prop_assert!(sorted.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(sorted.iter().all(|row| relation.contains(row)));
    }

    /// Property: headers do not depend on the order attributes are given in.
    #[test]
    fn header_ignores_attribute_order(names in prop::collection::btree_set("[a-z]{1,6}", 1..6)) {
        let names: Vec<String> = names.into_iter().collect();
        let forward = Header::new(names.iter().map(|n| (n.clone(), DataType::Int64))).unwrap();
        let backward = Header::new(names.iter().rev().map(|n| (n.clone(), DataType::Int64))).unwrap();
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(RelationType::new(forward), RelationType::new(backward));
    }
}
