//! Property-based tests for the algebraic laws of the operators.
//!
//! These tests check identities that must hold for any input: commutativity
//! of join and the set operators, the partition of a relation by
//! matching/notmatching, and the round trips of rename and group.

use proptest::prelude::*;
use relvar_algebra::{
    group, intersect, join, matching, minus, notmatching, project, rename, ungroup, union,
    Projection,
};
use relvar_core::{DataType, Header, Relation, RelationType, Row, Value};

fn pair_type(first: &str, second: &str) -> RelationType {
    RelationType::new(Header::new([(first, DataType::Int64), (second, DataType::Int64)]).unwrap())
}

fn relation(first: &str, second: &str, pairs: Vec<(i64, i64)>) -> Relation {
    let ty = pair_type(first, second);
    let rows = pairs
        .into_iter()
        .map(|(x, y)| {
            Row::new(
                ty.row_type(),
                [(first, Value::Int64(x)), (second, Value::Int64(y))],
            )
            .unwrap()
        })
        .collect::<Vec<_>>();
    Relation::build(&ty, rows).unwrap()
}

/// Strategy for pairs drawn from a small range, so joins and set
/// operations see plenty of overlap.
fn pairs_strategy(max_rows: usize) -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..8, 0i64..8), 0..max_rows)
}

proptest! {
    /// Property: join is commutative.
    #[test]
    fn join_is_commutative(ab in pairs_strategy(30), bc in pairs_strategy(30)) {
        let r = relation("a", "b", ab);
        let s = relation("b", "c", bc);
        prop_assert_eq!(join([&r, &s]).unwrap(), join([&s, &r]).unwrap());
    }

    /// Property: Dee is the identity of join.
    #[test]
    fn dee_is_join_identity(ab in pairs_strategy(30)) {
        let r = relation("a", "b", ab);
        prop_assert_eq!(join([&r, &Relation::dee()]).unwrap(), r.clone());
        prop_assert!(join([&r, &Relation::dum()]).unwrap().is_empty());
    }

    /// Property: join of a relation with itself is the relation.
    #[test]
    fn join_is_idempotent(ab in pairs_strategy(30)) {
        let r = relation("a", "b", ab);
        prop_assert_eq!(join([&r, &r]).unwrap(), r);
    }

    /// Property: union and intersect are commutative, and intersect agrees
    /// with join on relations of one type.
    #[test]
    fn set_operators_commute(x in pairs_strategy(30), y in pairs_strategy(30)) {
        let r = relation("a", "b", x);
        let s = relation("a", "b", y);
        prop_assert_eq!(union([&r, &s]).unwrap(), union([&s, &r]).unwrap());
        prop_assert_eq!(intersect([&r, &s]).unwrap(), intersect([&s, &r]).unwrap());
        prop_assert_eq!(intersect([&r, &s]).unwrap(), join([&r, &s]).unwrap());
    }

    /// Property: r = (r minus s) union (r intersect s), and the parts are disjoint.
    #[test]
    fn minus_and_intersect_partition(x in pairs_strategy(30), y in pairs_strategy(30)) {
        let r = relation("a", "b", x);
        let s = relation("a", "b", y);
        let only = minus(&r, &s).unwrap();
        let both = intersect([&r, &s]).unwrap();
        prop_assert_eq!(union([&only, &both]).unwrap(), r);
        prop_assert!(intersect([&only, &both]).unwrap().is_empty());
    }

    /// Property: matching and notmatching partition the first operand.
    #[test]
    fn matching_partitions(ab in pairs_strategy(30), bc in pairs_strategy(30)) {
        let r = relation("a", "b", ab);
        let s = relation("b", "c", bc);
        let m = matching(&r, &s).unwrap();
        let n = notmatching(&r, &s).unwrap();
        prop_assert_eq!(m.len() + n.len(), r.len());
        prop_assert_eq!(union([&m, &n]).unwrap(), r.clone());
        prop_assert_eq!(m, project(&join([&r, &s]).unwrap(), ["a", "b"]).unwrap());
    }

    /// Property: projecting twice onto the same attributes is projecting once.
    #[test]
    fn project_is_idempotent(ab in pairs_strategy(30)) {
        let r = relation("a", "b", ab);
        let once = project(&r, ["a"]).unwrap();
        prop_assert_eq!(project(&once, ["a"]).unwrap(), once.clone());
        prop_assert!(once.len() <= r.len());
        prop_assert_eq!(project(&r, Projection::all_but(["b"])).unwrap(), once);
    }

    /// Property: renaming and renaming back gives the original relation.
    #[test]
    fn rename_round_trips(ab in pairs_strategy(30)) {
        let r = relation("a", "b", ab);
        let there = rename(&r, [("a", "x"), ("b", "a")]).unwrap();
        let back = rename(&there, [("a", "b"), ("x", "a")]).unwrap();
        prop_assert_eq!(back, r);
    }

    /// Property: ungroup undoes group on non-empty relations.
    #[test]
    fn group_round_trips(ab in pairs_strategy(30)) {
        prop_assume!(!ab.is_empty());
        let r = relation("a", "b", ab);
        let grouped = group(&r, "bs", ["b"]).unwrap();
        prop_assert_eq!(grouped.len(), project(&r, ["a"]).unwrap().len());
        prop_assert_eq!(ungroup(&grouped, "bs").unwrap(), r);
    }
}
