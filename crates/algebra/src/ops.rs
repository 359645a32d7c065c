//! Method-call forms of the operators.
//!
//! `RelationOps` lets operators chain (`parts.join(&supplies)?.project(["pid"])?`).
//! `RowOps` gives rows the same vocabulary; each row method wraps the row in
//! a one-row relation, applies the relational operator and extracts the single
//! resulting row, so row semantics are exactly relation semantics.

use crate::aggregate::{self, Compute};
use crate::executor::{self, Computations, Projection, Summaries};
use relvar_core::{Relation, Result, Row, Value};

/// Operators as methods on [`Relation`].
pub trait RelationOps {
    fn join(&self, other: &Relation) -> Result<Relation>;
    fn times(&self, other: &Relation) -> Result<Relation>;
    fn project(&self, projection: impl Into<Projection>) -> Result<Relation>;
    fn project_away<I, S>(&self, names: I) -> Result<Relation>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;
    fn union(&self, other: &Relation) -> Result<Relation>;
    fn intersect(&self, other: &Relation) -> Result<Relation>;
    fn minus(&self, other: &Relation) -> Result<Relation>;
    fn matching(&self, other: &Relation) -> Result<Relation>;
    fn notmatching(&self, other: &Relation) -> Result<Relation>;
    fn compose(&self, other: &Relation) -> Result<Relation>;
    fn rename<I, O, N>(&self, renames: I) -> Result<Relation>
    where
        I: IntoIterator<Item = (O, N)>,
        O: AsRef<str>,
        N: Into<String>;
    fn restrict<F>(&self, predicate: F) -> Result<Relation>
    where
        F: Fn(&Row) -> Result<bool>;
    fn extend(&self, computations: Computations<'_>) -> Result<Relation>;
    fn group(&self, name: &str, attrs: impl Into<Projection>) -> Result<Relation>;
    fn ungroup(&self, name: &str) -> Result<Relation>;
    fn wrap(&self, name: &str, attrs: impl Into<Projection>) -> Result<Relation>;
    fn unwrap(&self, name: &str) -> Result<Relation>;
    fn summarize(&self, per: &Relation, summaries: Summaries<'_>) -> Result<Relation>;
    fn compute<F>(&self, func: F) -> Compute<'_, F>
    where
        F: Fn(&Row) -> Result<Value>;
}

impl RelationOps for Relation {
    fn join(&self, other: &Relation) -> Result<Relation> {
        executor::join([self, other])
    }

    fn times(&self, other: &Relation) -> Result<Relation> {
        executor::times([self, other])
    }

    fn project(&self, projection: impl Into<Projection>) -> Result<Relation> {
        executor::project(self, projection)
    }

    fn project_away<I, S>(&self, names: I) -> Result<Relation>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        executor::project_away(self, names)
    }

    fn union(&self, other: &Relation) -> Result<Relation> {
        executor::union([self, other])
    }

    fn intersect(&self, other: &Relation) -> Result<Relation> {
        executor::intersect([self, other])
    }

    fn minus(&self, other: &Relation) -> Result<Relation> {
        executor::minus(self, other)
    }

    fn matching(&self, other: &Relation) -> Result<Relation> {
        executor::matching(self, other)
    }

    fn notmatching(&self, other: &Relation) -> Result<Relation> {
        executor::notmatching(self, other)
    }

    fn compose(&self, other: &Relation) -> Result<Relation> {
        executor::compose(self, other)
    }

    fn rename<I, O, N>(&self, renames: I) -> Result<Relation>
    where
        I: IntoIterator<Item = (O, N)>,
        O: AsRef<str>,
        N: Into<String>,
    {
        executor::rename(self, renames)
    }

    fn restrict<F>(&self, predicate: F) -> Result<Relation>
    where
        F: Fn(&Row) -> Result<bool>,
    {
        executor::restrict(self, predicate)
    }

    fn extend(&self, computations: Computations<'_>) -> Result<Relation> {
        executor::extend(self, computations)
    }

    fn group(&self, name: &str, attrs: impl Into<Projection>) -> Result<Relation> {
        executor::group(self, name, attrs)
    }

    fn ungroup(&self, name: &str) -> Result<Relation> {
        executor::ungroup(self, name)
    }

    fn wrap(&self, name: &str, attrs: impl Into<Projection>) -> Result<Relation> {
        executor::wrap(self, name, attrs)
    }

    fn unwrap(&self, name: &str) -> Result<Relation> {
        executor::unwrap(self, name)
    }

    fn summarize(&self, per: &Relation, summaries: Summaries<'_>) -> Result<Relation> {
        executor::summarize(self, per, summaries)
    }

    fn compute<F>(&self, func: F) -> Compute<'_, F>
    where
        F: Fn(&Row) -> Result<Value>,
    {
        aggregate::compute(self, func)
    }
}

/// Operators as methods on [`Row`].
pub trait RowOps {
    /// Joins two rows; fails unless they agree on their shared attributes.
    fn join(&self, other: &Row) -> Result<Row>;
    fn compose(&self, other: &Row) -> Result<Row>;
    fn project(&self, projection: impl Into<Projection>) -> Result<Row>;
    fn project_away<I, S>(&self, names: I) -> Result<Row>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>;
    fn rename<I, O, N>(&self, renames: I) -> Result<Row>
    where
        I: IntoIterator<Item = (O, N)>,
        O: AsRef<str>,
        N: Into<String>;
    fn extend(&self, computations: Computations<'_>) -> Result<Row>;
}

fn singleton(row: &Row) -> Result<Relation> {
    Relation::from_rows(&row.row_type().relation_type(), [row.clone()])
}

impl RowOps for Row {
    fn join(&self, other: &Row) -> Result<Row> {
        executor::join([&singleton(self)?, &singleton(other)?])?.only_row()
    }

    fn compose(&self, other: &Row) -> Result<Row> {
        executor::compose(&singleton(self)?, &singleton(other)?)?.only_row()
    }

    fn project(&self, projection: impl Into<Projection>) -> Result<Row> {
        executor::project(&singleton(self)?, projection)?.only_row()
    }

    fn project_away<I, S>(&self, names: I) -> Result<Row>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        executor::project_away(&singleton(self)?, names)?.only_row()
    }

    fn rename<I, O, N>(&self, renames: I) -> Result<Row>
    where
        I: IntoIterator<Item = (O, N)>,
        O: AsRef<str>,
        N: Into<String>,
    {
        executor::rename(&singleton(self)?, renames)?.only_row()
    }

    fn extend(&self, computations: Computations<'_>) -> Result<Row> {
        executor::extend(&singleton(self)?, computations)?.only_row()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relvar_core::Error;

    fn parts() -> Relation {
        Relation::literal(vec![
            Row::literal([("pid", Value::from("P1")), ("qty", Value::Int64(10))]).unwrap(),
            Row::literal([("pid", Value::from("P2")), ("qty", Value::Int64(5))]).unwrap(),
        ])
        .unwrap()
    }

    fn supplies() -> Relation {
        Relation::literal(vec![
            Row::literal([("sid", "S1"), ("pid", "P1")]).unwrap(),
            Row::literal([("sid", "S2"), ("pid", "P2")]).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_relation_method_chain() {
        let result = parts()
            .join(&supplies())
            .unwrap()
            .restrict(|r| Ok(r.get("qty")? > &Value::Int64(5)))
            .unwrap()
            .project(["sid"])
            .unwrap();
        assert_eq!(
            result,
            Relation::literal(vec![Row::literal([("sid", "S1")]).unwrap()]).unwrap()
        );
    }

    #[test]
    fn test_relation_methods_match_functions() {
        let p = parts();
        assert_eq!(p.union(&p).unwrap(), p);
        assert_eq!(p.intersect(&p).unwrap(), p);
        assert!(p.minus(&p).unwrap().is_empty());
        assert_eq!(p.matching(&supplies()).unwrap(), p);
        assert!(p.notmatching(&supplies()).unwrap().is_empty());
        assert_eq!(p.compose(&supplies()).unwrap().degree(), 2);
        assert_eq!(p.project_away(["qty"]).unwrap().degree(), 1);
        assert_eq!(p.rename([("pid", "part")]).unwrap().len(), 2);
        assert_eq!(
            p.group("all", ["pid", "qty"]).unwrap().ungroup("all").unwrap(),
            p
        );
        assert_eq!(p.wrap("w", ["qty"]).unwrap().unwrap("w").unwrap(), p);
        assert_eq!(p.compute(|r| r.get("qty").cloned()).count(), 2);
    }

    #[test]
    fn test_row_methods() {
        let p1 = Row::literal([("pid", Value::from("P1")), ("qty", Value::Int64(10))]).unwrap();
        let s1 = Row::literal([("sid", "S1"), ("pid", "P1")]).unwrap();

        let joined = p1.join(&s1).unwrap();
        assert_eq!(joined.degree(), 3);
        assert_eq!(joined.get("sid").unwrap(), &Value::from("S1"));

        let composed = p1.compose(&s1).unwrap();
        assert_eq!(composed.header().names().collect::<Vec<_>>(), vec!["qty", "sid"]);

        let projected = p1.project(["qty"]).unwrap();
        assert_eq!(projected, Row::literal([("qty", Value::Int64(10))]).unwrap());
        assert_eq!(p1.project_away(["pid"]).unwrap(), projected);

        let renamed = p1.rename([("qty", "amount")]).unwrap();
        assert_eq!(renamed.get("amount").unwrap(), &Value::Int64(10));

        let extended = p1
            .extend(Computations::new().with("big", |r| Ok(r.get("qty")? > &Value::Int64(5))))
            .unwrap();
        assert_eq!(extended.get("big").unwrap(), &Value::Boolean(true));
    }

    #[test]
    fn test_row_join_without_match_fails() {
        let p2 = Row::literal([("pid", Value::from("P2")), ("qty", Value::Int64(5))]).unwrap();
        let s1 = Row::literal([("sid", "S1"), ("pid", "P1")]).unwrap();
        assert!(matches!(p2.join(&s1), Err(Error::NotSingleton { len: 0 })));
    }
}
