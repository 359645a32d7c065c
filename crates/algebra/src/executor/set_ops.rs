//! Set operators: union, intersection, difference and the match family.

use super::{join, key_of, positions, project, Projection, ValueRef};
use hashbrown::HashSet;
use relvar_core::{Error, Header, Relation, Result};

/// Union of relations of one type. The union of nothing is `Dum`.
pub fn union<'a, I>(relations: I) -> Result<Relation>
where
    I: IntoIterator<Item = &'a Relation>,
{
    let mut relations = relations.into_iter();
    let first = match relations.next() {
        Some(first) => first,
        None => return Ok(Relation::dum()),
    };
    let mut rows: Vec<_> = first.iter().cloned().collect();
    for rel in relations {
        first.require_same_type(rel, "union")?;
        rows.extend(rel.iter().cloned());
    }
    Relation::build(first.relation_type(), rows)
}

/// Intersection of relations of one type. The intersection of nothing is
/// `Dee`.
pub fn intersect<'a, I>(relations: I) -> Result<Relation>
where
    I: IntoIterator<Item = &'a Relation>,
{
    let mut relations = relations.into_iter();
    let first = match relations.next() {
        Some(first) => first,
        None => return Ok(Relation::dee()),
    };
    let rest: Vec<&Relation> = relations.collect();
    for rel in &rest {
        first.require_same_type(rel, "intersect")?;
    }
    let rows = first
        .iter()
        .filter(|row| rest.iter().all(|rel| rel.contains(row)))
        .cloned();
    Relation::build(first.relation_type(), rows)
}

/// Semi-join executor: selects the rows of a first relation by whether a
/// second relation has a row agreeing on every shared attribute.
///
/// With no shared attributes the outcome depends only on whether the second
/// relation is empty: `matching` keeps everything when it is not, and
/// `notmatching` keeps everything when it is.
pub struct Matcher {
    first_key: Vec<usize>,
    second_key: Vec<usize>,
    keep_matches: bool,
}

impl Matcher {
    /// Plans a match of relations with headers `first` and `second`.
    pub fn new(first: &Header, second: &Header, keep_matches: bool) -> Result<Self> {
        let common = first.common(second)?;
        Ok(Self {
            first_key: positions(first, &common),
            second_key: positions(second, &common),
            keep_matches,
        })
    }

    /// Executes the match. The result has the type of `first`.
    pub fn execute(&self, first: &Relation, second: &Relation) -> Result<Relation> {
        if self.first_key.is_empty() {
            // exclusive or against the truth value of `second`
            return if second.is_empty() != self.keep_matches {
                Ok(first.clone())
            } else {
                Ok(Relation::empty(first.relation_type()))
            };
        }
        let index: HashSet<Vec<ValueRef<'_>>> = second
            .iter()
            .map(|row| key_of(row, &self.second_key))
            .collect();
        let rows = first
            .iter()
            .filter(|row| index.contains(&key_of(row, &self.first_key)) == self.keep_matches)
            .cloned();
        Relation::build(first.relation_type(), rows)
    }
}

/// Rows of `first` that agree with some row of `second` on their shared
/// attributes (semijoin).
pub fn matching(first: &Relation, second: &Relation) -> Result<Relation> {
    Matcher::new(first.header(), second.header(), true)?.execute(first, second)
}

/// Rows of `first` that agree with no row of `second` on their shared
/// attributes (semidifference).
pub fn notmatching(first: &Relation, second: &Relation) -> Result<Relation> {
    Matcher::new(first.header(), second.header(), false)?.execute(first, second)
}

/// Difference of two relations of one type.
pub fn minus(first: &Relation, second: &Relation) -> Result<Relation> {
    first.require_same_type(second, "minus")?;
    notmatching(first, second)
}

/// Join of the two relations with their shared attributes projected away.
pub fn compose(first: &Relation, second: &Relation) -> Result<Relation> {
    let common = first.header().common(second.header())?;
    project(&join([first, second])?, Projection::AllBut(common))
}
