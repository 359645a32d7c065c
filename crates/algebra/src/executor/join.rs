//! Natural join.

use super::{key_of, positions, ValueRef};
use hashbrown::HashMap;
use relvar_core::{Error, Header, Relation, RelationType, Result, Row};
use tracing::trace;

/// Where an attribute of the join result is read from.
#[derive(Clone, Copy, Debug)]
enum Side {
    First(usize),
    Second(usize),
}

/// Hash join executor.
///
/// Implements the classic hash join algorithm over the attributes the two
/// operands share:
/// 1. Build phase: index the second relation by its shared-attribute values
/// 2. Probe phase: scan the first relation and probe the index
///
/// With no shared attributes every row of the first relation matches every row
/// of the second, giving the cartesian product.
pub struct HashJoin {
    first: Header,
    second: Header,
    result_type: RelationType,
    first_key: Vec<usize>,
    second_key: Vec<usize>,
    layout: Vec<Side>,
}

impl HashJoin {
    /// Plans a join of relations with headers `first` and `second`.
    ///
    /// Fails if an attribute appears in both headers with different types.
    pub fn new(first: &Header, second: &Header) -> Result<Self> {
        let common = first.common(second)?;
        let combined = first.merge(second)?;
        let layout = combined
            .names()
            .map(|name| {
                first
                    .index_of(name)
                    .map(Side::First)
                    .or_else(|| second.index_of(name).map(Side::Second))
            })
            .collect::<Option<Vec<Side>>>()
            .ok_or_else(|| Error::invalid_operation("join result attribute has no source"))?;

        Ok(Self {
            first: first.clone(),
            second: second.clone(),
            first_key: positions(first, &common),
            second_key: positions(second, &common),
            result_type: RelationType::new(combined),
            layout,
        })
    }

    /// Type of the join result.
    pub fn result_type(&self) -> &RelationType {
        &self.result_type
    }

    /// Executes the hash join.
    pub fn execute(&self, first: &Relation, second: &Relation) -> Result<Relation> {
        if first.header() != &self.first || second.header() != &self.second {
            return Err(Error::relation_type_mismatch(
                "join",
                first.header(),
                second.header(),
            ));
        }

        // Build phase
        let mut index: HashMap<Vec<ValueRef<'_>>, Vec<&Row>> = HashMap::with_capacity(second.len());
        for row in second.iter() {
            index
                .entry(key_of(row, &self.second_key))
                .or_default()
                .push(row);
        }

        trace!(
            first = first.len(),
            second = second.len(),
            keys = index.len(),
            shared = self.first_key.len(),
            "hash join"
        );

        // Probe phase
        let mut rows = Vec::with_capacity(first.len());
        for row in first.iter() {
            if let Some(matches) = index.get(&key_of(row, &self.first_key)) {
                for other in matches {
                    rows.push(self.combine(row, other)?);
                }
            }
        }

        Relation::build(&self.result_type, rows)
    }

    fn combine(&self, first: &Row, second: &Row) -> Result<Row> {
        let (a, b) = (first.values(), second.values());
        let values = self
            .layout
            .iter()
            .map(|side| match *side {
                Side::First(i) => a[i].clone(),
                Side::Second(i) => b[i].clone(),
            })
            .collect();
        Row::from_ordered(self.result_type.row_type(), values)
    }
}

fn join_pair(first: &Relation, second: &Relation) -> Result<Relation> {
    HashJoin::new(first.header(), second.header())?.execute(first, second)
}

/// Natural join of any number of relations, left to right.
///
/// Joining no relations gives `Dee`. An error found while joining in the
/// operand at position `i` (counting from zero) is reported as
/// [`Error::InArgument`] with index `i`.
pub fn join<'a, I>(relations: I) -> Result<Relation>
where
    I: IntoIterator<Item = &'a Relation>,
{
    let mut relations = relations.into_iter();
    let mut joined = match relations.next() {
        Some(first) => first.clone(),
        None => return Ok(Relation::dee()),
    };
    for (i, rel) in relations.enumerate() {
        joined = join_pair(&joined, rel).map_err(|e| e.in_argument(i + 1))?;
    }
    Ok(joined)
}

/// Cartesian product: the join of relations that share no attributes.
pub fn times<'a, I>(relations: I) -> Result<Relation>
where
    I: IntoIterator<Item = &'a Relation>,
{
    let relations: Vec<&Relation> = relations.into_iter().collect();
    for (i, a) in relations.iter().enumerate() {
        for b in &relations[i + 1..] {
            let shared: Vec<String> = a
                .header()
                .names()
                .filter(|name| b.header().contains(name))
                .map(String::from)
                .collect();
            if !shared.is_empty() {
                return Err(Error::SharedAttributes { attributes: shared });
            }
        }
    }
    join(relations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relvar_core::Value;

    fn rel(rows: &[&[(&str, Value)]]) -> Relation {
        Relation::literal(
            rows.iter()
                .map(|r| Row::literal(r.iter().cloned()).unwrap())
                .collect::<Vec<_>>(),
        )
        .unwrap()
    }

    fn parts() -> Relation {
        rel(&[
            &[("pid", "P1".into()), ("qty", Value::Int64(10))],
            &[("pid", "P2".into()), ("qty", Value::Int64(5))],
        ])
    }

    fn supplies() -> Relation {
        rel(&[
            &[("sid", "S1".into()), ("pid", "P1".into())],
            &[("sid", "S2".into()), ("pid", "P1".into())],
            &[("sid", "S2".into()), ("pid", "P3".into())],
        ])
    }

    #[test]
    fn test_join_on_common_attribute() {
        let result = join([&parts(), &supplies()]).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(
            result.header().names().collect::<Vec<_>>(),
            vec!["pid", "qty", "sid"]
        );
        for row in result.iter() {
            assert_eq!(row.get("pid").unwrap(), &Value::from("P1"));
            assert_eq!(row.get("qty").unwrap(), &Value::Int64(10));
        }
    }

    #[test]
    fn test_join_commutes() {
        let a = join([&parts(), &supplies()]).unwrap();
        let b = join([&supplies(), &parts()]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_join_without_common_attributes_is_product() {
        let colors = rel(&[&[("color", "red".into())], &[("color", "blue".into())]]);
        let result = join([&parts(), &colors]).unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result.degree(), 3);
    }

    #[test]
    fn test_join_identities() {
        assert_eq!(join(std::iter::empty()).unwrap(), Relation::dee());
        assert_eq!(join([&parts(), &Relation::dee()]).unwrap(), parts());
        assert_eq!(join([&parts()]).unwrap(), parts());

        let nothing = join([&parts(), &Relation::dum()]).unwrap();
        assert!(nothing.is_empty());
        assert_eq!(nothing.relation_type(), parts().relation_type());
    }

    #[test]
    fn test_join_type_mismatch_names_argument() {
        let bad = rel(&[&[("pid", Value::Int64(1))]]);
        let err = join([&parts(), &supplies(), &bad]).unwrap_err();
        match &err {
            Error::InArgument { index, source } => {
                assert_eq!(*index, 2);
                assert!(
                    matches!(source.as_ref(), Error::AttributeTypeMismatch { attribute, .. } if attribute == "pid")
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_times() {
        let colors = rel(&[&[("color", "red".into())]]);
        assert_eq!(times([&parts(), &colors]).unwrap().len(), 2);
        assert_eq!(times(std::iter::empty()).unwrap(), Relation::dee());

        let err = times([&parts(), &supplies()]).unwrap_err();
        assert!(matches!(err, Error::SharedAttributes { attributes } if attributes == vec!["pid".to_string()]));
    }

    #[test]
    fn test_execute_rejects_unplanned_operands() {
        let plan = HashJoin::new(parts().header(), supplies().header()).unwrap();
        assert!(plan.execute(&supplies(), &parts()).is_err());
    }
}
