//! Nesting operators: group/ungroup (relation-valued attributes) and
//! wrap/unwrap (row-valued attributes).

use super::Projection;
use hashbrown::HashMap;
use relvar_core::{
    check_name, AttrType, Error, Header, Relation, RelationType, Result, Row, RowType, Value,
};

/// Splits `header` into the attributes named by `projection` and the rest,
/// and builds the header that replaces the named ones with attribute `name`.
struct Nesting {
    /// Positions (in the source header) of the nested attributes.
    inner: Vec<usize>,
    /// Positions (in the source header) of the remaining attributes.
    outer: Vec<usize>,
    /// Position of the new attribute in the result header.
    slot: usize,
    result_type: RelationType,
}

impl Nesting {
    fn plan(header: &Header, name: &str, inner_names: &[String], nested: AttrType) -> Result<Self> {
        check_name(name, false)?;
        let remaining = header.without(inner_names.iter().map(String::as_str))?;
        if remaining.contains(name) {
            return Err(Error::DuplicateAttribute {
                name: name.to_string(),
            });
        }
        let result_header = remaining.extend([(name.to_string(), nested)])?;
        let slot = result_header
            .index_of(name)
            .ok_or_else(|| Error::unknown_attribute(name, &result_header))?;
        Ok(Self {
            inner: header
                .names()
                .enumerate()
                .filter(|(_, n)| inner_names.iter().any(|x| x == n))
                .map(|(i, _)| i)
                .collect(),
            outer: header
                .names()
                .enumerate()
                .filter(|(_, n)| remaining.contains(n))
                .map(|(i, _)| i)
                .collect(),
            slot,
            result_type: RelationType::new(result_header),
        })
    }

    fn pick(row: &Row, positions: &[usize]) -> Vec<Value> {
        let values = row.values();
        positions.iter().map(|&i| values[i].clone()).collect()
    }

    /// Result row from the remaining values plus the nested value.
    fn assemble(&self, mut outer: Vec<Value>, nested: Value) -> Result<Row> {
        outer.insert(self.slot, nested);
        Row::from_ordered(self.result_type.row_type(), outer)
    }
}

/// Replaces the attributes selected by `attrs` with a single relation-valued
/// attribute `name`. Rows agreeing on the remaining attributes collapse into
/// one, whose `name` holds the matching rows' values of the grouped
/// attributes.
///
/// ```rust
/// use relvar_algebra::{group, ungroup};
/// use relvar_core::{Relation, Row, Value};
///
/// let supplies = Relation::literal(vec![
///     Row::literal([("sid", "S1"), ("pid", "P1")]).unwrap(),
///     Row::literal([("sid", "S1"), ("pid", "P2")]).unwrap(),
///     Row::literal([("sid", "S2"), ("pid", "P1")]).unwrap(),
/// ])
/// .unwrap();
/// let grouped = group(&supplies, "parts", ["pid"]).unwrap();
/// assert_eq!(grouped.len(), 2);
/// assert_eq!(ungroup(&grouped, "parts").unwrap(), supplies);
/// ```
pub fn group(relation: &Relation, name: &str, attrs: impl Into<Projection>) -> Result<Relation> {
    let header = relation.header();
    let inner_names = attrs.into().resolve(header)?;
    let inner_type = RelationType::new(header.project(inner_names.iter().map(String::as_str))?);
    let plan = Nesting::plan(
        header,
        name,
        &inner_names,
        AttrType::Relation(inner_type.clone()),
    )?;

    // inner positions follow source header order, which is also the order of
    // the inner header
    let mut groups: HashMap<Vec<Value>, Vec<Row>> = HashMap::new();
    for row in relation.iter() {
        let inner = Row::from_ordered(inner_type.row_type(), Nesting::pick(row, &plan.inner))?;
        groups
            .entry(Nesting::pick(row, &plan.outer))
            .or_default()
            .push(inner);
    }

    let rows = groups
        .into_iter()
        .map(|(outer, inner_rows)| {
            let nested = Relation::build(&inner_type, inner_rows)?;
            plan.assemble(outer, Value::Relation(nested))
        })
        .collect::<Result<Vec<Row>>>()?;
    Relation::build(&plan.result_type, rows)
}

/// Inverse of [`group`]: flattens relation-valued attribute `name`.
///
/// Fails on an empty relation.
pub fn ungroup(relation: &Relation, name: &str) -> Result<Relation> {
    if relation.is_empty() {
        return Err(Error::EmptyRelation { operation: "ungroup" });
    }
    let header = relation.header();
    let inner_type = match header.get(name) {
        Some(AttrType::Relation(ty)) => ty.clone(),
        Some(other) => {
            return Err(Error::invalid_operation(format!(
                "cannot ungroup attribute {:?} of type {}",
                name, other
            )))
        }
        None => return Err(Error::unknown_attribute(name, header)),
    };
    let (result_type, layout) = flatten(header, name, inner_type.header())?;

    let mut rows = Vec::new();
    for row in relation.iter() {
        let nested = row.get(name)?.as_relation().ok_or_else(|| {
            Error::invalid_operation(format!("attribute {:?} is not relation-valued", name))
        })?;
        for inner in nested.iter() {
            rows.push(layout.combine(&result_type, row, inner)?);
        }
    }
    Relation::build(&result_type, rows)
}

/// Replaces the attributes selected by `attrs` with a single row-valued
/// attribute `name`.
pub fn wrap(relation: &Relation, name: &str, attrs: impl Into<Projection>) -> Result<Relation> {
    let header = relation.header();
    let inner_names = attrs.into().resolve(header)?;
    let inner_type = RowType::new(header.project(inner_names.iter().map(String::as_str))?);
    let plan = Nesting::plan(header, name, &inner_names, AttrType::Row(inner_type.clone()))?;

    let rows = relation
        .iter()
        .map(|row| {
            let inner = Row::from_ordered(&inner_type, Nesting::pick(row, &plan.inner))?;
            plan.assemble(Nesting::pick(row, &plan.outer), Value::Row(inner))
        })
        .collect::<Result<Vec<Row>>>()?;
    Relation::build(&plan.result_type, rows)
}

/// Inverse of [`wrap`]: flattens row-valued attribute `name`.
///
/// Fails on an empty relation.
pub fn unwrap(relation: &Relation, name: &str) -> Result<Relation> {
    if relation.is_empty() {
        return Err(Error::EmptyRelation { operation: "unwrap" });
    }
    let header = relation.header();
    let inner_type = match header.get(name) {
        Some(AttrType::Row(ty)) => ty.clone(),
        Some(other) => {
            return Err(Error::invalid_operation(format!(
                "cannot unwrap attribute {:?} of type {}",
                name, other
            )))
        }
        None => return Err(Error::unknown_attribute(name, header)),
    };
    let (result_type, layout) = flatten(header, name, inner_type.header())?;

    let rows = relation
        .iter()
        .map(|row| {
            let inner = row.get(name)?.as_row().ok_or_else(|| {
                Error::invalid_operation(format!("attribute {:?} is not row-valued", name))
            })?;
            layout.combine(&result_type, row, inner)
        })
        .collect::<Result<Vec<Row>>>()?;
    Relation::build(&result_type, rows)
}

enum Source {
    Outer(usize),
    Inner(usize),
}

struct Flattening {
    sources: Vec<Source>,
}

impl Flattening {
    fn combine(&self, ty: &RelationType, outer: &Row, inner: &Row) -> Result<Row> {
        let (o, i) = (outer.values(), inner.values());
        let values = self
            .sources
            .iter()
            .map(|s| match *s {
                Source::Outer(k) => o[k].clone(),
                Source::Inner(k) => i[k].clone(),
            })
            .collect();
        Row::from_ordered(ty.row_type(), values)
    }
}

/// Result type and value layout for replacing attribute `name` of `outer` by
/// the attributes of `inner`.
fn flatten(outer: &Header, name: &str, inner: &Header) -> Result<(RelationType, Flattening)> {
    let remaining = outer.without([name])?;
    if let Some(clash) = inner.names().find(|n| remaining.contains(n)) {
        return Err(Error::DuplicateAttribute {
            name: clash.to_string(),
        });
    }
    let result_header = remaining.merge(inner)?;
    let sources = result_header
        .names()
        .map(|n| match inner.index_of(n) {
            Some(k) => Some(Source::Inner(k)),
            None => outer.index_of(n).map(Source::Outer),
        })
        .collect::<Option<Vec<Source>>>()
        .ok_or_else(|| Error::invalid_operation("flattened attribute has no source"))?;
    Ok((RelationType::new(result_header), Flattening { sources }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use relvar_core::DataType;

    fn supplies() -> Relation {
        Relation::literal(vec![
            Row::literal([("sid", Value::from("S1")), ("pid", "P1".into()), ("qty", Value::Int64(300))])
                .unwrap(),
            Row::literal([("sid", Value::from("S1")), ("pid", "P2".into()), ("qty", Value::Int64(200))])
                .unwrap(),
            Row::literal([("sid", Value::from("S2")), ("pid", "P1".into()), ("qty", Value::Int64(300))])
                .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_group() {
        let grouped = group(&supplies(), "pq", ["pid", "qty"]).unwrap();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.header().names().collect::<Vec<_>>(), vec!["pq", "sid"]);

        let s1 = grouped
            .iter()
            .find(|r| r.get("sid").unwrap() == &Value::from("S1"))
            .unwrap();
        let nested = s1.get("pq").unwrap().as_relation().unwrap();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested.header().names().collect::<Vec<_>>(), vec!["pid", "qty"]);
    }

    #[test]
    fn test_group_then_ungroup_round_trips() {
        let r = supplies();
        let grouped = group(&r, "pq", Projection::all_but(["sid"])).unwrap();
        assert_eq!(ungroup(&grouped, "pq").unwrap(), r);
    }

    #[test]
    fn test_group_empty_relation_keeps_type() {
        let empty = Relation::empty(supplies().relation_type());
        let grouped = group(&empty, "pq", ["pid", "qty"]).unwrap();
        assert!(grouped.is_empty());
        assert!(matches!(grouped.header().get("pq"), Some(AttrType::Relation(_))));
    }

    #[test]
    fn test_group_name_clash() {
        let err = group(&supplies(), "sid", ["pid"]).unwrap_err();
        assert!(matches!(err, Error::DuplicateAttribute { .. }));
        // reusing a grouped attribute's name is fine
        assert!(group(&supplies(), "pid", ["pid", "qty"]).is_ok());
    }

    #[test]
    fn test_ungroup_errors() {
        let empty = group(&Relation::empty(supplies().relation_type()), "pq", ["pid"]).unwrap();
        assert!(matches!(
            ungroup(&empty, "pq"),
            Err(Error::EmptyRelation { operation: "ungroup" })
        ));
        assert!(ungroup(&supplies(), "qty").is_err());
        assert!(ungroup(&supplies(), "weight").is_err());
    }

    #[test]
    fn test_wrap_and_unwrap() {
        let r = supplies();
        let wrapped = wrap(&r, "part", ["pid", "qty"]).unwrap();
        assert_eq!(wrapped.len(), 3);
        assert_eq!(wrapped.header().names().collect::<Vec<_>>(), vec!["part", "sid"]);
        let any = wrapped.iter().next().unwrap();
        let inner = any.get("part").unwrap().as_row().unwrap();
        assert_eq!(inner.header().names().collect::<Vec<_>>(), vec!["pid", "qty"]);
        assert_eq!(
            inner.header().get("qty"),
            Some(&AttrType::Scalar(DataType::Int64))
        );

        assert_eq!(unwrap(&wrapped, "part").unwrap(), r);
    }

    #[test]
    fn test_unwrap_errors() {
        let empty = wrap(&Relation::empty(supplies().relation_type()), "part", ["pid"]).unwrap();
        assert!(matches!(
            unwrap(&empty, "part"),
            Err(Error::EmptyRelation { operation: "unwrap" })
        ));
        assert!(unwrap(&supplies(), "pid").is_err());
    }
}
