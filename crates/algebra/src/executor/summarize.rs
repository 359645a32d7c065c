//! Summarization.

use super::extend::extend_with;
use super::{key_of, positions, project, project_away, Computations, Projection, ValueRef};
use hashbrown::HashMap;
use relvar_core::{AttrType, Error, Relation, RelationType, Result, Row, Value};

/// Intermediate attribute holding each group's sub-relation.
const SUMMARY_ATTR: &str = "_summary_";

type SummaryFn<'a> = Box<dyn Fn(&Relation) -> Result<Value> + 'a>;

struct Summary<'a> {
    name: String,
    ty: Option<AttrType>,
    func: SummaryFn<'a>,
}

/// Aggregate attributes for [`summarize`], each computed from the
/// sub-relation of one group.
#[derive(Default)]
pub struct Summaries<'a> {
    items: Vec<Summary<'a>>,
}

impl<'a> Summaries<'a> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Adds aggregate attribute `name`, typed by its first computed value.
    pub fn with<F, V>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Relation) -> Result<V> + 'a,
        V: Into<Value>,
    {
        self.items.push(Summary {
            name: name.into(),
            ty: None,
            func: Box::new(move |rel| func(rel).map(Into::into)),
        });
        self
    }

    /// Adds aggregate attribute `name` with a declared type. Summaries with
    /// declared types are defined when there are no groups.
    pub fn with_typed<F, V>(mut self, name: impl Into<String>, ty: impl Into<AttrType>, func: F) -> Self
    where
        F: Fn(&Relation) -> Result<V> + 'a,
        V: Into<Value>,
    {
        self.items.push(Summary {
            name: name.into(),
            ty: Some(ty.into()),
            func: Box::new(move |rel| func(rel).map(Into::into)),
        });
        self
    }
}

/// Computes aggregates of `relation` for each row of `per`.
///
/// Each row of `per` selects the rows of `relation` agreeing with it on their
/// shared attributes; those rows, less the shared attributes, form the
/// sub-relation the aggregates are computed from. Rows of `per` without
/// matches see an empty sub-relation.
///
/// ```rust
/// use relvar_algebra::{aggregate, summarize_by, Summaries};
/// use relvar_core::{Relation, Row, Value};
///
/// let supplies = Relation::literal(vec![
///     Row::literal([("sid", Value::from("S1")), ("qty", Value::Int64(300))]).unwrap(),
///     Row::literal([("sid", Value::from("S1")), ("qty", Value::Int64(200))]).unwrap(),
///     Row::literal([("sid", Value::from("S2")), ("qty", Value::Int64(400))]).unwrap(),
/// ])
/// .unwrap();
/// let totals = summarize_by(
///     &supplies,
///     ["sid"],
///     Summaries::new().with("total", |sub| {
///         aggregate::sum(aggregate::compute(sub, |r| r.get("qty").cloned()))
///     }),
/// )
/// .unwrap();
/// assert_eq!(totals.len(), 2);
/// ```
pub fn summarize(relation: &Relation, per: &Relation, summaries: Summaries<'_>) -> Result<Relation> {
    let common = per.header().common(relation.header())?;
    let summary_header = relation
        .header()
        .without(common.iter().map(String::as_str))?;
    let summary_type = RelationType::new(summary_header);

    // index the sub-relations by the shared-attribute values
    let relation_key = positions(relation.header(), &common);
    let per_key = positions(per.header(), &common);
    let rest: Vec<usize> = relation
        .header()
        .names()
        .enumerate()
        .filter(|(_, n)| !common.iter().any(|c| c == n))
        .map(|(i, _)| i)
        .collect();
    let mut groups: HashMap<Vec<ValueRef<'_>>, Vec<Row>> = HashMap::new();
    for row in relation.iter() {
        let values = row.values();
        let sub = Row::from_ordered(
            summary_type.row_type(),
            rest.iter().map(|&i| values[i].clone()).collect(),
        )?;
        groups.entry(key_of(row, &relation_key)).or_default().push(sub);
    }

    let with_summary = extend_with(
        per,
        Computations::new().with_typed(
            SUMMARY_ATTR,
            AttrType::Relation(summary_type.clone()),
            |row: &Row| {
                let rows = groups
                    .get(&key_of(row, &per_key))
                    .cloned()
                    .unwrap_or_default();
                Relation::build(&summary_type, rows).map(Value::Relation)
            },
        ),
        true,
    )?;

    let mut computations = Computations::new();
    for summary in summaries.items {
        let func = summary.func;
        let compute = move |row: &Row| -> Result<Value> {
            let sub = row.get(SUMMARY_ATTR)?.as_relation().ok_or_else(|| {
                Error::invalid_operation("summary attribute is not relation-valued")
            })?;
            func(sub)
        };
        computations = match summary.ty {
            Some(ty) => computations.with_typed(summary.name, ty, compute),
            None => computations.with(summary.name, compute),
        };
    }
    let summarized = extend_with(&with_summary, computations, false).map_err(|e| match e {
        Error::EmptyRelation { .. } => Error::EmptyRelation {
            operation: "summarize",
        },
        other => other,
    })?;
    project_away(&summarized, [SUMMARY_ATTR])
}

/// [`summarize`] per distinct combination of the attributes selected by
/// `attrs`.
pub fn summarize_by(
    relation: &Relation,
    attrs: impl Into<Projection>,
    summaries: Summaries<'_>,
) -> Result<Relation> {
    let per = project(relation, attrs)?;
    summarize(relation, &per, summaries)
}
