//! Extension: adding computed attributes.

use relvar_core::{
    check_name, AttrType, Error, Header, Relation, RelationType, Result, Row, Value,
};

type ComputeFn<'a> = Box<dyn Fn(&Row) -> Result<Value> + 'a>;

pub(crate) struct Computation<'a> {
    name: String,
    ty: Option<AttrType>,
    func: ComputeFn<'a>,
}

/// New attributes for [`extend`], each computed from a row.
///
/// ```rust
/// use relvar_algebra::{extend, Computations};
/// use relvar_core::{Relation, Row, Value};
///
/// let parts = Relation::literal(vec![
///     Row::literal([("pid", Value::from("P1")), ("qty", Value::Int64(10))]).unwrap(),
/// ])
/// .unwrap();
/// let doubled = extend(
///     &parts,
///     Computations::new().with("double", |r| Ok(r.get("qty")?.as_i64().unwrap_or(0) * 2)),
/// )
/// .unwrap();
/// assert_eq!(doubled.only_row().unwrap().get("double").unwrap(), &Value::Int64(20));
/// ```
#[derive(Default)]
pub struct Computations<'a> {
    items: Vec<Computation<'a>>,
}

impl<'a> Computations<'a> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Adds attribute `name`. Its type is taken from the value computed for
    /// one row of the relation, so the relation must not be empty.
    pub fn with<F, V>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Row) -> Result<V> + 'a,
        V: Into<Value>,
    {
        self.items.push(Computation {
            name: name.into(),
            ty: None,
            func: Box::new(move |row| func(row).map(Into::into)),
        });
        self
    }

    /// Adds attribute `name` with a declared type.
    pub fn with_typed<F, V>(mut self, name: impl Into<String>, ty: impl Into<AttrType>, func: F) -> Self
    where
        F: Fn(&Row) -> Result<V> + 'a,
        V: Into<Value>,
    {
        self.items.push(Computation {
            name: name.into(),
            ty: Some(ty.into()),
            func: Box::new(move |row| func(row).map(Into::into)),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Declares types for the computations named in `prototype`.
    fn typed_from(mut self, prototype: &Header) -> Self {
        for item in &mut self.items {
            if let Some(ty) = prototype.get(&item.name) {
                item.ty = Some(ty.clone());
            }
        }
        self
    }
}

/// Adds the computed attributes to every row of `relation`.
///
/// New names must be valid and distinct from the existing attributes. An
/// attribute without a declared type takes the type of its value on the
/// smallest row; extending an empty relation with such an attribute fails.
pub fn extend(relation: &Relation, computations: Computations<'_>) -> Result<Relation> {
    extend_with(relation, computations, false)
}

/// Like [`extend`], with the types of the new attributes declared by
/// `prototype` (any header naming them, typically that of an example
/// relation). Defined on empty relations.
pub fn extend_typed(
    relation: &Relation,
    prototype: &Header,
    computations: Computations<'_>,
) -> Result<Relation> {
    extend_with(relation, computations.typed_from(prototype), false)
}

pub(crate) fn extend_with(
    relation: &Relation,
    computations: Computations<'_>,
    allow_reserved: bool,
) -> Result<Relation> {
    let header = relation.header();
    let items = computations.items;
    for (i, item) in items.iter().enumerate() {
        check_name(&item.name, allow_reserved)?;
        if header.contains(&item.name) || items[..i].iter().any(|x| x.name == item.name) {
            return Err(Error::DuplicateAttribute {
                name: item.name.clone(),
            });
        }
    }

    let mut types = Vec::with_capacity(items.len());
    for item in &items {
        let ty = match &item.ty {
            Some(ty) => ty.clone(),
            None => {
                let sample = relation
                    .iter()
                    .min()
                    .ok_or(Error::EmptyRelation { operation: "extend" })?;
                (item.func)(sample)?.attr_type()
            }
        };
        types.push(ty);
    }

    let result_header = header.extend(
        items
            .iter()
            .zip(&types)
            .map(|(item, ty)| (item.name.clone(), ty.clone())),
    )?;
    let old_slots: Vec<usize> = header
        .names()
        .filter_map(|n| result_header.index_of(n))
        .collect();
    let new_slots: Vec<usize> = items
        .iter()
        .filter_map(|item| result_header.index_of(&item.name))
        .collect();
    let result_type = RelationType::new(result_header);
    let row_type = result_type.row_type();

    let mut rows = Vec::with_capacity(relation.len());
    for row in relation.iter() {
        let mut slots: Vec<Option<Value>> = (0..row_type.degree()).map(|_| None).collect();
        for (&slot, value) in old_slots.iter().zip(row.values()) {
            slots[slot] = Some(value.clone());
        }
        for ((item, ty), &slot) in items.iter().zip(&types).zip(&new_slots) {
            let value = (item.func)(row)?;
            let value = ty.coerce(&value).map_err(|source| Error::InvalidValue {
                attribute: item.name.clone(),
                value: format!("{:?}", value),
                source,
            })?;
            slots[slot] = Some(value);
        }
        rows.push(Row::from_ordered(row_type, slots.into_iter().flatten().collect())?);
    }
    Relation::build(&result_type, rows)
}
