//! Relation values.
//!
//! A `Relation` is an immutable, duplicate-free set of rows of one row type.
//! The body is shared behind an `Arc`, so cloning a relation (for instance to
//! store it as an attribute value or bind it in a namespace) is cheap and the
//! shared body can never change underneath a holder.

use crate::error::{Error, Result};
use crate::header::Header;
use crate::registry::{RelationType, RowType};
use crate::row::Row;
use crate::value::Value;
use hashbrown::HashSet;
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A set of rows of one row type.
#[derive(Clone)]
pub struct Relation {
    ty: RelationType,
    body: Arc<HashSet<Row>>,
}

impl Relation {
    /// The empty relation of type `ty`.
    pub fn empty(ty: &RelationType) -> Self {
        Self {
            ty: ty.clone(),
            body: Arc::new(HashSet::new()),
        }
    }

    /// The relation of no attributes and no rows ("false").
    pub fn dum() -> Self {
        Self::empty(&RelationType::empty())
    }

    /// The relation of no attributes and one row ("true").
    pub fn dee() -> Self {
        let mut body = HashSet::with_capacity(1);
        body.insert(Row::empty());
        Self {
            ty: RelationType::empty(),
            body: Arc::new(body),
        }
    }

    /// Copies a relation asserted to have type `ty`.
    pub fn cast(ty: &RelationType, other: &Relation) -> Result<Self> {
        if &other.ty != ty {
            return Err(Error::relation_type_mismatch(
                "cast",
                ty.header(),
                other.header(),
            ));
        }
        Ok(other.clone())
    }

    /// Builds a relation from a list of attribute names and value tuples
    /// given in the same order.
    ///
    /// ```rust
    /// use relvar_core::{DataType, Header, Relation, RelationType, Value};
    ///
    /// let ty = RelationType::new(
    ///     Header::new([("pid", DataType::String), ("qty", DataType::Int64)]).unwrap(),
    /// );
    /// let parts = Relation::from_tuples(
    ///     &ty,
    ///     &["pid", "qty"],
    ///     vec![
    ///         vec![Value::from("P1"), Value::Int64(10)],
    ///         vec![Value::from("P2"), Value::Int64(5)],
    ///     ],
    /// )
    /// .unwrap();
    /// assert_eq!(parts.len(), 2);
    /// ```
    pub fn from_tuples<N, T, V>(ty: &RelationType, names: &[N], tuples: T) -> Result<Self>
    where
        N: AsRef<str>,
        T: IntoIterator,
        T::Item: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let header = ty.header();
        if names.len() != header.degree() {
            return Err(Error::DegreeMismatch {
                expected: header.degree(),
                got: names.len(),
            });
        }
        let mut seen: Vec<&str> = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            if !header.contains(name) {
                return Err(Error::unknown_attribute(name, header));
            }
            if seen.contains(&name) {
                return Err(Error::DuplicateAttribute {
                    name: name.to_string(),
                });
            }
            seen.push(name);
        }

        let rows = tuples.into_iter().enumerate().map(|(position, tuple)| {
            let values: Vec<Value> = tuple.into_iter().map(Into::into).collect();
            if values.len() != names.len() {
                return Err(Error::DegreeMismatch {
                    expected: names.len(),
                    got: values.len(),
                }
                .in_row(position));
            }
            Row::new(ty.row_type(), seen.iter().copied().zip(values))
                .map_err(|e| e.in_row(position))
        });
        Self::insert_strict(ty, rows)
    }

    /// Builds a relation from rows, each of which must already have the
    /// relation's row type.
    pub fn from_rows<I>(ty: &RelationType, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Row>,
    {
        let row_type = ty.row_type();
        let rows = rows.into_iter().enumerate().map(|(position, row)| {
            Row::cast(row_type, &row).map_err(|e| e.in_row(position))
        });
        Self::insert_strict(ty, rows)
    }

    /// Builds a relation from name/value maps, coercing each to the row type.
    pub fn from_maps<I, M, N, V>(ty: &RelationType, maps: I) -> Result<Self>
    where
        I: IntoIterator<Item = M>,
        M: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<Value>,
    {
        let row_type = ty.row_type();
        let rows = maps.into_iter().enumerate().map(|(position, map)| {
            Row::new(row_type, map).map_err(|e| e.in_row(position))
        });
        Self::insert_strict(ty, rows)
    }

    /// Builds a relation whose type is taken from its first row. An empty
    /// literal is `Dum`.
    pub fn literal<I>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Row>,
    {
        let mut rows = rows.into_iter().peekable();
        let ty = match rows.peek() {
            Some(first) => first.row_type().relation_type(),
            None => return Ok(Self::dum()),
        };
        Self::from_rows(&ty, rows)
    }

    /// Builds a relation from operator output. Rows must have the relation's
    /// row type; rows that compare equal are kept once.
    pub fn build<I>(ty: &RelationType, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Row>,
    {
        let row_type = ty.row_type();
        let mut body = HashSet::new();
        for row in rows {
            if row.row_type() != row_type {
                return Err(Error::RowTypeMismatch {
                    expected: row_type.header().to_string(),
                    got: row.header().to_string(),
                });
            }
            body.insert(row);
        }
        Ok(Self {
            ty: ty.clone(),
            body: Arc::new(body),
        })
    }

    fn insert_strict<I>(ty: &RelationType, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Row>>,
    {
        let mut body = HashSet::new();
        for (position, row) in rows.into_iter().enumerate() {
            let row = row?;
            if body.contains(&row) {
                return Err(Error::DuplicateRow { row, position });
            }
            body.insert(row);
        }
        Ok(Self {
            ty: ty.clone(),
            body: Arc::new(body),
        })
    }

    #[inline]
    pub fn relation_type(&self) -> &RelationType {
        &self.ty
    }

    #[inline]
    pub fn row_type(&self) -> &RowType {
        self.ty.row_type()
    }

    #[inline]
    pub fn header(&self) -> &Header {
        self.ty.header()
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.ty.degree()
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Iterates the rows in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Row> + '_ {
        self.body.iter()
    }

    pub fn contains(&self, row: &Row) -> bool {
        self.body.contains(row)
    }

    /// Rows in ascending order.
    pub fn sorted_rows(&self) -> Vec<&Row> {
        let mut rows: Vec<&Row> = self.body.iter().collect();
        rows.sort();
        rows
    }

    /// The single row of a one-row relation.
    pub fn only_row(&self) -> Result<Row> {
        if self.body.len() != 1 {
            return Err(Error::NotSingleton {
                len: self.body.len(),
            });
        }
        self.body
            .iter()
            .next()
            .cloned()
            .ok_or(Error::NotSingleton { len: 0 })
    }

    /// Fails unless `self` and `other` have the same type.
    pub fn require_same_type(&self, other: &Relation, operation: &'static str) -> Result<()> {
        if self.ty != other.ty {
            return Err(Error::relation_type_mismatch(
                operation,
                self.header(),
                other.header(),
            ));
        }
        Ok(())
    }

    /// Whether every row of `self` is also a row of `other`.
    pub fn is_subset_of(&self, other: &Relation) -> Result<bool> {
        self.require_same_type(other, "is_subset_of")?;
        Ok(self.len() <= other.len() && self.body.iter().all(|row| other.contains(row)))
    }

    /// Subset with at least one row of `other` missing from `self`.
    pub fn is_proper_subset_of(&self, other: &Relation) -> Result<bool> {
        Ok(self.len() < other.len() && self.is_subset_of(other)?)
    }

    pub fn is_superset_of(&self, other: &Relation) -> Result<bool> {
        other.is_subset_of(self)
    }

    pub fn is_proper_superset_of(&self, other: &Relation) -> Result<bool> {
        other.is_proper_subset_of(self)
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && (Arc::ptr_eq(&self.body, &other.body) || self.body == other.body)
    }
}

impl Eq for Relation {}

impl Hash for Relation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.id().hash(state);
        // order-independent combination of the row hashes
        let combined = self.body.iter().fold(0u64, |acc, row| {
            let mut h = DefaultHasher::new();
            row.hash(&mut h);
            acc.wrapping_add(h.finish())
        });
        self.body.len().hash(state);
        combined.hash(state);
    }
}

impl PartialOrd for Relation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A total order for sorting and for relation-valued attributes: type first,
/// then the sorted bodies compared lexicographically. It is not inclusion;
/// use [`Relation::is_subset_of`] for that.
impl Ord for Relation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ty
            .cmp(&other.ty)
            .then_with(|| self.sorted_rows().cmp(&other.sorted_rows()))
    }
}

impl<'a> IntoIterator for &'a Relation {
    type Item = &'a Row;
    type IntoIter = hashbrown::hash_set::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.body.iter()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, row) in self.sorted_rows().into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", row)?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "rel{}()", self.header());
        }
        f.write_str("rel(")?;
        f.debug_list().entries(self.sorted_rows()).finish()?;
        f.write_str(")")
    }
}
