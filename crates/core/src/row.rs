//! Row structure for relvar.
//!
//! A `Row` is an immutable tuple of named, typed attribute values. Values are
//! stored in the header's attribute order, so attribute access by name is a
//! binary search over the header and two rows of the same type compare
//! element-wise.

use crate::error::{Error, Result};
use crate::header::Header;
use crate::registry::RowType;
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A typed tuple of attribute values.
#[derive(Clone)]
pub struct Row {
    ty: RowType,
    /// Values indexed by attribute position in the header.
    values: Arc<[Value]>,
}

impl Row {
    /// Creates a row of type `ty` from `(name, value)` pairs.
    ///
    /// Exactly one value must be supplied per attribute; each value is coerced
    /// to the attribute's declared type.
    pub fn new<I, N, V>(ty: &RowType, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<Value>,
    {
        let pairs: Vec<(String, Value)> = values
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        let header = ty.header();
        if pairs.len() != header.degree() {
            return Err(Error::DegreeMismatch {
                expected: header.degree(),
                got: pairs.len(),
            });
        }

        let mut slots: Vec<Option<Value>> = (0..header.degree()).map(|_| None).collect();
        for (name, value) in pairs {
            let index = header
                .index_of(&name)
                .ok_or_else(|| Error::unknown_attribute(name.as_str(), header))?;
            if slots[index].is_some() {
                return Err(Error::DuplicateAttribute { name });
            }
            let coerced =
                header
                    .type_at(index)
                    .coerce(&value)
                    .map_err(|source| Error::InvalidValue {
                        attribute: name.clone(),
                        value: format!("{:?}", value),
                        source,
                    })?;
            slots[index] = Some(coerced);
        }

        // degree matched and every name was distinct, so every slot is filled
        let values: Vec<Value> = slots.into_iter().flatten().collect();
        Ok(Self {
            ty: ty.clone(),
            values: Arc::from(values),
        })
    }

    /// Creates a row of type `ty` from a row asserted to have the same header.
    ///
    /// The header is checked; values are not re-validated.
    pub fn cast(ty: &RowType, row: &Row) -> Result<Self> {
        if &row.ty != ty {
            return Err(Error::RowTypeMismatch {
                expected: ty.header().to_string(),
                got: row.header().to_string(),
            });
        }
        Ok(row.clone())
    }

    /// Creates a row whose type is inferred from the supplied values.
    pub fn literal<I, N, V>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, V)>,
        N: Into<String>,
        V: Into<Value>,
    {
        let pairs: Vec<(String, Value)> = values
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        let header = Header::new(pairs.iter().map(|(n, v)| (n.clone(), v.attr_type())))?;
        Self::new(&RowType::new(header), pairs)
    }

    /// Creates a row from values already in header order and already of the
    /// declared types. This is the construction path of the algebra operators.
    pub fn from_ordered(ty: &RowType, values: Vec<Value>) -> Result<Self> {
        if values.len() != ty.degree() {
            return Err(Error::DegreeMismatch {
                expected: ty.degree(),
                got: values.len(),
            });
        }
        debug_assert!(values
            .iter()
            .enumerate()
            .all(|(i, v)| ty.header().type_at(i).coerce(v).as_ref() == Ok(v)));
        Ok(Self {
            ty: ty.clone(),
            values: Arc::from(values),
        })
    }

    /// The row of zero attributes.
    pub fn empty() -> Self {
        Self {
            ty: RowType::empty(),
            values: Arc::from(Vec::new()),
        }
    }

    #[inline]
    pub fn row_type(&self) -> &RowType {
        &self.ty
    }

    #[inline]
    pub fn header(&self) -> &Header {
        self.ty.header()
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.values.len()
    }

    /// Returns the value of attribute `name`, failing if the row has no such
    /// attribute.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.value(name)
            .ok_or_else(|| Error::unknown_attribute(name, self.header()))
    }

    /// Returns the value of attribute `name`, if present.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.header().index_of(name).map(|i| &self.values[i])
    }

    /// Values in header order.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `(name, value)` pairs in header order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.header().names().zip(self.values.iter())
    }

    /// Owned `(name, value)` pairs, suitable for building a related row.
    pub fn to_pairs(&self) -> Vec<(String, Value)> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.ty == other.ty && self.values == other.values
    }
}

impl Eq for Row {}

impl Hash for Row {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ty.id().hash(state);
        self.values.hash(state);
    }
}

impl PartialOrd for Row {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Row {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ty
            .cmp(&other.ty)
            .then_with(|| self.values.cmp(&other.values))
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("row(")?;
        f.debug_map().entries(self.iter()).finish()?;
        f.write_str(")")
    }
}
