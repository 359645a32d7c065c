//! Headers: the structural description of row and relation types.

use crate::error::{Error, Result};
use crate::types::AttrType;
use std::fmt;
use std::sync::Arc;

/// Attribute names beginning with this prefix are reserved for internal use.
pub const RESERVED_PREFIX: &str = "_";

/// An ordered-by-name mapping from attribute name to attribute type.
///
/// Two headers are equal iff they map the same names to the same types.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Header {
    attrs: Arc<[(String, AttrType)]>,
}

impl Header {
    /// Creates a header from `(name, type)` pairs in any order.
    ///
    /// Fails on empty names, reserved names and duplicate names.
    pub fn new<I, N, T>(attrs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<AttrType>,
    {
        Self::build(attrs, false)
    }

    /// Like [`Header::new`] but accepts reserved names. Used for the
    /// intermediate attributes of operators and for key relations.
    #[doc(hidden)]
    pub fn with_reserved<I, N, T>(attrs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<AttrType>,
    {
        Self::build(attrs, true)
    }

    /// The header with no attributes (the type of `Dee` and `Dum`).
    pub fn empty() -> Self {
        Self {
            attrs: Arc::from(Vec::new()),
        }
    }

    fn build<I, N, T>(attrs: I, allow_reserved: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (N, T)>,
        N: Into<String>,
        T: Into<AttrType>,
    {
        let mut attrs: Vec<(String, AttrType)> = attrs
            .into_iter()
            .map(|(name, ty)| (name.into(), ty.into()))
            .collect();
        for (name, _) in &attrs {
            check_name(name, allow_reserved)?;
        }
        attrs.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(dup) = attrs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(Error::DuplicateAttribute {
                name: dup[0].0.clone(),
            });
        }
        Ok(Self {
            attrs: Arc::from(attrs),
        })
    }

    /// Number of attributes.
    #[inline]
    pub fn degree(&self) -> usize {
        self.attrs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Attribute names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.attrs.iter().map(|(name, _)| name.as_str())
    }

    /// `(name, type)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrType)> + '_ {
        self.attrs.iter().map(|(name, ty)| (name.as_str(), ty))
    }

    /// Position of `name` in the sorted attribute list.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.attrs
            .binary_search_by(|(n, _)| n.as_str().cmp(name))
            .ok()
    }

    pub fn get(&self, name: &str) -> Option<&AttrType> {
        self.index_of(name).map(|i| &self.attrs[i].1)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Type of the attribute at position `index`.
    #[inline]
    pub fn type_at(&self, index: usize) -> &AttrType {
        &self.attrs[index].1
    }

    /// Name of the attribute at position `index`.
    #[inline]
    pub fn name_at(&self, index: usize) -> &str {
        &self.attrs[index].0
    }

    /// Fails unless every name in `names` is an attribute of this header.
    pub fn require<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
        for name in names {
            if !self.contains(name) {
                return Err(Error::unknown_attribute(name, self));
            }
        }
        Ok(())
    }

    /// Header restricted to `names`.
    pub fn project<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<Header> {
        let mut attrs = Vec::new();
        for name in names {
            let ty = self
                .get(name)
                .ok_or_else(|| Error::unknown_attribute(name, self))?;
            attrs.push((name.to_string(), ty.clone()));
        }
        Header::with_reserved(attrs)
    }

    /// Header without `names`. Every name must be present.
    pub fn without<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> Result<Header> {
        let names: Vec<&str> = names.into_iter().collect();
        self.require(names.iter().copied())?;
        let attrs: Vec<(String, AttrType)> = self
            .attrs
            .iter()
            .filter(|(name, _)| !names.contains(&name.as_str()))
            .cloned()
            .collect();
        Ok(Self {
            attrs: Arc::from(attrs),
        })
    }

    /// Names shared with `other`, in sorted order.
    ///
    /// Fails if a shared attribute has different types in the two headers.
    pub fn common(&self, other: &Header) -> Result<Vec<String>> {
        let mut shared = Vec::new();
        for (name, ty) in self.iter() {
            if let Some(other_ty) = other.get(name) {
                if ty != other_ty {
                    return Err(Error::AttributeTypeMismatch {
                        attribute: name.to_string(),
                        first: ty.clone(),
                        second: other_ty.clone(),
                    });
                }
                shared.push(name.to_string());
            }
        }
        Ok(shared)
    }

    /// Union of the two headers. Shared attributes must agree on type.
    pub fn merge(&self, other: &Header) -> Result<Header> {
        self.common(other)?;
        let mut attrs: Vec<(String, AttrType)> = self.attrs.to_vec();
        attrs.extend(
            other
                .attrs
                .iter()
                .filter(|(name, _)| !self.contains(name))
                .cloned(),
        );
        attrs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self {
            attrs: Arc::from(attrs),
        })
    }

    /// Header with additional attributes. Names must not already be present.
    pub fn extend<I>(&self, extra: I) -> Result<Header>
    where
        I: IntoIterator<Item = (String, AttrType)>,
    {
        let mut attrs = self.attrs.to_vec();
        attrs.extend(extra);
        Header::with_reserved(attrs)
    }
}

/// Checks a single attribute or relation name.
pub fn check_name(name: &str, allow_reserved: bool) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidAttributeName {
            name: name.to_string(),
            reason: "name is empty",
        });
    }
    if !allow_reserved && name.starts_with(RESERVED_PREFIX) {
        return Err(Error::InvalidAttributeName {
            name: name.to_string(),
            reason: "names beginning with '_' are reserved",
        });
    }
    Ok(())
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, ty)) in self.attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, ty)?;
        }
        f.write_str("}")
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Header{}", self)
    }
}
