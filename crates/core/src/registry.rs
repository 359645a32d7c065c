//! Type registry: canonical, memoized row and relation types.
//!
//! A row or relation type is determined entirely by its [`Header`]. The
//! registry interns one descriptor per structural signature so that values
//! produced by unrelated operator calls share the same type handle and "same
//! type" checks are pointer comparisons. Entries hold weak references: a type
//! that no live row, relation or header refers to is reclaimed.

use crate::header::Header;
use crate::types::{AttrType, DataType};
use hashbrown::HashMap;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};
use tracing::debug;

/// Registry entries created between automatic purges of dead entries.
const PURGE_INTERVAL: usize = 256;

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

fn next_type_id() -> u64 {
    NEXT_TYPE_ID.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Hashable identity of an attribute type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum TypeKey {
    Scalar(DataType),
    Domain(u64),
    Row(u64),
    Relation(u64),
}

type Signature = Vec<(String, TypeKey)>;

fn signature(header: &Header) -> Signature {
    header
        .iter()
        .map(|(name, ty)| {
            let key = match ty {
                AttrType::Scalar(dt) => TypeKey::Scalar(*dt),
                AttrType::Domain(domain) => TypeKey::Domain(domain.id()),
                AttrType::Row(rt) => TypeKey::Row(rt.id()),
                AttrType::Relation(rt) => TypeKey::Relation(rt.id()),
            };
            (name.to_string(), key)
        })
        .collect()
}

struct RowTypeInner {
    id: u64,
    header: Header,
}

struct RelationTypeInner {
    id: u64,
    header: Header,
    row_type: RowType,
}

/// Handle to an interned row type.
#[derive(Clone)]
pub struct RowType(Arc<RowTypeInner>);

/// Handle to an interned relation type.
#[derive(Clone)]
pub struct RelationType(Arc<RelationTypeInner>);

impl RowType {
    /// Returns the canonical row type for `header` from the global registry.
    pub fn new(header: Header) -> Self {
        TypeRegistry::with_global(|registry| registry.row_type(header))
    }

    /// The row type of zero attributes.
    pub fn empty() -> Self {
        Self::new(Header::empty())
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.0.header
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.0.header.degree()
    }

    /// The relation type over the same header.
    pub fn relation_type(&self) -> RelationType {
        RelationType::new(self.0.header.clone())
    }
}

impl RelationType {
    /// Returns the canonical relation type for `header` from the global registry.
    pub fn new(header: Header) -> Self {
        TypeRegistry::with_global(|registry| registry.relation_type(header))
    }

    /// The relation type of zero attributes (the type of `Dee` and `Dum`).
    pub fn empty() -> Self {
        Self::new(Header::empty())
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    pub fn header(&self) -> &Header {
        &self.0.header
    }

    #[inline]
    pub fn degree(&self) -> usize {
        self.0.header.degree()
    }

    /// Row type of the relation's body.
    #[inline]
    pub fn row_type(&self) -> &RowType {
        &self.0.row_type
    }
}

macro_rules! impl_type_identity {
    ($ty:ident, $label:literal) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0)
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.id.hash(state);
            }
        }

        impl PartialOrd for $ty {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $ty {
            fn cmp(&self, other: &Self) -> Ordering {
                if self == other {
                    return Ordering::Equal;
                }
                self.0
                    .header
                    .cmp(&other.0.header)
                    .then_with(|| self.0.id.cmp(&other.0.id))
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $label, self.0.header)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $label, self.0.header)
            }
        }
    };
}

impl_type_identity!(RowType, "row");
impl_type_identity!(RelationType, "rel");

/// Kind of descriptor requested from [`TypeRegistry::get_or_create`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Row,
    Relation,
}

/// A row or relation type handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeDescriptor {
    Row(RowType),
    Relation(RelationType),
}

impl TypeDescriptor {
    pub fn header(&self) -> &Header {
        match self {
            TypeDescriptor::Row(ty) => ty.header(),
            TypeDescriptor::Relation(ty) => ty.header(),
        }
    }

    pub fn degree(&self) -> usize {
        self.header().degree()
    }

    /// Row type of the descriptor: itself for rows, the body type for relations.
    pub fn row_type(&self) -> &RowType {
        match self {
            TypeDescriptor::Row(ty) => ty,
            TypeDescriptor::Relation(ty) => ty.row_type(),
        }
    }
}

/// Interning table for row and relation types.
#[derive(Default)]
pub struct TypeRegistry {
    rows: HashMap<Signature, Weak<RowTypeInner>>,
    relations: HashMap<Signature, Weak<RelationTypeInner>>,
    created_since_purge: usize,
}

impl TypeRegistry {
    /// Creates an empty registry. Most code uses the process-wide registry
    /// through [`RowType::new`] and [`RelationType::new`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static Mutex<TypeRegistry> {
        static GLOBAL: OnceLock<Mutex<TypeRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Mutex::new(TypeRegistry::new()))
    }

    /// Runs `f` with the global registry locked. A poisoned lock is recovered;
    /// the registry holds no invariant a panicking caller could break halfway.
    pub fn with_global<R>(f: impl FnOnce(&mut TypeRegistry) -> R) -> R {
        let mut guard = Self::global()
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Returns the canonical descriptor of `kind` for `header`, creating it on
    /// first use.
    pub fn get_or_create(&mut self, kind: TypeKind, header: Header) -> TypeDescriptor {
        match kind {
            TypeKind::Row => TypeDescriptor::Row(self.row_type(header)),
            TypeKind::Relation => TypeDescriptor::Relation(self.relation_type(header)),
        }
    }

    pub fn row_type(&mut self, header: Header) -> RowType {
        let sig = signature(&header);
        if let Some(inner) = self.rows.get(&sig).and_then(Weak::upgrade) {
            return RowType(inner);
        }
        let ty = RowType(Arc::new(RowTypeInner {
            id: next_type_id(),
            header,
        }));
        self.rows.insert(sig, Arc::downgrade(&ty.0));
        self.note_created();
        ty
    }

    pub fn relation_type(&mut self, header: Header) -> RelationType {
        let sig = signature(&header);
        if let Some(inner) = self.relations.get(&sig).and_then(Weak::upgrade) {
            return RelationType(inner);
        }
        let row_type = self.row_type(header.clone());
        let ty = RelationType(Arc::new(RelationTypeInner {
            id: next_type_id(),
            header,
            row_type,
        }));
        self.relations.insert(sig, Arc::downgrade(&ty.0));
        self.note_created();
        ty
    }

    /// Number of registered types that are still referenced.
    pub fn live_types(&self) -> usize {
        let rows = self.rows.values().filter(|w| w.strong_count() > 0).count();
        let relations = self
            .relations
            .values()
            .filter(|w| w.strong_count() > 0)
            .count();
        rows + relations
    }

    /// Drops entries whose type is no longer referenced. Returns the number
    /// of entries removed.
    pub fn purge(&mut self) -> usize {
        let before = self.rows.len() + self.relations.len();
        self.rows.retain(|_, w| w.strong_count() > 0);
        self.relations.retain(|_, w| w.strong_count() > 0);
        self.created_since_purge = 0;
        let removed = before - (self.rows.len() + self.relations.len());
        if removed > 0 {
            debug!(removed, remaining = before - removed, "purged dead type registry entries");
        }
        removed
    }

    fn note_created(&mut self) {
        self.created_since_purge += 1;
        if self.created_since_purge >= PURGE_INTERVAL {
            self.purge();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Domain;

    fn header(attrs: &[(&str, DataType)]) -> Header {
        Header::new(attrs.iter().map(|(n, t)| (*n, *t))).unwrap()
    }

    #[test]
    fn test_structurally_equal_headers_share_type() {
        let a = RelationType::new(header(&[("pid", DataType::String), ("qty", DataType::Int64)]));
        let b = RelationType::new(header(&[("qty", DataType::Int64), ("pid", DataType::String)]));
        assert_eq!(a, b);
        assert_eq!(a.id(), b.id());
        assert_eq!(a.row_type(), b.row_type());
        assert_eq!(a.degree(), 2);
    }

    #[test]
    fn test_different_headers_differ() {
        let a = RowType::new(header(&[("pid", DataType::String)]));
        let b = RowType::new(header(&[("pid", DataType::Int64)]));
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_get_or_create_descriptors() {
        let mut registry = TypeRegistry::new();
        let h = header(&[("sid", DataType::String)]);
        let a = registry.get_or_create(TypeKind::Relation, h.clone());
        let b = registry.get_or_create(TypeKind::Relation, h.clone());
        assert_eq!(a, b);
        assert_eq!(a.degree(), 1);

        let r = registry.get_or_create(TypeKind::Row, h);
        assert_eq!(&r.row_type().clone(), a.row_type());
    }

    #[test]
    fn test_domains_distinguish_types() {
        let d1 = Domain::new("ID", DataType::String);
        let d2 = Domain::new("ID", DataType::String);
        let a = RowType::new(Header::new([("id", &d1)]).unwrap());
        let b = RowType::new(Header::new([("id", &d2)]).unwrap());
        let c = RowType::new(Header::new([("id", &d1)]).unwrap());
        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_purge_reclaims_dead_entries() {
        let mut registry = TypeRegistry::new();
        let kept = registry.relation_type(header(&[("a", DataType::Int64)]));
        {
            let _dropped = registry.relation_type(header(&[("b", DataType::Int64)]));
        }
        assert_eq!(registry.live_types(), 2);
        assert_eq!(registry.purge(), 2);
        assert_eq!(registry.live_types(), 2);

        let again = registry.relation_type(header(&[("a", DataType::Int64)]));
        assert_eq!(kept, again);
    }
}
