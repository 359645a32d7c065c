//! Attribute type definitions for relvar.
//!
//! Every attribute of a header is typed by an [`AttrType`]: a built-in
//! [`DataType`], a user [`Domain`], a row type (wrapped attributes) or a
//! relation type (grouped attributes). Values are coerced to the declared type
//! when a row is constructed.

use crate::registry::{RelationType, RowType};
use crate::value::{DomainValue, Value};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use thiserror::Error;

/// Supported built-in scalar types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Date and time stored as Unix timestamp (milliseconds)
    DateTime,
    /// Binary data
    Bytes,
}

impl DataType {
    /// Returns the name used in headers and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "Boolean",
            DataType::Int32 => "Int32",
            DataType::Int64 => "Int64",
            DataType::Float64 => "Float64",
            DataType::String => "String",
            DataType::DateTime => "DateTime",
            DataType::Bytes => "Bytes",
        }
    }

    /// Returns whether aggregates can fold values of this type.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int32 | DataType::Int64 | DataType::Float64)
    }

    /// Converts `value` into a value of this type.
    ///
    /// Integers widen to `Int64` and `Float64`; `Int64` narrows to `Int32` when
    /// it fits; `DateTime` accepts millisecond timestamps given as `Int64`.
    pub fn coerce(&self, value: &Value) -> Result<Value, CoercionError> {
        match (self, value) {
            (DataType::Boolean, Value::Boolean(_))
            | (DataType::Int32, Value::Int32(_))
            | (DataType::Int64, Value::Int64(_))
            | (DataType::Float64, Value::Float64(_))
            | (DataType::String, Value::String(_))
            | (DataType::DateTime, Value::DateTime(_))
            | (DataType::Bytes, Value::Bytes(_)) => Ok(value.clone()),
            (DataType::Int32, Value::Int64(i)) => i32::try_from(*i)
                .map(Value::Int32)
                .map_err(|_| CoercionError::new(format!("{} does not fit in Int32", i))),
            (DataType::Int64, Value::Int32(i)) => Ok(Value::Int64(i64::from(*i))),
            (DataType::Float64, Value::Int32(i)) => Ok(Value::Float64(f64::from(*i))),
            (DataType::Float64, Value::Int64(i)) => Ok(Value::Float64(*i as f64)),
            (DataType::DateTime, Value::Int64(ms)) => Ok(Value::DateTime(*ms)),
            (_, other) => Err(CoercionError::new(format!(
                "expected {}, got {}",
                self.name(),
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value could not be converted to an attribute type.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CoercionError {
    message: String,
}

impl CoercionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

type Validator = dyn Fn(&Value) -> Result<(), String> + Send + Sync;

static NEXT_DOMAIN_ID: AtomicU64 = AtomicU64::new(1);

struct DomainInner {
    id: u64,
    name: String,
    base: DataType,
    validator: Option<Box<Validator>>,
}

/// A named user scalar type layered over a built-in [`DataType`].
///
/// Values of a domain are tagged with it and compare only with values of the
/// same domain. Two domains with the same name and base type are still
/// distinct types; identity is the handle.
///
/// ```rust
/// use relvar_core::{DataType, Domain, Value};
///
/// let sid = Domain::with_validator("SID", DataType::String, |v| match v.as_str() {
///     Some(s) if s.starts_with('S') => Ok(()),
///     _ => Err("supplier ids start with S".into()),
/// });
/// assert!(sid.value("S1").is_ok());
/// assert!(sid.value("P1").is_err());
/// ```
#[derive(Clone)]
pub struct Domain(Arc<DomainInner>);

impl Domain {
    /// Creates a domain that accepts every value of `base`.
    pub fn new(name: impl Into<String>, base: DataType) -> Self {
        Self::build(name.into(), base, None)
    }

    /// Creates a domain whose values must also pass `validator`.
    pub fn with_validator<F>(name: impl Into<String>, base: DataType, validator: F) -> Self
    where
        F: Fn(&Value) -> Result<(), String> + Send + Sync + 'static,
    {
        Self::build(name.into(), base, Some(Box::new(validator)))
    }

    fn build(name: String, base: DataType, validator: Option<Box<Validator>>) -> Self {
        Self(Arc::new(DomainInner {
            id: NEXT_DOMAIN_ID.fetch_add(1, AtomicOrdering::Relaxed),
            name,
            base,
            validator,
        }))
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.0.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn base(&self) -> DataType {
        self.0.base
    }

    /// Converts `value` into a value of this domain.
    ///
    /// A value already tagged with this domain passes through unchanged; a value
    /// of another domain is rejected.
    pub fn coerce(&self, value: &Value) -> Result<Value, CoercionError> {
        if let Value::Domain(dv) = value {
            if dv.domain() == self {
                return Ok(value.clone());
            }
            return Err(CoercionError::new(format!(
                "expected {}, got {}",
                self.name(),
                dv.domain().name()
            )));
        }
        let base = self.0.base.coerce(value)?;
        if let Some(validator) = &self.0.validator {
            validator(&base).map_err(CoercionError::new)?;
        }
        Ok(Value::Domain(DomainValue::new(self.clone(), base)))
    }

    /// Builds a value of this domain.
    pub fn value(&self, value: impl Into<Value>) -> Result<Value, CoercionError> {
        self.coerce(&value.into())
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Domain {}

impl Hash for Domain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl PartialOrd for Domain {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Domain {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name()
            .cmp(other.name())
            .then_with(|| self.id().cmp(&other.id()))
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Domain({}: {})", self.name(), self.base())
    }
}

/// The declared type of an attribute.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttrType {
    /// Built-in scalar type
    Scalar(DataType),
    /// User domain
    Domain(Domain),
    /// Row-valued attribute (produced by wrap)
    Row(RowType),
    /// Relation-valued attribute (produced by group and summarize)
    Relation(RelationType),
}

impl AttrType {
    /// Converts `value` into a value of this attribute type.
    pub fn coerce(&self, value: &Value) -> Result<Value, CoercionError> {
        match self {
            AttrType::Scalar(dt) => dt.coerce(value),
            AttrType::Domain(domain) => domain.coerce(value),
            AttrType::Row(ty) => match value {
                Value::Row(row) if row.row_type() == ty => Ok(value.clone()),
                Value::Row(row) => Err(CoercionError::new(format!(
                    "expected row{}, got row{}",
                    ty.header(),
                    row.header()
                ))),
                other => Err(CoercionError::new(format!(
                    "expected row{}, got {}",
                    ty.header(),
                    other.type_name()
                ))),
            },
            AttrType::Relation(ty) => match value {
                Value::Relation(rel) if rel.relation_type() == ty => Ok(value.clone()),
                Value::Relation(rel) => Err(CoercionError::new(format!(
                    "expected rel{}, got rel{}",
                    ty.header(),
                    rel.header()
                ))),
                other => Err(CoercionError::new(format!(
                    "expected rel{}, got {}",
                    ty.header(),
                    other.type_name()
                ))),
            },
        }
    }

    /// Returns the built-in type values of this attribute reduce to, if any.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            AttrType::Scalar(dt) => Some(*dt),
            AttrType::Domain(domain) => Some(domain.base()),
            AttrType::Row(_) | AttrType::Relation(_) => None,
        }
    }
}

impl From<DataType> for AttrType {
    fn from(dt: DataType) -> Self {
        AttrType::Scalar(dt)
    }
}

impl From<Domain> for AttrType {
    fn from(domain: Domain) -> Self {
        AttrType::Domain(domain)
    }
}

impl From<&Domain> for AttrType {
    fn from(domain: &Domain) -> Self {
        AttrType::Domain(domain.clone())
    }
}

impl From<RowType> for AttrType {
    fn from(ty: RowType) -> Self {
        AttrType::Row(ty)
    }
}

impl From<RelationType> for AttrType {
    fn from(ty: RelationType) -> Self {
        AttrType::Relation(ty)
    }
}

impl fmt::Display for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrType::Scalar(dt) => write!(f, "{}", dt),
            AttrType::Domain(domain) => f.write_str(domain.name()),
            AttrType::Row(ty) => write!(f, "row{}", ty.header()),
            AttrType::Relation(ty) => write!(f, "rel{}", ty.header()),
        }
    }
}

impl fmt::Debug for AttrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
