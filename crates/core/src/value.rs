//! Value type definitions for relvar.
//!
//! This module defines the `Value` enum which represents any attribute value:
//! a built-in scalar, a domain-tagged scalar, or a nested row or relation.

use crate::relation::Relation;
use crate::row::Row;
use crate::types::{AttrType, DataType, Domain};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A scalar tagged with the user domain it belongs to.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DomainValue {
    domain: Domain,
    value: Box<Value>,
}

impl DomainValue {
    /// Tags `value` with `domain`. Callers go through [`Domain::value`], which
    /// validates first.
    pub(crate) fn new(domain: Domain, value: Value) -> Self {
        Self {
            domain,
            value: Box::new(value),
        }
    }

    #[inline]
    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    /// The underlying built-in value.
    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }
}

impl PartialOrd for DomainValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DomainValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.domain
            .cmp(&other.domain)
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl fmt::Debug for DomainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", self.domain.name(), self.value)
    }
}

/// An attribute value.
#[derive(Clone, Debug)]
pub enum Value {
    /// Boolean value
    Boolean(bool),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 64-bit floating point
    Float64(f64),
    /// UTF-8 string
    String(String),
    /// DateTime stored as Unix timestamp in milliseconds
    DateTime(i64),
    /// Binary data
    Bytes(Vec<u8>),
    /// Value of a user domain
    Domain(DomainValue),
    /// Row-valued attribute
    Row(Row),
    /// Relation-valued attribute
    Relation(Relation),
}

impl Value {
    /// Returns the built-in data type of this value, or None for domain and
    /// nested values.
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Int32(_) => Some(DataType::Int32),
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::String(_) => Some(DataType::String),
            Value::DateTime(_) => Some(DataType::DateTime),
            Value::Bytes(_) => Some(DataType::Bytes),
            Value::Domain(_) | Value::Row(_) | Value::Relation(_) => None,
        }
    }

    /// Returns the attribute type this value naturally has. Used to infer
    /// headers for literals and for `extend`.
    pub fn attr_type(&self) -> AttrType {
        match self {
            Value::Domain(dv) => AttrType::Domain(dv.domain().clone()),
            Value::Row(row) => AttrType::Row(row.row_type().clone()),
            Value::Relation(rel) => AttrType::Relation(rel.relation_type().clone()),
            Value::Boolean(_) => AttrType::Scalar(DataType::Boolean),
            Value::Int32(_) => AttrType::Scalar(DataType::Int32),
            Value::Int64(_) => AttrType::Scalar(DataType::Int64),
            Value::Float64(_) => AttrType::Scalar(DataType::Float64),
            Value::String(_) => AttrType::Scalar(DataType::String),
            Value::DateTime(_) => AttrType::Scalar(DataType::DateTime),
            Value::Bytes(_) => AttrType::Scalar(DataType::Bytes),
        }
    }

    /// Type name used in error messages.
    pub fn type_name(&self) -> String {
        match self {
            Value::Domain(dv) => dv.domain().name().to_string(),
            Value::Row(row) => format!("row{}", row.header()),
            Value::Relation(rel) => format!("rel{}", rel.header()),
            other => other
                .data_type()
                .map(|dt| dt.name().to_string())
                .unwrap_or_default(),
        }
    }

    /// Returns the boolean value if this is a Boolean, None otherwise.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i32 value if this is an Int32, None otherwise.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the i64 value if this is an Int64, None otherwise.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the f64 value if this is a Float64, None otherwise.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the string if this is a String, None otherwise.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// Returns the datetime timestamp if this is a DateTime, None otherwise.
    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a reference to the bytes if this is Bytes, None otherwise.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_domain(&self) -> Option<&DomainValue> {
        match self {
            Value::Domain(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_row(&self) -> Option<&Row> {
        match self {
            Value::Row(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_relation(&self) -> Option<&Relation> {
        match self {
            Value::Relation(v) => Some(v),
            _ => None,
        }
    }

    /// Strips a domain tag, returning the underlying built-in value.
    pub fn base(&self) -> &Value {
        match self {
            Value::Domain(dv) => dv.value(),
            other => other,
        }
    }

    /// Numeric view of the value for aggregation. Domain values over numeric
    /// bases are numeric too.
    pub fn to_f64(&self) -> Option<f64> {
        match self.base() {
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns a type ordering value for comparing different types.
    fn type_order(&self) -> u8 {
        match self {
            Value::Boolean(_) => 1,
            Value::Int32(_) => 2,
            Value::Int64(_) => 3,
            Value::Float64(_) => 4,
            Value::String(_) => 5,
            Value::DateTime(_) => 6,
            Value::Bytes(_) => 7,
            Value::Domain(_) => 8,
            Value::Row(_) => 9,
            Value::Relation(_) => 10,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => {
                // NaN equals itself so rows holding NaN can live in a set
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b
                }
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Domain(a), Value::Domain(b)) => a == b,
            (Value::Row(a), Value::Row(b)) => a == b,
            (Value::Relation(a), Value::Relation(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Boolean(b) => b.hash(state),
            Value::Int32(i) => i.hash(state),
            Value::Int64(i) => i.hash(state),
            Value::Float64(f) => {
                // keep hash consistent with eq: 0.0 == -0.0 and NaN == NaN
                let bits = if f.is_nan() {
                    f64::NAN.to_bits()
                } else if *f == 0.0 {
                    0.0f64.to_bits()
                } else {
                    f.to_bits()
                };
                bits.hash(state)
            }
            Value::String(s) => s.hash(state),
            Value::DateTime(d) => d.hash(state),
            Value::Bytes(b) => b.hash(state),
            Value::Domain(d) => d.hash(state),
            Value::Row(r) => r.hash(state),
            Value::Relation(r) => r.hash(state),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => {
                // Handle NaN: treat NaN as greater than all other values
                match (a.is_nan(), b.is_nan()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
                }
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::DateTime(a), Value::DateTime(b)) => a.cmp(b),
            (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
            (Value::Domain(a), Value::Domain(b)) => a.cmp(b),
            (Value::Row(a), Value::Row(b)) => a.cmp(b),
            (Value::Relation(a), Value::Relation(b)) => a.cmp(b),
            // Different types: order by type discriminant
            _ => self.type_order().cmp(&other.type_order()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::Bytes(v) => {
                for byte in v {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
            Value::Domain(v) => write!(f, "{}", v.value()),
            Value::Row(v) => write!(f, "{}", v),
            Value::Relation(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Row> for Value {
    fn from(v: Row) -> Self {
        Value::Row(v)
    }
}

impl From<Relation> for Value {
    fn from(v: Relation) -> Self {
        Value::Relation(v)
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_value_type_check() {
        let v = Value::Int64(42);
        assert_eq!(v.data_type(), Some(DataType::Int64));
        assert_eq!(v.attr_type(), AttrType::Scalar(DataType::Int64));
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Boolean(true).as_bool(), Some(true));
        assert_eq!(Value::Int32(42).as_i32(), Some(42));
        assert_eq!(Value::Int64(100).as_i64(), Some(100));
        assert_eq!(Value::Float64(2.5).as_f64(), Some(2.5));
        assert_eq!(Value::String("hello".into()).as_str(), Some("hello"));
        assert_eq!(Value::DateTime(1234567890).as_datetime(), Some(1234567890));
        assert_eq!(Value::Bytes(vec![1, 2, 3]).as_bytes(), Some(&[1, 2, 3][..]));
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(Value::Int32(42), Value::Int32(42));
        assert_ne!(Value::Int32(42), Value::Int64(42));
        assert_eq!(Value::String("test".into()), Value::String("test".into()));
        assert_eq!(Value::Float64(f64::NAN), Value::Float64(f64::NAN));
    }

    #[test]
    fn test_float_hash_matches_eq() {
        assert_eq!(Value::Float64(0.0), Value::Float64(-0.0));
        assert_eq!(hash_of(&Value::Float64(0.0)), hash_of(&Value::Float64(-0.0)));
        assert_eq!(
            hash_of(&Value::Float64(f64::NAN)),
            hash_of(&Value::Float64(-f64::NAN))
        );
    }

    #[test]
    fn test_value_ordering() {
        assert!(Value::Int32(1) < Value::Int32(2));
        assert!(Value::String("a".into()) < Value::String("b".into()));
        // no cross-type numeric comparison: ordering falls back to type order
        assert!(Value::Int32(100) < Value::Int64(1));
        assert_ne!(Value::Int32(1).cmp(&Value::Int64(1)), Ordering::Equal);
    }

    #[test]
    fn test_value_from_impls() {
        let v: Value = 42i32.into();
        assert_eq!(v.as_i32(), Some(42));

        let v: Value = "hello".into();
        assert_eq!(v.as_str(), Some("hello"));
    }

    #[test]
    fn test_domain_values() {
        let qty = Domain::new("Qty", DataType::Int64);
        let a = qty.value(5i64).unwrap();
        let b = qty.value(5i64).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Value::Int64(5));
        assert_eq!(a.to_f64(), Some(5.0));
        assert_eq!(a.base(), &Value::Int64(5));
        assert_eq!(a.type_name(), "Qty");
        assert_eq!(a.to_string(), "5");
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from("P1").to_string(), "P1");
        assert_eq!(Value::Int64(10).to_string(), "10");
        assert_eq!(Value::Bytes(vec![0xab, 0x01]).to_string(), "ab01");
    }
}
