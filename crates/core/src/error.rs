//! Error types for relvar.

use crate::row::Row;
use crate::types::{AttrType, CoercionError};
use thiserror::Error;

/// Result type alias for relvar operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Boxed error returned by a relation store implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error types for relvar operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An attribute or relation name breaks the naming rules.
    #[error("Invalid relational attribute name {name:?}: {reason}")]
    InvalidAttributeName { name: String, reason: &'static str },

    /// The same attribute name was given twice.
    #[error("Duplicate relational attribute name {name:?}")]
    DuplicateAttribute { name: String },

    /// An attribute name that the header does not define.
    #[error("{header} has no attribute {attribute:?}")]
    UnknownAttribute { attribute: String, header: String },

    /// A value could not be converted to the declared attribute type.
    #[error("{value} invalid for attribute {attribute}: {source}")]
    InvalidValue {
        attribute: String,
        value: String,
        #[source]
        source: CoercionError,
    },

    /// Wrong number of attributes supplied for a row.
    #[error("Expected {expected} attributes, got {got}")]
    DegreeMismatch { expected: usize, got: usize },

    /// A row whose type is not the one required.
    #[error("Row header does not match: expected {expected}, got {got}")]
    RowTypeMismatch { expected: String, got: String },

    /// Error raised while processing one row of a constructor's input.
    #[error("{source} in row {position}")]
    InRow {
        position: usize,
        #[source]
        source: Box<Error>,
    },

    /// Two rows of a relation's input compare equal.
    #[error("Duplicate row: {row} in row {position} of input")]
    DuplicateRow { row: Row, position: usize },

    /// An attribute appears in two operands with different types.
    #[error("Duplicate attribute name ({attribute:?}) with different type (first: {first}, second: {second})")]
    AttributeTypeMismatch {
        attribute: String,
        first: AttrType,
        second: AttrType,
    },

    /// Operands of an operator that requires equal relation types differ.
    #[error("{operation} operands must be of equal types (got {left} and {right})")]
    RelationTypeMismatch {
        operation: &'static str,
        left: String,
        right: String,
    },

    /// Operands of `times` share attributes.
    #[error("Cannot multiply relations that share attributes: {attributes:?}")]
    SharedAttributes { attributes: Vec<String> },

    /// Error detected while processing the n-th operand of an n-ary operator.
    #[error("{source} (error detected while processing argument {index})")]
    InArgument {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// Operator needs at least one row to infer a type.
    #[error("Cannot {operation} an empty relation")]
    EmptyRelation { operation: &'static str },

    /// Relation does not hold exactly one row.
    #[error("Relation has {len} rows, expected exactly one")]
    NotSingleton { len: usize },

    /// Aggregate input is not numeric.
    #[error("Value {value} is not numeric")]
    NotNumeric { value: String },

    /// Relation variable not found.
    #[error("Relation not found: {name}")]
    RelationNotFound { name: String },

    /// Relation variable already declared.
    #[error("Relation already exists: {name}")]
    RelationExists { name: String },

    /// A row constraint is not satisfied.
    #[error("{relation} constraint {constraint} violated: {text:?} is not satisfied by {row}")]
    RowConstraint {
        relation: String,
        constraint: String,
        text: String,
        row: Row,
    },

    /// A database constraint is not satisfied and could not be repaired.
    #[error("Database constraint {name} violated: {description:?} (fixer attempted: {fixer_attempted})")]
    DbConstraint {
        name: String,
        description: String,
        fixer_attempted: bool,
    },

    /// The constrain-and-repair loop did not reach a fixed point.
    #[error("Database constrain-and-update loop did not terminate after {rounds} rounds")]
    ConstraintLoop { rounds: usize },

    /// Operation requires an open transaction.
    #[error("No transaction is active")]
    NoTransaction,

    /// Operation is not allowed inside a transaction.
    #[error("{operation} is not allowed inside a transaction")]
    TransactionActive { operation: &'static str },

    /// A persisted row constraint cannot be turned back into a predicate.
    #[error("Row constraint {constraint} on {relation} cannot be compiled: {text:?}")]
    UncompiledConstraint {
        relation: String,
        constraint: String,
        text: String,
    },

    /// The relation store failed.
    #[error("Relation store error: {0}")]
    Store(#[source] StoreError),

    /// Invalid operation.
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl Error {
    /// Creates an unknown attribute error.
    pub fn unknown_attribute(attribute: impl Into<String>, header: impl ToString) -> Self {
        Error::UnknownAttribute {
            attribute: attribute.into(),
            header: header.to_string(),
        }
    }

    /// Creates a relation type mismatch error.
    pub fn relation_type_mismatch(
        operation: &'static str,
        left: impl ToString,
        right: impl ToString,
    ) -> Self {
        Error::RelationTypeMismatch {
            operation,
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// Creates a relation not found error.
    pub fn relation_not_found(name: impl Into<String>) -> Self {
        Error::RelationNotFound { name: name.into() }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Wraps a store failure.
    pub fn store(err: impl Into<StoreError>) -> Self {
        Error::Store(err.into())
    }

    /// Attaches the position of the offending input row.
    pub fn in_row(self, position: usize) -> Self {
        Error::InRow {
            position,
            source: Box::new(self),
        }
    }

    /// Attaches the index of the offending operand.
    pub fn in_argument(self, index: usize) -> Self {
        Error::InArgument {
            index,
            source: Box::new(self),
        }
    }

    /// Strips positional context (`InRow`, `InArgument`) and returns the
    /// underlying error.
    pub fn root(&self) -> &Error {
        match self {
            Error::InRow { source, .. } | Error::InArgument { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn test_error_display() {
        let err = Error::unknown_attribute("qty", "{pid: String}");
        assert!(err.to_string().contains("qty"));

        let err = Error::relation_not_found("parts");
        assert!(err.to_string().contains("parts"));

        let err = Error::ConstraintLoop { rounds: 10 };
        assert!(err.to_string().contains("did not terminate"));
    }

    #[test]
    fn test_error_context_chain() {
        let err = Error::AttributeTypeMismatch {
            attribute: "pid".into(),
            first: AttrType::Scalar(DataType::String),
            second: AttrType::Scalar(DataType::Int64),
        }
        .in_argument(2);

        assert!(err.to_string().contains("argument 2"));
        assert!(matches!(err.root(), Error::AttributeTypeMismatch { .. }));
    }

    #[test]
    fn test_invalid_value_keeps_source() {
        use std::error::Error as _;

        let err = Error::InvalidValue {
            attribute: "qty".into(),
            value: "\"ten\"".into(),
            source: CoercionError::new("expected Int64, got String"),
        };
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("expected Int64, got String"));
        assert!(err.to_string().contains("qty"));
    }
}
