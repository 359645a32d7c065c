//! Database configuration.

use relvar_core::{Error, Result};

/// Default bound on rounds of the constrain-and-repair loop.
pub const DEFAULT_MAX_CONSTRAINT_ROUNDS: usize = 10;

/// Tunables for a [`crate::Database`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseOptions {
    /// Rounds of database-constraint evaluation before giving up with
    /// [`Error::ConstraintLoop`].
    pub max_constraint_rounds: usize,
    /// Re-derive every key by full projection on each outermost commit and
    /// fail if it differs from the incrementally maintained key relation.
    pub verify_keys: bool,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self {
            max_constraint_rounds: DEFAULT_MAX_CONSTRAINT_ROUNDS,
            verify_keys: false,
        }
    }
}

impl DatabaseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_constraint_rounds(mut self, rounds: usize) -> Self {
        self.max_constraint_rounds = rounds;
        self
    }

    pub fn verify_keys(mut self, verify: bool) -> Self {
        self.verify_keys = verify;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_constraint_rounds == 0 {
            return Err(Error::invalid_operation(
                "max_constraint_rounds must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DatabaseOptions::default();
        assert_eq!(options.max_constraint_rounds, 10);
        assert!(!options.verify_keys);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let options = DatabaseOptions::new().max_constraint_rounds(3).verify_keys(true);
        assert_eq!(options.max_constraint_rounds, 3);
        assert!(options.verify_keys);
        assert!(matches!(
            DatabaseOptions::new().max_constraint_rounds(0).validate(),
            Err(Error::InvalidOperation { .. })
        ));
    }
}
