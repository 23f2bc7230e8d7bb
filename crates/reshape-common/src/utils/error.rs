//! Error types shared by every Reshape crate.

use thiserror::Error;

/// Result alias using the Reshape [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while planning or executing a reshape query.
///
/// Schema-shape errors (`EmptyOnClause`, `UnboundedDomain`,
/// `DuplicateColumnName`, `IncompatibleFoldType`, `UnpivotArityMismatch`)
/// are raised during planning, before any row is produced.
#[derive(Error, Debug)]
pub enum Error {
    /// A PIVOT `ON` clause was given but contains no expressions.
    #[error("PIVOT ON clause must contain at least one expression")]
    EmptyOnClause,

    /// The distinct scan found more pivot values than the configured limit.
    #[error(
        "PIVOT produced more than {limit} distinct values; \
         supply an explicit IN list or raise the pivot column limit"
    )]
    UnboundedDomain {
        /// The configured limit.
        limit: usize,
    },

    /// Two output columns rendered to the same name.
    #[error("duplicate output column name: {0}")]
    DuplicateColumnName(String),

    /// A generated column name is not a usable identifier.
    #[error("invalid column name: {0:?}")]
    InvalidColumnName(String),

    /// Columns folded together by UNPIVOT share no common type.
    #[error("cannot fold column {column} of type {found} together with columns of type {expected}")]
    IncompatibleFoldType {
        /// The offending column.
        column: String,
        /// The type accumulated so far.
        expected: String,
        /// The type of the offending column.
        found: String,
    },

    /// UNPIVOT fold families (or value columns) have mismatched lengths.
    #[error("UNPIVOT arity mismatch: expected {expected} entries, found {found}")]
    UnpivotArityMismatch {
        /// Expected number of entries.
        expected: usize,
        /// Number of entries actually given.
        found: usize,
    },

    /// A PIVOT expression could not be classified for default grouping.
    #[error("ambiguous PIVOT expression {0}: used in both ON and USING")]
    AmbiguousPivotExpression(String),

    /// Column lookup failed.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// Table lookup failed.
    #[error("table not found: {0}")]
    TableNotFound(String),

    /// A table with this name is already registered.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// A value or expression had the wrong type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Expected type name.
        expected: String,
        /// Found type name.
        found: String,
    },

    /// Numeric overflow during evaluation.
    #[error("numeric overflow: {0}")]
    Overflow(String),

    /// The query was cancelled.
    #[error("query cancelled")]
    Cancelled,

    /// Any other planning failure.
    #[error("planning error: {0}")]
    Planning(String),

    /// Any other execution failure.
    #[error("execution error: {0}")]
    Execution(String),

    /// I/O failure from the scan layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns true if this error describes the shape of a query rather than
    /// a failure while evaluating rows.
    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::EmptyOnClause
                | Self::UnboundedDomain { .. }
                | Self::DuplicateColumnName(_)
                | Self::InvalidColumnName(_)
                | Self::IncompatibleFoldType { .. }
                | Self::UnpivotArityMismatch { .. }
                | Self::AmbiguousPivotExpression(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_classification() {
        assert!(Error::EmptyOnClause.is_schema_error());
        assert!(Error::UnboundedDomain { limit: 10 }.is_schema_error());
        assert!(!Error::Overflow("sum".into()).is_schema_error());
        assert!(!Error::Cancelled.is_schema_error());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::UnpivotArityMismatch {
            expected: 3,
            found: 2,
        };
        assert_eq!(
            err.to_string(),
            "UNPIVOT arity mismatch: expected 3 entries, found 2"
        );
        assert_eq!(
            Error::DuplicateColumnName("2000".into()).to_string(),
            "duplicate output column name: 2000"
        );
    }
}
