//! Error types for the relation runtime and the grid index.

use arrow_schema::DataType;
use thiserror::Error;

use crate::types::MinorType;

/// Errors surfaced by columns, relations, the allocator, and the grid.
#[derive(Debug, Error)]
pub enum Error {
    /// A value's runtime type id is not in the append dispatch table, or a
    /// vector's arrow type has no minor-type mapping.
    #[error("unsupported value type {kind} (arrow type {arrow_type:?})")]
    UnsupportedValueType {
        /// Short description of the offending value or vector.
        kind: String,
        /// The arrow type computed for the offending input.
        arrow_type: DataType,
    },

    /// A typed append or copy targeted a column of a different minor type.
    #[error("type mismatch at column '{column}': expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Name of the column being appended into (empty until attributed).
        column: String,
        /// The minor type the column is bound to.
        expected: MinorType,
        /// The minor type of the appended value.
        found: MinorType,
    },

    /// The operation is not part of the structure's contract.
    #[error("operation not supported: {operation}")]
    OperationNotSupported {
        /// Name of the rejected operation.
        operation: &'static str,
    },

    /// The buffer allocator could not admit a reservation.
    #[error("allocation of {requested} bytes failed: {in_use} of {budget} bytes in use")]
    AllocationFailed {
        /// Bytes the caller asked for.
        requested: usize,
        /// The allocator's byte budget.
        budget: usize,
        /// Bytes already reserved when the request was rejected.
        in_use: usize,
    },

    /// Columns of one relation reported unequal value counts.
    #[error("shape mismatch at column '{column}': {got} rows where {expected} were expected")]
    ShapeMismatch {
        /// Name of the column whose count disagreed.
        column: String,
        /// Row count established by the preceding columns.
        expected: usize,
        /// Row count the offending column reported.
        got: usize,
    },

    /// A column was looked up by a name the relation does not carry.
    #[error("column '{name}' not found")]
    ColumnNotFound {
        /// The missing column name.
        name: String,
    },

    /// A row index fell outside the relation's row count.
    #[error("row index {index} out of bounds for {count} rows")]
    RowOutOfBounds {
        /// The offending row index.
        index: usize,
        /// The relation's row count.
        count: usize,
    },

    /// Construction options failed validation.
    #[error("invalid options: {message}")]
    InvalidOptions {
        /// What was wrong with the options.
        message: String,
    },
}

impl Error {
    /// Attribute a column name to an error raised below the column level.
    #[must_use]
    pub fn for_column(self, name: &str) -> Error {
        match self {
            Error::TypeMismatch {
                expected, found, ..
            } => Error::TypeMismatch {
                column: name.to_string(),
                expected,
                found,
            },
            Error::ShapeMismatch { expected, got, .. } => Error::ShapeMismatch {
                column: name.to_string(),
                expected,
                got,
            },
            other => other,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
