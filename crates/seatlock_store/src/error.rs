//! Error types for seat store operations.

use crate::types::SeatId;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during seat store operations.
///
/// The two variants callers must be able to distinguish are
/// [`UniqueViolation`](Self::UniqueViolation) (another transaction's insert
/// landed first; the seat is genuinely gone) and
/// [`SerializationConflict`](Self::SerializationConflict) (transient; the
/// transaction may be retried). Everything else is a store malfunction.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The reservation ledger already holds a confirmed record for the seat.
    #[error("unique constraint violation: {seat} already has a confirmed reservation")]
    UniqueViolation {
        /// The seat whose constraint was violated.
        seat: SeatId,
    },

    /// The transaction cannot commit or read without violating its
    /// isolation level.
    #[error("could not serialize access to {seat} due to a concurrent transaction")]
    SerializationConflict {
        /// The seat the conflict was detected on.
        seat: SeatId,
    },

    /// The seat does not exist in the store.
    #[error("{seat} not found")]
    SeatNotFound {
        /// The seat that was looked up.
        seat: SeatId,
    },

    /// The store cannot be reached.
    #[error("store is unreachable")]
    Unreachable,

    /// Operation not permitted in the transaction's current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Any other store-level failure.
    #[error("store error: {0}")]
    Other(String),
}

impl StoreError {
    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates an uncategorized store error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// Returns true if this is the ledger uniqueness constraint firing.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation { .. })
    }

    /// Returns true if this is a transient conflict the caller may retry.
    #[must_use]
    pub fn is_serialization_conflict(&self) -> bool {
        matches!(self, Self::SerializationConflict { .. })
    }
}
