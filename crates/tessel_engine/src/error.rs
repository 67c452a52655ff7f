//! Error types reported by the host engine.
//!
//! Variant names follow the exception names a browser-style key-value
//! engine reports, so callers can match on the same failure kinds they
//! would see from the real engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that the host engine reports for requests and transactions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// A write violated a key or unique-index constraint.
    #[error("constraint error: {message}")]
    Constraint {
        /// Description of the violated constraint.
        message: String,
    },

    /// A key, key range or record was not valid for the request.
    #[error("data error: {message}")]
    Data {
        /// Description of the invalid data.
        message: String,
    },

    /// A collection or index does not exist (or is outside the transaction scope).
    #[error("not found: {message}")]
    NotFound {
        /// What was looked up.
        message: String,
    },

    /// A write was issued against a read-only transaction.
    #[error("read-only transaction cannot issue {request}")]
    ReadOnly {
        /// The rejected request kind.
        request: String,
    },

    /// The request is not allowed against this object.
    #[error("invalid access: {message}")]
    InvalidAccess {
        /// Description of the access violation.
        message: String,
    },

    /// The object is in a state that does not allow the request.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of the state problem.
        message: String,
    },

    /// The transaction is no longer accepting requests.
    #[error("transaction is not active")]
    TransactionInactive,

    /// The request was cancelled because its transaction aborted.
    #[error("request aborted")]
    Abort,
}

impl EngineError {
    /// Creates a constraint error.
    pub fn constraint(message: impl Into<String>) -> Self {
        Self::Constraint {
            message: message.into(),
        }
    }

    /// Creates a data error.
    pub fn data(message: impl Into<String>) -> Self {
        Self::Data {
            message: message.into(),
        }
    }

    /// Creates a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a read-only error for the named request kind.
    pub fn read_only(request: impl Into<String>) -> Self {
        Self::ReadOnly {
            request: request.into(),
        }
    }

    /// Creates an invalid access error.
    pub fn invalid_access(message: impl Into<String>) -> Self {
        Self::InvalidAccess {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Returns the engine's name for this error kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constraint { .. } => "ConstraintError",
            Self::Data { .. } => "DataError",
            Self::NotFound { .. } => "NotFoundError",
            Self::ReadOnly { .. } => "ReadOnlyError",
            Self::InvalidAccess { .. } => "InvalidAccessError",
            Self::InvalidState { .. } => "InvalidStateError",
            Self::TransactionInactive => "TransactionInactiveError",
            Self::Abort => "AbortError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_message() {
        let err = EngineError::constraint("key already exists");
        assert_eq!(err.to_string(), "constraint error: key already exists");
        assert_eq!(err.name(), "ConstraintError");
    }

    #[test]
    fn read_only_names_request() {
        let err = EngineError::read_only("put");
        assert!(err.to_string().contains("put"));
    }
}
