//! Error types for Tessel core.

use std::time::Duration;
use tessel_engine::EngineError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in queries and transaction chains.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// An operation names a collection outside the chain's scope.
    #[error("collection {collection:?} is outside the declared scope {scope:?}")]
    ScopeViolation {
        /// The first offending collection, in enqueue order.
        collection: String,
        /// The scope the chain was created with.
        scope: Vec<String>,
    },

    /// The host engine rejected a request or the transaction.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The transaction aborted without reporting an error.
    #[error("transaction aborted")]
    TransactionAborted,

    /// A condition or plan is malformed or contradictory.
    #[error("validation error: {message}")]
    Validation {
        /// What was wrong.
        message: String,
    },

    /// A chain was executed twice.
    #[error("chain already executed")]
    ChainConsumed,

    /// The call did not complete in time and its transaction was aborted.
    #[error("timed out after {after:?}")]
    Timeout {
        /// The configured timeout.
        after: Duration,
    },

    /// The engine answered with an output of the wrong shape.
    #[error("protocol error: {message}")]
    Protocol {
        /// Expected and received shapes.
        message: String,
    },
}

impl CoreError {
    /// Creates a scope violation error.
    pub fn scope_violation(collection: impl Into<String>, scope: &[String]) -> Self {
        Self::ScopeViolation {
            collection: collection.into(),
            scope: scope.to_vec(),
        }
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a protocol error for an unexpected output shape.
    pub fn unexpected_output(expected: &str, got: &str) -> Self {
        Self::Protocol {
            message: format!("expected {expected}, engine returned {got}"),
        }
    }

    /// Returns the engine error, if this wraps one.
    #[must_use]
    pub fn as_engine(&self) -> Option<&EngineError> {
        match self {
            Self::Engine(error) => Some(error),
            _ => None,
        }
    }
}
