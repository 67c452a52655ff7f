//! Connection and transaction traits.

use crate::error::{EngineError, EngineResult};
use crate::request::{CursorCallback, CursorRequest, Request, RequestCallback, TransactionMode};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identifier of a transaction, unique per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Creates a new transaction ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

/// How a transaction finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    /// Every request succeeded and writes are visible.
    Complete,
    /// Nothing was written. Carries the failing request's error, or
    /// `None` when the transaction was aborted explicitly.
    Aborted(Option<EngineError>),
}

/// Callback invoked exactly once when a transaction finishes.
pub type CompletionCallback = Box<dyn FnOnce(TransactionOutcome) + Send + 'static>;

/// Requests an abort of a transaction from outside its issue phase.
///
/// Aborting after the transaction finished has no effect.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    /// Creates a handle that has not been triggered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the abort.
    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether an abort was requested.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// A transaction over a fixed set of collections.
///
/// A transaction has two phases. During the issue phase the caller
/// issues requests and opens cursors; issuance never blocks and never
/// yields. [`EngineTransaction::commit`] ends the issue phase and hands
/// the queued work to the engine, which processes it in issue order and
/// then reports one [`TransactionOutcome`]. Dropping a transaction
/// without committing it commits it.
pub trait EngineTransaction: Send {
    /// Returns the transaction ID.
    fn id(&self) -> TransactionId;

    /// Returns the access mode.
    fn mode(&self) -> TransactionMode;

    /// Returns the collections the transaction may touch.
    fn scope(&self) -> &[String];

    /// Queues a request.
    ///
    /// # Errors
    ///
    /// Fails synchronously (and queues nothing) when the request names a
    /// collection or index outside the scope, writes in a read-only
    /// transaction, or is otherwise malformed.
    fn issue(&self, request: Request, callback: RequestCallback) -> EngineResult<()>;

    /// Queues a cursor walk.
    ///
    /// # Errors
    ///
    /// Fails synchronously under the same conditions as [`EngineTransaction::issue`].
    fn open_cursor(&self, cursor: CursorRequest, callback: CursorCallback) -> EngineResult<()>;

    /// Registers the completion callback, replacing any earlier one.
    fn on_complete(&self, callback: CompletionCallback);

    /// Returns a handle that can abort the transaction later.
    fn abort_handle(&self) -> AbortHandle;

    /// Ends the issue phase.
    fn commit(self: Box<Self>);
}

/// An open, versioned, named connection to the host engine.
pub trait Connection: Send + Sync {
    /// Database name.
    fn name(&self) -> &str;

    /// Schema version.
    fn version(&self) -> u32;

    /// Names of all collections, sorted.
    fn collection_names(&self) -> Vec<String>;

    /// Opens a transaction over `scope`.
    ///
    /// # Errors
    ///
    /// Fails if the scope is empty or names an unknown collection.
    fn transaction(
        &self,
        scope: &[String],
        mode: TransactionMode,
    ) -> EngineResult<Box<dyn EngineTransaction>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_handle_is_shared() {
        let handle = AbortHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_aborted());
        clone.abort();
        assert!(handle.is_aborted());
    }

    #[test]
    fn transaction_id_display() {
        assert_eq!(TransactionId::new(9).to_string(), "txn:9");
    }
}
