//! Completion bridge.
//!
//! The host engine reports results through callbacks: one per request and
//! one for the whole transaction. This module turns those callbacks into
//! single-resolution awaitables built on `futures_channel::oneshot`:
//!
//! - [`Completion`] resolves once when the transaction finishes. An abort
//!   without an error, or a callback that is dropped without firing,
//!   becomes [`CoreError::TransactionAborted`], so no caller waits forever.
//! - [`Pending`] holds the result of one request or cursor walk.
//!
//! [`issue_phase`] is the only way the core talks to a transaction. It
//! runs a synchronous closure that issues every request, then commits.
//! The closure cannot await, so nothing can be scheduled between two
//! issuances on the same transaction.

use crate::error::{CoreError, CoreResult};
use futures_channel::oneshot;
use std::time::Duration;
use tessel_engine::{
    AbortHandle, EngineResult, EngineTransaction, RequestCallback, RequestOutput,
    TransactionId, TransactionOutcome,
};
use tracing::{debug, warn};

/// Awaitable completion of one transaction.
#[derive(Debug)]
pub struct Completion {
    id: TransactionId,
    receiver: oneshot::Receiver<TransactionOutcome>,
    abort: AbortHandle,
}

impl Completion {
    /// Registers a completion callback on `txn`.
    pub fn attach(txn: &dyn EngineTransaction) -> Self {
        let (sender, receiver) = oneshot::channel();
        txn.on_complete(Box::new(move |outcome| {
            // The receiver may be gone after a timeout.
            let _ = sender.send(outcome);
        }));
        Self {
            id: txn.id(),
            receiver,
            abort: txn.abort_handle(),
        }
    }

    /// Returns the transaction ID.
    #[must_use]
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Waits for the transaction to finish.
    ///
    /// With a timeout, the transaction is aborted when the timer fires
    /// first. The timer is a Tokio timer: outside a Tokio runtime the
    /// timeout is ignored and the wait is unbounded. A runtime built
    /// without the time driver still panics.
    ///
    /// # Errors
    ///
    /// - [`CoreError::Engine`] with the engine's error when a request failed
    /// - [`CoreError::TransactionAborted`] when the transaction aborted
    ///   without an error
    /// - [`CoreError::Timeout`] when the timer fired first
    pub async fn wait(self, timeout: Option<Duration>) -> CoreResult<()> {
        let Self {
            id,
            receiver,
            abort,
        } = self;

        let received = match timeout {
            None => receiver.await,
            Some(after) if tokio::runtime::Handle::try_current().is_err() => {
                warn!(txn = %id, ?after, "no Tokio runtime, waiting without a timeout");
                receiver.await
            }
            Some(after) => match tokio::time::timeout(after, receiver).await {
                Ok(received) => received,
                Err(_) => {
                    abort.abort();
                    warn!(txn = %id, ?after, "transaction timed out, aborting");
                    return Err(CoreError::Timeout { after });
                }
            },
        };

        match received {
            Ok(TransactionOutcome::Complete) => Ok(()),
            Ok(TransactionOutcome::Aborted(Some(error))) => Err(CoreError::Engine(error)),
            Ok(TransactionOutcome::Aborted(None)) => Err(CoreError::TransactionAborted),
            Err(oneshot::Canceled) => {
                warn!(txn = %id, "completion callback dropped without firing");
                Err(CoreError::TransactionAborted)
            }
        }
    }
}

/// Result slot filled by an engine callback.
#[derive(Debug)]
pub struct Pending<T> {
    receiver: oneshot::Receiver<EngineResult<T>>,
}

/// Result slot of one issued request.
pub type PendingRequest = Pending<RequestOutput>;

/// Sending half of a [`Pending`] slot.
#[derive(Debug)]
pub struct Resolver<T> {
    sender: oneshot::Sender<EngineResult<T>>,
}

impl<T> Resolver<T> {
    /// Fills the slot. Has no effect if the slot was dropped.
    pub fn resolve(self, result: EngineResult<T>) {
        let _ = self.sender.send(result);
    }
}

/// Creates an empty slot and its resolver.
pub fn pending<T>() -> (Resolver<T>, Pending<T>) {
    let (sender, receiver) = oneshot::channel();
    (Resolver { sender }, Pending { receiver })
}

/// Creates a request callback and the slot it fills.
pub fn pending_request() -> (RequestCallback, PendingRequest) {
    let (resolver, pending) = pending();
    let callback: RequestCallback = Box::new(move |result| resolver.resolve(result));
    (callback, pending)
}

impl<T> Pending<T> {
    /// Takes the result once the owning transaction has completed.
    ///
    /// # Errors
    ///
    /// Returns the engine's error verbatim, or
    /// [`CoreError::TransactionAborted`] if the engine never answered.
    pub fn take(mut self) -> CoreResult<T> {
        match self.receiver.try_recv() {
            Ok(Some(result)) => result.map_err(CoreError::from),
            Ok(None) | Err(oneshot::Canceled) => Err(CoreError::TransactionAborted),
        }
    }
}

/// Runs the issue phase of `txn` and commits it.
///
/// `issue` receives the transaction and must issue every request it
/// needs before returning. If it fails, the transaction is aborted and
/// the error returned; nothing it issued takes effect.
///
/// # Errors
///
/// Returns the error produced by `issue`.
pub fn issue_phase<T, F>(txn: Box<dyn EngineTransaction>, issue: F) -> CoreResult<(T, Completion)>
where
    F: FnOnce(&dyn EngineTransaction) -> CoreResult<T>,
{
    let completion = Completion::attach(txn.as_ref());
    match issue(txn.as_ref()) {
        Ok(value) => {
            debug!(txn = %completion.id(), "issue phase complete, committing");
            txn.commit();
            Ok((value, completion))
        }
        Err(error) => {
            debug!(txn = %completion.id(), %error, "issue phase failed, aborting");
            txn.abort_handle().abort();
            txn.commit();
            Err(error)
        }
    }
}
