//! Read chains.

use super::operation::ReadOp;
use super::scope::{check_scope, distinct};
use crate::bridge::{issue_phase, pending_request, PendingRequest};
use crate::error::{CoreError, CoreResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tessel_engine::{Connection, Key, KeyRange, RequestOutput, TransactionMode};
use tracing::debug;

/// Result of one queued read, aligned with its position in the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutput {
    /// Result of [`ReadChain::get`].
    Record(Option<Value>),
    /// Result of [`ReadChain::get_all`] and [`ReadChain::get_all_by_index`].
    Records(Vec<Value>),
    /// Result of [`ReadChain::count`].
    Count(u64),
}

impl ReadOutput {
    /// The record, if this is a `get` result that found one.
    #[must_use]
    pub fn record(&self) -> Option<&Value> {
        match self {
            ReadOutput::Record(record) => record.as_ref(),
            _ => None,
        }
    }

    /// The records, if this is a `get_all` result.
    #[must_use]
    pub fn records(&self) -> Option<&[Value]> {
        match self {
            ReadOutput::Records(records) => Some(records),
            _ => None,
        }
    }

    /// The count, if this is a `count` result.
    #[must_use]
    pub fn count(&self) -> Option<u64> {
        match self {
            ReadOutput::Count(count) => Some(*count),
            _ => None,
        }
    }

    fn from_engine(expected: &str, output: RequestOutput) -> CoreResult<Self> {
        match (expected, output) {
            ("record", RequestOutput::Record(record)) => Ok(ReadOutput::Record(record)),
            ("records", RequestOutput::Records(records)) => Ok(ReadOutput::Records(records)),
            ("count", RequestOutput::Count(count)) => Ok(ReadOutput::Count(count)),
            (expected, other) => Err(CoreError::unexpected_output(expected, other.shape())),
        }
    }
}

/// Batches reads across collections into one read-only transaction.
///
/// Methods append to the queue and return the chain for further calls.
/// [`ReadChain::execute`] runs the queue once; calling it again fails
/// with [`CoreError::ChainConsumed`].
pub struct ReadChain {
    connection: Arc<dyn Connection>,
    scope: Vec<String>,
    queue: Vec<ReadOp>,
    consumed: bool,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for ReadChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadChain")
            .field("scope", &self.scope)
            .field("queue", &self.queue)
            .field("consumed", &self.consumed)
            .finish()
    }
}

impl ReadChain {
    pub(crate) fn new(
        connection: Arc<dyn Connection>,
        scope: Vec<String>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            connection,
            scope,
            queue: Vec::new(),
            consumed: false,
            timeout,
        }
    }

    /// The declared scope.
    #[must_use]
    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    /// Queued operations.
    #[must_use]
    pub fn operations(&self) -> &[ReadOp] {
        &self.queue
    }

    /// Queues a read of one record.
    pub fn get(&mut self, collection: impl Into<String>, key: impl Into<Key>) -> &mut Self {
        self.push(ReadOp::Get {
            collection: collection.into(),
            key: key.into(),
        })
    }

    /// Queues a read of every record in `range`, at most `count`.
    pub fn get_all(
        &mut self,
        collection: impl Into<String>,
        range: Option<KeyRange>,
        count: Option<u32>,
    ) -> &mut Self {
        self.push(ReadOp::GetAll {
            collection: collection.into(),
            range,
            count,
        })
    }

    /// Queues a read through an index.
    pub fn get_all_by_index(
        &mut self,
        collection: impl Into<String>,
        index: impl Into<String>,
        range: Option<KeyRange>,
    ) -> &mut Self {
        self.push(ReadOp::GetAllByIndex {
            collection: collection.into(),
            index: index.into(),
            range,
        })
    }

    /// Queues a count.
    pub fn count(&mut self, collection: impl Into<String>, range: Option<KeyRange>) -> &mut Self {
        self.push(ReadOp::Count {
            collection: collection.into(),
            range,
        })
    }

    /// Queues an operation.
    pub fn push(&mut self, op: ReadOp) -> &mut Self {
        self.queue.push(op);
        self
    }

    /// Runs every queued read in one transaction.
    ///
    /// Resolves with one output per operation, in enqueue order. An empty
    /// queue resolves with no outputs and opens no transaction.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ChainConsumed`] on a second call
    /// - [`CoreError::ScopeViolation`] before anything is opened
    /// - the engine's error verbatim if any read fails
    pub async fn execute(&mut self) -> CoreResult<Vec<ReadOutput>> {
        if std::mem::replace(&mut self.consumed, true) {
            return Err(CoreError::ChainConsumed);
        }
        let queue = std::mem::take(&mut self.queue);
        if queue.is_empty() {
            debug!(scope = ?self.scope, "empty read chain, nothing to do");
            return Ok(Vec::new());
        }

        let referenced = distinct(queue.iter().map(ReadOp::collection));
        check_scope(&self.scope, referenced.iter().copied())?;
        debug!(scope = ?self.scope, ?referenced, operations = queue.len(), "executing read chain");

        let txn = self
            .connection
            .transaction(&self.scope, TransactionMode::ReadOnly)?;
        let (slots, completion) = issue_phase(txn, |txn| {
            let mut slots: Vec<(&'static str, PendingRequest)> = Vec::with_capacity(queue.len());
            for op in queue {
                let expected = op.expected_shape();
                let (callback, pending) = pending_request();
                txn.issue(op.into_request(), callback)?;
                slots.push((expected, pending));
            }
            Ok(slots)
        })?;
        completion.wait(self.timeout).await?;

        slots
            .into_iter()
            .map(|(expected, pending)| ReadOutput::from_engine(expected, pending.take()?))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use serde_json::json;
    use tessel_engine::{Dump, MemoryEngine};

    fn blog() -> (MemoryEngine, Database) {
        let dump: Dump = serde_json::from_value(json!({
            "name": "blog",
            "version": 1,
            "collections": [
                {
                    "name": "users",
                    "keyPath": "id",
                    "records": [{"id": "u1", "name": "Ada"}, {"id": "u2", "name": "Lin"}]
                },
                {
                    "name": "posts",
                    "keyPath": "id",
                    "indexes": [{"name": "author", "keyPath": "author"}],
                    "records": [
                        {"id": "p1", "author": "u1"},
                        {"id": "p2", "author": "u2"},
                        {"id": "p3", "author": "u1"}
                    ]
                },
                {"name": "tags", "keyPath": "id"}
            ]
        }))
        .unwrap();
        let engine = MemoryEngine::from_dump(dump).unwrap();
        (engine.clone(), Database::new(engine))
    }

    #[tokio::test]
    async fn outputs_align_with_enqueue_order() {
        let (engine, db) = blog();
        let before = engine.stats().snapshot();
        let mut chain = db.read(["users", "posts"]);
        chain
            .count("posts", None)
            .get("users", "u1")
            .get_all_by_index("posts", "author", Some(KeyRange::only("u1")))
            .get("users", "nobody");
        let outputs = chain.execute().await.unwrap();

        assert_eq!(outputs.len(), 4);
        assert_eq!(outputs[0].count(), Some(3));
        assert_eq!(outputs[1].record().unwrap()["name"], json!("Ada"));
        assert_eq!(outputs[2].records().unwrap().len(), 2);
        assert_eq!(outputs[3], ReadOutput::Record(None));
        assert_eq!(engine.stats().snapshot().since(&before).transactions_opened, 1);
    }

    #[tokio::test]
    async fn second_execute_fails_loudly() {
        let (_, db) = blog();
        let mut chain = db.read(["users"]);
        chain.count("users", None);
        chain.execute().await.unwrap();
        assert_eq!(chain.execute().await.unwrap_err(), CoreError::ChainConsumed);
    }

    #[tokio::test]
    async fn empty_chain_opens_nothing() {
        let (engine, db) = blog();
        let outputs = db.read(["users"]).execute().await.unwrap();
        assert!(outputs.is_empty());
        assert_eq!(engine.stats().snapshot().transactions_opened, 0);
    }

    #[tokio::test]
    async fn out_of_scope_read_is_rejected() {
        let (engine, db) = blog();
        let mut chain = db.read(["users"]);
        chain.get("users", "u1").count("tags", None).count("posts", None);
        let err = chain.execute().await.unwrap_err();
        assert_eq!(err, CoreError::scope_violation("tags", &["users".to_string()]));
        assert_eq!(engine.stats().snapshot().transactions_opened, 0);
    }

    #[tokio::test]
    async fn transaction_covers_full_scope() {
        let (engine, db) = blog();
        let mut chain = db.read(["users", "posts", "tags"]);
        chain.get_all("users", None, Some(1));
        let outputs = chain.execute().await.unwrap();
        assert_eq!(outputs[0].records().unwrap().len(), 1);
        // An unknown collection in scope fails when the transaction opens.
        let mut chain = db.read(["users", "ghosts"]);
        chain.get("users", "u1");
        let err = chain.execute().await.unwrap_err();
        assert_eq!(err.as_engine().map(|e| e.name()), Some("NotFoundError"));
        assert_eq!(engine.stats().snapshot().transactions_opened, 1);
    }
}
