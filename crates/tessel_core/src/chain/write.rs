//! Write chains.

use super::operation::{DeleteTarget, WriteOp};
use super::scope::{check_scope, distinct};
use crate::bridge::issue_phase;
use crate::error::{CoreError, CoreResult};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tessel_engine::{Connection, Key, KeyRange, TransactionMode};
use tracing::{debug, trace};

/// Batches writes across collections into one atomic transaction.
///
/// Either every queued write takes effect or none does. Like
/// [`super::ReadChain`], the chain runs once.
pub struct WriteChain {
    connection: Arc<dyn Connection>,
    scope: Vec<String>,
    queue: Vec<WriteOp>,
    consumed: bool,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for WriteChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteChain")
            .field("scope", &self.scope)
            .field("queue", &self.queue)
            .field("consumed", &self.consumed)
            .finish()
    }
}

impl WriteChain {
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
    pub fn operations(&self) -> &[WriteOp] {
        &self.queue
    }

    /// Queues an insert-or-replace with an in-line or generated key.
    pub fn put(&mut self, collection: impl Into<String>, value: Value) -> &mut Self {
        self.push(WriteOp::Put {
            collection: collection.into(),
            value,
            key: None,
        })
    }

    /// Queues an insert-or-replace under an out-of-line key.
    pub fn put_with_key(
        &mut self,
        collection: impl Into<String>,
        value: Value,
        key: impl Into<Key>,
    ) -> &mut Self {
        self.push(WriteOp::Put {
            collection: collection.into(),
            value,
            key: Some(key.into()),
        })
    }

    /// Queues an insert that fails if the key exists.
    pub fn add(&mut self, collection: impl Into<String>, value: Value) -> &mut Self {
        self.push(WriteOp::Add {
            collection: collection.into(),
            value,
            key: None,
        })
    }

    /// Queues an insert under an out-of-line key that fails if the key
    /// exists.
    pub fn add_with_key(
        &mut self,
        collection: impl Into<String>,
        value: Value,
        key: impl Into<Key>,
    ) -> &mut Self {
        self.push(WriteOp::Add {
            collection: collection.into(),
            value,
            key: Some(key.into()),
        })
    }

    /// Queues removal of one record.
    pub fn delete(&mut self, collection: impl Into<String>, key: impl Into<Key>) -> &mut Self {
        self.push(WriteOp::Delete {
            collection: collection.into(),
            target: DeleteTarget::Key(key.into()),
        })
    }

    /// Queues removal of every record in `range`.
    pub fn delete_range(&mut self, collection: impl Into<String>, range: KeyRange) -> &mut Self {
        self.push(WriteOp::Delete {
            collection: collection.into(),
            target: DeleteTarget::Range(range),
        })
    }

    /// Queues removal of every record.
    pub fn clear(&mut self, collection: impl Into<String>) -> &mut Self {
        self.push(WriteOp::Clear {
            collection: collection.into(),
        })
    }

    /// Queues an operation.
    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.queue.push(op);
        self
    }

    /// Applies every queued write in one transaction.
    ///
    /// An empty queue resolves immediately and opens no transaction.
    ///
    /// # Errors
    ///
    /// - [`CoreError::ChainConsumed`] on a second call
    /// - [`CoreError::ScopeViolation`] before anything is opened
    /// - the engine's error verbatim if any write fails; nothing is written
    /// - [`CoreError::TransactionAborted`] or [`CoreError::Timeout`]
    pub async fn commit(&mut self) -> CoreResult<()> {
        if std::mem::replace(&mut self.consumed, true) {
            return Err(CoreError::ChainConsumed);
        }
        let queue = std::mem::take(&mut self.queue);
        if queue.is_empty() {
            debug!(scope = ?self.scope, "empty write chain, nothing to do");
            return Ok(());
        }

        let referenced = distinct(queue.iter().map(WriteOp::collection));
        check_scope(&self.scope, referenced.iter().copied())?;
        debug!(scope = ?self.scope, ?referenced, operations = queue.len(), "committing write chain");

        let txn = self
            .connection
            .transaction(&self.scope, TransactionMode::ReadWrite)?;
        let ((), completion) = issue_phase(txn, |txn| {
            for op in queue {
                let request = op.into_request();
                trace!(request = request.kind.name(), collection = %request.collection, "issuing write");
                // Failures surface through the transaction outcome.
                txn.issue(request, Box::new(|_| {}))?;
            }
            Ok(())
        })?;
        completion.wait(self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::database::Database;
    use serde_json::json;
    use tessel_engine::{
        AbortHandle, CollectionSchema, CompletionCallback, CursorCallback, CursorRequest,
        EngineResult, EngineTransaction, IndexSchema, MemoryEngine, Request, RequestCallback,
        TransactionId,
    };

    fn shop() -> (MemoryEngine, Database) {
        let engine = MemoryEngine::builder("shop", 1)
            .collection(CollectionSchema::new("users").key_path("id"))
            .collection(CollectionSchema::new("posts").key_path("id"))
            .collection(
                CollectionSchema::new("accounts")
                    .key_path("id")
                    .index(IndexSchema::new("email", "email").unique()),
            )
            .collection(CollectionSchema::new("settings"))
            .build()
            .unwrap();
        (engine.clone(), Database::new(engine))
    }

    #[tokio::test]
    async fn writes_across_collections_commit_together() {
        let (engine, db) = shop();
        let mut chain = db.write(["users", "posts", "settings"]);
        chain
            .put("users", json!({"id": "u1", "name": "Ada"}))
            .add("posts", json!({"id": "p1", "author": "u1"}))
            .put_with_key("settings", json!("dark"), "theme");
        chain.commit().await.unwrap();

        assert_eq!(engine.record_count("users"), Some(1));
        assert_eq!(engine.record_count("posts"), Some(1));
        assert_eq!(engine.records("settings").unwrap(), vec![json!("dark")]);
    }

    #[tokio::test]
    async fn scope_violation_writes_nothing() {
        let (engine, db) = shop();
        let mut chain = db.write(["users"]);
        chain
            .put("users", json!({"id": "u1"}))
            .delete("posts", "p9");
        let err = chain.commit().await.unwrap_err();

        assert_eq!(err, CoreError::scope_violation("posts", &["users".to_string()]));
        assert_eq!(engine.record_count("users"), Some(0));
        assert_eq!(engine.stats().snapshot().transactions_opened, 0);
    }

    #[tokio::test]
    async fn unique_conflict_rolls_back_everything() {
        let (engine, db) = shop();
        let mut chain = db.write(["accounts", "users"]);
        chain
            .put("users", json!({"id": "u1"}))
            .put("accounts", json!({"id": 1, "email": "a@x.io"}))
            .put("accounts", json!({"id": 2, "email": "a@x.io"}));
        let err = chain.commit().await.unwrap_err();

        assert_eq!(err.as_engine().map(|e| e.name()), Some("ConstraintError"));
        assert_eq!(engine.record_count("users"), Some(0));
        assert_eq!(engine.record_count("accounts"), Some(0));
    }

    #[tokio::test]
    async fn operations_apply_in_enqueue_order() {
        let (engine, db) = shop();
        let mut chain = db.write(["users"]);
        chain
            .put("users", json!({"id": "u1", "v": 1}))
            .delete("users", "u1")
            .put("users", json!({"id": "u1", "v": 2}))
            .put("users", json!({"id": "u2"}))
            .delete_range("users", KeyRange::only("u2"));
        chain.commit().await.unwrap();
        assert_eq!(
            engine.records("users").unwrap(),
            vec![json!({"id": "u1", "v": 2})]
        );

        let mut chain = db.write(["users"]);
        chain.clear("users");
        chain.commit().await.unwrap();
        assert_eq!(engine.record_count("users"), Some(0));
    }

    #[tokio::test]
    async fn reuse_after_commit_fails() {
        let (_, db) = shop();
        let mut chain = db.write(["users"]);
        chain.add_with_key("users", json!({"id": "u1"}), "ignored");
        // In-line key collections refuse explicit keys.
        assert!(chain.commit().await.is_err());
        assert_eq!(chain.commit().await.unwrap_err(), CoreError::ChainConsumed);
    }

    #[tokio::test]
    async fn empty_commit_is_a_no_op() {
        let (engine, db) = shop();
        db.write(["users"]).commit().await.unwrap();
        assert_eq!(engine.stats().snapshot().transactions_opened, 0);
    }

    /// Hands each commit to the engine only after `delay`.
    struct Slow {
        engine: MemoryEngine,
        delay: Duration,
    }

    struct SlowTransaction {
        inner: Box<dyn EngineTransaction>,
        delay: Duration,
    }

    impl Connection for Slow {
        fn name(&self) -> &str {
            self.engine.name()
        }
        fn version(&self) -> u32 {
            self.engine.version()
        }
        fn collection_names(&self) -> Vec<String> {
            self.engine.collection_names()
        }
        fn transaction(
            &self,
            scope: &[String],
            mode: TransactionMode,
        ) -> EngineResult<Box<dyn EngineTransaction>> {
            Ok(Box::new(SlowTransaction {
                inner: self.engine.transaction(scope, mode)?,
                delay: self.delay,
            }))
        }
    }

    impl EngineTransaction for SlowTransaction {
        fn id(&self) -> TransactionId {
            self.inner.id()
        }
        fn mode(&self) -> TransactionMode {
            self.inner.mode()
        }
        fn scope(&self) -> &[String] {
            self.inner.scope()
        }
        fn issue(&self, request: Request, callback: RequestCallback) -> EngineResult<()> {
            self.inner.issue(request, callback)
        }
        fn open_cursor(&self, cursor: CursorRequest, callback: CursorCallback) -> EngineResult<()> {
            self.inner.open_cursor(cursor, callback)
        }
        fn on_complete(&self, callback: CompletionCallback) {
            self.inner.on_complete(callback);
        }
        fn abort_handle(&self) -> AbortHandle {
            self.inner.abort_handle()
        }
        fn commit(self: Box<Self>) {
            let SlowTransaction { inner, delay } = *self;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                inner.commit();
            });
        }
    }

    #[tokio::test]
    async fn timed_out_commit_aborts_and_writes_nothing() {
        let (engine, _) = shop();
        let slow = Slow {
            engine: engine.clone(),
            delay: Duration::from_millis(100),
        };
        let after = Duration::from_millis(10);
        let db = Database::with_config(slow, Config::new().timeout(after));

        let mut chain = db.write(["users", "posts"]);
        chain
            .put("users", json!({"id": "u1"}))
            .put("posts", json!({"id": "p1"}));
        assert_eq!(chain.commit().await.unwrap_err(), CoreError::Timeout { after });

        // Let the delayed commit reach the engine.
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(engine.record_count("users"), Some(0));
        assert_eq!(engine.record_count("posts"), Some(0));
        assert_eq!(engine.stats().snapshot().transactions_aborted, 1);
    }
}
