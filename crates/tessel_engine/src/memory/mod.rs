//! In-memory host engine.
//!
//! [`MemoryEngine`] implements [`Connection`] entirely in memory. It is
//! the engine used by tests, benchmarks and the CLI, and it follows the
//! same rules a browser-style engine enforces: scoped transactions,
//! read-only checks at issue time, whole-transaction abort on the first
//! failing request, and changes published only on completion.
//!
//! # Example
//!
//! ```rust
//! use tessel_engine::{CollectionSchema, IndexSchema, MemoryEngine};
//!
//! let engine = MemoryEngine::builder("shop", 1)
//!     .collection(
//!         CollectionSchema::new("products")
//!             .key_path("id")
//!             .index(IndexSchema::new("price", "price")),
//!     )
//!     .build()
//!     .unwrap();
//! assert_eq!(engine.record_count("products"), Some(0));
//! ```

mod dump;
mod store;
mod transaction;

pub use dump::{CollectionDump, Dump};
pub use transaction::MemoryTransaction;

use crate::error::{EngineError, EngineResult};
use crate::request::TransactionMode;
use crate::schema::CollectionSchema;
use crate::stats::EngineStats;
use crate::transaction::{Connection, EngineTransaction, TransactionId};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use store::CollectionData;
use tracing::debug;

/// Shared state behind every handle and transaction of one engine.
pub(crate) struct EngineInner {
    name: String,
    version: u32,
    pub(crate) state: RwLock<BTreeMap<String, CollectionData>>,
    pub(crate) stats: EngineStats,
    next_txid: AtomicU64,
}

/// An in-memory, versioned, named database.
///
/// Cloning is cheap; clones share the same data.
#[derive(Clone)]
pub struct MemoryEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEngine")
            .field("name", &self.inner.name)
            .field("version", &self.inner.version)
            .field("collections", &self.collection_names())
            .finish()
    }
}

impl MemoryEngine {
    /// Starts declaring a database.
    pub fn builder(name: impl Into<String>, version: u32) -> MemoryEngineBuilder {
        MemoryEngineBuilder {
            name: name.into(),
            version,
            collections: Vec::new(),
        }
    }

    /// Returns the engine counters.
    #[must_use]
    pub fn stats(&self) -> &EngineStats {
        &self.inner.stats
    }

    /// Returns a collection's declaration.
    #[must_use]
    pub fn collection_schema(&self, collection: &str) -> Option<CollectionSchema> {
        self.inner
            .state
            .read()
            .get(collection)
            .map(|data| data.schema().clone())
    }

    /// Returns the number of committed records in a collection.
    #[must_use]
    pub fn record_count(&self, collection: &str) -> Option<usize> {
        self.inner.state.read().get(collection).map(CollectionData::len)
    }

    /// Returns the committed records of a collection in primary key order.
    ///
    /// Reads outside any transaction; meant for inspection and tests.
    #[must_use]
    pub fn records(&self, collection: &str) -> Option<Vec<Value>> {
        self.inner
            .state
            .read()
            .get(collection)
            .map(|data| data.records().map(|(_, v)| v.clone()).collect())
    }
}

impl Connection for MemoryEngine {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn version(&self) -> u32 {
        self.inner.version
    }

    fn collection_names(&self) -> Vec<String> {
        self.inner.state.read().keys().cloned().collect()
    }

    fn transaction(
        &self,
        scope: &[String],
        mode: TransactionMode,
    ) -> EngineResult<Box<dyn EngineTransaction>> {
        if scope.is_empty() {
            return Err(EngineError::invalid_access(
                "a transaction needs at least one collection",
            ));
        }
        {
            let state = self.inner.state.read();
            if let Some(missing) = scope.iter().find(|name| !state.contains_key(*name)) {
                return Err(EngineError::not_found(format!("collection {missing:?}")));
            }
        }

        let id = TransactionId::new(self.inner.next_txid.fetch_add(1, Ordering::SeqCst));
        self.inner.stats.record_open();
        debug!(txn = %id, %mode, ?scope, "transaction opened");

        let mut names: Vec<String> = Vec::with_capacity(scope.len());
        for name in scope {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        Ok(Box::new(MemoryTransaction::new(
            id,
            mode,
            names,
            Arc::clone(&self.inner),
        )))
    }
}

/// Declares the collections of a [`MemoryEngine`].
#[derive(Debug)]
pub struct MemoryEngineBuilder {
    name: String,
    version: u32,
    collections: Vec<CollectionSchema>,
}

impl MemoryEngineBuilder {
    /// Adds a collection.
    #[must_use]
    pub fn collection(mut self, schema: CollectionSchema) -> Self {
        self.collections.push(schema);
        self
    }

    /// Creates the engine.
    ///
    /// # Errors
    ///
    /// Returns a constraint error for duplicate collection names or
    /// duplicate index names within a collection.
    pub fn build(self) -> EngineResult<MemoryEngine> {
        let mut state = BTreeMap::new();
        for schema in self.collections {
            let mut seen: Vec<&str> = Vec::new();
            for index in &schema.indexes {
                if seen.contains(&index.name.as_str()) {
                    return Err(EngineError::constraint(format!(
                        "duplicate index {:?} on collection {:?}",
                        index.name, schema.name
                    )));
                }
                seen.push(&index.name);
            }
            if state.contains_key(&schema.name) {
                return Err(EngineError::constraint(format!(
                    "duplicate collection {:?}",
                    schema.name
                )));
            }
            state.insert(schema.name.clone(), CollectionData::new(schema));
        }

        Ok(MemoryEngine {
            inner: Arc::new(EngineInner {
                name: self.name,
                version: self.version,
                state: RwLock::new(state),
                stats: EngineStats::new(),
                next_txid: AtomicU64::new(1),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{
        CursorControl, CursorEvent, CursorRequest, Direction, Request, RequestKind, RequestOutput,
        Source,
    };
    use crate::schema::IndexSchema;
    use crate::transaction::TransactionOutcome;
    use crate::KeyRange;
    use parking_lot::Mutex;
    use serde_json::json;

    fn engine() -> MemoryEngine {
        MemoryEngine::builder("shop", 1)
            .collection(
                CollectionSchema::new("products")
                    .key_path("id")
                    .index(IndexSchema::new("price", "price")),
            )
            .collection(CollectionSchema::new("users").key_path("id"))
            .build()
            .unwrap()
    }

    fn scope(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    type Sink<T> = Arc<Mutex<Vec<T>>>;

    fn sink<T>() -> Sink<T> {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn put(collection: &str, value: Value) -> Request {
        Request::new(collection, RequestKind::Put { value, key: None })
    }

    // Without a Tokio runtime transactions are processed inline on commit.

    #[test]
    fn committed_writes_become_visible() {
        let engine = engine();
        let txn = engine
            .transaction(&scope(&["products"]), TransactionMode::ReadWrite)
            .unwrap();
        let outcomes = sink();
        let o = Arc::clone(&outcomes);
        txn.on_complete(Box::new(move |outcome| o.lock().push(outcome)));
        txn.issue(put("products", json!({"id": 1, "price": 10})), Box::new(|_| {}))
            .unwrap();
        txn.commit();

        assert_eq!(outcomes.lock().as_slice(), &[TransactionOutcome::Complete]);
        assert_eq!(engine.record_count("products"), Some(1));
        assert_eq!(engine.stats().snapshot().transactions_committed, 1);
    }

    #[test]
    fn failing_request_aborts_everything() {
        let engine = engine();
        let txn = engine
            .transaction(&scope(&["products"]), TransactionMode::ReadWrite)
            .unwrap();
        let outcomes = sink();
        let o = Arc::clone(&outcomes);
        txn.on_complete(Box::new(move |outcome| o.lock().push(outcome)));

        let results = sink();
        for value in [json!({"id": 1}), json!({"id": 1}), json!({"id": 2})] {
            let r = Arc::clone(&results);
            txn.issue(
                Request::new("products", RequestKind::Add { value, key: None }),
                Box::new(move |res| r.lock().push(res.map_err(|e| e.name()))),
            )
            .unwrap();
        }
        txn.commit();

        let results = results.lock();
        assert!(results[0].is_ok());
        assert_eq!(results[1], Err("ConstraintError"));
        assert_eq!(results[2], Err("AbortError"));
        assert!(matches!(
            outcomes.lock()[0],
            TransactionOutcome::Aborted(Some(EngineError::Constraint { .. }))
        ));
        assert_eq!(engine.record_count("products"), Some(0));
    }

    #[test]
    fn issue_checks_scope_mode_and_index() {
        let engine = engine();
        let reader = engine
            .transaction(&scope(&["products"]), TransactionMode::ReadOnly)
            .unwrap();

        let err = reader
            .issue(put("products", json!({"id": 1})), Box::new(|_| {}))
            .unwrap_err();
        assert_eq!(err.name(), "ReadOnlyError");

        let err = reader
            .issue(Request::new("users", RequestKind::Count(None)), Box::new(|_| {}))
            .unwrap_err();
        assert_eq!(err.name(), "NotFoundError");

        let err = reader
            .issue(
                Request::new("products", RequestKind::Count(None))
                    .via(Source::Index("color".into())),
                Box::new(|_| {}),
            )
            .unwrap_err();
        assert_eq!(err.name(), "NotFoundError");
    }

    #[test]
    fn transaction_rejects_bad_scope() {
        let engine = engine();
        let err = engine
            .transaction(&[], TransactionMode::ReadOnly)
            .err()
            .unwrap();
        assert_eq!(err.name(), "InvalidAccessError");
        let err = engine
            .transaction(&scope(&["orders"]), TransactionMode::ReadOnly)
            .err()
            .unwrap();
        assert_eq!(err.name(), "NotFoundError");
        assert_eq!(engine.stats().snapshot().transactions_opened, 0);
    }

    #[test]
    fn abort_handle_discards_writes() {
        let engine = engine();
        let txn = engine
            .transaction(&scope(&["users"]), TransactionMode::ReadWrite)
            .unwrap();
        let outcomes = sink();
        let o = Arc::clone(&outcomes);
        txn.on_complete(Box::new(move |outcome| o.lock().push(outcome)));
        txn.issue(put("users", json!({"id": "u1"})), Box::new(|_| {}))
            .unwrap();
        txn.abort_handle().abort();
        txn.commit();

        assert_eq!(outcomes.lock().as_slice(), &[TransactionOutcome::Aborted(None)]);
        assert_eq!(engine.record_count("users"), Some(0));
    }

    #[test]
    fn dropped_transaction_auto_commits() {
        let engine = engine();
        {
            let txn = engine
                .transaction(&scope(&["users"]), TransactionMode::ReadWrite)
                .unwrap();
            txn.issue(put("users", json!({"id": "u1"})), Box::new(|_| {}))
                .unwrap();
        }
        assert_eq!(engine.record_count("users"), Some(1));
    }

    #[test]
    fn cursor_stops_when_asked() {
        let engine = engine();
        let writer = engine
            .transaction(&scope(&["products"]), TransactionMode::ReadWrite)
            .unwrap();
        for (id, price) in [(1, 100), (2, 50), (3, 30), (4, 200), (5, 80)] {
            writer
                .issue(put("products", json!({"id": id, "price": price})), Box::new(|_| {}))
                .unwrap();
        }
        writer.commit();

        let before = engine.stats().snapshot();
        let reader = engine
            .transaction(&scope(&["products"]), TransactionMode::ReadOnly)
            .unwrap();
        let seen = sink();
        let s = Arc::clone(&seen);
        reader
            .open_cursor(
                CursorRequest {
                    collection: "products".into(),
                    source: Source::Index("price".into()),
                    range: Some(KeyRange::lower_bound(30, true)),
                    direction: Direction::Backward,
                },
                Box::new(move |event| match event {
                    CursorEvent::Record(record) => {
                        let mut seen = s.lock();
                        seen.push(record.key.as_number().unwrap() as i64);
                        if seen.len() == 2 {
                            CursorControl::Stop
                        } else {
                            CursorControl::Continue
                        }
                    }
                    _ => CursorControl::Stop,
                }),
            )
            .unwrap();
        reader.commit();

        assert_eq!(seen.lock().as_slice(), &[200, 100]);
        assert_eq!(engine.stats().snapshot().since(&before).cursor_visits, 2);
    }

    #[test]
    fn reads_see_earlier_writes_in_same_transaction() {
        let engine = engine();
        let txn = engine
            .transaction(&scope(&["users"]), TransactionMode::ReadWrite)
            .unwrap();
        let counts = sink();
        txn.issue(put("users", json!({"id": "a"})), Box::new(|_| {}))
            .unwrap();
        let c = Arc::clone(&counts);
        txn.issue(
            Request::new("users", RequestKind::Count(None)),
            Box::new(move |res| c.lock().push(res.unwrap())),
        )
        .unwrap();
        txn.commit();
        assert_eq!(counts.lock().as_slice(), &[RequestOutput::Count(1)]);
    }

    #[test]
    fn builder_rejects_duplicates() {
        let err = MemoryEngine::builder("x", 1)
            .collection(CollectionSchema::new("a"))
            .collection(CollectionSchema::new("a"))
            .build()
            .unwrap_err();
        assert_eq!(err.name(), "ConstraintError");
    }
}
