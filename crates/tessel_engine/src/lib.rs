//! # Tessel Engine
//!
//! Host engine interface for Tessel, plus an in-memory implementation.
//!
//! The interface models an embedded, versioned, asynchronous key-value
//! engine with named collections, secondary indexes and cursor scans.
//! Everything above it (query translation, transaction batching) lives in
//! `tessel_core` and talks to the engine only through [`Connection`] and
//! [`EngineTransaction`].
//!
//! ## Design Principles
//!
//! - Issuing a request never blocks and never yields
//! - Results arrive through callbacks, exactly once per request
//! - A transaction commits or aborts as a whole
//! - The engine owns ordering: keys compare by [`Key`]'s total order
//!
//! ## Example
//!
//! ```rust
//! use std::sync::{Arc, Mutex};
//! use tessel_engine::{
//!     CollectionSchema, Connection, MemoryEngine, Request, RequestKind, TransactionMode,
//! };
//! use serde_json::json;
//!
//! let engine = MemoryEngine::builder("notes", 1)
//!     .collection(CollectionSchema::new("notes").key_path("id"))
//!     .build()
//!     .unwrap();
//!
//! let txn = engine
//!     .transaction(&["notes".to_string()], TransactionMode::ReadWrite)
//!     .unwrap();
//! let key = Arc::new(Mutex::new(None));
//! let slot = Arc::clone(&key);
//! txn.issue(
//!     Request::new("notes", RequestKind::Put { value: json!({"id": 7}), key: None }),
//!     Box::new(move |result| *slot.lock().unwrap() = result.ok()),
//! )
//! .unwrap();
//! txn.commit();
//! assert!(key.lock().unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod key;
mod memory;
mod range;
mod request;
mod schema;
mod stats;
mod transaction;

pub use error::{EngineError, EngineResult};
pub use key::{extract_key, inject_key, Key};
pub use memory::{CollectionDump, Dump, MemoryEngine, MemoryEngineBuilder, MemoryTransaction};
pub use range::KeyRange;
pub use request::{
    CursorCallback, CursorControl, CursorEvent, CursorRecord, CursorRequest, Direction, Request,
    RequestCallback, RequestKind, RequestOutput, Source, TransactionMode,
};
pub use schema::{CollectionSchema, IndexSchema};
pub use stats::{EngineStats, StatsSnapshot};
pub use transaction::{
    AbortHandle, CompletionCallback, Connection, EngineTransaction, TransactionId,
    TransactionOutcome,
};
