//! Requests, outputs and the cursor protocol.

use crate::error::{EngineError, EngineResult};
use crate::key::Key;
use crate::range::KeyRange;
use serde_json::Value;
use std::fmt;

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Reads only; may run alongside other readers.
    ReadOnly,
    /// Reads and writes; excludes other access to its scope.
    ReadWrite,
}

impl fmt::Display for TransactionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransactionMode::ReadOnly => "readonly",
            TransactionMode::ReadWrite => "readwrite",
        })
    }
}

/// Direction a cursor walks its range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending key order.
    Forward,
    /// Descending key order.
    Backward,
}

/// Which ordering a read goes through: the primary key or a named index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// The collection's primary key.
    Primary,
    /// A secondary index of the collection.
    Index(String),
}

impl Source {
    /// Returns the index name, if any.
    #[must_use]
    pub fn index_name(&self) -> Option<&str> {
        match self {
            Source::Primary => None,
            Source::Index(name) => Some(name),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Primary => f.write_str("primary key"),
            Source::Index(name) => write!(f, "index {name:?}"),
        }
    }
}

/// What a request asks the engine to do.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestKind {
    /// First record in the range.
    Get(KeyRange),
    /// All records in the range, ascending, optionally capped.
    GetAll {
        /// Range to scan (`None` for everything).
        range: Option<KeyRange>,
        /// Maximum number of records to return.
        count: Option<u32>,
    },
    /// Number of records in the range.
    Count(Option<KeyRange>),
    /// Insert or replace a record.
    Put {
        /// The record.
        value: Value,
        /// Out-of-line key.
        key: Option<Key>,
    },
    /// Insert a record, failing if the key exists.
    Add {
        /// The record.
        value: Value,
        /// Out-of-line key.
        key: Option<Key>,
    },
    /// Remove every record in the range.
    Delete(KeyRange),
    /// Remove every record.
    Clear,
}

impl RequestKind {
    /// Whether the request mutates the collection.
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            RequestKind::Put { .. } | RequestKind::Add { .. } | RequestKind::Delete(_) | RequestKind::Clear
        )
    }

    /// Short name of the request kind.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            RequestKind::Get(_) => "get",
            RequestKind::GetAll { .. } => "getAll",
            RequestKind::Count(_) => "count",
            RequestKind::Put { .. } => "put",
            RequestKind::Add { .. } => "add",
            RequestKind::Delete(_) => "delete",
            RequestKind::Clear => "clear",
        }
    }
}

/// A request against one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Target collection.
    pub collection: String,
    /// Primary key or index.
    pub source: Source,
    /// The operation.
    pub kind: RequestKind,
}

impl Request {
    /// Creates a request through the primary key.
    pub fn new(collection: impl Into<String>, kind: RequestKind) -> Self {
        Self {
            collection: collection.into(),
            source: Source::Primary,
            kind,
        }
    }

    /// Routes the request through a named index.
    #[must_use]
    pub fn via(mut self, source: Source) -> Self {
        self.source = source;
        self
    }
}

/// What a successful request produced.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutput {
    /// Result of `Get`.
    Record(Option<Value>),
    /// Result of `GetAll`.
    Records(Vec<Value>),
    /// Result of `Count`.
    Count(u64),
    /// Key written by `Put` or `Add`.
    Key(Key),
    /// Result of `Delete` and `Clear`.
    Done,
}

impl RequestOutput {
    /// Short name of the output shape.
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            RequestOutput::Record(_) => "record",
            RequestOutput::Records(_) => "records",
            RequestOutput::Count(_) => "count",
            RequestOutput::Key(_) => "key",
            RequestOutput::Done => "done",
        }
    }
}

/// Callback invoked exactly once when a request settles.
pub type RequestCallback = Box<dyn FnOnce(EngineResult<RequestOutput>) + Send + 'static>;

/// Opens a cursor over a collection or index.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorRequest {
    /// Target collection.
    pub collection: String,
    /// Primary key or index.
    pub source: Source,
    /// Range to walk (`None` for everything).
    pub range: Option<KeyRange>,
    /// Walk direction.
    pub direction: Direction,
}

/// One record seen by a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct CursorRecord {
    /// Key in the cursor's source (index key for index cursors).
    pub key: Key,
    /// Primary key of the record.
    pub primary_key: Key,
    /// The record.
    pub value: Value,
}

/// Notification delivered to a cursor callback.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorEvent {
    /// The cursor is positioned on a record.
    Record(CursorRecord),
    /// The range has no more records.
    Exhausted,
    /// The cursor failed (including transaction abort).
    Failed(EngineError),
}

/// The callback's answer after each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorControl {
    /// Advance to the next record.
    Continue,
    /// Stop walking; no further events are delivered.
    Stop,
}

/// Callback driven by the engine for each cursor event.
pub type CursorCallback = Box<dyn FnMut(CursorEvent) -> CursorControl + Send + 'static>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_kinds_are_flagged() {
        assert!(RequestKind::Clear.is_write());
        assert!(RequestKind::Put { value: json!({}), key: None }.is_write());
        assert!(!RequestKind::Count(None).is_write());
    }

    #[test]
    fn request_routes_through_index() {
        let request = Request::new("products", RequestKind::Count(None))
            .via(Source::Index("price".into()));
        assert_eq!(request.source.index_name(), Some("price"));
    }
}
