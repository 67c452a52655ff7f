//! Operations queued by chains.

use serde_json::Value;
use tessel_engine::{Key, KeyRange, Request, RequestKind, Source};

/// A queued read.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOp {
    /// One record by primary key.
    Get {
        /// Target collection.
        collection: String,
        /// Primary key.
        key: Key,
    },
    /// Records by primary key range.
    GetAll {
        /// Target collection.
        collection: String,
        /// Range, or everything.
        range: Option<KeyRange>,
        /// Maximum number of records.
        count: Option<u32>,
    },
    /// Records through an index.
    GetAllByIndex {
        /// Target collection.
        collection: String,
        /// Index name.
        index: String,
        /// Range over index keys, or everything.
        range: Option<KeyRange>,
    },
    /// Number of records by primary key range.
    Count {
        /// Target collection.
        collection: String,
        /// Range, or everything.
        range: Option<KeyRange>,
    },
}

impl ReadOp {
    /// The collection this operation touches.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            ReadOp::Get { collection, .. }
            | ReadOp::GetAll { collection, .. }
            | ReadOp::GetAllByIndex { collection, .. }
            | ReadOp::Count { collection, .. } => collection,
        }
    }

    /// Output shape the engine should answer with.
    pub(crate) fn expected_shape(&self) -> &'static str {
        match self {
            ReadOp::Get { .. } => "record",
            ReadOp::GetAll { .. } | ReadOp::GetAllByIndex { .. } => "records",
            ReadOp::Count { .. } => "count",
        }
    }

    pub(crate) fn into_request(self) -> Request {
        match self {
            ReadOp::Get { collection, key } => {
                Request::new(collection, RequestKind::Get(KeyRange::Only(key)))
            }
            ReadOp::GetAll {
                collection,
                range,
                count,
            } => Request::new(collection, RequestKind::GetAll { range, count }),
            ReadOp::GetAllByIndex {
                collection,
                index,
                range,
            } => Request::new(collection, RequestKind::GetAll { range, count: None })
                .via(Source::Index(index)),
            ReadOp::Count { collection, range } => {
                Request::new(collection, RequestKind::Count(range))
            }
        }
    }
}

/// What a delete removes.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteTarget {
    /// One primary key.
    Key(Key),
    /// Every primary key in a range.
    Range(KeyRange),
}

impl From<Key> for DeleteTarget {
    fn from(key: Key) -> Self {
        DeleteTarget::Key(key)
    }
}

impl From<KeyRange> for DeleteTarget {
    fn from(range: KeyRange) -> Self {
        DeleteTarget::Range(range)
    }
}

/// A queued write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace.
    Put {
        /// Target collection.
        collection: String,
        /// Record.
        value: Value,
        /// Out-of-line key, if the collection uses one.
        key: Option<Key>,
    },
    /// Insert; fails if the key exists.
    Add {
        /// Target collection.
        collection: String,
        /// Record.
        value: Value,
        /// Out-of-line key, if the collection uses one.
        key: Option<Key>,
    },
    /// Remove by key or range.
    Delete {
        /// Target collection.
        collection: String,
        /// What to remove.
        target: DeleteTarget,
    },
    /// Remove everything.
    Clear {
        /// Target collection.
        collection: String,
    },
}

impl WriteOp {
    /// The collection this operation touches.
    #[must_use]
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Put { collection, .. }
            | WriteOp::Add { collection, .. }
            | WriteOp::Delete { collection, .. }
            | WriteOp::Clear { collection } => collection,
        }
    }

    pub(crate) fn into_request(self) -> Request {
        match self {
            WriteOp::Put {
                collection,
                value,
                key,
            } => Request::new(collection, RequestKind::Put { value, key }),
            WriteOp::Add {
                collection,
                value,
                key,
            } => Request::new(collection, RequestKind::Add { value, key }),
            WriteOp::Delete { collection, target } => {
                let range = match target {
                    DeleteTarget::Key(key) => KeyRange::Only(key),
                    DeleteTarget::Range(range) => range,
                };
                Request::new(collection, RequestKind::Delete(range))
            }
            WriteOp::Clear { collection } => Request::new(collection, RequestKind::Clear),
        }
    }
}
