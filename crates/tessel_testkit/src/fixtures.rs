//! Seeded engines and database helpers.
//!
//! Every fixture is built from a [`Dump`], so the same data can be loaded
//! in-process or written to disk for the command-line tool.

use serde_json::{json, Value};
use std::io::Write;
use tempfile::NamedTempFile;
use tessel_core::{Config, Database};
use tessel_engine::{Dump, MemoryEngine, StatsSnapshot};

/// Prices of the `products` fixture, in primary key order (ids 1 to 5).
pub const PRODUCT_PRICES: [i64; 5] = [100, 50, 30, 200, 80];

/// Names of the `products` fixture, in primary key order.
pub const PRODUCT_NAMES: [&str; 5] = ["apple", "apricot", "banana", "avocado", "cherry"];

/// A `shop` database with one `products` collection, indexed on `price`
/// and `name`.
pub fn products_dump() -> Dump {
    let records: Vec<Value> = PRODUCT_PRICES
        .iter()
        .zip(PRODUCT_NAMES)
        .enumerate()
        .map(|(i, (price, name))| json!({"id": i + 1, "price": price, "name": name}))
        .collect();
    dump_from(json!({
        "name": "shop",
        "version": 1,
        "collections": [{
            "name": "products",
            "keyPath": "id",
            "indexes": [
                {"name": "price", "keyPath": "price"},
                {"name": "name", "keyPath": "name"}
            ],
            "records": records
        }]
    }))
}

/// A `blog` database: `users`, `posts` (indexed on `author`), `tags`
/// (empty) and `accounts` (unique index on `email`).
pub fn blog_dump() -> Dump {
    dump_from(json!({
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
                    {"id": "p1", "author": "u1", "title": "Hello"},
                    {"id": "p2", "author": "u2", "title": "Notes"},
                    {"id": "p3", "author": "u1", "title": "Again"}
                ]
            },
            {"name": "tags", "keyPath": "id"},
            {
                "name": "accounts",
                "keyPath": "id",
                "indexes": [{"name": "email", "keyPath": "email", "unique": true}],
                "records": [{"id": 1, "email": "ada@example.com"}]
            }
        ]
    }))
}

/// An `items` collection with one record per value, keyed `0..n` and
/// indexed on `value`.
pub fn values_dump(values: &[i64]) -> Dump {
    let records: Vec<Value> = values
        .iter()
        .enumerate()
        .map(|(id, value)| json!({"id": id, "value": value}))
        .collect();
    dump_from(json!({
        "name": "values",
        "version": 1,
        "collections": [{
            "name": "items",
            "keyPath": "id",
            "indexes": [{"name": "value", "keyPath": "value"}],
            "records": records
        }]
    }))
}

fn dump_from(value: Value) -> Dump {
    serde_json::from_value(value).expect("Fixture dump should deserialize")
}

/// An engine together with a database over it.
///
/// The engine handle is kept so tests can inspect records and
/// statistics directly.
pub struct TestDatabase {
    /// The engine the database talks to.
    pub engine: MemoryEngine,
    /// The database under test.
    pub db: Database,
}

impl TestDatabase {
    /// Loads a dump with the default configuration.
    pub fn from_dump(dump: Dump) -> Self {
        Self::from_dump_with_config(dump, Config::default())
    }

    /// Loads a dump with a custom configuration.
    pub fn from_dump_with_config(dump: Dump, config: Config) -> Self {
        let engine = MemoryEngine::from_dump(dump).expect("Failed to load fixture dump");
        Self {
            db: Database::with_config(engine.clone(), config),
            engine,
        }
    }

    /// The `products` fixture.
    pub fn products() -> Self {
        Self::from_dump(products_dump())
    }

    /// The `blog` fixture.
    pub fn blog() -> Self {
        Self::from_dump(blog_dump())
    }

    /// The `items` fixture for the given values.
    pub fn values(values: &[i64]) -> Self {
        Self::from_dump(values_dump(values))
    }

    /// Current engine counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.engine.stats().snapshot()
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Writes a dump to a temporary JSON file, removed when dropped.
pub fn write_dump(dump: &Dump) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    serde_json::to_writer_pretty(&mut file, dump).expect("Failed to write dump");
    file.flush().expect("Failed to flush dump");
    file
}

/// Extracts an integer field from each record.
pub fn field_values(records: &[Value], field: &str) -> Vec<i64> {
    records
        .iter()
        .map(|record| record[field].as_i64().expect("Field should be an integer"))
        .collect()
}
