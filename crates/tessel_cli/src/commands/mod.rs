//! CLI command implementations.

pub mod count;
pub mod inspect;
pub mod query;

use std::error::Error;
use std::fs;
use std::path::Path;
use tessel_core::{Comparisons, Database, Final, Order, Query};
use tessel_engine::{Dump, MemoryEngine};
use tracing::info;

/// Loads a JSON dump into a fresh in-memory engine.
pub fn load(path: &Path) -> Result<MemoryEngine, Box<dyn Error>> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read dump {}: {e}", path.display()))?;
    let dump: Dump = serde_json::from_str(&text)
        .map_err(|e| format!("Invalid dump {}: {e}", path.display()))?;
    let engine = MemoryEngine::from_dump(dump)?;
    info!(path = %path.display(), "dump loaded");
    Ok(engine)
}

/// Loads a dump and opens a database over it.
pub fn open(path: &Path) -> Result<Database, Box<dyn Error>> {
    Ok(Database::new(load(path)?))
}

/// Parses the `--where` argument.
pub fn parse_condition(raw: Option<&str>) -> Result<Option<Comparisons>, Box<dyn Error>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| format!("--where is not valid JSON: {e}"))?;
    Ok(Some(Comparisons::from_json(&value)?))
}

/// Scopes a query to an index or the primary key, then applies the
/// filter and order.
pub(crate) fn scoped(
    db: &Database,
    collection: &str,
    index: Option<&str>,
    filter: Option<Comparisons>,
    order: Order,
) -> Query<Final> {
    let query = db.query(collection);
    let query = match index {
        Some(index) => query.index(index),
        None => query.primary_key(),
    };
    match filter {
        Some(filter) => query.filter(filter).order_by(order),
        None => query.order_by(order),
    }
}
