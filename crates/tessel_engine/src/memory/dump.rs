//! JSON snapshot of a [`MemoryEngine`].

use super::MemoryEngine;
use crate::error::{EngineError, EngineResult};
use crate::key::Key;
use crate::schema::CollectionSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Serializable image of a whole engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dump {
    /// Database name.
    pub name: String,
    /// Database version.
    pub version: u32,
    /// Collections with their records.
    #[serde(default)]
    pub collections: Vec<CollectionDump>,
}

/// One collection inside a [`Dump`].
///
/// Records of out-of-line key collections are `{"key": .., "value": ..}`
/// pairs; in-line key records are stored as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDump {
    /// Collection declaration.
    #[serde(flatten)]
    pub schema: CollectionSchema,
    /// Records in primary key order.
    #[serde(default)]
    pub records: Vec<Value>,
}

impl MemoryEngine {
    /// Builds an engine from a dump.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while declaring collections or
    /// loading records (duplicate keys, unique index conflicts, records
    /// without a usable key).
    pub fn from_dump(dump: Dump) -> EngineResult<MemoryEngine> {
        let mut builder = MemoryEngine::builder(dump.name, dump.version);
        let mut contents = Vec::with_capacity(dump.collections.len());
        for CollectionDump { schema, records } in dump.collections {
            contents.push((schema.name.clone(), schema.key_path.is_some(), records));
            builder = builder.collection(schema);
        }
        let engine = builder.build()?;

        {
            let mut state = engine.inner.state.write();
            for (name, in_line, records) in contents {
                let Some(data) = state.get_mut(&name) else {
                    continue;
                };
                for record in records {
                    if in_line {
                        data.store(record, None, false)?;
                    } else {
                        let (key, value) = split_pair(&name, record)?;
                        data.store(value, key, false)?;
                    }
                }
            }
        }
        Ok(engine)
    }

    /// Captures the committed state of every collection.
    #[must_use]
    pub fn dump(&self) -> Dump {
        let state = self.inner.state.read();
        let collections = state
            .values()
            .map(|data| {
                let in_line = data.schema().key_path.is_some();
                let records = data
                    .records()
                    .map(|(key, value)| {
                        if in_line {
                            value.clone()
                        } else {
                            json!({ "key": key.to_json(), "value": value })
                        }
                    })
                    .collect();
                CollectionDump {
                    schema: data.schema().clone(),
                    records,
                }
            })
            .collect();
        Dump {
            name: self.inner.name.clone(),
            version: self.inner.version,
            collections,
        }
    }
}

fn split_pair(collection: &str, record: Value) -> EngineResult<(Option<Key>, Value)> {
    let Value::Object(mut pair) = record else {
        return Err(EngineError::data(format!(
            "records of {collection:?} must be {{key, value}} pairs"
        )));
    };
    let key = match pair.remove("key") {
        None | Some(Value::Null) => None,
        Some(raw) => Some(Key::from_json(&raw).ok_or_else(|| {
            EngineError::data(format!("invalid key {raw} in {collection:?}"))
        })?),
    };
    let value = pair.remove("value").unwrap_or(Value::Null);
    Ok((key, value))
}
