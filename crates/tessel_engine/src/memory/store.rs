//! Record and index storage for one collection.

use crate::error::{EngineError, EngineResult};
use crate::key::{extract_key, inject_key, Key};
use crate::range::KeyRange;
use crate::request::{Direction, Source};
use crate::schema::{CollectionSchema, IndexSchema};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// An entry yielded by a scan: (source key, primary key, record).
pub(crate) type ScanEntry<'a> = (&'a Key, &'a Key, &'a Value);

/// Records of one collection plus its secondary indexes.
///
/// Each index maps an index key to the ordered set of primary keys
/// carrying it, so index scans visit records in (index key, primary key)
/// order.
#[derive(Debug, Clone)]
pub(crate) struct CollectionData {
    schema: CollectionSchema,
    records: BTreeMap<Key, Value>,
    indexes: BTreeMap<String, BTreeMap<Key, BTreeSet<Key>>>,
    next_key: u64,
}

impl CollectionData {
    pub(crate) fn new(schema: CollectionSchema) -> Self {
        let indexes = schema
            .indexes
            .iter()
            .map(|index| (index.name.clone(), BTreeMap::new()))
            .collect();
        Self {
            schema,
            records: BTreeMap::new(),
            indexes,
            next_key: 1,
        }
    }

    pub(crate) fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn records(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.records.iter()
    }

    /// Walks the records of `source` inside `range` in `direction`.
    pub(crate) fn scan<'a>(
        &'a self,
        source: &Source,
        range: Option<&'a KeyRange>,
        direction: Direction,
    ) -> EngineResult<Box<dyn Iterator<Item = ScanEntry<'a>> + 'a>> {
        let bounds: (Bound<&Key>, Bound<&Key>) =
            range.map_or((Bound::Unbounded, Bound::Unbounded), KeyRange::to_bounds);

        let iter: Box<dyn DoubleEndedIterator<Item = ScanEntry<'a>> + 'a> = match source {
            Source::Primary => Box::new(self.records.range(bounds).map(|(k, v)| (k, k, v))),
            Source::Index(name) => {
                let index = self.indexes.get(name).ok_or_else(|| {
                    EngineError::not_found(format!(
                        "index {name:?} on collection {:?}",
                        self.schema.name
                    ))
                })?;
                Box::new(
                    index
                        .range(bounds)
                        .flat_map(|(index_key, primary_keys)| {
                            primary_keys.iter().map(move |pk| (index_key, pk))
                        })
                        .filter_map(move |(index_key, pk)| {
                            self.records.get(pk).map(|value| (index_key, pk, value))
                        }),
                )
            }
        };

        Ok(match direction {
            Direction::Forward => Box::new(iter),
            Direction::Backward => Box::new(iter.rev()),
        })
    }

    /// Inserts or replaces a record and returns its primary key.
    ///
    /// With `overwrite == false` an existing key is a constraint error.
    pub(crate) fn store(
        &mut self,
        value: Value,
        key: Option<Key>,
        overwrite: bool,
    ) -> EngineResult<Key> {
        let (key, value) = self.assign_key(value, key)?;

        if !overwrite && self.records.contains_key(&key) {
            return Err(EngineError::constraint(format!(
                "key {key} already exists in {:?}",
                self.schema.name
            )));
        }
        self.check_unique(&key, &value)?;

        self.remove(&key);
        self.index_record(&key, &value);
        self.records.insert(key.clone(), value);
        self.advance_generator(&key);
        Ok(key)
    }

    /// Removes every record whose primary key is in `range`.
    pub(crate) fn delete(&mut self, range: &KeyRange) -> usize {
        let doomed: Vec<Key> = self
            .records
            .range(range.to_bounds())
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            self.remove(key);
        }
        doomed.len()
    }

    /// Removes all records. The key generator is not reset.
    pub(crate) fn clear(&mut self) {
        self.records.clear();
        for entries in self.indexes.values_mut() {
            entries.clear();
        }
    }

    fn assign_key(&mut self, mut value: Value, key: Option<Key>) -> EngineResult<(Key, Value)> {
        let name = &self.schema.name;
        match (self.schema.key_path.as_deref(), key) {
            (Some(_), Some(_)) => Err(EngineError::data(format!(
                "collection {name:?} uses in-line keys; an explicit key was given"
            ))),
            (Some(path), None) => match extract_key(&value, path) {
                Some(key) => Ok((key, value)),
                None if self.schema.auto_increment => {
                    let key = Key::from(self.next_key as f64);
                    if !inject_key(&mut value, path, &key) {
                        return Err(EngineError::data(format!(
                            "cannot write generated key at {path:?} into a non-object record"
                        )));
                    }
                    Ok((key, value))
                }
                None => Err(EngineError::data(format!(
                    "record has no valid key at {path:?}"
                ))),
            },
            (None, Some(key)) => Ok((key, value)),
            (None, None) if self.schema.auto_increment => {
                Ok((Key::from(self.next_key as f64), value))
            }
            (None, None) => Err(EngineError::data(format!(
                "collection {name:?} uses out-of-line keys and no key was given"
            ))),
        }
    }

    fn check_unique(&self, key: &Key, value: &Value) -> EngineResult<()> {
        for index in self.schema.indexes.iter().filter(|i| i.unique) {
            let Some(index_key) = extract_key(value, &index.key_path) else {
                continue;
            };
            let taken = self
                .indexes
                .get(&index.name)
                .and_then(|entries| entries.get(&index_key))
                .is_some_and(|owners| owners.iter().any(|owner| owner != key));
            if taken {
                return Err(EngineError::constraint(format!(
                    "unique index {:?} already contains {index_key}",
                    index.name
                )));
            }
        }
        Ok(())
    }

    fn index_record(&mut self, key: &Key, value: &Value) {
        for IndexSchema { name, key_path, .. } in &self.schema.indexes {
            if let Some(index_key) = extract_key(value, key_path) {
                self.indexes
                    .entry(name.clone())
                    .or_default()
                    .entry(index_key)
                    .or_default()
                    .insert(key.clone());
            }
        }
    }

    fn remove(&mut self, key: &Key) {
        let Some(old) = self.records.remove(key) else {
            return;
        };
        for IndexSchema { name, key_path, .. } in &self.schema.indexes {
            let Some(index_key) = extract_key(&old, key_path) else {
                continue;
            };
            if let Some(entries) = self.indexes.get_mut(name) {
                if let Some(owners) = entries.get_mut(&index_key) {
                    owners.remove(key);
                    if owners.is_empty() {
                        entries.remove(&index_key);
                    }
                }
            }
        }
    }

    fn advance_generator(&mut self, key: &Key) {
        if !self.schema.auto_increment {
            return;
        }
        if let Some(n) = key.as_number() {
            if n >= self.next_key as f64 {
                self.next_key = (n.floor() as u64).saturating_add(1);
            }
        }
    }
}
