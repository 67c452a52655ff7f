//! Inspect command implementation.

use serde::Serialize;
use std::error::Error;
use std::io::Write;
use tessel_engine::MemoryEngine;

/// Database inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Database name.
    pub name: String,
    /// Database version.
    pub version: u32,
    /// Total number of records.
    pub record_count: usize,
    /// Per-collection details.
    pub collections: Vec<CollectionInfo>,
}

/// Details of a single collection.
#[derive(Debug, Serialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Primary key path, absent for out-of-line keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_path: Option<String>,
    /// Whether keys are generated.
    pub auto_increment: bool,
    /// Number of records.
    pub record_count: usize,
    /// Secondary indexes.
    pub indexes: Vec<IndexInfo>,
}

/// Details of a single index.
#[derive(Debug, Serialize)]
pub struct IndexInfo {
    /// Index name.
    pub name: String,
    /// Indexed key path.
    pub key_path: String,
    /// Whether index keys are unique.
    pub unique: bool,
}

/// Collects inspection data from an engine.
pub fn inspect(engine: &MemoryEngine) -> InspectResult {
    let dump = engine.dump();
    let collections: Vec<CollectionInfo> = dump
        .collections
        .into_iter()
        .map(|collection| CollectionInfo {
            record_count: collection.records.len(),
            name: collection.schema.name,
            key_path: collection.schema.key_path,
            auto_increment: collection.schema.auto_increment,
            indexes: collection
                .schema
                .indexes
                .into_iter()
                .map(|index| IndexInfo {
                    name: index.name,
                    key_path: index.key_path,
                    unique: index.unique,
                })
                .collect(),
        })
        .collect();

    InspectResult {
        name: dump.name,
        version: dump.version,
        record_count: collections.iter().map(|c| c.record_count).sum(),
        collections,
    }
}

/// Runs the inspect command.
pub fn run(
    engine: &MemoryEngine,
    format: &str,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let result = inspect(engine);
    match format {
        "json" => writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?,
        "text" => print_text_output(&result, out)?,
        other => return Err(format!("Unknown format {other:?}, expected text or json").into()),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Tessel Database Inspection")?;
    writeln!(out, "==========================")?;
    writeln!(out)?;
    writeln!(out, "Name:    {}", result.name)?;
    writeln!(out, "Version: {}", result.version)?;
    writeln!(out, "Records: {}", result.record_count)?;
    writeln!(out)?;
    writeln!(out, "Collections:")?;
    for col in &result.collections {
        let key = match (&col.key_path, col.auto_increment) {
            (Some(path), true) => format!("key {path}, generated"),
            (Some(path), false) => format!("key {path}"),
            (None, true) => "out-of-line key, generated".to_string(),
            (None, false) => "out-of-line key".to_string(),
        };
        writeln!(out, "  {} ({key}): {} records", col.name, col.record_count)?;
        for index in &col.indexes {
            let unique = if index.unique { ", unique" } else { "" };
            writeln!(out, "    index {} on {}{unique}", index.name, index.key_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_testkit::{blog_dump, products_dump};

    #[test]
    fn summarizes_collections_and_indexes() {
        let engine = MemoryEngine::from_dump(blog_dump()).unwrap();
        let result = inspect(&engine);
        assert_eq!(result.name, "blog");
        assert_eq!(result.record_count, 6);

        let posts = result.collections.iter().find(|c| c.name == "posts").unwrap();
        assert_eq!(posts.record_count, 3);
        assert_eq!(posts.indexes[0].name, "author");
        let accounts = result.collections.iter().find(|c| c.name == "accounts").unwrap();
        assert!(accounts.indexes[0].unique);
    }

    #[test]
    fn text_output_lists_indexes() {
        let engine = MemoryEngine::from_dump(products_dump()).unwrap();
        let mut out = Vec::new();
        run(&engine, "text", &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("products (key id): 5 records"));
        assert!(text.contains("index price on price"));
    }

    #[test]
    fn json_output_parses() {
        let engine = MemoryEngine::from_dump(products_dump()).unwrap();
        let mut out = Vec::new();
        run(&engine, "json", &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["collections"][0]["record_count"], 5);
        assert!(run(&engine, "yaml", &mut Vec::new()).is_err());
    }
}
