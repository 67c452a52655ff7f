//! Query command implementation.

use super::scoped;
use std::error::Error;
use std::io::Write;
use tessel_core::{Comparisons, Database, Order};
use tracing::debug;

/// Arguments of the query command.
#[derive(Debug, Clone)]
pub struct QueryArgs {
    /// Collection to query.
    pub collection: String,
    /// Index to scan, or the primary key when unset.
    pub index: Option<String>,
    /// Condition on the scanned key.
    pub filter: Option<Comparisons>,
    /// Result order.
    pub order: Order,
    /// Maximum number of records.
    pub limit: Option<u32>,
    /// Records to skip.
    pub offset: u32,
    /// Print the resolved plan first.
    pub explain: bool,
}

/// Runs the query command, writing one JSON record per line.
pub async fn run(
    db: &Database,
    args: &QueryArgs,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let mut query = scoped(
        db,
        &args.collection,
        args.index.as_deref(),
        args.filter.clone(),
        args.order,
    )
    .offset(args.offset);
    if let Some(limit) = args.limit {
        query = query.limit(limit);
    }

    if args.explain {
        writeln!(out, "plan: {}", query.explain()?)?;
    }

    let records = query.find_all().await?;
    debug!(count = records.len(), "query finished");
    for record in &records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tessel_testkit::TestDatabase;

    fn args(collection: &str) -> QueryArgs {
        QueryArgs {
            collection: collection.to_string(),
            index: None,
            filter: None,
            order: Order::Ascending,
            limit: None,
            offset: 0,
            explain: false,
        }
    }

    async fn lines(db: &Database, args: &QueryArgs) -> Vec<String> {
        let mut out = Vec::new();
        run(db, args, &mut out).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn prices(lines: &[String]) -> Vec<i64> {
        lines
            .iter()
            .map(|line| serde_json::from_str::<Value>(line).unwrap()["price"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn prints_one_record_per_line() {
        let fixture = TestDatabase::products();
        let mut args = args("products");
        args.index = Some("price".to_string());
        args.limit = Some(2);
        args.offset = 1;
        assert_eq!(prices(&lines(&fixture.db, &args).await), vec![50, 80]);
    }

    #[tokio::test]
    async fn explain_comes_first() {
        let fixture = TestDatabase::products();
        let mut args = args("products");
        args.index = Some("price".to_string());
        args.filter = Some(Comparisons::new().gt(80));
        args.order = Order::Descending;
        args.explain = true;
        let output = lines(&fixture.db, &args).await;

        assert!(output[0].starts_with("plan: products via index \"price\""));
        assert!(output[0].ends_with("strategy bulk"));
        assert_eq!(prices(&output[1..]), vec![200, 100]);
    }

    #[tokio::test]
    async fn unknown_collection_is_an_error() {
        let fixture = TestDatabase::products();
        let mut out = Vec::new();
        let err = run(&fixture.db, &args("ghosts"), &mut out).await.unwrap_err();
        assert!(err.to_string().contains("ghosts"));
        assert!(out.is_empty());
    }
}
