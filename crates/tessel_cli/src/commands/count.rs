//! Count command implementation.

use super::scoped;
use std::error::Error;
use std::io::Write;
use tessel_core::{Comparisons, Database, Order};

/// Runs the count command.
pub async fn run(
    db: &Database,
    collection: &str,
    index: Option<&str>,
    filter: Option<Comparisons>,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let count = scoped(db, collection, index, filter, Order::Ascending)
        .count()
        .await?;
    writeln!(out, "{count}")?;
    Ok(())
}
