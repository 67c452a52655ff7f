//! Scope checks for chains.

use crate::error::{CoreError, CoreResult};

/// Checks every referenced collection against the declared scope.
///
/// Collections are checked in enqueue order; the first one outside the
/// scope is reported.
pub(crate) fn check_scope<'a>(
    scope: &[String],
    referenced: impl IntoIterator<Item = &'a str>,
) -> CoreResult<()> {
    for collection in referenced {
        if !scope.iter().any(|name| name == collection) {
            return Err(CoreError::scope_violation(collection, scope));
        }
    }
    Ok(())
}

/// Distinct collections in first-seen order.
pub(crate) fn distinct<'a>(referenced: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen: Vec<&str> = Vec::new();
    for collection in referenced {
        if !seen.contains(&collection) {
            seen.push(collection);
        }
    }
    seen
}
