//! Query plans.
//!
//! [`QueryPlan`] is an immutable value: every `with_*` transition returns
//! a new plan and leaves the receiver untouched, so partially built plans
//! can be branched freely. [`QueryPlan::resolve`] translates the filter
//! and produces a [`ResolvedPlan`] ready for execution.

use crate::condition::{Comparisons, Condition};
use crate::error::CoreResult;
use std::fmt;
use tessel_engine::{Direction, KeyRange, Source};

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Smallest key first.
    #[default]
    Ascending,
    /// Largest key first.
    Descending,
}

impl Order {
    /// Cursor direction walking in this order.
    #[must_use]
    pub const fn direction(self) -> Direction {
        match self {
            Order::Ascending => Direction::Forward,
            Order::Descending => Direction::Backward,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Order::Ascending => "asc",
            Order::Descending => "desc",
        })
    }
}

impl std::str::FromStr for Order {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Order::Ascending),
            "desc" | "descending" => Ok(Order::Descending),
            other => Err(format!("unknown order {other:?}, expected asc or desc")),
        }
    }
}

/// What restricts the scanned keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// A single comparison.
    Condition(Condition),
    /// Several comparisons resolved by precedence.
    Comparisons(Comparisons),
}

/// An immutable description of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    collection: String,
    index: Option<String>,
    filter: Option<Filter>,
    order: Order,
    limit: Option<u32>,
    offset: u32,
}

impl QueryPlan {
    /// A plan scanning all of `collection` by primary key.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            index: None,
            filter: None,
            order: Order::Ascending,
            limit: None,
            offset: 0,
        }
    }

    /// Target collection.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Index name; `None` scans by primary key.
    #[must_use]
    pub fn index(&self) -> Option<&str> {
        self.index.as_deref()
    }

    /// Key filter.
    #[must_use]
    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Result order.
    #[must_use]
    pub fn order(&self) -> Order {
        self.order
    }

    /// Maximum number of results.
    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Number of leading results skipped.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Returns a plan scanning `index`, or the primary key for `None`.
    #[must_use]
    pub fn with_index(&self, index: Option<String>) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }

    /// Returns a plan with `filter`.
    #[must_use]
    pub fn with_filter(&self, filter: Filter) -> Self {
        Self {
            filter: Some(filter),
            ..self.clone()
        }
    }

    /// Returns a plan with `order`.
    #[must_use]
    pub fn with_order(&self, order: Order) -> Self {
        Self {
            order,
            ..self.clone()
        }
    }

    /// Returns a plan with `limit`.
    #[must_use]
    pub fn with_limit(&self, limit: Option<u32>) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }

    /// Returns a plan with `offset`.
    #[must_use]
    pub fn with_offset(&self, offset: u32) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    /// Translates the filter and finalizes the plan.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed conditions, and in
    /// `strict` mode for contradictory comparisons.
    pub fn resolve(&self, strict: bool) -> CoreResult<ResolvedPlan> {
        let range = match &self.filter {
            None => None,
            Some(Filter::Condition(condition)) => condition.to_range()?,
            Some(Filter::Comparisons(comparisons)) => comparisons.to_range(strict)?,
        };
        let source = match &self.index {
            Some(name) => Source::Index(name.clone()),
            None => Source::Primary,
        };
        Ok(ResolvedPlan {
            collection: self.collection.clone(),
            source,
            range,
            order: self.order,
            limit: self.limit,
            offset: self.offset,
        })
    }
}

/// How a resolved plan is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// One bulk request; descending order is emulated by reversing.
    Bulk,
    /// A directional cursor walk with skip and early stop.
    Cursor,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::Bulk => "bulk",
            Strategy::Cursor => "cursor",
        })
    }
}

/// A plan with its key range resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    collection: String,
    source: Source,
    range: Option<KeyRange>,
    order: Order,
    limit: Option<u32>,
    offset: u32,
}

impl ResolvedPlan {
    /// Target collection.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Primary key or index.
    #[must_use]
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Key range; `None` scans everything.
    #[must_use]
    pub fn range(&self) -> Option<&KeyRange> {
        self.range.as_ref()
    }

    /// Result order.
    #[must_use]
    pub fn order(&self) -> Order {
        self.order
    }

    /// Maximum number of results.
    #[must_use]
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// Number of leading results skipped.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Bulk when nothing is skipped or capped, cursor otherwise.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        if self.offset == 0 && self.limit.is_none() {
            Strategy::Bulk
        } else {
            Strategy::Cursor
        }
    }

    /// Returns the plan capped at `limit` results, keeping a lower cap.
    #[must_use]
    pub(crate) fn capped(&self, limit: u32) -> Self {
        Self {
            limit: Some(self.limit.map_or(limit, |current| current.min(limit))),
            ..self.clone()
        }
    }
}

impl fmt::Display for ResolvedPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}", self.collection, self.source)?;
        match &self.range {
            Some(range) => write!(f, " range {range}")?,
            None => f.write_str(" range all")?,
        }
        write!(f, " order {}", self.order)?;
        if let Some(limit) = self.limit {
            write!(f, " limit {limit}")?;
        }
        if self.offset > 0 {
            write!(f, " offset {}", self.offset)?;
        }
        write!(f, " strategy {}", self.strategy())
    }
}
