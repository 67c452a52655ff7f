//! Fluent query builder.
//!
//! A query moves through three stages, tracked in its type:
//!
//! 1. [`Unscoped`]: pick an index with [`Query::index`] or the primary
//!    key with [`Query::primary_key`], or go straight to a range.
//! 2. [`Indexed`]: pick a range (`equals`, `gt`, `between`, ...).
//! 3. [`Final`]: set order, limit and offset.
//!
//! Terminal operations ([`Query::find_all`], [`Query::find`],
//! [`Query::count`]) are available at every stage; without a range they
//! scan everything. Every method takes `&self` and returns a new query,
//! so a partially built query can be reused as a template.

use super::executor::Executor;
use super::plan::{Filter, Order, QueryPlan, ResolvedPlan};
use crate::condition::{Comparisons, Condition};
use crate::database::Database;
use crate::error::CoreResult;
use serde_json::Value;
use std::marker::PhantomData;
use tessel_engine::Key;
use tracing::debug;

mod sealed {
    pub trait Sealed {}
}

/// A builder stage.
pub trait Stage: sealed::Sealed {}

/// Stages that still accept a range selector.
pub trait Selectable: Stage {}

/// No index chosen yet.
#[derive(Debug, Clone, Copy)]
pub struct Unscoped;

/// Index (or primary key) chosen.
#[derive(Debug, Clone, Copy)]
pub struct Indexed;

/// Range chosen; only ordering and paging remain.
#[derive(Debug, Clone, Copy)]
pub struct Final;

impl sealed::Sealed for Unscoped {}
impl sealed::Sealed for Indexed {}
impl sealed::Sealed for Final {}
impl Stage for Unscoped {}
impl Stage for Indexed {}
impl Stage for Final {}
impl Selectable for Unscoped {}
impl Selectable for Indexed {}

/// A query over one collection.
#[derive(Clone)]
pub struct Query<S: Stage = Unscoped> {
    db: Database,
    plan: QueryPlan,
    _stage: PhantomData<S>,
}

impl<S: Stage> std::fmt::Debug for Query<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query").field("plan", &self.plan).finish()
    }
}

impl Query<Unscoped> {
    pub(crate) fn new(db: Database, collection: impl Into<String>) -> Self {
        Self {
            db,
            plan: QueryPlan::new(collection),
            _stage: PhantomData,
        }
    }

    /// Scans through the named index.
    #[must_use]
    pub fn index(&self, name: impl Into<String>) -> Query<Indexed> {
        self.advance(self.plan.with_index(Some(name.into())))
    }

    /// Scans by primary key.
    #[must_use]
    pub fn primary_key(&self) -> Query<Indexed> {
        self.advance(self.plan.with_index(None))
    }
}

impl<S: Selectable> Query<S> {
    /// Key equals `key`.
    #[must_use]
    pub fn equals(&self, key: impl Into<Key>) -> Query<Final> {
        self.matching(Condition::Equals(key.into()))
    }

    /// Key is greater than `key`.
    #[must_use]
    pub fn gt(&self, key: impl Into<Key>) -> Query<Final> {
        self.matching(Condition::GreaterThan(key.into()))
    }

    /// Key is greater than or equal to `key`.
    #[must_use]
    pub fn gte(&self, key: impl Into<Key>) -> Query<Final> {
        self.matching(Condition::GreaterOrEqual(key.into()))
    }

    /// Key is less than `key`.
    #[must_use]
    pub fn lt(&self, key: impl Into<Key>) -> Query<Final> {
        self.matching(Condition::LessThan(key.into()))
    }

    /// Key is less than or equal to `key`.
    #[must_use]
    pub fn lte(&self, key: impl Into<Key>) -> Query<Final> {
        self.matching(Condition::LessOrEqual(key.into()))
    }

    /// Key is within `[lower, upper]`.
    #[must_use]
    pub fn between(&self, lower: impl Into<Key>, upper: impl Into<Key>) -> Query<Final> {
        self.matching(Condition::Between(lower.into(), upper.into()))
    }

    /// Key is a string starting with `prefix`.
    #[must_use]
    pub fn starts_with(&self, prefix: impl Into<String>) -> Query<Final> {
        self.matching(Condition::StartsWith(prefix.into()))
    }

    /// Applies a single condition.
    #[must_use]
    pub fn matching(&self, condition: Condition) -> Query<Final> {
        self.advance(self.plan.with_filter(Filter::Condition(condition)))
    }

    /// Applies several comparisons, resolved by precedence (or rejected
    /// in strict mode when they contradict each other).
    #[must_use]
    pub fn filter(&self, comparisons: Comparisons) -> Query<Final> {
        self.advance(self.plan.with_filter(Filter::Comparisons(comparisons)))
    }
}

impl<S: Stage> Query<S> {
    /// Sets the result order.
    #[must_use]
    pub fn order_by(&self, order: Order) -> Query<Final> {
        self.advance(self.plan.with_order(order))
    }

    /// Caps the number of results.
    #[must_use]
    pub fn limit(&self, limit: u32) -> Query<Final> {
        self.advance(self.plan.with_limit(Some(limit)))
    }

    /// Skips the first `offset` results.
    #[must_use]
    pub fn offset(&self, offset: u32) -> Query<Final> {
        self.advance(self.plan.with_offset(offset))
    }

    /// The plan built so far.
    #[must_use]
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// Resolves the plan without running it.
    ///
    /// # Errors
    ///
    /// Returns a validation error for malformed or (in strict mode)
    /// contradictory conditions.
    pub fn explain(&self) -> CoreResult<ResolvedPlan> {
        let resolved = self.plan.resolve(self.db.config().strict_conditions)?;
        debug!(plan = %resolved, "resolved");
        Ok(resolved)
    }

    /// Returns every matching record.
    ///
    /// # Errors
    ///
    /// Returns validation errors from resolution, the engine's error
    /// verbatim, [`crate::CoreError::TransactionAborted`] or
    /// [`crate::CoreError::Timeout`].
    pub async fn find_all(&self) -> CoreResult<Vec<Value>> {
        let plan = self.explain()?;
        self.executor().find_all(&plan).await
    }

    /// Returns the first matching record, honoring order and offset.
    ///
    /// # Errors
    ///
    /// As [`Query::find_all`].
    pub async fn find(&self) -> CoreResult<Option<Value>> {
        let plan = self.explain()?;
        self.executor().find(&plan).await
    }

    /// Counts matching records. Order, limit and offset are ignored.
    ///
    /// # Errors
    ///
    /// As [`Query::find_all`].
    pub async fn count(&self) -> CoreResult<u64> {
        let plan = self.explain()?;
        self.executor().count(&plan).await
    }

    fn executor(&self) -> Executor<'_> {
        Executor::new(
            self.db.connection(),
            self.db.config().timeout,
            self.db.defaults_for(self.plan.collection()),
        )
    }

    fn advance<T: Stage>(&self, plan: QueryPlan) -> Query<T> {
        Query {
            db: self.db.clone(),
            plan,
            _stage: PhantomData,
        }
    }
}
