//! Query execution.
//!
//! A [`ResolvedPlan`] runs in its own read-only transaction over the
//! plan's collection. Plans without offset or limit take the bulk path
//! (one `GetAll`, reversed client-side for descending order); all others
//! walk a directional cursor, skipping `offset` records and stopping as
//! soon as `limit` records are collected. The cursor path therefore costs
//! `offset + collected` record visits.

use super::plan::{Order, ResolvedPlan, Strategy};
use crate::bridge::{issue_phase, pending, pending_request, Resolver};
use crate::error::{CoreError, CoreResult};
use serde_json::{Map, Value};
use std::time::Duration;
use tessel_engine::{
    Connection, CursorCallback, CursorControl, CursorEvent, CursorRequest, EngineResult,
    EngineTransaction, Request, RequestKind, RequestOutput, TransactionMode,
};
use tracing::debug;

/// Merges `defaults` under the fields of `record`.
///
/// Defaults are applied first and the record's own fields win. Only the
/// top level is merged; records that are not objects are returned as is.
#[must_use]
pub fn apply_defaults(defaults: &Map<String, Value>, record: Value) -> Value {
    match record {
        Value::Object(fields) => {
            let mut merged = defaults.clone();
            merged.extend(fields);
            Value::Object(merged)
        }
        other => other,
    }
}

/// Runs resolved plans against a connection.
pub(crate) struct Executor<'a> {
    connection: &'a dyn Connection,
    timeout: Option<Duration>,
    defaults: Option<Map<String, Value>>,
}

impl<'a> Executor<'a> {
    pub(crate) fn new(
        connection: &'a dyn Connection,
        timeout: Option<Duration>,
        defaults: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            connection,
            timeout,
            defaults,
        }
    }

    /// Returns every record the plan selects.
    pub(crate) async fn find_all(&self, plan: &ResolvedPlan) -> CoreResult<Vec<Value>> {
        let strategy = plan.strategy();
        debug!(%plan, "executing query");
        let records = match strategy {
            Strategy::Bulk => self.bulk(plan).await?,
            Strategy::Cursor => self.walk(plan).await?,
        };
        Ok(match &self.defaults {
            Some(defaults) => records
                .into_iter()
                .map(|record| apply_defaults(defaults, record))
                .collect(),
            None => records,
        })
    }

    /// Returns the first record the plan selects.
    pub(crate) async fn find(&self, plan: &ResolvedPlan) -> CoreResult<Option<Value>> {
        Ok(self.find_all(&plan.capped(1)).await?.into_iter().next())
    }

    /// Counts the records in the plan's range. Order, limit and offset
    /// are ignored.
    pub(crate) async fn count(&self, plan: &ResolvedPlan) -> CoreResult<u64> {
        debug!(%plan, "counting");
        let request = Request::new(plan.collection(), RequestKind::Count(plan.range().cloned()))
            .via(plan.source().clone());
        match self.single(plan, request).await? {
            RequestOutput::Count(count) => Ok(count),
            other => Err(CoreError::unexpected_output("count", other.shape())),
        }
    }

    async fn bulk(&self, plan: &ResolvedPlan) -> CoreResult<Vec<Value>> {
        let request = Request::new(
            plan.collection(),
            RequestKind::GetAll {
                range: plan.range().cloned(),
                count: None,
            },
        )
        .via(plan.source().clone());

        let mut records = match self.single(plan, request).await? {
            RequestOutput::Records(records) => records,
            other => return Err(CoreError::unexpected_output("records", other.shape())),
        };
        if plan.order() == Order::Descending {
            records.reverse();
        }
        Ok(records)
    }

    async fn walk(&self, plan: &ResolvedPlan) -> CoreResult<Vec<Value>> {
        if plan.limit() == Some(0) {
            debug!(%plan, "limit is zero, skipping scan");
            return Ok(Vec::new());
        }

        let (resolver, records) = pending();
        let collector = Collector::new(plan.offset(), plan.limit(), resolver);
        let cursor = CursorRequest {
            collection: plan.collection().to_string(),
            source: plan.source().clone(),
            range: plan.range().cloned(),
            direction: plan.order().direction(),
        };

        let ((), completion) = issue_phase(self.open(plan)?, move |txn| {
            txn.open_cursor(cursor, collector.into_callback())?;
            Ok(())
        })?;
        // On failure or timeout the buffered records are dropped here.
        completion.wait(self.timeout).await?;
        records.take()
    }

    async fn single(&self, plan: &ResolvedPlan, request: Request) -> CoreResult<RequestOutput> {
        let (pending, completion) = issue_phase(self.open(plan)?, move |txn| {
            let (callback, pending) = pending_request();
            txn.issue(request, callback)?;
            Ok(pending)
        })?;
        completion.wait(self.timeout).await?;
        pending.take()
    }

    fn open(&self, plan: &ResolvedPlan) -> CoreResult<Box<dyn EngineTransaction>> {
        let scope = [plan.collection().to_string()];
        Ok(self.connection.transaction(&scope, TransactionMode::ReadOnly)?)
    }
}

/// Cursor callback state: skips, collects, then stops.
struct Collector {
    skip: u32,
    limit: Option<usize>,
    records: Vec<Value>,
    resolver: Option<Resolver<Vec<Value>>>,
}

impl Collector {
    fn new(offset: u32, limit: Option<u32>, resolver: Resolver<Vec<Value>>) -> Self {
        let limit = limit.map(|l| l as usize);
        Self {
            skip: offset,
            limit,
            records: Vec::with_capacity(limit.unwrap_or(0).min(1024)),
            resolver: Some(resolver),
        }
    }

    fn into_callback(mut self) -> CursorCallback {
        Box::new(move |event| self.on_event(event))
    }

    fn on_event(&mut self, event: CursorEvent) -> CursorControl {
        match event {
            CursorEvent::Record(record) => {
                if self.skip > 0 {
                    self.skip -= 1;
                    return CursorControl::Continue;
                }
                self.records.push(record.value);
                if self.limit.is_some_and(|limit| self.records.len() >= limit) {
                    self.finish(Ok(()));
                    CursorControl::Stop
                } else {
                    CursorControl::Continue
                }
            }
            CursorEvent::Exhausted => {
                self.finish(Ok(()));
                CursorControl::Stop
            }
            CursorEvent::Failed(error) => {
                self.finish(Err(error));
                CursorControl::Stop
            }
        }
    }

    fn finish(&mut self, result: EngineResult<()>) {
        if let Some(resolver) = self.resolver.take() {
            let records = std::mem::take(&mut self.records);
            resolver.resolve(result.map(|()| records));
        }
    }
}
