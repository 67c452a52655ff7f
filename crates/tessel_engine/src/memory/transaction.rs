//! Transactions of the in-memory engine.

use super::store::CollectionData;
use super::EngineInner;
use crate::error::{EngineError, EngineResult};
use crate::request::{
    CursorCallback, CursorControl, CursorEvent, CursorRecord, CursorRequest, Direction, Request,
    RequestCallback, RequestKind, RequestOutput, Source, TransactionMode,
};
use crate::transaction::{
    AbortHandle, CompletionCallback, EngineTransaction, TransactionId, TransactionOutcome,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Work queued during the issue phase.
enum Pending {
    Request(Request, RequestCallback),
    Cursor(CursorRequest, CursorCallback),
}

impl Pending {
    fn collection(&self) -> &str {
        match self {
            Pending::Request(request, _) => &request.collection,
            Pending::Cursor(cursor, _) => &cursor.collection,
        }
    }

    fn cancel(self, error: EngineError) {
        match self {
            Pending::Request(_, callback) => callback(Err(error)),
            Pending::Cursor(_, mut callback) => {
                callback(CursorEvent::Failed(error));
            }
        }
    }
}

/// A transaction of [`super::MemoryEngine`].
///
/// Requests are validated and buffered when issued. Processing starts
/// when the transaction is committed or dropped, on a Tokio task when a
/// runtime is available and inline otherwise.
pub struct MemoryTransaction {
    id: TransactionId,
    mode: TransactionMode,
    scope: Vec<String>,
    engine: Arc<EngineInner>,
    queue: Mutex<Vec<Pending>>,
    completion: Mutex<Option<CompletionCallback>>,
    abort: AbortHandle,
    finished: bool,
}

impl MemoryTransaction {
    pub(crate) fn new(
        id: TransactionId,
        mode: TransactionMode,
        scope: Vec<String>,
        engine: Arc<EngineInner>,
    ) -> Self {
        Self {
            id,
            mode,
            scope,
            engine,
            queue: Mutex::new(Vec::new()),
            completion: Mutex::new(None),
            abort: AbortHandle::new(),
            finished: false,
        }
    }

    fn validate(&self, collection: &str, source: &Source, write: Option<&str>) -> EngineResult<()> {
        if !self.scope.iter().any(|name| name == collection) {
            return Err(EngineError::not_found(format!(
                "collection {collection:?} is not in the scope of {}",
                self.id
            )));
        }
        if let Some(request) = write {
            if self.mode == TransactionMode::ReadOnly {
                return Err(EngineError::read_only(request));
            }
            if source != &Source::Primary {
                return Err(EngineError::invalid_access(format!(
                    "{request} cannot be issued through {source}"
                )));
            }
        }
        if let Source::Index(index) = source {
            let state = self.engine.state.read();
            let known = state
                .get(collection)
                .is_some_and(|data| data.schema().find_index(index).is_some());
            if !known {
                return Err(EngineError::not_found(format!(
                    "index {index:?} on collection {collection:?}"
                )));
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        let job = Job {
            id: self.id,
            mode: self.mode,
            engine: Arc::clone(&self.engine),
            queue: std::mem::take(&mut *self.queue.lock()),
            completion: self.completion.lock().take(),
            abort: self.abort.clone(),
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { job.run() });
            }
            Err(_) => job.run(),
        }
    }
}

impl EngineTransaction for MemoryTransaction {
    fn id(&self) -> TransactionId {
        self.id
    }

    fn mode(&self) -> TransactionMode {
        self.mode
    }

    fn scope(&self) -> &[String] {
        &self.scope
    }

    fn issue(&self, request: Request, callback: RequestCallback) -> EngineResult<()> {
        let write = request.kind.is_write().then(|| request.kind.name());
        self.validate(&request.collection, &request.source, write)?;
        match &request.kind {
            RequestKind::Get(range) | RequestKind::Delete(range) => range.validate()?,
            RequestKind::GetAll {
                range: Some(range), ..
            }
            | RequestKind::Count(Some(range)) => range.validate()?,
            _ => {}
        }
        trace!(txn = %self.id, request = request.kind.name(), collection = %request.collection, "issued");
        self.queue.lock().push(Pending::Request(request, callback));
        Ok(())
    }

    fn open_cursor(&self, cursor: CursorRequest, callback: CursorCallback) -> EngineResult<()> {
        self.validate(&cursor.collection, &cursor.source, None)?;
        if let Some(range) = &cursor.range {
            range.validate()?;
        }
        trace!(txn = %self.id, collection = %cursor.collection, "cursor opened");
        self.queue.lock().push(Pending::Cursor(cursor, callback));
        Ok(())
    }

    fn on_complete(&self, callback: CompletionCallback) {
        *self.completion.lock() = Some(callback);
    }

    fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    fn commit(mut self: Box<Self>) {
        self.finish();
    }
}

impl Drop for MemoryTransaction {
    fn drop(&mut self) {
        self.finish();
    }
}

/// A committed transaction waiting to be processed.
struct Job {
    id: TransactionId,
    mode: TransactionMode,
    engine: Arc<EngineInner>,
    queue: Vec<Pending>,
    completion: Option<CompletionCallback>,
    abort: AbortHandle,
}

impl Job {
    fn run(mut self) {
        let queue = std::mem::take(&mut self.queue);
        let outcome = match self.mode {
            TransactionMode::ReadOnly => {
                let state = self.engine.state.read();
                self.process(queue, &mut Staged::Committed(&state))
            }
            TransactionMode::ReadWrite => {
                let mut state = self.engine.state.write();
                let mut staged = Staged::Copies(copy_touched(&state, &queue));
                let outcome = self.process(queue, &mut staged);
                if let (TransactionOutcome::Complete, Staged::Copies(copies)) = (&outcome, staged) {
                    state.extend(copies);
                }
                outcome
            }
        };

        match &outcome {
            TransactionOutcome::Complete => {
                self.engine.stats.record_commit();
                debug!(txn = %self.id, mode = %self.mode, "transaction complete");
            }
            TransactionOutcome::Aborted(error) => {
                self.engine.stats.record_abort();
                match error {
                    Some(error) => warn!(txn = %self.id, %error, "transaction aborted"),
                    None => warn!(txn = %self.id, "transaction aborted on request"),
                }
            }
        }

        if let Some(callback) = self.completion.take() {
            callback(outcome);
        }
    }

    fn process(
        &self,
        queue: Vec<Pending>,
        staged: &mut Staged<'_>,
    ) -> TransactionOutcome {
        let mut failure: Option<TransactionOutcome> = None;

        for pending in queue {
            if failure.is_none() && self.abort.is_aborted() {
                failure = Some(TransactionOutcome::Aborted(None));
            }
            if failure.is_some() {
                pending.cancel(EngineError::Abort);
                continue;
            }

            match pending {
                Pending::Request(request, callback) => {
                    self.engine.stats.record_request();
                    match apply(staged, &request) {
                        Ok(output) => callback(Ok(output)),
                        Err(error) => {
                            callback(Err(error.clone()));
                            failure = Some(TransactionOutcome::Aborted(Some(error)));
                        }
                    }
                }
                Pending::Cursor(cursor, callback) => {
                    self.engine.stats.record_request();
                    failure = self.walk(staged, &cursor, callback);
                }
            }
        }

        match failure {
            Some(outcome) => outcome,
            None if self.abort.is_aborted() => TransactionOutcome::Aborted(None),
            None => TransactionOutcome::Complete,
        }
    }

    fn walk(
        &self,
        staged: &Staged<'_>,
        cursor: &CursorRequest,
        mut callback: CursorCallback,
    ) -> Option<TransactionOutcome> {
        let entries = staged
            .get(&cursor.collection)
            .and_then(|data| data.scan(&cursor.source, cursor.range.as_ref(), cursor.direction));
        let entries = match entries {
            Ok(entries) => entries,
            Err(error) => {
                callback(CursorEvent::Failed(error.clone()));
                return Some(TransactionOutcome::Aborted(Some(error)));
            }
        };

        for (key, primary_key, value) in entries {
            if self.abort.is_aborted() {
                callback(CursorEvent::Failed(EngineError::Abort));
                return Some(TransactionOutcome::Aborted(None));
            }
            self.engine.stats.record_cursor_visit();
            let record = CursorRecord {
                key: key.clone(),
                primary_key: primary_key.clone(),
                value: value.clone(),
            };
            if callback(CursorEvent::Record(record)) == CursorControl::Stop {
                return None;
            }
        }
        callback(CursorEvent::Exhausted);
        None
    }
}

/// Collections a job works on.
enum Staged<'a> {
    /// Committed state, read in place while the read lock is held.
    Committed(&'a BTreeMap<String, CollectionData>),
    /// Copies of the collections a read-write job touches, swapped in on
    /// success.
    Copies(BTreeMap<String, CollectionData>),
}

impl Staged<'_> {
    fn get(&self, collection: &str) -> EngineResult<&CollectionData> {
        let data = match self {
            Staged::Committed(state) => state.get(collection),
            Staged::Copies(copies) => copies.get(collection),
        };
        data.ok_or_else(|| EngineError::not_found(format!("collection {collection:?}")))
    }

    fn get_mut(&mut self, collection: &str, request: &str) -> EngineResult<&mut CollectionData> {
        match self {
            Staged::Committed(_) => Err(EngineError::read_only(request)),
            Staged::Copies(copies) => copies
                .get_mut(collection)
                .ok_or_else(|| EngineError::not_found(format!("collection {collection:?}"))),
        }
    }
}

/// Copies the collections named by queued work, each once.
fn copy_touched(
    state: &BTreeMap<String, CollectionData>,
    queue: &[Pending],
) -> BTreeMap<String, CollectionData> {
    let mut copies = BTreeMap::new();
    for pending in queue {
        let name = pending.collection();
        if copies.contains_key(name) {
            continue;
        }
        if let Some(data) = state.get(name) {
            copies.insert(name.to_string(), data.clone());
        }
    }
    copies
}

fn apply(staged: &mut Staged<'_>, request: &Request) -> EngineResult<RequestOutput> {
    let source = &request.source;
    let collection = request.collection.as_str();
    if request.kind.is_write() {
        return write(staged.get_mut(collection, request.kind.name())?, &request.kind);
    }

    let data = staged.get(collection)?;
    let output = match &request.kind {
        RequestKind::Get(range) => RequestOutput::Record(
            data.scan(source, Some(range), Direction::Forward)?
                .next()
                .map(|(_, _, value)| value.clone()),
        ),
        RequestKind::GetAll { range, count } => {
            // A count of zero means no cap.
            let cap = match count {
                Some(0) | None => usize::MAX,
                Some(n) => *n as usize,
            };
            RequestOutput::Records(
                data.scan(source, range.as_ref(), Direction::Forward)?
                    .take(cap)
                    .map(|(_, _, value)| value.clone())
                    .collect(),
            )
        }
        RequestKind::Count(range) => RequestOutput::Count(
            data.scan(source, range.as_ref(), Direction::Forward)?
                .count() as u64,
        ),
        other => {
            return Err(EngineError::invalid_state(format!(
                "{} is not a read",
                other.name()
            )))
        }
    };
    Ok(output)
}

fn write(data: &mut CollectionData, kind: &RequestKind) -> EngineResult<RequestOutput> {
    let output = match kind {
        RequestKind::Put { value, key } => {
            RequestOutput::Key(data.store(value.clone(), key.clone(), true)?)
        }
        RequestKind::Add { value, key } => {
            RequestOutput::Key(data.store(value.clone(), key.clone(), false)?)
        }
        RequestKind::Delete(range) => {
            data.delete(range);
            RequestOutput::Done
        }
        RequestKind::Clear => {
            data.clear();
            RequestOutput::Done
        }
        other => {
            return Err(EngineError::invalid_state(format!(
                "{} is not a write",
                other.name()
            )))
        }
    };
    Ok(output)
}
