//! Fan-out of ingest work with input-ordered aggregation.
//!
//! A [`TaskBatch`] spawns one task per filesystem entry and joins them in
//! spawn order, so results and failures come back in the order the entries
//! were discovered regardless of completion order. A task that fails on
//! shared infrastructure cancels the batch's token itself, as soon as it
//! fails, which stops its siblings at their next suspension point. Dropping
//! a batch cancels its token too, so no spawned task outlives it unnoticed.

use std::future::Future;
use std::path::{Path, PathBuf};

use anilib_common::{Error, Result};
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::state::{EventBus, EventPayload, ScanStage};

/// A folder or file that could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub stage: ScanStage,
    pub message: String,
}

/// What one ingest pass produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport<T> {
    /// Newly created entities, in discovery order.
    pub created: Vec<T>,
    /// Entries already cataloged (including lost creation races).
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
    /// The pass stopped early on cancellation; `created` holds what was
    /// committed before that.
    pub cancelled: bool,
}

impl<T> Default for ScanReport<T> {
    fn default() -> Self {
        Self {
            created: Vec::new(),
            skipped: 0,
            failures: Vec::new(),
            cancelled: false,
        }
    }
}

impl<T> ScanReport<T> {
    /// Fold one entry's outcome into the report.
    ///
    /// `Ok(None)` and "already exists" count as skipped. Item-local errors
    /// are recorded and broadcast; anything else is returned so the caller
    /// halts.
    pub fn record(
        &mut self,
        path: &Path,
        stage: ScanStage,
        result: Result<Option<T>>,
        events: &EventBus,
    ) -> Result<()> {
        match result {
            Ok(Some(item)) => self.created.push(item),
            Ok(None) => self.skipped += 1,
            Err(e) => self.fail(path, stage, e, events)?,
        }
        Ok(())
    }

    /// Record an item-local error, or return a fatal one.
    pub fn fail(&mut self, path: &Path, stage: ScanStage, err: Error, events: &EventBus) -> Result<()> {
        if err.is_already_exists() {
            self.skipped += 1;
            return Ok(());
        }
        if !err.is_item_local() {
            return Err(err);
        }

        tracing::warn!(path = %path.display(), stage = ?stage, error = %err, "Ingest failed for entry");
        let failure = ItemFailure {
            path: path.to_path_buf(),
            stage,
            message: err.to_string(),
        };
        events.broadcast(EventPayload::ItemFailed {
            path: failure.path.clone(),
            stage,
            message: failure.message.clone(),
        });
        self.failures.push(failure);
        Ok(())
    }

    /// Fold the results of a joined [`TaskBatch`].
    ///
    /// Item-local failures are recorded, cancelled entries mark the report
    /// as cancelled, and the first fatal error (in spawn order) is returned
    /// once every entry has been looked at.
    pub fn absorb<R>(
        &mut self,
        results: Vec<(PathBuf, Result<R>)>,
        stage: ScanStage,
        events: &EventBus,
        mut apply: impl FnMut(&mut Self, R),
    ) -> Result<()> {
        let mut fatal = None;
        for (path, result) in results {
            match result {
                Ok(value) => apply(self, value),
                Err(e) if e.is_cancelled() => self.cancelled = true,
                Err(e) => {
                    if let Err(e) = self.fail(&path, stage, e, events) {
                        fatal.get_or_insert(e);
                    }
                }
            }
        }
        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Append another report.
    pub fn merge(&mut self, other: ScanReport<T>) {
        self.created.extend(other.created);
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
        self.cancelled |= other.cancelled;
    }
}

/// Whether `err` should stop every sibling of the task that hit it.
fn halts_batch(err: &Error) -> bool {
    !err.is_item_local() && !err.is_cancelled()
}

/// Tasks keyed by the path they work on, joined in spawn order.
pub struct TaskBatch<T> {
    token: CancellationToken,
    tasks: Vec<(PathBuf, JoinHandle<Result<T>>)>,
}

impl<T: Send + 'static> TaskBatch<T> {
    /// Create a batch whose token is a child of `parent`.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
            tasks: Vec::new(),
        }
    }

    /// Token tasks should observe; cancelled when the batch halts.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Spawn `task`. A fatal error cancels the batch token as soon as the
    /// task returns it.
    pub fn spawn<F>(&mut self, key: PathBuf, task: F)
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let token = self.token.clone();
        let path = key.clone();
        let handle = tokio::spawn(async move {
            let result = task.await;
            if let Err(e) = &result {
                if halts_batch(e) && !token.is_cancelled() {
                    tracing::error!(path = %path.display(), error = %e, "Halting ingest batch");
                    token.cancel();
                }
            }
            result
        });
        self.tasks.push((key, handle));
    }

    /// Stop every task at its next suspension point.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task, returning `(key, result)` in spawn order.
    pub async fn join(mut self) -> Vec<(PathBuf, Result<T>)> {
        let tasks = std::mem::take(&mut self.tasks);
        let mut results = Vec::with_capacity(tasks.len());
        for (key, handle) in tasks {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    self.token.cancel();
                    Err(Error::internal(format!(
                        "task for {} aborted: {join_err}",
                        key.display()
                    )))
                }
            };
            results.push((key, result));
        }
        results
    }
}

impl<T> Drop for TaskBatch<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
