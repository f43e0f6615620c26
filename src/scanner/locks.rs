//! Per-path mutual exclusion shared by episode creation and original cleanup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A lock per filesystem path, created on first use.
///
/// Episode creation holds the lock of its source file from the dedup
/// re-check until the record is stored; deleting a converted original takes
/// the same lock, so a scan never probes or transcodes a file while it is
/// being removed.
#[derive(Clone, Default)]
pub struct PathLocks {
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Held lock on one path. Dropping it releases the lock and forgets idle
/// entries.
pub struct PathGuard {
    path: PathBuf,
    locks: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, path: &Path) -> PathGuard {
        let mutex = self
            .locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = mutex.lock_owned().await;
        PathGuard {
            path: path.to_path_buf(),
            locks: self.locks.clone(),
            guard: Some(guard),
        }
    }

    /// Number of paths with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for PathGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map holds the mutex once no guard or waiter references it.
        self.locks
            .remove_if(&self.path, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}
