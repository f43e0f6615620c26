//! Library update orchestration.
//!
//! [`LibraryService`] owns the library status and runs one update at a
//! time: sweep the catalog, ingest anime from the watch directories, ingest
//! episodes for every cataloged anime and, when configured, delete the
//! sources of transcoded episodes. Progress is broadcast on the
//! [`EventBus`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anilib_common::{Error, LibraryStatus, Result};
use anilib_db::pool::{get_conn, DbPool};
use anilib_db::queries::{animes, watch_directories};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::scanner::{IngestService, ItemFailure};
use crate::state::{EventBus, EventPayload};

/// Outcome of one library update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSummary {
    pub animes_removed: usize,
    pub episodes_removed: usize,
    pub animes_created: usize,
    pub episodes_created: usize,
    pub originals_deleted: usize,
    pub failures: Vec<ItemFailure>,
    pub cancelled: bool,
}

pub struct LibraryService {
    pool: DbPool,
    events: Arc<EventBus>,
    ingest: IngestService,
    delete_converted_originals: bool,
    status: RwLock<LibraryStatus>,
    running: Mutex<Option<CancellationToken>>,
}

impl LibraryService {
    pub fn new(
        pool: DbPool,
        events: Arc<EventBus>,
        ingest: IngestService,
        delete_converted_originals: bool,
    ) -> Self {
        Self {
            pool,
            events,
            ingest,
            delete_converted_originals,
            status: RwLock::new(LibraryStatus::Idle),
            running: Mutex::new(None),
        }
    }

    pub fn status(&self) -> LibraryStatus {
        *self.status.read()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn ingest(&self) -> &IngestService {
        &self.ingest
    }

    /// Start an update in the background.
    ///
    /// Fails with `Conflict` while another update is running.
    pub fn start_update(self: &Arc<Self>) -> Result<()> {
        let token = self.begin()?;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = this.run(token).await {
                error!(error = %e, "Library update failed");
            }
        });
        Ok(())
    }

    /// Run an update to completion on the current task.
    pub async fn update(&self) -> Result<UpdateSummary> {
        let token = self.begin()?;
        self.run(token).await
    }

    /// Cancel the running update. Returns `false` when none is running.
    pub fn cancel(&self) -> bool {
        match self.running.lock().as_ref() {
            Some(token) => {
                info!("Cancelling library update");
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn begin(&self) -> Result<CancellationToken> {
        let mut running = self.running.lock();
        if running.is_some() {
            return Err(Error::Conflict("a library update is already running".into()));
        }
        let token = CancellationToken::new();
        *running = Some(token.clone());
        self.set_status(LibraryStatus::Updating);
        Ok(token)
    }

    fn finish(&self) {
        *self.running.lock() = None;
        self.set_status(LibraryStatus::Idle);
    }

    fn set_status(&self, status: LibraryStatus) {
        *self.status.write() = status;
        self.events.broadcast(EventPayload::StatusChanged { status });
    }

    async fn run(&self, token: CancellationToken) -> Result<UpdateSummary> {
        let mut summary = UpdateSummary::default();
        let result = self.run_steps(&token, &mut summary).await;

        let outcome = match result {
            Ok(()) if summary.cancelled => {
                warn!("Library update cancelled");
                Ok(summary)
            }
            Ok(()) => Ok(summary),
            Err(e) if e.is_cancelled() => {
                warn!("Library update cancelled");
                summary.cancelled = true;
                Ok(summary)
            }
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(summary) => {
                info!(
                    animes_created = summary.animes_created,
                    episodes_created = summary.episodes_created,
                    failures = summary.failures.len(),
                    cancelled = summary.cancelled,
                    "Library update finished"
                );
                self.events.broadcast(EventPayload::ScanCompleted {
                    animes_created: summary.animes_created,
                    episodes_created: summary.episodes_created,
                    failures: summary.failures.len(),
                    cancelled: summary.cancelled,
                });
            }
            Err(e) => self.events.broadcast(EventPayload::ScanFailed {
                message: e.to_string(),
            }),
        }

        self.finish();
        outcome
    }

    async fn run_steps(&self, token: &CancellationToken, summary: &mut UpdateSummary) -> Result<()> {
        let sweeper = &self.ingest.sweeper;
        summary.animes_removed = sweeper.delete_invalid_animes().await?.len();
        summary.episodes_removed = sweeper.delete_invalid_episodes().await?.len();
        self.events.broadcast(EventPayload::SweepCompleted {
            animes_removed: summary.animes_removed,
            episodes_removed: summary.episodes_removed,
            originals_deleted: 0,
        });

        let directories = self.watch_directories()?;
        self.events.broadcast(EventPayload::ScanStarted {
            directories: directories.len(),
        });

        let anime_report = self.ingest.animes.ingest(&directories, token).await?;
        summary.animes_created = anime_report.created.len();
        summary.failures.extend(anime_report.failures);
        if anime_report.cancelled {
            summary.cancelled = true;
            return Ok(());
        }

        let all = {
            let conn = get_conn(&self.pool)?;
            animes::list_animes(&conn)?
        };
        let episode_report = self.ingest.episodes.ingest_for_animes(&all, token).await?;
        summary.episodes_created = episode_report.created.len();
        summary.failures.extend(episode_report.failures);
        if episode_report.cancelled {
            summary.cancelled = true;
            return Ok(());
        }

        if self.delete_converted_originals {
            if token.is_cancelled() {
                return Err(Error::Cancelled);
            }
            let report = sweeper.delete_converted_originals().await?;
            summary.originals_deleted = report.created.len();
            summary.failures.extend(report.failures);
            self.events.broadcast(EventPayload::SweepCompleted {
                animes_removed: 0,
                episodes_removed: 0,
                originals_deleted: summary.originals_deleted,
            });
        }
        Ok(())
    }

    /// Registered watch directories, first registration wins.
    fn watch_directories(&self) -> Result<Vec<PathBuf>> {
        let conn = get_conn(&self.pool)?;
        let mut seen = HashSet::new();
        Ok(watch_directories::list_watch_directories(&conn)?
            .into_iter()
            .filter(|d| seen.insert(d.clone()))
            .collect())
    }
}

/// Register the configured watch directories that are not in the catalog
/// yet. Returns how many were added.
pub fn register_watch_directories(pool: &DbPool, directories: &[PathBuf]) -> Result<usize> {
    let conn = get_conn(pool)?;
    let known: HashSet<PathBuf> = watch_directories::list_watch_directories(&conn)?
        .into_iter()
        .collect();

    let mut added = 0;
    for dir in directories {
        if known.contains(dir.as_path()) {
            continue;
        }
        watch_directories::add_watch_directory(&conn, dir)?;
        info!(path = %dir.display(), "Registered watch directory");
        added += 1;
    }
    Ok(added)
}

/// Register one directory through the API. Relative paths are rejected.
pub fn add_watch_directory(pool: &DbPool, dir: &Path) -> Result<()> {
    if !dir.is_absolute() {
        return Err(Error::invalid_input(format!(
            "watch directory must be absolute: {}",
            dir.display()
        )));
    }
    let conn = get_conn(pool)?;
    watch_directories::add_watch_directory(&conn, dir)
}
