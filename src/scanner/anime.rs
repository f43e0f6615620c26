//! Anime creation from the folders of the watch directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anilib_common::{Error, Result};
use anilib_db::models::Anime;
use anilib_db::pool::get_conn;
use anilib_db::queries::animes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::batch::{ScanReport, TaskBatch};
use super::title::folder_search_text;
use super::{walk, IngestContext};
use crate::metadata::{most_similar, LookupError, MetadataProvider};
use crate::state::{EventPayload, ScanStage};

/// Creates one anime per unknown folder directly below a watch directory.
#[derive(Clone)]
pub struct AnimeIngestor {
    ctx: IngestContext,
    provider: Arc<dyn MetadataProvider>,
}

impl AnimeIngestor {
    pub fn new(ctx: IngestContext, provider: Arc<dyn MetadataProvider>) -> Self {
        Self { ctx, provider }
    }

    /// Scan every directory concurrently and create the anime of unknown
    /// folders.
    ///
    /// A folder whose lookup fails is reported and skipped; a provider
    /// outage or store failure halts every directory. On cancellation the
    /// report holds what was created so far and is marked cancelled.
    pub async fn ingest(
        &self,
        directories: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<ScanReport<Anime>> {
        let mut batch = TaskBatch::new(cancel);
        for dir in directories {
            let this = self.clone();
            let token = batch.token();
            let root = dir.clone();
            batch.spawn(dir.clone(), async move {
                this.ingest_directory(&root, &token).await
            });
        }

        let mut report = ScanReport::default();
        report.absorb(
            batch.join().await,
            ScanStage::Anime,
            &self.ctx.events,
            |r, sub| r.merge(sub),
        )?;
        report.cancelled |= cancel.is_cancelled();

        info!(
            directories = directories.len(),
            created = report.created.len(),
            skipped = report.skipped,
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "Anime ingest finished"
        );
        Ok(report)
    }

    /// Folders of one watch directory, processed in name order.
    async fn ingest_directory(
        &self,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<ScanReport<Anime>> {
        let dir = root.to_path_buf();
        let folders = tokio::task::spawn_blocking(move || walk::list_child_directories(&dir))
            .await
            .map_err(|e| Error::internal(format!("directory listing aborted: {e}")))??;
        debug!(root = %root.display(), folders = folders.len(), "Scanning watch directory");

        let mut report = ScanReport::default();
        for folder in folders {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            match self.ingest_folder(&folder, cancel).await {
                Err(e) if e.is_cancelled() => {
                    report.cancelled = true;
                    break;
                }
                result => report.record(&folder, ScanStage::Anime, result, &self.ctx.events)?,
            }
        }
        Ok(report)
    }

    /// Create the anime of one folder; `None` when it is already cataloged.
    async fn ingest_folder(
        &self,
        folder: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<Anime>> {
        if self.ctx.catalog.exists_anime_at_path(folder)? {
            debug!(folder = %folder.display(), "Anime already cataloged");
            return Ok(None);
        }

        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut query = folder_search_text(&name);
        if query.is_empty() {
            query = name.trim().to_string();
        }

        let candidates: Vec<_> = self
            .provider
            .search_anime(&query, cancel)
            .await?
            .into_iter()
            .filter(|c| c.title.variants().next().is_some())
            .collect();
        let best = most_similar(candidates, &query)
            .ok_or_else(|| LookupError::NoMatch { query: query.clone() })?;
        debug!(
            query = %query,
            matched = %best.item.title.preferred(),
            score = best.score,
            provider = self.provider.name(),
            "Picked metadata match"
        );

        let new = best.item.into_new_anime(folder.to_path_buf());
        let anime = {
            let conn = get_conn(&self.ctx.pool)?;
            animes::create_anime(&conn, &new)?
        };

        info!(id = %anime.id, title = %anime.title.preferred(), folder = %folder.display(), "Anime created");
        self.ctx.events.broadcast(EventPayload::AnimeCreated {
            anime_id: anime.id,
            title: anime.title.preferred().to_string(),
            folder_path: anime.folder_path.clone(),
        });
        Ok(Some(anime))
    }
}
