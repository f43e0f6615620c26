//! Episode creation for cataloged anime, with bounded transcoding.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anilib_av::{CoverRequest, MediaToolkit};
use anilib_common::{AnimeId, Error, Result};
use anilib_db::models::{Anime, Episode, NewEpisode};
use anilib_db::pool::get_conn;
use anilib_db::queries::{episodes, settings, subtitles};
use sha2::{Digest, Sha256};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::batch::{ScanReport, TaskBatch};
use super::decision::decide;
use super::title::episode_title;
use super::{walk, IngestContext, IngestOptions};
use crate::state::{EventPayload, ScanStage};

const COVER_NAME: &str = "episode_cover";

/// Creates one episode per unknown video file below each anime's folder.
///
/// Creation of a file (probe, cover, optional transcode, insert) holds a
/// permit of a semaphore shared by every task of this ingestor, so at most
/// `max_concurrent` transcodes run process-wide.
#[derive(Clone)]
pub struct EpisodeIngestor {
    ctx: IngestContext,
    toolkit: Arc<dyn MediaToolkit>,
    semaphore: Arc<Semaphore>,
    options: Arc<IngestOptions>,
}

impl EpisodeIngestor {
    pub fn new(ctx: IngestContext, toolkit: Arc<dyn MediaToolkit>, options: IngestOptions) -> Self {
        Self {
            ctx,
            toolkit,
            semaphore: Arc::new(Semaphore::new(options.max_concurrent.max(1))),
            options: Arc::new(options),
        }
    }

    /// Creation slots currently free.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Scan every anime concurrently and create episodes for unknown files.
    ///
    /// On cancellation the report holds the episodes committed so far and is
    /// marked cancelled.
    pub async fn ingest_for_animes(
        &self,
        animes: &[Anime],
        cancel: &CancellationToken,
    ) -> Result<ScanReport<Episode>> {
        let mut batch = TaskBatch::new(cancel);
        for anime in animes {
            let this = self.clone();
            let token = batch.token();
            let anime_id = anime.id;
            let folder = anime.folder_path.clone();
            batch.spawn(anime.folder_path.clone(), async move {
                this.ingest_anime(anime_id, &folder, &token).await
            });
        }

        let mut report = ScanReport::default();
        report.absorb(
            batch.join().await,
            ScanStage::Episode,
            &self.ctx.events,
            |r, sub| r.merge(sub),
        )?;
        report.cancelled |= cancel.is_cancelled();

        info!(
            animes = animes.len(),
            created = report.created.len(),
            skipped = report.skipped,
            failures = report.failures.len(),
            cancelled = report.cancelled,
            "Episode ingest finished"
        );
        Ok(report)
    }

    async fn ingest_anime(
        &self,
        anime_id: AnimeId,
        folder: &Path,
        cancel: &CancellationToken,
    ) -> Result<ScanReport<Episode>> {
        let root = folder.to_path_buf();
        let files = tokio::task::spawn_blocking(move || walk::find_episode_files(&root))
            .await
            .map_err(|e| Error::internal(format!("episode walk aborted: {e}")))?;
        debug!(folder = %folder.display(), files = files.len(), "Scanning anime folder");

        let mut report = ScanReport::default();
        let mut batch = TaskBatch::new(cancel);
        for file in self.drop_own_outputs(files) {
            match self.ctx.catalog.exists_episode_at_path(&file) {
                Ok(true) => {
                    report.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    batch.cancel();
                    batch.join().await;
                    return Err(e);
                }
            }
            let this = self.clone();
            let token = batch.token();
            let path = file.clone();
            batch.spawn(file, async move {
                this.create_episode(anime_id, &path, &token).await
            });
        }

        report.absorb(
            batch.join().await,
            ScanStage::Episode,
            &self.ctx.events,
            |r, created| match created {
                Some(episode) => r.created.push(episode),
                None => r.skipped += 1,
            },
        )?;
        Ok(report)
    }

    /// Remove transcode outputs whose source sits next to them; those are
    /// cataloged through the source. An output without its source is kept.
    fn drop_own_outputs(&self, files: Vec<PathBuf>) -> Vec<PathBuf> {
        let stems: HashSet<(PathBuf, String)> = files
            .iter()
            .filter_map(|f| Some((f.parent()?.to_path_buf(), stem_of(f)?)))
            .collect();

        files
            .into_iter()
            .filter(|f| {
                let (Some(dir), Some(stem)) = (f.parent(), stem_of(f)) else {
                    return true;
                };
                match self.options.source_stem(&stem) {
                    Some(source) => !stems.contains(&(dir.to_path_buf(), source.to_string())),
                    None => true,
                }
            })
            .collect()
    }

    /// Create the episode of one file; `None` if it was cataloged meanwhile.
    async fn create_episode(
        &self,
        anime_id: AnimeId,
        source: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<Episode>> {
        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            permit = self.semaphore.clone().acquire_owned() => {
                permit.map_err(|_| Error::internal("episode creation gate closed"))?
            }
        };
        let _lock = self.ctx.locks.lock(source).await;

        if self.ctx.catalog.exists_episode_at_path(source)? {
            debug!(path = %source.display(), "Episode cataloged by a concurrent scan");
            return Ok(None);
        }
        if !tokio::fs::try_exists(source).await? {
            return Err(Error::not_found("file", source.display()));
        }

        let stem = stem_of(source).unwrap_or_default();
        let mut title = episode_title(&stem);
        if title.is_empty() {
            title = stem.clone();
        }

        let decision = decide(self.toolkit.as_ref(), source, cancel).await?;
        let cover_image_path = self.extract_cover(source, cancel).await?;

        let (file_path, original_file_path) = if decision.needs_transcode() {
            let use_hw = self.use_hardware_acceleration()?;
            let request = self.options.transcode_request(source, use_hw)?;
            info!(
                path = %source.display(),
                video = decision.video_supported,
                audio = decision.audio_supported,
                container = decision.container_supported,
                hardware = use_hw,
                "Transcoding episode"
            );
            let output = self.toolkit.transcode_to_mp4(&request, cancel).await?;
            (output, Some(source.to_path_buf()))
        } else {
            (source.to_path_buf(), None)
        };
        let transcoded = original_file_path.is_some();

        let episode = {
            let conn = get_conn(&self.ctx.pool)?;
            let episode = episodes::create_episode(
                &conn,
                &NewEpisode {
                    anime_id,
                    title,
                    file_path,
                    original_file_path,
                    cover_image_path,
                },
            )?;
            for (path, language) in walk::find_sidecar_subtitles(source) {
                match subtitles::create_subtitle(&conn, episode.id, &path, language.as_deref()) {
                    Ok(_) => debug!(subtitle = %path.display(), "Subtitle attached"),
                    Err(e) if e.is_already_exists() => {}
                    Err(e) => return Err(e),
                }
            }
            episode
        };

        info!(id = %episode.id, title = %episode.title, transcoded, "Episode created");
        self.ctx.events.broadcast(EventPayload::EpisodeCreated {
            episode_id: episode.id,
            anime_id,
            title: episode.title.clone(),
            transcoded,
        });
        Ok(Some(episode))
    }

    /// Grab the cover frame from the source. A failed extraction leaves the
    /// episode without a cover; a missing tool or cancellation is returned.
    async fn extract_cover(
        &self,
        source: &Path,
        cancel: &CancellationToken,
    ) -> Result<Option<PathBuf>> {
        let digest = hex::encode(Sha256::digest(source.to_string_lossy().as_bytes()));
        let request = CoverRequest {
            input: source.to_path_buf(),
            at_second: self.options.cover_second,
            output_dir: self.options.covers_dir.join(digest),
            output_name: COVER_NAME.to_string(),
            scale_width: self.options.cover_width,
        };

        match self.toolkit.extract_cover_image(&request, cancel).await {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                let err = Error::from(e);
                if !err.is_item_local() {
                    return Err(err);
                }
                warn!(path = %source.display(), error = %err, "Cover extraction failed");
                Ok(None)
            }
        }
    }

    fn use_hardware_acceleration(&self) -> Result<bool> {
        let conn = get_conn(&self.ctx.pool)?;
        Ok(settings::get_setting(&conn, settings::USE_HARDWARE_ACCELERATION)?
            .map(|s| s.value)
            .unwrap_or(self.options.default_hardware_acceleration))
    }
}

fn stem_of(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}
