//! Catalog reconciliation against the filesystem.

use std::path::{Path, PathBuf};

use anilib_common::Result;
use anilib_db::models::{Anime, Episode};
use anilib_db::pool::get_conn;
use anilib_db::queries::{animes, episodes};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::batch::ScanReport;
use super::IngestContext;
use crate::state::{EventPayload, ScanStage};

/// Counts of one full sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub animes_removed: usize,
    pub episodes_removed: usize,
    pub originals_deleted: usize,
    pub failures: usize,
}

/// Removes catalog entries whose files are gone, and source files that
/// have been replaced by a transcode.
#[derive(Clone)]
pub struct ReconciliationSweeper {
    ctx: IngestContext,
}

impl ReconciliationSweeper {
    pub fn new(ctx: IngestContext) -> Self {
        Self { ctx }
    }

    /// Delete every anime whose folder no longer exists. Its episodes are
    /// left to [`Self::delete_invalid_episodes`].
    pub async fn delete_invalid_animes(&self) -> Result<Vec<Anime>> {
        let all = {
            let conn = get_conn(&self.ctx.pool)?;
            animes::list_animes(&conn)?
        };

        let mut removed = Vec::new();
        for anime in all {
            if path_exists(&anime.folder_path).await {
                continue;
            }
            let conn = get_conn(&self.ctx.pool)?;
            if animes::delete_anime(&conn, anime.id)? {
                info!(id = %anime.id, folder = %anime.folder_path.display(), "Removed anime with missing folder");
                removed.push(anime);
            }
        }
        Ok(removed)
    }

    /// Delete every episode whose playable file no longer exists.
    pub async fn delete_invalid_episodes(&self) -> Result<Vec<Episode>> {
        let all = {
            let conn = get_conn(&self.ctx.pool)?;
            episodes::list_episodes(&conn)?
        };

        let mut removed = Vec::new();
        for episode in all {
            if path_exists(&episode.file_path).await {
                continue;
            }
            let conn = get_conn(&self.ctx.pool)?;
            if episodes::delete_episode(&conn, episode.id)? {
                info!(id = %episode.id, path = %episode.file_path.display(), "Removed episode with missing file");
                removed.push(episode);
            }
        }
        Ok(removed)
    }

    /// Delete the source file of every transcoded episode from disk. The
    /// catalog keeps the original path, so the file is never re-ingested.
    ///
    /// A source is only deleted while its transcode is still on disk.
    pub async fn delete_converted_originals(&self) -> Result<ScanReport<PathBuf>> {
        let converted = {
            let conn = get_conn(&self.ctx.pool)?;
            episodes::list_converted_episodes(&conn)?
        };

        let mut report = ScanReport::default();
        for episode in converted {
            let Some(original) = episode.original_file_path.as_deref() else {
                continue;
            };
            let result = self.delete_original(original, &episode.file_path).await;
            report.record(original, ScanStage::Sweep, result, &self.ctx.events)?;
        }
        Ok(report)
    }

    async fn delete_original(&self, original: &Path, converted: &Path) -> Result<Option<PathBuf>> {
        let _lock = self.ctx.locks.lock(original).await;

        if !path_exists(original).await {
            return Ok(None);
        }
        if !path_exists(converted).await {
            warn!(original = %original.display(), converted = %converted.display(), "Transcode missing, keeping original");
            return Ok(None);
        }

        tokio::fs::remove_file(original).await?;
        info!(path = %original.display(), "Deleted converted original");
        Ok(Some(original.to_path_buf()))
    }

    /// Run the two catalog sweeps and, when asked, the original cleanup.
    pub async fn sweep(&self, delete_originals: bool) -> Result<SweepReport> {
        let animes_removed = self.delete_invalid_animes().await?.len();
        let episodes_removed = self.delete_invalid_episodes().await?.len();
        let (originals_deleted, failures) = if delete_originals {
            let report = self.delete_converted_originals().await?;
            (report.created.len(), report.failures.len())
        } else {
            (0, 0)
        };

        let report = SweepReport {
            animes_removed,
            episodes_removed,
            originals_deleted,
            failures,
        };
        self.ctx.events.broadcast(EventPayload::SweepCompleted {
            animes_removed,
            episodes_removed,
            originals_deleted,
        });
        debug!(?report, "Sweep finished");
        Ok(report)
    }
}

/// Unreadable paths count as present so they are never swept by mistake.
async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EventBus;
    use anilib_common::{AnimeFormat, AnimeStatus};
    use anilib_db::models::{AnimeTitle, NewAnime, NewEpisode};
    use anilib_db::pool::init_memory_pool;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn sweeper() -> ReconciliationSweeper {
        ReconciliationSweeper::new(IngestContext::new(
            init_memory_pool().unwrap(),
            Arc::new(EventBus::default()),
        ))
    }

    fn new_anime(folder: PathBuf) -> NewAnime {
        NewAnime {
            anilist_id: 1,
            title: AnimeTitle {
                romaji: Some("Cowboy Bebop".into()),
                english: None,
                native: None,
            },
            cover_url: None,
            description: None,
            episodes: Some(26),
            release_date: None,
            status: AnimeStatus::Finished,
            genres: Vec::new(),
            format: AnimeFormat::Tv,
            folder_path: folder,
        }
    }

    #[tokio::test]
    async fn missing_anime_folder_is_removed() {
        let tmp = TempDir::new().unwrap();
        let kept = tmp.path().join("Kept");
        std::fs::create_dir(&kept).unwrap();
        let s = sweeper();
        {
            let conn = get_conn(&s.ctx.pool).unwrap();
            animes::create_anime(&conn, &new_anime(kept.clone())).unwrap();
            animes::create_anime(&conn, &new_anime(tmp.path().join("Gone"))).unwrap();
        }

        let removed = s.delete_invalid_animes().await.unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].folder_path, tmp.path().join("Gone"));

        let conn = get_conn(&s.ctx.pool).unwrap();
        let left = animes::list_animes(&conn).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].folder_path, kept);
    }

    #[tokio::test]
    async fn originals_deleted_only_when_transcode_present() {
        let tmp = TempDir::new().unwrap();
        let original = tmp.path().join("01.mkv");
        let converted = tmp.path().join("01 [ANILIB COMPATIBLE].mp4");
        let orphan = tmp.path().join("02.mkv");
        for f in [&original, &converted, &orphan] {
            std::fs::write(f, b"x").unwrap();
        }
        let s = sweeper();
        {
            let conn = get_conn(&s.ctx.pool).unwrap();
            let anime = animes::create_anime(&conn, &new_anime(tmp.path().to_path_buf())).unwrap();
            episodes::create_episode(
                &conn,
                &NewEpisode {
                    anime_id: anime.id,
                    title: "01".into(),
                    file_path: converted.clone(),
                    original_file_path: Some(original.clone()),
                    cover_image_path: None,
                },
            )
            .unwrap();
            episodes::create_episode(
                &conn,
                &NewEpisode {
                    anime_id: anime.id,
                    title: "02".into(),
                    file_path: tmp.path().join("02 [ANILIB COMPATIBLE].mp4"),
                    original_file_path: Some(orphan.clone()),
                    cover_image_path: None,
                },
            )
            .unwrap();
        }

        let report = s.delete_converted_originals().await.unwrap();
        assert_eq!(report.created, vec![original.clone()]);
        assert!(!original.exists());
        assert!(converted.exists());
        assert!(orphan.exists());

        // Catalog still remembers the original path.
        let conn = get_conn(&s.ctx.pool).unwrap();
        assert!(episodes::find_episode_by_path(&conn, &original).unwrap().is_some());
    }

    #[tokio::test]
    async fn full_sweep_reports_counts() {
        let tmp = TempDir::new().unwrap();
        let s = sweeper();
        let mut rx = s.ctx.events.subscribe();
        {
            let conn = get_conn(&s.ctx.pool).unwrap();
            let anime = animes::create_anime(&conn, &new_anime(tmp.path().join("Gone"))).unwrap();
            episodes::create_episode(
                &conn,
                &NewEpisode {
                    anime_id: anime.id,
                    title: "01".into(),
                    file_path: tmp.path().join("Gone/01.mp4"),
                    original_file_path: None,
                    cover_image_path: None,
                },
            )
            .unwrap();
        }

        let report = s.sweep(true).await.unwrap();
        assert_eq!(report.animes_removed, 1);
        assert_eq!(report.episodes_removed, 1);
        assert_eq!(report.originals_deleted, 0);
        assert!(matches!(
            rx.try_recv().unwrap().payload,
            EventPayload::SweepCompleted { animes_removed: 1, .. }
        ));
    }
}
