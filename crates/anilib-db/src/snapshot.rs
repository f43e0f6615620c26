//! Whole-catalog JSON snapshots.
//!
//! A snapshot is one JSON record holding the insertion-ordered collections
//! `animes`, `episodes`, `subtitles` and `watch_directories` (plus
//! `settings`, absent in older files). Writing replaces the target file
//! atomically through a sibling temp file, so readers never observe a
//! partial record.

use std::io::Write;
use std::path::{Path, PathBuf};

use anilib_common::{Error, Result};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::models::{Anime, Episode, Setting, Subtitle};
use crate::queries::{animes, episodes, settings, subtitles, watch_directories};

/// The full catalog as a single serializable record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub animes: Vec<Anime>,
    pub episodes: Vec<Episode>,
    pub subtitles: Vec<Subtitle>,
    pub watch_directories: Vec<PathBuf>,
    #[serde(default)]
    pub settings: Vec<Setting>,
}

/// Counts of rows written by [`import`], and of rows skipped because the
/// same unique key was already cataloged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub animes: usize,
    pub episodes: usize,
    pub subtitles: usize,
    pub watch_directories: usize,
    pub settings: usize,
    pub skipped: usize,
}

/// Read the current catalog into a snapshot.
pub fn export(conn: &Connection) -> Result<CatalogSnapshot> {
    Ok(CatalogSnapshot {
        animes: animes::list_animes(conn)?,
        episodes: episodes::list_episodes(conn)?,
        subtitles: subtitles::list_subtitles(conn)?,
        watch_directories: watch_directories::list_watch_directories(conn)?,
        settings: settings::list_settings(conn)?,
    })
}

/// Load a snapshot into the catalog inside one transaction.
///
/// Identities are preserved. Animes and episodes whose unique path is
/// already cataloged are skipped.
pub fn import(conn: &Connection, snapshot: &CatalogSnapshot) -> Result<ImportSummary> {
    let tx = conn.unchecked_transaction().map_err(Error::store)?;
    let mut summary = ImportSummary::default();

    for anime in &snapshot.animes {
        match animes::insert_anime(&tx, anime) {
            Ok(()) => summary.animes += 1,
            Err(e) if e.is_already_exists() => summary.skipped += 1,
            Err(e) => return Err(e),
        }
    }
    for episode in &snapshot.episodes {
        match episodes::insert_episode(&tx, episode) {
            Ok(()) => summary.episodes += 1,
            Err(e) if e.is_already_exists() => summary.skipped += 1,
            Err(e) => return Err(e),
        }
    }
    for subtitle in &snapshot.subtitles {
        match subtitles::insert_subtitle(&tx, subtitle) {
            Ok(()) => summary.subtitles += 1,
            Err(e) if e.is_already_exists() => summary.skipped += 1,
            Err(e) => return Err(e),
        }
    }
    for dir in &snapshot.watch_directories {
        watch_directories::add_watch_directory(&tx, dir)?;
        summary.watch_directories += 1;
    }
    for setting in &snapshot.settings {
        settings::set_setting(&tx, &setting.name, setting.value)?;
        summary.settings += 1;
    }

    tx.commit().map_err(Error::store)?;
    Ok(summary)
}

/// Atomically write a snapshot to `path`.
pub fn write_snapshot(path: &Path, snapshot: &CatalogSnapshot) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let json = serde_json::to_vec_pretty(snapshot).map_err(|e| Error::internal(e.to_string()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&json)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::from(e.error))?;

    tracing::info!(path = %path.display(), animes = snapshot.animes.len(), "Catalog snapshot written");
    Ok(())
}

/// Read a snapshot previously written by [`write_snapshot`].
pub fn read_snapshot(path: &Path) -> Result<CatalogSnapshot> {
    let data = std::fs::read(path)?;
    serde_json::from_slice(&data)
        .map_err(|e| Error::invalid_input(format!("{}: {e}", path.display())))
}
