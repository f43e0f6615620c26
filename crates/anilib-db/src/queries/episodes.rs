//! Episode CRUD operations.

use std::path::Path;

use anilib_common::{AnimeId, EpisodeId, Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use super::{collect_rows, insert_err, path_text};
use crate::models::{Episode, NewEpisode};

const COLS: &str =
    "id, anime_id, title, file_path, original_file_path, cover_image_path, created_at";

/// Create a new episode.
///
/// Fails with `AlreadyExists` if another episode already plays `file_path`.
pub fn create_episode(conn: &Connection, new: &NewEpisode) -> Result<Episode> {
    let episode = Episode {
        id: EpisodeId::new(),
        anime_id: new.anime_id,
        title: new.title.clone(),
        file_path: new.file_path.clone(),
        original_file_path: new.original_file_path.clone(),
        cover_image_path: new.cover_image_path.clone(),
        created_at: Utc::now(),
    };
    insert_episode(conn, &episode)?;
    Ok(episode)
}

/// Insert a fully-formed episode record, keeping its identity.
pub fn insert_episode(conn: &Connection, episode: &Episode) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO episodes ({COLS}) VALUES (?1,?2,?3,?4,?5,?6,?7)"),
        rusqlite::params![
            episode.id.to_string(),
            episode.anime_id.to_string(),
            episode.title,
            path_text(&episode.file_path),
            episode.original_file_path.as_deref().map(path_text),
            episode.cover_image_path.as_deref().map(path_text),
            episode.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| insert_err("episode", &episode.file_path, e))?;

    Ok(())
}

/// Get an episode by ID.
pub fn get_episode(conn: &Connection, id: EpisodeId) -> Result<Option<Episode>> {
    conn.query_row(
        &format!("SELECT {COLS} FROM episodes WHERE id = ?1"),
        [id.to_string()],
        Episode::from_row,
    )
    .optional()
    .map_err(Error::store)
}

/// Find the episode known under `path`, either as its playable file or as
/// the source it was transcoded from.
pub fn find_episode_by_path(conn: &Connection, path: &Path) -> Result<Option<Episode>> {
    conn.query_row(
        &format!(
            "SELECT {COLS} FROM episodes WHERE file_path = ?1 OR original_file_path = ?1 LIMIT 1"
        ),
        [path_text(path)],
        Episode::from_row,
    )
    .optional()
    .map_err(Error::store)
}

/// List all episodes in insertion order.
pub fn list_episodes(conn: &Connection) -> Result<Vec<Episode>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {COLS} FROM episodes ORDER BY rowid ASC"))
        .map_err(Error::store)?;
    let rows = stmt.query_map([], Episode::from_row).map_err(Error::store)?;
    collect_rows(rows)
}

/// List the episodes owned by an anime in insertion order.
///
/// Insertion order is not display order; callers sort before presenting.
pub fn list_episodes_by_anime(conn: &Connection, anime_id: AnimeId) -> Result<Vec<Episode>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS} FROM episodes WHERE anime_id = ?1 ORDER BY rowid ASC"
        ))
        .map_err(Error::store)?;
    let rows = stmt
        .query_map([anime_id.to_string()], Episode::from_row)
        .map_err(Error::store)?;
    collect_rows(rows)
}

/// List episodes whose playable file is a transcode.
pub fn list_converted_episodes(conn: &Connection) -> Result<Vec<Episode>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS} FROM episodes WHERE original_file_path IS NOT NULL ORDER BY rowid ASC"
        ))
        .map_err(Error::store)?;
    let rows = stmt.query_map([], Episode::from_row).map_err(Error::store)?;
    collect_rows(rows)
}

/// Delete an episode. Subtitles are left in place.
pub fn delete_episode(conn: &Connection, id: EpisodeId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM episodes WHERE id = ?1", [id.to_string()])
        .map_err(Error::store)?;
    Ok(n > 0)
}
