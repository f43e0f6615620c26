//! Anime CRUD operations.

use std::path::Path;

use anilib_common::{AnimeId, Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use super::{collect_rows, insert_err, path_text};
use crate::models::{Anime, NewAnime};

const COLS: &str = "id, anilist_id, title_romaji, title_english, title_native, cover_url, \
    description, episodes, release_date, status, genres, format, folder_path, created_at";

/// Create a new anime.
///
/// Fails with `AlreadyExists` if another anime owns the same folder path.
pub fn create_anime(conn: &Connection, new: &NewAnime) -> Result<Anime> {
    let anime = Anime {
        id: AnimeId::new(),
        anilist_id: new.anilist_id,
        title: new.title.clone(),
        cover_url: new.cover_url.clone(),
        description: new.description.clone(),
        episodes: new.episodes,
        release_date: new.release_date,
        status: new.status,
        genres: new.genres.clone(),
        format: new.format,
        folder_path: new.folder_path.clone(),
        created_at: Utc::now(),
    };
    insert_anime(conn, &anime)?;
    Ok(anime)
}

/// Insert a fully-formed anime record, keeping its identity.
pub fn insert_anime(conn: &Connection, anime: &Anime) -> Result<()> {
    let genres = serde_json::to_string(&anime.genres).map_err(|e| Error::internal(e.to_string()))?;

    conn.execute(
        &format!("INSERT INTO animes ({COLS}) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)"),
        rusqlite::params![
            anime.id.to_string(),
            anime.anilist_id,
            anime.title.romaji,
            anime.title.english,
            anime.title.native,
            anime.cover_url,
            anime.description,
            anime.episodes,
            anime.release_date.map(|d| d.format("%Y-%m-%d").to_string()),
            anime.status.to_string(),
            genres,
            anime.format.to_string(),
            path_text(&anime.folder_path),
            anime.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| insert_err("anime", &anime.folder_path, e))?;

    Ok(())
}

/// Get an anime by ID.
pub fn get_anime(conn: &Connection, id: AnimeId) -> Result<Option<Anime>> {
    conn.query_row(
        &format!("SELECT {COLS} FROM animes WHERE id = ?1"),
        [id.to_string()],
        Anime::from_row,
    )
    .optional()
    .map_err(Error::store)
}

/// Find the anime that owns `folder_path`.
pub fn find_anime_by_path(conn: &Connection, folder_path: &Path) -> Result<Option<Anime>> {
    conn.query_row(
        &format!("SELECT {COLS} FROM animes WHERE folder_path = ?1"),
        [path_text(folder_path)],
        Anime::from_row,
    )
    .optional()
    .map_err(Error::store)
}

/// List all animes in insertion order.
pub fn list_animes(conn: &Connection) -> Result<Vec<Anime>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {COLS} FROM animes ORDER BY rowid ASC"))
        .map_err(Error::store)?;
    let rows = stmt.query_map([], Anime::from_row).map_err(Error::store)?;
    collect_rows(rows)
}

/// Delete an anime. Owned episodes are left in place.
///
/// Returns `true` if a row was removed.
pub fn delete_anime(conn: &Connection, id: AnimeId) -> Result<bool> {
    let n = conn
        .execute("DELETE FROM animes WHERE id = ?1", [id.to_string()])
        .map_err(Error::store)?;
    Ok(n > 0)
}
