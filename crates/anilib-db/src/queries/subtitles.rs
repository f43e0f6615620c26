//! Subtitle CRUD operations.

use std::path::Path;

use anilib_common::{EpisodeId, Error, Result, SubtitleId};
use chrono::Utc;
use rusqlite::Connection;

use super::{collect_rows, insert_err, path_text};
use crate::models::Subtitle;

const COLS: &str = "id, episode_id, file_path, language, created_at";

/// Attach a subtitle file to an episode.
pub fn create_subtitle(
    conn: &Connection,
    episode_id: EpisodeId,
    file_path: &Path,
    language: Option<&str>,
) -> Result<Subtitle> {
    let subtitle = Subtitle {
        id: SubtitleId::new(),
        episode_id,
        file_path: file_path.to_path_buf(),
        language: language.map(String::from),
        created_at: Utc::now(),
    };
    insert_subtitle(conn, &subtitle)?;
    Ok(subtitle)
}

/// Insert a fully-formed subtitle record, keeping its identity.
pub fn insert_subtitle(conn: &Connection, subtitle: &Subtitle) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO subtitles ({COLS}) VALUES (?1,?2,?3,?4,?5)"),
        rusqlite::params![
            subtitle.id.to_string(),
            subtitle.episode_id.to_string(),
            path_text(&subtitle.file_path),
            subtitle.language,
            subtitle.created_at.to_rfc3339(),
        ],
    )
    .map_err(|e| insert_err("subtitle", &subtitle.file_path, e))?;
    Ok(())
}

/// List subtitles for an episode.
pub fn list_by_episode(conn: &Connection, episode_id: EpisodeId) -> Result<Vec<Subtitle>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {COLS} FROM subtitles WHERE episode_id = ?1 ORDER BY rowid ASC"
        ))
        .map_err(Error::store)?;
    let rows = stmt
        .query_map([episode_id.to_string()], Subtitle::from_row)
        .map_err(Error::store)?;
    collect_rows(rows)
}

/// List every subtitle.
pub fn list_subtitles(conn: &Connection) -> Result<Vec<Subtitle>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {COLS} FROM subtitles ORDER BY rowid ASC"))
        .map_err(Error::store)?;
    let rows = stmt.query_map([], Subtitle::from_row).map_err(Error::store)?;
    collect_rows(rows)
}
