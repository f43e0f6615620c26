//! Catalog models.
//!
//! Each model implements `from_row` for constructing itself from a
//! `rusqlite::Row` selected with the column list of its query module.

use std::path::PathBuf;

use anilib_common::{AnimeFormat, AnimeId, AnimeStatus, EpisodeId, SubtitleId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

/// Parse a UUID-based ID from a text column.
fn parse_id<T: From<Uuid>>(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    let uuid = Uuid::parse_str(&s).map_err(|e| conversion_err(idx, e))?;
    Ok(T::from(uuid))
}

fn parse_timestamp(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, e))
}

fn parse_opt_date(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let s: Option<String> = row.get(idx)?;
    s.map(|v| NaiveDate::parse_from_str(&v, "%Y-%m-%d").map_err(|e| conversion_err(idx, e)))
        .transpose()
}

fn parse_opt_path(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<PathBuf>> {
    let s: Option<String> = row.get(idx)?;
    Ok(s.map(PathBuf::from))
}

fn parse_path(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<PathBuf> {
    let s: String = row.get(idx)?;
    Ok(PathBuf::from(s))
}

// ---------------------------------------------------------------------------
// Anime
// ---------------------------------------------------------------------------

/// Title variants reported by the metadata provider. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimeTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

impl AnimeTitle {
    /// Present, non-empty variants in romaji, english, native order.
    pub fn variants(&self) -> impl Iterator<Item = &str> {
        [&self.romaji, &self.english, &self.native]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .filter(|v| !v.is_empty())
    }

    /// Display title: the first present variant.
    pub fn preferred(&self) -> &str {
        self.variants().next().unwrap_or("Unknown Title")
    }
}

/// A cataloged series, bound to exactly one folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    pub id: AnimeId,
    pub anilist_id: i64,
    pub title: AnimeTitle,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    /// Total episode count; `None` while unknown (e.g. still airing).
    pub episodes: Option<u32>,
    pub release_date: Option<NaiveDate>,
    pub status: AnimeStatus,
    pub genres: Vec<String>,
    pub format: AnimeFormat,
    pub folder_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

impl Anime {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let genres: String = row.get(10)?;
        let status: String = row.get(9)?;
        let format: String = row.get(11)?;
        Ok(Self {
            id: parse_id(row, 0)?,
            anilist_id: row.get(1)?,
            title: AnimeTitle {
                romaji: row.get(2)?,
                english: row.get(3)?,
                native: row.get(4)?,
            },
            cover_url: row.get(5)?,
            description: row.get(6)?,
            episodes: row.get(7)?,
            release_date: parse_opt_date(row, 8)?,
            status: status.parse().unwrap_or_default(),
            genres: serde_json::from_str(&genres).map_err(|e| conversion_err(10, e))?,
            format: format.parse().unwrap_or_default(),
            folder_path: parse_path(row, 12)?,
            created_at: parse_timestamp(row, 13)?,
        })
    }
}

/// Fields needed to create an anime; identity and timestamp are assigned on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAnime {
    pub anilist_id: i64,
    pub title: AnimeTitle,
    pub cover_url: Option<String>,
    pub description: Option<String>,
    pub episodes: Option<u32>,
    pub release_date: Option<NaiveDate>,
    pub status: AnimeStatus,
    pub genres: Vec<String>,
    pub format: AnimeFormat,
    pub folder_path: PathBuf,
}

// ---------------------------------------------------------------------------
// Episode
// ---------------------------------------------------------------------------

/// A cataloged playable video file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub anime_id: AnimeId,
    pub title: String,
    /// The file actually played.
    pub file_path: PathBuf,
    /// The pre-transcode source, set only when `file_path` is a transcode.
    pub original_file_path: Option<PathBuf>,
    pub cover_image_path: Option<PathBuf>,
    pub created_at: DateTime<Utc>,
}

impl Episode {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            anime_id: parse_id(row, 1)?,
            title: row.get(2)?,
            file_path: parse_path(row, 3)?,
            original_file_path: parse_opt_path(row, 4)?,
            cover_image_path: parse_opt_path(row, 5)?,
            created_at: parse_timestamp(row, 6)?,
        })
    }

    /// Whether the playable file was produced by a transcode.
    pub fn is_converted(&self) -> bool {
        self.original_file_path.is_some()
    }
}

/// Fields needed to create an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEpisode {
    pub anime_id: AnimeId,
    pub title: String,
    pub file_path: PathBuf,
    pub original_file_path: Option<PathBuf>,
    pub cover_image_path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Subtitle
// ---------------------------------------------------------------------------

/// An external subtitle file attached to an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    pub id: SubtitleId,
    pub episode_id: EpisodeId,
    pub file_path: PathBuf,
    pub language: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Subtitle {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: parse_id(row, 0)?,
            episode_id: parse_id(row, 1)?,
            file_path: parse_path(row, 2)?,
            language: row.get(3)?,
            created_at: parse_timestamp(row, 4)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Setting
// ---------------------------------------------------------------------------

/// A named boolean preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub name: String,
    pub value: bool,
    pub updated_at: DateTime<Utc>,
}

impl Setting {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let value: i64 = row.get(1)?;
        Ok(Self {
            name: row.get(0)?,
            value: value != 0,
            updated_at: parse_timestamp(row, 2)?,
        })
    }
}
