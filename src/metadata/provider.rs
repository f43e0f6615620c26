//! Trait definition and types for anime metadata providers.

use std::path::PathBuf;

use anilib_common::{AnimeFormat, AnimeStatus};
use anilib_db::models::{AnimeTitle, NewAnime};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// A start date that may only be known to the year or month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl FuzzyDate {
    /// Assemble a calendar date; a missing month or day falls back to the
    /// first one. `None` without a year or for impossible dates.
    pub fn to_date(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year?, self.month.unwrap_or(1), self.day.unwrap_or(1))
    }
}

/// One anime returned by a provider search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeCandidate {
    /// Provider-specific identifier.
    pub external_id: i64,
    pub title: AnimeTitle,
    /// Largest cover image URL the provider offers.
    pub cover_url: Option<String>,
    pub description: Option<String>,
    /// Total episode count; unknown for airing shows.
    pub episodes: Option<u32>,
    pub start_date: FuzzyDate,
    pub status: AnimeStatus,
    pub genres: Vec<String>,
    pub format: AnimeFormat,
}

impl AnimeCandidate {
    /// Bind this match to the folder it was searched for.
    pub fn into_new_anime(self, folder_path: PathBuf) -> NewAnime {
        NewAnime {
            anilist_id: self.external_id,
            release_date: self.start_date.to_date(),
            title: self.title,
            cover_url: self.cover_url,
            description: self.description,
            episodes: self.episodes,
            status: self.status,
            genres: self.genres,
            format: self.format,
            folder_path,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a provider search did not produce a match.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    /// The search succeeded but nothing matched.
    #[error("no match for {query:?}")]
    NoMatch { query: String },

    /// This one request failed (bad status, malformed body, GraphQL error).
    #[error("request for {query:?} failed: {message}")]
    Request { query: String, message: String },

    /// The provider could not be reached at all.
    #[error("provider unreachable: {0}")]
    Unavailable(String),

    #[error("lookup cancelled")]
    Cancelled,
}

impl LookupError {
    pub fn request(query: impl Into<String>, message: impl ToString) -> Self {
        Self::Request {
            query: query.into(),
            message: message.to_string(),
        }
    }
}

impl From<LookupError> for anilib_common::Error {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NoMatch { query } => anilib_common::Error::lookup(query, "no match"),
            LookupError::Request { query, message } => anilib_common::Error::lookup(query, message),
            LookupError::Unavailable(msg) => anilib_common::Error::ProviderUnavailable(msg),
            LookupError::Cancelled => anilib_common::Error::Cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// A text-search anime metadata source.
///
/// Providers are shared across ingest tasks behind an `Arc`.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"anilist"`).
    fn name(&self) -> &'static str;

    /// Search anime by title. Results keep the provider's relevance order;
    /// an empty list is a valid answer.
    async fn search_anime(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<AnimeCandidate>, LookupError>;
}
