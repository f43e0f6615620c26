//! Core type definitions for cataloged animes and the library lifecycle.
//!
//! Anime status and format use the upper snake case spelling of the AniList
//! API so provider responses deserialize directly. Values the provider adds
//! later land in the `Unknown` variant instead of failing the whole record.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Airing lifecycle of an anime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimeStatus {
    /// Finished airing.
    Finished,
    /// Currently airing.
    Releasing,
    /// Announced, not yet aired.
    NotYetReleased,
    /// Cancelled before completion.
    Cancelled,
    /// On hiatus.
    Hiatus,
    /// Status not reported or not recognized.
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for AnimeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => write!(f, "FINISHED"),
            Self::Releasing => write!(f, "RELEASING"),
            Self::NotYetReleased => write!(f, "NOT_YET_RELEASED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Hiatus => write!(f, "HIATUS"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for AnimeStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "FINISHED" => Self::Finished,
            "RELEASING" => Self::Releasing,
            "NOT_YET_RELEASED" => Self::NotYetReleased,
            "CANCELLED" => Self::Cancelled,
            "HIATUS" => Self::Hiatus,
            _ => Self::Unknown,
        })
    }
}

/// Release format of an anime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimeFormat {
    /// Regular TV series.
    Tv,
    /// TV series with short episodes.
    TvShort,
    /// Theatrical film.
    Movie,
    /// Special episode.
    Special,
    /// Original video animation.
    Ova,
    /// Original net animation.
    Ona,
    /// Music video.
    Music,
    /// Format not reported or not recognized.
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for AnimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tv => write!(f, "TV"),
            Self::TvShort => write!(f, "TV_SHORT"),
            Self::Movie => write!(f, "MOVIE"),
            Self::Special => write!(f, "SPECIAL"),
            Self::Ova => write!(f, "OVA"),
            Self::Ona => write!(f, "ONA"),
            Self::Music => write!(f, "MUSIC"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for AnimeFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "TV" => Self::Tv,
            "TV_SHORT" => Self::TvShort,
            "MOVIE" => Self::Movie,
            "SPECIAL" => Self::Special,
            "OVA" => Self::Ova,
            "ONA" => Self::Ona,
            "MUSIC" => Self::Music,
            _ => Self::Unknown,
        })
    }
}

/// Whether a library update is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryStatus {
    /// No update in progress.
    #[default]
    Idle,
    /// An update is sweeping or ingesting.
    Updating,
}

impl fmt::Display for LibraryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Updating => write!(f, "updating"),
        }
    }
}
