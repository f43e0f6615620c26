//! Anime metadata lookup.
//!
//! # Module layout
//!
//! - [`provider`] -- Trait definition, candidate type and lookup errors.
//! - [`providers`] -- Concrete provider implementations (AniList).
//! - [`similarity`] -- Title similarity scoring used to pick the best candidate.

pub mod provider;
pub mod providers;
pub mod similarity;

pub use provider::{AnimeCandidate, FuzzyDate, LookupError, MetadataProvider};
pub use similarity::{most_similar, rank_by_similarity, title_similarity, Scored, Titled};
