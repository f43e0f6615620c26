//! Anilib-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across anilib:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for animes, episodes and subtitles
//! - **Core Types**: Enums for anime status, anime format and library status
//! - **Path Utilities**: Functions to detect episode and subtitle files by extension
//! - **Error Handling**: The shared error taxonomy and result alias
//!
//! # Examples
//!
//! ```
//! use anilib_common::{AnimeId, AnimeStatus, Error, Result};
//! use anilib_common::paths::is_episode_file;
//! use std::path::Path;
//!
//! let anime_id = AnimeId::new();
//! let status: AnimeStatus = "FINISHED".parse().unwrap();
//!
//! assert!(is_episode_file(Path::new("01.mkv")));
//!
//! fn example(id: AnimeId) -> Result<()> {
//!     Err(Error::not_found("anime", id))
//! }
//! # let _ = (example(anime_id), status);
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
