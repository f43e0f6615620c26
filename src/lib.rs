//! Anilib - anime library ingestion
//!
//! Discovers anime folders and episode files in watched directories, matches
//! folders against AniList, transcodes episodes browsers cannot play, and
//! serves the catalog over HTTP.
//!
//! This library crate exposes the core functionality for integration testing.

pub mod config;
pub mod library;
pub mod metadata;
pub mod scanner;
pub mod server;
pub mod state;
