//! Path-keyed dedup checks against the catalog.

use std::path::Path;

use anilib_common::Result;
use anilib_db::pool::{get_conn, DbPool};
use anilib_db::queries::{animes, episodes};

/// Read-only view of which paths the catalog already owns.
///
/// Consulted before every creation. The store's unique constraints remain
/// the final authority when two creations race.
#[derive(Clone)]
pub struct PathCatalog {
    pool: DbPool,
}

impl PathCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Whether an anime is bound to `folder`.
    pub fn exists_anime_at_path(&self, folder: &Path) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        Ok(animes::find_anime_by_path(&conn, folder)?.is_some())
    }

    /// Whether an episode plays `path` or was transcoded from it.
    pub fn exists_episode_at_path(&self, path: &Path) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        Ok(episodes::find_episode_by_path(&conn, path)?.is_some())
    }
}
