//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order. A
//! `schema_migrations` table tracks which versions have been applied.
//!
//! Episodes reference their anime and subtitles reference their episode
//! without foreign keys: ownership is not cascading and orphans are removed
//! by the reconciliation sweep.

use anilib_common::{Error, Result};
use rusqlite::Connection;

/// V1: initial catalog schema.
const V1_INITIAL: &str = r#"
CREATE TABLE animes (
    id             TEXT PRIMARY KEY,
    anilist_id     INTEGER NOT NULL,
    title_romaji   TEXT,
    title_english  TEXT,
    title_native   TEXT,
    cover_url      TEXT,
    description    TEXT,
    episodes       INTEGER,
    release_date   TEXT,
    status         TEXT NOT NULL,
    genres         TEXT NOT NULL DEFAULT '[]',
    format         TEXT NOT NULL,
    folder_path    TEXT NOT NULL UNIQUE,
    created_at     TEXT NOT NULL
);

CREATE TABLE episodes (
    id                 TEXT PRIMARY KEY,
    anime_id           TEXT NOT NULL,
    title              TEXT NOT NULL,
    file_path          TEXT NOT NULL UNIQUE,
    original_file_path TEXT,
    cover_image_path   TEXT,
    created_at         TEXT NOT NULL
);
CREATE INDEX idx_episodes_anime ON episodes(anime_id);
CREATE INDEX idx_episodes_original ON episodes(original_file_path);

CREATE TABLE subtitles (
    id         TEXT PRIMARY KEY,
    episode_id TEXT NOT NULL,
    file_path  TEXT NOT NULL,
    language   TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX idx_subtitles_episode ON subtitles(episode_id);

CREATE TABLE watch_directories (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    path       TEXT NOT NULL,
    created_at TEXT NOT NULL
);
"#;

/// V2: named boolean settings.
const V2_SETTINGS: &str = r#"
CREATE TABLE settings (
    name       TEXT PRIMARY KEY,
    value      INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL), (2, V2_SETTINGS)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::store(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(Error::store)?;

        if already {
            continue;
        }

        let tx = conn.unchecked_transaction().map_err(Error::store)?;

        tx.execute_batch(sql)
            .map_err(|e| Error::store(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(Error::store)?;

        tx.commit().map_err(Error::store)?;
        tracing::debug!(version, "Applied catalog migration");
    }

    Ok(())
}

/// Latest schema version known to this build.
pub fn latest_version() -> i64 {
    MIGRATIONS.last().map(|(v, _)| *v).unwrap_or(0)
}
