//! Watch directory registration.
//!
//! Duplicate registrations are kept as-is; consumers deduplicate when they
//! build the scan list.

use std::path::{Path, PathBuf};

use anilib_common::{Error, Result};
use chrono::Utc;
use rusqlite::Connection;

use super::{collect_rows, path_text};

/// Register a directory to scan for anime folders.
pub fn add_watch_directory(conn: &Connection, path: &Path) -> Result<()> {
    conn.execute(
        "INSERT INTO watch_directories (path, created_at) VALUES (?1, ?2)",
        rusqlite::params![path_text(path), Utc::now().to_rfc3339()],
    )
    .map_err(Error::store)?;
    Ok(())
}

/// List registered watch directories in registration order.
pub fn list_watch_directories(conn: &Connection) -> Result<Vec<PathBuf>> {
    let mut stmt = conn
        .prepare("SELECT path FROM watch_directories ORDER BY id ASC")
        .map_err(Error::store)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0).map(PathBuf::from))
        .map_err(Error::store)?;
    collect_rows(rows)
}
