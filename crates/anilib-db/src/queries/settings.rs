//! Named boolean settings.

use anilib_common::{Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};

use super::collect_rows;
use crate::models::Setting;

/// Setting consulted when an episode has to be transcoded.
pub const USE_HARDWARE_ACCELERATION: &str = "use_hardware_acceleration";

/// Get a setting by name.
pub fn get_setting(conn: &Connection, name: &str) -> Result<Option<Setting>> {
    conn.query_row(
        "SELECT name, value, updated_at FROM settings WHERE name = ?1",
        [name],
        Setting::from_row,
    )
    .optional()
    .map_err(Error::store)
}

/// Create or overwrite a setting.
pub fn set_setting(conn: &Connection, name: &str, value: bool) -> Result<Setting> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO settings (name, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![name, value as i32, now.to_rfc3339()],
    )
    .map_err(Error::store)?;

    Ok(Setting {
        name: name.to_string(),
        value,
        updated_at: now,
    })
}

/// List all settings ordered by name.
pub fn list_settings(conn: &Connection) -> Result<Vec<Setting>> {
    let mut stmt = conn
        .prepare("SELECT name, value, updated_at FROM settings ORDER BY name ASC")
        .map_err(Error::store)?;
    let rows = stmt.query_map([], Setting::from_row).map_err(Error::store)?;
    collect_rows(rows)
}
