//! Catalog query modules.

use std::path::Path;

use anilib_common::Error;

pub mod animes;
pub mod episodes;
pub mod settings;
pub mod subtitles;
pub mod watch_directories;

/// Text form of a path as stored in the catalog.
pub(crate) fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Map an insert failure, turning a UNIQUE violation into `AlreadyExists`.
pub(crate) fn insert_err(entity: &str, key: &Path, e: rusqlite::Error) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
        {
            Error::already_exists(entity, key)
        }
        _ => Error::store(e),
    }
}

/// Collect mapped rows, folding any row error into a store error.
pub(crate) fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
) -> anilib_common::Result<Vec<T>> {
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Error::store)
}
