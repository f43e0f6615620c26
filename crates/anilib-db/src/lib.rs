//! Anilib-DB: catalog schema, migrations, and query operations
//!
//! This crate stores the anime catalog in SQLite using rusqlite and r2d2
//! connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Embedded schema migrations
//! - `pool` - Connection pool management
//! - `models` - Catalog entities (animes, episodes, subtitles, settings)
//! - `queries` - Query operations per table
//! - `snapshot` - Whole-catalog JSON export and import
//!
//! # Example
//!
//! ```
//! use anilib_db::pool::{get_conn, init_memory_pool};
//! use anilib_db::queries::watch_directories;
//! use std::path::Path;
//!
//! let pool = init_memory_pool().unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! watch_directories::add_watch_directory(&conn, Path::new("/media/anime")).unwrap();
//! assert_eq!(watch_directories::list_watch_directories(&conn).unwrap().len(), 1);
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod snapshot;
