//! Library ingestion.
//!
//! Discovers anime folders and episode files under the watch directories,
//! matches folders against the metadata provider, normalizes episodes that
//! browsers cannot play, and reconciles the catalog with the filesystem.
//!
//! Every creation is keyed on a filesystem path and preceded by a
//! [`PathCatalog`] check, so re-running a scan over an unchanged tree
//! creates nothing.

pub mod anime;
pub mod batch;
pub mod catalog;
pub mod decision;
pub mod episode;
pub mod locks;
pub mod sweep;
pub mod title;
pub mod walk;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anilib_av::{HardwareAccel, MediaToolkit, TranscodeRequest};
use anilib_common::{Error, Result};
use anilib_db::pool::DbPool;

use crate::config::Config;
use crate::metadata::MetadataProvider;
use crate::state::EventBus;

pub use anime::AnimeIngestor;
pub use batch::{ItemFailure, ScanReport, TaskBatch};
pub use catalog::PathCatalog;
pub use decision::{decide, TranscodeDecision};
pub use episode::EpisodeIngestor;
pub use locks::PathLocks;
pub use sweep::{ReconciliationSweeper, SweepReport};

/// Collaborators shared by every ingestion component.
#[derive(Clone)]
pub struct IngestContext {
    pub pool: DbPool,
    pub events: Arc<EventBus>,
    pub catalog: PathCatalog,
    pub locks: PathLocks,
}

impl IngestContext {
    pub fn new(pool: DbPool, events: Arc<EventBus>) -> Self {
        Self {
            catalog: PathCatalog::new(pool.clone()),
            pool,
            events,
            locks: PathLocks::new(),
        }
    }
}

/// Tunables of episode creation.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Transcode-capable creations allowed in flight at once.
    pub max_concurrent: usize,
    /// Root of the per-episode cover directories.
    pub covers_dir: PathBuf,
    pub cover_second: u32,
    pub cover_width: u32,
    /// Appended to the source stem to name transcoded files.
    pub output_suffix: String,
    pub hardware_accel: HardwareAccel,
    /// Used when no `use_hardware_acceleration` setting is stored.
    pub default_hardware_acceleration: bool,
    pub crf: u32,
    pub preset: String,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl IngestOptions {
    pub fn from_config(config: &Config) -> Self {
        let t = &config.transcode;
        Self {
            max_concurrent: t.max_concurrent.max(1),
            covers_dir: config.library.covers_dir.clone(),
            cover_second: t.cover_second,
            cover_width: t.cover_width,
            output_suffix: t.output_suffix.clone(),
            hardware_accel: t.hardware_encoder,
            default_hardware_acceleration: t.use_hardware_acceleration,
            crf: t.crf,
            preset: t.preset.clone(),
        }
    }

    /// Stem of the normalized file produced from `source_stem`.
    pub fn output_stem(&self, source_stem: &str) -> String {
        format!("{source_stem}{}", self.output_suffix)
    }

    /// Stem of the source a normalized file was produced from, if `stem`
    /// names one.
    pub fn source_stem<'a>(&self, stem: &'a str) -> Option<&'a str> {
        stem.strip_suffix(self.output_suffix.as_str())
            .filter(|source| !source.is_empty())
    }

    /// Transcode `source` into its own directory.
    pub fn transcode_request(&self, source: &Path, use_hardware_acceleration: bool) -> Result<TranscodeRequest> {
        let (Some(dir), Some(stem)) = (source.parent(), source.file_stem()) else {
            return Err(Error::invalid_input(format!(
                "cannot derive an output name from {}",
                source.display()
            )));
        };
        Ok(TranscodeRequest {
            input: source.to_path_buf(),
            output_dir: dir.to_path_buf(),
            output_name: self.output_stem(&stem.to_string_lossy()),
            use_hardware_acceleration,
            hardware_accel: self.hardware_accel,
            crf: self.crf,
            preset: self.preset.clone(),
        })
    }
}

/// The ingestion pipeline, built once with its collaborators.
#[derive(Clone)]
pub struct IngestService {
    pub animes: AnimeIngestor,
    pub episodes: EpisodeIngestor,
    pub sweeper: ReconciliationSweeper,
}

impl IngestService {
    pub fn new(
        pool: DbPool,
        events: Arc<EventBus>,
        provider: Arc<dyn MetadataProvider>,
        toolkit: Arc<dyn MediaToolkit>,
        options: IngestOptions,
    ) -> Self {
        let ctx = IngestContext::new(pool, events);
        Self {
            animes: AnimeIngestor::new(ctx.clone(), provider),
            episodes: EpisodeIngestor::new(ctx.clone(), toolkit, options),
            sweeper: ReconciliationSweeper::new(ctx),
        }
    }
}
