//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which wires an in-memory catalog, an
//! [`EventBus`], a scripted [`FakeProvider`] and a [`FakeToolkit`] into a
//! full [`IngestService`] / [`LibraryService`] / [`AppContext`], plus a
//! temporary media tree to scan.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anilib::config::Config;
use anilib::library::LibraryService;
use anilib::metadata::{AnimeCandidate, FuzzyDate, LookupError, MetadataProvider};
use anilib::scanner::{IngestOptions, IngestService};
use anilib::server::AppContext;
use anilib::state::{EventBus, EventPayload};
use anilib_av::{CoverRequest, MediaInfo, MediaToolkit, TranscodeRequest};
use anilib_common::{AnimeFormat, AnimeStatus};
use anilib_db::models::{Anime, AnimeTitle, Episode};
use anilib_db::pool::{get_conn, init_memory_pool, DbPool};
use anilib_db::queries::{animes, episodes, watch_directories};
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Metadata provider
// ---------------------------------------------------------------------------

/// Answers every query with one candidate titled after the query, unless a
/// scripted response is registered for it.
#[derive(Default)]
pub struct FakeProvider {
    scripted: Mutex<HashMap<String, ScriptedLookup>>,
    pub queries: Mutex<Vec<String>>,
}

#[derive(Clone)]
pub enum ScriptedLookup {
    Candidates(Vec<AnimeCandidate>),
    Fail(String),
    Unavailable,
}

impl FakeProvider {
    pub fn script(&self, query: &str, response: ScriptedLookup) {
        self.scripted.lock().insert(query.to_string(), response);
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }
}

pub fn candidate(id: i64, romaji: &str) -> AnimeCandidate {
    AnimeCandidate {
        external_id: id,
        title: AnimeTitle {
            romaji: Some(romaji.to_string()),
            english: None,
            native: None,
        },
        cover_url: Some(format!("https://img.example/{id}.jpg")),
        description: Some(format!("{romaji} description")),
        episodes: Some(26),
        start_date: FuzzyDate {
            year: Some(1998),
            month: Some(4),
            day: Some(3),
        },
        status: AnimeStatus::Finished,
        genres: vec!["Action".into(), "Sci-Fi".into()],
        format: AnimeFormat::Tv,
    }
}

#[async_trait]
impl MetadataProvider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn search_anime(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<AnimeCandidate>, LookupError> {
        if cancel.is_cancelled() {
            return Err(LookupError::Cancelled);
        }
        self.queries.lock().push(query.to_string());
        let scripted = self.scripted.lock().get(query).cloned();
        match scripted {
            Some(ScriptedLookup::Candidates(c)) => Ok(c),
            Some(ScriptedLookup::Fail(msg)) => Err(LookupError::request(query, msg)),
            Some(ScriptedLookup::Unavailable) => {
                Err(LookupError::Unavailable("connection refused".into()))
            }
            None => Ok(vec![candidate(query.len() as i64, query)]),
        }
    }
}

// ---------------------------------------------------------------------------
// Media toolkit
// ---------------------------------------------------------------------------

/// Media backend driven by file names.
///
/// Every file is playable unless its name is listed as having an
/// unsupported video codec, or its extension as an unsupported container.
/// Cover extraction is where creations are counted as in flight.
#[derive(Default)]
pub struct FakeToolkit {
    pub unsupported_video: Mutex<HashSet<String>>,
    pub unsupported_containers: Mutex<HashSet<String>>,
    pub failing_transcodes: Mutex<HashSet<String>>,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub transcodes: AtomicUsize,
    pub hardware_transcodes: AtomicUsize,
    pub work_delay: Mutex<Duration>,
}

impl FakeToolkit {
    pub fn unsupported_video(&self, file_name: &str) {
        self.unsupported_video.lock().insert(file_name.to_string());
    }

    pub fn unsupported_container(&self, ext: &str) {
        self.unsupported_containers.lock().insert(ext.to_string());
    }

    pub fn failing_transcode(&self, file_name: &str) {
        self.failing_transcodes.lock().insert(file_name.to_string());
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.work_delay.lock() = delay;
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn transcode_count(&self) -> usize {
        self.transcodes.load(Ordering::SeqCst)
    }

    pub fn hardware_transcode_count(&self) -> usize {
        self.hardware_transcodes.load(Ordering::SeqCst)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl MediaToolkit for FakeToolkit {
    async fn probe(&self, path: &Path, _cancel: &CancellationToken) -> anilib_av::Result<MediaInfo> {
        Err(anilib_av::Error::file_not_found(path))
    }

    async fn is_video_codec_supported(
        &self,
        path: &Path,
        _cancel: &CancellationToken,
    ) -> anilib_av::Result<bool> {
        Ok(!self.unsupported_video.lock().contains(&file_name(path)))
    }

    async fn is_audio_codec_supported(
        &self,
        _path: &Path,
        _cancel: &CancellationToken,
    ) -> anilib_av::Result<bool> {
        Ok(true)
    }

    fn is_container_supported(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        !self.unsupported_containers.lock().contains(&ext)
    }

    async fn extract_cover_image(
        &self,
        request: &CoverRequest,
        cancel: &CancellationToken,
    ) -> anilib_av::Result<PathBuf> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = *self.work_delay.lock();
        let cancelled = tokio::select! {
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(delay) => false,
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if cancelled {
            return Err(anilib_av::Error::Cancelled {
                tool: "ffmpeg".into(),
            });
        }

        std::fs::create_dir_all(&request.output_dir)?;
        let output = request.output_path();
        std::fs::write(&output, b"jpeg")?;
        Ok(output)
    }

    async fn transcode_to_mp4(
        &self,
        request: &TranscodeRequest,
        _cancel: &CancellationToken,
    ) -> anilib_av::Result<PathBuf> {
        if self.failing_transcodes.lock().contains(&file_name(&request.input)) {
            return Err(anilib_av::Error::tool_failed("ffmpeg", "encoder exploded"));
        }
        self.transcodes.fetch_add(1, Ordering::SeqCst);
        if request.use_hardware_acceleration {
            self.hardware_transcodes.fetch_add(1, Ordering::SeqCst);
        }
        let output = request.output_path();
        std::fs::write(&output, b"mp4")?;
        Ok(output)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct TestHarness {
    pub pool: DbPool,
    pub events: Arc<EventBus>,
    pub provider: Arc<FakeProvider>,
    pub toolkit: Arc<FakeToolkit>,
    pub ingest: IngestService,
    pub library: Arc<LibraryService>,
    pub config: Arc<Config>,
    /// Watch directory root; registered in the catalog.
    pub media: TempDir,
    pub covers: TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_options(|_| {})
    }

    /// Build a harness after letting the caller adjust the config.
    pub fn with_options(adjust: impl FnOnce(&mut Config)) -> Self {
        let media = TempDir::new().unwrap();
        let covers = TempDir::new().unwrap();

        let mut config = Config::default();
        config.library.covers_dir = covers.path().to_path_buf();
        adjust(&mut config);

        let pool = init_memory_pool().unwrap();
        {
            let conn = get_conn(&pool).unwrap();
            watch_directories::add_watch_directory(&conn, media.path()).unwrap();
        }

        let events = Arc::new(EventBus::default());
        let provider = Arc::new(FakeProvider::default());
        let toolkit = Arc::new(FakeToolkit::default());
        let ingest = IngestService::new(
            pool.clone(),
            events.clone(),
            provider.clone(),
            toolkit.clone(),
            IngestOptions::from_config(&config),
        );
        let library = Arc::new(LibraryService::new(
            pool.clone(),
            events.clone(),
            ingest.clone(),
            config.library.delete_converted_originals,
        ));

        Self {
            pool,
            events,
            provider,
            toolkit,
            ingest,
            library,
            config: Arc::new(config),
            media,
            covers,
        }
    }

    pub fn app_context(&self) -> AppContext {
        AppContext {
            pool: self.pool.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            library: self.library.clone(),
        }
    }

    pub fn media_root(&self) -> PathBuf {
        self.media.path().to_path_buf()
    }

    /// Create an empty file (and its parents) below the media root.
    pub fn touch(&self, relative: &str) -> PathBuf {
        let path = self.media.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, b"").unwrap();
        path
    }

    pub fn animes(&self) -> Vec<Anime> {
        let conn = get_conn(&self.pool).unwrap();
        animes::list_animes(&conn).unwrap()
    }

    pub fn episodes(&self) -> Vec<Episode> {
        let conn = get_conn(&self.pool).unwrap();
        episodes::list_episodes(&conn).unwrap()
    }

    /// Ingest anime from the media root, then episodes for all anime.
    pub async fn scan(&self) -> (usize, usize) {
        let cancel = CancellationToken::new();
        let animes = self
            .ingest
            .animes
            .ingest(&[self.media_root()], &cancel)
            .await
            .unwrap();
        let all = self.animes();
        let episodes = self
            .ingest
            .episodes
            .ingest_for_animes(&all, &cancel)
            .await
            .unwrap();
        (animes.created.len(), episodes.created.len())
    }

    /// Wait for the next `ScanCompleted` or `ScanFailed` event.
    pub async fn wait_for_scan_end(
        rx: &mut tokio::sync::broadcast::Receiver<anilib::state::Event>,
    ) -> EventPayload {
        tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let event = rx.recv().await.unwrap();
                if matches!(
                    event.payload,
                    EventPayload::ScanCompleted { .. } | EventPayload::ScanFailed { .. }
                ) {
                    return event.payload;
                }
            }
        })
        .await
        .expect("library update did not finish")
    }
}
