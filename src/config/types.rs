use anilib_av::{HardwareAccel, SupportMatrix};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    #[serde(default)]
    pub metadata: MetadataConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub static_dir: Option<PathBuf>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// SQLite catalog file.
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// Roots registered into the catalog at startup. Directories added
    /// through the API are kept in the catalog only.
    #[serde(default)]
    pub watch_directories: Vec<PathBuf>,

    /// Where extracted episode covers are written.
    #[serde(default = "default_covers_dir")]
    pub covers_dir: PathBuf,

    /// Delete transcoded sources at the end of every library update.
    #[serde(default)]
    pub delete_converted_originals: bool,
}

fn default_database() -> PathBuf {
    PathBuf::from("anilib.db")
}
fn default_covers_dir() -> PathBuf {
    PathBuf::from("covers")
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            watch_directories: Vec::new(),
            covers_dir: default_covers_dir(),
            delete_converted_originals: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataConfig {
    /// AniList GraphQL endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Candidates fetched per search before similarity ranking.
    #[serde(default = "default_candidates")]
    pub candidates: u32,

    /// AniList allows 90 requests per minute per client.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    "https://graphql.anilist.co".to_string()
}
fn default_candidates() -> u32 {
    5
}
fn default_requests_per_minute() -> u32 {
    60
}
fn default_timeout_secs() -> u64 {
    30
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            candidates: default_candidates(),
            requests_per_minute: default_requests_per_minute(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Episode creations allowed in flight at once, process-wide.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Timestamp of the cover frame, in seconds.
    #[serde(default = "default_cover_second")]
    pub cover_second: u32,

    #[serde(default = "default_cover_width")]
    pub cover_width: u32,

    /// Appended to the source stem to name the transcoded file.
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,

    /// Hardware encoder family used when acceleration is on.
    #[serde(default)]
    pub hardware_encoder: HardwareAccel,

    /// Used when the `use_hardware_acceleration` setting was never stored.
    #[serde(default)]
    pub use_hardware_acceleration: bool,

    #[serde(default = "default_crf")]
    pub crf: u32,

    #[serde(default = "default_preset")]
    pub preset: String,

    #[serde(default = "default_video_codecs")]
    pub video_codecs: Vec<String>,

    #[serde(default = "default_audio_codecs")]
    pub audio_codecs: Vec<String>,

    #[serde(default = "default_containers")]
    pub containers: Vec<String>,
}

fn default_max_concurrent() -> usize {
    2
}
fn default_cover_second() -> u32 {
    5
}
fn default_cover_width() -> u32 {
    1920
}
fn default_output_suffix() -> String {
    " [ANILIB COMPATIBLE]".to_string()
}
fn default_crf() -> u32 {
    20
}
fn default_preset() -> String {
    "veryfast".to_string()
}
fn default_video_codecs() -> Vec<String> {
    SupportMatrix::default().video_codecs
}
fn default_audio_codecs() -> Vec<String> {
    SupportMatrix::default().audio_codecs
}
fn default_containers() -> Vec<String> {
    SupportMatrix::default().containers
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            cover_second: default_cover_second(),
            cover_width: default_cover_width(),
            output_suffix: default_output_suffix(),
            hardware_encoder: HardwareAccel::default(),
            use_hardware_acceleration: false,
            crf: default_crf(),
            preset: default_preset(),
            video_codecs: default_video_codecs(),
            audio_codecs: default_audio_codecs(),
            containers: default_containers(),
        }
    }
}

impl TranscodeConfig {
    pub fn support_matrix(&self) -> SupportMatrix {
        SupportMatrix {
            video_codecs: self.video_codecs.clone(),
            audio_codecs: self.audio_codecs.clone(),
            containers: self.containers.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,
}
