//! The media capability seam used by the ingest pipeline.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::cover::{self, CoverRequest};
use crate::probe::{self, MediaInfo};
use crate::tools::ToolPaths;
use crate::transcode::{self, TranscodeRequest};
use crate::Result;

/// Operations the pipeline needs from a media backend.
///
/// Probe-based checks take the cancellation token of the surrounding
/// library update; container support is decided from the file name alone.
#[async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Inspect a file's streams.
    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<MediaInfo>;

    /// Whether the primary video stream can be played without conversion.
    async fn is_video_codec_supported(&self, path: &Path, cancel: &CancellationToken)
        -> Result<bool>;

    /// Whether the primary audio stream can be played without conversion.
    /// A file without audio counts as supported.
    async fn is_audio_codec_supported(&self, path: &Path, cancel: &CancellationToken)
        -> Result<bool>;

    /// Whether the container (by extension) can be played without remuxing.
    fn is_container_supported(&self, path: &Path) -> bool;

    /// Write a still frame and return its path.
    async fn extract_cover_image(
        &self,
        request: &CoverRequest,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;

    /// Convert to MP4 and return the produced path.
    async fn transcode_to_mp4(
        &self,
        request: &TranscodeRequest,
        cancel: &CancellationToken,
    ) -> Result<PathBuf>;
}

/// Codecs and containers a browser plays natively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportMatrix {
    pub video_codecs: Vec<String>,
    pub audio_codecs: Vec<String>,
    /// Lowercase file extensions without the dot.
    pub containers: Vec<String>,
}

impl Default for SupportMatrix {
    fn default() -> Self {
        Self {
            video_codecs: vec!["h264".into()],
            audio_codecs: vec!["aac".into(), "mp3".into()],
            containers: vec!["mp4".into()],
        }
    }
}

impl SupportMatrix {
    pub fn video_supported(&self, info: &MediaInfo) -> bool {
        info.primary_video()
            .is_some_and(|v| contains_ignore_case(&self.video_codecs, &v.codec))
    }

    pub fn audio_supported(&self, info: &MediaInfo) -> bool {
        info.primary_audio()
            .map_or(true, |a| contains_ignore_case(&self.audio_codecs, &a.codec))
    }

    pub fn container_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| contains_ignore_case(&self.containers, ext))
    }
}

fn contains_ignore_case(list: &[String], value: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(value))
}

/// [`MediaToolkit`] backed by the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    paths: ToolPaths,
    support: SupportMatrix,
}

impl FfmpegToolkit {
    pub fn new(paths: ToolPaths, support: SupportMatrix) -> Self {
        Self { paths, support }
    }

    pub fn paths(&self) -> &ToolPaths {
        &self.paths
    }

    pub fn support(&self) -> &SupportMatrix {
        &self.support
    }
}

#[async_trait]
impl MediaToolkit for FfmpegToolkit {
    async fn probe(&self, path: &Path, cancel: &CancellationToken) -> Result<MediaInfo> {
        probe::probe_with_ffprobe(&self.paths.ffprobe, path, cancel).await
    }

    async fn is_video_codec_supported(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let info = self.probe(path, cancel).await?;
        Ok(self.support.video_supported(&info))
    }

    async fn is_audio_codec_supported(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let info = self.probe(path, cancel).await?;
        Ok(self.support.audio_supported(&info))
    }

    fn is_container_supported(&self, path: &Path) -> bool {
        self.support.container_supported(path)
    }

    async fn extract_cover_image(
        &self,
        request: &CoverRequest,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        cover::extract_cover_image(&self.paths.ffmpeg, request, cancel).await
    }

    async fn transcode_to_mp4(
        &self,
        request: &TranscodeRequest,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        transcode::transcode_to_mp4(&self.paths.ffmpeg, request, cancel).await
    }
}
