//! Media information types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// File size in bytes.
    pub file_size: u64,
    /// Container format names as reported by ffprobe (e.g. "matroska,webm").
    pub container: String,
    /// Duration of the media.
    pub duration: Option<Duration>,
    /// Video tracks in the file.
    pub video_tracks: Vec<VideoTrack>,
    /// Audio tracks in the file.
    pub audio_tracks: Vec<AudioTrack>,
    /// Number of embedded subtitle streams.
    pub subtitle_streams: u32,
}

/// Information about a video track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTrack {
    /// Track index among video streams.
    pub index: u32,
    /// Video codec name (e.g. "h264", "hevc").
    pub codec: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Frame rate in FPS.
    pub frame_rate: Option<f64>,
}

/// Information about an audio track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioTrack {
    /// Track index among audio streams.
    pub index: u32,
    /// Audio codec name (e.g. "aac", "flac").
    pub codec: String,
    /// Number of channels.
    pub channels: u32,
    /// Language code (e.g. "jpn", "eng").
    pub language: Option<String>,
    /// Whether this is the default track.
    pub default: bool,
}

impl MediaInfo {
    /// Get the primary (first) video track.
    pub fn primary_video(&self) -> Option<&VideoTrack> {
        self.video_tracks.first()
    }

    /// Get the primary audio track: the default one, else the first.
    pub fn primary_audio(&self) -> Option<&AudioTrack> {
        self.audio_tracks
            .iter()
            .find(|a| a.default)
            .or_else(|| self.audio_tracks.first())
    }

    /// Get a human-readable resolution name.
    pub fn resolution_name(&self) -> Option<&'static str> {
        self.primary_video().map(|v| match (v.width, v.height) {
            (w, h) if w >= 3840 || h >= 2160 => "4K",
            (w, h) if w >= 1920 || h >= 1080 => "1080p",
            (w, h) if w >= 1280 || h >= 720 => "720p",
            (w, h) if w >= 720 || h >= 480 => "480p",
            _ => "SD",
        })
    }
}
