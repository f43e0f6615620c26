//! # anilib-av
//!
//! Media inspection and normalization for episode files.
//!
//! This crate provides:
//! - Codec and container inspection through `ffprobe`
//! - Still-image cover extraction through `ffmpeg`
//! - MP4 (H.264/AAC) transcoding with optional hardware encoders
//! - The [`MediaToolkit`] trait the ingest pipeline depends on, with the
//!   [`FfmpegToolkit`] implementation
//!
//! Every long-running operation accepts a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) and kills the
//! child process when the token fires.
//!
//! ## Example
//!
//! ```no_run
//! use anilib_av::{FfmpegToolkit, MediaToolkit, SupportMatrix, ToolPaths};
//! use tokio_util::sync::CancellationToken;
//! use std::path::Path;
//!
//! # async fn example() -> anilib_av::Result<()> {
//! let toolkit = FfmpegToolkit::new(ToolPaths::discover(None, None)?, SupportMatrix::default());
//! let cancel = CancellationToken::new();
//! let path = Path::new("/media/anime/Cowboy Bebop/01.mkv");
//! let playable = toolkit.is_container_supported(path)
//!     && toolkit.is_video_codec_supported(path, &cancel).await?
//!     && toolkit.is_audio_codec_supported(path, &cancel).await?;
//! println!("playable as-is: {playable}");
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod cover;
mod error;
pub mod probe;
pub mod toolkit;
pub mod tools;
pub mod transcode;

// Re-exports
pub use command::{ToolCommand, ToolOutput};
pub use cover::CoverRequest;
pub use error::{Error, Result};
pub use probe::{AudioTrack, MediaInfo, VideoTrack};
pub use toolkit::{FfmpegToolkit, MediaToolkit, SupportMatrix};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo, ToolPaths};
pub use transcode::{HardwareAccel, TranscodeRequest};
