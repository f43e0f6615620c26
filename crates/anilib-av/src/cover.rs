//! Still-image cover extraction.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::command::ToolCommand;
use crate::{Error, Result};

const COVER_TIMEOUT: Duration = Duration::from_secs(120);

/// Parameters for grabbing one frame of a video as a JPEG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverRequest {
    /// Source video.
    pub input: PathBuf,
    /// Timestamp of the frame, in seconds.
    pub at_second: u32,
    /// Directory the image is written to; created if missing.
    pub output_dir: PathBuf,
    /// File stem of the image; `.jpg` is appended.
    pub output_name: String,
    /// Output width in pixels; height follows the aspect ratio.
    pub scale_width: u32,
}

impl CoverRequest {
    /// Full path of the image this request produces.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.jpg", self.output_name))
    }
}

/// Build the ffmpeg arguments for a cover request.
///
/// `-ss` before `-i` seeks on the input, which avoids decoding everything
/// up to the timestamp.
pub fn cover_args(request: &CoverRequest) -> Vec<String> {
    vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-ss".into(),
        request.at_second.to_string(),
        "-i".into(),
        request.input.to_string_lossy().into_owned(),
        "-frames:v".into(),
        "1".into(),
        "-vf".into(),
        format!("scale={}:-2", request.scale_width),
        "-q:v".into(),
        "2".into(),
        request.output_path().to_string_lossy().into_owned(),
    ]
}

/// Extract a cover image, returning the written path.
pub async fn extract_cover_image(
    ffmpeg: &Path,
    request: &CoverRequest,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    if !request.input.exists() {
        return Err(Error::file_not_found(&request.input));
    }
    tokio::fs::create_dir_all(&request.output_dir).await?;

    let output = request.output_path();
    ToolCommand::new(ffmpeg.to_path_buf())
        .args(cover_args(request))
        .timeout(COVER_TIMEOUT)
        .execute(cancel)
        .await?;

    // Seeking past the end of a short clip exits 0 without writing a frame.
    if !output.exists() {
        return Err(Error::tool_failed(
            "ffmpeg",
            format!("no frame at {}s in {}", request.at_second, request.input.display()),
        ));
    }

    tracing::debug!(input = %request.input.display(), output = %output.display(), "Extracted cover image");
    Ok(output)
}
