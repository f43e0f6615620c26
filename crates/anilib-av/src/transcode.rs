//! MP4 (H.264/AAC) transcoding using ffmpeg.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::command::ToolCommand;
use crate::{Error, Result};

/// A full episode encode can take hours on a software encoder.
const TRANSCODE_TIMEOUT: Duration = Duration::from_secs(6 * 3600);

/// Hardware encoder family used when acceleration is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareAccel {
    /// NVIDIA NVENC.
    #[default]
    Nvenc,
    /// VA-API (Intel/AMD on Linux).
    Vaapi,
    /// Intel Quick Sync.
    Qsv,
    /// Apple VideoToolbox.
    Videotoolbox,
}

impl HardwareAccel {
    /// `(hwaccel_args, encoder)` for this family. The hwaccel flags go
    /// before `-i`.
    fn resolve(self) -> (&'static [&'static str], &'static str) {
        match self {
            HardwareAccel::Nvenc => (&["-hwaccel", "cuda"], "h264_nvenc"),
            HardwareAccel::Vaapi => (
                &["-hwaccel", "vaapi", "-hwaccel_output_format", "vaapi"],
                "h264_vaapi",
            ),
            HardwareAccel::Qsv => (&["-hwaccel", "qsv"], "h264_qsv"),
            HardwareAccel::Videotoolbox => (&["-hwaccel", "videotoolbox"], "h264_videotoolbox"),
        }
    }
}

/// Parameters for converting one file to a browser-playable MP4.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeRequest {
    /// Source video.
    pub input: PathBuf,
    /// Directory of the produced file.
    pub output_dir: PathBuf,
    /// File stem of the produced file; `.mp4` is appended.
    pub output_name: String,
    /// Use the hardware encoder instead of libx264.
    pub use_hardware_acceleration: bool,
    /// Hardware encoder family, consulted only when acceleration is on.
    pub hardware_accel: HardwareAccel,
    /// Constant rate factor for libx264.
    pub crf: u32,
    /// libx264 preset.
    pub preset: String,
}

impl TranscodeRequest {
    /// Full path of the file this request produces.
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", self.output_name))
    }
}

/// Build the ffmpeg arguments writing to `output`.
pub fn transcode_args(request: &TranscodeRequest, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".into(), "-v".into(), "error".into()];

    let encoder = if request.use_hardware_acceleration {
        let (hwaccel_args, encoder) = request.hardware_accel.resolve();
        args.extend(hwaccel_args.iter().map(|s| s.to_string()));
        encoder
    } else {
        "libx264"
    };

    args.extend(["-i".into(), request.input.to_string_lossy().into_owned()]);
    args.extend(["-map".into(), "0:v:0".into(), "-map".into(), "0:a:0?".into()]);
    args.extend(["-c:v".into(), encoder.into(), "-pix_fmt".into(), "yuv420p".into()]);

    if request.use_hardware_acceleration {
        // Hardware encoders don't support CRF; use bitrate targeting.
        args.extend(
            ["-b:v", "5M", "-maxrate", "8M", "-bufsize", "16M"].map(String::from),
        );
    } else {
        args.extend([
            "-crf".into(),
            request.crf.to_string(),
            "-preset".into(),
            request.preset.clone(),
        ]);
    }

    args.extend(["-c:a", "aac", "-b:a", "192k", "-ac", "2"].map(String::from));
    args.extend(["-movflags", "+faststart"].map(String::from));
    args.extend(["-f".into(), "mp4".into()]);
    args.push(output.to_string_lossy().into_owned());
    args
}

/// Transcode a file, returning the path of the produced MP4.
///
/// ffmpeg writes into a hidden temp file next to the destination which is
/// renamed into place on success. On failure or cancellation the temp file
/// is removed and the source is left untouched.
pub async fn transcode_to_mp4(
    ffmpeg: &Path,
    request: &TranscodeRequest,
    cancel: &CancellationToken,
) -> Result<PathBuf> {
    if !request.input.exists() {
        return Err(Error::file_not_found(&request.input));
    }
    let output = request.output_path();
    if output == request.input {
        return Err(Error::InvalidInput(format!(
            "transcode would overwrite its input: {}",
            output.display()
        )));
    }

    let partial = tempfile::Builder::new()
        .prefix(".anilib-")
        .suffix(".mp4.partial")
        .tempfile_in(&request.output_dir)?;

    tracing::info!(
        input = %request.input.display(),
        output = %output.display(),
        hardware = request.use_hardware_acceleration,
        "Transcoding to MP4"
    );

    ToolCommand::new(ffmpeg.to_path_buf())
        .args(transcode_args(request, partial.path()))
        .timeout(TRANSCODE_TIMEOUT)
        .execute(cancel)
        .await?;

    partial.persist(&output).map_err(|e| Error::Io(e.error))?;
    Ok(output)
}
