//! Whether an episode file has to be re-encoded before browsers can play it.

use std::path::Path;

use anilib_av::MediaToolkit;
use anilib_common::{Error, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// The three compatibility checks for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TranscodeDecision {
    pub video_supported: bool,
    pub audio_supported: bool,
    pub container_supported: bool,
}

impl TranscodeDecision {
    /// Any unsupported part forces a transcode.
    pub fn needs_transcode(&self) -> bool {
        !(self.video_supported && self.audio_supported && self.container_supported)
    }
}

/// Run every check against `path`.
///
/// A probe that fails counts as "unsupported", so the file is transcoded
/// rather than cataloged unplayable. Cancellation is returned as an error.
pub async fn decide(
    toolkit: &dyn MediaToolkit,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<TranscodeDecision> {
    let container_supported = toolkit.is_container_supported(path);
    let video_supported = probe_check(
        "video",
        path,
        toolkit.is_video_codec_supported(path, cancel).await,
    )?;
    let audio_supported = probe_check(
        "audio",
        path,
        toolkit.is_audio_codec_supported(path, cancel).await,
    )?;

    Ok(TranscodeDecision {
        video_supported,
        audio_supported,
        container_supported,
    })
}

fn probe_check(kind: &str, path: &Path, result: anilib_av::Result<bool>) -> Result<bool> {
    match result {
        Ok(supported) => Ok(supported),
        Err(e) => {
            let err = Error::from(e);
            if err.is_cancelled() {
                return Err(err);
            }
            warn!(path = %path.display(), check = kind, error = %err, "Codec probe failed, assuming transcode is needed");
            Ok(false)
        }
    }
}
