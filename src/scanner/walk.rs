//! Filesystem discovery for anime folders, episode files and sidecar subtitles.
//!
//! Everything here is blocking `std::fs` / `walkdir` work; async callers run
//! it on the blocking pool.

use std::io;
use std::path::{Path, PathBuf};

use anilib_common::paths::{is_episode_file, is_subtitle_file};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Immediate child directories of `root`, sorted by path.
///
/// A missing `root` yields an empty list.
pub fn list_child_directories(root: &Path) -> io::Result<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %root.display(), "Watch directory does not exist, skipping");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() && !is_hidden(&path) {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Every episode video file below `root`, at any depth, sorted by path.
///
/// Unreadable entries are logged and skipped. Hidden files and directories
/// (including in-progress transcode outputs) are ignored.
pub fn find_episode_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_episode_file(e.path()))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// Subtitle files next to `video` that belong to it, with their language
/// label.
///
/// `01.srt` matches `01.mkv` without a label; `01.en.ass` matches with the
/// label `en`.
pub fn find_sidecar_subtitles(video: &Path) -> Vec<(PathBuf, Option<String>)> {
    let (Some(dir), Some(stem)) = (video.parent(), video.file_stem().and_then(|s| s.to_str()))
    else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut found: Vec<(PathBuf, Option<String>)> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && is_subtitle_file(p))
        .filter_map(|p| {
            let sub_stem = p.file_stem()?.to_str()?;
            let label = sidecar_label(stem, sub_stem)?;
            Some((p.clone(), label))
        })
        .collect();
    found.sort();
    found
}

/// `Some(None)` for an exact stem match, `Some(Some(label))` for
/// `<stem>.<label>`, `None` when the subtitle belongs to another file.
fn sidecar_label(video_stem: &str, subtitle_stem: &str) -> Option<Option<String>> {
    if subtitle_stem == video_stem {
        return Some(None);
    }
    let label = subtitle_stem.strip_prefix(video_stem)?.strip_prefix('.')?;
    if label.is_empty() || label.contains('.') {
        return None;
    }
    Some(Some(label.to_string()))
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}
