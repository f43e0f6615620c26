//! Path utilities for detecting episode and subtitle files by extension.

use std::path::Path;

/// Extensions picked up as episode video files.
const EPISODE_EXTENSIONS: &[&str] = &["mp4", "mkv"];

/// Extensions accepted for subtitle tracks.
const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "vtt"];

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| allowed.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Check if a path looks like an episode video file.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use anilib_common::paths::is_episode_file;
///
/// assert!(is_episode_file(Path::new("Cowboy Bebop/01.mkv")));
/// assert!(is_episode_file(Path::new("02.MP4")));
/// assert!(!is_episode_file(Path::new("03.avi")));
/// ```
pub fn is_episode_file(path: &Path) -> bool {
    has_extension(path, EPISODE_EXTENSIONS)
}

/// Check if a path has a subtitle file extension.
pub fn is_subtitle_file(path: &Path) -> bool {
    has_extension(path, SUBTITLE_EXTENSIONS)
}

/// Get the list of episode file extensions.
#[must_use]
pub fn episode_extensions() -> &'static [&'static str] {
    EPISODE_EXTENSIONS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_episode_file() {
        assert!(is_episode_file(Path::new("01.mkv")));
        assert!(is_episode_file(Path::new("/media/anime/show/s1/01.mp4")));
        assert!(is_episode_file(Path::new("01.MKV")));
        assert!(is_episode_file(Path::new("show.1080p.mkv")));

        assert!(!is_episode_file(Path::new("01.avi")));
        assert!(!is_episode_file(Path::new("01.srt")));
        assert!(!is_episode_file(Path::new("mkv")));
        assert!(!is_episode_file(Path::new("")));
    }

    #[test]
    fn test_is_subtitle_file() {
        assert!(is_subtitle_file(Path::new("01.en.srt")));
        assert!(is_subtitle_file(Path::new("01.ASS")));
        assert!(!is_subtitle_file(Path::new("01.mkv")));
    }

    #[test]
    fn test_episode_extensions() {
        assert_eq!(episode_extensions(), &["mp4", "mkv"]);
    }
}
