//! Path utilities for detecting video files by extension.

/// Extensions the scanner treats as video files.
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "wmv"];

/// Check if a file name (or path) has a video file extension.
///
/// The comparison is case-insensitive.
///
/// # Examples
///
/// ```
/// use cinedex_common::paths::is_video_file;
///
/// assert!(is_video_file("movie.mkv"));
/// assert!(is_video_file("/path/to/video.MP4"));
/// assert!(!is_video_file("subtitle.srt"));
/// ```
pub fn is_video_file(name: &str) -> bool {
    extension(name)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Get the list of video file extensions.
#[must_use]
pub fn video_extensions() -> &'static [&'static str] {
    VIDEO_EXTENSIONS
}

/// Last path segment of a `/`-separated path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Join a directory path and a child name with a single `/`.
pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

fn extension(name: &str) -> Option<&str> {
    file_name(name).rsplit_once('.').map(|(_, ext)| ext)
}
