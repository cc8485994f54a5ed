//! Filename filters deciding what counts as convertible video.

/// Sidecar and junk suffixes that never enter the conversion queue.
static IGNORE_NAMES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    ".nfo",
    ".txt",
    ".jpg",
    ".jpeg",
    ".png",
    ".srt",
    ".sub",
    ".idx",
    ".ass",
    ".ssa",
    ".vtt",
];

static VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "mov", "wmv", "flv", "webm", "ts", "m2ts", "mts", "mpg", "mpeg",
    "3gp", "ogv", "vob",
];

/// Check if a filename should be ignored.
pub fn should_ignore(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IGNORE_NAMES
        .iter()
        .any(|pat| lower == pat.to_lowercase() || lower.ends_with(pat))
}

/// Check if a file has a video extension.
pub fn is_video_file(filename: &str) -> bool {
    if let Some(ext) = filename.rsplit('.').next() {
        VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    } else {
        false
    }
}
