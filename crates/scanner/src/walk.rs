use std::path::{Path, PathBuf};
use tracing::debug;

use crate::filter;

/// Video file discovered during a library walk.
#[derive(Debug, Clone)]
pub struct MediaEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Walk a library directory recursively and collect video files, skipping
/// ignored patterns. Entries come back sorted by path so batch order is
/// stable across runs.
pub fn walk_media_dir(root: &Path) -> Vec<MediaEntry> {
    let mut entries = Vec::new();
    walk_recursive(root, &mut entries);
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries
}

fn walk_recursive(dir: &Path, entries: &mut Vec<MediaEntry>) {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "cannot read directory");
            return;
        }
    };

    for entry in read_dir.flatten() {
        let path = entry.path();
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        // Skip hidden files/dirs and ignored patterns
        if name.starts_with('.') || filter::should_ignore(&name) {
            debug!(path = %path.display(), "skipping ignored entry");
            continue;
        }

        if path.is_dir() {
            // Skip known junk directories
            if name == "@eaDir" || name == "#recycle" || name == ".Trash" {
                continue;
            }
            walk_recursive(&path, entries);
        } else if filter::is_video_file(&name) {
            let size_bytes = match std::fs::metadata(&path) {
                Ok(m) => m.len(),
                Err(_) => continue,
            };

            entries.push(MediaEntry { path, size_bytes });
        }
    }
}
