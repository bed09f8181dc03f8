//! Directory walking for the library scan.

use crate::error::{Result, VidscribeError};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Size and modification time, used to detect changed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStat {
    pub size_bytes: u64,
    /// Unix milliseconds.
    pub modified_at: i64,
}

impl FileStat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let meta = std::fs::metadata(path)?;
        let modified_at = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        Ok(Self {
            size_bytes: meta.len(),
            modified_at,
        })
    }
}

/// Whether `path` has one of `extensions` (case-insensitive, without the dot).
pub fn has_video_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
        .unwrap_or(false)
}

/// Recursively list video files under `root` with their stats.
///
/// Paths are canonicalized so the same file always maps to the same catalog
/// row. Entries that cannot be read are logged and skipped.
pub fn scan_directory(
    root: &Path,
    extensions: &[String],
    follow_links: bool,
) -> Result<Vec<(PathBuf, FileStat)>> {
    if !root.is_dir() {
        return Err(VidscribeError::InvalidInput(format!(
            "Library directory does not exist: {}",
            root.display()
        )));
    }

    let mut found = Vec::new();

    for entry in WalkDir::new(root).follow_links(follow_links) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() && !(follow_links && entry.path().is_file()) {
            continue;
        }
        if !has_video_extension(entry.path(), extensions) {
            continue;
        }

        let path = match entry.path().canonicalize() {
            Ok(path) => path,
            Err(e) => {
                warn!("Cannot resolve {:?}: {}", entry.path(), e);
                continue;
            }
        };

        match FileStat::from_path(&path) {
            Ok(stat) => found.push((path, stat)),
            Err(e) => warn!("Cannot stat {:?}: {}", path, e),
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    debug!("Found {} video files under {:?}", found.len(), root);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exts() -> Vec<String> {
        vec!["mp4".to_string(), ".MKV".to_string()]
    }

    #[test]
    fn test_extension_filter() {
        assert!(has_video_extension(Path::new("/a/b.mp4"), &exts()));
        assert!(has_video_extension(Path::new("/a/b.MP4"), &exts()));
        assert!(has_video_extension(Path::new("/a/b.mkv"), &exts()));
        assert!(!has_video_extension(Path::new("/a/b.txt"), &exts()));
        assert!(!has_video_extension(Path::new("/a/mp4"), &exts()));
    }

    #[test]
    fn test_scan_directory_recurses_and_filters() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"aaaa").unwrap();
        std::fs::write(dir.path().join("nested/deeper/b.mkv"), b"bb").unwrap();
        std::fs::write(dir.path().join("nested/notes.txt"), b"x").unwrap();

        let found = scan_directory(dir.path(), &exts(), false).unwrap();
        assert_eq!(found.len(), 2);

        let names: Vec<_> = found
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"a.mp4".to_string()));
        assert!(names.contains(&"b.mkv".to_string()));

        let a = found.iter().find(|(p, _)| p.ends_with("a.mp4")).unwrap();
        assert_eq!(a.1.size_bytes, 4);
        assert!(a.0.is_absolute());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = scan_directory(&dir.path().join("nope"), &exts(), false).unwrap_err();
        assert!(matches!(err, VidscribeError::InvalidInput(_)));
    }
}
