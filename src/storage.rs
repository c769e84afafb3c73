use crate::utils::bytes_to_mb;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Output directories under the workspace root.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub root: PathBuf,
    pub previews: PathBuf,
    pub exports: PathBuf,
    pub slides: PathBuf,
    pub html: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirUsage {
    pub name: &'static str,
    pub files: usize,
    pub size_mb: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntry {
    pub path: PathBuf,
    pub filename: String,
    pub size_mb: f64,
    pub modified: DateTime<Local>,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            previews: root.join("previews"),
            exports: root.join("exports"),
            slides: root.join("slides"),
            html: root.join("html"),
            root,
        }
    }

    pub fn ensure(&self) -> Result<()> {
        for dir in self.dirs().iter().map(|(_, d)| d) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        Ok(())
    }

    fn dirs(&self) -> [(&'static str, &Path); 4] {
        [
            ("previews", self.previews.as_path()),
            ("exports", self.exports.as_path()),
            ("slides", self.slides.as_path()),
            ("html", self.html.as_path()),
        ]
    }

    /// Delete previews older than `max_age`. Returns how many were removed.
    pub fn cleanup(&self, max_age: Duration) -> Result<usize> {
        let removed = remove_older_than(&self.previews, max_age, SystemTime::now())?;
        if removed > 0 {
            info!(removed, "cleaned up old previews");
        }
        Ok(removed)
    }

    pub fn storage_info(&self) -> Vec<DirUsage> {
        self.dirs()
            .iter()
            .map(|&(name, dir)| {
                let (files, bytes) = dir_usage(dir);
                DirUsage {
                    name,
                    files,
                    size_mb: bytes_to_mb(bytes),
                }
            })
            .collect()
    }

    /// Exported MP4 files, newest first.
    pub fn list_exports(&self) -> Result<Vec<ExportEntry>> {
        let mut entries = Vec::new();
        if !self.exports.exists() {
            return Ok(entries);
        }
        for entry in std::fs::read_dir(&self.exports)? {
            let path = entry?.path();
            let is_mp4 = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("mp4"))
                .unwrap_or(false);
            if !is_mp4 {
                continue;
            }
            let meta = std::fs::metadata(&path)?;
            entries.push(ExportEntry {
                filename: path
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default(),
                size_mb: bytes_to_mb(meta.len()),
                modified: DateTime::<Local>::from(meta.modified()?),
                path,
            });
        }
        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(entries)
    }
}

fn dir_usage(dir: &Path) -> (usize, u64) {
    let Ok(read) = std::fs::read_dir(dir) else {
        return (0, 0);
    };
    read.flatten()
        .filter_map(|e| e.metadata().ok())
        .filter(|m| m.is_file())
        .fold((0, 0), |(count, bytes), m| (count + 1, bytes + m.len()))
}

fn remove_older_than(dir: &Path, max_age: Duration, now: SystemTime) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let mut removed = 0;
    for entry in std::fs::read_dir(dir)?.flatten() {
        let path = entry.path();
        let Ok(meta) = entry.metadata() else { continue };
        if !meta.is_file() {
            continue;
        }
        let age = meta
            .modified()
            .ok()
            .and_then(|m| now.duration_since(m).ok())
            .unwrap_or_default();
        if age > max_age {
            std::fs::remove_file(&path)
                .with_context(|| format!("removing {}", path.display()))?;
            debug!(path = %path.display(), "removed stale file");
            removed += 1;
        }
    }
    Ok(removed)
}

/// Make a user-supplied name safe as a file name.
///
/// Whitespace runs become `_`, anything outside `[A-Za-z0-9._-]` is
/// dropped, and leading/trailing dots and underscores are stripped.
pub fn sanitize_filename(name: &str) -> String {
    let joined = name.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My Final Cut"), "My_Final_Cut");
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("  .hidden  "), "hidden");
        assert_eq!(sanitize_filename("café-v2.mp4"), "caf-v2.mp4");
        assert_eq!(sanitize_filename("   "), "");
    }

    #[test]
    fn test_ensure_and_storage_info() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        workspace.ensure().unwrap();
        assert!(workspace.previews.is_dir());
        assert!(workspace.html.is_dir());

        std::fs::write(workspace.exports.join("a.mp4"), vec![0u8; 2048]).unwrap();
        let info = workspace.storage_info();
        let exports = info.iter().find(|u| u.name == "exports").unwrap();
        assert_eq!(exports.files, 1);
        assert_eq!(info.iter().find(|u| u.name == "slides").unwrap().files, 0);
    }

    #[test]
    fn test_list_exports_only_mp4() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        assert!(workspace.list_exports().unwrap().is_empty());

        workspace.ensure().unwrap();
        std::fs::write(workspace.exports.join("one.mp4"), b"x").unwrap();
        std::fs::write(workspace.exports.join("notes.txt"), b"x").unwrap();

        let list = workspace.list_exports().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].filename, "one.mp4");
    }

    #[test]
    fn test_remove_older_than() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.mp4"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        // Nothing is older than an hour yet.
        let removed = remove_older_than(dir.path(), Duration::from_secs(3600), SystemTime::now()).unwrap();
        assert_eq!(removed, 0);

        // Pretend two hours have passed.
        let later = SystemTime::now() + Duration::from_secs(7200);
        let removed = remove_older_than(dir.path(), Duration::from_secs(3600), later).unwrap();
        assert_eq!(removed, 1);
        assert!(!dir.path().join("old.mp4").exists());
        assert!(dir.path().join("sub").exists());

        assert_eq!(
            remove_older_than(&dir.path().join("missing"), Duration::ZERO, later).unwrap(),
            0
        );
    }
}
