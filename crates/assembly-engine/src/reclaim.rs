//! Temp-directory reclamation.

use std::path::Path;

use serde::Serialize;

/// Outcome of clearing a temp directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReclaimReport {
    /// Entries removed.
    pub deleted: usize,
    /// Entries that could not be removed.
    pub failed: usize,
    /// The directory did not exist.
    pub missing: bool,
}

impl ReclaimReport {
    pub fn is_success(&self) -> bool {
        !self.missing && self.failed == 0
    }
}

/// Delete every file and symlink directly inside `dir`.
///
/// Subdirectories are left alone. Errors are logged and counted, never
/// returned.
pub fn reclaim_temp_dir(dir: &Path) -> ReclaimReport {
    let mut report = ReclaimReport::default();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "Temp directory does not exist");
            report.missing = true;
            return report;
        }
        Err(err) => {
            tracing::error!(dir = %dir.display(), error = %err, "Failed to list temp directory");
            report.failed += 1;
            return report;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::error!(dir = %dir.display(), error = %err, "Failed to read directory entry");
                report.failed += 1;
                continue;
            }
        };

        let path = entry.path();
        let is_removable = entry
            .file_type()
            .map(|kind| kind.is_file() || kind.is_symlink())
            .unwrap_or(false);
        if !is_removable {
            continue;
        }

        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Deleted temp file");
                report.deleted += 1;
            }
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "Failed to delete temp file");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        dir = %dir.display(),
        deleted = report.deleted,
        failed = report.failed,
        "Temp directory reclaimed"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletes_files_but_not_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"a").unwrap();
        std::fs::write(dir.path().join("b.mp4"), b"b").unwrap();
        std::fs::create_dir(dir.path().join("keep")).unwrap();
        std::fs::write(dir.path().join("keep").join("c.mp4"), b"c").unwrap();

        let report = reclaim_temp_dir(dir.path());

        assert!(report.is_success());
        assert_eq!(report.deleted, 2);
        assert!(!dir.path().join("a.mp4").exists());
        assert!(dir.path().join("keep").join("c.mp4").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_removes_symlinks_without_touching_targets() {
        let dir = tempfile::tempdir().unwrap();
        let target_dir = tempfile::tempdir().unwrap();
        let target = target_dir.path().join("real.mp4");
        std::fs::write(&target, b"real").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link.mp4")).unwrap();

        let report = reclaim_temp_dir(dir.path());

        assert_eq!(report.deleted, 1);
        assert!(target.exists());
    }

    #[test]
    fn test_missing_directory_is_not_success() {
        let dir = tempfile::tempdir().unwrap();
        let report = reclaim_temp_dir(&dir.path().join("gone"));
        assert!(report.missing);
        assert!(!report.is_success());
    }

    #[test]
    fn test_empty_directory_is_success() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            reclaim_temp_dir(dir.path()),
            ReclaimReport {
                deleted: 0,
                failed: 0,
                missing: false
            }
        );
    }
}
