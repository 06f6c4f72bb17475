//! Persistent compilation number.
//!
//! The number is stored as plain decimal text in a single file. A missing or
//! corrupt file reads as zero so a fresh checkout always starts at 0.

use std::path::{Path, PathBuf};

/// Reads and advances the compilation number stored at `path`.
#[derive(Debug, Clone)]
pub struct CompilationCounter {
    path: PathBuf,
}

impl CompilationCounter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current compilation number, 0 if the file is absent or unreadable.
    pub fn current(&self) -> u64 {
        if !self.path.exists() {
            return 0;
        }
        match std::fs::read_to_string(&self.path) {
            Ok(content) => match content.trim().parse::<u64>() {
                Ok(number) => number,
                Err(_) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        "Counter file contained invalid data, resetting to 0"
                    );
                    0
                }
            },
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read counter file, defaulting to 0"
                );
                0
            }
        }
    }

    /// Store `current() + 1` and return it.
    ///
    /// A failed write is logged; the new number is returned regardless.
    pub fn increment(&self) -> u64 {
        let next = self.current() + 1;
        if let Err(e) = self.write(next) {
            tracing::error!(
                path = %self.path.display(),
                error = %e,
                "Failed to save compilation number"
            );
        }
        next
    }

    fn write(&self, number: u64) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, number.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_zero() {
        let dir = tempfile::tempdir().unwrap();
        let counter = CompilationCounter::new(dir.path().join("counter.txt"));
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn test_increment_persists() {
        let dir = tempfile::tempdir().unwrap();
        let counter = CompilationCounter::new(dir.path().join("counter.txt"));
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.current(), 2);
        assert_eq!(
            std::fs::read_to_string(counter.path()).unwrap(),
            "2".to_string()
        );
    }

    #[test]
    fn test_corrupt_file_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.txt");
        std::fs::write(&path, "abc").unwrap();
        let counter = CompilationCounter::new(&path);
        assert_eq!(counter.current(), 0);
        assert_eq!(counter.increment(), 1);
    }

    #[test]
    fn test_whitespace_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.txt");
        std::fs::write(&path, " 41\n").unwrap();
        assert_eq!(CompilationCounter::new(&path).current(), 41);
    }
}
