//! Output file handling.
//!
//! The encoder never writes the final path directly. It writes a sibling
//! `*.part.<ext>` file owned by [`PartialOutput`], which is renamed into place
//! on success and removed on every other path.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clipreel_common::error::ClipreelResult;
use clipreel_compilation_model::{CompilationArtifact, Resolution, TransitionPolicy};
use serde::Serialize;

/// In-progress output file, deleted on drop unless committed.
#[derive(Debug)]
pub struct PartialOutput {
    final_path: PathBuf,
    part_path: PathBuf,
    committed: bool,
}

impl PartialOutput {
    /// Prepare to write `final_path`, creating its directory if needed.
    pub fn create(final_path: &Path) -> ClipreelResult<Self> {
        if let Some(parent) = final_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let part_path = part_path_for(final_path);
        if part_path.exists() {
            tracing::warn!(path = %part_path.display(), "Removing stale partial output");
            std::fs::remove_file(&part_path)?;
        }
        Ok(Self {
            final_path: final_path.to_path_buf(),
            part_path,
            committed: false,
        })
    }

    /// Where the encoder should write.
    pub fn part_path(&self) -> &Path {
        &self.part_path
    }

    /// Move the finished file into place.
    pub fn commit(mut self) -> ClipreelResult<PathBuf> {
        std::fs::rename(&self.part_path, &self.final_path)?;
        self.committed = true;
        Ok(self.final_path.clone())
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if self.committed || !self.part_path.exists() {
            return;
        }
        match std::fs::remove_file(&self.part_path) {
            Ok(()) => tracing::debug!(path = %self.part_path.display(), "Removed partial output"),
            Err(err) => tracing::warn!(
                path = %self.part_path.display(),
                error = %err,
                "Failed to remove partial output"
            ),
        }
    }
}

/// `out/compilation.mp4` -> `out/compilation.part.mp4`
pub fn part_path_for(final_path: &Path) -> PathBuf {
    let stem = final_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let name = match final_path.extension() {
        Some(ext) => format!("{stem}.part.{}", ext.to_string_lossy()),
        None => format!("{stem}.part"),
    };
    final_path.with_file_name(name)
}

/// `out/compilation.mp4` -> `out/compilation.mp4.report.json`
pub fn report_path_for(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    name.push(".report.json");
    output_path.with_file_name(name)
}

/// Summary of a finished run, written next to the compilation.
#[derive(Debug, Serialize)]
pub struct AssemblyReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub backend: &'a str,
    pub target_secs: f64,
    pub resolution: Resolution,
    pub transition: TransitionPolicy,
    #[serde(flatten)]
    pub artifact: &'a CompilationArtifact,
}

/// Write `report` to `<output>.report.json` and return its path.
pub fn write_report(report: &AssemblyReport<'_>) -> ClipreelResult<PathBuf> {
    let path = report_path_for(&report.artifact.output_path);
    std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
    tracing::info!(report = %path.display(), "Wrote assembly report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_path_keeps_extension() {
        assert_eq!(
            part_path_for(Path::new("out/Best_of_#3.mp4")),
            PathBuf::from("out/Best_of_#3.part.mp4")
        );
        assert_eq!(part_path_for(Path::new("clip")), PathBuf::from("clip.part"));
    }

    #[test]
    fn test_report_path() {
        assert_eq!(
            report_path_for(Path::new("out/a.mp4")),
            PathBuf::from("out/a.mp4.report.json")
        );
    }

    #[test]
    fn test_uncommitted_output_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("nested").join("out.mp4");
        let guard = PartialOutput::create(&final_path).unwrap();
        std::fs::write(guard.part_path(), b"half an mp4").unwrap();
        let part = guard.part_path().to_path_buf();
        drop(guard);

        assert!(!part.exists());
        assert!(!final_path.exists());
    }

    #[test]
    fn test_commit_moves_file_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("out.mp4");
        let guard = PartialOutput::create(&final_path).unwrap();
        std::fs::write(guard.part_path(), b"mp4").unwrap();
        let part = guard.part_path().to_path_buf();

        assert_eq!(guard.commit().unwrap(), final_path);
        assert!(final_path.exists());
        assert!(!part.exists());
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = CompilationArtifact {
            output_path: dir.path().join("out.mp4"),
            duration_secs: 19.0,
            has_bumper: false,
            clips: Vec::new(),
            skipped: Vec::new(),
        };
        let report = AssemblyReport {
            generated_at: Utc::now(),
            backend: "fake",
            target_secs: 600.0,
            resolution: Resolution::Hd720,
            transition: TransitionPolicy::crossfade(1.0),
            artifact: &artifact,
        };
        let path = write_report(&report).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["duration_secs"], 19.0);
        assert_eq!(json["resolution"], "720p");
        assert_eq!(json["transition"]["kind"], "crossfade");
    }
}
