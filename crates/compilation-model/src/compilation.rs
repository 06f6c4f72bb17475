//! Compilation request and result types.
//!
//! A request is the plain configuration record a caller hands to the
//! assembly engine together with an ordered list of local clip files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::resolution::{FrameSize, Resolution};
use crate::title::BumperSpec;

/// How adjacent segments are joined.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionPolicy {
    /// Hard cuts, segments laid end to end.
    #[default]
    None,
    /// Each segment fades in over the tail of the previous one.
    Crossfade { duration_secs: f64 },
}

impl TransitionPolicy {
    pub fn crossfade(duration_secs: f64) -> Self {
        Self::Crossfade { duration_secs }
    }

    /// Build from an on/off flag plus length, as found in configuration.
    pub fn from_flag(enabled: bool, duration_secs: f64) -> Self {
        if enabled {
            Self::Crossfade { duration_secs }
        } else {
            Self::None
        }
    }

    /// Seconds two adjacent segments share on the timeline.
    pub fn overlap_secs(&self) -> f64 {
        match self {
            Self::None => 0.0,
            Self::Crossfade { duration_secs } => *duration_secs,
        }
    }

    pub fn is_crossfade(&self) -> bool {
        matches!(self, Self::Crossfade { .. })
    }
}

/// Everything the engine needs for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationRequest {
    /// Candidate clips, in priority order.
    pub clips: Vec<PathBuf>,

    /// Target run-time in seconds.
    pub target_secs: f64,

    /// Canonical output frame.
    pub resolution: Resolution,

    /// How segments are joined.
    pub transition: TransitionPolicy,

    /// Optional title card prepended as segment zero.
    pub bumper: Option<BumperSpec>,

    /// Final output file.
    pub output_path: PathBuf,
}

impl CompilationRequest {
    pub fn new(clips: Vec<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            clips,
            target_secs: 11.0 * 60.0,
            resolution: Resolution::default(),
            transition: TransitionPolicy::crossfade(1.0),
            bumper: None,
            output_path: output_path.into(),
        }
    }

    pub fn with_target_minutes(mut self, minutes: f64) -> Self {
        self.target_secs = minutes * 60.0;
        self
    }

    pub fn with_target_secs(mut self, secs: f64) -> Self {
        self.target_secs = secs;
        self
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_transition(mut self, transition: TransitionPolicy) -> Self {
        self.transition = transition;
        self
    }

    pub fn with_bumper(mut self, bumper: Option<BumperSpec>) -> Self {
        self.bumper = bumper;
        self
    }

    pub fn frame_size(&self) -> FrameSize {
        self.resolution.frame_size()
    }
}

/// Why a candidate clip did not make it into the compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The file does not exist.
    Missing,
    /// The file could not be opened or probed.
    Unreadable,
    /// Zero, negative, or unknown duration.
    InvalidDuration,
    /// Resizing or letterboxing failed.
    NormalizeFailed,
    /// Rejected by the duration budget.
    OverBudget,
}

/// A candidate clip left out of the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedClip {
    pub path: PathBuf,
    pub reason: SkipReason,
    pub detail: String,
}

/// A clip that made it into the output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedClip {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub source_size: FrameSize,
    pub letterboxed: bool,
}

/// The result of a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationArtifact {
    /// Where the compilation was written.
    pub output_path: PathBuf,

    /// Realized timeline duration in seconds.
    pub duration_secs: f64,

    /// Whether a title bumper leads the compilation.
    pub has_bumper: bool,

    /// Clips in output order.
    pub clips: Vec<AcceptedClip>,

    /// Candidates that were dropped, in input order.
    pub skipped: Vec<SkippedClip>,
}

impl CompilationArtifact {
    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_overlap() {
        assert_eq!(TransitionPolicy::None.overlap_secs(), 0.0);
        assert_eq!(TransitionPolicy::crossfade(1.5).overlap_secs(), 1.5);
        assert_eq!(TransitionPolicy::from_flag(false, 1.5), TransitionPolicy::None);
    }

    #[test]
    fn test_request_builder() {
        let request = CompilationRequest::new(vec![PathBuf::from("a.mp4")], "out.mp4")
            .with_target_minutes(10.0)
            .with_resolution(Resolution::FullHd1080)
            .with_transition(TransitionPolicy::None);
        assert_eq!(request.target_secs, 600.0);
        assert_eq!(request.frame_size(), FrameSize::FULL_HD);
        assert!(!request.transition.is_crossfade());
    }

    #[test]
    fn test_transition_serde_shape() {
        let json = serde_json::to_value(TransitionPolicy::crossfade(1.0)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"kind": "crossfade", "duration_secs": 1.0})
        );
    }
}
