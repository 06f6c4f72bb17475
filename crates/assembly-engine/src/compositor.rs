//! Transition compositing.
//!
//! Crossfades are built pairwise: each incoming segment is laid over the
//! tail of the running composite and only ever blends with its immediate
//! neighbor. The fold below carries the composite and its running length.

use clipreel_common::error::{ClipreelError, ClipreelResult};
use clipreel_compilation_model::{FrameSize, TransitionPolicy};

use crate::backend::{Footage, MediaBackend};
use crate::normalize::NormalizedSegment;

/// Slack allowed between the duration a backend reports and the computed one.
const DURATION_EPSILON_SECS: f64 = 1e-3;

/// Ordered segments plus the way to join them.
#[derive(Debug)]
pub struct CompositionPlan<M> {
    segments: Vec<NormalizedSegment<M>>,
    transition: TransitionPolicy,
    frame: FrameSize,
}

impl<M> CompositionPlan<M> {
    pub fn new(frame: FrameSize, transition: TransitionPolicy) -> Self {
        Self {
            segments: Vec::new(),
            transition,
            frame,
        }
    }

    /// Append a segment. Segments must be at the plan's frame size.
    pub fn push(&mut self, segment: NormalizedSegment<M>) -> ClipreelResult<()> {
        if segment.size() != self.frame {
            return Err(ClipreelError::compose(format!(
                "segment is {} but the timeline is {}",
                segment.size(),
                self.frame
            )));
        }
        self.segments.push(segment);
        Ok(())
    }

    pub fn segments(&self) -> &[NormalizedSegment<M>] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of real (non-bumper) segments.
    pub fn clip_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_bumper()).count()
    }

    pub fn transition(&self) -> TransitionPolicy {
        self.transition
    }

    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    /// Timeline length the plan should compose to.
    pub fn expected_duration(&self) -> f64 {
        let total: f64 = self.segments.iter().map(|s| s.duration_secs()).sum();
        let joins = self.segments.len().saturating_sub(1) as f64;
        total - joins * self.transition.overlap_secs()
    }
}

/// Compose `plan` into one timeline.
///
/// A single segment is passed through as is. Any failure aborts the whole
/// composition; every segment and partial composite is released on return.
pub fn compose<B: MediaBackend>(
    backend: &mut B,
    plan: CompositionPlan<B::Media>,
) -> ClipreelResult<Footage<B::Media>> {
    let expected = plan.expected_duration();
    let CompositionPlan {
        segments,
        transition,
        frame,
    } = plan;

    let mut footage = segments.into_iter().map(|segment| segment.footage);
    let Some(first) = footage.next() else {
        return Err(ClipreelError::compose("nothing to compose"));
    };

    let remaining = footage.len();
    if remaining == 0 {
        tracing::debug!("Single segment, skipping transitions");
        return Ok(first);
    }

    let timeline = match transition {
        TransitionPolicy::None => {
            let parts: Vec<_> = std::iter::once(first).chain(footage).collect();
            backend
                .concatenate(parts)
                .map_err(|e| ClipreelError::compose(format!("concatenate: {e}")))?
        }
        TransitionPolicy::Crossfade { duration_secs } => {
            if !(duration_secs.is_finite() && duration_secs > 0.0) {
                return Err(ClipreelError::compose(format!(
                    "crossfade length must be positive, got {duration_secs}"
                )));
            }
            footage.enumerate().try_fold(first, |running, (index, incoming)| {
                crossfade_pair(backend, running, incoming, duration_secs, index + 1)
            })?
        }
    };

    if timeline.size != frame {
        return Err(ClipreelError::compose(format!(
            "timeline came out at {} instead of {frame}",
            timeline.size
        )));
    }
    if (timeline.duration_secs - expected).abs() > DURATION_EPSILON_SECS {
        return Err(ClipreelError::compose(format!(
            "timeline is {:.3}s, expected {expected:.3}s",
            timeline.duration_secs
        )));
    }

    tracing::debug!(
        segments = remaining + 1,
        duration_secs = timeline.duration_secs,
        "Timeline composed"
    );
    Ok(timeline)
}

/// Lay `incoming` over the last `fade_secs` of `running`.
fn crossfade_pair<B: MediaBackend>(
    backend: &mut B,
    running: Footage<B::Media>,
    incoming: Footage<B::Media>,
    fade_secs: f64,
    index: usize,
) -> ClipreelResult<Footage<B::Media>> {
    let start_secs = running.duration_secs - fade_secs;
    if start_secs < 0.0 {
        return Err(ClipreelError::compose(format!(
            "segment {index}: running timeline ({:.3}s) is shorter than the crossfade",
            running.duration_secs
        )));
    }
    if incoming.duration_secs < fade_secs {
        return Err(ClipreelError::compose(format!(
            "segment {index}: {:.3}s is shorter than the crossfade",
            incoming.duration_secs
        )));
    }

    let expected = start_secs + incoming.duration_secs;
    let blended = backend
        .crossfade(running, incoming, start_secs, fade_secs)
        .map_err(|e| ClipreelError::compose(format!("segment {index}: {e}")))?;

    if (blended.duration_secs - expected).abs() > DURATION_EPSILON_SECS {
        return Err(ClipreelError::compose(format!(
            "segment {index}: crossfade produced {:.3}s, expected {expected:.3}s",
            blended.duration_secs
        )));
    }
    Ok(blended)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::SegmentKind;
    use std::path::PathBuf;

    fn segment(duration_secs: f64, kind: SegmentKind) -> NormalizedSegment<()> {
        NormalizedSegment {
            footage: Footage::new((), FrameSize::HD, duration_secs, true),
            kind,
            letterboxed: false,
            source_size: FrameSize::HD,
        }
    }

    fn clip(duration_secs: f64) -> NormalizedSegment<()> {
        segment(
            duration_secs,
            SegmentKind::Clip {
                path: PathBuf::from("clip.mp4"),
            },
        )
    }

    #[test]
    fn test_expected_duration_with_crossfade() {
        let mut plan = CompositionPlan::new(FrameSize::HD, TransitionPolicy::crossfade(1.0));
        plan.push(segment(5.0, SegmentKind::Bumper)).unwrap();
        plan.push(clip(10.0)).unwrap();
        plan.push(clip(10.0)).unwrap();
        assert_eq!(plan.expected_duration(), 23.0);
        assert_eq!(plan.clip_count(), 2);
    }

    #[test]
    fn test_expected_duration_without_transition() {
        let mut plan = CompositionPlan::new(FrameSize::HD, TransitionPolicy::None);
        plan.push(clip(300.0)).unwrap();
        plan.push(clip(300.0)).unwrap();
        assert_eq!(plan.expected_duration(), 600.0);
    }

    #[test]
    fn test_single_segment_has_no_overlap() {
        let mut plan = CompositionPlan::new(FrameSize::HD, TransitionPolicy::crossfade(1.0));
        plan.push(clip(7.0)).unwrap();
        assert_eq!(plan.expected_duration(), 7.0);
    }

    #[test]
    fn test_push_rejects_wrong_size() {
        let mut plan = CompositionPlan::new(FrameSize::FULL_HD, TransitionPolicy::None);
        assert!(plan.push(clip(3.0)).is_err());
        assert!(plan.is_empty());
    }
}
