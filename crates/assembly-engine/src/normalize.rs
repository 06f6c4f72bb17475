//! Frame geometry normalization.
//!
//! Every segment that reaches the compositor has the canonical frame size.
//! Sources with a different aspect ratio are scaled to the target height and
//! letterboxed (or pillarboxed) over black.

use std::path::PathBuf;

use clipreel_common::error::{ClipreelError, ClipreelResult};
use clipreel_compilation_model::FrameSize;

use crate::backend::{ClipHandle, Footage, MediaBackend};

/// What a timeline segment was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentKind {
    /// Synthetic title card.
    Bumper,
    /// Real source clip.
    Clip { path: PathBuf },
}

/// A segment at the canonical frame size.
#[derive(Debug)]
pub struct NormalizedSegment<M> {
    pub footage: Footage<M>,
    pub kind: SegmentKind,

    /// Whether black bars were added around the source.
    pub letterboxed: bool,

    /// Size before normalization.
    pub source_size: FrameSize,
}

impl<M> NormalizedSegment<M> {
    pub fn duration_secs(&self) -> f64 {
        self.footage.duration_secs
    }

    pub fn size(&self) -> FrameSize {
        self.footage.size
    }

    pub fn is_bumper(&self) -> bool {
        matches!(self.kind, SegmentKind::Bumper)
    }
}

/// Bring `clip` to exactly `frame`.
///
/// A clip already at `frame` passes through untouched. Errors are reported
/// as [`ClipreelError::Normalize`]; the clip's resources are released either
/// way.
pub fn normalize_clip<B: MediaBackend>(
    backend: &mut B,
    clip: ClipHandle<B::Media>,
    frame: FrameSize,
) -> ClipreelResult<NormalizedSegment<B::Media>> {
    let ClipHandle { path, footage } = clip;
    let source_size = footage.size;
    let duration_secs = footage.duration_secs;

    if source_size == frame {
        return Ok(NormalizedSegment {
            footage,
            kind: SegmentKind::Clip { path },
            letterboxed: false,
            source_size,
        });
    }

    let resized = if source_size.height == frame.height {
        footage
    } else {
        backend
            .resize_to_height(footage, frame.height)
            .map_err(|e| ClipreelError::normalize(format!("resize {}: {e}", path.display())))?
    };

    let (footage, letterboxed) = if resized.size == frame {
        (resized, false)
    } else {
        tracing::debug!(
            path = %path.display(),
            source = %source_size,
            resized = %resized.size,
            target = %frame,
            "Centering clip on background"
        );
        let centered = backend
            .center_on_background(resized, frame, duration_secs)
            .map_err(|e| ClipreelError::normalize(format!("center {}: {e}", path.display())))?;
        (centered, true)
    };

    if footage.size != frame {
        return Err(ClipreelError::normalize(format!(
            "{} came out at {} instead of {frame}",
            path.display(),
            footage.size
        )));
    }

    Ok(NormalizedSegment {
        footage,
        kind: SegmentKind::Clip { path },
        letterboxed,
        source_size,
    })
}
