//! Title bumper generation.

use clipreel_common::error::{ClipreelError, ClipreelResult};
use clipreel_compilation_model::{BumperSpec, FrameSize};

use crate::backend::MediaBackend;
use crate::normalize::{NormalizedSegment, SegmentKind};

/// Render `spec` as a full-frame title card.
///
/// Failures come back as [`ClipreelError::Bumper`] so the caller can carry
/// on without a title.
pub fn generate_bumper<B: MediaBackend>(
    backend: &mut B,
    spec: &BumperSpec,
    frame: FrameSize,
) -> ClipreelResult<NormalizedSegment<B::Media>> {
    let footage = backend
        .render_text(spec.text(), frame, spec.duration_secs())
        .map_err(|e| ClipreelError::bumper(e.to_string()))?;

    if footage.size != frame {
        return Err(ClipreelError::bumper(format!(
            "title card rendered at {} instead of {frame}",
            footage.size
        )));
    }

    Ok(NormalizedSegment {
        footage,
        kind: SegmentKind::Bumper,
        letterboxed: false,
        source_size: frame,
    })
}
