//! Compilation assembly.
//!
//! One run walks the candidate clips in order, one at a time: open, validate,
//! normalize, then ask the budget. Accepted segments go into a
//! [`CompositionPlan`] which is composed and written once selection stops.
//!
//! Per-clip failures are logged and recorded as skips. Anything that goes
//! wrong after selection fails the run, and no file is left at the output
//! path.

use std::path::Path;

use clipreel_common::error::{ClipreelError, ClipreelResult};
use clipreel_compilation_model::{
    AcceptedClip, CompilationArtifact, CompilationRequest, FrameSize, SkipReason, SkippedClip,
};

use crate::backend::{
    AssemblyProgress, AssemblyStage, ClipHandle, EncodeSettings, MediaBackend, ProgressCallback,
};
use crate::budget::{BudgetDecision, TimelineBudget};
use crate::bumper::generate_bumper;
use crate::compositor::{compose, CompositionPlan};
use crate::normalize::{normalize_clip, NormalizedSegment};
use crate::output::{write_report, AssemblyReport, PartialOutput};

/// Drives a [`MediaBackend`] through a full compilation run.
#[derive(Debug)]
pub struct AssemblyEngine<B> {
    backend: B,
    encode: EncodeSettings,
}

impl<B: MediaBackend> AssemblyEngine<B> {
    pub fn new(backend: B, encode: EncodeSettings) -> Self {
        Self { backend, encode }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn encode_settings(&self) -> &EncodeSettings {
        &self.encode
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Build the compilation described by `request`.
    ///
    /// On success the file at `request.output_path` holds the compilation
    /// and the returned artifact describes it. On failure nothing is left
    /// at that path.
    pub fn assemble(
        &mut self,
        request: &CompilationRequest,
        progress: Option<ProgressCallback>,
    ) -> ClipreelResult<CompilationArtifact> {
        let started = std::time::Instant::now();
        tracing::info!(
            backend = self.backend.name(),
            clips = request.clips.len(),
            target_secs = request.target_secs,
            resolution = request.resolution.tag(),
            crossfade = request.transition.is_crossfade(),
            bumper = request.bumper.is_some(),
            output = %request.output_path.display(),
            "Assembly started"
        );

        match self.run(request, progress.as_ref()) {
            Ok(artifact) => {
                tracing::info!(
                    output = %artifact.output_path.display(),
                    duration_secs = artifact.duration_secs,
                    clips = artifact.clip_count(),
                    skipped = artifact.skipped.len(),
                    elapsed_secs = started.elapsed().as_secs_f64(),
                    "Assembly finished"
                );
                report(progress.as_ref(), AssemblyStage::Complete, 1.0);
                Ok(artifact)
            }
            Err(err) => {
                tracing::error!(error = %err, "Assembly failed");
                report(progress.as_ref(), AssemblyStage::Failed, 0.0);
                Err(err)
            }
        }
    }

    fn run(
        &mut self,
        request: &CompilationRequest,
        progress: Option<&ProgressCallback>,
    ) -> ClipreelResult<CompilationArtifact> {
        report(progress, AssemblyStage::Preparing, 0.0);
        if !self.backend.is_available() {
            return Err(ClipreelError::unsupported(format!(
                "media backend '{}' is not available",
                self.backend.name()
            )));
        }

        let frame = request.frame_size();
        let mut plan = CompositionPlan::new(frame, request.transition);
        let mut budget = TimelineBudget::new(request.target_secs);

        let mut has_bumper = match &request.bumper {
            Some(spec) => match generate_bumper(&mut self.backend, spec, frame) {
                Ok(segment) => {
                    budget.credit_bumper(segment.duration_secs());
                    plan.push(segment)?;
                    true
                }
                Err(err) => {
                    tracing::warn!(error = %err, "Title bumper unavailable, continuing without it");
                    false
                }
            },
            None => false,
        };

        let mut selection = self.select_clips(request, frame, &mut budget, &mut plan, progress)?;

        if plan.clip_count() == 0 {
            if let Some(reserve) = selection.reserve.take() {
                // nothing to blend with, so the short clip stands alone
                if !plan.is_empty() {
                    tracing::warn!("Dropping title bumper, the only usable clip is shorter than the crossfade");
                    plan = CompositionPlan::new(frame, request.transition);
                    has_bumper = false;
                }
                let skipped = selection.skipped.remove(reserve.skip_index);
                selection.accepted.push(AcceptedClip {
                    path: skipped.path,
                    duration_secs: reserve.segment.duration_secs(),
                    source_size: reserve.segment.source_size,
                    letterboxed: reserve.segment.letterboxed,
                });
                plan.push(reserve.segment)?;
            }
        }

        if plan.clip_count() == 0 {
            return Err(ClipreelError::NoUsableClips {
                offered: request.clips.len(),
                skipped: selection.skipped.len(),
            });
        }

        tracing::info!(
            segments = plan.len(),
            accumulated_secs = budget.accumulated_secs(),
            expected_secs = plan.expected_duration(),
            "Selection finished"
        );

        report(progress, AssemblyStage::Composing, 0.0);
        let timeline = compose(&mut self.backend, plan)?;
        let duration_secs = timeline.duration_secs;

        let output = PartialOutput::create(&request.output_path)?;
        self.backend
            .write(timeline, output.part_path(), &self.encode, progress)?;

        report(progress, AssemblyStage::Finalizing, 0.0);
        let output_path = output.commit()?;

        let artifact = CompilationArtifact {
            output_path,
            duration_secs,
            has_bumper,
            clips: selection.accepted,
            skipped: selection.skipped,
        };

        let summary = AssemblyReport {
            generated_at: chrono::Utc::now(),
            backend: self.backend.name(),
            target_secs: request.target_secs,
            resolution: request.resolution,
            transition: request.transition,
            artifact: &artifact,
        };
        if let Err(err) = write_report(&summary) {
            tracing::warn!(error = %err, "Failed to write assembly report");
        }

        Ok(artifact)
    }

    /// Offer each candidate to the budget until it stops.
    fn select_clips(
        &mut self,
        request: &CompilationRequest,
        frame: FrameSize,
        budget: &mut TimelineBudget,
        plan: &mut CompositionPlan<B::Media>,
        progress: Option<&ProgressCallback>,
    ) -> ClipreelResult<Selection<B::Media>> {
        let mut selection = Selection::new();
        let overlap = request.transition.overlap_secs();
        let total = request.clips.len();

        for (index, path) in request.clips.iter().enumerate() {
            report(progress, AssemblyStage::Selecting, index as f64 / total as f64);

            if budget.is_closed() {
                selection.skip(path, SkipReason::OverBudget, "target already reached");
                continue;
            }

            let segment = match self.prepare_clip(path, frame) {
                Ok(segment) => segment,
                Err((reason, detail)) => {
                    tracing::warn!(
                        path = %path.display(),
                        reason = ?reason,
                        detail = %detail,
                        "Skipping clip"
                    );
                    selection.skip(path, reason, detail);
                    continue;
                }
            };

            if segment.duration_secs() < overlap {
                let detail = format!(
                    "{:.3}s is shorter than the {overlap:.3}s crossfade",
                    segment.duration_secs()
                );
                tracing::warn!(path = %path.display(), detail = %detail, "Skipping clip");
                selection.skip(path, SkipReason::InvalidDuration, detail);
                if selection.reserve.is_none() {
                    selection.reserve = Some(Reserve {
                        skip_index: selection.skipped.len() - 1,
                        segment,
                    });
                }
                continue;
            }

            let added = budget.contribution(segment.duration_secs(), request.transition);
            let decision = budget.evaluate(added);
            tracing::debug!(
                path = %path.display(),
                duration_secs = segment.duration_secs(),
                added_secs = added,
                accumulated_secs = budget.accumulated_secs(),
                decision = ?decision,
                "Budget decision"
            );

            match decision {
                BudgetDecision::Accept | BudgetDecision::AcceptAndStop => {
                    selection.accepted.push(AcceptedClip {
                        path: path.clone(),
                        duration_secs: segment.duration_secs(),
                        source_size: segment.source_size,
                        letterboxed: segment.letterboxed,
                    });
                    plan.push(segment)?;
                }
                BudgetDecision::RejectAndStop => {
                    let detail = format!(
                        "{added:.1}s would overrun the {:.0}s target",
                        budget.target_secs()
                    );
                    selection.skip(path, SkipReason::OverBudget, detail);
                }
            }
        }

        report(progress, AssemblyStage::Selecting, 1.0);
        Ok(selection)
    }

    /// Open, validate and normalize one candidate.
    fn prepare_clip(
        &mut self,
        path: &Path,
        frame: FrameSize,
    ) -> Result<NormalizedSegment<B::Media>, (SkipReason, String)> {
        let footage = self.backend.open(path).map_err(|err| {
            let reason = if matches!(err, ClipreelError::FileNotFound { .. }) {
                SkipReason::Missing
            } else {
                SkipReason::Unreadable
            };
            (reason, err.to_string())
        })?;

        let clip = ClipHandle {
            path: path.to_path_buf(),
            footage,
        };
        if !clip.has_valid_duration() {
            return Err((
                SkipReason::InvalidDuration,
                format!("duration is {}", clip.duration_secs()),
            ));
        }

        normalize_clip(&mut self.backend, clip, frame)
            .map_err(|err| (SkipReason::NormalizeFailed, err.to_string()))
    }
}

struct Selection<M> {
    accepted: Vec<AcceptedClip>,
    skipped: Vec<SkippedClip>,
    /// First clip too short to crossfade, kept open in case it is the only one.
    reserve: Option<Reserve<M>>,
}

struct Reserve<M> {
    skip_index: usize,
    segment: NormalizedSegment<M>,
}

impl<M> Selection<M> {
    fn new() -> Self {
        Self {
            accepted: Vec::new(),
            skipped: Vec::new(),
            reserve: None,
        }
    }

    fn skip(&mut self, path: &Path, reason: SkipReason, detail: impl Into<String>) {
        self.skipped.push(SkippedClip {
            path: path.to_path_buf(),
            reason,
            detail: detail.into(),
        });
    }
}

fn report(progress: Option<&ProgressCallback>, stage: AssemblyStage, fraction: f64) {
    if let Some(cb) = progress {
        cb(AssemblyProgress::at(stage, fraction));
    }
}
