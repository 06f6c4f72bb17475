//! Media backend abstraction.
//!
//! The engine never touches pixels itself. It drives a [`MediaBackend`]
//! through a small set of blocking operations and only inspects the
//! geometry and length the backend reports back.
//!
//! Every operation takes its inputs by value. Whatever a call consumes is
//! released when the call returns, whether it succeeded or not, so dropping
//! a [`Footage`] is the one and only way media resources are freed.

use std::path::{Path, PathBuf};

use clipreel_common::config::EncoderConfig;
use clipreel_common::error::ClipreelResult;
use clipreel_compilation_model::FrameSize;
use serde::{Deserialize, Serialize};

/// Backend-owned media together with the facts the engine needs about it.
#[derive(Debug)]
pub struct Footage<M> {
    /// Backend resource (decoder, filter node, ...).
    pub media: M,

    /// Frame dimensions.
    pub size: FrameSize,

    /// Length in seconds.
    pub duration_secs: f64,

    /// Whether the media carries an audio stream.
    pub has_audio: bool,
}

impl<M> Footage<M> {
    pub fn new(media: M, size: FrameSize, duration_secs: f64, has_audio: bool) -> Self {
        Self {
            media,
            size,
            duration_secs,
            has_audio,
        }
    }
}

/// An opened source clip.
#[derive(Debug)]
pub struct ClipHandle<M> {
    /// File the clip was opened from.
    pub path: PathBuf,

    /// Opened media.
    pub footage: Footage<M>,
}

impl<M> ClipHandle<M> {
    pub fn duration_secs(&self) -> f64 {
        self.footage.duration_secs
    }

    pub fn size(&self) -> FrameSize {
        self.footage.size
    }

    /// Non-positive or non-finite durations never enter a timeline.
    pub fn has_valid_duration(&self) -> bool {
        self.footage.duration_secs.is_finite() && self.footage.duration_secs > 0.0
    }
}

/// Fixed codec configuration for the final write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSettings {
    pub video_codec: String,
    pub audio_codec: String,
    pub crf: u32,
    pub preset: String,
    pub threads: u32,
    pub fps: u32,
    pub pixel_format: String,
    pub audio_bitrate_kbps: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from(&EncoderConfig::default())
    }
}

impl From<&EncoderConfig> for EncodeSettings {
    fn from(config: &EncoderConfig) -> Self {
        Self {
            video_codec: config.video_codec.clone(),
            audio_codec: config.audio_codec.clone(),
            crf: config.crf,
            preset: config.preset.clone(),
            threads: config.threads,
            fps: config.fps.max(1),
            pixel_format: "yuv420p".to_string(),
            audio_bitrate_kbps: config.audio_bitrate_kbps.max(64),
        }
    }
}

/// Progress callback for an assembly run.
pub type ProgressCallback = Box<dyn Fn(AssemblyProgress) + Send>;

/// Assembly progress report.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyProgress {
    /// Current stage.
    pub stage: AssemblyStage,

    /// Progress within the stage [0.0, 1.0].
    pub progress: f64,

    /// Estimated time remaining in seconds, 0 when unknown.
    pub eta_secs: f64,
}

impl AssemblyProgress {
    pub fn at(stage: AssemblyStage, progress: f64) -> Self {
        Self {
            stage,
            progress: progress.clamp(0.0, 1.0),
            eta_secs: 0.0,
        }
    }
}

/// Stages of an assembly run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyStage {
    Preparing,
    Selecting,
    Composing,
    Encoding,
    Finalizing,
    Complete,
    Failed,
}

/// Media I/O collaborator used by the engine.
///
/// All calls block until done. Errors are reported through
/// [`ClipreelError`](clipreel_common::error::ClipreelError); the engine
/// decides whether a given failure is per-clip or fatal to the run.
pub trait MediaBackend {
    /// Backend-specific media resource.
    type Media;

    /// Backend name.
    fn name(&self) -> &str;

    /// Check if this backend is usable on the system.
    fn is_available(&self) -> bool;

    /// Open a media file and report its geometry and length.
    fn open(&mut self, path: &Path) -> ClipreelResult<Footage<Self::Media>>;

    /// Scale to `height`, preserving aspect ratio.
    fn resize_to_height(
        &mut self,
        footage: Footage<Self::Media>,
        height: u32,
    ) -> ClipreelResult<Footage<Self::Media>>;

    /// Center `footage` over an opaque black `frame` lasting `duration_secs`.
    fn center_on_background(
        &mut self,
        footage: Footage<Self::Media>,
        frame: FrameSize,
        duration_secs: f64,
    ) -> ClipreelResult<Footage<Self::Media>>;

    /// Render `text` centered on a solid `frame` lasting `duration_secs`.
    fn render_text(
        &mut self,
        text: &str,
        frame: FrameSize,
        duration_secs: f64,
    ) -> ClipreelResult<Footage<Self::Media>>;

    /// Overlay `incoming` on `base` from `start_secs`, fading it in over
    /// `fade_secs`.
    fn crossfade(
        &mut self,
        base: Footage<Self::Media>,
        incoming: Footage<Self::Media>,
        start_secs: f64,
        fade_secs: f64,
    ) -> ClipreelResult<Footage<Self::Media>>;

    /// Lay `parts` end to end.
    fn concatenate(
        &mut self,
        parts: Vec<Footage<Self::Media>>,
    ) -> ClipreelResult<Footage<Self::Media>>;

    /// Encode `timeline` to `output`.
    fn write(
        &mut self,
        timeline: Footage<Self::Media>,
        output: &Path,
        settings: &EncodeSettings,
        progress: Option<&ProgressCallback>,
    ) -> ClipreelResult<()>;
}
