//! Clipreel Assembly Engine
//!
//! Turns an ordered list of downloaded clips into one compilation video of
//! bounded length, optionally led by a title bumper and joined with
//! crossfades.
//!
//! # Pipeline Architecture
//!
//! ```text
//! BumperSpec ──── Render Title ──────────────┐
//!                                             │
//! clip paths ──── Open ── Validate ── Normalize ── Budget ──┐
//!                   (skip on per-clip failure)   │          │
//!                                        accept/stop        │
//!                                                ▼          │
//!                                        CompositionPlan ◄──┘
//!                                                │
//!                                  Crossfade fold / Concatenate
//!                                                │
//!                                                ▼
//!                                     Encode (H.264 + AAC)
//!                                                │
//!                                                ▼
//!                             output.part.mp4 ── rename ── output.mp4
//! ```

pub mod assemble;
pub mod backend;
pub mod budget;
pub mod bumper;
pub mod compositor;
pub mod ffmpeg;
pub mod normalize;
pub mod output;
pub mod reclaim;

pub use assemble::AssemblyEngine;
pub use backend::*;
pub use budget::{BudgetDecision, TimelineBudget};
pub use bumper::generate_bumper;
pub use compositor::{compose, CompositionPlan};
pub use ffmpeg::{FfmpegBackend, FfmpegNode, TextStyle};
pub use normalize::{normalize_clip, NormalizedSegment, SegmentKind};
pub use output::PartialOutput;
pub use reclaim::{reclaim_temp_dir, ReclaimReport};
