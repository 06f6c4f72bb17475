//! In-memory media backend for engine tests.
//!
//! Every opened clip and rendered title holds a [`Lease`]. Leases bump a
//! shared counter when dropped, so a test can check that everything the
//! engine opened was released again.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clipreel_assembly_engine::{
    EncodeSettings, Footage, MediaBackend, NormalizedSegment, ProgressCallback, SegmentKind,
};
use clipreel_common::error::{ClipreelError, ClipreelResult};
use clipreel_compilation_model::FrameSize;

#[derive(Debug, Clone, Default)]
pub struct Counters {
    opened: Arc<AtomicUsize>,
    released: Arc<AtomicUsize>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.opened() - self.released()
    }

    fn lease(&self) -> Lease {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Lease {
            released: Arc::clone(&self.released),
        }
    }
}

#[derive(Debug)]
pub struct Lease {
    released: Arc<AtomicUsize>,
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Fake media: the labels of everything blended into it, in timeline order.
#[derive(Debug)]
pub struct FakeMedia {
    pub labels: Vec<String>,
    leases: Vec<Lease>,
}

impl FakeMedia {
    fn merge(mut self, other: FakeMedia) -> Self {
        self.labels.extend(other.labels);
        self.leases.extend(other.leases);
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct FakeClip {
    size: FrameSize,
    duration_secs: f64,
    has_audio: bool,
    unreadable: bool,
}

#[derive(Debug, Clone)]
pub struct WriteRecord {
    pub output: PathBuf,
    pub labels: Vec<String>,
    pub size: FrameSize,
    pub duration_secs: f64,
    pub settings: EncodeSettings,
}

#[derive(Debug, Default)]
pub struct FakeBackend {
    clips: HashMap<PathBuf, FakeClip>,
    counters: Counters,
    pub unavailable: bool,
    pub fail_resize: HashSet<String>,
    pub fail_text: bool,
    pub fail_crossfade_at: Option<usize>,
    pub fail_write: bool,
    pub resize_calls: usize,
    pub center_calls: usize,
    pub crossfade_calls: Vec<(f64, f64)>,
    pub concat_calls: usize,
    pub writes: Vec<WriteRecord>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    /// Register a clip at `name` and return its path.
    pub fn add_clip(&mut self, name: &str, size: FrameSize, duration_secs: f64) -> PathBuf {
        let path = PathBuf::from(name);
        self.clips.insert(
            path.clone(),
            FakeClip {
                size,
                duration_secs,
                has_audio: true,
                unreadable: false,
            },
        );
        path
    }

    pub fn add_hd_clip(&mut self, name: &str, duration_secs: f64) -> PathBuf {
        self.add_clip(name, FrameSize::HD, duration_secs)
    }

    /// Register a path that exists but cannot be decoded.
    pub fn add_unreadable(&mut self, name: &str) -> PathBuf {
        let path = self.add_hd_clip(name, 10.0);
        if let Some(clip) = self.clips.get_mut(&path) {
            clip.unreadable = true;
        }
        path
    }

    /// Canonical segment built directly, bypassing the normalizer.
    pub fn segment(&mut self, label: &str, duration_secs: f64) -> NormalizedSegment<FakeMedia> {
        NormalizedSegment {
            footage: Footage::new(self.leased(label), FrameSize::HD, duration_secs, true),
            kind: SegmentKind::Clip {
                path: PathBuf::from(label),
            },
            letterboxed: false,
            source_size: FrameSize::HD,
        }
    }

    fn leased(&self, label: &str) -> FakeMedia {
        FakeMedia {
            labels: vec![label.to_string()],
            leases: vec![self.counters.lease()],
        }
    }
}

fn label_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl MediaBackend for FakeBackend {
    type Media = FakeMedia;

    fn name(&self) -> &str {
        "fake"
    }

    fn is_available(&self) -> bool {
        !self.unavailable
    }

    fn open(&mut self, path: &Path) -> ClipreelResult<Footage<FakeMedia>> {
        let clip = *self
            .clips
            .get(path)
            .ok_or_else(|| ClipreelError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        if clip.unreadable {
            return Err(ClipreelError::media("moov atom not found"));
        }
        Ok(Footage::new(
            self.leased(&label_of(path)),
            clip.size,
            clip.duration_secs,
            clip.has_audio,
        ))
    }

    fn resize_to_height(
        &mut self,
        footage: Footage<FakeMedia>,
        height: u32,
    ) -> ClipreelResult<Footage<FakeMedia>> {
        self.resize_calls += 1;
        if footage
            .media
            .labels
            .iter()
            .any(|label| self.fail_resize.contains(label))
        {
            return Err(ClipreelError::media("scaler exploded"));
        }
        let size = FrameSize::new(footage.size.width_at_height(height), height);
        Ok(Footage::new(
            footage.media,
            size,
            footage.duration_secs,
            footage.has_audio,
        ))
    }

    fn center_on_background(
        &mut self,
        footage: Footage<FakeMedia>,
        frame: FrameSize,
        duration_secs: f64,
    ) -> ClipreelResult<Footage<FakeMedia>> {
        self.center_calls += 1;
        Ok(Footage::new(footage.media, frame, duration_secs, footage.has_audio))
    }

    fn render_text(
        &mut self,
        text: &str,
        frame: FrameSize,
        duration_secs: f64,
    ) -> ClipreelResult<Footage<FakeMedia>> {
        if self.fail_text {
            return Err(ClipreelError::unsupported("no drawtext"));
        }
        Ok(Footage::new(
            self.leased(&format!("title:{text}")),
            frame,
            duration_secs,
            false,
        ))
    }

    fn crossfade(
        &mut self,
        base: Footage<FakeMedia>,
        incoming: Footage<FakeMedia>,
        start_secs: f64,
        fade_secs: f64,
    ) -> ClipreelResult<Footage<FakeMedia>> {
        self.crossfade_calls.push((start_secs, fade_secs));
        if self.fail_crossfade_at == Some(self.crossfade_calls.len()) {
            return Err(ClipreelError::media("xfade offset out of range"));
        }
        let duration_secs = start_secs + incoming.duration_secs;
        Ok(Footage::new(
            base.media.merge(incoming.media),
            base.size,
            duration_secs,
            true,
        ))
    }

    fn concatenate(&mut self, parts: Vec<Footage<FakeMedia>>) -> ClipreelResult<Footage<FakeMedia>> {
        self.concat_calls += 1;
        let size = parts.first().map(|p| p.size).unwrap_or(FrameSize::HD);
        let duration_secs = parts.iter().map(|p| p.duration_secs).sum();
        let media = parts
            .into_iter()
            .map(|p| p.media)
            .reduce(FakeMedia::merge)
            .ok_or_else(|| ClipreelError::compose("nothing to concatenate"))?;
        Ok(Footage::new(media, size, duration_secs, true))
    }

    fn write(
        &mut self,
        timeline: Footage<FakeMedia>,
        output: &Path,
        settings: &EncodeSettings,
        _progress: Option<&ProgressCallback>,
    ) -> ClipreelResult<()> {
        self.writes.push(WriteRecord {
            output: output.to_path_buf(),
            labels: timeline.media.labels.clone(),
            size: timeline.size,
            duration_secs: timeline.duration_secs,
            settings: settings.clone(),
        });
        if self.fail_write {
            std::fs::write(output, b"truncated")?;
            return Err(ClipreelError::encode("muxer failed"));
        }
        std::fs::write(output, b"fake mp4")?;
        Ok(())
    }
}
