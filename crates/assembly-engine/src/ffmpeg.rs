//! FFmpeg media backend.
//!
//! Operations do not touch media data. Each one grows a small tree of
//! [`FfmpegNode`]s; [`MediaBackend::write`] compiles the finished tree into a
//! single `-filter_complex` graph and runs one ffmpeg process for the whole
//! compilation. Probing is done with `ffprobe` as clips are opened.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use clipreel_common::config::EncoderConfig;
use clipreel_common::error::{ClipreelError, ClipreelResult};
use clipreel_compilation_model::FrameSize;
use serde::Deserialize;
use tempfile::NamedTempFile;

use crate::backend::{
    AssemblyProgress, AssemblyStage, EncodeSettings, Footage, MediaBackend, ProgressCallback,
};

const AUDIO_SAMPLE_RATE: u32 = 48_000;

/// How title cards are drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// Font family resolved through fontconfig.
    pub font: String,
    /// Explicit font file, preferred over `font` when set.
    pub font_file: Option<PathBuf>,
    pub font_size: u32,
    pub text_color: String,
    pub background_color: String,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::from(&EncoderConfig::default())
    }
}

impl From<&EncoderConfig> for TextStyle {
    fn from(config: &EncoderConfig) -> Self {
        Self {
            font: config.font.clone(),
            font_file: config.font_file.clone(),
            font_size: config.font_size,
            text_color: config.text_color.clone(),
            background_color: config.background_color.clone(),
        }
    }
}

/// A deferred ffmpeg operation.
#[derive(Debug)]
pub enum FfmpegNode {
    /// A probed input file.
    Source {
        path: PathBuf,
        has_audio: bool,
        duration_secs: f64,
    },
    /// A title card. The text lives in a temp file until the node is dropped.
    Text {
        text_file: NamedTempFile,
        size: FrameSize,
        duration_secs: f64,
    },
    Scale {
        input: Box<FfmpegNode>,
        size: FrameSize,
    },
    /// Overlay centered on an opaque black frame.
    Center {
        input: Box<FfmpegNode>,
        frame: FrameSize,
        duration_secs: f64,
    },
    Crossfade {
        base: Box<FfmpegNode>,
        incoming: Box<FfmpegNode>,
        offset_secs: f64,
        fade_secs: f64,
    },
    Concat {
        parts: Vec<FfmpegNode>,
    },
}

/// Media backend driving the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Default)]
pub struct FfmpegBackend {
    style: TextStyle,
    text_support: Option<bool>,
}

impl FfmpegBackend {
    pub fn new(style: TextStyle) -> Self {
        Self {
            style,
            text_support: None,
        }
    }

    pub fn from_config(config: &EncoderConfig) -> Self {
        Self::new(TextStyle::from(config))
    }

    pub fn style(&self) -> &TextStyle {
        &self.style
    }

    /// Whether the installed ffmpeg has the `drawtext` filter.
    pub fn supports_text(&mut self) -> bool {
        *self.text_support.get_or_insert_with(|| {
            let supported = Command::new("ffmpeg")
                .args(["-hide_banner", "-filters"])
                .output()
                .map(|output| {
                    output.status.success()
                        && String::from_utf8_lossy(&output.stdout)
                            .lines()
                            .any(|line| line.split_whitespace().nth(1) == Some("drawtext"))
                })
                .unwrap_or(false);
            tracing::debug!(supported, "Checked ffmpeg drawtext support");
            supported
        })
    }

    fn run_ffmpeg(
        &self,
        args: &[String],
        expected_duration_secs: f64,
        progress: Option<&ProgressCallback>,
    ) -> ClipreelResult<()> {
        tracing::debug!(args = ?args, "Running ffmpeg");
        let mut cmd = Command::new("ffmpeg");
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let start = std::time::Instant::now();
        let mut child = cmd
            .spawn()
            .map_err(|e| ClipreelError::encode(format!("Failed to start ffmpeg: {e}")))?;

        tracing::info!(
            pid = child.id(),
            args_len = args.len(),
            expected_duration_secs,
            "ffmpeg process started"
        );

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClipreelError::encode("Failed to capture ffmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClipreelError::encode("Failed to capture ffmpeg stderr"))?;

        // ffmpeg blocks once the stderr pipe fills up.
        let stderr_task = std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut reader = BufReader::new(stdout);
        let mut line = String::new();

        let mut latest_progress = ProgressState::default();
        let mut last_progress_secs = 0.0f64;
        let mut last_progress_wall = std::time::Instant::now();
        loop {
            line.clear();
            let bytes = reader
                .read_line(&mut line)
                .map_err(|e| ClipreelError::encode(format!("Failed reading ffmpeg progress: {e}")))?;
            if bytes == 0 {
                break;
            }

            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            latest_progress.update(key, value);
            if key != "progress" {
                continue;
            }

            if latest_progress.out_time_secs > last_progress_secs + 0.001 {
                last_progress_secs = latest_progress.out_time_secs;
                last_progress_wall = std::time::Instant::now();
            }
            if let Some(cb) = progress {
                cb(progress_report(
                    &latest_progress,
                    expected_duration_secs,
                    start.elapsed().as_secs_f64(),
                ));
            }
            if last_progress_wall.elapsed().as_secs() >= 10 {
                tracing::warn!(
                    out_time_secs = latest_progress.out_time_secs,
                    elapsed_secs = start.elapsed().as_secs_f64(),
                    "No ffmpeg progress advancement for 10s"
                );
                last_progress_wall = std::time::Instant::now();
            }
        }

        let status = child
            .wait()
            .map_err(|e| ClipreelError::encode(format!("Failed to wait on ffmpeg: {e}")))?;

        let stderr_output = stderr_task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        if !status.success() {
            return Err(ClipreelError::encode(format!(
                "ffmpeg failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        tracing::info!(
            elapsed_secs = start.elapsed().as_secs_f64(),
            "ffmpeg process finished"
        );
        Ok(())
    }
}

impl MediaBackend for FfmpegBackend {
    type Media = FfmpegNode;

    fn name(&self) -> &str {
        "ffmpeg"
    }

    fn is_available(&self) -> bool {
        command_exists("ffmpeg") && command_exists("ffprobe")
    }

    fn open(&mut self, path: &Path) -> ClipreelResult<Footage<FfmpegNode>> {
        if !path.is_file() {
            return Err(ClipreelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration:stream=codec_type,width,height,duration",
                "-of",
                "json",
            ])
            .arg(path)
            .output()
            .map_err(|e| ClipreelError::media(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ClipreelError::media(format!(
                "ffprobe failed for {}: {}",
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let info = parse_probe_output(&output.stdout)?;
        tracing::debug!(
            path = %path.display(),
            size = %info.size,
            duration_secs = info.duration_secs,
            has_audio = info.has_audio,
            "Probed clip"
        );

        Ok(Footage::new(
            FfmpegNode::Source {
                path: path.to_path_buf(),
                has_audio: info.has_audio,
                duration_secs: info.duration_secs,
            },
            info.size,
            info.duration_secs,
            info.has_audio,
        ))
    }

    fn resize_to_height(
        &mut self,
        footage: Footage<FfmpegNode>,
        height: u32,
    ) -> ClipreelResult<Footage<FfmpegNode>> {
        if height == 0 || footage.size.height == 0 {
            return Err(ClipreelError::media(format!(
                "cannot scale {} to height {height}",
                footage.size
            )));
        }
        let size = FrameSize::new(footage.size.width_at_height(height), height);
        Ok(Footage::new(
            FfmpegNode::Scale {
                input: Box::new(footage.media),
                size,
            },
            size,
            footage.duration_secs,
            footage.has_audio,
        ))
    }

    fn center_on_background(
        &mut self,
        footage: Footage<FfmpegNode>,
        frame: FrameSize,
        duration_secs: f64,
    ) -> ClipreelResult<Footage<FfmpegNode>> {
        Ok(Footage::new(
            FfmpegNode::Center {
                input: Box::new(footage.media),
                frame,
                duration_secs,
            },
            frame,
            duration_secs,
            footage.has_audio,
        ))
    }

    fn render_text(
        &mut self,
        text: &str,
        frame: FrameSize,
        duration_secs: f64,
    ) -> ClipreelResult<Footage<FfmpegNode>> {
        if !self.supports_text() {
            return Err(ClipreelError::unsupported(
                "ffmpeg was built without the drawtext filter",
            ));
        }

        let mut text_file = tempfile::Builder::new()
            .prefix("clipreel-title-")
            .suffix(".txt")
            .tempfile()?;
        text_file.write_all(text.as_bytes())?;
        text_file.flush()?;

        Ok(Footage::new(
            FfmpegNode::Text {
                text_file,
                size: frame,
                duration_secs,
            },
            frame,
            duration_secs,
            false,
        ))
    }

    fn crossfade(
        &mut self,
        base: Footage<FfmpegNode>,
        incoming: Footage<FfmpegNode>,
        start_secs: f64,
        fade_secs: f64,
    ) -> ClipreelResult<Footage<FfmpegNode>> {
        if base.size != incoming.size {
            return Err(ClipreelError::compose(format!(
                "cannot blend {} with {}",
                base.size, incoming.size
            )));
        }
        let size = base.size;
        let duration_secs = start_secs + incoming.duration_secs;
        Ok(Footage::new(
            FfmpegNode::Crossfade {
                base: Box::new(base.media),
                incoming: Box::new(incoming.media),
                offset_secs: start_secs,
                fade_secs,
            },
            size,
            duration_secs,
            true,
        ))
    }

    fn concatenate(
        &mut self,
        parts: Vec<Footage<FfmpegNode>>,
    ) -> ClipreelResult<Footage<FfmpegNode>> {
        let Some(size) = parts.first().map(|part| part.size) else {
            return Err(ClipreelError::compose("nothing to concatenate"));
        };
        if let Some(odd) = parts.iter().find(|part| part.size != size) {
            return Err(ClipreelError::compose(format!(
                "cannot concatenate {} with {size}",
                odd.size
            )));
        }
        let duration_secs = parts.iter().map(|part| part.duration_secs).sum();
        Ok(Footage::new(
            FfmpegNode::Concat {
                parts: parts.into_iter().map(|part| part.media).collect(),
            },
            size,
            duration_secs,
            true,
        ))
    }

    fn write(
        &mut self,
        timeline: Footage<FfmpegNode>,
        output: &Path,
        settings: &EncodeSettings,
        progress: Option<&ProgressCallback>,
    ) -> ClipreelResult<()> {
        let graph = compile_filter_graph(&timeline.media, settings.fps, &self.style);
        tracing::info!(
            inputs = graph.inputs.len(),
            filter_len = graph.filter.len(),
            duration_secs = timeline.duration_secs,
            output = %output.display(),
            "Encoding compilation"
        );

        if let Some(cb) = progress {
            cb(AssemblyProgress::at(AssemblyStage::Encoding, 0.0));
        }

        let args = build_ffmpeg_args(&graph, output, settings);
        self.run_ffmpeg(&args, timeline.duration_secs, progress)
    }
}

/// A filter graph ready to hand to ffmpeg.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledGraph {
    /// Files to pass with `-i`, in input-index order.
    pub inputs: Vec<PathBuf>,
    /// `-filter_complex` value.
    pub filter: String,
    pub video_label: String,
    pub audio_label: String,
}

/// Compile a node tree into one filter graph.
///
/// Every branch is normalized to the same frame rate, pixel format and
/// audio layout so that `xfade`, `acrossfade` and `concat` accept them.
pub fn compile_filter_graph(node: &FfmpegNode, fps: u32, style: &TextStyle) -> CompiledGraph {
    let mut graph = FilterGraph {
        fps: fps.max(1),
        style,
        inputs: Vec::new(),
        chains: Vec::new(),
        labels: 0,
    };
    let (video_label, audio_label) = graph.add(node);
    CompiledGraph {
        inputs: graph.inputs,
        filter: graph.chains.join(";"),
        video_label,
        audio_label,
    }
}

struct FilterGraph<'a> {
    fps: u32,
    style: &'a TextStyle,
    inputs: Vec<PathBuf>,
    chains: Vec<String>,
    labels: usize,
}

impl FilterGraph<'_> {
    fn label(&mut self, prefix: &str) -> String {
        self.labels += 1;
        format!("{prefix}{}", self.labels)
    }

    fn silence(&mut self, duration_secs: f64) -> String {
        let label = self.label("a");
        self.chains.push(format!(
            "anullsrc=r={AUDIO_SAMPLE_RATE}:cl=stereo,atrim=duration={duration_secs:.3},asetpts=PTS-STARTPTS[{label}]"
        ));
        label
    }

    /// Returns the (video, audio) output labels of `node`.
    fn add(&mut self, node: &FfmpegNode) -> (String, String) {
        match node {
            FfmpegNode::Source {
                path,
                has_audio,
                duration_secs,
            } => {
                let index = self.inputs.len();
                self.inputs.push(path.clone());

                let video = self.label("v");
                self.chains.push(format!(
                    "[{index}:v:0]trim=duration={duration_secs:.3},setpts=PTS-STARTPTS,fps={fps},format=yuv420p,setsar=1[{video}]",
                    fps = self.fps
                ));

                let audio = if *has_audio {
                    let audio = self.label("a");
                    self.chains.push(format!(
                        "[{index}:a:0]aresample={AUDIO_SAMPLE_RATE},aformat=sample_fmts=fltp:channel_layouts=stereo,apad,atrim=duration={duration_secs:.3},asetpts=PTS-STARTPTS[{audio}]"
                    ));
                    audio
                } else {
                    self.silence(*duration_secs)
                };
                (video, audio)
            }
            FfmpegNode::Text {
                text_file,
                size,
                duration_secs,
            } => {
                let video = self.label("v");
                let font = match &self.style.font_file {
                    Some(file) => format!("fontfile={}", quote_filter_value(&file.to_string_lossy())),
                    None => format!("font={}", quote_filter_value(&self.style.font)),
                };
                self.chains.push(format!(
                    "color=c={bg}:s={w}x{h}:r={fps}:d={duration_secs:.3},drawtext=textfile={text}:expansion=none:{font}:fontsize={font_size}:fontcolor={fg}:x=(w-text_w)/2:y=(h-text_h)/2,format=yuv420p,setsar=1[{video}]",
                    bg = self.style.background_color,
                    w = size.width,
                    h = size.height,
                    fps = self.fps,
                    text = quote_filter_value(&text_file.path().to_string_lossy()),
                    font_size = self.style.font_size,
                    fg = self.style.text_color,
                ));
                let audio = self.silence(*duration_secs);
                (video, audio)
            }
            FfmpegNode::Scale { input, size } => {
                let (input_video, audio) = self.add(input);
                let video = self.label("v");
                self.chains.push(format!(
                    "[{input_video}]scale={w}:{h}:flags=lanczos,setsar=1[{video}]",
                    w = size.width,
                    h = size.height,
                ));
                (video, audio)
            }
            FfmpegNode::Center {
                input,
                frame,
                duration_secs,
            } => {
                let (input_video, audio) = self.add(input);
                let background = self.label("bg");
                let video = self.label("v");
                self.chains.push(format!(
                    "color=c=black:s={w}x{h}:r={fps}:d={duration_secs:.3}[{background}]",
                    w = frame.width,
                    h = frame.height,
                    fps = self.fps,
                ));
                self.chains.push(format!(
                    "[{background}][{input_video}]overlay=x=(W-w)/2:y=(H-h)/2:shortest=1,format=yuv420p,setsar=1[{video}]"
                ));
                (video, audio)
            }
            FfmpegNode::Crossfade {
                base,
                incoming,
                offset_secs,
                fade_secs,
            } => {
                let (base_video, base_audio) = self.add(base);
                let (incoming_video, incoming_audio) = self.add(incoming);
                let video = self.label("v");
                let audio = self.label("a");
                self.chains.push(format!(
                    "[{base_video}][{incoming_video}]xfade=transition=fade:duration={fade_secs:.3}:offset={offset_secs:.3}[{video}]"
                ));
                self.chains.push(format!(
                    "[{base_audio}][{incoming_audio}]acrossfade=d={fade_secs:.3}[{audio}]"
                ));
                (video, audio)
            }
            FfmpegNode::Concat { parts } => {
                let mut pads = String::new();
                for part in parts {
                    let (video, audio) = self.add(part);
                    pads.push_str(&format!("[{video}][{audio}]"));
                }
                let video = self.label("v");
                let audio = self.label("a");
                self.chains.push(format!(
                    "{pads}concat=n={n}:v=1:a=1[{video}][{audio}]",
                    n = parts.len()
                ));
                (video, audio)
            }
        }
    }
}

/// Quote a value for use inside a filter option.
fn quote_filter_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Full ffmpeg argument list for encoding `graph` to `output`.
pub fn build_ffmpeg_args(graph: &CompiledGraph, output: &Path, settings: &EncodeSettings) -> Vec<String> {
    let mut args: Vec<String> = [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-nostats",
        "-progress",
        "pipe:1",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();

    for input in &graph.inputs {
        args.push("-i".to_string());
        args.push(input.to_string_lossy().into_owned());
    }

    args.extend([
        "-filter_complex".to_string(),
        graph.filter.clone(),
        "-map".to_string(),
        format!("[{}]", graph.video_label),
        "-map".to_string(),
        format!("[{}]", graph.audio_label),
        "-r".to_string(),
        settings.fps.to_string(),
    ]);
    args.extend(codec_args_for_settings(settings));
    args.push(output.to_string_lossy().into_owned());
    args
}

fn codec_args_for_settings(settings: &EncodeSettings) -> Vec<String> {
    vec![
        "-c:v".to_string(),
        settings.video_codec.clone(),
        "-preset".to_string(),
        settings.preset.clone(),
        "-crf".to_string(),
        settings.crf.to_string(),
        "-pix_fmt".to_string(),
        settings.pixel_format.clone(),
        "-threads".to_string(),
        settings.threads.to_string(),
        "-c:a".to_string(),
        settings.audio_codec.clone(),
        "-b:a".to_string(),
        format!("{}k", settings.audio_bitrate_kbps),
        "-movflags".to_string(),
        "+faststart".to_string(),
    ]
}

fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// What the engine needs from an ffprobe run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub size: FrameSize,
    /// Zero when ffprobe could not tell.
    pub duration_secs: f64,
    pub has_audio: bool,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<ProbeFormat>,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Parse `ffprobe -of json` output.
pub fn parse_probe_output(raw: &[u8]) -> ClipreelResult<ProbeInfo> {
    let probe: ProbeOutput = serde_json::from_slice(raw)
        .map_err(|e| ClipreelError::media(format!("Failed to parse ffprobe output: {e}")))?;

    let video = probe
        .streams
        .iter()
        .find(|stream| stream.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ClipreelError::media("no video stream"))?;

    let (width, height) = match (video.width, video.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(ClipreelError::media("video stream has no dimensions")),
    };

    let duration_secs = probe
        .format
        .as_ref()
        .and_then(|format| format.duration.as_deref())
        .or(video.duration.as_deref())
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|secs| secs.is_finite())
        .unwrap_or(0.0);

    let has_audio = probe
        .streams
        .iter()
        .any(|stream| stream.codec_type.as_deref() == Some("audio"));

    Ok(ProbeInfo {
        size: FrameSize::new(width, height),
        duration_secs,
        has_audio,
    })
}

#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // Despite the name, ffmpeg reports out_time_ms in microseconds.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = us / 1_000_000.0;
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }
}

fn progress_report(
    state: &ProgressState,
    expected_duration_secs: f64,
    elapsed_secs: f64,
) -> AssemblyProgress {
    let progress = if expected_duration_secs <= 0.0 {
        0.0
    } else {
        (state.out_time_secs / expected_duration_secs).clamp(0.0, 1.0)
    };

    let eta_secs = if progress > 0.0 {
        (elapsed_secs / progress) - elapsed_secs
    } else {
        0.0
    }
    .max(0.0);

    AssemblyProgress {
        stage: AssemblyStage::Encoding,
        progress: if state.complete { 1.0 } else { progress },
        eta_secs: if state.complete { 0.0 } else { eta_secs },
    }
}
