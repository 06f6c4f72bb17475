//! Assemble a compilation from local clips.

use std::path::{Path, PathBuf};

use clipreel_assembly_engine::{
    reclaim_temp_dir, AssemblyEngine, AssemblyProgress, AssemblyStage, EncodeSettings,
    FfmpegBackend, ProgressCallback,
};
use clipreel_common::config::AppConfig;
use clipreel_common::counter::CompilationCounter;
use clipreel_common::error::{ClipreelError, ClipreelResult};
use clipreel_compilation_model::{
    sanitize_filename, BumperSpec, CompilationArtifact, CompilationRequest, Resolution,
    TransitionPolicy,
};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm"];

#[derive(Debug, clap::Args)]
pub struct AssembleArgs {
    /// Clip files, highest priority first
    pub clips: Vec<PathBuf>,

    /// Also take every video in this directory, sorted by name
    #[arg(long)]
    pub clips_dir: Option<PathBuf>,

    /// Output file name inside the output directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Target length in minutes
    #[arg(long)]
    pub target_minutes: Option<f64>,

    /// Output resolution: 720p or 1080p
    #[arg(long)]
    pub resolution: Option<String>,

    /// Use hard cuts instead of crossfades
    #[arg(long)]
    pub no_transitions: bool,

    /// Crossfade length in seconds
    #[arg(long)]
    pub transition_secs: Option<f64>,

    /// Title bumper template, e.g. "{GAME_NAME_PREFIX}Highlights #{X}"
    #[arg(long)]
    pub bumper: Option<String>,

    /// Title bumper length in seconds
    #[arg(long)]
    pub bumper_secs: Option<f64>,

    /// Game name for the title bumper
    #[arg(long)]
    pub game: Option<String>,

    /// Delete files in the temp clip directory afterwards
    #[arg(long)]
    pub cleanup: bool,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(config: AppConfig, args: AssembleArgs) -> anyhow::Result<()> {
    let mut settings = config.compilation.clone();
    if let Some(minutes) = args.target_minutes {
        settings.target_minutes = minutes;
    }
    if let Some(resolution) = &args.resolution {
        settings.resolution = resolution.clone();
    }
    if args.no_transitions {
        settings.transitions = false;
    }
    if let Some(secs) = args.transition_secs {
        settings.transition_secs = secs;
    }
    if let Some(template) = &args.bumper {
        settings.bumper_template = Some(template.clone());
    }
    if let Some(secs) = args.bumper_secs {
        settings.bumper_secs = secs;
    }
    if let Some(game) = &args.game {
        settings.game_name = Some(game.clone());
    }
    settings
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid compilation settings: {e}"))?;

    let clips = collect_clips(&args.clips, args.clips_dir.as_deref(), &config.paths.temp_dir)?;

    let counter = CompilationCounter::new(&config.paths.counter_file);
    let number = counter.current() + 1;

    let bumper = settings.bumper_template.as_deref().and_then(|template| {
        match BumperSpec::from_template(
            template,
            number,
            settings.game_name.as_deref(),
            settings.bumper_secs,
        ) {
            Ok(spec) => Some(spec),
            Err(e) => {
                tracing::warn!(error = %e, template, "Ignoring title bumper");
                None
            }
        }
    });

    let file_name = output_file_name(args.output.as_deref(), bumper.as_ref(), number);
    let request = CompilationRequest::new(clips, config.paths.output_dir.join(file_name))
        .with_target_minutes(settings.target_minutes)
        .with_resolution(Resolution::from_tag(&settings.resolution))
        .with_transition(TransitionPolicy::from_flag(
            settings.transitions,
            settings.transition_secs,
        ))
        .with_bumper(bumper);

    println!("Assembling compilation #{number}");
    println!("  Clips: {}", request.clips.len());
    println!("  Target: {:.1} min", settings.target_minutes);
    println!("  Resolution: {}", request.frame_size());
    match request.transition {
        TransitionPolicy::Crossfade { duration_secs } => {
            println!("  Transitions: crossfade {duration_secs:.1}s")
        }
        TransitionPolicy::None => println!("  Transitions: none"),
    }
    if let Some(bumper) = &request.bumper {
        println!("  Title: {:?}", bumper.text());
    }
    println!("  Output: {}", request.output_path.display());

    let progress_cb: ProgressCallback = Box::new(|p: AssemblyProgress| {
        if p.stage == AssemblyStage::Encoding {
            print!(
                "\r  Encoding: {:.1}% (ETA: {:.0}s)  ",
                p.progress * 100.0,
                p.eta_secs
            );
        }
    });

    let encoder = config.encoder.clone();
    let result = tokio::task::spawn_blocking(move || {
        let backend = FfmpegBackend::from_config(&encoder);
        let mut engine = AssemblyEngine::new(backend, EncodeSettings::from(&encoder));
        engine.assemble(&request, Some(progress_cb))
    })
    .await
    .map_err(|e| anyhow::anyhow!("Assembly task failed: {e}"))?;
    println!();

    let cleanup_dir = args.cleanup.then_some(config.paths.temp_dir.as_path());
    let artifact = finish_run(result, &counter, cleanup_dir)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&artifact)?);
        return Ok(());
    }

    println!(
        "Compilation complete: {} ({:.1}s, {} clip(s){})",
        artifact.output_path.display(),
        artifact.duration_secs,
        artifact.clip_count(),
        if artifact.has_bumper { " + title" } else { "" }
    );
    for skipped in &artifact.skipped {
        println!(
            "  skipped {} ({:?}): {}",
            skipped.path.display(),
            skipped.reason,
            skipped.detail
        );
    }
    Ok(())
}

/// Settle a finished engine run. The counter and the temp clips are only
/// touched when a compilation was produced.
fn finish_run(
    result: ClipreelResult<CompilationArtifact>,
    counter: &CompilationCounter,
    cleanup_dir: Option<&Path>,
) -> anyhow::Result<CompilationArtifact> {
    let artifact = result.map_err(|e| anyhow::anyhow!("Compilation failed: {e}"))?;
    counter.increment();

    if let Some(dir) = cleanup_dir {
        let report = reclaim_temp_dir(dir);
        println!(
            "Cleanup: {} deleted, {} failed{}",
            report.deleted,
            report.failed,
            if report.missing { " (directory missing)" } else { "" }
        );
    }
    Ok(artifact)
}

/// Explicit clips first, then videos found in `clips_dir`. With neither,
/// the temp clip directory is used.
fn collect_clips(
    explicit: &[PathBuf],
    clips_dir: Option<&Path>,
    temp_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let mut clips = explicit.to_vec();
    let dir = match clips_dir {
        Some(dir) => Some(dir),
        None if explicit.is_empty() => Some(temp_dir),
        None => None,
    };

    if let Some(dir) = dir {
        let entries = std::fs::read_dir(dir)
            .map_err(|e| anyhow::anyhow!("Failed to read clip directory {}: {e}", dir.display()))?;
        let mut found: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_video(path))
            .collect();
        found.sort();
        clips.extend(found);
    }

    Ok(clips)
}

fn is_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Only a user-supplied name may keep its own extension, and only a video one.
fn output_file_name(requested: Option<&str>, bumper: Option<&BumperSpec>, number: u64) -> String {
    let name = match (requested, bumper) {
        (Some(name), _) => {
            let name = sanitize_filename(name);
            if is_video(Path::new(&name)) {
                return name;
            }
            name
        }
        (None, Some(spec)) => {
            sanitize_filename(&spec.text().split_whitespace().collect::<Vec<_>>().join(" "))
        }
        (None, None) => format!("compilation_{number}"),
    };
    format!("{name}.mp4")
}
