//! Check system capabilities.

use clipreel_assembly_engine::{FfmpegBackend, MediaBackend};
use clipreel_common::config::AppConfig;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("Clipreel System Check");
    println!("{}", "=".repeat(50));

    let mut backend = FfmpegBackend::from_config(&config.encoder);
    let available = backend.is_available();
    if available {
        println!("[OK] ffmpeg and ffprobe found in PATH");
    } else {
        println!("[FAIL] ffmpeg/ffprobe not found in PATH");
    }

    let text = available && backend.supports_text();
    if text {
        println!("[OK] drawtext filter available (title bumpers)");
    } else {
        println!("[WARN] drawtext filter missing, compilations will have no title bumper");
    }

    let style = backend.style();
    match &style.font_file {
        Some(path) if path.is_file() => println!("[OK] Font file: {}", path.display()),
        Some(path) => println!("[WARN] Font file not found: {}", path.display()),
        None => println!("[OK] Font: {} ({}pt)", style.font, style.font_size),
    }

    let temp_dir = &config.paths.temp_dir;
    if temp_dir.is_dir() {
        println!("[OK] Temp clip directory: {}", temp_dir.display());
    } else {
        println!("[WARN] Temp clip directory missing: {}", temp_dir.display());
    }

    println!();
    if available {
        println!("Clipreel is ready.");
        Ok(())
    } else {
        anyhow::bail!("ffmpeg is required to assemble compilations")
    }
}
