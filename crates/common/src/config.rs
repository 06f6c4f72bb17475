//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ClipreelError, ClipreelResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Working and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Default compilation parameters.
    #[serde(default)]
    pub compilation: CompilationDefaults,

    /// Encoder and text-card settings.
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Filesystem locations used across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding downloaded source clips between runs.
    pub temp_dir: PathBuf,

    /// Directory that receives finished compilations.
    pub output_dir: PathBuf,

    /// File storing the monotonic compilation number.
    pub counter_file: PathBuf,
}

/// Default compilation parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilationDefaults {
    /// Target run-time in minutes.
    pub target_minutes: f64,

    /// Resolution tag (`"720p"` or `"1080p"`).
    pub resolution: String,

    /// Whether to crossfade between segments.
    pub transitions: bool,

    /// Crossfade length in seconds.
    pub transition_secs: f64,

    /// Title bumper template, e.g. `"COMPIL DU JOUR n°{X}"`.
    pub bumper_template: Option<String>,

    /// Title bumper length in seconds.
    pub bumper_secs: f64,

    /// Game name used by `{GAME_NAME}` / `{GAME_NAME_PREFIX}`.
    pub game_name: Option<String>,
}

/// Encoder settings and bumper text styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    pub video_codec: String,
    pub audio_codec: String,
    pub crf: u32,
    pub preset: String,
    pub threads: u32,

    /// Output frame rate; every segment is conformed to it before blending.
    pub fps: u32,

    pub audio_bitrate_kbps: u32,

    /// Font family name handed to the text renderer.
    pub font: String,

    /// Explicit font file, overrides `font` when set.
    #[serde(default)]
    pub font_file: Option<PathBuf>,

    pub font_size: u32,
    pub text_color: String,
    pub background_color: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipreel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("temp_clips"),
            output_dir: PathBuf::from("compilations"),
            counter_file: PathBuf::from("compilation_counter.txt"),
        }
    }
}

impl Default for CompilationDefaults {
    fn default() -> Self {
        Self {
            target_minutes: 11.0,
            resolution: "720p".to_string(),
            transitions: true,
            transition_secs: 1.0,
            bumper_template: None,
            bumper_secs: 5.0,
            game_name: None,
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            crf: 23,
            preset: "medium".to_string(),
            threads: 4,
            fps: 30,
            audio_bitrate_kbps: 192,
            font: "Arial".to_string(),
            font_file: None,
            font_size: 70,
            text_color: "white".to_string(),
            background_color: "black".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl CompilationDefaults {
    /// Target run-time in seconds.
    pub fn target_secs(&self) -> f64 {
        self.target_minutes * 60.0
    }

    /// Reject values the engine assumes were sanitized by its caller.
    pub fn validate(&self) -> ClipreelResult<()> {
        if !is_positive(self.target_minutes) {
            return Err(ClipreelError::config(format!(
                "target_minutes must be positive, got {}",
                self.target_minutes
            )));
        }
        if self.transitions && !is_positive(self.transition_secs) {
            return Err(ClipreelError::config(format!(
                "transition_secs must be positive when transitions are enabled, got {}",
                self.transition_secs
            )));
        }
        if self.bumper_template.is_some() && !is_positive(self.bumper_secs) {
            return Err(ClipreelError::config(format!(
                "bumper_secs must be positive, got {}",
                self.bumper_secs
            )));
        }
        if self.bumper_template.is_some()
            && self.transitions
            && self.bumper_secs < self.transition_secs
        {
            return Err(ClipreelError::config(format!(
                "bumper_secs ({}) must not be shorter than transition_secs ({})",
                self.bumper_secs, self.transition_secs
            )));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit file. Missing sections take defaults.
    pub fn load_from(path: &Path) -> ClipreelResult<Self> {
        if !path.exists() {
            return Err(ClipreelError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipreel").join("config.json")
}
