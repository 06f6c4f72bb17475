//! Error types shared across Clipreel crates.

use std::path::PathBuf;

/// Top-level error type for Clipreel operations.
#[derive(Debug, thiserror::Error)]
pub enum ClipreelError {
    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Normalization error: {message}")]
    Normalize { message: String },

    #[error("Bumper error: {message}")]
    Bumper { message: String },

    #[error("Composition error: {message}")]
    Compose { message: String },

    #[error("Encode error: {message}")]
    Encode { message: String },

    #[error("No usable clips: {skipped} of {offered} offered clip(s) were skipped")]
    NoUsableClips { offered: usize, skipped: usize },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type alias using ClipreelError.
pub type ClipreelResult<T> = Result<T, ClipreelError>;

impl ClipreelError {
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn normalize(msg: impl Into<String>) -> Self {
        Self::Normalize {
            message: msg.into(),
        }
    }

    pub fn bumper(msg: impl Into<String>) -> Self {
        Self::Bumper {
            message: msg.into(),
        }
    }

    pub fn compose(msg: impl Into<String>) -> Self {
        Self::Compose {
            message: msg.into(),
        }
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error ends a whole assembly run.
    ///
    /// Per-clip problems (unreadable media, failed normalization, a bumper
    /// that could not be drawn) are absorbed by the engine; everything else
    /// means no video was produced.
    pub fn is_run_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Media { .. }
                | Self::Normalize { .. }
                | Self::Bumper { .. }
                | Self::FileNotFound { .. }
        )
    }
}
