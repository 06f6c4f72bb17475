//! Output resolution types.

use serde::{Deserialize, Serialize};

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const HD: FrameSize = FrameSize {
        width: 1280,
        height: 720,
    };

    pub const FULL_HD: FrameSize = FrameSize {
        width: 1920,
        height: 1080,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width after scaling this frame to `target_height`, aspect preserved.
    ///
    /// Rounds to the nearest pixel and never returns zero.
    pub fn width_at_height(&self, target_height: u32) -> u32 {
        if self.height == 0 {
            return 0;
        }
        let scaled = self.width as f64 * target_height as f64 / self.height as f64;
        (scaled.round() as u32).max(1)
    }
}

impl std::fmt::Display for FrameSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Supported output resolution tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    FullHd1080,
}

impl Resolution {
    /// Parse a resolution tag.
    ///
    /// Unknown tags fall back to 720p with a warning.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "1080p" => Resolution::FullHd1080,
            "720p" => Resolution::Hd720,
            other => {
                tracing::warn!(tag = other, "Unknown resolution tag, defaulting to 720p");
                Resolution::Hd720
            }
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Resolution::Hd720 => "720p",
            Resolution::FullHd1080 => "1080p",
        }
    }

    pub fn frame_size(&self) -> FrameSize {
        match self {
            Resolution::Hd720 => FrameSize::HD,
            Resolution::FullHd1080 => FrameSize::FULL_HD,
        }
    }
}
