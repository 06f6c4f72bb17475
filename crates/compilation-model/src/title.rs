//! Title bumper templates.
//!
//! A template is free text with placeholders:
//! - `{X}`: the compilation number
//! - `{GAME_NAME}`: the game name as given
//! - `{GAME_NAME_PREFIX}`: the upper-cased game name followed by a space

use serde::{Deserialize, Serialize};

pub const NUMBER_TOKEN: &str = "{X}";
pub const GAME_NAME_TOKEN: &str = "{GAME_NAME}";
pub const GAME_NAME_PREFIX_TOKEN: &str = "{GAME_NAME_PREFIX}";

/// Errors raised while building a bumper spec.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BumperSpecError {
    #[error("bumper duration must be positive, got {0}")]
    InvalidDuration(f64),

    #[error("bumper text is empty after substitution")]
    EmptyText,
}

/// A fully substituted title card, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BumperSpec {
    text: String,
    duration_secs: f64,
}

impl BumperSpec {
    pub fn new(text: impl Into<String>, duration_secs: f64) -> Result<Self, BumperSpecError> {
        if !(duration_secs.is_finite() && duration_secs > 0.0) {
            return Err(BumperSpecError::InvalidDuration(duration_secs));
        }
        let text = text.into();
        if text.trim().is_empty() {
            return Err(BumperSpecError::EmptyText);
        }
        Ok(Self {
            text,
            duration_secs,
        })
    }

    /// Substitute `template` and build the spec in one step.
    pub fn from_template(
        template: &str,
        number: u64,
        game_name: Option<&str>,
        duration_secs: f64,
    ) -> Result<Self, BumperSpecError> {
        Self::new(substitute_title(template, number, game_name), duration_secs)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
}

/// Apply placeholder substitution to a bumper template.
///
/// `{GAME_NAME}` takes precedence over `{GAME_NAME_PREFIX}`; only one of the
/// two is handled per template. When no game name is available the token is
/// dropped (for `{GAME_NAME}` together with a newline directly before it).
/// Double spaces left behind are collapsed and the result is trimmed.
pub fn substitute_title(template: &str, number: u64, game_name: Option<&str>) -> String {
    let game = game_name.map(str::trim).filter(|name| !name.is_empty());
    let mut text = template.replace(NUMBER_TOKEN, &number.to_string());

    if text.contains(GAME_NAME_TOKEN) {
        text = match game {
            Some(name) => text.replace(GAME_NAME_TOKEN, name),
            None => text
                .replace(&format!("\n{GAME_NAME_TOKEN}"), "")
                .replace(GAME_NAME_TOKEN, ""),
        };
    } else if text.contains(GAME_NAME_PREFIX_TOKEN) {
        let prefix = game
            .map(|name| format!("{} ", name.to_uppercase()))
            .unwrap_or_default();
        text = text.replace(GAME_NAME_PREFIX_TOKEN, &prefix);
    }

    while text.contains("  ") {
        text = text.replace("  ", " ");
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_only() {
        assert_eq!(
            substitute_title("COMPIL DU JOUR n°{X}", 7, None),
            "COMPIL DU JOUR n°7"
        );
        assert_eq!(substitute_title("Highlights #{X}", 3, None), "Highlights #3");
    }

    #[test]
    fn test_game_name_prefix() {
        assert_eq!(
            substitute_title("{GAME_NAME_PREFIX}Highlights #{X}", 3, Some("Valorant")),
            "VALORANT Highlights #3"
        );
        assert_eq!(
            substitute_title("{GAME_NAME_PREFIX}Highlights #{X}", 3, None),
            "Highlights #3"
        );
    }

    #[test]
    fn test_game_name_with_and_without_value() {
        assert_eq!(
            substitute_title("Best of {GAME_NAME} #{X}", 12, Some("Minecraft")),
            "Best of Minecraft #12"
        );
        assert_eq!(
            substitute_title("Best of {GAME_NAME} #{X}", 12, None),
            "Best of #12"
        );
    }

    #[test]
    fn test_missing_game_name_drops_preceding_newline() {
        assert_eq!(
            substitute_title("COMPILATION #{X}\n{GAME_NAME}", 4, None),
            "COMPILATION #4"
        );
        assert_eq!(
            substitute_title("COMPILATION #{X}\n{GAME_NAME}", 4, Some("Rust")),
            "COMPILATION #4\nRust"
        );
    }

    #[test]
    fn test_blank_game_name_counts_as_missing() {
        assert_eq!(
            substitute_title("{GAME_NAME_PREFIX}Clips {X}", 1, Some("  ")),
            "Clips 1"
        );
    }

    #[test]
    fn test_game_name_wins_over_prefix() {
        assert_eq!(
            substitute_title("{GAME_NAME} {GAME_NAME_PREFIX}#{X}", 2, Some("Dota")),
            "Dota {GAME_NAME_PREFIX}#2"
        );
    }

    #[test]
    fn test_bumper_spec_validation() {
        assert_eq!(
            BumperSpec::new("Title", 0.0),
            Err(BumperSpecError::InvalidDuration(0.0))
        );
        assert_eq!(
            BumperSpec::from_template("{GAME_NAME}", 1, None, 5.0),
            Err(BumperSpecError::EmptyText)
        );
        let spec = BumperSpec::from_template("Highlights #{X}", 9, None, 5.0).unwrap();
        assert_eq!(spec.text(), "Highlights #9");
        assert_eq!(spec.duration_secs(), 5.0);
    }
}
