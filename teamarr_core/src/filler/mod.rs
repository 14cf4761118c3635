//! Filler generation.
//!
//! Synthesized pregame/postgame/idle programmes occupy the time between
//! games. Chunks align to the four 6-hour time blocks (00/06/12/18 in
//! the user's zone); a chunk ends at the next block boundary or the next
//! hard stop, whichever is earlier.

use serde::{Deserialize, Serialize};

pub mod generator;
pub mod time_blocks;

pub use generator::{FillerGenerator, FillerInputs, GameSpan};

/// Maximum chunk length; fixed by time-block alignment.
pub const MAX_CHUNK_HOURS: f64 = 6.0;

/// What to fill with when a game crosses midnight and the next day has
/// no games of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MidnightCrossoverMode {
    Postgame,
    #[default]
    Idle,
}

impl MidnightCrossoverMode {
    pub fn parse(s: &str) -> Self {
        match s {
            "postgame" => MidnightCrossoverMode::Postgame,
            _ => MidnightCrossoverMode::Idle,
        }
    }
}

/// One filler template: the strings resolved per chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FillerTemplate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub art_url: Option<String>,
}

/// Final/not-final override pair keyed on the last game's status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ConditionalFillerTemplate {
    #[serde(default)]
    pub final_template: Option<FillerTemplate>,
    #[serde(default)]
    pub not_final_template: Option<FillerTemplate>,
}

/// Complete per-team filler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FillerTemplates {
    #[serde(default)]
    pub pregame: FillerTemplate,
    #[serde(default)]
    pub postgame: FillerTemplate,
    #[serde(default)]
    pub idle: FillerTemplate,
    /// Idle override when no next game exists in the 30-day lookahead.
    #[serde(default)]
    pub idle_offseason: Option<FillerTemplate>,
    /// Idle override keyed on the last completed game.
    #[serde(default)]
    pub idle_conditional: Option<ConditionalFillerTemplate>,
    /// Postgame override keyed on the just-completed game.
    #[serde(default)]
    pub postgame_conditional: Option<ConditionalFillerTemplate>,
}

/// Days of lookahead beyond which idle filler switches to the offseason
/// template.
pub const OFFSEASON_LOOKAHEAD_DAYS: i64 = 30;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midnight_mode_parse() {
        assert_eq!(
            MidnightCrossoverMode::parse("postgame"),
            MidnightCrossoverMode::Postgame
        );
        assert_eq!(MidnightCrossoverMode::parse("idle"), MidnightCrossoverMode::Idle);
        assert_eq!(
            MidnightCrossoverMode::parse("junk"),
            MidnightCrossoverMode::Idle
        );
    }

    #[test]
    fn test_filler_templates_deserialize_partial() {
        let parsed: FillerTemplates = serde_json::from_str(
            r#"{"pregame": {"title": "{team_name} Pregame"}}"#,
        )
        .unwrap();
        assert_eq!(parsed.pregame.title, "{team_name} Pregame");
        assert!(parsed.idle_offseason.is_none());
    }
}
