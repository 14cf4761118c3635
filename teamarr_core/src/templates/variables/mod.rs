//! Template variable definitions, grouped by category.
//!
//! Each module registers its variables into the shared registry. All
//! extractors degrade to an empty string on missing data; resolution
//! never fails.

use super::registry::VariableRegistry;
use crate::types::{GameContext, TemplateContext};
use crate::tz::DisplaySettings;

pub(crate) mod broadcast;
mod datetime;
mod identity;
mod leaders;
mod odds;
mod rankings;
mod records;
mod scores;
mod soccer;
mod standings;
mod streaks;
mod venue;

/// Register every variable into the registry.
pub fn register_all(registry: &mut VariableRegistry) {
    identity::register(registry);
    datetime::register(registry);
    venue::register(registry);
    records::register(registry);
    streaks::register(registry);
    scores::register(registry);
    standings::register(registry);
    rankings::register(registry);
    odds::register(registry);
    broadcast::register(registry);
    soccer::register(registry);
    leaders::register(registry);
}

/// Display settings derived from the context's user preferences.
pub(crate) fn display_settings(ctx: &TemplateContext) -> DisplaySettings {
    DisplaySettings::new(&ctx.epg_timezone, ctx.time_format, ctx.show_timezone)
}

/// Shorthand: the event inside a game context, when present.
pub(crate) fn event_of<'a>(
    game_ctx: Option<&'a GameContext>,
) -> Option<&'a crate::types::EnrichedEvent> {
    game_ctx.map(|g| &g.event)
}

/// Format an integer rank as an ordinal ("1st", "2nd", "11th").
pub(crate) fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// Win percentage in the league's ".750" style. Ties count half a win.
pub(crate) fn win_pct(wins: i32, losses: i32, ties: i32) -> String {
    let total = wins + losses + ties;
    if total <= 0 {
        return ".000".to_string();
    }
    let pct = (f64::from(wins) + f64::from(ties) * 0.5) / f64::from(total);
    format!(".{:03}", (pct * 1000.0).round() as u32)
}

/// Parse "5-2" / "3-1-1" into (wins, losses, ties). Soccer middle digit
/// is draws.
pub(crate) fn parse_record(record: &str) -> (i32, i32, i32) {
    let parts: Vec<i32> = record
        .split('-')
        .map(|p| p.trim().parse().unwrap_or(0))
        .collect();
    match parts.len() {
        2 => (parts[0], parts[1], 0),
        3 => (parts[0], parts[2], parts[1]),
        _ => (0, 0, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal() {
        assert_eq!(ordinal(1), "1st");
        assert_eq!(ordinal(2), "2nd");
        assert_eq!(ordinal(3), "3rd");
        assert_eq!(ordinal(4), "4th");
        assert_eq!(ordinal(11), "11th");
        assert_eq!(ordinal(12), "12th");
        assert_eq!(ordinal(13), "13th");
        assert_eq!(ordinal(21), "21st");
    }

    #[test]
    fn test_win_pct() {
        assert_eq!(win_pct(3, 1, 0), ".750");
        assert_eq!(win_pct(0, 0, 0), ".000");
        assert_eq!(win_pct(1, 1, 2), ".500");
    }

    #[test]
    fn test_parse_record() {
        assert_eq!(parse_record("10-2"), (10, 2, 0));
        assert_eq!(parse_record("8-3-1"), (8, 1, 3));
        assert_eq!(parse_record("junk"), (0, 0, 0));
    }
}
