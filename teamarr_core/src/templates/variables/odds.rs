//! Betting-odds variables.
//!
//! Odds come from scoreboard enrichment and only exist for today's and
//! upcoming games, so the whole category is `BaseNextOnly`: `{odds_spread}`
//! and `{odds_spread.next}` resolve, `{odds_spread.last}` never does.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use crate::types::GameContext;

fn enriched(game_ctx: Option<&GameContext>) -> Option<&crate::types::EnrichedEvent> {
    game_ctx.map(|g| &g.event).filter(|e| e.has_odds)
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "has_odds",
        Category::Odds,
        SuffixRules::BaseNextOnly,
        |_, game_ctx| {
            let has = enriched(game_ctx).is_some();
            if has { "true" } else { "false" }.to_string()
        },
        "'true' when betting odds are available",
        &[("NBA", "true")],
    );
    registry.register(
        "odds_spread",
        Category::Odds,
        SuffixRules::BaseNextOnly,
        |_, game_ctx| {
            enriched(game_ctx)
                .and_then(|e| e.odds_spread.clone())
                .unwrap_or_default()
        },
        "Point spread line ('CHI -3.5')",
        &[("NBA", "CHI -3.5")],
    );
    registry.register(
        "odds_favorite",
        Category::Odds,
        SuffixRules::BaseNextOnly,
        |_, game_ctx| {
            enriched(game_ctx)
                .and_then(|e| e.odds_favorite.clone())
                .unwrap_or_default()
        },
        "Favored team abbreviation",
        &[("NBA", "CHI")],
    );
    registry.register(
        "odds_over_under",
        Category::Odds,
        SuffixRules::BaseNextOnly,
        |_, game_ctx| {
            enriched(game_ctx)
                .and_then(|e| e.odds_over_under.clone())
                .unwrap_or_default()
        },
        "Over/under total",
        &[("NBA", "221.5")],
    );
    registry.register(
        "odds_summary",
        Category::Odds,
        SuffixRules::BaseNextOnly,
        |_, game_ctx| {
            let Some(event) = enriched(game_ctx) else {
                return String::new();
            };
            match (&event.odds_spread, &event.odds_over_under) {
                (Some(spread), Some(total)) => format!("{spread} (O/U {total})"),
                (Some(spread), None) => spread.clone(),
                (None, Some(total)) => format!("O/U {total}"),
                (None, None) => String::new(),
            }
        },
        "Spread and total together ('CHI -3.5 (O/U 221.5)')",
        &[("NBA", "CHI -3.5 (O/U 221.5)")],
    );
}
