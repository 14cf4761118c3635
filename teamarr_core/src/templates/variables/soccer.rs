//! Soccer multi-competition variables.
//!
//! A multi-competition team's games come from several leagues; these
//! variables surface which competition a specific game belongs to, as
//! opposed to the team-level `{league}` which names the configured
//! primary league.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use super::event_of;
use crate::league_config;

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "soccer_match_league",
        Category::Soccer,
        SuffixRules::All,
        |_, game_ctx| {
            event_of(game_ctx)
                .map(|e| {
                    league_config::get_league_config(&e.event.league)
                        .map(|c| c.display_name.to_string())
                        .unwrap_or_else(|| e.event.league.clone())
                })
                .unwrap_or_default()
        },
        "Competition this game belongs to ('UEFA Champions League')",
        &[("Soccer", "UEFA Champions League")],
    );
    registry.register(
        "soccer_match_league_code",
        Category::Soccer,
        SuffixRules::All,
        |_, game_ctx| {
            event_of(game_ctx)
                .map(|e| e.event.league.clone())
                .unwrap_or_default()
        },
        "Competition slug of this game ('uefa.champions')",
        &[("Soccer", "uefa.champions")],
    );
    registry.register(
        "soccer_primary_league",
        Category::Soccer,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_config
                .soccer_primary_league
                .clone()
                .map(|league| {
                    league_config::get_league_config(&league)
                        .map(|c| c.display_name.to_string())
                        .unwrap_or(league)
                })
                .unwrap_or_default()
        },
        "Configured primary competition ('Premier League')",
        &[("Soccer", "Premier League")],
    );
    registry.register(
        "is_cup_match",
        Category::Soccer,
        SuffixRules::All,
        |ctx, game_ctx| {
            let Some(event) = event_of(game_ctx) else {
                return String::new();
            };
            let primary = ctx
                .team_config
                .soccer_primary_league
                .as_deref()
                .unwrap_or(&ctx.team_config.league);
            let is_cup = !event.event.league.is_empty() && event.event.league != primary;
            if is_cup { "true" } else { "false" }.to_string()
        },
        "'true' when the game is outside the primary league",
        &[("Soccer", "true")],
    );
}
