//! Identity variables: team names, opponents, league labels.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use super::event_of;
use crate::league_config;
use crate::types::{GameContext, TemplateContext};

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "team_name",
        Category::Identity,
        SuffixRules::BaseOnly,
        |ctx, _| ctx.team_config.team_name.clone(),
        "Configured team's full name",
        &[("NBA", "Detroit Pistons"), ("Soccer", "Liverpool")],
    );
    registry.register(
        "team_abbrev",
        Category::Identity,
        SuffixRules::BaseOnly,
        |ctx, _| ctx.team_config.team_abbrev.clone(),
        "Configured team's abbreviation",
        &[("NBA", "DET"), ("NFL", "KC")],
    );
    registry.register(
        "team_short_name",
        Category::Identity,
        SuffixRules::BaseOnly,
        |ctx, game_ctx| {
            game_ctx
                .map(|g| g.team.short_name.clone())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| ctx.team_config.team_name.clone())
        },
        "Configured team's short name",
        &[("NBA", "Pistons")],
    );
    registry.register(
        "league",
        Category::Identity,
        SuffixRules::BaseOnly,
        |ctx, _| {
            league_config::get_league_config(&ctx.team_config.league)
                .map(|c| c.display_name.to_string())
                .unwrap_or_else(|| ctx.team_config.league.to_uppercase())
        },
        "League display name",
        &[("NBA", "NBA"), ("Soccer", "Premier League")],
    );
    registry.register(
        "sport",
        Category::Identity,
        SuffixRules::BaseOnly,
        |ctx, _| ctx.team_config.sport.clone(),
        "Sport slug",
        &[("NBA", "basketball")],
    );
    registry.register(
        "opponent",
        Category::Identity,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx.map(|g| g.opponent.name.clone()).unwrap_or_default()
        },
        "Opponent team name",
        &[("NBA", "Chicago Bulls"), ("NFL", "Chicago Bears")],
    );
    registry.register(
        "opponent_short_name",
        Category::Identity,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .map(|g| g.opponent.short_name.clone())
                .unwrap_or_default()
        },
        "Opponent short name",
        &[("NBA", "Bulls")],
    );
    registry.register(
        "opponent_abbrev",
        Category::Identity,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .map(|g| g.opponent.abbreviation.clone())
                .unwrap_or_default()
        },
        "Opponent abbreviation",
        &[("NBA", "CHI")],
    );
    registry.register(
        "matchup",
        Category::Identity,
        SuffixRules::All,
        extract_matchup,
        "Full matchup line ('Pistons vs Bulls' / 'Pistons @ Bulls')",
        &[("NBA", "Detroit Pistons vs Chicago Bulls")],
    );
    registry.register(
        "matchup_short",
        Category::Identity,
        SuffixRules::All,
        |_, game_ctx| {
            event_of(game_ctx)
                .map(|e| e.event.short_name.clone())
                .unwrap_or_default()
        },
        "Provider short matchup ('DET @ CHI')",
        &[("NBA", "DET @ CHI")],
    );
    registry.register(
        "home_team_name",
        Category::Identity,
        SuffixRules::All,
        |_, game_ctx| {
            event_of(game_ctx)
                .map(|e| e.event.home_team.name.clone())
                .unwrap_or_default()
        },
        "Home team of the game",
        &[("NBA", "Chicago Bulls")],
    );
    registry.register(
        "away_team_name",
        Category::Identity,
        SuffixRules::All,
        |_, game_ctx| {
            event_of(game_ctx)
                .map(|e| e.event.away_team.name.clone())
                .unwrap_or_default()
        },
        "Away team of the game",
        &[("NBA", "Detroit Pistons")],
    );
    registry.register(
        "event_name",
        Category::Identity,
        SuffixRules::All,
        |_, game_ctx| {
            event_of(game_ctx)
                .map(|e| e.event.name.clone())
                .unwrap_or_default()
        },
        "Provider event name (tournament titles included)",
        &[("Racing", "Daytona 500")],
    );
    registry.register(
        "team_logo",
        Category::Identity,
        SuffixRules::BaseOnly,
        |ctx, game_ctx| {
            ctx.team_config
                .logo_url
                .clone()
                .or_else(|| game_ctx.and_then(|g| g.team.logo_url.clone()))
                .unwrap_or_default()
        },
        "Configured team's logo URL",
        &[],
    );
    registry.register(
        "opponent_logo",
        Category::Identity,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.opponent.logo_url.clone())
                .unwrap_or_default()
        },
        "Opponent's logo URL",
        &[],
    );
    registry.register(
        "head_coach",
        Category::Identity,
        SuffixRules::BaseOnly,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.head_coach.clone())
                .unwrap_or_default()
        },
        "Configured team's head coach",
        &[("NBA", "Steve Kerr")],
    );
}

fn extract_matchup(ctx: &TemplateContext, game_ctx: Option<&GameContext>) -> String {
    let Some(game) = game_ctx else {
        return String::new();
    };
    if game.event.event.is_tournament() {
        return game.event.event.name.clone();
    }
    let team = &ctx.team_config.team_name;
    let sep = if game.is_home { "vs" } else { "@" };
    format!("{} {} {}", team, sep, game.opponent.name)
}
