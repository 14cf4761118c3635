//! Standings, statistics, and conference/division variables.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use super::ordinal;
use crate::types::TeamStats;

fn fmt_games_back(gb: f64) -> String {
    if (gb - gb.trunc()).abs() < f64::EPSILON {
        format!("{}", gb as i64)
    } else {
        format!("{gb:.1}")
    }
}

fn fmt_avg(v: f64) -> String {
    format!("{v:.1}")
}

fn opponent_stats<'a>(
    game_ctx: Option<&'a crate::types::GameContext>,
) -> Option<&'a TeamStats> {
    game_ctx.and_then(|g| g.opponent_stats.as_ref())
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "playoff_seed",
        Category::Standings,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.playoff_seed)
                .map(|s| s.to_string())
                .unwrap_or_default()
        },
        "Team's playoff seed number",
        &[("NBA", "4")],
    );
    registry.register(
        "playoff_seed_ordinal",
        Category::Standings,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.playoff_seed)
                .map(ordinal)
                .unwrap_or_default()
        },
        "Team's playoff seed as an ordinal ('4th')",
        &[("NBA", "4th")],
    );
    registry.register(
        "games_back",
        Category::Standings,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.games_back)
                .map(fmt_games_back)
                .unwrap_or_default()
        },
        "Games behind the division leader ('2.5')",
        &[("MLB", "2.5")],
    );
    registry.register(
        "opponent_playoff_seed",
        Category::Standings,
        SuffixRules::All,
        |_, game_ctx| {
            opponent_stats(game_ctx)
                .and_then(|s| s.playoff_seed)
                .map(|s| s.to_string())
                .unwrap_or_default()
        },
        "Opponent's playoff seed",
        &[("NBA", "7")],
    );
    registry.register(
        "opponent_games_back",
        Category::Standings,
        SuffixRules::All,
        |_, game_ctx| {
            opponent_stats(game_ctx)
                .and_then(|s| s.games_back)
                .map(fmt_games_back)
                .unwrap_or_default()
        },
        "Opponent's games behind",
        &[("MLB", "5")],
    );

    // Statistics

    registry.register(
        "team_ppg",
        Category::Statistics,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.ppg)
                .map(fmt_avg)
                .unwrap_or_default()
        },
        "Team points per game",
        &[("NBA", "114.2")],
    );
    registry.register(
        "team_papg",
        Category::Statistics,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.papg)
                .map(fmt_avg)
                .unwrap_or_default()
        },
        "Team points allowed per game",
        &[("NBA", "108.9")],
    );
    registry.register(
        "opponent_ppg",
        Category::Statistics,
        SuffixRules::All,
        |_, game_ctx| {
            opponent_stats(game_ctx)
                .and_then(|s| s.ppg)
                .map(fmt_avg)
                .unwrap_or_default()
        },
        "Opponent points per game",
        &[("NBA", "111.4")],
    );
    registry.register(
        "opponent_papg",
        Category::Statistics,
        SuffixRules::All,
        |_, game_ctx| {
            opponent_stats(game_ctx)
                .and_then(|s| s.papg)
                .map(fmt_avg)
                .unwrap_or_default()
        },
        "Opponent points allowed per game",
        &[("NBA", "113.0")],
    );

    // Conference / division

    registry.register(
        "conference",
        Category::Conference,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.conference.clone())
                .unwrap_or_default()
        },
        "Team's conference name",
        &[("NBA", "Eastern Conference"), ("CFB", "Big Ten")],
    );
    registry.register(
        "conference_abbrev",
        Category::Conference,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.conference_abbrev.clone())
                .unwrap_or_default()
        },
        "Team's conference abbreviation",
        &[("NBA", "East")],
    );
    registry.register(
        "division",
        Category::Conference,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.division.clone())
                .unwrap_or_default()
        },
        "Team's division name",
        &[("NBA", "Central Division")],
    );
    registry.register(
        "opponent_conference",
        Category::Conference,
        SuffixRules::All,
        |_, game_ctx| {
            opponent_stats(game_ctx)
                .and_then(|s| s.conference.clone())
                .unwrap_or_default()
        },
        "Opponent's conference name",
        &[("CFB", "SEC")],
    );
    registry.register(
        "opponent_division",
        Category::Conference,
        SuffixRules::All,
        |_, game_ctx| {
            opponent_stats(game_ctx)
                .and_then(|s| s.division.clone())
                .unwrap_or_default()
        },
        "Opponent's division name",
        &[("NBA", "Atlantic Division")],
    );
}
