//! Ranking and season-type variables.
//!
//! College rankings render as "#N" when ranked top-25 and empty
//! otherwise; pro leagues show the ordinal playoff seed instead.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use super::ordinal;
use crate::league_config;
use crate::types::{SeasonType, TeamStats, TemplateContext};

/// "#7" for ranked college teams, "" when unranked or rank > 25.
fn format_college_rank(rank: Option<u32>) -> String {
    match rank {
        Some(r) if r <= 25 => format!("#{r}"),
        _ => String::new(),
    }
}

fn rank_display(ctx: &TemplateContext, stats: Option<&TeamStats>) -> String {
    let Some(stats) = stats else {
        return String::new();
    };
    if league_config::is_college_league(&ctx.team_config.league) {
        format_college_rank(stats.rank)
    } else {
        stats.playoff_seed.map(ordinal).unwrap_or_default()
    }
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "team_rank",
        Category::Rankings,
        SuffixRules::BaseOnly,
        |ctx, _| rank_display(ctx, ctx.team_stats.as_ref()),
        "Team rank: college '#N' (top 25), pro ordinal seed",
        &[("CFB", "#7"), ("NBA", "4th")],
    );
    registry.register(
        "opponent_rank",
        Category::Rankings,
        SuffixRules::All,
        |ctx, game_ctx| {
            rank_display(ctx, game_ctx.and_then(|g| g.opponent_stats.as_ref()))
        },
        "Opponent rank in the same style",
        &[("CFB", "#12")],
    );
    registry.register(
        "is_ranked",
        Category::Rankings,
        SuffixRules::BaseOnly,
        |ctx, _| {
            let ranked = ctx
                .team_stats
                .as_ref()
                .and_then(|s| s.rank)
                .map_or(false, |r| r <= 25);
            if ranked { "true" } else { "false" }.to_string()
        },
        "'true' when the team is ranked top-25",
        &[("CFB", "true")],
    );
    registry.register(
        "is_ranked_opponent",
        Category::Rankings,
        SuffixRules::All,
        |_, game_ctx| {
            let ranked = game_ctx
                .and_then(|g| g.opponent_stats.as_ref())
                .and_then(|s| s.rank)
                .map_or(false, |r| r <= 25);
            if ranked { "true" } else { "false" }.to_string()
        },
        "'true' when the opponent is ranked top-25",
        &[("CFB", "true")],
    );
    registry.register(
        "ranked_matchup",
        Category::Rankings,
        SuffixRules::All,
        |ctx, game_ctx| {
            let our = ctx.team_stats.as_ref().and_then(|s| s.rank);
            let their = game_ctx
                .and_then(|g| g.opponent_stats.as_ref())
                .and_then(|s| s.rank);
            match (our, their) {
                (Some(a), Some(b)) if a <= 25 && b <= 25 => {
                    format!("#{a} vs #{b}")
                }
                _ => String::new(),
            }
        },
        "Both ranks when both teams are ranked ('#7 vs #12')",
        &[("CFB", "#7 vs #12")],
    );

    // Season type

    registry.register(
        "season_type",
        Category::Playoffs,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.event.event.season_type)
                .map(|t| {
                    match t {
                        SeasonType::Preseason => "Preseason",
                        SeasonType::Regular => "Regular Season",
                        SeasonType::Postseason => "Playoffs",
                    }
                    .to_string()
                })
                .unwrap_or_default()
        },
        "Season phase ('Regular Season' / 'Playoffs')",
        &[("NFL", "Playoffs")],
    );
    registry.register(
        "is_playoff",
        Category::Playoffs,
        SuffixRules::All,
        |_, game_ctx| {
            let playoff = game_ctx
                .and_then(|g| g.event.event.season_type)
                .map_or(false, |t| t == SeasonType::Postseason);
            if playoff { "true" } else { "false" }.to_string()
        },
        "'true' for postseason games",
        &[("NFL", "true")],
    );
    registry.register(
        "is_preseason",
        Category::Playoffs,
        SuffixRules::All,
        |_, game_ctx| {
            let pre = game_ctx
                .and_then(|g| g.event.event.season_type)
                .map_or(false, |t| t == SeasonType::Preseason);
            if pre { "true" } else { "false" }.to_string()
        },
        "'true' for preseason games",
        &[("NFL", "false")],
    );
    registry.register(
        "season_year",
        Category::Playoffs,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.event.event.season_year)
                .map(|y| y.to_string())
                .unwrap_or_default()
        },
        "Season year",
        &[("NBA", "2026")],
    );
}
