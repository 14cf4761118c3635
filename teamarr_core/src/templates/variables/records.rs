//! Record-related template variables.
//!
//! Record strings keep the sport's native shape: "W-L" for US sports,
//! "W-D-L" for soccer. Percentages render in the league's ".750" style.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use super::{parse_record, win_pct};

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "team_record",
        Category::Records,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|s| s.record.clone())
                .unwrap_or_default()
        },
        "Team's overall record ('10-2' or '8-3-1')",
        &[("NBA", "34-18"), ("Soccer", "15-4-3")],
    );
    registry.register(
        "team_wins",
        Category::Records,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|s| s.wins.to_string())
                .unwrap_or_default()
        },
        "Team's total wins",
        &[("NBA", "34")],
    );
    registry.register(
        "team_losses",
        Category::Records,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|s| s.losses.to_string())
                .unwrap_or_default()
        },
        "Team's total losses",
        &[("NBA", "18")],
    );
    registry.register(
        "team_ties",
        Category::Records,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|s| s.ties.to_string())
                .unwrap_or_default()
        },
        "Team's total ties/draws",
        &[("Soccer", "4")],
    );
    registry.register(
        "team_win_pct",
        Category::Records,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|s| win_pct(s.wins, s.losses, s.ties))
                .unwrap_or_default()
        },
        "Team's winning percentage ('.750')",
        &[("NBA", ".654")],
    );
    registry.register(
        "opponent_record",
        Category::Records,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.opponent_stats.as_ref())
                .map(|s| s.record.clone())
                .unwrap_or_default()
        },
        "Opponent's overall record",
        &[("NBA", "28-24")],
    );
    registry.register(
        "opponent_wins",
        Category::Records,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.opponent_stats.as_ref())
                .map(|s| s.wins.to_string())
                .unwrap_or_default()
        },
        "Opponent's total wins",
        &[("NBA", "28")],
    );
    registry.register(
        "opponent_losses",
        Category::Records,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.opponent_stats.as_ref())
                .map(|s| s.losses.to_string())
                .unwrap_or_default()
        },
        "Opponent's total losses",
        &[("NBA", "24")],
    );
    registry.register(
        "opponent_win_pct",
        Category::Records,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.opponent_stats.as_ref())
                .map(|s| win_pct(s.wins, s.losses, s.ties))
                .unwrap_or_default()
        },
        "Opponent's winning percentage",
        &[("NBA", ".538")],
    );
    registry.register(
        "home_record",
        Category::Records,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.home_record.clone())
                .unwrap_or_default()
        },
        "Team's home record",
        &[("NBA", "20-6")],
    );
    registry.register(
        "away_record",
        Category::Records,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.away_record.clone())
                .unwrap_or_default()
        },
        "Team's away/road record",
        &[("NBA", "14-12")],
    );
    registry.register(
        "home_win_pct",
        Category::Records,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.home_record.as_deref())
                .map(|r| {
                    let (w, l, t) = parse_record(r);
                    win_pct(w, l, t)
                })
                .unwrap_or_default()
        },
        "Team's home winning percentage",
        &[("NBA", ".769")],
    );
    registry.register(
        "away_win_pct",
        Category::Records,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.away_record.as_deref())
                .map(|r| {
                    let (w, l, t) = parse_record(r);
                    win_pct(w, l, t)
                })
                .unwrap_or_default()
        },
        "Team's away winning percentage",
        &[("NBA", ".538")],
    );
    registry.register(
        "home_team_record",
        Category::Records,
        SuffixRules::All,
        |ctx, game_ctx| {
            let Some(game) = game_ctx else {
                return String::new();
            };
            let stats = if game.is_home {
                ctx.team_stats.as_ref().or(game.team_stats.as_ref())
            } else {
                game.opponent_stats.as_ref()
            };
            stats.map(|s| s.record.clone()).unwrap_or_default()
        },
        "Home team's overall record for this game",
        &[("NBA", "34-18")],
    );
    registry.register(
        "away_team_record",
        Category::Records,
        SuffixRules::All,
        |ctx, game_ctx| {
            let Some(game) = game_ctx else {
                return String::new();
            };
            let stats = if game.is_home {
                game.opponent_stats.as_ref()
            } else {
                ctx.team_stats.as_ref().or(game.team_stats.as_ref())
            };
            stats.map(|s| s.record.clone()).unwrap_or_default()
        },
        "Away team's overall record for this game",
        &[("NBA", "28-24")],
    );
    registry.register(
        "records_matchup",
        Category::Records,
        SuffixRules::All,
        |ctx, game_ctx| {
            let Some(game) = game_ctx else {
                return String::new();
            };
            let team = ctx
                .team_stats
                .as_ref()
                .or(game.team_stats.as_ref())
                .map(|s| s.record.clone())
                .unwrap_or_default();
            let opponent = game
                .opponent_stats
                .as_ref()
                .map(|s| s.record.clone())
                .unwrap_or_default();
            if team.is_empty() || opponent.is_empty() {
                return String::new();
            }
            format!("({team}) vs ({opponent})")
        },
        "Both records side by side ('(34-18) vs (28-24)')",
        &[("NBA", "(34-18) vs (28-24)")],
    );

    // Ties shown on the opponent side too; soccer templates use these.
    registry.register(
        "opponent_ties",
        Category::Records,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.opponent_stats.as_ref())
                .map(|s| s.ties.to_string())
                .unwrap_or_default()
        },
        "Opponent's total ties/draws",
        &[("Soccer", "6")],
    );
    registry.register(
        "home_team_seed",
        Category::Records,
        SuffixRules::All,
        |ctx, game_ctx| seed_for_side(ctx, game_ctx, true),
        "Home team's playoff seed",
        &[("NBA", "4")],
    );
    registry.register(
        "away_team_seed",
        Category::Records,
        SuffixRules::All,
        |ctx, game_ctx| seed_for_side(ctx, game_ctx, false),
        "Away team's playoff seed",
        &[("NBA", "7")],
    );
}

fn seed_for_side(
    ctx: &crate::types::TemplateContext,
    game_ctx: Option<&crate::types::GameContext>,
    want_home: bool,
) -> String {
    let Some(game) = game_ctx else {
        return String::new();
    };
    let stats = if game.is_home == want_home {
        ctx.team_stats.as_ref().or(game.team_stats.as_ref())
    } else {
        game.opponent_stats.as_ref()
    };
    stats
        .and_then(|s| s.playoff_seed)
        .map(|s| s.to_string())
        .unwrap_or_default()
}
