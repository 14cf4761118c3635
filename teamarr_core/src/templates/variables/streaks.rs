//! Streak and head-to-head variables.
//!
//! Streak strings render as "W3"/"L2"; a draw in the most recent game
//! yields an empty streak. Head-to-head covers the season series plus
//! previous-meeting facts.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use crate::types::{GameContext, GameResult};

fn streaks(game_ctx: Option<&GameContext>) -> Option<&crate::types::Streaks> {
    game_ctx.and_then(|g| g.streaks.as_ref())
}

fn h2h(game_ctx: Option<&GameContext>) -> Option<&crate::types::HeadToHead> {
    game_ctx.and_then(|g| g.h2h.as_ref())
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "streak",
        Category::Streaks,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .and_then(|s| s.streak.clone())
                .unwrap_or_default()
        },
        "Current streak ('W3' / 'L2', empty after a draw)",
        &[("NBA", "W3")],
    );
    registry.register(
        "streak_count",
        Category::Streaks,
        SuffixRules::BaseOnly,
        |ctx, _| {
            ctx.team_stats
                .as_ref()
                .map(|s| s.streak_count.to_string())
                .unwrap_or_default()
        },
        "Signed streak count (positive wins, negative losses)",
        &[("NBA", "3")],
    );
    registry.register(
        "streak_text",
        Category::Streaks,
        SuffixRules::BaseOnly,
        |ctx, _| {
            let Some(stats) = ctx.team_stats.as_ref() else {
                return String::new();
            };
            match stats.streak_count {
                n if n > 1 => format!("won {n} straight"),
                1 => "won their last game".to_string(),
                -1 => "lost their last game".to_string(),
                n if n < -1 => format!("lost {} straight", -n),
                _ => String::new(),
            }
        },
        "Streak as prose ('won 3 straight')",
        &[("NBA", "won 3 straight")],
    );
    registry.register(
        "opponent_streak",
        Category::Streaks,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .and_then(|g| g.opponent_stats.as_ref())
                .and_then(|s| s.streak.clone())
                .unwrap_or_default()
        },
        "Opponent's current streak",
        &[("NBA", "L2")],
    );
    registry.register(
        "home_streak",
        Category::Streaks,
        SuffixRules::All,
        |_, game_ctx| {
            streaks(game_ctx)
                .map(|s| s.home_streak.clone())
                .unwrap_or_default()
        },
        "Streak across home games only",
        &[("NBA", "W5")],
    );
    registry.register(
        "away_streak",
        Category::Streaks,
        SuffixRules::All,
        |_, game_ctx| {
            streaks(game_ctx)
                .map(|s| s.away_streak.clone())
                .unwrap_or_default()
        },
        "Streak across away games only",
        &[("NBA", "L1")],
    );
    registry.register(
        "last_5_record",
        Category::Streaks,
        SuffixRules::All,
        |_, game_ctx| {
            streaks(game_ctx)
                .map(|s| s.last_5_record.clone())
                .unwrap_or_default()
        },
        "Record over the last five games",
        &[("NBA", "4-1"), ("Soccer", "3-1-1")],
    );
    registry.register(
        "last_10_record",
        Category::Streaks,
        SuffixRules::All,
        |_, game_ctx| {
            streaks(game_ctx)
                .map(|s| s.last_10_record.clone())
                .unwrap_or_default()
        },
        "Record over the last ten games",
        &[("NBA", "7-3")],
    );

    // Head-to-head

    registry.register(
        "season_series",
        Category::H2h,
        SuffixRules::All,
        |ctx, game_ctx| {
            let Some(h2h) = h2h(game_ctx) else {
                return String::new();
            };
            if h2h.games.is_empty() {
                return String::new();
            }
            format!(
                "{} lead the series {}-{}",
                if h2h.team_wins >= h2h.opponent_wins {
                    ctx.team_config.team_name.as_str()
                } else {
                    game_ctx
                        .map(|g| g.opponent.name.as_str())
                        .unwrap_or_default()
                },
                h2h.team_wins.max(h2h.opponent_wins),
                h2h.team_wins.min(h2h.opponent_wins),
            )
        },
        "Season series summary sentence",
        &[("NBA", "Pistons lead the series 2-1")],
    );
    registry.register(
        "season_series_record",
        Category::H2h,
        SuffixRules::All,
        |_, game_ctx| {
            h2h(game_ctx)
                .filter(|h| !h.games.is_empty())
                .map(|h| format!("{}-{}", h.team_wins, h.opponent_wins))
                .unwrap_or_default()
        },
        "Season series as a record ('2-1')",
        &[("NBA", "2-1")],
    );
    registry.register(
        "is_rematch",
        Category::H2h,
        SuffixRules::All,
        |_, game_ctx| {
            h2h(game_ctx)
                .map(|h| if h.is_rematch() { "true" } else { "false" }.to_string())
                .unwrap_or_else(|| "false".to_string())
        },
        "'true' when the teams already met this season",
        &[("NBA", "true")],
    );
    registry.register(
        "rematch_result",
        Category::H2h,
        SuffixRules::All,
        |_, game_ctx| {
            h2h(game_ctx)
                .and_then(|h| h.last_result)
                .map(|r| {
                    match r {
                        GameResult::Win => "won",
                        GameResult::Loss => "lost",
                        GameResult::Tie => "drew",
                    }
                    .to_string()
                })
                .unwrap_or_default()
        },
        "Previous meeting outcome as a verb ('won')",
        &[("NBA", "won")],
    );
    registry.register(
        "rematch_score",
        Category::H2h,
        SuffixRules::All,
        |_, game_ctx| {
            let Some(h2h) = h2h(game_ctx) else {
                return String::new();
            };
            match (&h2h.last_team_score, &h2h.last_opponent_score) {
                (Some(us), Some(them)) => format!("{us}-{them}"),
                _ => String::new(),
            }
        },
        "Previous meeting score ('112-104')",
        &[("NBA", "112-104")],
    );
    registry.register(
        "rematch_days_ago",
        Category::H2h,
        SuffixRules::All,
        |_, game_ctx| {
            h2h(game_ctx)
                .and_then(|h| h.days_since)
                .map(|d| d.to_string())
                .unwrap_or_default()
        },
        "Days since the previous meeting",
        &[("NBA", "12")],
    );
    registry.register(
        "rematch_venue",
        Category::H2h,
        SuffixRules::All,
        |_, game_ctx| {
            h2h(game_ctx)
                .and_then(|h| h.last_venue.clone())
                .unwrap_or_default()
        },
        "Venue of the previous meeting",
        &[("NBA", "United Center")],
    );
}
