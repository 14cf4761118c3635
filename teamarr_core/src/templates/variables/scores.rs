//! Score and outcome variables.
//!
//! These exist only for completed games, so everything here is
//! `LastOnly`: `{score.last}`, `{result.last}`, never a base form. The
//! resolver's suffix mask enforces that; extractors still guard on final
//! status so an unfinished `.last` game yields empty strings.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use crate::types::{GameContext, GameResult};

fn final_scores(game_ctx: Option<&GameContext>) -> Option<(i32, i32)> {
    let game = game_ctx?;
    if !game.event.event.status.is_final() {
        return None;
    }
    Some((game.team_score()?, game.opponent_score()?))
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "score",
        Category::Scores,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            final_scores(game_ctx)
                .map(|(us, them)| format!("{us}-{them}"))
                .unwrap_or_default()
        },
        "Final score, team first ('112-104')",
        &[("NBA", "112-104"), ("Soccer", "2-1")],
    );
    registry.register(
        "final_score",
        Category::Scores,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            final_scores(game_ctx)
                .map(|(us, them)| format!("{}-{}", us.max(them), us.min(them)))
                .unwrap_or_default()
        },
        "Final score, winner first ('112-104')",
        &[("NBA", "112-104")],
    );
    registry.register(
        "team_score",
        Category::Scores,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            final_scores(game_ctx)
                .map(|(us, _)| us.to_string())
                .unwrap_or_default()
        },
        "Configured team's final score",
        &[("NBA", "112")],
    );
    registry.register(
        "opponent_score",
        Category::Scores,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            final_scores(game_ctx)
                .map(|(_, them)| them.to_string())
                .unwrap_or_default()
        },
        "Opponent's final score",
        &[("NBA", "104")],
    );
    registry.register(
        "home_score",
        Category::Scores,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            game_ctx
                .filter(|g| g.event.event.status.is_final())
                .and_then(|g| g.event.event.home_score)
                .map(|s| s.to_string())
                .unwrap_or_default()
        },
        "Home side's final score",
        &[("NBA", "104")],
    );
    registry.register(
        "away_score",
        Category::Scores,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            game_ctx
                .filter(|g| g.event.event.status.is_final())
                .and_then(|g| g.event.event.away_score)
                .map(|s| s.to_string())
                .unwrap_or_default()
        },
        "Away side's final score",
        &[("NBA", "112")],
    );
    registry.register(
        "score_diff",
        Category::Scores,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            final_scores(game_ctx)
                .map(|(us, them)| (us - them).abs().to_string())
                .unwrap_or_default()
        },
        "Margin of the final score",
        &[("NBA", "8")],
    );

    registry.register(
        "result",
        Category::Outcome,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            game_ctx
                .and_then(GameContext::result)
                .map(|r| r.as_str().to_string())
                .unwrap_or_default()
        },
        "Outcome from the team's perspective ('Win'/'Loss'/'Tie')",
        &[("NBA", "Win")],
    );
    registry.register(
        "result_text",
        Category::Outcome,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            game_ctx
                .and_then(GameContext::result)
                .map(|r| {
                    match r {
                        GameResult::Win => "defeated",
                        GameResult::Loss => "fell to",
                        GameResult::Tie => "drew with",
                    }
                    .to_string()
                })
                .unwrap_or_default()
        },
        "Outcome verb ('defeated' / 'fell to' / 'drew with')",
        &[("NBA", "defeated")],
    );
    registry.register(
        "win_loss",
        Category::Outcome,
        SuffixRules::LastOnly,
        |_, game_ctx| {
            game_ctx
                .and_then(GameContext::result)
                .map(|r| {
                    match r {
                        GameResult::Win => "W",
                        GameResult::Loss => "L",
                        GameResult::Tie => "T",
                    }
                    .to_string()
                })
                .unwrap_or_default()
        },
        "Single-letter outcome ('W'/'L'/'T')",
        &[("NBA", "W")],
    );
}
