//! Player-leader variables.
//!
//! Leaders are sport-dispatched (scoring lines for basketball, yardage
//! lines for football) and only populated for completed games, so in
//! practice these render under `.last`.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use crate::types::{GameContext, LeaderLine, PlayerLeaders};

fn leaders(game_ctx: Option<&GameContext>) -> Option<&PlayerLeaders> {
    game_ctx.and_then(|g| g.player_leaders.as_ref())
}

fn line(entry: Option<&LeaderLine>) -> String {
    entry
        .map(|l| format!("{} ({})", l.player, l.value))
        .unwrap_or_default()
}

fn player(entry: Option<&LeaderLine>) -> String {
    entry.map(|l| l.player.clone()).unwrap_or_default()
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "scoring_leader",
        Category::PlayerLeaders,
        SuffixRules::All,
        |_, game_ctx| line(leaders(game_ctx).and_then(|l| l.scoring.as_ref())),
        "Scoring leader with value ('C. Cunningham (31 PTS)')",
        &[("NBA", "C. Cunningham (31 PTS)")],
    );
    registry.register(
        "scoring_leader_name",
        Category::PlayerLeaders,
        SuffixRules::All,
        |_, game_ctx| player(leaders(game_ctx).and_then(|l| l.scoring.as_ref())),
        "Scoring leader name only",
        &[("NBA", "C. Cunningham")],
    );
    registry.register(
        "rebounds_leader",
        Category::PlayerLeaders,
        SuffixRules::All,
        |_, game_ctx| line(leaders(game_ctx).and_then(|l| l.rebounds.as_ref())),
        "Rebounding leader with value",
        &[("NBA", "J. Duren (14 REB)")],
    );
    registry.register(
        "assists_leader",
        Category::PlayerLeaders,
        SuffixRules::All,
        |_, game_ctx| line(leaders(game_ctx).and_then(|l| l.assists.as_ref())),
        "Assists leader with value",
        &[("NBA", "C. Cunningham (9 AST)")],
    );
    registry.register(
        "passing_leader",
        Category::PlayerLeaders,
        SuffixRules::All,
        |_, game_ctx| line(leaders(game_ctx).and_then(|l| l.passing.as_ref())),
        "Passing leader with value (football)",
        &[("NFL", "J. Goff (312 YDS)")],
    );
    registry.register(
        "rushing_leader",
        Category::PlayerLeaders,
        SuffixRules::All,
        |_, game_ctx| line(leaders(game_ctx).and_then(|l| l.rushing.as_ref())),
        "Rushing leader with value (football)",
        &[("NFL", "D. Montgomery (94 YDS)")],
    );
    registry.register(
        "receiving_leader",
        Category::PlayerLeaders,
        SuffixRules::All,
        |_, game_ctx| line(leaders(game_ctx).and_then(|l| l.receiving.as_ref())),
        "Receiving leader with value (football)",
        &[("NFL", "A. St. Brown (108 YDS)")],
    );
}
