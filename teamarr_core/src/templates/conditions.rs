//! Conditional description selection.
//!
//! A template may attach a list of description options. Priorities 1-99
//! are conditional (their predicate must hold); priority 100 options are
//! fallbacks that always match. Matches bucket by priority, the smallest
//! priority present wins, and one option is chosen uniformly at random
//! from that bucket.

use super::variables::broadcast::partition_broadcasts;
use crate::league_config;
use crate::types::{SeasonType, TemplateContext};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Priority value that marks an always-matching fallback option.
pub const FALLBACK_PRIORITY: i32 = 100;

/// One user-authored description option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionOption {
    #[serde(default)]
    pub template: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub condition_value: Option<serde_json::Value>,
}

fn default_priority() -> i32 {
    50
}

/// Parse options from their JSON persistence form. Bad JSON yields an
/// empty list, never an error.
pub fn parse_options(raw: &str) -> Vec<DescriptionOption> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        debug!("[TEMPLATES] Unparseable description options: {}", e);
        Vec::new()
    })
}

/// Select the best description template for a context.
///
/// Thread-rng convenience wrapper around [`select_description_with_rng`].
pub fn select_description(options: &[DescriptionOption], ctx: &TemplateContext) -> String {
    select_description_with_rng(options, ctx, &mut rand::thread_rng())
}

/// Select with an explicit RNG (deterministic in tests).
pub fn select_description_with_rng<R: Rng + ?Sized>(
    options: &[DescriptionOption],
    ctx: &TemplateContext,
    rng: &mut R,
) -> String {
    let mut buckets: BTreeMap<i32, Vec<&str>> = BTreeMap::new();

    for option in options {
        if option.template.is_empty() {
            continue;
        }
        if option.priority == FALLBACK_PRIORITY {
            buckets
                .entry(FALLBACK_PRIORITY)
                .or_default()
                .push(&option.template);
            continue;
        }
        let Some(condition) = option.condition.as_deref().filter(|c| !c.is_empty()) else {
            continue;
        };
        if evaluate_condition(condition, option.condition_value.as_ref(), ctx) {
            buckets
                .entry(option.priority)
                .or_default()
                .push(&option.template);
        }
    }

    // Smallest priority wins; uniform choice within the bucket.
    buckets
        .values()
        .next()
        .and_then(|templates| templates.choose(rng))
        .map(|t| (*t).to_string())
        .unwrap_or_default()
}

fn value_as_i32(value: Option<&serde_json::Value>) -> Option<i32> {
    let value = value?;
    value
        .as_i64()
        .map(|n| n as i32)
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn directional_streak(streak: &str, prefix: char, threshold: i32) -> bool {
    if !streak.starts_with(prefix) {
        return false;
    }
    streak[1..]
        .parse::<i32>()
        .map_or(false, |count| count >= threshold)
}

/// Evaluate one predicate against the context. Unknown predicates never
/// match.
pub fn evaluate_condition(
    condition: &str,
    condition_value: Option<&serde_json::Value>,
    ctx: &TemplateContext,
) -> bool {
    let game = ctx.game.as_ref();
    let team_stats = ctx.team_stats.as_ref();
    let opponent_stats = game.and_then(|g| g.opponent_stats.as_ref());

    match condition {
        "win_streak" => match value_as_i32(condition_value) {
            Some(threshold) => {
                team_stats.map_or(false, |s| s.streak_count >= threshold)
            }
            None => false,
        },
        "loss_streak" => match value_as_i32(condition_value) {
            Some(threshold) => {
                team_stats.map_or(false, |s| s.streak_count <= -threshold)
            }
            None => false,
        },
        "is_top_ten_matchup" => {
            let our_rank = team_stats.and_then(|s| s.rank).unwrap_or(99);
            let opp_rank = opponent_stats.and_then(|s| s.rank).unwrap_or(99);
            our_rank <= 10 && opp_rank <= 10
        }
        "is_ranked_opponent" => {
            opponent_stats.and_then(|s| s.rank).unwrap_or(99) <= 25
        }
        "is_rematch" => {
            // In-season rematches only: the series list is built from the
            // current season's schedule.
            game.and_then(|g| g.h2h.as_ref())
                .map_or(false, |h| h.is_rematch())
        }
        "is_home" => game.map_or(false, |g| g.is_home),
        "is_away" => game.map_or(false, |g| !g.is_home),
        "is_conference_game" => {
            if !league_config::is_college_league(&ctx.team_config.league) {
                return false;
            }
            let ours = team_stats
                .and_then(|s| s.conference_abbrev.clone().or_else(|| s.conference.clone()));
            let theirs = opponent_stats
                .and_then(|s| s.conference_abbrev.clone().or_else(|| s.conference.clone()));
            match (ours, theirs) {
                (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
                    a.eq_ignore_ascii_case(&b)
                }
                _ => false,
            }
        }
        // Odds only exist for scoreboard-enriched (same-day) events.
        "has_odds" => game.map_or(false, |g| g.event.has_odds),
        "home_win_streak" => match value_as_i32(condition_value) {
            Some(threshold) => game
                .and_then(|g| g.streaks.as_ref())
                .map_or(false, |s| directional_streak(&s.home_streak, 'W', threshold)),
            None => false,
        },
        "home_loss_streak" => match value_as_i32(condition_value) {
            Some(threshold) => game
                .and_then(|g| g.streaks.as_ref())
                .map_or(false, |s| directional_streak(&s.home_streak, 'L', threshold)),
            None => false,
        },
        "away_win_streak" => match value_as_i32(condition_value) {
            Some(threshold) => game
                .and_then(|g| g.streaks.as_ref())
                .map_or(false, |s| directional_streak(&s.away_streak, 'W', threshold)),
            None => false,
        },
        "away_loss_streak" => match value_as_i32(condition_value) {
            Some(threshold) => game
                .and_then(|g| g.streaks.as_ref())
                .map_or(false, |s| directional_streak(&s.away_streak, 'L', threshold)),
            None => false,
        },
        "is_playoff" => game
            .and_then(|g| g.event.event.season_type)
            .map_or(false, |t| t == SeasonType::Postseason),
        "is_preseason" => game
            .and_then(|g| g.event.event.season_type)
            .map_or(false, |t| t == SeasonType::Preseason),
        "is_national_broadcast" => game.map_or(false, |g| {
            partition_broadcasts(&g.event.event.broadcasts).is_national()
        }),
        "opponent_name_contains" => {
            let Some(needle) = condition_value.and_then(|v| v.as_str()) else {
                return false;
            };
            game.map_or(false, |g| {
                g.opponent
                    .name
                    .to_lowercase()
                    .contains(&needle.to_lowercase())
            })
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::templates::test_support::base_context;
    use super::*;
    use crate::types::HeadToHead;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;

    fn option(template: &str, priority: i32, condition: Option<&str>, value: Option<serde_json::Value>) -> DescriptionOption {
        DescriptionOption {
            template: template.to_string(),
            priority,
            condition: condition.map(String::from),
            condition_value: value,
        }
    }

    #[test]
    fn test_fallback_always_matches() {
        let ctx = base_context();
        let options = vec![option("fallback", 100, None, None)];
        assert_eq!(select_description(&options, &ctx), "fallback");
    }

    #[test]
    fn test_lowest_priority_bucket_wins() {
        let ctx = base_context(); // streak_count = 3, is_home = true
        let options = vec![
            option("fallback", 100, None, None),
            option("hot streak", 10, Some("win_streak"), Some(json!(3))),
            option("at home", 20, Some("is_home"), None),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            select_description_with_rng(&options, &ctx, &mut rng),
            "hot streak"
        );
    }

    #[test]
    fn test_equal_priority_uniform_choice() {
        // Team on a 3-game win streak vs a fresh opponent: both p=10
        // options match; selection is one of the two, never the fallback.
        let mut ctx = base_context();
        let mut game = ctx.game.clone().unwrap();
        game.h2h = Some(HeadToHead {
            games: vec![crate::types::H2hGame {
                event_id: "400".to_string(),
                date: ctx.now,
                result: crate::types::GameResult::Win,
                team_score: 110,
                opponent_score: 100,
                was_home: true,
            }],
            ..HeadToHead::default()
        });
        ctx.game = Some(game);

        let options = vec![
            option("streak text", 10, Some("win_streak"), Some(json!(3))),
            option("rematch text", 10, Some("is_rematch"), None),
            option("fallback", 100, None, None),
        ];
        let mut seen = std::collections::HashSet::new();
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let chosen = select_description_with_rng(&options, &ctx, &mut rng);
            assert_ne!(chosen, "fallback");
            seen.insert(chosen);
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_no_match_no_fallback_is_empty() {
        let ctx = base_context();
        let options = vec![option("cold streak", 10, Some("loss_streak"), Some(json!(2)))];
        assert_eq!(select_description(&options, &ctx), "");
    }

    #[test]
    fn test_unknown_predicate_never_matches() {
        let ctx = base_context();
        assert!(!evaluate_condition("not_a_predicate", None, &ctx));
    }

    #[test]
    fn test_streak_predicates() {
        let ctx = base_context(); // streak_count = 3
        assert!(evaluate_condition("win_streak", Some(&json!(3)), &ctx));
        assert!(evaluate_condition("win_streak", Some(&json!("2")), &ctx));
        assert!(!evaluate_condition("win_streak", Some(&json!(4)), &ctx));
        assert!(!evaluate_condition("win_streak", None, &ctx));
        assert!(!evaluate_condition("loss_streak", Some(&json!(1)), &ctx));
    }

    #[test]
    fn test_home_away_predicates() {
        let ctx = base_context();
        assert!(evaluate_condition("is_home", None, &ctx));
        assert!(!evaluate_condition("is_away", None, &ctx));
    }

    #[test]
    fn test_directional_streak_predicates() {
        let mut ctx = base_context();
        let mut game = ctx.game.clone().unwrap();
        game.streaks = Some(crate::types::Streaks {
            home_streak: "W5".to_string(),
            away_streak: "L2".to_string(),
            last_5_record: "4-1".to_string(),
            last_10_record: "7-3".to_string(),
        });
        ctx.game = Some(game);
        assert!(evaluate_condition("home_win_streak", Some(&json!(3)), &ctx));
        assert!(!evaluate_condition("home_loss_streak", Some(&json!(1)), &ctx));
        assert!(evaluate_condition("away_loss_streak", Some(&json!(2)), &ctx));
        assert!(!evaluate_condition("away_win_streak", Some(&json!(1)), &ctx));
    }

    #[test]
    fn test_opponent_name_contains() {
        let ctx = base_context();
        assert!(evaluate_condition(
            "opponent_name_contains",
            Some(&json!("bulls")),
            &ctx
        ));
        assert!(!evaluate_condition(
            "opponent_name_contains",
            Some(&json!("lakers")),
            &ctx
        ));
        assert!(!evaluate_condition("opponent_name_contains", None, &ctx));
    }

    #[test]
    fn test_national_broadcast_predicate() {
        let ctx = base_context(); // carries ESPN
        assert!(evaluate_condition("is_national_broadcast", None, &ctx));
    }

    #[test]
    fn test_parse_options_bad_json() {
        assert!(parse_options("not json").is_empty());
        assert!(parse_options("").is_empty());
        let parsed = parse_options(r#"[{"template": "x", "priority": 100}]"#);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].priority, 100);
    }
}
