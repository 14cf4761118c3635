//! Game-context assembly: home/away resolution, head-to-head, streaks,
//! and the current/next/last triad walked over a team's extended
//! schedule.

use crate::league_config;
use crate::types::{
    normalize_slug, EnrichedEvent, Event, GameContext, GameResult, H2hGame, HeadToHead,
    PlayerLeaders, Streaks, Team, TeamStats,
};
use chrono::{DateTime, Utc};

/// Decide which side of an event the configured team is.
///
/// Compares provider IDs first; when the ID is absent (cross-provider
/// events) falls back to the normalized name slug. `None` when the team
/// is on neither side and the event is not a tournament placeholder.
pub fn determine_home_away<'a>(
    event: &'a Event,
    team_id: &str,
    team_name: &str,
) -> Option<(bool, &'a Team, &'a Team)> {
    if !team_id.is_empty() {
        if event.home_team.id == team_id {
            return Some((true, &event.home_team, &event.away_team));
        }
        if event.away_team.id == team_id {
            return Some((false, &event.away_team, &event.home_team));
        }
    }
    let slug = normalize_slug(team_name);
    if !slug.is_empty() {
        if normalize_slug(&event.home_team.name) == slug {
            return Some((true, &event.home_team, &event.away_team));
        }
        if normalize_slug(&event.away_team.name) == slug {
            return Some((false, &event.away_team, &event.home_team));
        }
    }
    if event.is_tournament() {
        // The event itself stands in for both sides.
        return Some((true, &event.home_team, &event.away_team));
    }
    None
}

fn result_for(event: &Event, was_home: bool) -> Option<(GameResult, i32, i32)> {
    if !event.status.is_final() {
        return None;
    }
    let (home, away) = (event.home_score?, event.away_score?);
    let (us, them) = if was_home { (home, away) } else { (away, home) };
    let result = if us > them {
        GameResult::Win
    } else if us < them {
        GameResult::Loss
    } else {
        GameResult::Tie
    };
    Some((result, us, them))
}

/// Head-to-head facts against one opponent, from past games in the
/// extended schedule. In-season only: callers pass a single season's
/// events.
pub fn calculate_h2h(
    team_id: &str,
    team_name: &str,
    opponent_id: &str,
    opponent_name: &str,
    events: &[Event],
    before: DateTime<Utc>,
) -> HeadToHead {
    let mut h2h = HeadToHead::default();
    let opponent_slug = normalize_slug(opponent_name);

    let mut meetings: Vec<(&Event, bool)> = Vec::new();
    for event in events {
        if event.start_time >= before {
            continue;
        }
        let Some((is_home, _, opponent)) = determine_home_away(event, team_id, team_name) else {
            continue;
        };
        let opponent_matches = (!opponent_id.is_empty() && opponent.id == opponent_id)
            || (!opponent_slug.is_empty() && normalize_slug(&opponent.name) == opponent_slug);
        if opponent_matches {
            meetings.push((event, is_home));
        }
    }
    meetings.sort_by_key(|(e, _)| e.start_time);

    for (event, was_home) in &meetings {
        let Some((result, us, them)) = result_for(event, *was_home) else {
            continue;
        };
        match result {
            GameResult::Win => h2h.team_wins += 1,
            GameResult::Loss => h2h.opponent_wins += 1,
            GameResult::Tie => {}
        }
        h2h.games.push(H2hGame {
            event_id: event.id.clone(),
            date: event.start_time,
            result,
            team_score: us,
            opponent_score: them,
            was_home: *was_home,
        });
    }

    if let Some((event, was_home)) = meetings.last() {
        if let Some((result, us, them)) = result_for(event, *was_home) {
            h2h.last_result = Some(result);
            h2h.last_team_score = Some(us.to_string());
            h2h.last_opponent_score = Some(them.to_string());
        }
        h2h.last_venue = event.venue.as_ref().map(|v| v.name.clone());
        h2h.days_since = Some((before - event.start_time).num_days());
    }

    h2h
}

fn record_string(wins: u32, draws: u32, losses: u32, soccer: bool) -> String {
    if soccer {
        format!("{wins}-{draws}-{losses}")
    } else {
        format!("{wins}-{losses}")
    }
}

fn streak_string(results: &[GameResult]) -> String {
    // Walk backwards from the most recent game; a draw breaks the run.
    let Some(latest) = results.last() else {
        return String::new();
    };
    if *latest == GameResult::Tie {
        return String::new();
    }
    let count = results
        .iter()
        .rev()
        .take_while(|r| *r == latest)
        .count();
    let prefix = if *latest == GameResult::Win { 'W' } else { 'L' };
    format!("{prefix}{count}")
}

/// Home/away streaks plus last-5/last-10 form, from the extended
/// schedule's completed games.
pub fn calculate_streaks(
    team_id: &str,
    team_name: &str,
    league: &str,
    events: &[Event],
    before: DateTime<Utc>,
) -> Streaks {
    let soccer = league_config::is_soccer_league(league);

    let mut completed: Vec<(&Event, bool, GameResult)> = events
        .iter()
        .filter(|e| e.start_time < before)
        .filter_map(|e| {
            let (is_home, _, _) = determine_home_away(e, team_id, team_name)?;
            let (result, _, _) = result_for(e, is_home)?;
            Some((e, is_home, result))
        })
        .collect();
    completed.sort_by_key(|(e, _, _)| e.start_time);

    let home_results: Vec<GameResult> = completed
        .iter()
        .filter(|(_, is_home, _)| *is_home)
        .map(|(_, _, r)| *r)
        .collect();
    let away_results: Vec<GameResult> = completed
        .iter()
        .filter(|(_, is_home, _)| !*is_home)
        .map(|(_, _, r)| *r)
        .collect();
    let all_results: Vec<GameResult> = completed.iter().map(|(_, _, r)| *r).collect();

    let form = |n: usize| -> String {
        let recent: Vec<&GameResult> = all_results.iter().rev().take(n).collect();
        if recent.is_empty() {
            return String::new();
        }
        let wins = recent.iter().filter(|r| ***r == GameResult::Win).count() as u32;
        let losses = recent.iter().filter(|r| ***r == GameResult::Loss).count() as u32;
        let draws = recent.iter().filter(|r| ***r == GameResult::Tie).count() as u32;
        record_string(wins, draws, losses, soccer)
    };

    Streaks {
        home_streak: streak_string(&home_results),
        away_streak: streak_string(&away_results),
        last_5_record: form(5),
        last_10_record: form(10),
    }
}

/// Build one slot of the current/next/last triad.
#[allow(clippy::too_many_arguments)]
pub fn build_game_context(
    event: EnrichedEvent,
    team_id: &str,
    team_name: &str,
    team_stats: Option<TeamStats>,
    opponent_stats: Option<TeamStats>,
    h2h: Option<HeadToHead>,
    streaks: Option<Streaks>,
    head_coach: Option<String>,
    player_leaders: Option<PlayerLeaders>,
) -> Option<GameContext> {
    let (is_home, team, opponent) = determine_home_away(&event.event, team_id, team_name)?;
    let (team, opponent) = (team.clone(), opponent.clone());
    Some(GameContext {
        event,
        is_home,
        team,
        opponent,
        team_stats,
        opponent_stats,
        h2h,
        streaks,
        head_coach,
        player_leaders,
    })
}

/// Walk the extended schedule relative to an event's date (not the wall
/// clock): the next event strictly after it, and the most recent event
/// whose start has passed, irrespective of completion status.
pub fn neighbors<'a>(
    extended: &'a [Event],
    relative_to: DateTime<Utc>,
) -> (Option<&'a Event>, Option<&'a Event>) {
    let next = extended
        .iter()
        .filter(|e| e.start_time > relative_to)
        .min_by_key(|e| e.start_time);
    let last = extended
        .iter()
        .filter(|e| e.start_time < relative_to)
        .max_by_key(|e| e.start_time);
    (next, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventState, EventStatus, SeasonType, Venue};
    use chrono::TimeZone;

    fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.to_string(),
            provider: "espn".to_string(),
            name: name.to_string(),
            short_name: name.to_string(),
            abbreviation: String::new(),
            league: "nba".to_string(),
            sport: "basketball".to_string(),
            logo_url: None,
            color: None,
        }
    }

    fn game(
        id: &str,
        day: u32,
        home: Team,
        away: Team,
        scores: Option<(i32, i32)>,
    ) -> Event {
        Event {
            id: id.to_string(),
            provider: "espn".to_string(),
            name: format!("{} vs {}", home.name, away.name),
            short_name: String::new(),
            start_time: Utc.with_ymd_and_hms(2026, 1, day, 19, 0, 0).unwrap(),
            home_team: home,
            away_team: away,
            status: EventStatus {
                state: if scores.is_some() {
                    EventState::Final
                } else {
                    EventState::Scheduled
                },
                detail: None,
                period: None,
                clock: None,
            },
            league: "nba".to_string(),
            sport: "basketball".to_string(),
            home_score: scores.map(|(h, _)| h),
            away_score: scores.map(|(_, a)| a),
            venue: Some(Venue {
                name: "Arena".to_string(),
                city: None,
                state: None,
                country: None,
            }),
            broadcasts: vec![],
            season_year: Some(2026),
            season_type: Some(SeasonType::Regular),
            main_card_start: None,
        }
    }

    fn pistons() -> Team {
        team("8", "Detroit Pistons")
    }

    fn bulls() -> Team {
        team("4", "Chicago Bulls")
    }

    #[test]
    fn test_determine_home_away_by_id() {
        let e = game("1", 5, pistons(), bulls(), None);
        let (is_home, us, them) = determine_home_away(&e, "8", "").unwrap();
        assert!(is_home);
        assert_eq!(us.name, "Detroit Pistons");
        assert_eq!(them.name, "Chicago Bulls");

        let (is_home, _, _) = determine_home_away(&e, "4", "").unwrap();
        assert!(!is_home);
        assert!(determine_home_away(&e, "99", "").is_none());
    }

    #[test]
    fn test_determine_home_away_name_fallback() {
        let mut e = game("1", 5, pistons(), bulls(), None);
        e.home_team.id = String::new();
        let (is_home, _, _) = determine_home_away(&e, "", "detroit  PISTONS").unwrap();
        assert!(is_home);
    }

    #[test]
    fn test_h2h_counts_and_last_meeting() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let events = vec![
            game("1", 5, pistons(), bulls(), Some((110, 100))), // home win
            game("2", 10, bulls(), pistons(), Some((98, 104))), // away win
            game("3", 15, pistons(), bulls(), Some((90, 95))),  // home loss
            game("4", 25, pistons(), bulls(), None),            // future, ignored
        ];
        let h2h = calculate_h2h("8", "Detroit Pistons", "4", "Chicago Bulls", &events, now);
        assert_eq!(h2h.team_wins, 2);
        assert_eq!(h2h.opponent_wins, 1);
        assert_eq!(h2h.games.len(), 3);
        assert!(h2h.is_rematch());
        assert_eq!(h2h.last_result, Some(GameResult::Loss));
        assert_eq!(h2h.last_team_score.as_deref(), Some("90"));
        assert_eq!(h2h.last_opponent_score.as_deref(), Some("95"));
        assert_eq!(h2h.days_since, Some(4));
    }

    #[test]
    fn test_h2h_empty_for_stranger() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let events = vec![game("1", 5, pistons(), bulls(), Some((110, 100)))];
        let h2h = calculate_h2h("8", "Detroit Pistons", "77", "Denver Nuggets", &events, now);
        assert!(!h2h.is_rematch());
        assert_eq!(h2h.team_wins, 0);
    }

    #[test]
    fn test_streaks_home_away_split() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let other = team("30", "Boston Celtics");
        let events = vec![
            game("1", 2, pistons(), bulls(), Some((100, 90))),  // home W
            game("2", 4, pistons(), other.clone(), Some((105, 99))), // home W
            game("3", 6, bulls(), pistons(), Some((110, 100))), // away L
            game("4", 8, other.clone(), pistons(), Some((88, 92))), // away W
        ];
        let streaks = calculate_streaks("8", "Detroit Pistons", "nba", &events, now);
        assert_eq!(streaks.home_streak, "W2");
        assert_eq!(streaks.away_streak, "W1");
        assert_eq!(streaks.last_5_record, "3-1");
    }

    #[test]
    fn test_streaks_draw_yields_empty() {
        let now = Utc.with_ymd_and_hms(2026, 1, 20, 0, 0, 0).unwrap();
        let liverpool = Team {
            league: "eng.1".to_string(),
            sport: "soccer".to_string(),
            ..team("364", "Liverpool")
        };
        let everton = Team {
            league: "eng.1".to_string(),
            sport: "soccer".to_string(),
            ..team("368", "Everton")
        };
        let mut draw = game("1", 10, liverpool.clone(), everton.clone(), Some((1, 1)));
        draw.league = "eng.1".to_string();
        let mut win = game("2", 5, liverpool.clone(), everton, Some((2, 0)));
        win.league = "eng.1".to_string();
        let streaks = calculate_streaks("364", "Liverpool", "eng.1", &[win, draw], now);
        // Most recent home game was a draw: streak renders empty.
        assert_eq!(streaks.home_streak, "");
        // Soccer form uses W-D-L.
        assert_eq!(streaks.last_5_record, "1-1-0");
    }

    #[test]
    fn test_neighbors_relative_to_event_date() {
        let events = vec![
            game("1", 5, pistons(), bulls(), Some((100, 90))),
            game("2", 10, pistons(), bulls(), None),
            game("3", 15, pistons(), bulls(), None),
        ];
        let anchor = Utc.with_ymd_and_hms(2026, 1, 10, 19, 0, 0).unwrap();
        let (next, last) = neighbors(&events, anchor);
        assert_eq!(next.unwrap().id, "3");
        assert_eq!(last.unwrap().id, "1");
    }
}
