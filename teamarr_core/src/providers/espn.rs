//! ESPN provider: parses ESPN JSON payloads into canonical values.
//!
//! The raw client (`clients::espn`) fetches; everything here is shape
//! translation. ESPN scoreboard and schedule payloads differ in small
//! ways (score encoding, odds presence), handled by the two parse paths.

use super::SportsProvider;
use crate::clients::EspnClient;
use crate::league_config;
use crate::types::{
    EnrichedEvent, Event, EventState, EventStatus, LeaderLine, PlayerLeaders, SeasonType, Team,
    TeamStats, Venue,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use tracing::{debug, warn};

/// ESPN sports data provider.
pub struct EspnProvider {
    client: EspnClient,
}

impl EspnProvider {
    pub fn new() -> Self {
        Self {
            client: EspnClient::new(),
        }
    }

    pub fn with_client(client: EspnClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &EspnClient {
        &self.client
    }

    fn api_path(league: &str) -> (String, String) {
        league_config::api_path(league)
    }
}

impl Default for EspnProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SportsProvider for EspnProvider {
    fn name(&self) -> &str {
        "espn"
    }

    fn supports_league(&self, league: &str) -> bool {
        // ESPN serves every configured league plus arbitrary soccer slugs.
        league_config::get_league_config(league).is_some() || league.contains('.')
    }

    async fn get_events(&self, league: &str, date: NaiveDate) -> Result<Vec<EnrichedEvent>> {
        let (sport, api_league) = Self::api_path(league);
        let data = self.client.scoreboard(&sport, &api_league, date).await?;
        Ok(parse_scoreboard(&data, league, &sport))
    }

    async fn get_team_schedule(
        &self,
        team_id: &str,
        league: &str,
        _days_ahead: u32,
    ) -> Result<Vec<Event>> {
        let (sport, api_league) = Self::api_path(league);
        let data = self.client.team_schedule(&sport, &api_league, team_id).await?;
        Ok(parse_schedule(&data, league, &sport))
    }

    async fn get_team(&self, team_id: &str, league: &str) -> Result<Option<Team>> {
        let (sport, api_league) = Self::api_path(league);
        let data = self.client.team(&sport, &api_league, team_id).await?;
        Ok(parse_team(&data["team"], league, &sport))
    }

    async fn get_event(&self, event_id: &str, league: &str) -> Result<Option<Event>> {
        let (sport, api_league) = Self::api_path(league);
        let data = self.client.summary(&sport, &api_league, event_id).await?;
        Ok(parse_summary_event(&data, event_id, league, &sport))
    }

    async fn get_team_stats(&self, team_id: &str, league: &str) -> Result<Option<TeamStats>> {
        let (sport, api_league) = Self::api_path(league);
        let data = self.client.team(&sport, &api_league, team_id).await?;
        Ok(parse_team_stats(&data["team"]))
    }

    async fn get_head_coach(&self, team_id: &str, league: &str) -> Result<Option<String>> {
        let (sport, api_league) = Self::api_path(league);
        let data = self.client.roster(&sport, &api_league, team_id).await?;
        Ok(parse_head_coach(&data))
    }

    async fn get_player_leaders(
        &self,
        event_id: &str,
        team_id: &str,
        league: &str,
    ) -> Result<Option<PlayerLeaders>> {
        let (sport, api_league) = Self::api_path(league);
        let data = self.client.summary(&sport, &api_league, event_id).await?;
        Ok(parse_player_leaders(&data, team_id, &sport))
    }

    async fn list_teams(&self, league: &str) -> Result<Vec<Team>> {
        let (sport, api_league) = Self::api_path(league);
        let data = self.client.teams(&sport, &api_league).await?;
        let mut teams = Vec::new();
        if let Some(items) = data["sports"][0]["leagues"][0]["teams"].as_array() {
            for item in items {
                if let Some(team) = parse_team(&item["team"], league, &sport) {
                    teams.push(team);
                }
            }
        }
        Ok(teams)
    }

    fn rate_limit_stats(&self) -> Option<crate::rate_limit::RateLimitStats> {
        Some(self.client.rate_limit_stats())
    }

    fn reset_rate_limit_stats(&self) {
        self.client.reset_rate_limit_stats();
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

fn parse_start_time(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?;
    // ESPN dates look like "2026-02-11T19:00Z" or full RFC 3339.
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(&raw.replace('Z', "+00:00")))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn parse_status(status: &Value) -> EventStatus {
    let state_raw = status["type"]["state"]
        .as_str()
        .or_else(|| status["type"]["name"].as_str())
        .unwrap_or("scheduled");
    let state = match state_raw {
        "pre" => EventState::Scheduled,
        "in" => EventState::Live,
        "post" => {
            // "post" covers final, postponed, and cancelled; the type name
            // disambiguates.
            let name = status["type"]["name"].as_str().unwrap_or_default();
            if name.contains("POSTPONED") {
                EventState::Postponed
            } else if name.contains("CANCELED") || name.contains("CANCELLED") {
                EventState::Cancelled
            } else {
                EventState::Final
            }
        }
        other => EventState::parse(other),
    };
    EventStatus {
        state,
        detail: status["type"]["shortDetail"]
            .as_str()
            .map(|s| s.to_string()),
        period: status["period"].as_u64().map(|p| p as u32),
        clock: status["displayClock"].as_str().map(|s| s.to_string()),
    }
}

fn parse_competitor_team(comp: &Value, league: &str, sport: &str) -> Option<Team> {
    parse_team(&comp["team"], league, sport)
}

/// Parse an ESPN team object (shared by scoreboard, schedule, team info).
pub(crate) fn parse_team(team: &Value, league: &str, sport: &str) -> Option<Team> {
    let id = team["id"].as_str().map(|s| s.to_string()).or_else(|| {
        team["id"].as_i64().map(|n| n.to_string())
    })?;
    let name = team["displayName"]
        .as_str()
        .or_else(|| team["name"].as_str())?
        .to_string();
    let logo_url = team["logos"][0]["href"]
        .as_str()
        .or_else(|| team["logo"].as_str())
        .map(|s| s.to_string());
    Some(Team {
        id,
        provider: "espn".to_string(),
        name: name.clone(),
        short_name: team["shortDisplayName"]
            .as_str()
            .unwrap_or(&name)
            .to_string(),
        abbreviation: str_field(team, "abbreviation"),
        league: league.to_string(),
        sport: sport.to_string(),
        logo_url,
        color: team["color"].as_str().map(|s| s.to_string()),
    })
}

fn parse_venue(venue: &Value) -> Option<Venue> {
    let name = venue["fullName"].as_str().or_else(|| venue["name"].as_str())?;
    Some(Venue {
        name: name.to_string(),
        city: venue["address"]["city"].as_str().map(|s| s.to_string()),
        state: venue["address"]["state"].as_str().map(|s| s.to_string()),
        country: venue["address"]["country"].as_str().map(|s| s.to_string()),
    })
}

/// Broadcast names from a competition, radio filtered out.
pub(crate) fn parse_broadcasts(competition: &Value) -> Vec<String> {
    let mut names = Vec::new();
    if let Some(broadcasts) = competition["broadcasts"].as_array() {
        for broadcast in broadcasts {
            let is_radio = broadcast["type"]["shortName"]
                .as_str()
                .map(|t| t.eq_ignore_ascii_case("radio"))
                .unwrap_or(false)
                || broadcast["media"]["shortName"]
                    .as_str()
                    .map(|m| m.to_lowercase().contains("radio"))
                    .unwrap_or(false);
            if is_radio {
                continue;
            }
            // Scoreboard shape: {names: ["ESPN"]}; summary shape: {media:{shortName}}.
            if let Some(list) = broadcast["names"].as_array() {
                for n in list {
                    if let Some(n) = n.as_str() {
                        if !names.iter().any(|e| e == n) {
                            names.push(n.to_string());
                        }
                    }
                }
            } else if let Some(n) = broadcast["media"]["shortName"].as_str() {
                if !names.iter().any(|e| e == n) {
                    names.push(n.to_string());
                }
            }
        }
    }
    names
}

/// Odds details from a competition: (favorite, spread, over/under).
pub(crate) fn parse_odds(
    competition: &Value,
) -> (bool, Option<String>, Option<String>, Option<String>) {
    let odds = &competition["odds"][0];
    if odds.is_null() {
        return (false, None, None, None);
    }
    let details = odds["details"].as_str().map(|s| s.to_string());
    let favorite = details
        .as_deref()
        .and_then(|d| d.split_whitespace().next())
        .filter(|tok| tok.chars().any(|c| c.is_alphabetic()))
        .map(|s| s.to_string());
    let over_under = odds["overUnder"]
        .as_f64()
        .map(|v| format!("{v}"))
        .or_else(|| odds["overUnder"].as_str().map(|s| s.to_string()));
    (true, favorite, details, over_under)
}

fn score_from_competitor(comp: &Value) -> Option<i32> {
    // Scoreboard: score is a string; schedule: {value: f64}.
    comp["score"]
        .as_str()
        .and_then(|s| s.parse::<i32>().ok())
        .or_else(|| comp["score"]["value"].as_f64().map(|v| v as i32))
        .or_else(|| comp["score"].as_i64().map(|v| v as i32))
}

fn parse_competition_event(
    event: &Value,
    competition: &Value,
    league: &str,
    sport: &str,
) -> Option<Event> {
    let id = event["id"].as_str()?.to_string();
    let start_time = parse_start_time(&event["date"])
        .or_else(|| parse_start_time(&competition["date"]))?;

    let competitors = competition["competitors"].as_array()?;
    let mut home_team = None;
    let mut away_team = None;
    let mut home_score = None;
    let mut away_score = None;
    for comp in competitors {
        let team = parse_competitor_team(comp, league, sport);
        let score = score_from_competitor(comp);
        if comp["homeAway"].as_str() == Some("home") {
            home_team = team;
            home_score = score;
        } else {
            away_team = team;
            away_score = score;
        }
    }

    // Tournament-style payloads (racing, golf) have no competitor teams;
    // represent the event itself on both sides.
    let (home_team, away_team) = match (home_team, away_team) {
        (Some(h), Some(a)) => (h, a),
        _ => {
            let name = event["name"].as_str().unwrap_or(&id);
            let placeholder = Team::placeholder(name, "espn", league, sport);
            (placeholder.clone(), placeholder)
        }
    };

    let season_type = event["season"]["type"]
        .as_i64()
        .and_then(SeasonType::from_espn);

    Some(Event {
        id,
        provider: "espn".to_string(),
        name: str_field(event, "name"),
        short_name: str_field(event, "shortName"),
        start_time,
        home_team,
        away_team,
        status: parse_status(&event["status"]),
        league: league.to_string(),
        sport: sport.to_string(),
        home_score,
        away_score,
        venue: parse_venue(&competition["venue"]),
        broadcasts: parse_broadcasts(competition),
        season_year: event["season"]["year"].as_i64().map(|y| y as i32),
        season_type,
        main_card_start: parse_start_time(&competition["mainCardDate"]),
    })
}

/// Parse a scoreboard payload into enriched events (live fields + odds).
pub(crate) fn parse_scoreboard(data: &Value, league: &str, sport: &str) -> Vec<EnrichedEvent> {
    let mut events = Vec::new();
    if let Some(items) = data["events"].as_array() {
        for item in items {
            let competition = &item["competitions"][0];
            match parse_competition_event(item, competition, league, sport) {
                Some(event) => {
                    let (has_odds, odds_favorite, odds_spread, odds_over_under) =
                        parse_odds(competition);
                    events.push(EnrichedEvent {
                        event,
                        has_odds,
                        odds_favorite,
                        odds_spread,
                        odds_over_under,
                    });
                }
                None => {
                    debug!(
                        "[ESPN] Dropping malformed scoreboard event in {}",
                        league
                    );
                }
            }
        }
    }
    events
}

/// Parse a team schedule payload into events.
pub(crate) fn parse_schedule(data: &Value, league: &str, sport: &str) -> Vec<Event> {
    let mut events = Vec::new();
    if let Some(items) = data["events"].as_array() {
        for item in items {
            let competition = &item["competitions"][0];
            match parse_competition_event(item, competition, league, sport) {
                Some(event) => events.push(event),
                None => warn!("[ESPN] Dropping malformed schedule event in {}", league),
            }
        }
    }
    events
}

/// Parse a summary payload into a single event.
pub(crate) fn parse_summary_event(
    data: &Value,
    event_id: &str,
    league: &str,
    sport: &str,
) -> Option<Event> {
    let header = &data["header"];
    let competition = &header["competitions"][0];
    if competition.is_null() {
        return None;
    }
    // The header carries no top-level id/date; splice the pieces together.
    let mut synthetic = serde_json::json!({
        "id": header["id"].as_str().unwrap_or(event_id),
        "name": data["gameInfo"]["name"],
        "shortName": header["shortName"],
        "date": competition["date"],
        "status": competition["status"],
        "season": header["season"],
    });
    if synthetic["name"].is_null() {
        synthetic["name"] = competition["competitors"][0]["team"]["displayName"].clone();
    }
    parse_competition_event(&synthetic, competition, league, sport)
}

fn record_item<'a>(items: &'a [Value], record_type: &str) -> Option<&'a Value> {
    items.iter().find(|i| i["type"].as_str() == Some(record_type))
}

fn record_stat(item: &Value, name: &str) -> Option<f64> {
    item["stats"]
        .as_array()?
        .iter()
        .find(|s| s["name"].as_str() == Some(name))
        .and_then(|s| s["value"].as_f64())
}

/// Parse team statistics from the team info payload.
pub(crate) fn parse_team_stats(team: &Value) -> Option<TeamStats> {
    let items: Vec<Value> = team["record"]["items"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    let overall = record_item(&items, "total")?;

    let record = overall["summary"].as_str().unwrap_or_default().to_string();
    let wins = record_stat(overall, "wins").unwrap_or(0.0) as i32;
    let losses = record_stat(overall, "losses").unwrap_or(0.0) as i32;
    let ties = record_stat(overall, "ties").unwrap_or(0.0) as i32;
    let streak = record_stat(overall, "streak").unwrap_or(0.0) as i32;

    let games_played = (wins + losses + ties).max(0);
    let ppg = record_stat(overall, "avgPointsFor").or_else(|| {
        record_stat(overall, "pointsFor")
            .filter(|_| games_played > 0)
            .map(|total| total / f64::from(games_played))
    });
    let papg = record_stat(overall, "avgPointsAgainst").or_else(|| {
        record_stat(overall, "pointsAgainst")
            .filter(|_| games_played > 0)
            .map(|total| total / f64::from(games_played))
    });

    Some(TeamStats {
        record,
        wins,
        losses,
        ties,
        home_record: record_item(&items, "home")
            .and_then(|i| i["summary"].as_str())
            .map(|s| s.to_string()),
        away_record: record_item(&items, "road")
            .or_else(|| record_item(&items, "away"))
            .and_then(|i| i["summary"].as_str())
            .map(|s| s.to_string()),
        streak: match streak {
            s if s > 0 => Some(format!("W{s}")),
            s if s < 0 => Some(format!("L{}", -s)),
            _ => None,
        },
        streak_count: streak,
        rank: team["rank"].as_u64().map(|r| r as u32).filter(|r| *r > 0),
        playoff_seed: record_stat(overall, "playoffSeed")
            .map(|s| s as u32)
            .filter(|s| *s > 0),
        games_back: record_stat(overall, "gamesBehind"),
        conference: team["groups"]["parent"]["name"]
            .as_str()
            .or_else(|| team["conference"]["name"].as_str())
            .map(|s| s.to_string()),
        conference_abbrev: team["groups"]["parent"]["abbreviation"]
            .as_str()
            .map(|s| s.to_string()),
        division: team["groups"]["name"].as_str().map(|s| s.to_string()),
        ppg,
        papg,
    })
}

/// Game leaders for one team from a summary payload, sport-dispatched:
/// scoring lines for basketball, yardage lines for football.
pub(crate) fn parse_player_leaders(data: &Value, team_id: &str, sport: &str) -> Option<PlayerLeaders> {
    let team_block = data["leaders"].as_array()?.iter().find(|block| {
        block["team"]["id"].as_str() == Some(team_id)
    })?;
    let categories = team_block["leaders"].as_array()?;

    let line_for = |category: &str| -> Option<LeaderLine> {
        let entry = categories
            .iter()
            .find(|c| c["name"].as_str() == Some(category))?;
        let leader = entry["leaders"].as_array()?.first()?;
        let player = leader["athlete"]["shortName"]
            .as_str()
            .or_else(|| leader["athlete"]["displayName"].as_str())?;
        let value = leader["displayValue"].as_str()?;
        Some(LeaderLine {
            player: player.to_string(),
            value: value.to_string(),
        })
    };

    let leaders = match sport {
        "basketball" => PlayerLeaders {
            scoring: line_for("points"),
            rebounds: line_for("rebounds"),
            assists: line_for("assists"),
            ..PlayerLeaders::default()
        },
        "football" => PlayerLeaders {
            passing: line_for("passingYards"),
            rushing: line_for("rushingYards"),
            receiving: line_for("receivingYards"),
            ..PlayerLeaders::default()
        },
        _ => PlayerLeaders::default(),
    };

    (!leaders.is_empty()).then_some(leaders)
}

/// Head coach display name from a roster payload.
pub(crate) fn parse_head_coach(data: &Value) -> Option<String> {
    let coaches = data["coach"].as_array()?;
    let head = coaches.first()?;
    let first = head["firstName"].as_str().unwrap_or_default();
    let last = head["lastName"].as_str().unwrap_or_default();
    if first.is_empty() && last.is_empty() {
        return None;
    }
    Some(format!("{first} {last}").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scoreboard_payload() -> Value {
        json!({
            "events": [{
                "id": "401585601",
                "name": "Detroit Pistons at Chicago Bulls",
                "shortName": "DET @ CHI",
                "date": "2026-02-11T00:00Z",
                "season": {"year": 2026, "type": 2},
                "status": {
                    "type": {"state": "in", "name": "STATUS_IN_PROGRESS", "shortDetail": "Q2 5:32"},
                    "period": 2,
                    "displayClock": "5:32"
                },
                "competitions": [{
                    "venue": {"fullName": "United Center", "address": {"city": "Chicago", "state": "IL"}},
                    "broadcasts": [
                        {"names": ["ESPN"]},
                        {"names": ["WMVP"], "type": {"shortName": "Radio"}}
                    ],
                    "odds": [{"details": "CHI -3.5", "overUnder": 221.5}],
                    "competitors": [
                        {
                            "homeAway": "home",
                            "score": "55",
                            "team": {"id": "4", "displayName": "Chicago Bulls",
                                     "shortDisplayName": "Bulls", "abbreviation": "CHI"}
                        },
                        {
                            "homeAway": "away",
                            "score": "48",
                            "team": {"id": "8", "displayName": "Detroit Pistons",
                                     "shortDisplayName": "Pistons", "abbreviation": "DET"}
                        }
                    ]
                }]
            }]
        })
    }

    #[test]
    fn test_parse_scoreboard_full_event() {
        let events = parse_scoreboard(&scoreboard_payload(), "nba", "basketball");
        assert_eq!(events.len(), 1);
        let enriched = &events[0];
        let e = &enriched.event;
        assert_eq!(e.id, "401585601");
        assert_eq!(e.home_team.abbreviation, "CHI");
        assert_eq!(e.away_team.abbreviation, "DET");
        assert_eq!(e.home_score, Some(55));
        assert_eq!(e.away_score, Some(48));
        assert_eq!(e.status.state, EventState::Live);
        assert_eq!(e.status.period, Some(2));
        // Radio broadcast filtered out.
        assert_eq!(e.broadcasts, vec!["ESPN".to_string()]);
        assert_eq!(e.venue.as_ref().unwrap().name, "United Center");
        assert_eq!(e.season_type, Some(SeasonType::Regular));
        // Scoreboard enrichment carries the odds.
        assert!(enriched.has_odds);
        assert_eq!(enriched.odds_spread.as_deref(), Some("CHI -3.5"));
    }

    #[test]
    fn test_parse_odds() {
        let payload = scoreboard_payload();
        let competition = &payload["events"][0]["competitions"][0];
        let (has_odds, favorite, spread, over_under) = parse_odds(competition);
        assert!(has_odds);
        assert_eq!(favorite.as_deref(), Some("CHI"));
        assert_eq!(spread.as_deref(), Some("CHI -3.5"));
        assert_eq!(over_under.as_deref(), Some("221.5"));
    }

    #[test]
    fn test_parse_odds_absent() {
        let competition = json!({"competitors": []});
        let (has_odds, favorite, _, _) = parse_odds(&competition);
        assert!(!has_odds);
        assert!(favorite.is_none());
    }

    #[test]
    fn test_malformed_event_dropped() {
        let payload = json!({"events": [{"id": "1", "competitions": [{}]}]});
        let events = parse_scoreboard(&payload, "nba", "basketball");
        assert!(events.is_empty());
    }

    #[test]
    fn test_tournament_event_placeholder_teams() {
        let payload = json!({
            "events": [{
                "id": "600042599",
                "name": "Daytona 500",
                "shortName": "Daytona 500",
                "date": "2026-02-15T19:30Z",
                "status": {"type": {"state": "pre"}},
                "competitions": [{"competitors": []}]
            }]
        });
        let events = parse_scoreboard(&payload, "nascar", "racing");
        assert_eq!(events.len(), 1);
        assert!(events[0].event.is_tournament());
        assert_eq!(events[0].event.home_team.name, "Daytona 500");
        assert!(!events[0].has_odds);
    }

    #[test]
    fn test_parse_postponed_status() {
        let status = json!({"type": {"state": "post", "name": "STATUS_POSTPONED"}});
        assert_eq!(parse_status(&status).state, EventState::Postponed);
        let status = json!({"type": {"state": "post", "name": "STATUS_FINAL"}});
        assert_eq!(parse_status(&status).state, EventState::Final);
    }

    #[test]
    fn test_parse_team_stats() {
        let team = json!({
            "rank": 7,
            "record": {"items": [
                {"type": "total", "summary": "34-18", "stats": [
                    {"name": "wins", "value": 34.0},
                    {"name": "losses", "value": 18.0},
                    {"name": "streak", "value": 3.0},
                    {"name": "playoffSeed", "value": 4.0},
                    {"name": "gamesBehind", "value": 2.5},
                    {"name": "avgPointsFor", "value": 114.2},
                    {"name": "avgPointsAgainst", "value": 108.9}
                ]},
                {"type": "home", "summary": "20-6"},
                {"type": "road", "summary": "14-12"}
            ]},
            "groups": {"name": "Central Division", "parent": {"name": "Eastern Conference", "abbreviation": "East"}}
        });
        let stats = parse_team_stats(&team).unwrap();
        assert_eq!(stats.record, "34-18");
        assert_eq!(stats.wins, 34);
        assert_eq!(stats.streak.as_deref(), Some("W3"));
        assert_eq!(stats.streak_count, 3);
        assert_eq!(stats.rank, Some(7));
        assert_eq!(stats.playoff_seed, Some(4));
        assert_eq!(stats.home_record.as_deref(), Some("20-6"));
        assert_eq!(stats.away_record.as_deref(), Some("14-12"));
        assert_eq!(stats.conference.as_deref(), Some("Eastern Conference"));
        assert_eq!(stats.division.as_deref(), Some("Central Division"));
        assert_eq!(stats.ppg, Some(114.2));
    }

    #[test]
    fn test_parse_player_leaders_basketball() {
        let data = json!({
            "leaders": [{
                "team": {"id": "8"},
                "leaders": [
                    {"name": "points", "leaders": [
                        {"displayValue": "31 PTS", "athlete": {"shortName": "C. Cunningham"}}
                    ]},
                    {"name": "rebounds", "leaders": [
                        {"displayValue": "14 REB", "athlete": {"shortName": "J. Duren"}}
                    ]}
                ]
            }]
        });
        let leaders = parse_player_leaders(&data, "8", "basketball").unwrap();
        assert_eq!(leaders.scoring.as_ref().unwrap().player, "C. Cunningham");
        assert_eq!(leaders.rebounds.as_ref().unwrap().value, "14 REB");
        assert!(leaders.passing.is_none());
        // Wrong team id: nothing.
        assert!(parse_player_leaders(&data, "4", "basketball").is_none());
    }

    #[test]
    fn test_parse_head_coach() {
        let data = json!({"coach": [{"firstName": "Steve", "lastName": "Kerr"}]});
        assert_eq!(parse_head_coach(&data).as_deref(), Some("Steve Kerr"));
        assert_eq!(parse_head_coach(&json!({})), None);
    }

    #[test]
    fn test_schedule_score_value_shape() {
        let payload = json!({
            "events": [{
                "id": "401585000",
                "name": "A at B",
                "shortName": "A @ B",
                "date": "2026-01-05T00:00Z",
                "status": {"type": {"state": "post", "name": "STATUS_FINAL"}},
                "competitions": [{
                    "competitors": [
                        {"homeAway": "home", "score": {"value": 101.0},
                         "team": {"id": "1", "displayName": "B", "abbreviation": "B"}},
                        {"homeAway": "away", "score": {"value": 99.0},
                         "team": {"id": "2", "displayName": "A", "abbreviation": "A"}}
                    ]
                }]
            }]
        });
        let events = parse_schedule(&payload, "nba", "basketball");
        assert_eq!(events[0].home_score, Some(101));
        assert_eq!(events[0].away_score, Some(99));
    }

    #[test]
    fn test_supports_league() {
        let provider = EspnProvider::new();
        assert!(provider.supports_league("nba"));
        assert!(provider.supports_league("ned.1"));
        assert!(!provider.supports_league("liiga"));
    }
}
