//! TheSportsDB provider: fallback source for leagues ESPN lacks.
//!
//! The free tier caps schedule depth and request rate, so this provider
//! reports `is_premium() == false` and the registry prefers it only when
//! no premium provider supports the league.

use super::SportsProvider;
use crate::clients::TsdbClient;
use crate::types::{EnrichedEvent, Event, EventState, EventStatus, Team, TeamStats, Venue};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// TheSportsDB provider with a league-code → TSDB id mapping injected by
/// the registry at initialize time.
pub struct TsdbProvider {
    client: TsdbClient,
    /// canonical league code → TSDB numeric league id
    league_ids: Arc<RwLock<FxHashMap<String, String>>>,
}

impl TsdbProvider {
    pub fn new() -> Self {
        Self {
            client: TsdbClient::default(),
            league_ids: Arc::new(RwLock::new(FxHashMap::default())),
        }
    }

    pub fn with_client(client: TsdbClient) -> Self {
        Self {
            client,
            league_ids: Arc::new(RwLock::new(FxHashMap::default())),
        }
    }

    pub fn client(&self) -> &TsdbClient {
        &self.client
    }

    /// Inject league mappings (called from registry initialization).
    pub fn set_league_mappings(&self, mappings: FxHashMap<String, String>) {
        *self.league_ids.write() = mappings;
    }

    fn league_id(&self, league: &str) -> Option<String> {
        self.league_ids.read().get(league).cloned()
    }
}

impl Default for TsdbProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn team_from_name(id: &str, name: &str, league: &str, sport: &str) -> Team {
    Team {
        id: id.to_string(),
        provider: "tsdb".to_string(),
        name: name.to_string(),
        short_name: name.to_string(),
        abbreviation: String::new(),
        league: league.to_string(),
        sport: sport.to_string(),
        logo_url: None,
        color: None,
    }
}

fn parse_tsdb_event(item: &Value, league: &str) -> Option<Event> {
    let id = item["idEvent"].as_str()?.to_string();
    let sport = item["strSport"]
        .as_str()
        .unwrap_or_default()
        .to_lowercase();

    let start_time = parse_tsdb_datetime(item)?;
    let home_name = item["strHomeTeam"].as_str().unwrap_or_default();
    let away_name = item["strAwayTeam"].as_str().unwrap_or_default();
    let name = item["strEvent"].as_str().unwrap_or_default().to_string();

    let (home_team, away_team) = if home_name.is_empty() && away_name.is_empty() {
        let placeholder = Team::placeholder(&name, "tsdb", league, &sport);
        (placeholder.clone(), placeholder)
    } else {
        (
            team_from_name(
                item["idHomeTeam"].as_str().unwrap_or_default(),
                home_name,
                league,
                &sport,
            ),
            team_from_name(
                item["idAwayTeam"].as_str().unwrap_or_default(),
                away_name,
                league,
                &sport,
            ),
        )
    };

    let status_raw = item["strStatus"].as_str().unwrap_or_default();
    let state = match status_raw {
        "" | "Not Started" | "NS" => EventState::Scheduled,
        "Match Finished" | "FT" | "AOT" => EventState::Final,
        "Postponed" => EventState::Postponed,
        "Cancelled" => EventState::Cancelled,
        _ => EventState::parse(status_raw),
    };

    Some(Event {
        id,
        provider: "tsdb".to_string(),
        name: name.clone(),
        short_name: name,
        start_time,
        home_team,
        away_team,
        status: EventStatus {
            state,
            detail: None,
            period: None,
            clock: None,
        },
        league: league.to_string(),
        sport,
        home_score: item["intHomeScore"]
            .as_str()
            .and_then(|s| s.parse().ok()),
        away_score: item["intAwayScore"]
            .as_str()
            .and_then(|s| s.parse().ok()),
        venue: item["strVenue"]
            .as_str()
            .filter(|v| !v.is_empty())
            .map(|v| Venue {
                name: v.to_string(),
                city: None,
                state: None,
                country: item["strCountry"].as_str().map(|c| c.to_string()),
            }),
        broadcasts: Vec::new(),
        season_year: None,
        season_type: None,
        main_card_start: None,
    })
}

fn parse_tsdb_datetime(item: &Value) -> Option<DateTime<Utc>> {
    // Preferred: strTimestamp "2026-02-11T19:00:00"; fallback: date + time.
    if let Some(ts) = item["strTimestamp"].as_str() {
        if let Ok(naive) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S") {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    let date = item["dateEvent"].as_str()?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = item["strTime"]
        .as_str()
        .and_then(|t| NaiveTime::parse_from_str(t, "%H:%M:%S").ok())
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("midnight"));
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

#[async_trait]
impl SportsProvider for TsdbProvider {
    fn name(&self) -> &str {
        "tsdb"
    }

    fn supports_league(&self, league: &str) -> bool {
        self.league_ids.read().contains_key(league)
    }

    fn is_premium(&self) -> bool {
        false
    }

    async fn get_events(&self, league: &str, date: NaiveDate) -> Result<Vec<EnrichedEvent>> {
        let Some(league_id) = self.league_id(league) else {
            return Ok(Vec::new());
        };
        let data = self.client.events_on_day(&league_id, date).await?;
        let mut events = Vec::new();
        if let Some(items) = data["events"].as_array() {
            for item in items {
                if let Some(event) = parse_tsdb_event(item, league) {
                    // TSDB carries no odds; events come back bare.
                    events.push(EnrichedEvent::bare(event));
                } else {
                    debug!("[TSDB] Dropping malformed event in {}", league);
                }
            }
        }
        Ok(events)
    }

    async fn get_team_schedule(
        &self,
        team_id: &str,
        league: &str,
        _days_ahead: u32,
    ) -> Result<Vec<Event>> {
        // Free tier: next 5 + last 5 events per team.
        let mut events = Vec::new();
        let next = self.client.next_events(team_id).await?;
        if let Some(items) = next["events"].as_array() {
            events.extend(items.iter().filter_map(|i| parse_tsdb_event(i, league)));
        }
        let last = self.client.last_events(team_id).await?;
        if let Some(items) = last["results"]
            .as_array()
            .or_else(|| last["events"].as_array())
        {
            events.extend(items.iter().filter_map(|i| parse_tsdb_event(i, league)));
        }
        events.sort_by_key(|e| e.start_time);
        Ok(events)
    }

    async fn get_team(&self, team_id: &str, league: &str) -> Result<Option<Team>> {
        let data = self.client.team(team_id).await?;
        let Some(item) = data["teams"].as_array().and_then(|t| t.first()) else {
            return Ok(None);
        };
        let name = item["strTeam"].as_str().unwrap_or_default();
        if name.is_empty() {
            return Ok(None);
        }
        let mut team = team_from_name(team_id, name, league, item["strSport"].as_str().unwrap_or_default());
        team.short_name = item["strTeamShort"]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or(name)
            .to_string();
        team.logo_url = item["strBadge"].as_str().map(|s| s.to_string());
        Ok(Some(team))
    }

    async fn get_event(&self, _event_id: &str, _league: &str) -> Result<Option<Event>> {
        // Free tier has no single-event lookup worth a quota hit.
        Ok(None)
    }

    async fn get_team_stats(&self, _team_id: &str, _league: &str) -> Result<Option<TeamStats>> {
        // TSDB has no standings endpoint on the free tier.
        Ok(None)
    }

    fn rate_limit_stats(&self) -> Option<crate::rate_limit::RateLimitStats> {
        Some(self.client.rate_limit_stats())
    }

    fn reset_rate_limit_stats(&self) {
        self.client.reset_rate_limit_stats();
    }

    async fn list_leagues(&self, sport: &str) -> Result<Vec<(String, String)>> {
        let data = self.client.leagues().await?;
        let mut leagues = Vec::new();
        if let Some(items) = data["leagues"].as_array() {
            for item in items {
                let league_sport = item["strSport"].as_str().unwrap_or_default();
                if !sport.is_empty() && !league_sport.eq_ignore_ascii_case(sport) {
                    continue;
                }
                if let (Some(id), Some(name)) =
                    (item["idLeague"].as_str(), item["strLeague"].as_str())
                {
                    leagues.push((id.to_string(), name.to_string()));
                }
            }
        }
        Ok(leagues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mapped_provider() -> TsdbProvider {
        let provider = TsdbProvider::new();
        let mut mappings = FxHashMap::default();
        mappings.insert("liiga".to_string(), "4444".to_string());
        provider.set_league_mappings(mappings);
        provider
    }

    #[test]
    fn test_supports_only_mapped_leagues() {
        let provider = mapped_provider();
        assert!(provider.supports_league("liiga"));
        assert!(!provider.supports_league("nba"));
        assert!(!provider.is_premium());
    }

    #[test]
    fn test_parse_event_timestamp() {
        let item = json!({
            "idEvent": "2070661",
            "strEvent": "HIFK vs Tappara",
            "strSport": "Ice Hockey",
            "strTimestamp": "2026-02-11T17:30:00",
            "strHomeTeam": "HIFK",
            "strAwayTeam": "Tappara",
            "idHomeTeam": "135249",
            "idAwayTeam": "135250",
            "strStatus": "Not Started"
        });
        let event = parse_tsdb_event(&item, "liiga").unwrap();
        assert_eq!(
            event.start_time,
            Utc.with_ymd_and_hms(2026, 2, 11, 17, 30, 0).unwrap()
        );
        assert_eq!(event.status.state, EventState::Scheduled);
        assert_eq!(event.home_team.name, "HIFK");
    }

    #[test]
    fn test_parse_event_date_fallback_and_scores() {
        let item = json!({
            "idEvent": "2070662",
            "strEvent": "Lukko vs Kärpät",
            "strSport": "Ice Hockey",
            "dateEvent": "2026-02-10",
            "strTime": "18:00:00",
            "strHomeTeam": "Lukko",
            "strAwayTeam": "Kärpät",
            "intHomeScore": "3",
            "intAwayScore": "2",
            "strStatus": "Match Finished"
        });
        let event = parse_tsdb_event(&item, "liiga").unwrap();
        assert_eq!(event.home_score, Some(3));
        assert_eq!(event.away_score, Some(2));
        assert_eq!(event.status.state, EventState::Final);
    }
}
