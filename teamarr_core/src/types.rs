//! Canonical data model shared across providers, matching, and rendering.
//!
//! Every entity is a plain value with provider-scoped identity:
//! `(id, provider)` is globally unique for teams and events. Providers
//! parse their wire formats into these types; nothing provider-specific
//! crosses a module boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

/// Team identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub provider: String,
    pub name: String,
    pub short_name: String,
    pub abbreviation: String,
    pub league: String,
    /// Sport slug, e.g. "football", "basketball", "soccer"
    pub sport: String,
    pub logo_url: Option<String>,
    pub color: Option<String>,
}

impl Team {
    /// Minimal team used as a placeholder for tournament-style events
    /// where the "home" and "away" sides are the event itself.
    pub fn placeholder(name: &str, provider: &str, league: &str, sport: &str) -> Self {
        Self {
            id: String::new(),
            provider: provider.to_string(),
            name: name.to_string(),
            short_name: name.to_string(),
            abbreviation: String::new(),
            league: league.to_string(),
            sport: sport.to_string(),
            logo_url: None,
            color: None,
        }
    }
}

/// Lifecycle state of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventState {
    Scheduled,
    Live,
    Final,
    Postponed,
    Cancelled,
}

impl EventState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventState::Scheduled => "scheduled",
            EventState::Live => "live",
            EventState::Final => "final",
            EventState::Postponed => "postponed",
            EventState::Cancelled => "cancelled",
        }
    }

    /// Parse a provider status string, tolerating common synonyms.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "live" | "in" | "in_progress" | "inprogress" => EventState::Live,
            "final" | "post" | "completed" | "full-time" | "ft" => EventState::Final,
            "postponed" => EventState::Postponed,
            "cancelled" | "canceled" => EventState::Cancelled,
            _ => EventState::Scheduled,
        }
    }
}

/// Current status of an event with optional live detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStatus {
    pub state: EventState,
    pub detail: Option<String>,
    pub period: Option<u32>,
    pub clock: Option<String>,
}

impl EventStatus {
    pub fn scheduled() -> Self {
        Self {
            state: EventState::Scheduled,
            detail: None,
            period: None,
            clock: None,
        }
    }

    pub fn is_final(&self) -> bool {
        self.state == EventState::Final
    }

    pub fn is_live(&self) -> bool {
        self.state == EventState::Live
    }
}

/// A single sporting event (game, match, or tournament day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub provider: String,
    pub name: String,
    pub short_name: String,
    /// Start instant, always UTC internally.
    pub start_time: DateTime<Utc>,
    pub home_team: Team,
    pub away_team: Team,
    pub status: EventStatus,
    pub league: String,
    pub sport: String,

    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
    pub venue: Option<Venue>,
    #[serde(default)]
    pub broadcasts: Vec<String>,
    pub season_year: Option<i32>,
    pub season_type: Option<SeasonType>,

    /// Combat sports: when the main card begins (prelims start at `start_time`).
    pub main_card_start: Option<DateTime<Utc>>,
}

impl Event {
    /// Tournament-style events (racing, golf, tennis draws) carry the same
    /// placeholder team on both sides.
    pub fn is_tournament(&self) -> bool {
        self.home_team.id == self.away_team.id && self.home_team.name == self.away_team.name
    }

    /// True when `team_id` participates in this event. Falls back to a
    /// normalised-name comparison when provider IDs are missing.
    pub fn involves_team(&self, team_id: &str, team_name: &str) -> bool {
        if !team_id.is_empty()
            && (self.home_team.id == team_id || self.away_team.id == team_id)
        {
            return true;
        }
        let slug = normalize_slug(team_name);
        if slug.is_empty() {
            return false;
        }
        normalize_slug(&self.home_team.name) == slug || normalize_slug(&self.away_team.name) == slug
    }
}

/// Season phase as reported by providers (ESPN numeric convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonType {
    Preseason,
    Regular,
    Postseason,
}

impl SeasonType {
    pub fn from_espn(n: i64) -> Option<Self> {
        match n {
            1 => Some(SeasonType::Preseason),
            2 => Some(SeasonType::Regular),
            3 => Some(SeasonType::Postseason),
            _ => None,
        }
    }
}

/// An [`Event`] composed with late-binding scoreboard data.
///
/// Built once enrichment is complete (build-then-freeze); the inner event
/// is never mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedEvent {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default)]
    pub has_odds: bool,
    pub odds_favorite: Option<String>,
    pub odds_spread: Option<String>,
    pub odds_over_under: Option<String>,
}

impl EnrichedEvent {
    /// Wrap an event with no odds information.
    pub fn bare(event: Event) -> Self {
        Self {
            event,
            has_odds: false,
            odds_favorite: None,
            odds_spread: None,
            odds_over_under: None,
        }
    }
}

impl From<Event> for EnrichedEvent {
    fn from(event: Event) -> Self {
        Self::bare(event)
    }
}

/// Season aggregates for one team.
///
/// Record fields store display strings ("10-2", "8-3-1"); numeric fields
/// carry parsed values for calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TeamStats {
    pub record: String,
    pub wins: i32,
    pub losses: i32,
    pub ties: i32,

    pub home_record: Option<String>,
    pub away_record: Option<String>,

    /// "W3" / "L2" display form.
    pub streak: Option<String>,
    /// Signed: positive = wins, negative = losses.
    pub streak_count: i32,

    /// College ranking 1-25, `None` if unranked.
    pub rank: Option<u32>,
    pub playoff_seed: Option<u32>,
    pub games_back: Option<f64>,

    pub conference: Option<String>,
    pub conference_abbrev: Option<String>,
    pub division: Option<String>,

    pub ppg: Option<f64>,
    pub papg: Option<f64>,
}

/// User-configured team row (persisted; joined with its template at load).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamConfig {
    pub team_id: String,
    pub league: String,
    pub sport: String,
    pub team_name: String,
    pub team_abbrev: String,
    pub logo_url: Option<String>,
    pub channel_number: Option<u32>,

    /// Multi-competition soccer teams: the league whose standings feed stats.
    pub soccer_primary_league: Option<String>,
    pub soccer_primary_league_id: Option<String>,

    #[serde(default = "default_true")]
    pub pregame_enabled: bool,
    #[serde(default = "default_true")]
    pub postgame_enabled: bool,
    #[serde(default = "default_true")]
    pub idle_enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Outcome of a finished game from the configured team's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    Win,
    Loss,
    Tie,
}

impl GameResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameResult::Win => "Win",
            GameResult::Loss => "Loss",
            GameResult::Tie => "Tie",
        }
    }
}

/// One prior meeting between the configured team and an opponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct H2hGame {
    pub event_id: String,
    pub date: DateTime<Utc>,
    pub result: GameResult,
    pub team_score: i32,
    pub opponent_score: i32,
    pub was_home: bool,
}

/// Season series against one opponent plus previous-meeting facts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HeadToHead {
    pub team_wins: u32,
    pub opponent_wins: u32,
    pub last_result: Option<GameResult>,
    pub last_team_score: Option<String>,
    pub last_opponent_score: Option<String>,
    pub last_venue: Option<String>,
    pub days_since: Option<i64>,
    #[serde(default)]
    pub games: Vec<H2hGame>,
}

impl HeadToHead {
    pub fn is_rematch(&self) -> bool {
        !self.games.is_empty()
    }
}

/// Home/away streaks and recent-form records.
///
/// Record formats follow the sport: soccer "W-D-L", otherwise "W-L".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Streaks {
    /// "W3" / "L2" / "" when the most recent home game was a draw.
    pub home_streak: String,
    pub away_streak: String,
    pub last_5_record: String,
    pub last_10_record: String,
}

/// A single statistical leader line ("J. Tatum 27.1 PPG").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderLine {
    pub player: String,
    pub value: String,
}

/// Sport-dispatched player leaders, populated only for completed games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PlayerLeaders {
    /// Basketball: points.
    pub scoring: Option<LeaderLine>,
    pub rebounds: Option<LeaderLine>,
    pub assists: Option<LeaderLine>,
    /// Football: yardage lines.
    pub passing: Option<LeaderLine>,
    pub rushing: Option<LeaderLine>,
    pub receiving: Option<LeaderLine>,
}

impl PlayerLeaders {
    pub fn is_empty(&self) -> bool {
        self.scoring.is_none()
            && self.rebounds.is_none()
            && self.assists.is_none()
            && self.passing.is_none()
            && self.rushing.is_none()
            && self.receiving.is_none()
    }
}

/// Which slot of the current/next/last triad a context fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameSlot {
    Current,
    Next,
    Last,
}

/// Everything the template resolver needs about one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameContext {
    pub event: EnrichedEvent,
    /// `home_team.id == team_id`, with normalised-name fallback.
    pub is_home: bool,
    pub team: Team,
    pub opponent: Team,
    pub team_stats: Option<TeamStats>,
    pub opponent_stats: Option<TeamStats>,
    pub h2h: Option<HeadToHead>,
    pub streaks: Option<Streaks>,
    pub head_coach: Option<String>,
    pub player_leaders: Option<PlayerLeaders>,
}

impl GameContext {
    /// Score for the configured team, if known.
    pub fn team_score(&self) -> Option<i32> {
        if self.is_home {
            self.event.event.home_score
        } else {
            self.event.event.away_score
        }
    }

    /// Score for the opponent, if known.
    pub fn opponent_score(&self) -> Option<i32> {
        if self.is_home {
            self.event.event.away_score
        } else {
            self.event.event.home_score
        }
    }

    /// Outcome from the configured team's perspective; `None` until final.
    pub fn result(&self) -> Option<GameResult> {
        if !self.event.event.status.is_final() {
            return None;
        }
        let (us, them) = (self.team_score()?, self.opponent_score()?);
        Some(if us > them {
            GameResult::Win
        } else if us < them {
            GameResult::Loss
        } else {
            GameResult::Tie
        })
    }
}

/// Clock display preference for rendered times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    #[default]
    TwelveHour,
    TwentyFourHour,
}

/// Top-level rendering input: one team, one optional game triad, and the
/// user's display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateContext {
    pub team_config: TeamConfig,
    pub team_stats: Option<TeamStats>,
    /// Current game, when rendering a game programme.
    pub game: Option<GameContext>,
    pub next_game: Option<GameContext>,
    pub last_game: Option<GameContext>,

    pub epg_timezone: String,
    pub time_format: TimeFormat,
    pub show_timezone: bool,
    /// Reference instant for relative variables (days_until). Captured
    /// once per cycle so resolution stays a pure function of the context.
    pub now: DateTime<Utc>,
}

impl TemplateContext {
    /// Context with no games at all (offseason idle rendering).
    pub fn team_only(team_config: TeamConfig, team_stats: Option<TeamStats>) -> Self {
        Self {
            team_config,
            team_stats,
            game: None,
            next_game: None,
            last_game: None,
            epg_timezone: "UTC".to_string(),
            time_format: TimeFormat::default(),
            show_timezone: false,
            now: Utc::now(),
        }
    }
}

/// Display status of a rendered programme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgrammeStatus {
    Scheduled,
    InProgress,
    Final,
    Filler,
}

/// Kind of synthesized filler programme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillerType {
    Pregame,
    Postgame,
    Idle,
}

impl FillerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillerType::Pregame => "pregame",
            FillerType::Postgame => "postgame",
            FillerType::Idle => "idle",
        }
    }
}

/// Output of rendering: one EPG programme with resolved fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedProgramme {
    pub start_datetime: DateTime<Utc>,
    pub end_datetime: DateTime<Utc>,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub program_art_url: Option<String>,
    pub status: ProgrammeStatus,

    /// Snapshot of resolved variables for late category resolution.
    #[serde(default)]
    pub template_vars: serde_json::Value,

    /// Source event id when this programme wraps a real game.
    pub event_id: Option<String>,

    #[serde(default)]
    pub is_filler: bool,
    pub filler_type: Option<FillerType>,
}

/// Persistent record of a downstream channel Teamarr owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedChannel {
    pub id: i64,
    pub dispatcharr_channel_id: i64,
    pub channel_number: u32,
    pub tvg_id: String,
    pub channel_name: String,
    pub event_epg_group_id: i64,
    pub event_id: String,
    /// Variant channels (Spanish, French feeds); `None` for the main feed.
    pub exception_keyword: Option<String>,
    pub scheduled_create_at: Option<DateTime<Utc>>,
    pub scheduled_delete_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ManagedChannel {
    pub fn is_main(&self) -> bool {
        self.exception_keyword.as_deref().map_or(true, str::is_empty)
    }
}

/// tvg_id convention for managed event channels.
pub fn event_tvg_id(event_id: &str) -> String {
    format!("teamarr-event-{event_id}")
}

/// Lowercase alphanumeric slug used for name-fallback identity checks.
pub fn normalize_slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn team(id: &str, name: &str, abbr: &str) -> Team {
        Team {
            id: id.to_string(),
            provider: "espn".to_string(),
            name: name.to_string(),
            short_name: name.to_string(),
            abbreviation: abbr.to_string(),
            league: "nba".to_string(),
            sport: "basketball".to_string(),
            logo_url: None,
            color: None,
        }
    }

    fn event(home: Team, away: Team) -> Event {
        Event {
            id: "401".to_string(),
            provider: "espn".to_string(),
            name: format!("{} vs {}", home.name, away.name),
            short_name: format!("{} vs {}", home.abbreviation, away.abbreviation),
            start_time: Utc.with_ymd_and_hms(2026, 2, 11, 19, 0, 0).unwrap(),
            home_team: home,
            away_team: away,
            status: EventStatus::scheduled(),
            league: "nba".to_string(),
            sport: "basketball".to_string(),
            home_score: None,
            away_score: None,
            venue: None,
            broadcasts: vec![],
            season_year: Some(2026),
            season_type: Some(SeasonType::Regular),
            main_card_start: None,
        }
    }

    #[test]
    fn test_event_state_serialization() {
        let state = EventState::Live;
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, "\"live\"");

        let deserialized: EventState = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, EventState::Live);
    }

    #[test]
    fn test_event_state_parse_synonyms() {
        assert_eq!(EventState::parse("in_progress"), EventState::Live);
        assert_eq!(EventState::parse("FT"), EventState::Final);
        assert_eq!(EventState::parse("canceled"), EventState::Cancelled);
        assert_eq!(EventState::parse("anything-else"), EventState::Scheduled);
    }

    #[test]
    fn test_tournament_placeholder() {
        let t = Team::placeholder("Daytona 500", "espn", "nascar", "racing");
        let e = event(t.clone(), t);
        assert!(e.is_tournament());
    }

    #[test]
    fn test_involves_team_id_and_name_fallback() {
        let e = event(team("5", "Detroit Pistons", "DET"), team("4", "Chicago Bulls", "CHI"));
        assert!(e.involves_team("5", ""));
        assert!(!e.involves_team("9", ""));
        // Missing id falls back to the normalised slug.
        assert!(e.involves_team("", "Chicago  BULLS"));
        assert!(!e.involves_team("", "Denver Nuggets"));
    }

    #[test]
    fn test_game_context_result() {
        let mut e = event(team("5", "Detroit Pistons", "DET"), team("4", "Chicago Bulls", "CHI"));
        e.home_score = Some(110);
        e.away_score = Some(102);
        e.status.state = EventState::Final;
        let home = e.home_team.clone();
        let away = e.away_team.clone();
        let ctx = GameContext {
            event: EnrichedEvent::bare(e),
            is_home: true,
            team: home,
            opponent: away,
            team_stats: None,
            opponent_stats: None,
            h2h: None,
            streaks: None,
            head_coach: None,
            player_leaders: None,
        };
        assert_eq!(ctx.result(), Some(GameResult::Win));
        assert_eq!(ctx.team_score(), Some(110));
        assert_eq!(ctx.opponent_score(), Some(102));
    }

    #[test]
    fn test_result_none_until_final() {
        let e = event(team("5", "Detroit Pistons", "DET"), team("4", "Chicago Bulls", "CHI"));
        let home = e.home_team.clone();
        let away = e.away_team.clone();
        let ctx = GameContext {
            event: EnrichedEvent::bare(e),
            is_home: false,
            team: away,
            opponent: home,
            team_stats: None,
            opponent_stats: None,
            h2h: None,
            streaks: None,
            head_coach: None,
            player_leaders: None,
        };
        assert_eq!(ctx.result(), None);
    }

    #[test]
    fn test_event_tvg_id() {
        assert_eq!(event_tvg_id("401584876"), "teamarr-event-401584876");
    }

    #[test]
    fn test_enriched_event_flatten_roundtrip() {
        let e = event(team("5", "Detroit Pistons", "DET"), team("4", "Chicago Bulls", "CHI"));
        let enriched = EnrichedEvent {
            event: e,
            has_odds: true,
            odds_favorite: Some("DET".to_string()),
            odds_spread: Some("-3.5".to_string()),
            odds_over_under: Some("221.5".to_string()),
        };
        let json = serde_json::to_string(&enriched).unwrap();
        // Flattened: event fields live at the top level of the cache shape.
        assert!(json.contains("\"start_time\""));
        assert!(json.contains("\"has_odds\":true"));
        let back: EnrichedEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, enriched);
    }
}
