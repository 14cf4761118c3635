//! Stream↔event matcher.
//!
//! Ordered matching steps for a team-vs-team stream:
//! 1. Exact abbreviation token match (both sides ≥3 chars, score 100).
//!    Required for tournament streams using IOC codes (SWE, ITA, CAN).
//! 2. Fuzzy name match: normalized Levenshtein per side, combined score
//!    must meet [`BOTH_TEAMS_THRESHOLD`]. Reversed order allowed.
//! 3. User aliases rewrite names pre-match.
//!
//! The first successful step wins; later steps are not consulted. No
//! match with a combined score below the threshold is ever surfaced.

use super::classifier::{date_conflicts, ClassifiedStream, StreamClassifier};
use super::{MatchMethod, StreamMatch};
use crate::detection::{DetectionKeywordService, StreamEventType};
use crate::types::{normalize_slug, Event, Team};
use chrono::{Datelike, NaiveDate};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use strsim::normalized_levenshtein;
use tracing::debug;

/// Minimum combined fuzzy score (0-100) for a two-sided name match.
pub const BOTH_TEAMS_THRESHOLD: f64 = 60.0;

/// Abbreviation tokens shorter than this are too noisy to trust.
const MIN_ABBREV_LEN: usize = 3;

/// League scoping for one event group.
///
/// Single-mode groups restrict search to the one configured league - a
/// hard requirement to avoid cross-league false-positive fanout. Multi
/// groups search every known league and filter final matches to their
/// configured set. A child group may inherit `resolved_leagues` from its
/// parent as its effective single-mode scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeagueScope {
    /// Leagues searched for candidates; empty means all known leagues.
    pub search_leagues: Vec<String>,
    /// Final-match filter; empty means no filtering.
    pub include_leagues: Vec<String>,
}

impl LeagueScope {
    /// Single-mode: search and include exactly one league.
    pub fn single(league: &str) -> Self {
        Self {
            search_leagues: vec![league.to_string()],
            include_leagues: vec![league.to_string()],
        }
    }

    /// Multi-mode: search everything, include the configured set.
    pub fn multi(include_leagues: Vec<String>) -> Self {
        Self {
            search_leagues: Vec::new(),
            include_leagues,
        }
    }

    /// Child group with leagues resolved by its parent.
    pub fn resolved(leagues: Vec<String>) -> Self {
        Self {
            search_leagues: leagues.clone(),
            include_leagues: leagues,
        }
    }

    fn searches(&self, league: &str) -> bool {
        self.search_leagues.is_empty() || self.search_leagues.iter().any(|l| l == league)
    }

    fn includes(&self, league: &str) -> bool {
        self.include_leagues.is_empty() || self.include_leagues.iter().any(|l| l == league)
    }
}

/// Matches classified streams against candidate events.
pub struct TeamMatcher {
    classifier: StreamClassifier,
    /// normalized alias → canonical team name
    aliases: FxHashMap<String, String>,
    threshold: f64,
}

impl TeamMatcher {
    pub fn new(detection: Arc<DetectionKeywordService>) -> Self {
        Self {
            classifier: StreamClassifier::new(detection),
            aliases: FxHashMap::default(),
            threshold: BOTH_TEAMS_THRESHOLD,
        }
    }

    /// Install the user alias table (alias → team name).
    pub fn with_aliases(mut self, aliases: FxHashMap<String, String>) -> Self {
        self.aliases = aliases
            .into_iter()
            .map(|(alias, name)| (normalize_slug(&alias), name))
            .collect();
        self
    }

    pub fn with_games_opening_day(mut self, opening_day: NaiveDate) -> Self {
        self.classifier = self.classifier.with_games_opening_day(opening_day);
        self
    }

    pub fn classifier(&self) -> &StreamClassifier {
        &self.classifier
    }

    /// Match one stream name against candidate events for the active day.
    ///
    /// Returns `None` for placeholders, excluded content, date conflicts,
    /// and anything scoring under threshold.
    pub fn match_stream(
        &self,
        stream_name: &str,
        active_date: NaiveDate,
        events: &[Event],
        scope: &LeagueScope,
    ) -> Option<StreamMatch> {
        let classified = self.classifier.classify(stream_name, active_date.year());

        if classified.is_placeholder || classified.is_excluded {
            return None;
        }
        if date_conflicts(classified.stream_date, active_date) {
            debug!(
                "[MATCHER] '{}' carries a different date, skipping",
                stream_name
            );
            return None;
        }

        let candidates: Vec<&Event> = events
            .iter()
            .filter(|e| scope.searches(&e.league))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let result = match classified.event_type {
            StreamEventType::EventCard => self.match_event_card(&classified, &candidates),
            StreamEventType::FieldEvent => self.match_field_event(&classified, &candidates),
            StreamEventType::TeamVsTeam => self.match_team_vs_team(&classified, &candidates),
        }?;

        if !scope.includes(&result.league) {
            debug!(
                "[MATCHER] '{}' matched {} outside group leagues, dropping",
                stream_name, result.league
            );
            return None;
        }
        Some(result)
    }

    fn match_team_vs_team(
        &self,
        classified: &ClassifiedStream,
        candidates: &[&Event],
    ) -> Option<StreamMatch> {
        let (team_a, alias_a) = self.apply_alias(classified.team_a.as_deref());
        let (team_b, alias_b) = self.apply_alias(classified.team_b.as_deref());
        if team_a.is_none() && team_b.is_none() {
            return None;
        }
        let aliased = alias_a || alias_b;

        let mut best: Option<StreamMatch> = None;
        for event in candidates {
            let Some((method, score)) =
                self.match_teams_to_event(team_a.as_deref(), team_b.as_deref(), event)
            else {
                continue;
            };
            let method = if aliased { MatchMethod::Alias } else { method };
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(StreamMatch {
                    event_id: event.id.clone(),
                    league: event.league.clone(),
                    method,
                    score,
                    card_segment: None,
                });
            }
        }
        best
    }

    fn match_event_card(
        &self,
        classified: &ClassifiedStream,
        candidates: &[&Event],
    ) -> Option<StreamMatch> {
        let mut best: Option<StreamMatch> = None;
        for event in candidates {
            // Card streams name the headline fighters or the event itself.
            let fight_score = self
                .match_teams_to_event(
                    classified.team_a.as_deref(),
                    classified.team_b.as_deref(),
                    event,
                )
                .map(|(_, s)| s);
            let name_score = fuzzy_contains_score(&classified.normalized, &event.name)
                .max(fuzzy_contains_score(&classified.normalized, &event.short_name));
            let score = fight_score.unwrap_or(0.0).max(name_score);
            if score < self.threshold {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(StreamMatch {
                    event_id: event.id.clone(),
                    league: event.league.clone(),
                    method: MatchMethod::Keyword,
                    score,
                    card_segment: classified.card_segment,
                });
            }
        }
        best
    }

    fn match_field_event(
        &self,
        classified: &ClassifiedStream,
        candidates: &[&Event],
    ) -> Option<StreamMatch> {
        let mut best: Option<StreamMatch> = None;
        for event in candidates {
            let score = fuzzy_contains_score(&classified.normalized, &event.name)
                .max(fuzzy_contains_score(&classified.normalized, &event.short_name));
            if score < self.threshold {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(StreamMatch {
                    event_id: event.id.clone(),
                    league: event.league.clone(),
                    method: MatchMethod::Keyword,
                    score,
                    card_segment: None,
                });
            }
        }
        best
    }

    /// Rewrite a side through the user alias table.
    fn apply_alias(&self, side: Option<&str>) -> (Option<String>, bool) {
        match side {
            None => (None, false),
            Some(side) => match self.aliases.get(&normalize_slug(side)) {
                Some(canonical) => (Some(canonical.clone()), true),
                None => (Some(side.to_string()), false),
            },
        }
    }

    /// Ordered matching of two stream sides against one event:
    /// abbreviation tokens first, fuzzy names second.
    pub fn match_teams_to_event(
        &self,
        team_a: Option<&str>,
        team_b: Option<&str>,
        event: &Event,
    ) -> Option<(MatchMethod, f64)> {
        if let Some(hit) = check_abbreviation_match(team_a, team_b, event) {
            return Some(hit);
        }
        self.check_fuzzy_match(team_a, team_b, event)
    }

    fn check_fuzzy_match(
        &self,
        team_a: Option<&str>,
        team_b: Option<&str>,
        event: &Event,
    ) -> Option<(MatchMethod, f64)> {
        match (team_a, team_b) {
            (Some(a), Some(b)) => {
                let forward = (fuzzy_team_score(a, &event.home_team)
                    + fuzzy_team_score(b, &event.away_team))
                    / 2.0;
                let reversed = (fuzzy_team_score(a, &event.away_team)
                    + fuzzy_team_score(b, &event.home_team))
                    / 2.0;
                let score = forward.max(reversed);
                (score >= self.threshold).then_some((MatchMethod::Fuzzy, score))
            }
            (Some(side), None) | (None, Some(side)) => {
                let score = fuzzy_team_score(side, &event.home_team)
                    .max(fuzzy_team_score(side, &event.away_team));
                (score >= self.threshold).then_some((MatchMethod::Fuzzy, score))
            }
            (None, None) => None,
        }
    }
}

/// Exact abbreviation token matching.
///
/// Both the event abbreviation and the stream token must be at least
/// three characters; two-letter abbreviations are never sufficient. When
/// both sides are provided, both must match one team each (reversed order
/// allowed). A hit scores a flat 100.
pub fn check_abbreviation_match(
    team_a: Option<&str>,
    team_b: Option<&str>,
    event: &Event,
) -> Option<(MatchMethod, f64)> {
    let home_abbr = event.home_team.abbreviation.to_uppercase();
    let away_abbr = event.away_team.abbreviation.to_uppercase();
    if home_abbr.len() < MIN_ABBREV_LEN || away_abbr.len() < MIN_ABBREV_LEN {
        return None;
    }

    let has_token = |side: &str, abbr: &str| -> bool {
        side.to_uppercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() >= MIN_ABBREV_LEN)
            .any(|t| t == abbr)
    };

    let hit = match (team_a, team_b) {
        (Some(a), Some(b)) => {
            (has_token(a, &home_abbr) && has_token(b, &away_abbr))
                || (has_token(a, &away_abbr) && has_token(b, &home_abbr))
        }
        (Some(side), None) | (None, Some(side)) => {
            has_token(side, &home_abbr) || has_token(side, &away_abbr)
        }
        (None, None) => false,
    };

    hit.then_some((MatchMethod::Fuzzy, 100.0))
}

/// Similarity of one stream side against a team (0-100): the best of the
/// full name, short name, and mascot (last word) comparisons.
fn fuzzy_team_score(side: &str, team: &Team) -> f64 {
    let side_norm = normalize_name(side);
    if side_norm.is_empty() {
        return 0.0;
    }
    let mut candidates = vec![normalize_name(&team.name), normalize_name(&team.short_name)];
    if let Some(mascot) = team.name.split_whitespace().last() {
        candidates.push(normalize_name(mascot));
    }
    candidates
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| normalized_levenshtein(&side_norm, c) * 100.0)
        .fold(0.0, f64::max)
}

/// Similarity of a whole stream name against an event title: direct
/// similarity, boosted when the significant words of the title all appear
/// in the stream.
fn fuzzy_contains_score(stream: &str, event_name: &str) -> f64 {
    let stream_norm = normalize_name(stream);
    let event_norm = normalize_name(event_name);
    if stream_norm.is_empty() || event_norm.is_empty() {
        return 0.0;
    }
    let direct = normalized_levenshtein(&stream_norm, &event_norm) * 100.0;

    let event_words: Vec<&str> = event_norm
        .split_whitespace()
        .filter(|w| w.len() >= 3)
        .collect();
    if event_words.is_empty() {
        return direct;
    }
    let hits = event_words
        .iter()
        .filter(|w| stream_norm.contains(*w))
        .count();
    let containment = (hits as f64 / event_words.len() as f64) * 100.0;
    direct.max(containment)
}

fn normalize_name(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventStatus, Team};
    use chrono::{TimeZone, Utc};

    fn make_team(name: &str, abbreviation: &str) -> Team {
        Team {
            id: format!("t-{}", abbreviation.to_lowercase()),
            provider: "espn".to_string(),
            name: name.to_string(),
            short_name: name.to_string(),
            abbreviation: abbreviation.to_string(),
            league: "test".to_string(),
            sport: "hockey".to_string(),
            logo_url: None,
            color: None,
        }
    }

    fn make_event(home: Team, away: Team) -> Event {
        Event {
            id: "evt-1".to_string(),
            provider: "espn".to_string(),
            name: format!("{} vs {}", home.name, away.name),
            short_name: format!("{} vs {}", home.short_name, away.short_name),
            start_time: Utc.with_ymd_and_hms(2026, 2, 11, 19, 0, 0).unwrap(),
            home_team: home,
            away_team: away,
            status: EventStatus::scheduled(),
            league: "test".to_string(),
            sport: "hockey".to_string(),
            home_score: None,
            away_score: None,
            venue: None,
            broadcasts: vec![],
            season_year: None,
            season_type: None,
            main_card_start: None,
        }
    }

    fn matcher() -> TeamMatcher {
        TeamMatcher::new(Arc::new(DetectionKeywordService::builtin()))
    }

    // -- Abbreviation token matching --

    #[test]
    fn test_basic_ioc_codes() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        let result = check_abbreviation_match(Some("SWE"), Some("ITA"), &event);
        assert_eq!(result, Some((MatchMethod::Fuzzy, 100.0)));
    }

    #[test]
    fn test_ioc_codes_with_parenthetical() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        let result = check_abbreviation_match(Some("SWE"), Some("ITA (M Group B)"), &event);
        assert_eq!(result, Some((MatchMethod::Fuzzy, 100.0)));
    }

    #[test]
    fn test_reversed_order() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        let result = check_abbreviation_match(Some("ITA"), Some("SWE"), &event);
        assert_eq!(result, Some((MatchMethod::Fuzzy, 100.0)));
    }

    #[test]
    fn test_single_side_match() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        assert!(check_abbreviation_match(Some("SWE"), None, &event).is_some());
        assert!(check_abbreviation_match(None, Some("ITA"), &event).is_some());
        assert!(check_abbreviation_match(None, None, &event).is_none());
    }

    #[test]
    fn test_no_match_similar_abbreviations() {
        let event = make_event(
            make_team("Detroit Pistons", "DET"),
            make_team("Chicago Bulls", "CHI"),
        );
        assert!(check_abbreviation_match(Some("DEN"), Some("PHI"), &event).is_none());
    }

    #[test]
    fn test_full_names_dont_trigger_abbr_match() {
        let event = make_event(
            make_team("Boston Celtics", "BOS"),
            make_team("Los Angeles Lakers", "LAL"),
        );
        assert!(
            check_abbreviation_match(Some("Boston Celtics"), Some("LA Lakers"), &event).is_none()
        );
    }

    #[test]
    fn test_two_letter_abbreviations_skipped() {
        let event = make_event(
            make_team("San Francisco 49ers", "SF"),
            make_team("New England Patriots", "NE"),
        );
        assert!(check_abbreviation_match(Some("SF"), Some("NE"), &event).is_none());
    }

    #[test]
    fn test_one_abbr_too_short() {
        let event = make_event(
            make_team("Kansas City Chiefs", "KC"),
            make_team("Denver Broncos", "DEN"),
        );
        assert!(check_abbreviation_match(Some("KC"), Some("DEN"), &event).is_none());
    }

    #[test]
    fn test_only_one_team_matches_with_both_provided() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        assert!(check_abbreviation_match(Some("SWE"), Some("FIN"), &event).is_none());
    }

    #[test]
    fn test_case_insensitive() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        assert_eq!(
            check_abbreviation_match(Some("swe"), Some("ita"), &event),
            Some((MatchMethod::Fuzzy, 100.0))
        );
    }

    // -- Ordered matching: abbreviation before fuzzy --

    #[test]
    fn test_abbreviation_beats_fuzzy_for_tournament_stream() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        let (_, score) = matcher()
            .match_teams_to_event(Some("SWE"), Some("ITA"), &event)
            .unwrap();
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_full_name_matching_still_works() {
        let event = make_event(
            make_team("Boston Celtics", "BOS"),
            make_team("Los Angeles Lakers", "LAL"),
        );
        let (_, score) = matcher()
            .match_teams_to_event(Some("Boston Celtics"), Some("Los Angeles Lakers"), &event)
            .unwrap();
        assert!(score >= BOTH_TEAMS_THRESHOLD);
    }

    #[test]
    fn test_similar_abbrevs_no_false_positive() {
        let event = make_event(
            make_team("Detroit Pistons", "DET"),
            make_team("Chicago Bulls", "CHI"),
        );
        assert!(matcher()
            .match_teams_to_event(Some("DEN"), Some("PHI"), &event)
            .is_none());
    }

    // -- Full stream pipeline --

    fn active_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 11).unwrap()
    }

    #[test]
    fn test_match_stream_tournament_abbreviations() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        let events = vec![event];
        let result = matcher()
            .match_stream(
                "SWE vs ITA (M Group B)",
                active_date(),
                &events,
                &LeagueScope::single("test"),
            )
            .unwrap();
        assert_eq!(result.score, 100.0);
        assert_eq!(result.event_id, "evt-1");
    }

    #[test]
    fn test_match_stream_placeholder_discarded() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        let events = vec![event];
        assert!(matcher()
            .match_stream(
                "Event 04 - TBA",
                active_date(),
                &events,
                &LeagueScope::single("test")
            )
            .is_none());
    }

    #[test]
    fn test_match_stream_wrong_date_excluded() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        let events = vec![event];
        assert!(matcher()
            .match_stream(
                "SWE vs ITA 02/13",
                active_date(),
                &events,
                &LeagueScope::single("test")
            )
            .is_none());
    }

    #[test]
    fn test_match_stream_league_scoping() {
        let event = make_event(make_team("Sweden", "SWE"), make_team("Italy", "ITA"));
        let events = vec![event];
        // Single-mode scoped to a different league: candidate never seen.
        assert!(matcher()
            .match_stream(
                "SWE vs ITA",
                active_date(),
                &events,
                &LeagueScope::single("nhl")
            )
            .is_none());
        // Multi-mode searching all leagues but including only nhl: match
        // found then dropped by the include filter.
        assert!(matcher()
            .match_stream(
                "SWE vs ITA",
                active_date(),
                &events,
                &LeagueScope::multi(vec!["nhl".to_string()])
            )
            .is_none());
    }

    #[test]
    fn test_match_stream_alias_rewrite() {
        let event = make_event(
            make_team("Detroit Pistons", "DET"),
            make_team("Chicago Bulls", "CHI"),
        );
        let events = vec![event];
        let mut aliases = FxHashMap::default();
        aliases.insert("motor city".to_string(), "Detroit Pistons".to_string());
        let m = matcher().with_aliases(aliases);
        let result = m
            .match_stream(
                "Motor City vs Chicago Bulls",
                active_date(),
                &events,
                &LeagueScope::single("test"),
            )
            .unwrap();
        assert_eq!(result.method, MatchMethod::Alias);
        assert!(result.score >= BOTH_TEAMS_THRESHOLD);
    }

    #[test]
    fn test_match_stream_event_card_segment() {
        let home = make_team("Islam Makhachev", "MAK");
        let away = make_team("Arman Tsarukyan", "TSA");
        let mut event = make_event(home, away);
        event.name = "UFC 311: Makhachev vs Tsarukyan".to_string();
        event.short_name = "UFC 311".to_string();
        let events = vec![event];
        let result = matcher()
            .match_stream(
                "UFC 311: Makhachev vs Tsarukyan - Main Card",
                active_date(),
                &events,
                &LeagueScope::single("test"),
            )
            .unwrap();
        assert_eq!(result.method, MatchMethod::Keyword);
        assert_eq!(
            result.card_segment,
            Some(crate::detection::CardSegment::MainCard)
        );
    }

    #[test]
    fn test_best_scoring_event_wins() {
        let close = make_event(
            make_team("Detroit Pistons", "DET"),
            make_team("Chicago Bulls", "CHI"),
        );
        let mut exact = make_event(make_team("Detroit Pistons", "DET"), make_team("Chicago Bulls", "CHI"));
        exact.id = "evt-2".to_string();
        // Same teams, but evt-2 is on the searched league only.
        let events = vec![close, exact];
        let result = matcher()
            .match_stream(
                "Detroit Pistons vs Chicago Bulls",
                active_date(),
                &events,
                &LeagueScope::single("test"),
            )
            .unwrap();
        assert!(result.score >= BOTH_TEAMS_THRESHOLD);
    }
}
