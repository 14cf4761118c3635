//! Detection keyword service for stream classification.
//!
//! Combines built-in constants with user-supplied rows (category, keyword,
//! is_regex, target_value, enabled, priority). User rows take precedence
//! over built-ins by priority. Plain text entries are anchored as
//! case-insensitive literal matches; regex entries compile directly;
//! invalid patterns are logged and skipped.
//!
//! Patterns compile into an immutable [`CompiledPatterns`] table that is
//! rebuilt on user edits and atomically swapped, so readers never observe
//! a partially-updated pattern set.

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// A user-defined detection keyword row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserKeyword {
    pub category: String,
    pub keyword: String,
    pub is_regex: bool,
    pub target_value: Option<String>,
    pub priority: i32,
}

/// Stream classification produced from event-type keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamEventType {
    /// Combat sports cards (UFC, boxing).
    EventCard,
    /// Tournament-style events without two teams (racing, golf).
    FieldEvent,
    /// Standard two-team games.
    TeamVsTeam,
}

/// Combat sports card segment detected in a stream name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSegment {
    EarlyPrelims,
    Prelims,
    MainCard,
    Combined,
}

impl CardSegment {
    fn parse(s: &str) -> Self {
        match s {
            "early_prelims" => CardSegment::EarlyPrelims,
            "prelims" => CardSegment::Prelims,
            "main_card" => CardSegment::MainCard,
            _ => CardSegment::Combined,
        }
    }
}

// Built-in defaults; user rows extend or override these.

const EVENT_CARD_KEYWORDS: &[&str] = &[
    "ufc", "bellator", "pfl", "one championship", "boxing", "dazn", "fight night",
    "main card", "prelims", "wwe", "aew",
];

const FIELD_EVENT_KEYWORDS: &[&str] = &[
    "f1", "formula 1", "formula one", "grand prix", "nascar", "indycar",
    "pga", "lpga", "golf", "marathon", "athletics",
];

const LEAGUE_HINT_PATTERNS: &[(&str, &[&str])] = &[
    (r"\bnba\b", &["nba"]),
    (r"\bwnba\b", &["wnba"]),
    (r"\bnfl\b", &["nfl"]),
    (r"\bnhl\b", &["nhl"]),
    (r"\bmlb\b", &["mlb"]),
    (r"\bmls\b", &["usa.1"]),
    (r"\bepl\b|premier league", &["eng.1"]),
    (r"\bfa cup\b", &["eng.fa"]),
    (r"la liga", &["esp.1"]),
    (r"bundesliga", &["ger.1"]),
    (r"serie a", &["ita.1"]),
    (r"ligue 1", &["fra.1"]),
    (r"champions league", &["uefa.champions"]),
    (r"europa league", &["uefa.europa"]),
    (r"\bufc\b", &["ufc"]),
    (r"\bpfl\b", &["pfl"]),
    (r"college football|\bncaaf\b|\bcfb\b", &["college-football"]),
    (
        r"college basketball|\bncaab\b|\bcbb\b",
        &["mens-college-basketball", "womens-college-basketball"],
    ),
    (r"\bf1\b|formula 1|formula one", &["f1"]),
    (r"\bnascar\b", &["nascar"]),
    (r"\bpga\b", &["pga"]),
    (r"\batp\b", &["atp"]),
    (r"\bwta\b", &["wta"]),
];

const SPORT_HINT_PATTERNS: &[(&str, &str)] = &[
    (r"\bbasketball\b", "basketball"),
    (r"\bhockey\b", "hockey"),
    (r"\bbaseball\b", "baseball"),
    (r"\bsoccer\b|\bfutbol\b|\bfootball club\b", "soccer"),
    (r"\bfootball\b", "football"),
    (r"\bmma\b|\bufc\b", "mma"),
    (r"\bboxing\b", "boxing"),
    (r"\btennis\b", "tennis"),
    (r"\bgolf\b", "golf"),
];

const PLACEHOLDER_PATTERNS: &[&str] = &[
    r"placeholder",
    r"\bchannel \d+\b",
    r"\btba\b",
    r"to be announced",
    r"no event",
    r"coming soon",
    r"\boffline\b",
    r"24/7",
    r"\bevent \d+\b",
];

const CARD_SEGMENT_PATTERNS: &[(&str, &str)] = &[
    (r"early prelims", "early_prelims"),
    (r"prelims", "prelims"),
    (r"main card", "main_card"),
    (r"full card|entire card", "combined"),
];

const COMBAT_SPORTS_EXCLUDE_PATTERNS: &[&str] = &[
    r"weigh[\s-]?ins?",
    r"press conference",
    r"\bpresser\b",
    r"post[\s-]fight",
    r"face[\s-]?offs?",
    r"\bembedded\b",
    r"\bcountdown\b",
    r"\brecap\b",
];

const GAME_SEPARATORS: &[&str] = &[" vs. ", " vs ", " v ", " @ ", " at ", " x "];

/// Immutable compiled pattern table. Rebuilt on user edits, swapped whole.
#[derive(Debug, Default)]
pub struct CompiledPatterns {
    event_type_keywords: FxHashMap<StreamEventType, Vec<String>>,
    league_hints: Vec<(Regex, Vec<String>)>,
    sport_hints: Vec<(Regex, String)>,
    placeholders: Vec<Regex>,
    card_segments: Vec<(Regex, CardSegment)>,
    exclusions: Vec<Regex>,
    separators: Vec<String>,
}

fn compile(pattern: &str, is_regex: bool) -> Option<Regex> {
    let source = if is_regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };
    match RegexBuilder::new(&source).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("[DETECT_SVC] Invalid pattern '{}': {}", pattern, e);
            None
        }
    }
}

fn event_type_from_target(target: Option<&str>) -> StreamEventType {
    match target {
        Some("FIELD_EVENT") => StreamEventType::FieldEvent,
        Some("TEAM_VS_TEAM") => StreamEventType::TeamVsTeam,
        _ => StreamEventType::EventCard,
    }
}

impl CompiledPatterns {
    /// Build from built-ins merged with user rows. User rows are assumed
    /// pre-sorted by descending priority; they land ahead of built-ins so
    /// they win on first-match semantics.
    fn build(user_rows: &[UserKeyword]) -> Self {
        let mut table = CompiledPatterns::default();

        let rows_for = |category: &str| -> Vec<&UserKeyword> {
            user_rows.iter().filter(|r| r.category == category).collect()
        };

        // Event type keywords: plain lowercase substrings.
        let mut event_types: FxHashMap<StreamEventType, Vec<String>> = FxHashMap::default();
        for row in rows_for("event_type_keywords") {
            event_types
                .entry(event_type_from_target(row.target_value.as_deref()))
                .or_default()
                .push(row.keyword.to_lowercase());
        }
        for kw in EVENT_CARD_KEYWORDS {
            let list = event_types.entry(StreamEventType::EventCard).or_default();
            if !list.iter().any(|k| k == kw) {
                list.push((*kw).to_string());
            }
        }
        for kw in FIELD_EVENT_KEYWORDS {
            let list = event_types.entry(StreamEventType::FieldEvent).or_default();
            if !list.iter().any(|k| k == kw) {
                list.push((*kw).to_string());
            }
        }
        table.event_type_keywords = event_types;

        for row in rows_for("league_hints") {
            if let Some(regex) = compile(&row.keyword, row.is_regex) {
                // target_value may be a JSON array for umbrella brands.
                let target = row.target_value.clone().unwrap_or_default();
                let leagues = serde_json::from_str::<Vec<String>>(&target)
                    .unwrap_or_else(|_| vec![target]);
                table.league_hints.push((regex, leagues));
            }
        }
        for (pattern, leagues) in LEAGUE_HINT_PATTERNS {
            if let Some(regex) = compile(pattern, true) {
                table
                    .league_hints
                    .push((regex, leagues.iter().map(|s| s.to_string()).collect()));
            }
        }

        for row in rows_for("sport_hints") {
            if let Some(regex) = compile(&row.keyword, row.is_regex) {
                table
                    .sport_hints
                    .push((regex, row.target_value.clone().unwrap_or_default()));
            }
        }
        for (pattern, sport) in SPORT_HINT_PATTERNS {
            if let Some(regex) = compile(pattern, true) {
                table.sport_hints.push((regex, (*sport).to_string()));
            }
        }

        for row in rows_for("placeholders") {
            if let Some(regex) = compile(&row.keyword, row.is_regex) {
                table.placeholders.push(regex);
            }
        }
        for pattern in PLACEHOLDER_PATTERNS {
            if let Some(regex) = compile(pattern, true) {
                table.placeholders.push(regex);
            }
        }

        for row in rows_for("card_segments") {
            if let Some(regex) = compile(&row.keyword, row.is_regex) {
                table.card_segments.push((
                    regex,
                    CardSegment::parse(row.target_value.as_deref().unwrap_or("combined")),
                ));
            }
        }
        for (pattern, segment) in CARD_SEGMENT_PATTERNS {
            if let Some(regex) = compile(pattern, true) {
                table
                    .card_segments
                    .push((regex, CardSegment::parse(segment)));
            }
        }

        for row in rows_for("exclusions") {
            if let Some(regex) = compile(&row.keyword, row.is_regex) {
                table.exclusions.push(regex);
            }
        }
        for pattern in COMBAT_SPORTS_EXCLUDE_PATTERNS {
            if let Some(regex) = compile(pattern, true) {
                table.exclusions.push(regex);
            }
        }

        let user_seps: Vec<String> = rows_for("separators")
            .iter()
            .map(|r| r.keyword.clone())
            .collect();
        let mut separators = user_seps.clone();
        for sep in GAME_SEPARATORS {
            if !user_seps.iter().any(|s| s.eq_ignore_ascii_case(sep)) {
                separators.push((*sep).to_string());
            }
        }
        table.separators = separators;

        debug!(
            "[DETECT_SVC] Compiled patterns: {} league hints, {} placeholders, {} exclusions",
            table.league_hints.len(),
            table.placeholders.len(),
            table.exclusions.len()
        );
        table
    }
}

/// Central pattern store for the stream classifier and matcher.
pub struct DetectionKeywordService {
    patterns: RwLock<Arc<CompiledPatterns>>,
}

impl DetectionKeywordService {
    /// Built-ins only (tests, early startup before DB is ready).
    pub fn builtin() -> Self {
        Self {
            patterns: RwLock::new(Arc::new(CompiledPatterns::build(&[]))),
        }
    }

    /// Built-ins merged with enabled user rows sorted by priority.
    pub fn with_user_rows(mut rows: Vec<UserKeyword>) -> Self {
        rows.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self {
            patterns: RwLock::new(Arc::new(CompiledPatterns::build(&rows))),
        }
    }

    /// Rebuild the compiled table after user edits and swap it in.
    pub fn invalidate(&self, mut rows: Vec<UserKeyword>) {
        rows.sort_by(|a, b| b.priority.cmp(&a.priority));
        let rebuilt = Arc::new(CompiledPatterns::build(&rows));
        *self.patterns.write() = rebuilt;
        debug!("[DETECT_SVC] Pattern cache invalidated and rebuilt");
    }

    fn snapshot(&self) -> Arc<CompiledPatterns> {
        self.patterns.read().clone()
    }

    /// Detect the event type of a stream name from keyword hits.
    pub fn detect_event_type(&self, text: &str) -> Option<StreamEventType> {
        let lower = text.to_lowercase();
        let patterns = self.snapshot();
        for event_type in [StreamEventType::EventCard, StreamEventType::FieldEvent] {
            if let Some(keywords) = patterns.event_type_keywords.get(&event_type) {
                if keywords.iter().any(|kw| lower.contains(kw.as_str())) {
                    return Some(event_type);
                }
            }
        }
        None
    }

    pub fn is_combat_sport(&self, text: &str) -> bool {
        self.detect_event_type(text) == Some(StreamEventType::EventCard)
    }

    /// League codes hinted by a stream name, first matching pattern wins.
    pub fn detect_league(&self, text: &str) -> Option<Vec<String>> {
        let patterns = self.snapshot();
        for (regex, leagues) in &patterns.league_hints {
            if regex.is_match(text) {
                return Some(leagues.clone());
            }
        }
        None
    }

    /// Sport hinted by a stream name.
    pub fn detect_sport(&self, text: &str) -> Option<String> {
        let patterns = self.snapshot();
        for (regex, sport) in &patterns.sport_hints {
            if regex.is_match(text) {
                return Some(sport.clone());
            }
        }
        None
    }

    /// Whether a stream name is a placeholder (discarded before matching).
    pub fn is_placeholder(&self, text: &str) -> bool {
        let patterns = self.snapshot();
        patterns.placeholders.iter().any(|r| r.is_match(text))
    }

    /// Card segment for combat sports streams.
    pub fn detect_card_segment(&self, text: &str) -> Option<CardSegment> {
        let patterns = self.snapshot();
        for (regex, segment) in &patterns.card_segments {
            if regex.is_match(text) {
                return Some(*segment);
            }
        }
        None
    }

    /// Whether a stream is excluded content (weigh-ins, pressers).
    pub fn is_excluded(&self, text: &str) -> bool {
        let patterns = self.snapshot();
        patterns.exclusions.iter().any(|r| r.is_match(text))
    }

    /// First separator found in a stream name with its byte position.
    pub fn find_separator(&self, text: &str) -> Option<(String, usize)> {
        let lower = text.to_lowercase();
        let patterns = self.snapshot();
        let mut best: Option<(String, usize)> = None;
        for sep in &patterns.separators {
            if let Some(idx) = lower.find(&sep.to_lowercase()) {
                if best.as_ref().map_or(true, |(_, b)| idx < *b) {
                    best = Some((sep.clone(), idx));
                }
            }
        }
        best
    }

    /// Pattern counts per category (diagnostics endpoint).
    pub fn warm_cache(&self) -> FxHashMap<String, usize> {
        let patterns = self.snapshot();
        let mut counts = FxHashMap::default();
        counts.insert(
            "event_type_keywords".to_string(),
            patterns.event_type_keywords.values().map(Vec::len).sum(),
        );
        counts.insert("league_hints".to_string(), patterns.league_hints.len());
        counts.insert("sport_hints".to_string(), patterns.sport_hints.len());
        counts.insert("placeholders".to_string(), patterns.placeholders.len());
        counts.insert("card_segments".to_string(), patterns.card_segments.len());
        counts.insert("exclusions".to_string(), patterns.exclusions.len());
        counts.insert("separators".to_string(), patterns.separators.len());
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_event_type_combat() {
        let svc = DetectionKeywordService::builtin();
        assert_eq!(
            svc.detect_event_type("UFC 311: Makhachev vs Tsarukyan"),
            Some(StreamEventType::EventCard)
        );
        assert_eq!(
            svc.detect_event_type("F1 Monaco Grand Prix"),
            Some(StreamEventType::FieldEvent)
        );
        assert_eq!(svc.detect_event_type("Pistons vs Bulls"), None);
    }

    #[test]
    fn test_detect_league_single_and_umbrella() {
        let svc = DetectionKeywordService::builtin();
        assert_eq!(svc.detect_league("NBA: DET vs CHI"), Some(vec!["nba".to_string()]));
        let college = svc.detect_league("NCAAB Duke vs UNC").unwrap();
        assert_eq!(college.len(), 2);
        assert!(college.contains(&"mens-college-basketball".to_string()));
        assert_eq!(svc.detect_league("random stream"), None);
    }

    #[test]
    fn test_placeholder_and_exclusion() {
        let svc = DetectionKeywordService::builtin();
        assert!(svc.is_placeholder("Event 04 - TBA"));
        assert!(svc.is_placeholder("PPV Channel 12"));
        assert!(!svc.is_placeholder("DET vs CHI"));
        assert!(svc.is_excluded("UFC 311 Weigh-In"));
        assert!(svc.is_excluded("Post Fight Press Conference"));
        assert!(!svc.is_excluded("UFC 311 Main Card"));
    }

    #[test]
    fn test_card_segments() {
        let svc = DetectionKeywordService::builtin();
        assert_eq!(
            svc.detect_card_segment("UFC 311 Early Prelims"),
            Some(CardSegment::EarlyPrelims)
        );
        assert_eq!(
            svc.detect_card_segment("UFC 311 Prelims"),
            Some(CardSegment::Prelims)
        );
        assert_eq!(
            svc.detect_card_segment("UFC 311 Main Card"),
            Some(CardSegment::MainCard)
        );
        assert_eq!(svc.detect_card_segment("UFC 311"), None);
    }

    #[test]
    fn test_find_separator_earliest() {
        let svc = DetectionKeywordService::builtin();
        let (sep, idx) = svc.find_separator("Pistons at Bulls vs whoever").unwrap();
        assert_eq!(sep, " at ");
        assert_eq!(idx, 7);
        assert!(svc.find_separator("no separator here!").is_none());
    }

    #[test]
    fn test_user_rows_take_precedence() {
        let svc = DetectionKeywordService::with_user_rows(vec![UserKeyword {
            category: "league_hints".to_string(),
            keyword: "superliga".to_string(),
            is_regex: false,
            target_value: Some("arg.1".to_string()),
            priority: 10,
        }]);
        assert_eq!(
            svc.detect_league("Superliga: Boca vs River"),
            Some(vec!["arg.1".to_string()])
        );
    }

    #[test]
    fn test_invalid_user_regex_skipped() {
        let svc = DetectionKeywordService::with_user_rows(vec![UserKeyword {
            category: "placeholders".to_string(),
            keyword: "([unclosed".to_string(),
            is_regex: true,
            target_value: None,
            priority: 0,
        }]);
        // Built-ins still work; the bad pattern was dropped.
        assert!(svc.is_placeholder("placeholder feed"));
    }

    #[test]
    fn test_invalidate_swaps_table() {
        let svc = DetectionKeywordService::builtin();
        assert!(!svc.is_placeholder("my custom junk"));
        svc.invalidate(vec![UserKeyword {
            category: "placeholders".to_string(),
            keyword: "my custom junk".to_string(),
            is_regex: false,
            target_value: None,
            priority: 0,
        }]);
        assert!(svc.is_placeholder("MY CUSTOM JUNK stream"));
    }

    #[test]
    fn test_warm_cache_counts() {
        let svc = DetectionKeywordService::builtin();
        let counts = svc.warm_cache();
        assert!(counts["league_hints"] >= LEAGUE_HINT_PATTERNS.len());
        assert!(counts["separators"] >= GAME_SEPARATORS.len());
    }
}
