//! Stream name classification.
//!
//! Normalizes raw IPTV stream names, extracts calendar-date tokens, and
//! types each stream as an event card, field event, or team-vs-team game
//! using the detection keyword service. Placeholders and excluded content
//! are flagged here so the matcher can discard them early.

use crate::detection::{CardSegment, DetectionKeywordService, StreamEventType};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::Arc;
use std::sync::OnceLock;

/// A stream name after normalization and classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedStream {
    pub raw_name: String,
    pub normalized: String,
    pub event_type: StreamEventType,
    /// Two sides when a separator split succeeded.
    pub team_a: Option<String>,
    pub team_b: Option<String>,
    /// Calendar date embedded in the name, if any.
    pub stream_date: Option<NaiveDate>,
    pub card_segment: Option<CardSegment>,
    pub is_placeholder: bool,
    pub is_excluded: bool,
    /// League codes hinted by the name.
    pub league_hints: Vec<String>,
}

/// Classifies stream names using the shared detection service.
pub struct StreamClassifier {
    detection: Arc<DetectionKeywordService>,
    /// Opening day of the currently configured multi-day games, used to
    /// resolve "Day N" stream names onto the calendar.
    games_opening_day: Option<NaiveDate>,
}

impl StreamClassifier {
    pub fn new(detection: Arc<DetectionKeywordService>) -> Self {
        Self {
            detection,
            games_opening_day: None,
        }
    }

    /// Configure the opening day used to resolve "Day N" names.
    pub fn with_games_opening_day(mut self, opening_day: NaiveDate) -> Self {
        self.games_opening_day = Some(opening_day);
        self
    }

    /// Classify one stream name.
    pub fn classify(&self, raw_name: &str, active_year: i32) -> ClassifiedStream {
        let normalized = normalize_stream_name(raw_name);
        let is_placeholder = self.detection.is_placeholder(raw_name);
        let is_excluded = self.detection.is_excluded(raw_name);

        let stream_date = extract_date(raw_name, active_year)
            .or_else(|| self.resolve_day_number(raw_name));

        let event_type = self
            .detection
            .detect_event_type(raw_name)
            .unwrap_or(StreamEventType::TeamVsTeam);

        let card_segment = if event_type == StreamEventType::EventCard {
            self.detection.detect_card_segment(raw_name)
        } else {
            None
        };

        let (team_a, team_b) = if event_type == StreamEventType::TeamVsTeam {
            self.split_teams(&normalized)
        } else {
            (None, None)
        };

        let league_hints = self.detection.detect_league(raw_name).unwrap_or_default();

        ClassifiedStream {
            raw_name: raw_name.to_string(),
            normalized,
            event_type,
            team_a,
            team_b,
            stream_date,
            card_segment,
            is_placeholder,
            is_excluded,
            league_hints,
        }
    }

    /// Split "A <sep> B" into sides, trimming league prefixes and date
    /// suffixes left over from normalization.
    fn split_teams(&self, normalized: &str) -> (Option<String>, Option<String>) {
        let Some((separator, idx)) = self.detection.find_separator(normalized) else {
            return (None, None);
        };
        let side_a = normalized[..idx].trim();
        let side_b = normalized[idx + separator.len()..].trim();

        let side_a = strip_league_prefix(side_a);
        let side_b = strip_trailing_junk(side_b);

        let clean = |s: &str| {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        };
        (clean(&side_a), clean(&side_b))
    }

    /// "Day N" names map onto the configured games calendar.
    fn resolve_day_number(&self, name: &str) -> Option<NaiveDate> {
        let opening = self.games_opening_day?;
        static DAY_RE: OnceLock<Regex> = OnceLock::new();
        let regex = DAY_RE.get_or_init(|| {
            Regex::new(r"(?i)\bday\s+(\d{1,2})\b").expect("day pattern")
        });
        let caps = regex.captures(name)?;
        let day: u32 = caps[1].parse().ok()?;
        if day == 0 || day > 30 {
            return None;
        }
        opening.checked_add_days(chrono::Days::new(u64::from(day) - 1))
    }
}

/// Lowercase, collapse whitespace, and strip punctuation that does not
/// separate tokens. Separator-relevant characters (`@`, `-`) survive.
pub fn normalize_stream_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match c {
            c if c.is_alphanumeric() => out.push(c),
            '@' | '-' | '.' | '&' | '+' => out.push(c),
            _ => out.push(' '),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip leading country/league tags ("US| NBA:", "[EPL]") from a side.
fn strip_league_prefix(side: &str) -> String {
    static PREFIX_RE: OnceLock<Regex> = OnceLock::new();
    let regex = PREFIX_RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:(?:us|uk|ca|es|fr|de)\b\s+)?(?:(?:nba|wnba|nfl|nhl|mlb|epl|mls|ufc)\b\s*[:|\-]?\s*)?",
        )
        .expect("prefix pattern")
    });
    regex.replace(side, "").trim().to_string()
}

/// Strip trailing dates, times, and quality tags after the second name.
fn strip_trailing_junk(side: &str) -> String {
    static TRAIL_RE: OnceLock<Regex> = OnceLock::new();
    let regex = TRAIL_RE.get_or_init(|| {
        // Times survive normalization as "7 30 pm", so the separator
        // class includes a space.
        Regex::new(
            r"(?i)(\s+(\d{1,2}[:. ]\d{2}\s*(am|pm)?|\d{4}-\d{2}-\d{2}|\d{1,2}[/.]\d{1,2}([/.]\d{2,4})?|hd|fhd|uhd|sd|4k|1080p?|720p))+\s*$",
        )
        .expect("trailing pattern")
    });
    regex.replace(side, "").trim().to_string()
}

/// Extract a calendar date from a stream name.
///
/// Recognizes ISO (`2026-02-11`), US numeric (`02/11`, `02/11/2026`), and
/// month-name (`Feb 11`) forms. Year-less forms borrow `active_year`.
pub fn extract_date(name: &str, active_year: i32) -> Option<NaiveDate> {
    static ISO_RE: OnceLock<Regex> = OnceLock::new();
    static US_RE: OnceLock<Regex> = OnceLock::new();
    static MONTH_RE: OnceLock<Regex> = OnceLock::new();

    let iso = ISO_RE.get_or_init(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").expect("iso"));
    if let Some(caps) = iso.captures(name) {
        return NaiveDate::from_ymd_opt(
            caps[1].parse().ok()?,
            caps[2].parse().ok()?,
            caps[3].parse().ok()?,
        );
    }

    let us = US_RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?\b").expect("us")
    });
    if let Some(caps) = us.captures(name) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let year = match caps.get(3) {
            Some(y) => {
                let y: i32 = y.as_str().parse().ok()?;
                if y < 100 {
                    2000 + y
                } else {
                    y
                }
            }
            None => active_year,
        };
        if (1..=12).contains(&month) {
            return NaiveDate::from_ymd_opt(year, month, day);
        }
        return None;
    }

    let month_name = MONTH_RE.get_or_init(|| {
        Regex::new(r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\s+(\d{1,2})\b")
            .expect("month")
    });
    if let Some(caps) = month_name.captures(name) {
        let month = match caps[1].to_lowercase().as_str() {
            "jan" => 1,
            "feb" => 2,
            "mar" => 3,
            "apr" => 4,
            "may" => 5,
            "jun" => 6,
            "jul" => 7,
            "aug" => 8,
            "sep" => 9,
            "oct" => 10,
            "nov" => 11,
            "dec" => 12,
            _ => return None,
        };
        let day: u32 = caps[2].parse().ok()?;
        return NaiveDate::from_ymd_opt(active_year, month, day);
    }

    None
}

/// Whether an embedded stream date contradicts the active matching day.
pub fn date_conflicts(stream_date: Option<NaiveDate>, active_date: NaiveDate) -> bool {
    match stream_date {
        Some(date) => date != active_date,
        None => false,
    }
}
