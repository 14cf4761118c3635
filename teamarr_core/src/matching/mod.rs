//! Stream↔event matching.
//!
//! Takes noisy IPTV stream names and decides whether they refer to a
//! scheduled event. Classification (`classifier`) types the stream and
//! extracts its parts; matching (`matcher`) scores it against candidate
//! events within a group's league scope.

use crate::detection::CardSegment;
use serde::{Deserialize, Serialize};

pub mod classifier;
pub mod matcher;

pub use classifier::{ClassifiedStream, StreamClassifier};
pub use matcher::{LeagueScope, TeamMatcher, BOTH_TEAMS_THRESHOLD};

/// How a stream was matched to an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// League/event keyword hit (combat cards, field events).
    Keyword,
    /// Name-based matching: abbreviation tokens score 100, otherwise a
    /// combined fuzzy similarity.
    Fuzzy,
    /// User alias rewrite led to the match.
    Alias,
}

/// A successful stream→event match.
///
/// Borderline scores are never surfaced: construction happens only after
/// the matcher's thresholds pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMatch {
    pub event_id: String,
    pub league: String,
    pub method: MatchMethod,
    pub score: f64,
    /// Combat sports: which card segment the stream carries.
    pub card_segment: Option<CardSegment>,
}
