//! Sports data provider abstractions.
//!
//! Defines the SportsProvider trait that allows pluggable schedule and
//! scoreboard sources (ESPN as the primary, TheSportsDB as a limited
//! fallback). All methods return canonical values from [`crate::types`];
//! no provider-specific shapes cross this interface.

use crate::types::{EnrichedEvent, Event, PlayerLeaders, Team, TeamStats};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

pub mod espn;
pub mod registry;
pub mod tsdb;

pub use registry::{ProviderConfig, ProviderRegistry};

/// Universal sports data provider trait.
///
/// `supports_league` must be O(1); the registry calls it on every routing
/// decision. Providers that cannot serve a request return an empty result
/// rather than an error so the service layer can fall through to the next
/// provider in priority order.
#[async_trait]
pub trait SportsProvider: Send + Sync {
    /// Provider name for logging and registry lookups.
    fn name(&self) -> &str;

    /// Whether this provider can serve the given canonical league code.
    fn supports_league(&self, league: &str) -> bool;

    /// Whether this provider has full capabilities. Non-premium providers
    /// (free-tier quotas, schedule caps) are preferred only as fallbacks.
    fn is_premium(&self) -> bool {
        true
    }

    /// All events for a league on a given date (scoreboard). Scoreboard
    /// payloads carry live fields, so results come back enriched.
    async fn get_events(&self, league: &str, date: NaiveDate) -> Result<Vec<EnrichedEvent>>;

    /// A team's schedule: past and future games.
    async fn get_team_schedule(
        &self,
        team_id: &str,
        league: &str,
        days_ahead: u32,
    ) -> Result<Vec<Event>>;

    /// Team identity details.
    async fn get_team(&self, team_id: &str, league: &str) -> Result<Option<Team>>;

    /// A single event by id, with fresh scores and odds where available.
    async fn get_event(&self, event_id: &str, league: &str) -> Result<Option<Event>>;

    /// Season aggregates for a team.
    async fn get_team_stats(&self, team_id: &str, league: &str) -> Result<Option<TeamStats>>;

    /// Head coach display name, when the provider carries rosters.
    async fn get_head_coach(&self, _team_id: &str, _league: &str) -> Result<Option<String>> {
        Ok(None)
    }

    /// Game leaders for one team in a completed event (sport-dispatched).
    async fn get_player_leaders(
        &self,
        _event_id: &str,
        _team_id: &str,
        _league: &str,
    ) -> Result<Option<PlayerLeaders>> {
        Ok(None)
    }

    /// Bulk enumeration of leagues for a sport (team-cache refresher).
    async fn list_leagues(&self, _sport: &str) -> Result<Vec<(String, String)>> {
        Ok(Vec::new())
    }

    /// Bulk enumeration of teams in a league (team-cache refresher).
    async fn list_teams(&self, _league: &str) -> Result<Vec<Team>> {
        Ok(Vec::new())
    }

    /// Rate-limiter counters for UI feedback, when this provider has one.
    fn rate_limit_stats(&self) -> Option<crate::rate_limit::RateLimitStats> {
        None
    }

    /// Reset per-cycle counters (called at generation start).
    fn reset_rate_limit_stats(&self) {}
}
