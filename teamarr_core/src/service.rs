//! Sports data service layer.
//!
//! Routes requests to appropriate providers with caching. Consumers call
//! this service - never providers directly. For each read: compute the
//! cache key; on hit, deserialize and return; on miss, iterate providers
//! in priority order and the first that supports the league and returns a
//! non-empty result wins; serialize, cache, return.

use crate::cache::{
    events_cache_ttl, make_cache_key, CacheStats, PersistentTtlCache, CACHE_TTL_SCHEDULE,
    CACHE_TTL_SINGLE_EVENT, CACHE_TTL_TEAM_INFO, CACHE_TTL_TEAM_STATS,
};
use crate::providers::SportsProvider;
use crate::types::{EnrichedEvent, Event, Team, TeamStats};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Per-provider statistics for UI feedback.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderStats {
    pub name: String,
    pub has_rate_limit: bool,
    pub rate_limit: Option<crate::rate_limit::RateLimitStats>,
}

/// Service layer for sports data access.
///
/// Provides a unified interface to sports data regardless of provider.
/// Handles provider selection, fallback, and caching.
#[derive(Clone)]
pub struct SportsDataService {
    providers: Vec<Arc<dyn SportsProvider>>,
    cache: PersistentTtlCache,
}

impl SportsDataService {
    pub fn new(providers: Vec<Arc<dyn SportsProvider>>, cache: PersistentTtlCache) -> Self {
        Self { providers, cache }
    }

    pub fn add_provider(&mut self, provider: Arc<dyn SportsProvider>) {
        self.providers.push(provider);
    }

    fn deserialize_cached<T: serde::de::DeserializeOwned>(
        key: &str,
        cached: serde_json::Value,
    ) -> Option<T> {
        match serde_json::from_value(cached) {
            Ok(value) => {
                debug!("[SERVICE] Cache hit: {}", key);
                Some(value)
            }
            Err(e) => {
                warn!("[SERVICE] Cache deserialization failed for {}: {}", key, e);
                None
            }
        }
    }

    async fn cache_value<T: Serialize>(&self, key: &str, value: &T, ttl: std::time::Duration) {
        match serde_json::to_value(value) {
            Ok(json) => self.cache.set(key, &json, ttl).await,
            Err(e) => warn!("[SERVICE] Cache serialization failed for {}: {}", key, e),
        }
    }

    /// Get all events for a league on a given date (scoreboard, with
    /// live fields).
    pub async fn get_events(&self, league: &str, target_date: NaiveDate) -> Vec<EnrichedEvent> {
        let key = make_cache_key("events", &[league, &target_date.to_string()]);
        if let Some(cached) = self.cache.get(&key).await {
            if let Some(events) = Self::deserialize_cached::<Vec<EnrichedEvent>>(&key, cached) {
                return events;
            }
        }

        for provider in &self.providers {
            if !provider.supports_league(league) {
                continue;
            }
            match provider.get_events(league, target_date).await {
                Ok(events) if !events.is_empty() => {
                    self.cache_value(&key, &events, events_cache_ttl(target_date))
                        .await;
                    return events;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "[SERVICE] {} get_events({}, {}) failed: {}",
                        provider.name(),
                        league,
                        target_date,
                        e
                    );
                }
            }
        }
        Vec::new()
    }

    /// Get schedule for a team (past and future games).
    pub async fn get_team_schedule(
        &self,
        team_id: &str,
        league: &str,
        days_ahead: u32,
    ) -> Vec<Event> {
        let key = make_cache_key("schedule", &[league, team_id]);
        if let Some(cached) = self.cache.get(&key).await {
            if let Some(events) = Self::deserialize_cached::<Vec<Event>>(&key, cached) {
                return events;
            }
        }

        for provider in &self.providers {
            if !provider.supports_league(league) {
                continue;
            }
            match provider.get_team_schedule(team_id, league, days_ahead).await {
                Ok(events) if !events.is_empty() => {
                    self.cache_value(&key, &events, CACHE_TTL_SCHEDULE).await;
                    return events;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        "[SERVICE] {} get_team_schedule({}, {}) failed: {}",
                        provider.name(),
                        team_id,
                        league,
                        e
                    );
                }
            }
        }
        Vec::new()
    }

    /// Get team details.
    pub async fn get_team(&self, team_id: &str, league: &str) -> Option<Team> {
        let key = make_cache_key("team", &[league, team_id]);
        if let Some(cached) = self.cache.get(&key).await {
            if let Some(team) = Self::deserialize_cached::<Team>(&key, cached) {
                return Some(team);
            }
        }

        for provider in &self.providers {
            if !provider.supports_league(league) {
                continue;
            }
            match provider.get_team(team_id, league).await {
                Ok(Some(team)) => {
                    self.cache_value(&key, &team, CACHE_TTL_TEAM_INFO).await;
                    return Some(team);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "[SERVICE] {} get_team({}, {}) failed: {}",
                        provider.name(),
                        team_id,
                        league,
                        e
                    );
                }
            }
        }
        None
    }

    /// Get a specific event by ID.
    ///
    /// Uses the short TTL since this path serves fresh scores/odds.
    pub async fn get_event(&self, event_id: &str, league: &str) -> Option<Event> {
        let key = make_cache_key("event", &[league, event_id]);
        if let Some(cached) = self.cache.get(&key).await {
            if let Some(event) = Self::deserialize_cached::<Event>(&key, cached) {
                return Some(event);
            }
        }

        for provider in &self.providers {
            if !provider.supports_league(league) {
                continue;
            }
            match provider.get_event(event_id, league).await {
                Ok(Some(event)) => {
                    self.cache_value(&key, &event, CACHE_TTL_SINGLE_EVENT).await;
                    return Some(event);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "[SERVICE] {} get_event({}, {}) failed: {}",
                        provider.name(),
                        event_id,
                        league,
                        e
                    );
                }
            }
        }
        None
    }

    /// Get detailed team statistics.
    pub async fn get_team_stats(&self, team_id: &str, league: &str) -> Option<TeamStats> {
        let key = make_cache_key("stats", &[league, team_id]);
        if let Some(cached) = self.cache.get(&key).await {
            if let Some(stats) = Self::deserialize_cached::<TeamStats>(&key, cached) {
                return Some(stats);
            }
        }

        for provider in &self.providers {
            if !provider.supports_league(league) {
                continue;
            }
            match provider.get_team_stats(team_id, league).await {
                Ok(Some(stats)) => {
                    self.cache_value(&key, &stats, CACHE_TTL_TEAM_STATS).await;
                    return Some(stats);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "[SERVICE] {} get_team_stats({}, {}) failed: {}",
                        provider.name(),
                        team_id,
                        league,
                        e
                    );
                }
            }
        }
        None
    }

    /// Game leaders for a completed event, uncached (only fetched for
    /// `.last` contexts).
    pub async fn get_player_leaders(
        &self,
        event_id: &str,
        team_id: &str,
        league: &str,
    ) -> Option<crate::types::PlayerLeaders> {
        for provider in &self.providers {
            if !provider.supports_league(league) {
                continue;
            }
            match provider.get_player_leaders(event_id, team_id, league).await {
                Ok(Some(leaders)) => return Some(leaders),
                Ok(None) => {}
                Err(e) => {
                    debug!(
                        "[SERVICE] {} get_player_leaders({}) failed: {}",
                        provider.name(),
                        event_id,
                        e
                    );
                }
            }
        }
        None
    }

    /// Head coach display name, uncached (cheap roster call, rarely used).
    pub async fn get_head_coach(&self, team_id: &str, league: &str) -> Option<String> {
        for provider in &self.providers {
            if !provider.supports_league(league) {
                continue;
            }
            match provider.get_head_coach(team_id, league).await {
                Ok(Some(coach)) => return Some(coach),
                Ok(None) => {}
                Err(e) => {
                    debug!(
                        "[SERVICE] {} get_head_coach({}, {}) failed: {}",
                        provider.name(),
                        team_id,
                        league,
                        e
                    );
                }
            }
        }
        None
    }

    // Cache management

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    /// Invalidate all cached data for a team.
    pub async fn invalidate_team(&self, team_id: &str, league: &str) {
        self.cache
            .delete(&make_cache_key("team", &[league, team_id]))
            .await;
        self.cache
            .delete(&make_cache_key("stats", &[league, team_id]))
            .await;
        self.cache
            .delete(&make_cache_key("schedule", &[league, team_id]))
            .await;
    }

    /// Get statistics from all providers for UI feedback.
    pub fn provider_stats(&self) -> Vec<ProviderStats> {
        self.providers
            .iter()
            .map(|p| {
                let rate_limit = p.rate_limit_stats();
                ProviderStats {
                    name: p.name().to_string(),
                    has_rate_limit: rate_limit.is_some(),
                    rate_limit,
                }
            })
            .collect()
    }

    /// Reset provider statistics (call at start of EPG generation).
    pub fn reset_provider_stats(&self) {
        for provider in &self.providers {
            provider.reset_rate_limit_stats();
        }
    }

    pub fn providers(&self) -> &[Arc<dyn SportsProvider>] {
        &self.providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::types::{EventStatus, Team};
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        name: String,
        league: String,
        calls: AtomicU32,
        events: Vec<Event>,
    }

    #[async_trait]
    impl SportsProvider for CountingProvider {
        fn name(&self) -> &str {
            &self.name
        }
        fn supports_league(&self, league: &str) -> bool {
            self.league == league
        }
        async fn get_events(&self, _: &str, _: NaiveDate) -> Result<Vec<EnrichedEvent>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.events.iter().cloned().map(EnrichedEvent::bare).collect())
        }
        async fn get_team_schedule(&self, _: &str, _: &str, _: u32) -> Result<Vec<Event>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.events.clone())
        }
        async fn get_team(&self, _: &str, _: &str) -> Result<Option<Team>> {
            Ok(None)
        }
        async fn get_event(&self, _: &str, _: &str) -> Result<Option<Event>> {
            Ok(self.events.first().cloned())
        }
        async fn get_team_stats(&self, _: &str, _: &str) -> Result<Option<TeamStats>> {
            Ok(None)
        }
    }

    fn sample_event(id: &str) -> Event {
        let team = Team {
            id: "1".to_string(),
            provider: "stub".to_string(),
            name: "Team".to_string(),
            short_name: "Team".to_string(),
            abbreviation: "TM".to_string(),
            league: "nba".to_string(),
            sport: "basketball".to_string(),
            logo_url: None,
            color: None,
        };
        Event {
            id: id.to_string(),
            provider: "stub".to_string(),
            name: "Team vs Team".to_string(),
            short_name: "TM vs TM".to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 2, 11, 19, 0, 0).unwrap(),
            home_team: team.clone(),
            away_team: team,
            status: EventStatus::scheduled(),
            league: "nba".to_string(),
            sport: "basketball".to_string(),
            home_score: None,
            away_score: None,
            venue: None,
            broadcasts: vec![],
            season_year: None,
            season_type: None,
            main_card_start: None,
        }
    }

    async fn service_with(
        providers: Vec<Arc<dyn SportsProvider>>,
    ) -> SportsDataService {
        SportsDataService::new(providers, PersistentTtlCache::new(test_pool().await))
    }

    #[tokio::test]
    async fn test_cache_prevents_second_fetch() {
        let provider = Arc::new(CountingProvider {
            name: "stub".to_string(),
            league: "nba".to_string(),
            calls: AtomicU32::new(0),
            events: vec![sample_event("1")],
        });
        let service = service_with(vec![provider.clone()]).await;
        let date = NaiveDate::from_ymd_opt(2030, 2, 11).unwrap();

        let first = service.get_events("nba", date).await;
        let second = service.get_events("nba", date).await;
        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_result_falls_through_to_next_provider() {
        let empty = Arc::new(CountingProvider {
            name: "empty".to_string(),
            league: "nba".to_string(),
            calls: AtomicU32::new(0),
            events: vec![],
        });
        let full = Arc::new(CountingProvider {
            name: "full".to_string(),
            league: "nba".to_string(),
            calls: AtomicU32::new(0),
            events: vec![sample_event("2")],
        });
        let service = service_with(vec![empty.clone(), full.clone()]).await;
        let events = service
            .get_events("nba", NaiveDate::from_ymd_opt(2030, 2, 11).unwrap())
            .await;
        assert_eq!(events.len(), 1);
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
        assert_eq!(full.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unsupported_league_returns_empty() {
        let provider = Arc::new(CountingProvider {
            name: "stub".to_string(),
            league: "nba".to_string(),
            calls: AtomicU32::new(0),
            events: vec![sample_event("1")],
        });
        let service = service_with(vec![provider.clone()]).await;
        let events = service
            .get_events("nhl", NaiveDate::from_ymd_opt(2030, 2, 11).unwrap())
            .await;
        assert!(events.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalidate_team_forces_refetch() {
        let provider = Arc::new(CountingProvider {
            name: "stub".to_string(),
            league: "nba".to_string(),
            calls: AtomicU32::new(0),
            events: vec![sample_event("1")],
        });
        let service = service_with(vec![provider.clone()]).await;
        service.get_team_schedule("1", "nba", 14).await;
        service.invalidate_team("1", "nba").await;
        service.get_team_schedule("1", "nba", 14).await;
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }
}
