//! Unified team and league cache.
//!
//! Reverse-lookup catalog answering three questions without API calls:
//! 1. Event matching: "Freiburg vs Stuttgart" → candidate leagues
//! 2. Team multi-league: Liverpool → [eng.1, uefa.champions, eng.fa, ...]
//! 3. League discovery: all soccer leagues for "soccer_all"
//!
//! Populated by [`CacheRefresher`] iterating registered providers; refresh
//! writes are transactional so readers always see a consistent snapshot.
//! Refresh weekly to handle promotion/relegation.

use crate::providers::SportsProvider;
use crate::types::{normalize_slug, Team};
use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tracing::{info, warn};

/// How old a snapshot may get before `is_stale` reports true.
const STALE_AFTER_DAYS: i64 = 7;

/// One catalog league entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueEntry {
    pub league: String,
    pub sport: String,
    pub display_name: String,
    pub provider: String,
}

/// Catalog statistics for the UI.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TeamCacheStats {
    pub leagues: i64,
    pub teams: i64,
    pub last_refresh: Option<String>,
    pub is_stale: bool,
}

/// Progress event emitted while refreshing (streamed to the UI).
#[derive(Debug, Clone, Serialize)]
pub struct RefreshProgress {
    pub provider: String,
    pub league: String,
    pub teams_cached: usize,
    pub leagues_done: usize,
    pub leagues_total: usize,
}

/// Read-side queries over the catalog.
#[derive(Debug, Clone)]
pub struct TeamLeagueCache {
    pool: SqlitePool,
}

impl TeamLeagueCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All leagues known for a sport.
    pub async fn leagues_for_sport(&self, sport: &str) -> Vec<LeagueEntry> {
        let rows = sqlx::query(
            "SELECT league, sport, display_name, provider FROM cached_leagues
             WHERE sport = ? ORDER BY league",
        )
        .bind(sport)
        .fetch_all(&self.pool)
        .await;
        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(|r| LeagueEntry {
                    league: r.get("league"),
                    sport: r.get("sport"),
                    display_name: r.get("display_name"),
                    provider: r.get("provider"),
                })
                .collect(),
            Err(e) => {
                warn!("[TEAM_CACHE] leagues_for_sport failed: {}", e);
                Vec::new()
            }
        }
    }

    /// All leagues a team plays in (multi-competition soccer teams).
    pub async fn leagues_for_team(&self, team_id: &str, provider: &str, sport: &str) -> Vec<String> {
        let rows = sqlx::query(
            "SELECT DISTINCT league FROM cached_teams
             WHERE team_id = ? AND provider = ? AND sport = ?
             ORDER BY league",
        )
        .bind(team_id)
        .bind(provider)
        .bind(sport)
        .fetch_all(&self.pool)
        .await;
        match rows {
            Ok(rows) => rows.into_iter().map(|r| r.get("league")).collect(),
            Err(e) => {
                warn!("[TEAM_CACHE] leagues_for_team failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Candidate leagues where both names resolve to known teams.
    ///
    /// Leagues containing both teams sort first; leagues containing only
    /// one follow. Used to scope multi-mode stream matching.
    pub async fn candidate_leagues(&self, name_a: &str, name_b: &str) -> Vec<String> {
        let slug_a = normalize_slug(name_a);
        let slug_b = normalize_slug(name_b);
        if slug_a.is_empty() || slug_b.is_empty() {
            return Vec::new();
        }
        let rows = sqlx::query(
            "SELECT league,
                    SUM(CASE WHEN normalized_name = ? THEN 1 ELSE 0 END) AS hits_a,
                    SUM(CASE WHEN normalized_name = ? THEN 1 ELSE 0 END) AS hits_b
             FROM cached_teams
             WHERE normalized_name IN (?, ?)
             GROUP BY league
             ORDER BY (hits_a > 0) + (hits_b > 0) DESC, league",
        )
        .bind(&slug_a)
        .bind(&slug_b)
        .bind(&slug_a)
        .bind(&slug_b)
        .fetch_all(&self.pool)
        .await;
        match rows {
            Ok(rows) => rows.into_iter().map(|r| r.get("league")).collect(),
            Err(e) => {
                warn!("[TEAM_CACHE] candidate_leagues failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Teams in a league (for abbreviation/alias lookups).
    pub async fn teams_in_league(&self, league: &str) -> Vec<Team> {
        let rows = sqlx::query(
            "SELECT team_id, provider, name, abbreviation, league, sport
             FROM cached_teams WHERE league = ? ORDER BY name",
        )
        .bind(league)
        .fetch_all(&self.pool)
        .await;
        match rows {
            Ok(rows) => rows
                .into_iter()
                .map(|r| Team {
                    id: r.get("team_id"),
                    provider: r.get("provider"),
                    name: r.get::<String, _>("name"),
                    short_name: r.get::<String, _>("name"),
                    abbreviation: r.get("abbreviation"),
                    league: r.get("league"),
                    sport: r.get("sport"),
                    logo_url: None,
                    color: None,
                })
                .collect(),
            Err(e) => {
                warn!("[TEAM_CACHE] teams_in_league failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Expand league patterns to concrete slugs.
    ///
    /// `soccer_all` → every cached soccer league. A pattern with no cached
    /// entries expands to the empty list (silent empty expansion, logged);
    /// concrete slugs pass through untouched.
    pub async fn expand_leagues(&self, patterns: &[String]) -> Vec<String> {
        let mut expanded = Vec::new();
        for pattern in patterns {
            match pattern.strip_suffix("_all") {
                Some(sport) => {
                    let leagues = self.leagues_for_sport(sport).await;
                    if leagues.is_empty() {
                        warn!("[TEAM_CACHE] Pattern '{}' expanded to no leagues", pattern);
                    }
                    for entry in leagues {
                        if !expanded.contains(&entry.league) {
                            expanded.push(entry.league);
                        }
                    }
                }
                None => {
                    if !expanded.contains(pattern) {
                        expanded.push(pattern.clone());
                    }
                }
            }
        }
        expanded
    }

    pub async fn stats(&self) -> TeamCacheStats {
        let leagues = sqlx::query("SELECT COUNT(*) AS n FROM cached_leagues")
            .fetch_one(&self.pool)
            .await
            .map(|r| r.get::<i64, _>("n"))
            .unwrap_or(0);
        let teams = sqlx::query("SELECT COUNT(*) AS n FROM cached_teams")
            .fetch_one(&self.pool)
            .await
            .map(|r| r.get::<i64, _>("n"))
            .unwrap_or(0);
        let last_refresh: Option<String> =
            sqlx::query("SELECT value FROM cache_meta WHERE key = 'team_cache_refreshed_at'")
                .fetch_optional(&self.pool)
                .await
                .ok()
                .flatten()
                .map(|r| r.get("value"));
        let is_stale = match last_refresh
            .as_deref()
            .and_then(|s| s.parse::<chrono::DateTime<Utc>>().ok())
        {
            Some(at) => (Utc::now() - at).num_days() >= STALE_AFTER_DAYS,
            None => true,
        };
        TeamCacheStats {
            leagues,
            teams,
            last_refresh,
            is_stale,
        }
    }
}

/// Populates the catalog from all registered providers.
pub struct CacheRefresher {
    pool: SqlitePool,
    providers: Vec<Arc<dyn SportsProvider>>,
}

impl CacheRefresher {
    pub fn new(pool: SqlitePool, providers: Vec<Arc<dyn SportsProvider>>) -> Self {
        Self { pool, providers }
    }

    /// Refresh the catalog for the given leagues.
    ///
    /// Each provider contributes the leagues it supports. All writes for
    /// one run happen inside a single transaction; readers keep the old
    /// snapshot until commit.
    pub async fn refresh<F>(&self, leagues: &[String], mut progress: F) -> Result<usize>
    where
        F: FnMut(RefreshProgress),
    {
        let mut collected: Vec<(String, Team)> = Vec::new();
        let total = leagues.len();

        for (done, league) in leagues.iter().enumerate() {
            for provider in &self.providers {
                if !provider.supports_league(league) {
                    continue;
                }
                match provider.list_teams(league).await {
                    Ok(teams) if !teams.is_empty() => {
                        progress(RefreshProgress {
                            provider: provider.name().to_string(),
                            league: league.clone(),
                            teams_cached: teams.len(),
                            leagues_done: done + 1,
                            leagues_total: total,
                        });
                        for team in teams {
                            collected.push((league.clone(), team));
                        }
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(
                            "[TEAM_CACHE] {} list_teams({}) failed: {}",
                            provider.name(),
                            league,
                            e
                        );
                    }
                }
            }
        }

        let mut tx = self.pool.begin().await?;
        for league in leagues {
            sqlx::query("DELETE FROM cached_teams WHERE league = ?")
                .bind(league)
                .execute(&mut *tx)
                .await?;
        }
        let mut written = 0usize;
        for (league, team) in &collected {
            sqlx::query(
                "INSERT INTO cached_leagues (league, sport, display_name, provider)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(league) DO UPDATE SET sport = excluded.sport,
                                                   provider = excluded.provider",
            )
            .bind(league)
            .bind(&team.sport)
            .bind(league)
            .bind(&team.provider)
            .execute(&mut *tx)
            .await?;
            sqlx::query(
                "INSERT INTO cached_teams
                 (team_id, provider, name, normalized_name, abbreviation, league, sport)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(team_id, provider, league) DO UPDATE SET
                     name = excluded.name,
                     normalized_name = excluded.normalized_name,
                     abbreviation = excluded.abbreviation",
            )
            .bind(&team.id)
            .bind(&team.provider)
            .bind(&team.name)
            .bind(normalize_slug(&team.name))
            .bind(&team.abbreviation)
            .bind(league)
            .bind(&team.sport)
            .execute(&mut *tx)
            .await?;
            written += 1;
        }
        sqlx::query(
            "INSERT INTO cache_meta (key, value) VALUES ('team_cache_refreshed_at', ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        info!("[TEAM_CACHE] Refreshed {} teams across {} leagues", written, total);
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn seed_team(pool: &SqlitePool, id: &str, name: &str, abbr: &str, league: &str, sport: &str) {
        sqlx::query(
            "INSERT INTO cached_teams
             (team_id, provider, name, normalized_name, abbreviation, league, sport)
             VALUES (?, 'espn', ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(normalize_slug(name))
        .bind(abbr)
        .bind(league)
        .bind(sport)
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_league(pool: &SqlitePool, league: &str, sport: &str) {
        sqlx::query(
            "INSERT OR IGNORE INTO cached_leagues (league, sport, display_name, provider)
             VALUES (?, ?, ?, 'espn')",
        )
        .bind(league)
        .bind(sport)
        .bind(league)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_leagues_for_team_multi_competition() {
        let pool = test_pool().await;
        seed_team(&pool, "364", "Liverpool", "LIV", "eng.1", "soccer").await;
        seed_team(&pool, "364", "Liverpool", "LIV", "uefa.champions", "soccer").await;
        seed_team(&pool, "364", "Liverpool", "LIV", "eng.fa", "soccer").await;

        let cache = TeamLeagueCache::new(pool);
        let leagues = cache.leagues_for_team("364", "espn", "soccer").await;
        assert_eq!(leagues, vec!["eng.1", "eng.fa", "uefa.champions"]);
    }

    #[tokio::test]
    async fn test_candidate_leagues_prefers_both_teams() {
        let pool = test_pool().await;
        seed_team(&pool, "1", "Freiburg", "FRE", "ger.1", "soccer").await;
        seed_team(&pool, "2", "Stuttgart", "STU", "ger.1", "soccer").await;
        seed_team(&pool, "3", "Stuttgart", "STU", "ger.cup", "soccer").await;

        let cache = TeamLeagueCache::new(pool);
        let candidates = cache.candidate_leagues("Freiburg", "Stuttgart").await;
        assert_eq!(candidates.first().map(String::as_str), Some("ger.1"));
        assert!(candidates.contains(&"ger.cup".to_string()));
    }

    #[tokio::test]
    async fn test_expand_leagues_pattern_and_passthrough() {
        let pool = test_pool().await;
        seed_league(&pool, "eng.1", "soccer").await;
        seed_league(&pool, "ger.1", "soccer").await;
        seed_league(&pool, "nhl", "hockey").await;

        let cache = TeamLeagueCache::new(pool);
        let expanded = cache
            .expand_leagues(&["soccer_all".to_string(), "nba".to_string()])
            .await;
        assert!(expanded.contains(&"eng.1".to_string()));
        assert!(expanded.contains(&"ger.1".to_string()));
        assert!(expanded.contains(&"nba".to_string()));
        assert!(!expanded.contains(&"nhl".to_string()));
    }

    #[tokio::test]
    async fn test_expand_unknown_pattern_is_empty() {
        let pool = test_pool().await;
        let cache = TeamLeagueCache::new(pool);
        let expanded = cache.expand_leagues(&["cricket_all".to_string()]).await;
        assert!(expanded.is_empty());
    }

    #[tokio::test]
    async fn test_stats_stale_without_refresh() {
        let pool = test_pool().await;
        let cache = TeamLeagueCache::new(pool);
        let stats = cache.stats().await;
        assert!(stats.is_stale);
        assert_eq!(stats.teams, 0);
    }
}
