//! Persistent TTL cache for provider payloads.
//!
//! A durable key→value store backed by the local SQLite database. Values
//! are opaque JSON payloads; domain code serializes to a canonical shape
//! before caching and deserializes on read, so the cache stays tolerant of
//! type changes across code revisions.
//!
//! Contracts:
//! - `get` returns `None` for missing and expired entries (lazy eviction)
//! - `set` overwrites; TTL is relative to wall clock at set
//! - storage errors degrade to cache misses, never propagate

use chrono::Utc;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use tracing::{debug, warn};

/// Cache TTLs applied at the service layer (hourly EPG regeneration):
/// - Scoreboard (league events): 8 hours - daily schedule rarely changes
/// - Team schedules: 8 hours - games rarely added/removed
/// - Single event: 30 minutes - fresh scores/odds for current games
/// - Team stats: 4 hours - record/standings change infrequently
/// - Team info: 24 hours - static team data
pub const CACHE_TTL_EVENTS: Duration = Duration::from_secs(8 * 3600);
pub const CACHE_TTL_SCHEDULE: Duration = Duration::from_secs(8 * 3600);
pub const CACHE_TTL_SINGLE_EVENT: Duration = Duration::from_secs(30 * 60);
pub const CACHE_TTL_TEAM_STATS: Duration = Duration::from_secs(4 * 3600);
pub const CACHE_TTL_TEAM_INFO: Duration = Duration::from_secs(24 * 3600);

/// TTL for events on today's date narrows so late-binding scoreboard data
/// (scores, odds) stays fresh within a cycle.
pub const CACHE_TTL_EVENTS_TODAY: Duration = Duration::from_secs(15 * 60);

/// Pick the events TTL for a target date.
pub fn events_cache_ttl(target_date: chrono::NaiveDate) -> Duration {
    if target_date == Utc::now().date_naive() {
        CACHE_TTL_EVENTS_TODAY
    } else {
        CACHE_TTL_EVENTS
    }
}

/// Compose a deterministic cache key from a namespace and parts.
pub fn make_cache_key<S: AsRef<str>>(namespace: &str, parts: &[S]) -> String {
    let mut key = String::from(namespace);
    for part in parts {
        key.push(':');
        key.push_str(part.as_ref());
    }
    key
}

/// Cache statistics for the UI.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: i64,
    pub expired_entries: i64,
}

/// SQLite-backed TTL cache. Cheap to clone; all clones share the pool.
#[derive(Debug, Clone)]
pub struct PersistentTtlCache {
    pool: SqlitePool,
}

impl PersistentTtlCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Look up a key. Expired rows are deleted on the way out.
    pub async fn get(&self, key: &str) -> Option<serde_json::Value> {
        let now = Utc::now().timestamp();
        let row = match sqlx::query("SELECT value, expires_at FROM provider_cache WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
        {
            Ok(row) => row?,
            Err(e) => {
                warn!("[CACHE] Read failed for {}: {}", key, e);
                return None;
            }
        };

        let expires_at: i64 = row.get("expires_at");
        if expires_at <= now {
            debug!("[CACHE] Expired: {}", key);
            let _ = sqlx::query("DELETE FROM provider_cache WHERE key = ?")
                .bind(key)
                .execute(&self.pool)
                .await;
            return None;
        }

        let raw: String = row.get("value");
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("[CACHE] Corrupt entry {}: {}", key, e);
                None
            }
        }
    }

    /// Store a value with a relative TTL, overwriting any existing entry.
    pub async fn set(&self, key: &str, value: &serde_json::Value, ttl: Duration) {
        let expires_at = Utc::now().timestamp() + ttl.as_secs() as i64;
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("[CACHE] Serialize failed for {}: {}", key, e);
                return;
            }
        };
        let result = sqlx::query(
            "INSERT INTO provider_cache (key, value, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                            expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(raw)
        .bind(expires_at)
        .execute(&self.pool)
        .await;
        if let Err(e) = result {
            warn!("[CACHE] Write failed for {}: {}", key, e);
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = sqlx::query("DELETE FROM provider_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
        {
            warn!("[CACHE] Delete failed for {}: {}", key, e);
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = sqlx::query("DELETE FROM provider_cache")
            .execute(&self.pool)
            .await
        {
            warn!("[CACHE] Clear failed: {}", e);
        }
    }

    /// Remove all expired rows in one pass.
    pub async fn purge_expired(&self) -> u64 {
        let now = Utc::now().timestamp();
        match sqlx::query("DELETE FROM provider_cache WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
        {
            Ok(done) => done.rows_affected(),
            Err(e) => {
                warn!("[CACHE] Purge failed: {}", e);
                0
            }
        }
    }

    pub async fn stats(&self) -> CacheStats {
        let now = Utc::now().timestamp();
        let row = sqlx::query(
            "SELECT COUNT(*) AS total,
                    SUM(CASE WHEN expires_at <= ? THEN 1 ELSE 0 END) AS expired
             FROM provider_cache",
        )
        .bind(now)
        .fetch_one(&self.pool)
        .await;
        match row {
            Ok(row) => CacheStats {
                total_entries: row.get::<i64, _>("total"),
                expired_entries: row.get::<Option<i64>, _>("expired").unwrap_or(0),
            },
            Err(e) => {
                warn!("[CACHE] Stats failed: {}", e);
                CacheStats {
                    total_entries: 0,
                    expired_entries: 0,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use serde_json::json;

    #[test]
    fn test_make_cache_key() {
        assert_eq!(
            make_cache_key("events", &["nba", "2026-02-11"]),
            "events:nba:2026-02-11"
        );
        assert_eq!(make_cache_key("team", &["eng.1", "364"]), "team:eng.1:364");
    }

    #[tokio::test]
    async fn test_set_get_roundtrip() {
        let cache = PersistentTtlCache::new(test_pool().await);
        let value = json!({"id": "401", "home_score": 98});
        cache.set("event:nba:401", &value, Duration::from_secs(60)).await;
        assert_eq!(cache.get("event:nba:401").await, Some(value));
    }

    #[tokio::test]
    async fn test_missing_key_absent() {
        let cache = PersistentTtlCache::new(test_pool().await);
        assert_eq!(cache.get("nope").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_absent_and_evicted() {
        let cache = PersistentTtlCache::new(test_pool().await);
        cache.set("k", &json!(1), Duration::from_secs(0)).await;
        assert_eq!(cache.get("k").await, None);
        // Lazy eviction removed the row.
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let cache = PersistentTtlCache::new(test_pool().await);
        cache.set("k", &json!("old"), Duration::from_secs(60)).await;
        cache.set("k", &json!("new"), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some(json!("new")));
        assert_eq!(cache.stats().await.total_entries, 1);
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = PersistentTtlCache::new(test_pool().await);
        cache.set("a", &json!(1), Duration::from_secs(60)).await;
        cache.set("b", &json!(2), Duration::from_secs(60)).await;
        cache.delete("a").await;
        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.get("b").await, Some(json!(2)));
        cache.clear().await;
        assert_eq!(cache.stats().await.total_entries, 0);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let cache = PersistentTtlCache::new(test_pool().await);
        cache.set("live", &json!(1), Duration::from_secs(600)).await;
        cache.set("dead", &json!(2), Duration::from_secs(0)).await;
        let purged = cache.purge_expired().await;
        assert_eq!(purged, 1);
        assert_eq!(cache.stats().await.total_entries, 1);
    }

    #[test]
    fn test_events_ttl_narrows_today() {
        let today = Utc::now().date_naive();
        assert_eq!(events_cache_ttl(today), CACHE_TTL_EVENTS_TODAY);
        let future = today + chrono::Days::new(3);
        assert_eq!(events_cache_ttl(future), CACHE_TTL_EVENTS);
    }
}
