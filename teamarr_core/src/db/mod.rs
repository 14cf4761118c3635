//! Standardized database connection pool configuration.
//!
//! Provides consistent pool settings across all services, plus first-run
//! schema creation. Teamarr uses a single embedded SQLite store; every
//! persistence module in this crate goes through this pool.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub mod channels;
pub mod detection_keywords;
pub mod settings;
pub mod sort_priorities;
pub mod teams;

/// Database pool configuration
#[derive(Clone, Debug)]
pub struct DbPoolConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection acquire timeout
    pub acquire_timeout: Duration,
    /// SQLite busy timeout before a lock contention error
    pub busy_timeout: Duration,
}

impl Default for DbPoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl DbPoolConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        Self {
            max_connections: std::env::var("DB_POOL_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            acquire_timeout: Duration::from_secs(
                std::env::var("DB_POOL_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            busy_timeout: Duration::from_secs(
                std::env::var("DB_BUSY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Create a SQLite connection pool with standardized configuration.
///
/// `database_url` is a sqlx SQLite URL, e.g. `sqlite://teamarr.db` or
/// `sqlite::memory:`. The database file is created if missing; WAL mode
/// keeps concurrent readers off the writer's lock.
pub async fn create_pool(database_url: &str, config: DbPoolConfig) -> Result<SqlitePool> {
    info!(
        "Creating database pool: max={}, busy_timeout={:?}",
        config.max_connections, config.busy_timeout
    );

    let connect_opts = SqliteConnectOptions::from_str(database_url)
        .context("Failed to parse database URL")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(config.busy_timeout)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_opts)
        .await
        .context("Failed to create database pool")?;

    info!("Database pool created successfully");
    Ok(pool)
}

/// Create every table this crate persists to. Idempotent.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    let statements = [
        // Durable TTL cache for provider payloads.
        "CREATE TABLE IF NOT EXISTS provider_cache (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_provider_cache_expires
            ON provider_cache(expires_at)",
        // User-configured teams with their template assignment.
        "CREATE TABLE IF NOT EXISTS teams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            team_id TEXT NOT NULL,
            league TEXT NOT NULL,
            sport TEXT NOT NULL,
            team_name TEXT NOT NULL,
            team_abbrev TEXT NOT NULL DEFAULT '',
            logo_url TEXT,
            channel_number INTEGER,
            soccer_primary_league TEXT,
            soccer_primary_league_id TEXT,
            soccer_leagues TEXT,
            pregame_enabled INTEGER NOT NULL DEFAULT 1,
            postgame_enabled INTEGER NOT NULL DEFAULT 1,
            idle_enabled INTEGER NOT NULL DEFAULT 1,
            template_id INTEGER,
            enabled INTEGER NOT NULL DEFAULT 1,
            UNIQUE(team_id, league)
        )",
        // User-authored templates. JSON-valued fields hold structured
        // options (description lists, filler overrides).
        "CREATE TABLE IF NOT EXISTS templates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            title_template TEXT NOT NULL DEFAULT '',
            subtitle_template TEXT,
            description_options TEXT,
            art_url_template TEXT,
            pregame_template TEXT,
            postgame_template TEXT,
            idle_template TEXT,
            filler_overrides TEXT,
            sport TEXT,
            league TEXT
        )",
        // Downstream channels Teamarr owns.
        "CREATE TABLE IF NOT EXISTS managed_channels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            dispatcharr_channel_id INTEGER NOT NULL,
            channel_number INTEGER NOT NULL,
            tvg_id TEXT NOT NULL,
            channel_name TEXT NOT NULL,
            event_epg_group_id INTEGER NOT NULL,
            event_id TEXT NOT NULL,
            exception_keyword TEXT,
            scheduled_create_at TEXT,
            scheduled_delete_at TEXT,
            deleted_at TEXT
        )",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_managed_active_dispatcharr
            ON managed_channels(dispatcharr_channel_id)
            WHERE deleted_at IS NULL",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_managed_active_event
            ON managed_channels(event_epg_group_id, event_id, IFNULL(exception_keyword, ''))
            WHERE deleted_at IS NULL",
        // Audit trail for channel mutations (number swaps, stream moves).
        "CREATE TABLE IF NOT EXISTS channel_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            managed_channel_id INTEGER NOT NULL,
            change_type TEXT NOT NULL,
            change_source TEXT NOT NULL,
            field_name TEXT,
            old_value TEXT,
            new_value TEXT,
            notes TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        // Stream attachments for managed channels.
        "CREATE TABLE IF NOT EXISTS channel_streams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            managed_channel_id INTEGER NOT NULL,
            stream_id INTEGER NOT NULL,
            stream_name TEXT NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            matched_keyword TEXT,
            UNIQUE(managed_channel_id, stream_id)
        )",
        // Event EPG groups (bundles of IPTV streams scoped to leagues).
        "CREATE TABLE IF NOT EXISTS event_epg_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            mode TEXT NOT NULL DEFAULT 'single',
            leagues TEXT NOT NULL DEFAULT '[]',
            m3u_group TEXT,
            parent_group_id INTEGER,
            resolved_leagues TEXT,
            channel_start_number INTEGER,
            enabled INTEGER NOT NULL DEFAULT 1
        )",
        // User detection keyword rows merged over built-ins.
        "CREATE TABLE IF NOT EXISTS detection_keywords (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            keyword TEXT NOT NULL,
            is_regex INTEGER NOT NULL DEFAULT 0,
            target_value TEXT,
            enabled INTEGER NOT NULL DEFAULT 1,
            priority INTEGER NOT NULL DEFAULT 0
        )",
        // Stream-name aliases rewritten before matching.
        "CREATE TABLE IF NOT EXISTS user_aliases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            alias TEXT NOT NULL UNIQUE,
            team_name TEXT NOT NULL
        )",
        // Key/value settings store.
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        // Sport/league ordering used by global channel reassignment.
        // league '' means a sport-wide rule.
        "CREATE TABLE IF NOT EXISTS sort_priorities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sport TEXT NOT NULL,
            league TEXT NOT NULL DEFAULT '',
            priority INTEGER NOT NULL,
            UNIQUE(sport, league)
        )",
        // Team/league reverse-lookup catalog.
        "CREATE TABLE IF NOT EXISTS cached_leagues (
            league TEXT PRIMARY KEY,
            sport TEXT NOT NULL,
            display_name TEXT NOT NULL DEFAULT '',
            provider TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS cached_teams (
            team_id TEXT NOT NULL,
            provider TEXT NOT NULL,
            name TEXT NOT NULL,
            normalized_name TEXT NOT NULL,
            abbreviation TEXT NOT NULL DEFAULT '',
            league TEXT NOT NULL,
            sport TEXT NOT NULL,
            PRIMARY KEY (team_id, provider, league)
        )",
        "CREATE INDEX IF NOT EXISTS idx_cached_teams_norm
            ON cached_teams(normalized_name)",
        "CREATE TABLE IF NOT EXISTS cache_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    ];

    for sql in statements {
        sqlx::query(sql)
            .execute(pool)
            .await
            .with_context(|| format!("Schema statement failed: {}", &sql[..40.min(sql.len())]))?;
    }

    info!("Database schema initialized");
    Ok(())
}

/// In-memory pool for tests. Single connection: each `:memory:`
/// connection is its own database, so the pool must never open a second
/// one.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let config = DbPoolConfig {
        max_connections: 1,
        acquire_timeout: Duration::from_secs(5),
        busy_timeout: Duration::from_secs(5),
    };
    let pool = create_pool("sqlite::memory:", config)
        .await
        .expect("in-memory pool");
    init_schema(&pool).await.expect("schema");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbPoolConfig::default();
        assert!(config.max_connections > 0);
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let pool = test_pool().await;
        // Running again must not fail.
        init_schema(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_active_channel_uniqueness() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO managed_channels
             (dispatcharr_channel_id, channel_number, tvg_id, channel_name,
              event_epg_group_id, event_id)
             VALUES (1, 100, 'teamarr-event-1', 'Ch', 1, 'e1')",
        )
        .execute(&pool)
        .await
        .unwrap();

        // Same (group, event, keyword) tuple while active: rejected.
        let dup = sqlx::query(
            "INSERT INTO managed_channels
             (dispatcharr_channel_id, channel_number, tvg_id, channel_name,
              event_epg_group_id, event_id)
             VALUES (2, 101, 'teamarr-event-1', 'Ch2', 1, 'e1')",
        )
        .execute(&pool)
        .await;
        assert!(dup.is_err());

        // Different keyword variant: allowed.
        sqlx::query(
            "INSERT INTO managed_channels
             (dispatcharr_channel_id, channel_number, tvg_id, channel_name,
              event_epg_group_id, event_id, exception_keyword)
             VALUES (3, 102, 'teamarr-event-1', 'Ch ES', 1, 'e1', 'Spanish')",
        )
        .execute(&pool)
        .await
        .unwrap();
    }
}
