//! Service configuration from environment variables.

/// Environment-driven service config; user-facing options live in the
/// settings table, this covers process wiring only.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    /// Run one generation cycle and exit (manual trigger path).
    pub run_once: bool,
    /// Fallback generation interval when the settings table has none.
    pub default_interval_minutes: u64,
    pub days_ahead: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://teamarr.db".to_string()),
            run_once: std::env::var("RUN_ONCE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            default_interval_minutes: std::env::var("GENERATION_INTERVAL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            days_ahead: std::env::var("DAYS_AHEAD")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(7)
                .clamp(1, 14),
        }
    }
}
