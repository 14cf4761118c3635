//! TheSportsDB HTTP client.
//!
//! Free-tier API used as a fallback source for leagues ESPN does not
//! carry. The free tier is heavily rate limited, so the bucket here is
//! much tighter than ESPN's and the provider built on this client
//! reports itself as non-premium.

use crate::rate_limit::{RateLimitStats, TokenBucket};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const TSDB_BASE_URL: &str = "https://www.thesportsdb.com/api/v1/json";
const FREE_TIER_KEY: &str = "3";

// Free tier: ~30 requests/minute sustained.
const FREE_TIER_RATE: f64 = 0.5;
const FREE_TIER_BURST: u32 = 5;

/// Low-level TheSportsDB client with free-tier rate limiting.
#[derive(Clone)]
pub struct TsdbClient {
    client: Client,
    limiter: Arc<TokenBucket>,
    api_key: String,
    retry_count: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for TsdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsdbClient").finish()
    }
}

impl Default for TsdbClient {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TsdbClient {
    /// `api_key = None` selects the free tier (key "3", tight limits).
    pub fn new(api_key: Option<String>) -> Self {
        let (rate, burst) = if api_key.is_some() {
            (5.0, 10)
        } else {
            (FREE_TIER_RATE, FREE_TIER_BURST)
        };
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            limiter: Arc::new(TokenBucket::new(rate, burst)),
            api_key: api_key.unwrap_or_else(|| FREE_TIER_KEY.to_string()),
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    async fn request(&self, path: &str, params: &[(&str, &str)]) -> Result<serde_json::Value> {
        let url = format!("{TSDB_BASE_URL}/{}/{path}", self.api_key);
        let mut last_error = anyhow!("no attempts made");
        for attempt in 0..self.retry_count {
            self.limiter.acquire().await;
            match self.client.get(&url).query(params).send().await {
                Ok(response) if response.status().is_success() => {
                    match response.json::<serde_json::Value>().await {
                        Ok(body) => return Ok(body),
                        Err(e) => last_error = e.into(),
                    }
                }
                Ok(response) => {
                    warn!("[TSDB] HTTP {} for {}", response.status(), path);
                    last_error = anyhow!("HTTP {}", response.status());
                }
                Err(e) => {
                    warn!("[TSDB] Request failed for {}: {}", path, e);
                    last_error = e.into();
                }
            }
            if attempt + 1 < self.retry_count {
                tokio::time::sleep(self.retry_delay * (attempt + 1)).await;
            }
        }
        Err(last_error)
    }

    /// Events in a league on one day.
    pub async fn events_on_day(
        &self,
        league_id: &str,
        date: NaiveDate,
    ) -> Result<serde_json::Value> {
        let date_str = date.format("%Y-%m-%d").to_string();
        self.request("eventsday.php", &[("d", date_str.as_str()), ("l", league_id)])
            .await
    }

    /// Next events for a team.
    pub async fn next_events(&self, team_id: &str) -> Result<serde_json::Value> {
        self.request("eventsnext.php", &[("id", team_id)]).await
    }

    /// Last (completed) events for a team.
    pub async fn last_events(&self, team_id: &str) -> Result<serde_json::Value> {
        self.request("eventslast.php", &[("id", team_id)]).await
    }

    /// Team lookup by id.
    pub async fn team(&self, team_id: &str) -> Result<serde_json::Value> {
        self.request("lookupteam.php", &[("id", team_id)]).await
    }

    /// All teams in a league by name (bulk enumeration for the team cache).
    pub async fn teams_in_league(&self, league_name: &str) -> Result<serde_json::Value> {
        self.request("search_all_teams.php", &[("l", league_name)])
            .await
    }

    /// All leagues for a sport.
    pub async fn leagues(&self) -> Result<serde_json::Value> {
        self.request("all_leagues.php", &[]).await
    }

    pub fn rate_limit_stats(&self) -> RateLimitStats {
        self.limiter.stats()
    }

    pub fn reset_rate_limit_stats(&self) {
        self.limiter.reset_stats();
    }
}
