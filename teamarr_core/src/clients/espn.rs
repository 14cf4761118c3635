//! ESPN API HTTP client.
//!
//! Handles raw HTTP requests to ESPN endpoints with rate limiting and
//! retry. No data transformation: fetch and return JSON. TLS failures
//! rebuild the reqwest client so the next attempt gets a fresh
//! connection pool.

use crate::rate_limit::{RateLimitStats, TokenBucket};
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use parking_lot::RwLock;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const ESPN_BASE_URL: &str = "https://site.api.espn.com/apis/site/v2/sports";

/// College scoreboards need a groups filter to avoid partial payloads.
const COLLEGE_SCOREBOARD_GROUPS: &[(&str, &str)] = &[
    ("mens-college-basketball", "50"),
    ("womens-college-basketball", "50"),
];

const DEFAULT_REQUESTS_PER_SECOND: f64 = 10.0;
const DEFAULT_BURST_SIZE: u32 = 20;

/// Low-level ESPN API client with rate limiting.
#[derive(Clone)]
pub struct EspnClient {
    client: Arc<RwLock<Client>>,
    limiter: Arc<TokenBucket>,
    timeout: Duration,
    retry_count: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for EspnClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EspnClient")
            .field("retry_count", &self.retry_count)
            .finish()
    }
}

impl Default for EspnClient {
    fn default() -> Self {
        Self::new()
    }
}

impl EspnClient {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_REQUESTS_PER_SECOND, DEFAULT_BURST_SIZE)
    }

    pub fn with_limits(requests_per_second: f64, burst_size: u32) -> Self {
        let timeout = Duration::from_secs(10);
        Self {
            client: Arc::new(RwLock::new(Self::build_client(timeout))),
            limiter: Arc::new(TokenBucket::new(requests_per_second, burst_size)),
            timeout,
            retry_count: 3,
            retry_delay: Duration::from_secs(1),
        }
    }

    fn build_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| Client::new())
    }

    /// Replace the underlying client, dropping stale connections.
    fn reset_client(&self) {
        info!("[ESPN] TLS error detected, resetting connection pool");
        *self.client.write() = Self::build_client(self.timeout);
    }

    fn is_tls_error(err: &reqwest::Error) -> bool {
        let text = err.to_string().to_lowercase();
        text.contains("ssl") || text.contains("tls") || text.contains("eof occurred")
    }

    /// GET with rate limiting and linear-backoff retry.
    async fn request(&self, url: &str, params: &[(&str, &str)]) -> Result<serde_json::Value> {
        let mut last_error = anyhow!("no attempts made");
        for attempt in 0..self.retry_count {
            self.limiter.acquire().await;

            let client = self.client.read().clone();
            let result = client.get(url).query(params).send().await;
            match result {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        warn!("[ESPN] HTTP {} for {}", status, url);
                        last_error = anyhow!("HTTP {} for {}", status, url);
                    } else {
                        match response.json::<serde_json::Value>().await {
                            Ok(body) => return Ok(body),
                            Err(e) => {
                                warn!("[ESPN] Body decode failed for {}: {}", url, e);
                                last_error = e.into();
                            }
                        }
                    }
                }
                Err(e) => {
                    warn!("[ESPN] Request failed for {}: {}", url, e);
                    if Self::is_tls_error(&e) {
                        self.reset_client();
                    }
                    last_error = e.into();
                }
            }

            if attempt + 1 < self.retry_count {
                tokio::time::sleep(self.retry_delay * (attempt + 1)).await;
            }
        }
        Err(last_error)
    }

    /// Scoreboard for a league on a given date.
    pub async fn scoreboard(
        &self,
        sport: &str,
        league: &str,
        date: NaiveDate,
    ) -> Result<serde_json::Value> {
        let url = format!("{ESPN_BASE_URL}/{sport}/{league}/scoreboard");
        let dates = date.format("%Y%m%d").to_string();
        let mut params = vec![("dates", dates.as_str())];
        if let Some((_, groups)) = COLLEGE_SCOREBOARD_GROUPS
            .iter()
            .find(|(l, _)| *l == league)
        {
            params.push(("groups", groups));
        }
        self.request(&url, &params).await
    }

    /// A team's season schedule (past and future games).
    pub async fn team_schedule(
        &self,
        sport: &str,
        league: &str,
        team_id: &str,
    ) -> Result<serde_json::Value> {
        let url = format!("{ESPN_BASE_URL}/{sport}/{league}/teams/{team_id}/schedule");
        self.request(&url, &[]).await
    }

    /// Team info including record, rank, and standing summary.
    pub async fn team(&self, sport: &str, league: &str, team_id: &str) -> Result<serde_json::Value> {
        let url = format!("{ESPN_BASE_URL}/{sport}/{league}/teams/{team_id}");
        self.request(&url, &[]).await
    }

    /// Event summary with boxscore, leaders, and odds.
    pub async fn summary(
        &self,
        sport: &str,
        league: &str,
        event_id: &str,
    ) -> Result<serde_json::Value> {
        let url = format!("{ESPN_BASE_URL}/{sport}/{league}/summary");
        self.request(&url, &[("event", event_id)]).await
    }

    /// Roster endpoint; includes the coach entry.
    pub async fn roster(
        &self,
        sport: &str,
        league: &str,
        team_id: &str,
    ) -> Result<serde_json::Value> {
        let url = format!("{ESPN_BASE_URL}/{sport}/{league}/teams/{team_id}/roster");
        self.request(&url, &[("enable", "coaches")]).await
    }

    /// All teams in a league (bulk enumeration for the team cache).
    pub async fn teams(&self, sport: &str, league: &str) -> Result<serde_json::Value> {
        let url = format!("{ESPN_BASE_URL}/{sport}/{league}/teams");
        self.request(&url, &[("limit", "500")]).await
    }

    pub fn rate_limit_stats(&self) -> RateLimitStats {
        self.limiter.stats()
    }

    pub fn reset_rate_limit_stats(&self) {
        self.limiter.reset_stats();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_college_groups_lookup() {
        assert!(COLLEGE_SCOREBOARD_GROUPS
            .iter()
            .any(|(l, g)| *l == "mens-college-basketball" && *g == "50"));
        assert!(!COLLEGE_SCOREBOARD_GROUPS
            .iter()
            .any(|(l, _)| *l == "college-football"));
    }

    #[test]
    fn test_client_is_cloneable_and_shares_limiter() {
        let a = EspnClient::new();
        let b = a.clone();
        assert!(a.limiter.try_acquire());
        assert_eq!(b.rate_limit_stats().total_requests, 1);
    }
}
