//! Dispatcharr HTTP client with JWT authentication.
//!
//! Just-in-time auth: the first request logs in, subsequent requests
//! reuse the cached access token and refresh it one minute before its
//! five-minute expiry. A 401 forces a fresh login and one retry. All
//! mutations serialize through a per-process lock so stream moves and
//! number swaps apply atomically relative to local records.

use super::{
    ChannelCreate, ChannelManagerApi, ChannelUpdate, CreationResult, DownstreamChannel,
    DownstreamStream,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Refresh this long before the token's nominal expiry.
const TOKEN_REFRESH_BUFFER_MINUTES: i64 = 1;
/// Dispatcharr access tokens live about five minutes.
const TOKEN_VALIDITY_MINUTES: i64 = 5;

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    token_expiry: Option<DateTime<Utc>>,
}

/// Authenticated Dispatcharr API client.
#[derive(Clone)]
pub struct DispatcharrClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    token: Arc<Mutex<TokenState>>,
    /// Serializes mutations relative to local records.
    write_lock: Arc<Mutex<()>>,
}

impl std::fmt::Debug for DispatcharrClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcharrClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .finish()
    }
}

impl DispatcharrClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            token: Arc::new(Mutex::new(TokenState::default())),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    async fn login(&self, state: &mut TokenState) -> Result<()> {
        let url = format!("{}/api/accounts/token/", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({
                "username": self.username,
                "password": self.password,
            }))
            .send()
            .await?;
        if !response.status().is_success() {
            bail!("Dispatcharr login failed: HTTP {}", response.status());
        }
        let body: Value = response.json().await?;
        state.access_token = body["access"].as_str().map(String::from);
        state.refresh_token = body["refresh"].as_str().map(String::from);
        state.token_expiry = Some(Utc::now() + Duration::minutes(TOKEN_VALIDITY_MINUTES));
        if state.access_token.is_none() {
            bail!("Dispatcharr login returned no access token");
        }
        info!("[DISPATCHARR] Authenticated as {}", self.username);
        Ok(())
    }

    async fn refresh(&self, state: &mut TokenState) -> Result<()> {
        let Some(refresh_token) = state.refresh_token.clone() else {
            return self.login(state).await;
        };
        let url = format!("{}/api/accounts/token/refresh/", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "refresh": refresh_token }))
            .send()
            .await;
        match response {
            Ok(response) if response.status().is_success() => {
                let body: Value = response.json().await?;
                state.access_token = body["access"].as_str().map(String::from);
                state.token_expiry =
                    Some(Utc::now() + Duration::minutes(TOKEN_VALIDITY_MINUTES));
                debug!("[DISPATCHARR] Token refreshed");
                Ok(())
            }
            _ => {
                debug!("[DISPATCHARR] Refresh failed, re-authenticating");
                self.login(state).await
            }
        }
    }

    /// A valid bearer token, refreshing or logging in as needed.
    async fn bearer(&self) -> Result<String> {
        let mut state = self.token.lock().await;
        let expiring = state.token_expiry.map_or(true, |expiry| {
            Utc::now() + Duration::minutes(TOKEN_REFRESH_BUFFER_MINUTES) >= expiry
        });
        if state.access_token.is_none() {
            self.login(&mut state).await?;
        } else if expiring {
            self.refresh(&mut state).await?;
        }
        state
            .access_token
            .clone()
            .ok_or_else(|| anyhow!("no access token after auth"))
    }

    /// Authenticated request; a 401 forces one re-login and retry.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        let url = format!("{}{}", self.base_url, path);
        for attempt in 0..2 {
            let token = self.bearer().await?;
            let mut request = self
                .client
                .request(method.clone(), &url)
                .bearer_auth(&token);
            if let Some(body) = body {
                request = request.json(body);
            }
            let response = request.send().await?;
            match response.status() {
                StatusCode::UNAUTHORIZED if attempt == 0 => {
                    warn!("[DISPATCHARR] 401 on {}, re-authenticating", path);
                    self.token.lock().await.access_token = None;
                }
                status if status.is_success() => {
                    if status == StatusCode::NO_CONTENT {
                        return Ok(None);
                    }
                    return Ok(response.json().await.ok());
                }
                status => bail!("Dispatcharr HTTP {} on {}", status, path),
            }
        }
        bail!("Dispatcharr auth retry exhausted on {}", path)
    }

    /// Authenticated request for sibling managers (logos).
    pub(crate) async fn request_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        self.request(method, path, body).await
    }

    fn parse_channel(value: &Value) -> Option<DownstreamChannel> {
        Some(DownstreamChannel {
            id: value["id"].as_i64()?,
            name: value["name"].as_str().unwrap_or_default().to_string(),
            channel_number: value["channel_number"].as_u64().unwrap_or(0) as u32,
            tvg_id: value["tvg_id"].as_str().map(String::from),
            channel_group_id: value["channel_group_id"].as_i64(),
            streams: value["streams"]
                .as_array()
                .map(|s| s.iter().filter_map(Value::as_i64).collect())
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl ChannelManagerApi for DispatcharrClient {
    async fn get_channels(&self) -> Result<Vec<DownstreamChannel>> {
        let body = self
            .request(Method::GET, "/api/channels/channels/?page_size=1000", None)
            .await?
            .unwrap_or(Value::Null);
        let items = body["results"]
            .as_array()
            .or_else(|| body.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(items.iter().filter_map(Self::parse_channel).collect())
    }

    async fn get_channel(&self, id: i64) -> Result<Option<DownstreamChannel>> {
        let body = self
            .request(Method::GET, &format!("/api/channels/channels/{id}/"), None)
            .await?;
        Ok(body.as_ref().and_then(Self::parse_channel))
    }

    async fn update_channel(&self, id: i64, fields: &ChannelUpdate) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let body = serde_json::to_value(fields)?;
        self.request(
            Method::PATCH,
            &format!("/api/channels/channels/{id}/"),
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn create_channel(&self, request: &ChannelCreate) -> Result<CreationResult> {
        let _guard = self.write_lock.lock().await;
        let body = serde_json::to_value(request)?;
        let response = self
            .request(Method::POST, "/api/channels/channels/", Some(&body))
            .await?
            .ok_or_else(|| anyhow!("empty create response"))?;
        Ok(CreationResult {
            channel_id: response["id"]
                .as_i64()
                .ok_or_else(|| anyhow!("create response missing id"))?,
            channel_number: response["channel_number"].as_u64().unwrap_or(0) as u32,
        })
    }

    async fn delete_channel(&self, id: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.request(Method::DELETE, &format!("/api/channels/channels/{id}/"), None)
            .await?;
        Ok(())
    }

    async fn set_channel_epg(&self, channel_id: i64, epg_id: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.request(
            Method::PATCH,
            &format!("/api/channels/channels/{channel_id}/"),
            Some(&serde_json::json!({ "epg_data_id": epg_id })),
        )
        .await?;
        Ok(())
    }

    async fn list_streams(&self) -> Result<Vec<DownstreamStream>> {
        let body = self
            .request(Method::GET, "/api/channels/streams/?page_size=5000", None)
            .await?
            .unwrap_or(Value::Null);
        let items = body["results"]
            .as_array()
            .or_else(|| body.as_array())
            .cloned()
            .unwrap_or_default();
        Ok(items
            .iter()
            .filter_map(|item| {
                Some(DownstreamStream {
                    id: item["id"].as_i64()?,
                    name: item["name"].as_str().unwrap_or_default().to_string(),
                    channel_group: item["channel_group"]
                        .as_str()
                        .or_else(|| item["channel_group"]["name"].as_str())
                        .map(String::from),
                    m3u_account_id: item["m3u_account"].as_i64(),
                    m3u_account_name: item["m3u_account_name"].as_str().map(String::from),
                    is_stale: item["is_stale"].as_bool().unwrap_or(false),
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = DispatcharrClient::new("http://localhost:9191/", "admin", "secret");
        assert_eq!(client.base_url, "http://localhost:9191");
    }

    #[test]
    fn test_parse_channel_shapes() {
        let value = serde_json::json!({
            "id": 42,
            "name": "Pistons Game",
            "channel_number": 105,
            "tvg_id": "teamarr-event-401",
            "channel_group_id": 3,
            "streams": [501, 502]
        });
        let channel = DispatcharrClient::parse_channel(&value).unwrap();
        assert_eq!(channel.id, 42);
        assert_eq!(channel.channel_number, 105);
        assert_eq!(channel.streams, vec![501, 502]);
        assert!(DispatcharrClient::parse_channel(&serde_json::json!({})).is_none());
    }
}
