//! Logo management for downstream channels.
//!
//! `upload_or_find` is idempotent on URL: a logo already known for the
//! same URL is reused instead of re-uploaded. The URL→logo cache fills
//! lazily from the logo listing endpoint.

use super::DispatcharrClient;
use anyhow::Result;
use parking_lot::Mutex;
use reqwest::Method;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// One downstream logo entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logo {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// URL-idempotent logo uploader.
pub struct LogoManager {
    client: DispatcharrClient,
    /// url → logo; filled on first use.
    cache: Arc<Mutex<Option<FxHashMap<String, Logo>>>>,
}

impl LogoManager {
    pub fn new(client: DispatcharrClient) -> Self {
        Self {
            client,
            cache: Arc::new(Mutex::new(None)),
        }
    }

    pub fn clear_cache(&self) {
        *self.cache.lock() = None;
    }

    fn parse_logo(value: &Value) -> Option<Logo> {
        Some(Logo {
            id: value["id"].as_i64()?,
            name: value["name"].as_str().unwrap_or_default().to_string(),
            url: value["url"].as_str()?.to_string(),
        })
    }

    async fn ensure_cache(&self) -> Result<()> {
        if self.cache.lock().is_some() {
            return Ok(());
        }
        let body = self
            .client
            .request_raw(Method::GET, "/api/channels/logos/?page_size=500", None)
            .await?
            .unwrap_or(Value::Null);
        let items = body["results"]
            .as_array()
            .or_else(|| body.as_array())
            .cloned()
            .unwrap_or_default();
        let mut map = FxHashMap::default();
        for item in &items {
            if let Some(logo) = Self::parse_logo(item) {
                map.insert(logo.url.clone(), logo);
            }
        }
        debug!("[LOGOS] Cached {} logos", map.len());
        *self.cache.lock() = Some(map);
        Ok(())
    }

    /// Find a logo by URL from the cached listing.
    pub async fn find_by_url(&self, url: &str) -> Result<Option<Logo>> {
        self.ensure_cache().await?;
        Ok(self
            .cache
            .lock()
            .as_ref()
            .and_then(|cache| cache.get(url).cloned()))
    }

    /// Upload a logo, or return the existing one for the same URL.
    pub async fn upload_or_find(&self, name: &str, url: &str) -> Result<Option<i64>> {
        if url.is_empty() {
            return Ok(None);
        }
        if let Some(existing) = self.find_by_url(url).await? {
            return Ok(Some(existing.id));
        }
        let body = self
            .client
            .request_raw(
                Method::POST,
                "/api/channels/logos/",
                Some(&serde_json::json!({ "name": name, "url": url })),
            )
            .await?;
        let Some(logo) = body.as_ref().and_then(Self::parse_logo) else {
            return Ok(None);
        };
        let id = logo.id;
        if let Some(cache) = self.cache.lock().as_mut() {
            cache.insert(logo.url.clone(), logo);
        }
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_logo() {
        let value = serde_json::json!({
            "id": 7,
            "name": "Pistons",
            "url": "https://cdn.example.com/det.png"
        });
        let logo = LogoManager::parse_logo(&value).unwrap();
        assert_eq!(logo.id, 7);
        assert_eq!(logo.url, "https://cdn.example.com/det.png");
        // No URL: unusable for idempotence, skipped.
        assert!(LogoManager::parse_logo(&serde_json::json!({"id": 8, "name": "x"})).is_none());
    }
}
