//! Downstream channel manager (Dispatcharr) interface.
//!
//! The rest of the system talks to the downstream manager through
//! [`ChannelManagerApi`]; the HTTP client lives in `client` and is the
//! only thing that knows the wire format. Mutations hold a per-process
//! lock so stream moves and number swaps apply atomically relative to
//! local records.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod client;
pub mod logos;

pub use client::DispatcharrClient;
pub use logos::LogoManager;

/// Sentinel profile id meaning "all profiles".
pub const ALL_PROFILES: i64 = 0;

/// A channel as the downstream manager reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownstreamChannel {
    pub id: i64,
    pub name: String,
    pub channel_number: u32,
    pub tvg_id: Option<String>,
    pub channel_group_id: Option<i64>,
    #[serde(default)]
    pub streams: Vec<i64>,
}

/// Fields for a channel update; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvg_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_group_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streams: Option<Vec<i64>>,
}

/// Channel creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelCreate {
    pub name: String,
    pub channel_number: u32,
    pub tvg_id: String,
    pub channel_group_id: Option<i64>,
    /// `[0]` means all profiles.
    pub channel_profile_ids: Vec<i64>,
    pub stream_profile_id: Option<i64>,
    pub streams: Vec<i64>,
}

/// Result of a channel creation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreationResult {
    pub channel_id: i64,
    pub channel_number: u32,
}

/// A stream as the stream source lists it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DownstreamStream {
    pub id: i64,
    pub name: String,
    pub channel_group: Option<String>,
    pub m3u_account_id: Option<i64>,
    pub m3u_account_name: Option<String>,
    #[serde(default)]
    pub is_stale: bool,
}

/// Contract for downstream channel management.
#[async_trait]
pub trait ChannelManagerApi: Send + Sync {
    async fn get_channels(&self) -> Result<Vec<DownstreamChannel>>;

    async fn find_by_number(&self, number: u32) -> Result<Option<DownstreamChannel>> {
        Ok(self
            .get_channels()
            .await?
            .into_iter()
            .find(|c| c.channel_number == number))
    }

    async fn find_by_tvg_id(&self, tvg_id: &str) -> Result<Option<DownstreamChannel>> {
        Ok(self
            .get_channels()
            .await?
            .into_iter()
            .find(|c| c.tvg_id.as_deref() == Some(tvg_id)))
    }

    async fn get_channel(&self, id: i64) -> Result<Option<DownstreamChannel>>;

    async fn update_channel(&self, id: i64, fields: &ChannelUpdate) -> Result<()>;

    async fn create_channel(&self, request: &ChannelCreate) -> Result<CreationResult>;

    async fn delete_channel(&self, id: i64) -> Result<()>;

    /// Bind a channel to an EPG source entry by id.
    async fn set_channel_epg(&self, channel_id: i64, epg_id: i64) -> Result<()>;

    /// Streams available from the stream source.
    async fn list_streams(&self) -> Result<Vec<DownstreamStream>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_update_skips_unset_fields() {
        let update = ChannelUpdate {
            channel_number: Some(105),
            ..ChannelUpdate::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"channel_number":105}"#);
    }

    #[test]
    fn test_all_profiles_sentinel() {
        let create = ChannelCreate {
            name: "Ch".to_string(),
            channel_number: 100,
            tvg_id: "teamarr-event-1".to_string(),
            channel_group_id: None,
            channel_profile_ids: vec![ALL_PROFILES],
            stream_profile_id: None,
            streams: vec![],
        };
        let json = serde_json::to_value(&create).unwrap();
        assert_eq!(json["channel_profile_ids"], serde_json::json!([0]));
    }
}
