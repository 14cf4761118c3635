//! Keyword enforcement sweep.
//!
//! Verifies every attached stream sits on the channel matching its
//! keyword (`None` for the main feed). Mismatches move the stream:
//! remove from its current channel, attach to the target at the next
//! available priority, sync the downstream manager, and log history on
//! both channels. Behavior `ignore` removes the stream entirely.

use crate::db::channels::{
    attach_stream, detach_stream, get_active_channels, get_channel_streams, log_channel_history,
};
use crate::dispatcharr::{ChannelManagerApi, ChannelUpdate};
use crate::types::ManagedChannel;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// What to do with streams matching a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeywordBehavior {
    /// Attach to a dedicated variant channel.
    #[default]
    Split,
    /// Remove the stream entirely.
    Ignore,
}

/// One configured exception keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionKeyword {
    pub keyword: String,
    pub behavior: KeywordBehavior,
}

/// Determine which keyword (if any) a stream name matches.
pub fn check_exception_keyword<'a>(
    stream_name: &str,
    keywords: &'a [ExceptionKeyword],
) -> Option<&'a ExceptionKeyword> {
    let lower = stream_name.to_lowercase();
    keywords
        .iter()
        .find(|k| lower.contains(&k.keyword.to_lowercase()))
}

/// One stream move for the result payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StreamMove {
    pub stream: String,
    pub action: String,
    pub from_keyword: Option<String>,
    pub to_keyword: Option<String>,
}

/// Result of a keyword enforcement sweep.
#[derive(Debug, Default, Serialize)]
pub struct KeywordEnforcementResult {
    pub streams_moved: Vec<StreamMove>,
    pub streams_correct: usize,
    pub errors: Vec<String>,
}

impl KeywordEnforcementResult {
    pub fn moved_count(&self) -> usize {
        self.streams_moved.len()
    }
}

/// Sweeps every channel's streams against the keyword table.
pub struct KeywordEnforcer {
    pool: SqlitePool,
    keywords: Vec<ExceptionKeyword>,
}

impl KeywordEnforcer {
    pub fn new(pool: SqlitePool, keywords: Vec<ExceptionKeyword>) -> Self {
        Self { pool, keywords }
    }

    /// Run keyword enforcement across all channels.
    pub async fn enforce(
        &self,
        channel_manager: Option<&dyn ChannelManagerApi>,
    ) -> KeywordEnforcementResult {
        let mut result = KeywordEnforcementResult::default();
        if self.keywords.is_empty() {
            debug!("[KEYWORD] No exception keywords configured, skipping");
            return result;
        }

        let channels = match get_active_channels(&self.pool).await {
            Ok(channels) => channels,
            Err(e) => {
                warn!("[KEYWORD_ERROR] {}", e);
                result.errors.push(e.to_string());
                return result;
            }
        };

        // (group, event) → keyword → channel
        let mut lookup: HashMap<(i64, String), HashMap<Option<String>, ManagedChannel>> =
            HashMap::new();
        for channel in &channels {
            let keyword = channel
                .exception_keyword
                .clone()
                .filter(|k| !k.is_empty());
            lookup
                .entry((channel.event_epg_group_id, channel.event_id.clone()))
                .or_default()
                .insert(keyword, channel.clone());
        }

        for channel in &channels {
            let streams = match get_channel_streams(&self.pool, channel.id).await {
                Ok(streams) => streams,
                Err(e) => {
                    result.errors.push(e.to_string());
                    continue;
                }
            };
            let current_keyword = channel
                .exception_keyword
                .clone()
                .filter(|k| !k.is_empty());

            for stream in streams {
                let matched = check_exception_keyword(&stream.stream_name, &self.keywords);
                let expected_keyword = matched.map(|k| k.keyword.clone());

                if let Some(matched) = matched {
                    if matched.behavior == KeywordBehavior::Ignore {
                        if let Err(e) = self
                            .remove_stream(channel, stream.stream_id, channel_manager)
                            .await
                        {
                            result.errors.push(e.to_string());
                            continue;
                        }
                        result.streams_moved.push(StreamMove {
                            stream: stream.stream_name.clone(),
                            action: "removed".to_string(),
                            from_keyword: current_keyword.clone(),
                            to_keyword: expected_keyword.clone(),
                        });
                        continue;
                    }
                }

                if current_keyword == expected_keyword {
                    result.streams_correct += 1;
                    continue;
                }

                let key = (channel.event_epg_group_id, channel.event_id.clone());
                // Fall back to the main channel when no variant exists.
                let target = lookup.get(&key).and_then(|by_keyword| {
                    by_keyword
                        .get(&expected_keyword)
                        .or_else(|| by_keyword.get(&None))
                });
                let Some(target) = target else {
                    result.errors.push(format!(
                        "No target channel for keyword {:?} (stream '{}')",
                        expected_keyword, stream.stream_name
                    ));
                    continue;
                };
                if target.id == channel.id {
                    result.streams_correct += 1;
                    continue;
                }

                if let Err(e) = self
                    .move_stream(channel, target, &stream.stream_name, stream.stream_id, expected_keyword.as_deref(), channel_manager)
                    .await
                {
                    result.errors.push(e.to_string());
                    continue;
                }
                result.streams_moved.push(StreamMove {
                    stream: stream.stream_name.clone(),
                    action: "moved".to_string(),
                    from_keyword: current_keyword.clone(),
                    to_keyword: expected_keyword,
                });
            }
        }

        if result.moved_count() > 0 {
            info!(
                "[KEYWORD] Moved {} streams, {} correct",
                result.moved_count(),
                result.streams_correct
            );
        }
        result
    }

    async fn remove_stream(
        &self,
        channel: &ManagedChannel,
        stream_id: i64,
        channel_manager: Option<&dyn ChannelManagerApi>,
    ) -> Result<()> {
        detach_stream(&self.pool, channel.id, stream_id).await?;
        if let Some(manager) = channel_manager {
            self.sync_streams(manager, channel.dispatcharr_channel_id)
                .await?;
        }
        log_channel_history(
            &self.pool,
            channel.id,
            "stream_removed",
            "keyword_enforcement",
            None,
            None,
            None,
            Some("Keyword behavior is ignore"),
        )
        .await?;
        Ok(())
    }

    async fn move_stream(
        &self,
        from: &ManagedChannel,
        to: &ManagedChannel,
        stream_name: &str,
        stream_id: i64,
        keyword: Option<&str>,
        channel_manager: Option<&dyn ChannelManagerApi>,
    ) -> Result<()> {
        detach_stream(&self.pool, from.id, stream_id).await?;
        attach_stream(&self.pool, to.id, stream_id, stream_name, keyword).await?;

        if let Some(manager) = channel_manager {
            self.sync_streams(manager, from.dispatcharr_channel_id).await?;
            self.sync_streams(manager, to.dispatcharr_channel_id).await?;
        }

        let target_name = keyword.unwrap_or("main");
        log_channel_history(
            &self.pool,
            from.id,
            "stream_removed",
            "keyword_enforcement",
            None,
            None,
            None,
            Some(&format!("Moved stream '{stream_name}' to {target_name} channel")),
        )
        .await?;
        log_channel_history(
            &self.pool,
            to.id,
            "stream_added",
            "keyword_enforcement",
            None,
            None,
            None,
            Some(&format!("Received stream '{stream_name}' from keyword enforcement")),
        )
        .await?;
        Ok(())
    }

    /// Push a channel's current local stream list downstream.
    async fn sync_streams(
        &self,
        manager: &dyn ChannelManagerApi,
        dispatcharr_channel_id: i64,
    ) -> Result<()> {
        let local = sqlx::query(
            "SELECT cs.stream_id FROM channel_streams cs
             JOIN managed_channels mc ON mc.id = cs.managed_channel_id
             WHERE mc.dispatcharr_channel_id = ?
             ORDER BY cs.priority",
        )
        .bind(dispatcharr_channel_id)
        .fetch_all(&self.pool)
        .await?;
        let streams: Vec<i64> = local
            .iter()
            .map(|row| sqlx::Row::get::<i64, _>(row, "stream_id"))
            .collect();
        manager
            .update_channel(
                dispatcharr_channel_id,
                &ChannelUpdate {
                    streams: Some(streams),
                    ..ChannelUpdate::default()
                },
            )
            .await
    }
}
