//! Keyword channel ordering enforcement.
//!
//! Ensures the main channel (no exception_keyword) has a lower channel
//! number than keyword variants (Spanish, French) for the same event.
//! Users expect the main English feed before language variants in the
//! guide; creation order does not guarantee that.
//!
//! Swaps apply to the downstream manager and local persistence inside a
//! single critical section, with history logged on both channels.
//! Re-running after a successful pass is a no-op.

use crate::db::channels::{log_channel_history, update_channel_number};
use crate::dispatcharr::{ChannelManagerApi, ChannelUpdate};
use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// One completed swap, for the result payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReorderedPair {
    pub event_id: String,
    pub main_channel: String,
    pub keyword_channel: String,
    pub keyword: String,
    pub old_main_number: u32,
    pub new_main_number: u32,
}

/// Result of keyword ordering enforcement.
#[derive(Debug, Default, Serialize)]
pub struct OrderingResult {
    pub reordered: Vec<ReorderedPair>,
    pub already_correct: usize,
    pub errors: Vec<String>,
}

impl OrderingResult {
    pub fn reordered_count(&self) -> usize {
        self.reordered.len()
    }
}

#[derive(Debug)]
struct ReorderPair {
    main_id: i64,
    main_number: u32,
    main_dispatcharr_id: i64,
    main_name: String,
    event_id: String,
    keyword_id: i64,
    keyword_number: u32,
    keyword_dispatcharr_id: i64,
    keyword_name: String,
    keyword: String,
}

/// Enforces channel ordering: main before keyword channels.
pub struct KeywordOrderingEnforcer {
    pool: SqlitePool,
    dispatcharr_lock: Mutex<()>,
}

impl KeywordOrderingEnforcer {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            dispatcharr_lock: Mutex::new(()),
        }
    }

    /// Find events where a keyword channel sits below the main channel.
    async fn channels_needing_reorder(&self) -> Result<Vec<ReorderPair>> {
        let rows = sqlx::query(
            "SELECT
                m.id AS main_id,
                m.channel_number AS main_number,
                m.dispatcharr_channel_id AS main_dispatcharr_id,
                m.channel_name AS main_name,
                m.event_id,
                k.id AS keyword_id,
                k.channel_number AS keyword_number,
                k.dispatcharr_channel_id AS keyword_dispatcharr_id,
                k.channel_name AS keyword_name,
                k.exception_keyword
             FROM managed_channels m
             JOIN managed_channels k ON m.event_id = k.event_id
                                    AND m.event_epg_group_id = k.event_epg_group_id
             WHERE m.deleted_at IS NULL
               AND k.deleted_at IS NULL
               AND (m.exception_keyword IS NULL OR m.exception_keyword = '')
               AND k.exception_keyword IS NOT NULL
               AND k.exception_keyword != ''
               AND k.channel_number < m.channel_number",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ReorderPair {
                main_id: row.get("main_id"),
                main_number: row.get::<i64, _>("main_number") as u32,
                main_dispatcharr_id: row.get("main_dispatcharr_id"),
                main_name: row.get("main_name"),
                event_id: row.get("event_id"),
                keyword_id: row.get("keyword_id"),
                keyword_number: row.get::<i64, _>("keyword_number") as u32,
                keyword_dispatcharr_id: row.get("keyword_dispatcharr_id"),
                keyword_name: row.get("keyword_name"),
                keyword: row.get("exception_keyword"),
            })
            .collect())
    }

    /// Count of main/variant pairs already in the correct order.
    async fn correct_pair_count(&self) -> Result<usize> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n
             FROM managed_channels m
             JOIN managed_channels k ON m.event_id = k.event_id
                                    AND m.event_epg_group_id = k.event_epg_group_id
             WHERE m.deleted_at IS NULL
               AND k.deleted_at IS NULL
               AND (m.exception_keyword IS NULL OR m.exception_keyword = '')
               AND k.exception_keyword IS NOT NULL
               AND k.exception_keyword != ''
               AND k.channel_number > m.channel_number",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get::<i64, _>("n") as usize)
    }

    /// Run keyword ordering enforcement, swapping numbers both in
    /// persistence and downstream.
    pub async fn enforce(
        &self,
        channel_manager: Option<&dyn ChannelManagerApi>,
    ) -> OrderingResult {
        let mut result = OrderingResult::default();

        let pairs = match self.channels_needing_reorder().await {
            Ok(pairs) => pairs,
            Err(e) => {
                warn!("[ORDERING_ERROR] {}", e);
                result.errors.push(e.to_string());
                return result;
            }
        };
        result.already_correct = self.correct_pair_count().await.unwrap_or(0);

        for pair in pairs {
            let swap = self.swap_pair(&pair, channel_manager).await;
            match swap {
                Ok(()) => {
                    info!(
                        "[ORDERING] Swapped main #{} <-> keyword '{}' #{} (event={})",
                        pair.keyword_number, pair.keyword, pair.main_number, pair.event_id
                    );
                    result.reordered.push(ReorderedPair {
                        event_id: pair.event_id,
                        main_channel: pair.main_name,
                        keyword_channel: pair.keyword_name,
                        keyword: pair.keyword,
                        old_main_number: pair.main_number,
                        new_main_number: pair.keyword_number,
                    });
                }
                Err(e) => {
                    warn!("[ORDERING] Failed to reorder: {}", e);
                    result.errors.push(format!("{}: {}", pair.event_id, e));
                }
            }
        }

        if result.reordered_count() > 0 {
            info!(
                "[ORDERING] Reordered {} channel pair(s)",
                result.reordered_count()
            );
        }
        result
    }

    async fn swap_pair(
        &self,
        pair: &ReorderPair,
        channel_manager: Option<&dyn ChannelManagerApi>,
    ) -> Result<()> {
        // Downstream first, under the shared critical section.
        if let Some(manager) = channel_manager {
            let _guard = self.dispatcharr_lock.lock().await;
            manager
                .update_channel(
                    pair.main_dispatcharr_id,
                    &ChannelUpdate {
                        channel_number: Some(pair.keyword_number),
                        ..ChannelUpdate::default()
                    },
                )
                .await?;
            manager
                .update_channel(
                    pair.keyword_dispatcharr_id,
                    &ChannelUpdate {
                        channel_number: Some(pair.main_number),
                        ..ChannelUpdate::default()
                    },
                )
                .await?;
        }

        update_channel_number(&self.pool, pair.main_id, pair.keyword_number).await?;
        update_channel_number(&self.pool, pair.keyword_id, pair.main_number).await?;

        log_channel_history(
            &self.pool,
            pair.main_id,
            "number_swapped",
            "keyword_ordering",
            Some("channel_number"),
            Some(&pair.main_number.to_string()),
            Some(&pair.keyword_number.to_string()),
            Some("Swapped with keyword channel for main-first ordering"),
        )
        .await?;
        log_channel_history(
            &self.pool,
            pair.keyword_id,
            "number_swapped",
            "keyword_ordering",
            Some("channel_number"),
            Some(&pair.keyword_number.to_string()),
            Some(&pair.main_number.to_string()),
            Some("Swapped with main channel for main-first ordering"),
        )
        .await?;
        Ok(())
    }
}
