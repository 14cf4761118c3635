//! Managed channel persistence: channel rows, history, and stream
//! attachments.
//!
//! Channels are mutated exclusively by the lifecycle manager; every
//! mutation here logs a `channel_history` row so swaps and moves can be
//! audited after the fact.

use crate::types::ManagedChannel;
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use thiserror::Error;

/// Channel insertion failures. The conflict variant maps to HTTP 409 at
/// the API boundary.
#[derive(Debug, Error)]
pub enum ChannelInsertError {
    #[error("duplicate channel for event {event_id} (group {group_id}, keyword {keyword:?})")]
    Conflict {
        event_id: String,
        group_id: i64,
        keyword: Option<String>,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl ChannelInsertError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ChannelInsertError::Conflict { .. })
    }
}

fn channel_from_row(row: &sqlx::sqlite::SqliteRow) -> ManagedChannel {
    let parse_ts = |key: &str| -> Option<DateTime<Utc>> {
        row.get::<Option<String>, _>(key)
            .and_then(|raw| raw.parse().ok())
    };
    ManagedChannel {
        id: row.get("id"),
        dispatcharr_channel_id: row.get("dispatcharr_channel_id"),
        channel_number: row.get::<i64, _>("channel_number") as u32,
        tvg_id: row.get("tvg_id"),
        channel_name: row.get("channel_name"),
        event_epg_group_id: row.get("event_epg_group_id"),
        event_id: row.get("event_id"),
        exception_keyword: row.get("exception_keyword"),
        scheduled_create_at: parse_ts("scheduled_create_at"),
        scheduled_delete_at: parse_ts("scheduled_delete_at"),
        deleted_at: parse_ts("deleted_at"),
    }
}

/// All channels not yet soft-deleted.
pub async fn get_active_channels(pool: &SqlitePool) -> Result<Vec<ManagedChannel>> {
    let rows = sqlx::query(
        "SELECT * FROM managed_channels WHERE deleted_at IS NULL ORDER BY channel_number",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(channel_from_row).collect())
}

/// Channel numbers currently held by active managed channels.
pub async fn get_active_numbers(pool: &SqlitePool) -> Result<Vec<u32>> {
    let rows = sqlx::query(
        "SELECT channel_number FROM managed_channels WHERE deleted_at IS NULL",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| r.get::<i64, _>("channel_number") as u32)
        .collect())
}

/// Insert a managed channel row. A uniqueness violation on the active
/// `(group, event, keyword)` tuple or downstream id surfaces as
/// [`ChannelInsertError::Conflict`].
#[allow(clippy::too_many_arguments)]
pub async fn insert_channel(
    pool: &SqlitePool,
    dispatcharr_channel_id: i64,
    channel_number: u32,
    tvg_id: &str,
    channel_name: &str,
    event_epg_group_id: i64,
    event_id: &str,
    exception_keyword: Option<&str>,
    scheduled_create_at: Option<DateTime<Utc>>,
    scheduled_delete_at: Option<DateTime<Utc>>,
) -> std::result::Result<i64, ChannelInsertError> {
    let done = sqlx::query(
        "INSERT INTO managed_channels
         (dispatcharr_channel_id, channel_number, tvg_id, channel_name,
          event_epg_group_id, event_id, exception_keyword,
          scheduled_create_at, scheduled_delete_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(dispatcharr_channel_id)
    .bind(channel_number as i64)
    .bind(tvg_id)
    .bind(channel_name)
    .bind(event_epg_group_id)
    .bind(event_id)
    .bind(exception_keyword)
    .bind(scheduled_create_at.map(|t| t.to_rfc3339()))
    .bind(scheduled_delete_at.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await;

    match done {
        Ok(done) => Ok(done.last_insert_rowid()),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(ChannelInsertError::Conflict {
                event_id: event_id.to_string(),
                group_id: event_epg_group_id,
                keyword: exception_keyword.map(String::from),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Update a channel's number.
pub async fn update_channel_number(pool: &SqlitePool, id: i64, number: u32) -> Result<()> {
    sqlx::query("UPDATE managed_channels SET channel_number = ? WHERE id = ?")
        .bind(number as i64)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Soft-delete a channel row.
pub async fn mark_deleted(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE managed_channels SET deleted_at = ? WHERE id = ?")
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Append an audit row.
#[allow(clippy::too_many_arguments)]
pub async fn log_channel_history(
    pool: &SqlitePool,
    managed_channel_id: i64,
    change_type: &str,
    change_source: &str,
    field_name: Option<&str>,
    old_value: Option<&str>,
    new_value: Option<&str>,
    notes: Option<&str>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO channel_history
         (managed_channel_id, change_type, change_source, field_name,
          old_value, new_value, notes)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(managed_channel_id)
    .bind(change_type)
    .bind(change_source)
    .bind(field_name)
    .bind(old_value)
    .bind(new_value)
    .bind(notes)
    .execute(pool)
    .await?;
    Ok(())
}

/// Count of history rows for a channel (tests and the stats endpoint).
pub async fn history_count(pool: &SqlitePool, managed_channel_id: i64) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM channel_history WHERE managed_channel_id = ?")
        .bind(managed_channel_id)
        .fetch_one(pool)
        .await?;
    Ok(row.get("n"))
}

/// A stream attached to a managed channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStream {
    pub id: i64,
    pub managed_channel_id: i64,
    pub stream_id: i64,
    pub stream_name: String,
    pub priority: i64,
    pub matched_keyword: Option<String>,
}

/// Streams attached to a channel, priority order.
pub async fn get_channel_streams(
    pool: &SqlitePool,
    managed_channel_id: i64,
) -> Result<Vec<ChannelStream>> {
    let rows = sqlx::query(
        "SELECT * FROM channel_streams WHERE managed_channel_id = ? ORDER BY priority",
    )
    .bind(managed_channel_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .iter()
        .map(|r| ChannelStream {
            id: r.get("id"),
            managed_channel_id: r.get("managed_channel_id"),
            stream_id: r.get("stream_id"),
            stream_name: r.get("stream_name"),
            priority: r.get("priority"),
            matched_keyword: r.get("matched_keyword"),
        })
        .collect())
}

/// Attach a stream at the next available priority. Idempotent per
/// `(channel, stream)` pair.
pub async fn attach_stream(
    pool: &SqlitePool,
    managed_channel_id: i64,
    stream_id: i64,
    stream_name: &str,
    matched_keyword: Option<&str>,
) -> Result<()> {
    let next_priority: i64 = sqlx::query(
        "SELECT COALESCE(MAX(priority) + 1, 0) AS p FROM channel_streams
         WHERE managed_channel_id = ?",
    )
    .bind(managed_channel_id)
    .fetch_one(pool)
    .await?
    .get("p");

    sqlx::query(
        "INSERT INTO channel_streams
         (managed_channel_id, stream_id, stream_name, priority, matched_keyword)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(managed_channel_id, stream_id) DO NOTHING",
    )
    .bind(managed_channel_id)
    .bind(stream_id)
    .bind(stream_name)
    .bind(next_priority)
    .bind(matched_keyword)
    .execute(pool)
    .await?;
    Ok(())
}

/// Detach a stream from a channel.
pub async fn detach_stream(
    pool: &SqlitePool,
    managed_channel_id: i64,
    stream_id: i64,
) -> Result<bool> {
    let done = sqlx::query(
        "DELETE FROM channel_streams WHERE managed_channel_id = ? AND stream_id = ?",
    )
    .bind(managed_channel_id)
    .bind(stream_id)
    .execute(pool)
    .await?;
    Ok(done.rows_affected() > 0)
}
