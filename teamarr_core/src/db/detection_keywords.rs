//! Detection keyword persistence.
//!
//! User rows merged over the built-in patterns by the detection service.

use crate::detection::UserKeyword;
use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// Load enabled keywords for every category, priority-descending.
pub async fn load_enabled_keywords(pool: &SqlitePool) -> Result<Vec<UserKeyword>> {
    let rows = sqlx::query(
        "SELECT category, keyword, is_regex, target_value, priority
         FROM detection_keywords
         WHERE enabled = 1
         ORDER BY priority DESC, keyword",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| UserKeyword {
            category: r.get("category"),
            keyword: r.get("keyword"),
            is_regex: r.get::<i64, _>("is_regex") != 0,
            target_value: r.get("target_value"),
            priority: r.get::<i64, _>("priority") as i32,
        })
        .collect())
}

/// Insert a keyword row; returns its id.
pub async fn add_keyword(pool: &SqlitePool, keyword: &UserKeyword, enabled: bool) -> Result<i64> {
    let done = sqlx::query(
        "INSERT INTO detection_keywords (category, keyword, is_regex, target_value, enabled, priority)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&keyword.category)
    .bind(&keyword.keyword)
    .bind(keyword.is_regex as i64)
    .bind(&keyword.target_value)
    .bind(enabled as i64)
    .bind(keyword.priority as i64)
    .execute(pool)
    .await?;
    Ok(done.last_insert_rowid())
}

/// Delete a keyword row; true when something was removed.
pub async fn delete_keyword(pool: &SqlitePool, id: i64) -> Result<bool> {
    let done = sqlx::query("DELETE FROM detection_keywords WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}

/// Toggle a keyword row's enabled flag.
pub async fn set_keyword_enabled(pool: &SqlitePool, id: i64, enabled: bool) -> Result<bool> {
    let done = sqlx::query("UPDATE detection_keywords SET enabled = ? WHERE id = ?")
        .bind(enabled as i64)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}
