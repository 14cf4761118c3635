//! Sport/league sort priorities for global channel reassignment.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

/// One ordering rule: league-specific rules override sport-wide ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortPriority {
    pub sport: String,
    pub league: Option<String>,
    pub priority: i32,
}

/// All rules, best priority first. The empty-string league sentinel in
/// storage maps back to `None` (sport-wide rule).
pub async fn get_sort_priorities(pool: &SqlitePool) -> Result<Vec<SortPriority>> {
    let rows = sqlx::query("SELECT sport, league, priority FROM sort_priorities ORDER BY priority")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|r| SortPriority {
            sport: r.get("sport"),
            league: Some(r.get::<String, _>("league")).filter(|l| !l.is_empty()),
            priority: r.get::<i64, _>("priority") as i32,
        })
        .collect())
}

/// Upsert a rule.
pub async fn set_sort_priority(
    pool: &SqlitePool,
    sport: &str,
    league: Option<&str>,
    priority: i32,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO sort_priorities (sport, league, priority) VALUES (?, ?, ?)
         ON CONFLICT(sport, league) DO UPDATE SET priority = excluded.priority",
    )
    .bind(sport)
    .bind(league.unwrap_or(""))
    .bind(priority as i64)
    .execute(pool)
    .await?;
    Ok(())
}

/// Resolve the priority for a (sport, league) pair; unknown pairs sort
/// last.
pub fn priority_for(rules: &[SortPriority], sport: &str, league: &str) -> i32 {
    rules
        .iter()
        .find(|r| {
            r.sport.eq_ignore_ascii_case(sport)
                && r.league
                    .as_deref()
                    .map_or(false, |l| l.eq_ignore_ascii_case(league))
        })
        .or_else(|| {
            rules
                .iter()
                .find(|r| r.sport.eq_ignore_ascii_case(sport) && r.league.is_none())
        })
        .map(|r| r.priority)
        .unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_priority_resolution() {
        let pool = test_pool().await;
        set_sort_priority(&pool, "football", None, 10).await.unwrap();
        set_sort_priority(&pool, "football", Some("nfl"), 1).await.unwrap();
        set_sort_priority(&pool, "basketball", None, 20).await.unwrap();

        let rules = get_sort_priorities(&pool).await.unwrap();
        assert_eq!(priority_for(&rules, "football", "nfl"), 1);
        assert_eq!(priority_for(&rules, "football", "college-football"), 10);
        assert_eq!(priority_for(&rules, "basketball", "nba"), 20);
        assert_eq!(priority_for(&rules, "cricket", "ipl"), i32::MAX);
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let pool = test_pool().await;
        set_sort_priority(&pool, "hockey", Some("nhl"), 5).await.unwrap();
        set_sort_priority(&pool, "hockey", Some("nhl"), 2).await.unwrap();
        let rules = get_sort_priorities(&pool).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].priority, 2);
    }
}
