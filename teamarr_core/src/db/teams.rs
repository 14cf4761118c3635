//! Team configuration persistence.
//!
//! Teams join with their assigned template at load; JSON-valued template
//! fields (description options, filler overrides) parse here so the
//! orchestrator receives typed rows.

use crate::filler::FillerTemplates;
use crate::templates::conditions::{parse_options, DescriptionOption};
use crate::types::TeamConfig;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// A team's rendering templates, parsed from the joined template row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TeamTemplates {
    pub title: String,
    pub subtitle: Option<String>,
    pub description_options: Vec<DescriptionOption>,
    pub art_url: Option<String>,
    pub filler: FillerTemplates,
}

/// One fully-loaded team: config plus templates.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamRow {
    pub row_id: i64,
    pub config: TeamConfig,
    pub templates: TeamTemplates,
    /// Soccer: all leagues this team plays in (JSON column union).
    pub soccer_leagues: Vec<String>,
}

fn config_from_row(row: &sqlx::sqlite::SqliteRow) -> TeamConfig {
    TeamConfig {
        team_id: row.get("team_id"),
        league: row.get("league"),
        sport: row.get("sport"),
        team_name: row.get("team_name"),
        team_abbrev: row.get("team_abbrev"),
        logo_url: row.get("logo_url"),
        channel_number: row.get::<Option<i64>, _>("channel_number").map(|n| n as u32),
        soccer_primary_league: row.get("soccer_primary_league"),
        soccer_primary_league_id: row.get("soccer_primary_league_id"),
        pregame_enabled: row.get::<i64, _>("pregame_enabled") != 0,
        postgame_enabled: row.get::<i64, _>("postgame_enabled") != 0,
        idle_enabled: row.get::<i64, _>("idle_enabled") != 0,
    }
}

fn templates_from_row(row: &sqlx::sqlite::SqliteRow) -> TeamTemplates {
    let description_options = row
        .get::<Option<String>, _>("description_options")
        .map(|raw| parse_options(&raw))
        .unwrap_or_default();
    let filler = row
        .get::<Option<String>, _>("filler_overrides")
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default();
    TeamTemplates {
        title: row
            .get::<Option<String>, _>("title_template")
            .unwrap_or_default(),
        subtitle: row.get("subtitle_template"),
        description_options,
        art_url: row.get("art_url_template"),
        filler,
    }
}

/// Load all enabled teams with their attached templates.
pub async fn get_teams_with_templates(pool: &SqlitePool) -> Result<Vec<TeamRow>> {
    let rows = sqlx::query(
        "SELECT t.id AS row_id, t.team_id, t.league, t.sport, t.team_name,
                t.team_abbrev, t.logo_url, t.channel_number,
                t.soccer_primary_league, t.soccer_primary_league_id,
                t.soccer_leagues, t.pregame_enabled, t.postgame_enabled,
                t.idle_enabled,
                tpl.title_template, tpl.subtitle_template,
                tpl.description_options, tpl.art_url_template,
                tpl.filler_overrides
         FROM teams t
         LEFT JOIN templates tpl ON tpl.id = t.template_id
         WHERE t.enabled = 1
         ORDER BY t.team_name",
    )
    .fetch_all(pool)
    .await?;

    let teams = rows
        .iter()
        .map(|row| {
            let soccer_leagues = row
                .get::<Option<String>, _>("soccer_leagues")
                .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
                .unwrap_or_default();
            TeamRow {
                row_id: row.get("row_id"),
                config: config_from_row(row),
                templates: templates_from_row(row),
                soccer_leagues,
            }
        })
        .collect();
    Ok(teams)
}

/// Outcome of a bulk team import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// A candidate row for bulk import.
#[derive(Debug, Clone)]
pub struct ImportTeam {
    pub team_id: String,
    pub league: String,
    pub sport: String,
    pub team_name: String,
    pub team_abbrev: String,
    pub logo_url: Option<String>,
}

/// Bulk-import teams.
///
/// Idempotent: a second import of the same set yields
/// `imported=0, updated=0, skipped=N`. The one exception is soccer: a
/// newly-seen league for an existing team unions into `soccer_leagues[]`
/// (counted as updated) without duplicating the row.
pub async fn import_teams(pool: &SqlitePool, teams: &[ImportTeam]) -> Result<ImportResult> {
    let mut result = ImportResult::default();
    let mut tx = pool.begin().await?;

    for team in teams {
        let is_soccer = crate::league_config::is_soccer_league(&team.league)
            || team.sport.eq_ignore_ascii_case("soccer");

        let existing = if is_soccer {
            // Soccer teams are unique per team_id regardless of league.
            sqlx::query(
                "SELECT id, league, soccer_leagues FROM teams
                 WHERE team_id = ? AND sport = ?",
            )
            .bind(&team.team_id)
            .bind(&team.sport)
            .fetch_optional(&mut *tx)
            .await?
        } else {
            sqlx::query("SELECT id, league, soccer_leagues FROM teams WHERE team_id = ? AND league = ?")
                .bind(&team.team_id)
                .bind(&team.league)
                .fetch_optional(&mut *tx)
                .await?
        };

        match existing {
            None => {
                let soccer_leagues = if is_soccer {
                    Some(serde_json::to_string(&[&team.league])?)
                } else {
                    None
                };
                sqlx::query(
                    "INSERT INTO teams
                     (team_id, league, sport, team_name, team_abbrev, logo_url, soccer_leagues)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&team.team_id)
                .bind(&team.league)
                .bind(&team.sport)
                .bind(&team.team_name)
                .bind(&team.team_abbrev)
                .bind(&team.logo_url)
                .bind(soccer_leagues)
                .execute(&mut *tx)
                .await?;
                result.imported += 1;
            }
            Some(row) => {
                if is_soccer {
                    let id: i64 = row.get("id");
                    let mut leagues: Vec<String> = row
                        .get::<Option<String>, _>("soccer_leagues")
                        .and_then(|raw| serde_json::from_str(&raw).ok())
                        .unwrap_or_else(|| vec![row.get::<String, _>("league")]);
                    if leagues.iter().any(|l| l == &team.league) {
                        result.skipped += 1;
                    } else {
                        leagues.push(team.league.clone());
                        sqlx::query("UPDATE teams SET soccer_leagues = ? WHERE id = ?")
                            .bind(serde_json::to_string(&leagues)?)
                            .bind(id)
                            .execute(&mut *tx)
                            .await?;
                        debug!(
                            "[TEAMS] {} gains league {}",
                            team.team_name, team.league
                        );
                        result.updated += 1;
                    }
                } else {
                    result.skipped += 1;
                }
            }
        }
    }

    tx.commit().await?;
    info!(
        "[TEAMS] Import: {} new, {} updated, {} skipped",
        result.imported, result.updated, result.skipped
    );
    Ok(result)
}

/// Load the user alias table for the matcher.
pub async fn get_user_aliases(pool: &SqlitePool) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query("SELECT alias, team_name FROM user_aliases")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|r| (r.get("alias"), r.get("team_name")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn import_team(id: &str, league: &str, sport: &str, name: &str) -> ImportTeam {
        ImportTeam {
            team_id: id.to_string(),
            league: league.to_string(),
            sport: sport.to_string(),
            team_name: name.to_string(),
            team_abbrev: String::new(),
            logo_url: None,
        }
    }

    #[tokio::test]
    async fn test_import_then_reimport_is_idempotent() {
        let pool = test_pool().await;
        let teams = vec![
            import_team("8", "nba", "basketball", "Detroit Pistons"),
            import_team("4", "nba", "basketball", "Chicago Bulls"),
        ];
        let first = import_teams(&pool, &teams).await.unwrap();
        assert_eq!(first.imported, 2);

        let second = import_teams(&pool, &teams).await.unwrap();
        assert_eq!(
            second,
            ImportResult {
                imported: 0,
                updated: 0,
                skipped: 2
            }
        );
    }

    #[tokio::test]
    async fn test_soccer_league_union_counts_as_update() {
        let pool = test_pool().await;
        let first = import_teams(
            &pool,
            &[import_team("364", "eng.1", "soccer", "Liverpool")],
        )
        .await
        .unwrap();
        assert_eq!(first.imported, 1);

        // Same team seen in a new competition: league unions, no new row.
        let second = import_teams(
            &pool,
            &[import_team("364", "uefa.champions", "soccer", "Liverpool")],
        )
        .await
        .unwrap();
        assert_eq!(second.updated, 1);
        assert_eq!(second.imported, 0);

        let rows = sqlx::query("SELECT soccer_leagues FROM teams WHERE team_id = '364'")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        let leagues: Vec<String> =
            serde_json::from_str(&rows[0].get::<String, _>("soccer_leagues")).unwrap();
        assert_eq!(leagues, vec!["eng.1", "uefa.champions"]);

        // Third import of either league now skips.
        let third = import_teams(
            &pool,
            &[import_team("364", "uefa.champions", "soccer", "Liverpool")],
        )
        .await
        .unwrap();
        assert_eq!(third.skipped, 1);
    }

    #[tokio::test]
    async fn test_get_teams_with_templates_parses_json_fields() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO templates (id, name, title_template, description_options, filler_overrides)
             VALUES (1, 'default', '{team_name} {vs_at} {opponent}',
                     '[{\"template\": \"desc\", \"priority\": 100}]',
                     '{\"pregame\": {\"title\": \"Pregame\"}}')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO teams (team_id, league, sport, team_name, team_abbrev, template_id)
             VALUES ('8', 'nba', 'basketball', 'Detroit Pistons', 'DET', 1)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let teams = get_teams_with_templates(&pool).await.unwrap();
        assert_eq!(teams.len(), 1);
        let row = &teams[0];
        assert_eq!(row.config.team_name, "Detroit Pistons");
        assert_eq!(row.templates.title, "{team_name} {vs_at} {opponent}");
        assert_eq!(row.templates.description_options.len(), 1);
        assert_eq!(row.templates.filler.pregame.title, "Pregame");
    }

    #[tokio::test]
    async fn test_team_without_template_gets_defaults() {
        let pool = test_pool().await;
        sqlx::query(
            "INSERT INTO teams (team_id, league, sport, team_name, team_abbrev)
             VALUES ('8', 'nba', 'basketball', 'Detroit Pistons', 'DET')",
        )
        .execute(&pool)
        .await
        .unwrap();
        let teams = get_teams_with_templates(&pool).await.unwrap();
        assert_eq!(teams[0].templates, TeamTemplates::default());
    }
}
