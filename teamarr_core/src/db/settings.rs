//! Key/value settings store with typed accessors.
//!
//! Every recognized option lives in the `settings` table as a string;
//! [`AppSettings`] is the typed snapshot consumers read once per cycle.

use crate::filler::MidnightCrossoverMode;
use crate::lifecycle::keywords::ExceptionKeyword;
use crate::types::TimeFormat;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;

/// Channel numbering strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NumberingMode {
    #[default]
    StrictBlock,
    RationalBlock,
    StrictCompact,
}

impl NumberingMode {
    pub fn parse(s: &str) -> Self {
        match s {
            "rational_block" => NumberingMode::RationalBlock,
            "strict_compact" => NumberingMode::StrictCompact,
            _ => NumberingMode::StrictBlock,
        }
    }
}

/// When managed channels are created relative to their event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CreateTiming {
    StreamAvailable,
    #[default]
    SameDay,
    DayBefore,
    TwoDaysBefore,
    ThreeDaysBefore,
    OneWeekBefore,
}

impl CreateTiming {
    pub fn parse(s: &str) -> Self {
        match s {
            "stream_available" => CreateTiming::StreamAvailable,
            "day_before" => CreateTiming::DayBefore,
            "2_days_before" => CreateTiming::TwoDaysBefore,
            "3_days_before" => CreateTiming::ThreeDaysBefore,
            "1_week_before" => CreateTiming::OneWeekBefore,
            _ => CreateTiming::SameDay,
        }
    }

    /// Days of lead time before the event day; `None` means the channel
    /// appears only when a stream does.
    pub fn days_before(&self) -> Option<i64> {
        match self {
            CreateTiming::StreamAvailable => None,
            CreateTiming::SameDay => Some(0),
            CreateTiming::DayBefore => Some(1),
            CreateTiming::TwoDaysBefore => Some(2),
            CreateTiming::ThreeDaysBefore => Some(3),
            CreateTiming::OneWeekBefore => Some(7),
        }
    }
}

/// When managed channels are deleted relative to their event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeleteTiming {
    StreamRemoved,
    SixHoursAfter,
    SameDay,
    #[default]
    DayAfter,
    TwoDaysAfter,
    ThreeDaysAfter,
    OneWeekAfter,
}

impl DeleteTiming {
    pub fn parse(s: &str) -> Self {
        match s {
            "stream_removed" => DeleteTiming::StreamRemoved,
            "6_hours_after" => DeleteTiming::SixHoursAfter,
            "same_day" => DeleteTiming::SameDay,
            "2_days_after" => DeleteTiming::TwoDaysAfter,
            "3_days_after" => DeleteTiming::ThreeDaysAfter,
            "1_week_after" => DeleteTiming::OneWeekAfter,
            _ => DeleteTiming::DayAfter,
        }
    }
}

/// Duplicate-event handling for lifecycle channel creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateMode {
    #[default]
    Consolidated,
    Split,
}

/// Scope of channel-number sorting during reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortingScope {
    #[default]
    PerGroup,
    Global,
}

/// Ordering key for channel reassignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    SportLeagueTime,
    Time,
    StreamOrder,
}

impl SortBy {
    pub fn parse(s: &str) -> Self {
        match s {
            "time" => SortBy::Time,
            "stream_order" => SortBy::StreamOrder,
            _ => SortBy::SportLeagueTime,
        }
    }
}

/// Game duration configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationMode {
    /// Per-sport defaults from the league table.
    Sport,
    /// Flat 3-hour default.
    Default,
    /// User override, hours.
    Custom,
}

/// Typed settings snapshot, read once per cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    pub epg_timezone: String,
    pub time_format: TimeFormat,
    pub show_timezone: bool,
    pub midnight_crossover_mode: MidnightCrossoverMode,

    pub channel_create_timing: CreateTiming,
    pub channel_delete_timing: DeleteTiming,
    pub duplicate_mode: DuplicateMode,
    /// Variant-channel keywords (Spanish, French) with their behavior.
    pub exception_keywords: Vec<ExceptionKeyword>,

    pub channel_range_start: u32,
    pub channel_range_end: u32,
    pub channel_numbering_mode: NumberingMode,
    pub channel_sorting_scope: SortingScope,
    pub sort_by: SortBy,

    pub duration_mode: DurationMode,
    pub duration_override_hours: f64,

    pub dispatcharr_enabled: bool,
    pub dispatcharr_url: String,
    pub dispatcharr_username: String,
    pub dispatcharr_password: String,
    pub dispatcharr_epg_id: Option<i64>,

    pub scheduler_enabled: bool,
    pub scheduler_interval_minutes: u32,
    pub channel_reset_enabled: bool,
    pub channel_reset_cron: String,

    pub gold_zone_enabled: bool,
    pub gold_zone_channel_number: u32,
    pub gold_zone_channel_group_id: Option<i64>,
    pub gold_zone_stream_profile_id: Option<i64>,
    pub gold_zone_channel_profile_ids: Vec<i64>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            epg_timezone: "UTC".to_string(),
            time_format: TimeFormat::TwelveHour,
            show_timezone: false,
            midnight_crossover_mode: MidnightCrossoverMode::Idle,
            channel_create_timing: CreateTiming::SameDay,
            channel_delete_timing: DeleteTiming::DayAfter,
            duplicate_mode: DuplicateMode::Consolidated,
            exception_keywords: Vec::new(),
            channel_range_start: 100,
            channel_range_end: 999,
            channel_numbering_mode: NumberingMode::StrictBlock,
            channel_sorting_scope: SortingScope::PerGroup,
            sort_by: SortBy::SportLeagueTime,
            duration_mode: DurationMode::Sport,
            duration_override_hours: 3.0,
            dispatcharr_enabled: false,
            dispatcharr_url: String::new(),
            dispatcharr_username: String::new(),
            dispatcharr_password: String::new(),
            dispatcharr_epg_id: None,
            scheduler_enabled: false,
            scheduler_interval_minutes: 60,
            channel_reset_enabled: false,
            channel_reset_cron: "0 4 * * *".to_string(),
            gold_zone_enabled: false,
            gold_zone_channel_number: 50,
            gold_zone_channel_group_id: None,
            gold_zone_stream_profile_id: None,
            gold_zone_channel_profile_ids: vec![0],
        }
    }
}

impl AppSettings {
    /// Game duration in hours for a league, per the configured mode.
    pub fn game_duration_hours(&self, league: &str) -> f64 {
        match self.duration_mode {
            DurationMode::Sport => crate::league_config::default_game_duration(league),
            DurationMode::Default => 3.0,
            DurationMode::Custom => self.duration_override_hours,
        }
    }
}

/// Read a single setting value.
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let row = sqlx::query("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("value")))
}

/// Write a single setting value.
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

fn parse_bool(value: Option<&String>, default: bool) -> bool {
    value.map_or(default, |v| matches!(v.as_str(), "true" | "1" | "yes"))
}

fn parse_num<T: std::str::FromStr>(value: Option<&String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Load the full typed snapshot, defaulting each unrecognized or missing
/// option.
pub async fn load_settings(pool: &SqlitePool) -> Result<AppSettings> {
    let rows = sqlx::query("SELECT key, value FROM settings")
        .fetch_all(pool)
        .await?;
    let map: HashMap<String, String> = rows
        .into_iter()
        .map(|r| (r.get("key"), r.get("value")))
        .collect();
    let defaults = AppSettings::default();

    Ok(AppSettings {
        epg_timezone: map
            .get("epg_timezone")
            .cloned()
            .unwrap_or(defaults.epg_timezone),
        time_format: match map.get("time_format").map(String::as_str) {
            Some("24h") => TimeFormat::TwentyFourHour,
            _ => TimeFormat::TwelveHour,
        },
        show_timezone: parse_bool(map.get("show_timezone"), defaults.show_timezone),
        midnight_crossover_mode: map
            .get("midnight_crossover_mode")
            .map(|v| MidnightCrossoverMode::parse(v))
            .unwrap_or(defaults.midnight_crossover_mode),
        channel_create_timing: map
            .get("channel_create_timing")
            .map(|v| CreateTiming::parse(v))
            .unwrap_or(defaults.channel_create_timing),
        channel_delete_timing: map
            .get("channel_delete_timing")
            .map(|v| DeleteTiming::parse(v))
            .unwrap_or(defaults.channel_delete_timing),
        duplicate_mode: match map.get("duplicate_mode").map(String::as_str) {
            Some("split") => DuplicateMode::Split,
            _ => DuplicateMode::Consolidated,
        },
        exception_keywords: map
            .get("exception_keywords")
            .and_then(|v| serde_json::from_str(v).ok())
            .unwrap_or_default(),
        channel_range_start: parse_num(map.get("channel_range_start"), defaults.channel_range_start),
        channel_range_end: parse_num(map.get("channel_range_end"), defaults.channel_range_end),
        channel_numbering_mode: map
            .get("channel_numbering_mode")
            .map(|v| NumberingMode::parse(v))
            .unwrap_or(defaults.channel_numbering_mode),
        channel_sorting_scope: match map.get("channel_sorting_scope").map(String::as_str) {
            Some("global") => SortingScope::Global,
            _ => SortingScope::PerGroup,
        },
        sort_by: map
            .get("sort_by")
            .map(|v| SortBy::parse(v))
            .unwrap_or(defaults.sort_by),
        duration_mode: match map.get("game_duration_mode").map(String::as_str) {
            Some("default") => DurationMode::Default,
            Some("custom") => DurationMode::Custom,
            _ => DurationMode::Sport,
        },
        duration_override_hours: parse_num(
            map.get("game_duration_override"),
            defaults.duration_override_hours,
        ),
        dispatcharr_enabled: parse_bool(map.get("dispatcharr_enabled"), false),
        dispatcharr_url: map.get("dispatcharr_url").cloned().unwrap_or_default(),
        dispatcharr_username: map
            .get("dispatcharr_username")
            .cloned()
            .unwrap_or_default(),
        dispatcharr_password: map
            .get("dispatcharr_password")
            .cloned()
            .unwrap_or_default(),
        dispatcharr_epg_id: map.get("dispatcharr_epg_id").and_then(|v| v.parse().ok()),
        scheduler_enabled: parse_bool(map.get("scheduler_enabled"), false),
        scheduler_interval_minutes: parse_num(
            map.get("scheduler_interval_minutes"),
            defaults.scheduler_interval_minutes,
        ),
        channel_reset_enabled: parse_bool(map.get("channel_reset_enabled"), false),
        channel_reset_cron: map
            .get("channel_reset_cron")
            .cloned()
            .unwrap_or(defaults.channel_reset_cron),
        gold_zone_enabled: parse_bool(map.get("gold_zone_enabled"), false),
        gold_zone_channel_number: parse_num(
            map.get("gold_zone_channel_number"),
            defaults.gold_zone_channel_number,
        ),
        gold_zone_channel_group_id: map
            .get("gold_zone_channel_group_id")
            .and_then(|v| v.parse().ok()),
        gold_zone_stream_profile_id: map
            .get("gold_zone_stream_profile_id")
            .and_then(|v| v.parse().ok()),
        gold_zone_channel_profile_ids: map
            .get("gold_zone_channel_profile_ids")
            .and_then(|v| serde_json::from_str(v).ok())
            .unwrap_or(defaults.gold_zone_channel_profile_ids),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn test_defaults_when_empty() {
        let pool = test_pool().await;
        let settings = load_settings(&pool).await.unwrap();
        assert_eq!(settings, AppSettings::default());
    }

    #[tokio::test]
    async fn test_exception_keywords_json() {
        let pool = test_pool().await;
        set_setting(
            &pool,
            "exception_keywords",
            r#"[{"keyword": "Spanish", "behavior": "split"},
                {"keyword": "SAP", "behavior": "ignore"}]"#,
        )
        .await
        .unwrap();
        let settings = load_settings(&pool).await.unwrap();
        assert_eq!(settings.exception_keywords.len(), 2);
        assert_eq!(settings.exception_keywords[0].keyword, "Spanish");
        assert_eq!(
            settings.exception_keywords[1].behavior,
            crate::lifecycle::keywords::KeywordBehavior::Ignore
        );
    }

    #[tokio::test]
    async fn test_set_and_load() {
        let pool = test_pool().await;
        set_setting(&pool, "epg_timezone", "America/Detroit").await.unwrap();
        set_setting(&pool, "midnight_crossover_mode", "postgame").await.unwrap();
        set_setting(&pool, "channel_numbering_mode", "strict_compact").await.unwrap();
        set_setting(&pool, "channel_create_timing", "day_before").await.unwrap();
        set_setting(&pool, "time_format", "24h").await.unwrap();
        set_setting(&pool, "channel_range_start", "5000").await.unwrap();

        let settings = load_settings(&pool).await.unwrap();
        assert_eq!(settings.epg_timezone, "America/Detroit");
        assert_eq!(settings.midnight_crossover_mode, MidnightCrossoverMode::Postgame);
        assert_eq!(settings.channel_numbering_mode, NumberingMode::StrictCompact);
        assert_eq!(settings.channel_create_timing, CreateTiming::DayBefore);
        assert_eq!(settings.time_format, TimeFormat::TwentyFourHour);
        assert_eq!(settings.channel_range_start, 5000);
    }

    #[tokio::test]
    async fn test_overwrite_setting() {
        let pool = test_pool().await;
        set_setting(&pool, "k", "a").await.unwrap();
        set_setting(&pool, "k", "b").await.unwrap();
        assert_eq!(get_setting(&pool, "k").await.unwrap().as_deref(), Some("b"));
    }

    #[test]
    fn test_timing_parse() {
        assert_eq!(CreateTiming::parse("1_week_before"), CreateTiming::OneWeekBefore);
        assert_eq!(CreateTiming::parse("junk"), CreateTiming::SameDay);
        assert_eq!(DeleteTiming::parse("6_hours_after"), DeleteTiming::SixHoursAfter);
        assert_eq!(CreateTiming::OneWeekBefore.days_before(), Some(7));
        assert_eq!(CreateTiming::StreamAvailable.days_before(), None);
    }

    #[test]
    fn test_duration_modes() {
        let mut settings = AppSettings::default();
        assert_eq!(settings.game_duration_hours("ufc"), 6.0);
        settings.duration_mode = DurationMode::Default;
        assert_eq!(settings.game_duration_hours("ufc"), 3.0);
        settings.duration_mode = DurationMode::Custom;
        settings.duration_override_hours = 4.5;
        assert_eq!(settings.game_duration_hours("ufc"), 4.5);
    }
}
