//! Gold Zone: a single unified whip-around channel.
//!
//! Feature-flagged and time-scoped to one Games fortnight. When enabled,
//! every stream matching the Gold Zone patterns across the configured
//! M3U groups attaches to one managed channel at a fixed number; when
//! disabled, nothing here runs and removal leaves no dangling
//! references.

use crate::dispatcharr::{ChannelCreate, ChannelManagerApi, ChannelUpdate, ALL_PROFILES};
use crate::epg::groups::SourceStream;
use crate::matching::classifier::extract_date;
use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

const GOLD_ZONE_PATTERNS: &[&str] = &["gold zone", "goldzone", "gold-zone"];
const GOLD_ZONE_TVG_ID: &str = "teamarr-goldzone";
const GOLD_ZONE_CHANNEL_NAME: &str = "Gold Zone";

/// Day 1 of the Games this feature is scoped to.
const GAMES_DAY_ONE: (i32, u32, u32) = (2026, 2, 7);
/// Days of competition; "Day N" outside 1..=MAX_DAY is not a date token.
const GAMES_MAX_DAY: u32 = 17;

/// Gold Zone configuration slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoldZoneSettings {
    pub enabled: bool,
    pub channel_number: u32,
    pub channel_group_id: Option<i64>,
    pub stream_profile_id: Option<i64>,
    pub channel_profile_ids: Vec<i64>,
}

impl Default for GoldZoneSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            channel_number: 999,
            channel_group_id: None,
            stream_profile_id: None,
            channel_profile_ids: vec![ALL_PROFILES],
        }
    }
}

/// Outcome of one Gold Zone pass.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GoldZoneResult {
    pub created: bool,
    pub updated: bool,
    pub skipped: bool,
    pub stream_count: usize,
    pub reason: Option<String>,
}

fn gold_zone_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let joined = GOLD_ZONE_PATTERNS
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("(?i){joined}")).expect("gold zone pattern")
    })
}

/// Resolve a "Day N" token onto the Games calendar; 1..=17 only.
pub fn games_day_to_date(day: u32) -> Option<NaiveDate> {
    if day == 0 || day > GAMES_MAX_DAY {
        return None;
    }
    let (y, m, d) = GAMES_DAY_ONE;
    NaiveDate::from_ymd_opt(y, m, d)?.checked_add_days(chrono::Days::new(u64::from(day) - 1))
}

fn stream_day_number(name: &str) -> Option<u32> {
    static DAY_RE: OnceLock<Regex> = OnceLock::new();
    let regex = DAY_RE.get_or_init(|| Regex::new(r"(?i)\bday\s+(\d{1,2})\b").expect("day"));
    regex.captures(name)?.get(1)?.as_str().parse().ok()
}

/// Whether a stream belongs to the active day. Day-number tokens take
/// priority over ambiguous calendar dates; streams with no date pass.
pub fn stream_is_for_day(name: &str, active_day: NaiveDate) -> bool {
    if let Some(day) = stream_day_number(name) {
        return games_day_to_date(day) == Some(active_day);
    }
    match extract_date(name, active_day.year()) {
        Some(date) => date == active_day,
        None => true,
    }
}

/// Run one Gold Zone pass: collect matching streams for the active day
/// and create or update the unified channel.
pub async fn process_gold_zone(
    settings: &GoldZoneSettings,
    streams: &[SourceStream],
    channel_manager: &dyn ChannelManagerApi,
    active_day: NaiveDate,
) -> Result<GoldZoneResult> {
    let mut result = GoldZoneResult::default();
    if !settings.enabled {
        result.skipped = true;
        result.reason = Some("disabled".to_string());
        return Ok(result);
    }

    let pattern = gold_zone_regex();
    let mut matched: Vec<&SourceStream> = Vec::new();
    for stream in streams {
        if stream.is_stale || !pattern.is_match(&stream.name) {
            continue;
        }
        if !stream_is_for_day(&stream.name, active_day) {
            debug!(
                "[GOLD_ZONE] Skipping '{}' - not the active day",
                stream.name
            );
            continue;
        }
        matched.push(stream);
    }
    result.stream_count = matched.len();
    if matched.is_empty() {
        result.skipped = true;
        result.reason = Some("no matching streams".to_string());
        info!("[GOLD_ZONE] No matching streams found");
        return Ok(result);
    }
    let stream_ids: Vec<i64> = matched.iter().map(|s| s.id).collect();

    // Number conflict: another channel (not ours) already holds the slot.
    if let Some(existing) = channel_manager
        .find_by_number(settings.channel_number)
        .await?
    {
        if existing.tvg_id.as_deref() != Some(GOLD_ZONE_TVG_ID) {
            warn!(
                "[GOLD_ZONE] Channel number {} conflicts with existing channel '{}'",
                settings.channel_number, existing.name
            );
            result.skipped = true;
            result.reason = Some(format!(
                "number {} occupied by '{}'",
                settings.channel_number, existing.name
            ));
            return Ok(result);
        }
    }

    match channel_manager.find_by_tvg_id(GOLD_ZONE_TVG_ID).await? {
        Some(existing) => {
            channel_manager
                .update_channel(
                    existing.id,
                    &ChannelUpdate {
                        channel_number: Some(settings.channel_number),
                        streams: Some(stream_ids.clone()),
                        ..ChannelUpdate::default()
                    },
                )
                .await?;
            info!(
                "[GOLD_ZONE] Updated channel {} with {} streams",
                existing.id,
                stream_ids.len()
            );
            result.updated = true;
        }
        None => {
            let created = channel_manager
                .create_channel(&ChannelCreate {
                    name: GOLD_ZONE_CHANNEL_NAME.to_string(),
                    channel_number: settings.channel_number,
                    tvg_id: GOLD_ZONE_TVG_ID.to_string(),
                    channel_group_id: settings.channel_group_id,
                    channel_profile_ids: settings.channel_profile_ids.clone(),
                    stream_profile_id: settings.stream_profile_id,
                    streams: stream_ids.clone(),
                })
                .await?;
            info!(
                "[GOLD_ZONE] Created channel {} with {} streams",
                created.channel_id,
                stream_ids.len()
            );
            result.created = true;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcharr::{CreationResult, DownstreamChannel, DownstreamStream};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[test]
    fn test_games_day_mapping() {
        assert_eq!(games_day_to_date(1), NaiveDate::from_ymd_opt(2026, 2, 7));
        assert_eq!(games_day_to_date(7), NaiveDate::from_ymd_opt(2026, 2, 13));
        assert_eq!(games_day_to_date(15), NaiveDate::from_ymd_opt(2026, 2, 21));
        assert_eq!(games_day_to_date(17), NaiveDate::from_ymd_opt(2026, 2, 23));
        assert_eq!(games_day_to_date(0), None);
        assert_eq!(games_day_to_date(18), None);
    }

    #[test]
    fn test_stream_day_filtering() {
        let feb13 = NaiveDate::from_ymd_opt(2026, 2, 13).unwrap();
        assert!(stream_is_for_day("Gold Zone Day 7", feb13));
        assert!(!stream_is_for_day("Gold Zone Day 8", feb13));
        assert!(stream_is_for_day("Gold Zone 02/13", feb13));
        assert!(!stream_is_for_day("Gold Zone 02/14", feb13));
        // No date at all: included.
        assert!(stream_is_for_day("Gold Zone", feb13));
        assert!(stream_is_for_day("GOLD ZONE 10:00", feb13));
        // Day number wins over an ambiguous calendar token.
        assert!(stream_is_for_day("Gold Zone Day 7 - 02/13", feb13));
    }

    #[derive(Default)]
    struct FakeManager {
        channels: Mutex<Vec<DownstreamChannel>>,
        updates: Mutex<Vec<(i64, ChannelUpdate)>>,
    }

    #[async_trait]
    impl ChannelManagerApi for FakeManager {
        async fn get_channels(&self) -> Result<Vec<DownstreamChannel>> {
            Ok(self.channels.lock().clone())
        }
        async fn get_channel(&self, id: i64) -> Result<Option<DownstreamChannel>> {
            Ok(self.channels.lock().iter().find(|c| c.id == id).cloned())
        }
        async fn update_channel(&self, id: i64, fields: &ChannelUpdate) -> Result<()> {
            self.updates.lock().push((id, fields.clone()));
            Ok(())
        }
        async fn create_channel(&self, request: &ChannelCreate) -> Result<CreationResult> {
            self.channels.lock().push(DownstreamChannel {
                id: 77,
                name: request.name.clone(),
                channel_number: request.channel_number,
                tvg_id: Some(request.tvg_id.clone()),
                channel_group_id: request.channel_group_id,
                streams: request.streams.clone(),
            });
            Ok(CreationResult {
                channel_id: 77,
                channel_number: request.channel_number,
            })
        }
        async fn delete_channel(&self, _: i64) -> Result<()> {
            Ok(())
        }
        async fn set_channel_epg(&self, _: i64, _: i64) -> Result<()> {
            Ok(())
        }
        async fn list_streams(&self) -> Result<Vec<DownstreamStream>> {
            Ok(Vec::new())
        }
    }

    fn stream(id: i64, name: &str) -> SourceStream {
        SourceStream {
            id,
            name: name.to_string(),
            channel_group: None,
            m3u_account_id: None,
            m3u_account_name: None,
            is_stale: false,
        }
    }

    fn enabled_settings() -> GoldZoneSettings {
        GoldZoneSettings {
            enabled: true,
            channel_number: 50,
            ..GoldZoneSettings::default()
        }
    }

    #[tokio::test]
    async fn test_disabled_is_noop() {
        let fake = FakeManager::default();
        let result = process_gold_zone(
            &GoldZoneSettings::default(),
            &[stream(1, "Gold Zone Day 7")],
            &fake,
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
        )
        .await
        .unwrap();
        assert!(result.skipped);
        assert!(fake.channels.lock().is_empty());
    }

    #[tokio::test]
    async fn test_creates_channel_with_matched_streams() {
        let fake = FakeManager::default();
        let result = process_gold_zone(
            &enabled_settings(),
            &[
                stream(1, "Gold Zone Day 7"),
                stream(2, "GOLDZONE FHD"),
                stream(3, "Curling SWE vs ITA"),
            ],
            &fake,
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
        )
        .await
        .unwrap();
        assert!(result.created);
        assert_eq!(result.stream_count, 2);
        let channels = fake.channels.lock();
        assert_eq!(channels[0].tvg_id.as_deref(), Some("teamarr-goldzone"));
        assert_eq!(channels[0].streams, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_updates_existing_channel() {
        let fake = FakeManager::default();
        fake.channels.lock().push(DownstreamChannel {
            id: 77,
            name: "Gold Zone".to_string(),
            channel_number: 50,
            tvg_id: Some("teamarr-goldzone".to_string()),
            channel_group_id: None,
            streams: vec![],
        });
        let result = process_gold_zone(
            &enabled_settings(),
            &[stream(1, "Gold Zone Day 7")],
            &fake,
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
        )
        .await
        .unwrap();
        assert!(result.updated);
        assert_eq!(fake.updates.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_number_conflict_skips() {
        let fake = FakeManager::default();
        fake.channels.lock().push(DownstreamChannel {
            id: 5,
            name: "Someone Else".to_string(),
            channel_number: 50,
            tvg_id: Some("other".to_string()),
            channel_group_id: None,
            streams: vec![],
        });
        let result = process_gold_zone(
            &enabled_settings(),
            &[stream(1, "Gold Zone")],
            &fake,
            NaiveDate::from_ymd_opt(2026, 2, 13).unwrap(),
        )
        .await
        .unwrap();
        assert!(result.skipped);
        assert!(result.reason.unwrap().contains("occupied"));
    }
}
