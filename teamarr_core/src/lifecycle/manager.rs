//! Scheduled channel creation and deletion.
//!
//! For every upcoming matched event the lifecycle manager decides, from
//! the global timing settings, when its channel appears and disappears.
//! Creation and deletion are idempotent at the record level: re-running
//! a sweep never duplicates channels or deletes twice, so the periodic
//! scheduler and the manual trigger share this code path safely.

use super::keywords::{check_exception_keyword, ExceptionKeyword, KeywordBehavior};
use super::numbering::NumberAssigner;
use crate::db::channels::{
    attach_stream, get_active_channels, insert_channel, log_channel_history, mark_deleted,
};
use crate::db::settings::{CreateTiming, DeleteTiming, DuplicateMode};
use crate::dispatcharr::{ChannelCreate, ChannelManagerApi, ALL_PROFILES};
use crate::epg::groups::EventCluster;
use crate::types::{event_tvg_id, ManagedChannel};
use crate::tz::day_start;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

/// When a channel should exist, relative to its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LifecycleDecision {
    /// `None` means "create as soon as a stream is available".
    pub create_at: Option<DateTime<Utc>>,
    /// `None` means "delete when the stream disappears".
    pub delete_at: Option<DateTime<Utc>>,
}

/// Compute the create/delete instants for one event.
pub fn decide(
    event_start: DateTime<Utc>,
    duration_hours: f64,
    create_timing: CreateTiming,
    delete_timing: DeleteTiming,
    tz: Tz,
) -> LifecycleDecision {
    let event_day_start = day_start(event_start, tz);
    let event_end = event_start + Duration::seconds((duration_hours * 3600.0) as i64);

    let create_at = create_timing
        .days_before()
        .map(|days| event_day_start - Duration::days(days));

    let delete_at = match delete_timing {
        DeleteTiming::StreamRemoved => None,
        DeleteTiming::SixHoursAfter => Some(event_end + Duration::hours(6)),
        DeleteTiming::SameDay => Some(event_day_start + Duration::days(1)),
        DeleteTiming::DayAfter => Some(event_day_start + Duration::days(2)),
        DeleteTiming::TwoDaysAfter => Some(event_day_start + Duration::days(3)),
        DeleteTiming::ThreeDaysAfter => Some(event_day_start + Duration::days(4)),
        DeleteTiming::OneWeekAfter => Some(event_day_start + Duration::days(8)),
    };

    LifecycleDecision {
        create_at,
        delete_at,
    }
}

/// Result of one lifecycle sweep.
#[derive(Debug, Default, Serialize)]
pub struct LifecycleSweepResult {
    pub channels_created: usize,
    pub channels_deleted: usize,
    pub streams_attached: usize,
    pub errors: Vec<String>,
}

/// Drives scheduled creation/deletion of managed channels.
pub struct ChannelLifecycleManager {
    pool: sqlx::SqlitePool,
    create_timing: CreateTiming,
    delete_timing: DeleteTiming,
    duplicate_mode: DuplicateMode,
    keywords: Vec<ExceptionKeyword>,
    tz: Tz,
}

impl ChannelLifecycleManager {
    pub fn new(
        pool: sqlx::SqlitePool,
        create_timing: CreateTiming,
        delete_timing: DeleteTiming,
        duplicate_mode: DuplicateMode,
        keywords: Vec<ExceptionKeyword>,
        tz: Tz,
    ) -> Self {
        Self {
            pool,
            create_timing,
            delete_timing,
            duplicate_mode,
            keywords,
            tz,
        }
    }

    /// Ensure channels exist for one event cluster whose create time has
    /// arrived. Variant channels are created per matched keyword when
    /// duplicates are split; consolidated mode attaches everything to
    /// the main channel.
    #[allow(clippy::too_many_arguments)]
    pub async fn ensure_cluster_channels(
        &self,
        group_id: i64,
        group_channel_start: u32,
        cluster: &EventCluster,
        duration_hours: f64,
        assigner: &mut NumberAssigner,
        channel_manager: &dyn ChannelManagerApi,
        now: DateTime<Utc>,
        result: &mut LifecycleSweepResult,
    ) -> Result<()> {
        let event = &cluster.event.event;
        let decision = decide(
            event.start_time,
            duration_hours,
            self.create_timing,
            self.delete_timing,
            self.tz,
        );
        let stream_available = !cluster.streams.is_empty();
        let due = match decision.create_at {
            Some(create_at) => now >= create_at,
            None => stream_available,
        };
        if !due {
            debug!("[LIFECYCLE] {} not due for creation yet", event.id);
            return Ok(());
        }

        let existing = get_active_channels(&self.pool).await?;
        let find = |keyword: Option<&str>| -> Option<&ManagedChannel> {
            existing.iter().find(|c| {
                c.event_epg_group_id == group_id
                    && c.event_id == event.id
                    && c.exception_keyword.as_deref().filter(|k| !k.is_empty()) == keyword
            })
        };

        // Main channel first: it must take the lowest number.
        let main_id = match find(None) {
            Some(channel) => channel.id,
            None => {
                self.create_channel(
                    group_id,
                    group_channel_start,
                    cluster,
                    None,
                    decision,
                    assigner,
                    channel_manager,
                    result,
                )
                .await?
            }
        };

        // Variant channels for keyword-matched streams (split mode).
        let mut variant_ids: Vec<(String, i64)> = Vec::new();
        if self.duplicate_mode == DuplicateMode::Split {
            for (stream, _) in &cluster.streams {
                let Some(matched) = check_exception_keyword(&stream.name, &self.keywords) else {
                    continue;
                };
                if matched.behavior != KeywordBehavior::Split {
                    continue;
                }
                if variant_ids.iter().any(|(k, _)| k == &matched.keyword) {
                    continue;
                }
                let id = match find(Some(&matched.keyword)) {
                    Some(channel) => channel.id,
                    None => {
                        self.create_channel(
                            group_id,
                            group_channel_start,
                            cluster,
                            Some(&matched.keyword),
                            decision,
                            assigner,
                            channel_manager,
                            result,
                        )
                        .await?
                    }
                };
                variant_ids.push((matched.keyword.clone(), id));
            }
        }

        // Attach each matched stream to its proper channel.
        for (stream, _) in &cluster.streams {
            let matched = check_exception_keyword(&stream.name, &self.keywords);
            if matched.map(|k| k.behavior) == Some(KeywordBehavior::Ignore) {
                continue;
            }
            let keyword = matched.map(|k| k.keyword.as_str());
            let target = keyword
                .and_then(|k| variant_ids.iter().find(|(vk, _)| vk == k).map(|(_, id)| *id))
                .unwrap_or(main_id);
            attach_stream(&self.pool, target, stream.id, &stream.name, keyword).await?;
            result.streams_attached += 1;
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_channel(
        &self,
        group_id: i64,
        group_channel_start: u32,
        cluster: &EventCluster,
        keyword: Option<&str>,
        decision: LifecycleDecision,
        assigner: &mut NumberAssigner,
        channel_manager: &dyn ChannelManagerApi,
        result: &mut LifecycleSweepResult,
    ) -> Result<i64> {
        let event = &cluster.event.event;
        let number = assigner.next_from(group_channel_start);
        let name = match keyword {
            Some(keyword) => format!("{} ({})", event.name, keyword),
            None => event.name.clone(),
        };
        let tvg_id = match keyword {
            Some(keyword) => format!("{}-{}", event_tvg_id(&event.id), slugify_keyword(keyword)),
            None => event_tvg_id(&event.id),
        };

        let created = channel_manager
            .create_channel(&ChannelCreate {
                name: name.clone(),
                channel_number: number,
                tvg_id: tvg_id.clone(),
                channel_group_id: None,
                channel_profile_ids: vec![ALL_PROFILES],
                stream_profile_id: None,
                streams: Vec::new(),
            })
            .await?;

        let row_id = insert_channel(
            &self.pool,
            created.channel_id,
            number,
            &tvg_id,
            &name,
            group_id,
            &event.id,
            keyword,
            decision.create_at,
            decision.delete_at,
        )
        .await?;
        log_channel_history(
            &self.pool,
            row_id,
            "created",
            "lifecycle",
            None,
            None,
            Some(&number.to_string()),
            keyword.map(|k| format!("variant for keyword '{k}'")).as_deref(),
        )
        .await?;
        info!(
            "[LIFECYCLE] Created channel #{} '{}' (tvg_id={})",
            number, name, tvg_id
        );
        result.channels_created += 1;
        Ok(row_id)
    }

    /// Delete every channel whose scheduled delete time has passed.
    /// Safe to re-run: deleted rows drop out of the active set.
    pub async fn sweep_deletions(
        &self,
        channel_manager: &dyn ChannelManagerApi,
        now: DateTime<Utc>,
    ) -> LifecycleSweepResult {
        let mut result = LifecycleSweepResult::default();
        let channels = match get_active_channels(&self.pool).await {
            Ok(channels) => channels,
            Err(e) => {
                result.errors.push(e.to_string());
                return result;
            }
        };

        for channel in channels {
            let Some(delete_at) = channel.scheduled_delete_at else {
                continue;
            };
            if delete_at > now {
                continue;
            }
            if let Err(e) = channel_manager
                .delete_channel(channel.dispatcharr_channel_id)
                .await
            {
                // Downstream failure: leave the local record so the next
                // reconciliation retries.
                warn!("[LIFECYCLE] Downstream delete failed for {}: {}", channel.id, e);
                result.errors.push(e.to_string());
                continue;
            }
            if let Err(e) = mark_deleted(&self.pool, channel.id).await {
                result.errors.push(e.to_string());
                continue;
            }
            let _ = log_channel_history(
                &self.pool,
                channel.id,
                "deleted",
                "lifecycle",
                None,
                None,
                None,
                None,
            )
            .await;
            result.channels_deleted += 1;
        }

        if result.channels_deleted > 0 {
            info!("[LIFECYCLE] Deleted {} channel(s)", result.channels_deleted);
        }
        result
    }
}

/// Lowercase slug for keyword-variant tvg_ids.
pub fn slugify_keyword(keyword: &str) -> String {
    keyword
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use crate::dispatcharr::{
        ChannelUpdate, CreationResult, DownstreamChannel, DownstreamStream,
    };
    use crate::epg::groups::SourceStream;
    use crate::matching::{MatchMethod, StreamMatch};
    use crate::types::{EnrichedEvent, Event, EventStatus, Team};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use parking_lot::Mutex;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct FakeManager {
        channels: Mutex<Vec<DownstreamChannel>>,
        next_id: Mutex<i64>,
        deleted: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl ChannelManagerApi for FakeManager {
        async fn get_channels(&self) -> Result<Vec<DownstreamChannel>> {
            Ok(self.channels.lock().clone())
        }
        async fn get_channel(&self, id: i64) -> Result<Option<DownstreamChannel>> {
            Ok(self.channels.lock().iter().find(|c| c.id == id).cloned())
        }
        async fn update_channel(&self, _: i64, _: &ChannelUpdate) -> Result<()> {
            Ok(())
        }
        async fn create_channel(&self, request: &ChannelCreate) -> Result<CreationResult> {
            let mut next = self.next_id.lock();
            *next += 1;
            let id = *next;
            self.channels.lock().push(DownstreamChannel {
                id,
                name: request.name.clone(),
                channel_number: request.channel_number,
                tvg_id: Some(request.tvg_id.clone()),
                channel_group_id: request.channel_group_id,
                streams: request.streams.clone(),
            });
            Ok(CreationResult {
                channel_id: id,
                channel_number: request.channel_number,
            })
        }
        async fn delete_channel(&self, id: i64) -> Result<()> {
            self.deleted.lock().push(id);
            self.channels.lock().retain(|c| c.id != id);
            Ok(())
        }
        async fn set_channel_epg(&self, _: i64, _: i64) -> Result<()> {
            Ok(())
        }
        async fn list_streams(&self) -> Result<Vec<DownstreamStream>> {
            Ok(Vec::new())
        }
    }

    fn cluster_at(start: DateTime<Utc>, stream_names: &[&str]) -> EventCluster {
        let team = |id: &str, name: &str| Team {
            id: id.to_string(),
            provider: "espn".to_string(),
            name: name.to_string(),
            short_name: name.to_string(),
            abbreviation: String::new(),
            league: "nba".to_string(),
            sport: "basketball".to_string(),
            logo_url: None,
            color: None,
        };
        let event = Event {
            id: "e1".to_string(),
            provider: "espn".to_string(),
            name: "Pistons vs Bulls".to_string(),
            short_name: "DET vs CHI".to_string(),
            start_time: start,
            home_team: team("8", "Detroit Pistons"),
            away_team: team("4", "Chicago Bulls"),
            status: EventStatus::scheduled(),
            league: "nba".to_string(),
            sport: "basketball".to_string(),
            home_score: None,
            away_score: None,
            venue: None,
            broadcasts: vec![],
            season_year: None,
            season_type: None,
            main_card_start: None,
        };
        EventCluster {
            event: EnrichedEvent::bare(event),
            streams: stream_names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    (
                        SourceStream {
                            id: 500 + i as i64,
                            name: name.to_string(),
                            channel_group: None,
                            m3u_account_id: None,
                            m3u_account_name: None,
                            is_stale: false,
                        },
                        StreamMatch {
                            event_id: "e1".to_string(),
                            league: "nba".to_string(),
                            method: MatchMethod::Fuzzy,
                            score: 100.0,
                            card_segment: None,
                        },
                    )
                })
                .collect(),
        }
    }

    fn manager(pool: sqlx::SqlitePool, mode: DuplicateMode) -> ChannelLifecycleManager {
        ChannelLifecycleManager::new(
            pool,
            CreateTiming::SameDay,
            DeleteTiming::DayAfter,
            mode,
            vec![ExceptionKeyword {
                keyword: "Spanish".to_string(),
                behavior: KeywordBehavior::Split,
            }],
            chrono_tz::UTC,
        )
    }

    #[test]
    fn test_decide_timings() {
        let start = Utc.with_ymd_and_hms(2026, 2, 11, 19, 0, 0).unwrap();
        let decision = decide(
            start,
            3.0,
            CreateTiming::DayBefore,
            DeleteTiming::SixHoursAfter,
            chrono_tz::UTC,
        );
        assert_eq!(
            decision.create_at,
            Some(Utc.with_ymd_and_hms(2026, 2, 10, 0, 0, 0).unwrap())
        );
        assert_eq!(
            decision.delete_at,
            Some(Utc.with_ymd_and_hms(2026, 2, 12, 4, 0, 0).unwrap())
        );

        let decision = decide(
            start,
            3.0,
            CreateTiming::StreamAvailable,
            DeleteTiming::StreamRemoved,
            chrono_tz::UTC,
        );
        assert_eq!(decision.create_at, None);
        assert_eq!(decision.delete_at, None);
        // Invariant: delete never precedes create.
        let decision = decide(
            start,
            3.0,
            CreateTiming::OneWeekBefore,
            DeleteTiming::SameDay,
            chrono_tz::UTC,
        );
        assert!(decision.delete_at.unwrap() >= decision.create_at.unwrap());
    }

    #[tokio::test]
    async fn test_ensure_creates_main_and_attaches_streams() {
        let pool = test_pool().await;
        let fake = FakeManager::default();
        let lifecycle = manager(pool.clone(), DuplicateMode::Consolidated);
        let mut assigner = NumberAssigner::new(BTreeSet::new(), &[]);
        let now = Utc.with_ymd_and_hms(2026, 2, 11, 8, 0, 0).unwrap();
        let cluster = cluster_at(
            Utc.with_ymd_and_hms(2026, 2, 11, 19, 0, 0).unwrap(),
            &["DET vs CHI", "DET vs CHI Spanish"],
        );
        let mut result = LifecycleSweepResult::default();

        lifecycle
            .ensure_cluster_channels(1, 100, &cluster, 3.0, &mut assigner, &fake, now, &mut result)
            .await
            .unwrap();

        assert_eq!(result.channels_created, 1);
        // Consolidated: both streams land on the main channel.
        assert_eq!(result.streams_attached, 2);
        let downstream = fake.channels.lock();
        assert_eq!(downstream.len(), 1);
        assert_eq!(downstream[0].tvg_id.as_deref(), Some("teamarr-event-e1"));
    }

    #[tokio::test]
    async fn test_split_mode_creates_variant_with_higher_number() {
        let pool = test_pool().await;
        let fake = FakeManager::default();
        let lifecycle = manager(pool.clone(), DuplicateMode::Split);
        let mut assigner = NumberAssigner::new(BTreeSet::new(), &[]);
        let now = Utc.with_ymd_and_hms(2026, 2, 11, 8, 0, 0).unwrap();
        let cluster = cluster_at(
            Utc.with_ymd_and_hms(2026, 2, 11, 19, 0, 0).unwrap(),
            &["DET vs CHI", "DET vs CHI Spanish"],
        );
        let mut result = LifecycleSweepResult::default();

        lifecycle
            .ensure_cluster_channels(1, 100, &cluster, 3.0, &mut assigner, &fake, now, &mut result)
            .await
            .unwrap();

        assert_eq!(result.channels_created, 2);
        let channels = get_active_channels(&pool).await.unwrap();
        let main = channels.iter().find(|c| c.is_main()).unwrap();
        let variant = channels.iter().find(|c| !c.is_main()).unwrap();
        // Keyword order invariant at creation: main gets the lower number.
        assert!(main.channel_number < variant.channel_number);
        assert!(variant.tvg_id.ends_with("-spanish"));
    }

    #[tokio::test]
    async fn test_ensure_is_idempotent() {
        let pool = test_pool().await;
        let fake = FakeManager::default();
        let lifecycle = manager(pool.clone(), DuplicateMode::Consolidated);
        let mut assigner = NumberAssigner::new(BTreeSet::new(), &[]);
        let now = Utc.with_ymd_and_hms(2026, 2, 11, 8, 0, 0).unwrap();
        let cluster = cluster_at(
            Utc.with_ymd_and_hms(2026, 2, 11, 19, 0, 0).unwrap(),
            &["DET vs CHI"],
        );

        let mut first = LifecycleSweepResult::default();
        lifecycle
            .ensure_cluster_channels(1, 100, &cluster, 3.0, &mut assigner, &fake, now, &mut first)
            .await
            .unwrap();
        let mut second = LifecycleSweepResult::default();
        lifecycle
            .ensure_cluster_channels(1, 100, &cluster, 3.0, &mut assigner, &fake, now, &mut second)
            .await
            .unwrap();
        assert_eq!(first.channels_created, 1);
        assert_eq!(second.channels_created, 0);
        assert_eq!(get_active_channels(&pool).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_not_due_yet_creates_nothing() {
        let pool = test_pool().await;
        let fake = FakeManager::default();
        let lifecycle = manager(pool.clone(), DuplicateMode::Consolidated);
        let mut assigner = NumberAssigner::new(BTreeSet::new(), &[]);
        // Event is tomorrow; same-day timing means not due today.
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 8, 0, 0).unwrap();
        let cluster = cluster_at(
            Utc.with_ymd_and_hms(2026, 2, 11, 19, 0, 0).unwrap(),
            &["DET vs CHI"],
        );
        let mut result = LifecycleSweepResult::default();
        lifecycle
            .ensure_cluster_channels(1, 100, &cluster, 3.0, &mut assigner, &fake, now, &mut result)
            .await
            .unwrap();
        assert_eq!(result.channels_created, 0);
    }

    #[tokio::test]
    async fn test_sweep_deletes_due_channels() {
        let pool = test_pool().await;
        let fake = FakeManager::default();
        let lifecycle = manager(pool.clone(), DuplicateMode::Consolidated);

        let past = Utc.with_ymd_and_hms(2026, 2, 10, 0, 0, 0).unwrap();
        let future = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        insert_channel(&pool, 10, 100, "teamarr-event-a", "A", 1, "a", None, None, Some(past))
            .await
            .unwrap();
        insert_channel(&pool, 11, 101, "teamarr-event-b", "B", 1, "b", None, None, Some(future))
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2026, 2, 11, 0, 0, 0).unwrap();
        let result = lifecycle.sweep_deletions(&fake, now).await;
        assert_eq!(result.channels_deleted, 1);
        assert_eq!(*fake.deleted.lock(), vec![10]);

        // Idempotent: second sweep finds nothing due.
        let again = lifecycle.sweep_deletions(&fake, now).await;
        assert_eq!(again.channels_deleted, 0);
    }

    #[test]
    fn test_slugify_keyword() {
        assert_eq!(slugify_keyword("Spanish"), "spanish");
        assert_eq!(slugify_keyword("Portuguese (BR)"), "portuguese--br");
    }
}
