mod config;
mod scheduler;

use crate::config::Config;
use crate::scheduler::CronSchedule;
use anyhow::{Context, Result};
use chrono::Utc;
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use teamarr_core::cache::PersistentTtlCache;
use teamarr_core::db::settings::load_settings;
use teamarr_core::db::{self, channels};
use teamarr_core::dispatcharr::DispatcharrClient;
use teamarr_core::epg::{EpgOrchestrator, GenerationRequest};
use teamarr_core::league_config;
use teamarr_core::lifecycle::{
    compute_external_occupied, ChannelLifecycleManager, KeywordOrderingEnforcer,
};
use teamarr_core::providers::registry::RegistryDependencies;
use teamarr_core::providers::ProviderRegistry;
use teamarr_core::service::SportsDataService;
use teamarr_core::team_cache::{CacheRefresher, TeamLeagueCache};
use teamarr_core::templates::TemplateResolver;
use teamarr_core::tz::parse_tz;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    info!("Starting Teamarr EPG Service...");

    // Config
    let config = Config::from_env();

    // Database with standardized pool configuration
    let pool = db::create_pool(&config.database_url, db::DbPoolConfig::default())
        .await
        .context("Failed to create database pool")?;
    db::init_schema(&pool)
        .await
        .context("Failed to initialize schema")?;

    // Providers: registry must be initialized with dependencies before
    // first use.
    let mut registry = ProviderRegistry::with_defaults();
    registry.initialize(RegistryDependencies::default());
    let providers = registry.get_all();

    let cache = PersistentTtlCache::new(pool.clone());
    let service = SportsDataService::new(providers.clone(), cache);
    let team_cache = TeamLeagueCache::new(pool.clone());
    let resolver = Arc::new(TemplateResolver::new());

    let orchestrator = Arc::new(EpgOrchestrator::new(
        pool.clone(),
        service.clone(),
        team_cache,
        Arc::clone(&resolver),
    ));

    if config.run_once {
        // Manual trigger: same code path as the scheduler, one cycle.
        let settings = load_settings(&pool).await?;
        let request = GenerationRequest::new(config.days_ahead, settings);
        let result = orchestrator.generate(request).await?;
        info!(
            "Manual run complete: {} teams, {} programmes, {} api calls",
            result.teams.len(),
            result.stats.programmes,
            result.api_calls
        );
        return Ok(());
    }

    let mut tasks = Vec::new();

    // 1. Generation Loop
    let generation_orchestrator = Arc::clone(&orchestrator);
    let generation_pool = pool.clone();
    let days_ahead = config.days_ahead;
    let fallback_interval = config.default_interval_minutes;
    tasks.push(tokio::spawn(async move {
        loop {
            let settings = match load_settings(&generation_pool).await {
                Ok(settings) => settings,
                Err(e) => {
                    error!("Failed to load settings: {}", e);
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    continue;
                }
            };
            let interval_minutes = if settings.scheduler_enabled {
                u64::from(settings.scheduler_interval_minutes.max(1))
            } else {
                fallback_interval
            };

            if settings.scheduler_enabled {
                let request = GenerationRequest::new(days_ahead, settings);
                match generation_orchestrator.generate(request).await {
                    Ok(result) => info!(
                        "Generation cycle done: {} programmes, {} api calls",
                        result.stats.programmes, result.api_calls
                    ),
                    Err(e) => error!("Generation cycle failed: {:#}", e),
                }
            }
            tokio::time::sleep(Duration::from_secs(interval_minutes * 60)).await;
        }
    }));

    // 2. Lifecycle Sweep Loop (group matching, channel creation and
    //    deletion, keyword ordering, Gold Zone)
    let lifecycle_pool = pool.clone();
    let lifecycle_service = service.clone();
    tasks.push(tokio::spawn(async move {
        info!("Lifecycle sweep loop started (interval: 300s)");
        loop {
            let settings = match load_settings(&lifecycle_pool).await {
                Ok(settings) => settings,
                Err(e) => {
                    error!("Failed to load settings for lifecycle: {}", e);
                    tokio::time::sleep(Duration::from_secs(300)).await;
                    continue;
                }
            };
            if settings.dispatcharr_enabled && !settings.dispatcharr_url.is_empty() {
                let client = DispatcharrClient::new(
                    &settings.dispatcharr_url,
                    &settings.dispatcharr_username,
                    &settings.dispatcharr_password,
                );
                if let Err(e) =
                    run_lifecycle_sweep(&lifecycle_pool, &lifecycle_service, &client, &settings)
                        .await
                {
                    warn!("Lifecycle sweep failed: {:#}", e);
                }
            }
            tokio::time::sleep(Duration::from_secs(300)).await;
        }
    }));

    // 3. Channel Reset Cron Loop
    let reset_pool = pool.clone();
    tasks.push(tokio::spawn(async move {
        info!("Channel reset cron loop started");
        loop {
            tokio::time::sleep(Duration::from_secs(60)).await;
            let settings = match load_settings(&reset_pool).await {
                Ok(settings) => settings,
                Err(_) => continue,
            };
            if !settings.channel_reset_enabled {
                continue;
            }
            let Some(schedule) = CronSchedule::parse(&settings.channel_reset_cron) else {
                warn!("Invalid channel_reset_cron '{}'", settings.channel_reset_cron);
                continue;
            };
            if !schedule.matches(Utc::now()) {
                continue;
            }
            info!("Channel reset fired ({})", settings.channel_reset_cron);
            if let Err(e) = run_channel_reset(&reset_pool, &settings).await {
                error!("Channel reset failed: {:#}", e);
            }
        }
    }));

    // 4. Team Cache Refresh Loop (weekly, handles promotion/relegation)
    let refresh_pool = pool.clone();
    let refresh_providers = providers;
    tasks.push(tokio::spawn(async move {
        loop {
            let cache = TeamLeagueCache::new(refresh_pool.clone());
            let stats = cache.stats().await;
            if stats.is_stale {
                info!("Team cache stale, refreshing");
                let leagues: Vec<String> = league_config::get_all_league_codes()
                    .into_iter()
                    .map(String::from)
                    .collect();
                let refresher =
                    CacheRefresher::new(refresh_pool.clone(), refresh_providers.clone());
                match refresher
                    .refresh(&leagues, |progress| {
                        info!(
                            "Team cache refresh: {}/{} {} ({} teams)",
                            progress.leagues_done,
                            progress.leagues_total,
                            progress.league,
                            progress.teams_cached
                        );
                    })
                    .await
                {
                    Ok(count) => info!("Team cache refreshed: {} teams", count),
                    Err(e) => error!("Team cache refresh failed: {:#}", e),
                }
            }
            tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
        }
    }));

    // Wait for signal
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(err) => {
            error!("Unable to listen for shutdown signal: {}", err);
        }
    }

    Ok(())
}

/// One lifecycle pass: match each group's streams to today's events,
/// create due channels, delete expired ones, enforce keyword placement
/// and ordering, and run the Gold Zone feature when enabled.
async fn run_lifecycle_sweep(
    pool: &sqlx::SqlitePool,
    service: &SportsDataService,
    client: &DispatcharrClient,
    settings: &teamarr_core::db::settings::AppSettings,
) -> Result<()> {
    use sqlx::Row;
    use teamarr_core::db::{detection_keywords, teams};
    use teamarr_core::detection::DetectionKeywordService;
    use teamarr_core::dispatcharr::ChannelManagerApi;
    use teamarr_core::epg::groups::{EventGroup, GroupMode, GroupProcessor, SourceStream};
    use teamarr_core::gold_zone::{process_gold_zone, GoldZoneSettings};
    use teamarr_core::lifecycle::numbering::NumberAssigner;
    use teamarr_core::lifecycle::KeywordEnforcer;
    use teamarr_core::matching::TeamMatcher;

    let now = Utc::now();
    let tz = parse_tz(&settings.epg_timezone);
    let today = now.with_timezone(&tz).date_naive();

    // Streams from the source; external numbers for collision safety.
    let downstream_streams = client.list_streams().await?;
    let source_streams: Vec<SourceStream> = downstream_streams
        .iter()
        .map(|s| SourceStream {
            id: s.id,
            name: s.name.clone(),
            channel_group: s.channel_group.clone(),
            m3u_account_id: s.m3u_account_id,
            m3u_account_name: s.m3u_account_name.clone(),
            is_stale: s.is_stale,
        })
        .collect();
    let downstream_numbers: Vec<u32> = client
        .get_channels()
        .await?
        .iter()
        .map(|c| c.channel_number)
        .collect();
    let managed_numbers = channels::get_active_numbers(pool).await?;
    let external = compute_external_occupied(&downstream_numbers, &managed_numbers);
    let mut assigner = NumberAssigner::new(external, &managed_numbers);

    // Matching stack: user patterns and aliases over the built-ins.
    let user_keywords = detection_keywords::load_enabled_keywords(pool).await?;
    let detection = Arc::new(DetectionKeywordService::with_user_rows(user_keywords));
    let aliases = teams::get_user_aliases(pool).await?;
    let matcher = TeamMatcher::new(detection)
        .with_aliases(aliases.into_iter().collect());
    let team_cache = TeamLeagueCache::new(pool.clone());
    let processor = GroupProcessor::new(service, &team_cache, &matcher);

    let lifecycle = ChannelLifecycleManager::new(
        pool.clone(),
        settings.channel_create_timing,
        settings.channel_delete_timing,
        settings.duplicate_mode,
        settings.exception_keywords.clone(),
        tz,
    );

    // Group matching and channel creation.
    let group_rows = sqlx::query(
        "SELECT id, name, mode, leagues, m3u_group, resolved_leagues,
                channel_start_number
         FROM event_epg_groups WHERE enabled = 1",
    )
    .fetch_all(pool)
    .await?;
    for row in &group_rows {
        let group = EventGroup {
            id: row.get("id"),
            name: row.get("name"),
            mode: match row.get::<String, _>("mode").as_str() {
                "multi" => GroupMode::Multi,
                _ => GroupMode::Single,
            },
            leagues: serde_json::from_str(&row.get::<String, _>("leagues"))
                .unwrap_or_default(),
            m3u_group: row.get("m3u_group"),
            resolved_leagues: row
                .get::<Option<String>, _>("resolved_leagues")
                .and_then(|raw| serde_json::from_str(&raw).ok()),
            channel_start_number: row
                .get::<Option<i64>, _>("channel_start_number")
                .map(|n| n as u32),
        };
        let clusters = processor.process(&group, &source_streams, today).await;
        let group_start = group
            .channel_start_number
            .unwrap_or(settings.channel_range_start);
        let mut sweep = teamarr_core::lifecycle::manager::LifecycleSweepResult::default();
        for cluster in &clusters {
            let duration = settings.game_duration_hours(&cluster.event.event.league);
            if let Err(e) = lifecycle
                .ensure_cluster_channels(
                    group.id,
                    group_start,
                    cluster,
                    duration,
                    &mut assigner,
                    client,
                    now,
                    &mut sweep,
                )
                .await
            {
                warn!("Channel creation failed for group {}: {:#}", group.name, e);
            }
        }
        if sweep.channels_created > 0 {
            info!(
                "Group {}: created {} channels, attached {} streams",
                group.name, sweep.channels_created, sweep.streams_attached
            );
        }
    }

    // Deletions, keyword placement, and main-first ordering.
    let deleted = lifecycle.sweep_deletions(client, now).await;
    if !deleted.errors.is_empty() {
        warn!("Lifecycle deletion errors: {:?}", deleted.errors);
    }
    let enforcement = KeywordEnforcer::new(pool.clone(), settings.exception_keywords.clone())
        .enforce(Some(client))
        .await;
    if enforcement.moved_count() > 0 {
        info!("Keyword enforcement moved {} streams", enforcement.moved_count());
    }
    let ordering = KeywordOrderingEnforcer::new(pool.clone());
    let reordered = ordering.enforce(Some(client)).await;
    if reordered.reordered_count() > 0 {
        info!("Reordered {} channel pairs", reordered.reordered_count());
    }

    // Gold Zone (feature-flagged).
    let gold_zone = GoldZoneSettings {
        enabled: settings.gold_zone_enabled,
        channel_number: settings.gold_zone_channel_number,
        channel_group_id: settings.gold_zone_channel_group_id,
        stream_profile_id: settings.gold_zone_stream_profile_id,
        channel_profile_ids: settings.gold_zone_channel_profile_ids.clone(),
    };
    let gz = process_gold_zone(&gold_zone, &source_streams, client, today).await?;
    if gz.created || gz.updated {
        info!("Gold Zone pass: {} streams attached", gz.stream_count);
    }

    Ok(())
}

/// Global channel reassignment: sort AUTO channels by sport/league
/// priority and assign contiguous numbers, still skipping externals.
async fn run_channel_reset(
    pool: &sqlx::SqlitePool,
    settings: &teamarr_core::db::settings::AppSettings,
) -> Result<()> {
    use teamarr_core::dispatcharr::{ChannelManagerApi, ChannelUpdate};

    let client = DispatcharrClient::new(
        &settings.dispatcharr_url,
        &settings.dispatcharr_username,
        &settings.dispatcharr_password,
    );
    let downstream = client.get_channels().await?;
    let downstream_numbers: Vec<u32> = downstream.iter().map(|c| c.channel_number).collect();
    let managed = channels::get_active_channels(pool).await?;
    let managed_numbers: Vec<u32> = managed.iter().map(|c| c.channel_number).collect();
    let external = compute_external_occupied(&downstream_numbers, &managed_numbers);

    let priorities = teamarr_core::db::sort_priorities::get_sort_priorities(pool).await?;

    // Each channel's league comes from its owning group's configuration.
    let group_rows =
        sqlx::query("SELECT id, leagues, channel_start_number FROM event_epg_groups")
            .fetch_all(pool)
            .await?;
    let mut group_league: std::collections::HashMap<i64, String> = std::collections::HashMap::new();
    let mut group_start: std::collections::HashMap<i64, u32> = std::collections::HashMap::new();
    for row in &group_rows {
        use sqlx::Row;
        let id: i64 = row.get("id");
        let leagues: Vec<String> =
            serde_json::from_str(&row.get::<String, _>("leagues")).unwrap_or_default();
        group_league.insert(id, leagues.into_iter().next().unwrap_or_default());
        if let Some(start) = row.get::<Option<i64>, _>("channel_start_number") {
            group_start.insert(id, start as u32);
        }
    }

    use teamarr_core::db::settings::{SortBy, SortingScope};
    let sort_by = settings.sort_by;
    let priority_key = |c: &teamarr_core::types::ManagedChannel| {
        let league = group_league
            .get(&c.event_epg_group_id)
            .cloned()
            .unwrap_or_default();
        let sport = teamarr_core::league_config::get_league_config(&league)
            .map(|config| config.api_sport.to_string())
            .unwrap_or_default();
        match sort_by {
            // Sport/league priority, then event id for a stable order.
            SortBy::SportLeagueTime => (
                teamarr_core::db::sort_priorities::priority_for(&priorities, &sport, &league),
                c.event_id.clone(),
            ),
            SortBy::Time => (
                0,
                c.scheduled_create_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_default(),
            ),
            SortBy::StreamOrder => (0, format!("{:020}", c.id)),
        }
    };

    let assignments = match settings.channel_sorting_scope {
        SortingScope::Global => teamarr_core::lifecycle::numbering::global_reassign(
            &managed,
            |c| c.id,
            priority_key,
            settings.channel_range_start,
            &external,
        ),
        SortingScope::PerGroup => {
            // Reassign each group from its own start number.
            let mut group_ids: Vec<i64> =
                managed.iter().map(|c| c.event_epg_group_id).collect();
            group_ids.sort_unstable();
            group_ids.dedup();
            let mut assignments = Vec::new();
            let mut assigner =
                teamarr_core::lifecycle::numbering::NumberAssigner::new(external.clone(), &[]);
            for group_id in group_ids {
                let start = group_start
                    .get(&group_id)
                    .copied()
                    .unwrap_or(settings.channel_range_start);
                let mut members: Vec<&teamarr_core::types::ManagedChannel> = managed
                    .iter()
                    .filter(|c| c.event_epg_group_id == group_id)
                    .collect();
                members.sort_by_key(|c| priority_key(c));
                for channel in members {
                    assignments.push((channel.id, assigner.next_from(start)));
                }
            }
            assignments
        }
    };

    for (channel_id, number) in assignments {
        if let Some(channel) = managed.iter().find(|c| c.id == channel_id) {
            if channel.channel_number == number {
                continue;
            }
            client
                .update_channel(
                    channel.dispatcharr_channel_id,
                    &ChannelUpdate {
                        channel_number: Some(number),
                        ..ChannelUpdate::default()
                    },
                )
                .await?;
            channels::update_channel_number(pool, channel.id, number).await?;
            channels::log_channel_history(
                pool,
                channel.id,
                "number_reassigned",
                "channel_reset",
                Some("channel_number"),
                Some(&channel.channel_number.to_string()),
                Some(&number.to_string()),
                None,
            )
            .await?;
        }
    }
    info!("Channel reset complete");
    Ok(())
}
