//! EPG orchestrator: the per-team generation pipeline.
//!
//! One generation cycle loads the active teams, resolves the cycle start
//! (explicit, lookback game, or previous hour), runs every team through
//! the pipeline concurrently, and aggregates timelines plus stats. One
//! team's failure never propagates - its slot is simply empty.
//!
//! The unified scoreboard enrichment pass solves two problems at once:
//! soccer league schedules without future fixtures get event discovery,
//! and every league gets late-binding live data (odds, broadcasts,
//! scores). Scoreboard fetches go through a per-cycle cache keyed by
//! (league, date) with one-flight semantics so parallel team workers
//! never duplicate a fetch.

use crate::db::settings::AppSettings;
use crate::db::teams::{get_teams_with_templates, TeamRow};
use crate::epg::context::{
    build_game_context, calculate_h2h, calculate_streaks, neighbors,
};
use crate::filler::{FillerGenerator, FillerInputs, GameSpan};
use crate::league_config;
use crate::service::SportsDataService;
use crate::team_cache::TeamLeagueCache;
use crate::templates::conditions::select_description;
use crate::templates::TemplateResolver;
use crate::types::{
    EnrichedEvent, Event, EventState, GameContext, ProcessedProgramme, ProgrammeStatus,
    TemplateContext,
};
use crate::tz::{parse_tz, round_to_last_hour};
use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, info, warn};

/// Bounded worker pool for per-team processing.
const MAX_TEAM_WORKERS: usize = 100;

/// Hours scanned backwards for an in-progress game when no explicit
/// start is given.
const LOOKBACK_HOURS: i64 = 6;

/// Extended-schedule window: 30 days back and forward from now.
const EXTENDED_WINDOW_DAYS: i64 = 30;

/// Past days enriched with final scores.
const PAST_ENRICH_DAYS: i64 = 7;

/// Progress callback: (current, total, item_name, message).
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &str, &str) + Send + Sync>;

/// Inputs for one generation cycle.
#[derive(Clone)]
pub struct GenerationRequest {
    pub days_ahead: u32,
    pub settings: AppSettings,
    pub start_datetime: Option<DateTime<Utc>>,
    pub progress: Option<ProgressCallback>,
}

impl GenerationRequest {
    pub fn new(days_ahead: u32, settings: AppSettings) -> Self {
        Self {
            days_ahead: days_ahead.clamp(1, 14),
            settings,
            start_datetime: None,
            progress: None,
        }
    }
}

/// Counts emitted with every generation.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GenerationStats {
    pub teams: usize,
    pub failed_teams: usize,
    pub programmes: usize,
    pub game_programmes: usize,
    pub pregame_filler: usize,
    pub postgame_filler: usize,
    pub idle_filler: usize,
    pub api_calls: u64,
    pub wall_time_ms: u128,
}

/// Output of one generation cycle.
pub struct GenerationResult {
    pub teams: Vec<TeamRow>,
    /// team row id → sorted programme timeline.
    pub programmes: HashMap<i64, Vec<ProcessedProgramme>>,
    pub api_calls: u64,
    pub stats: GenerationStats,
}

type ScoreboardKey = (String, NaiveDate);
type ScoreboardCell = Arc<OnceCell<Arc<Vec<EnrichedEvent>>>>;

/// Per-team pipeline orchestrator.
pub struct EpgOrchestrator {
    pool: SqlitePool,
    service: SportsDataService,
    team_cache: TeamLeagueCache,
    resolver: Arc<TemplateResolver>,
    api_calls: AtomicU64,
    scoreboard_cache: Mutex<FxHashMap<ScoreboardKey, ScoreboardCell>>,
}

impl EpgOrchestrator {
    pub fn new(
        pool: SqlitePool,
        service: SportsDataService,
        team_cache: TeamLeagueCache,
        resolver: Arc<TemplateResolver>,
    ) -> Self {
        Self {
            pool,
            service,
            team_cache,
            resolver,
            api_calls: AtomicU64::new(0),
            scoreboard_cache: Mutex::new(FxHashMap::default()),
        }
    }

    fn count_api_call(&self) {
        self.api_calls.fetch_add(1, Ordering::Relaxed);
    }

    fn clear_cycle_caches(&self) {
        self.scoreboard_cache.lock().clear();
        self.api_calls.store(0, Ordering::Relaxed);
    }

    /// Scoreboard for (league, date) with cycle-level one-flight caching:
    /// the cell is claimed under the map lock, then filled outside it, so
    /// concurrent team workers share a single fetch.
    async fn scoreboard(&self, league: &str, date: NaiveDate) -> Arc<Vec<EnrichedEvent>> {
        let cell = {
            let mut cache = self.scoreboard_cache.lock();
            cache
                .entry((league.to_string(), date))
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        cell.get_or_init(|| async {
            self.count_api_call();
            Arc::new(self.service.get_events(league, date).await)
        })
        .await
        .clone()
    }

    /// Run one full generation cycle.
    pub async fn generate(self: &Arc<Self>, request: GenerationRequest) -> Result<GenerationResult> {
        let started = std::time::Instant::now();
        let days_ahead = request.days_ahead.clamp(1, 14);

        // 1. Cycle-scoped caches reset.
        self.clear_cycle_caches();
        self.service.reset_provider_stats();

        // 2. Teams with attached templates.
        let teams = get_teams_with_templates(&self.pool).await?;
        info!("[EPG] Generation cycle: {} teams, {} days", teams.len(), days_ahead);

        // 3. Cycle start.
        let epg_start = match request.start_datetime {
            Some(explicit) => explicit,
            None => self.calculate_epg_start(&teams, days_ahead).await,
        };

        // 4. Concurrent per-team pipelines, error-isolated.
        let semaphore = Arc::new(Semaphore::new(MAX_TEAM_WORKERS));
        let mut handles = Vec::with_capacity(teams.len());
        for team in teams.clone() {
            let orchestrator = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            let request = request.clone();
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore open");
                let row_id = team.row_id;
                let name = team.config.team_name.clone();
                let result = orchestrator
                    .process_team(&team, days_ahead, epg_start, &request.settings)
                    .await;
                (row_id, name, result)
            }));
        }

        let total = handles.len();
        let mut programmes: HashMap<i64, Vec<ProcessedProgramme>> = HashMap::new();
        let mut stats = GenerationStats {
            teams: total,
            ..GenerationStats::default()
        };
        for (done, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok((row_id, name, Ok(timeline))) => {
                    if let Some(progress) = &request.progress {
                        progress(done + 1, total, &name, "processed");
                    }
                    for programme in &timeline {
                        match programme.filler_type {
                            Some(crate::types::FillerType::Pregame) => stats.pregame_filler += 1,
                            Some(crate::types::FillerType::Postgame) => stats.postgame_filler += 1,
                            Some(crate::types::FillerType::Idle) => stats.idle_filler += 1,
                            None => stats.game_programmes += 1,
                        }
                    }
                    stats.programmes += timeline.len();
                    programmes.insert(row_id, timeline);
                }
                Ok((row_id, name, Err(e))) => {
                    // Per-team error isolation: log, leave the slot empty.
                    warn!("[EPG] Team {} failed: {:#}", name, e);
                    stats.failed_teams += 1;
                    programmes.insert(row_id, Vec::new());
                    if let Some(progress) = &request.progress {
                        progress(done + 1, total, &name, "failed");
                    }
                }
                Err(e) => {
                    warn!("[EPG] Team worker panicked: {}", e);
                    stats.failed_teams += 1;
                }
            }
        }

        stats.api_calls = self.api_calls.load(Ordering::Relaxed);
        stats.wall_time_ms = started.elapsed().as_millis();
        info!(
            "[EPG] Cycle complete: {} programmes ({} games, {} filler), {} api calls, {}ms",
            stats.programmes,
            stats.game_programmes,
            stats.pregame_filler + stats.postgame_filler + stats.idle_filler,
            stats.api_calls,
            stats.wall_time_ms
        );

        Ok(GenerationResult {
            teams,
            programmes,
            api_calls: stats.api_calls,
            stats,
        })
    }

    /// Cycle start: any game starting within the last `LOOKBACK_HOURS`
    /// wins (earliest such start); otherwise the previous hour boundary.
    async fn calculate_epg_start(&self, teams: &[TeamRow], days_ahead: u32) -> DateTime<Utc> {
        let now = Utc::now();
        let lookback = now - Duration::hours(LOOKBACK_HOURS);
        let mut earliest: Option<DateTime<Utc>> = None;

        for team in teams {
            self.count_api_call();
            let schedule = self
                .service
                .get_team_schedule(&team.config.team_id, &team.config.league, days_ahead)
                .await;
            for event in schedule {
                if event.start_time >= lookback && event.start_time <= now {
                    earliest = Some(match earliest {
                        Some(current) => current.min(event.start_time),
                        None => event.start_time,
                    });
                }
            }
        }

        match earliest {
            Some(start) => {
                debug!("[EPG] Lookback found in-progress game at {}", start);
                start
            }
            None => round_to_last_hour(now),
        }
    }

    /// The per-team pipeline.
    async fn process_team(
        &self,
        team: &TeamRow,
        days_ahead: u32,
        epg_start: DateTime<Utc>,
        settings: &AppSettings,
    ) -> Result<Vec<ProcessedProgramme>> {
        let config = &team.config;
        let now = Utc::now();

        // 1. League resolution: config is the source of truth.
        let (_, api_league) = league_config::api_path(&config.league);
        let is_soccer = league_config::is_soccer_league(&config.league);

        // 2. Identity and stats; backfill logo when the config lacks one.
        self.count_api_call();
        let team_info = self.service.get_team(&config.team_id, &api_league).await;
        self.count_api_call();
        let team_stats = self.service.get_team_stats(&config.team_id, &api_league).await;
        let mut config = config.clone();
        if config.logo_url.is_none() {
            config.logo_url = team_info.as_ref().and_then(|t| t.logo_url.clone());
        }

        // 3. Schedule: soccer merges every competition the team plays in.
        let leagues: Vec<String> = if is_soccer {
            let mut leagues = self
                .team_cache
                .leagues_for_team(&config.team_id, "espn", &config.sport)
                .await;
            for league in &team.soccer_leagues {
                if !leagues.contains(league) {
                    leagues.push(league.clone());
                }
            }
            if leagues.is_empty() {
                leagues.push(api_league.clone());
            }
            leagues
        } else {
            vec![api_league.clone()]
        };

        let mut schedule: Vec<Event> = Vec::new();
        for league in &leagues {
            self.count_api_call();
            let league_schedule = self
                .service
                .get_team_schedule(&config.team_id, league, days_ahead)
                .await;
            // First-writer-wins merge by event id across competitions.
            for event in league_schedule {
                if !schedule.iter().any(|e| e.id == event.id) {
                    schedule.push(event);
                }
            }
        }

        let window_end = epg_start + Duration::days(i64::from(days_ahead));
        let extended_start = now - Duration::days(EXTENDED_WINDOW_DAYS);
        let extended_end = now + Duration::days(EXTENDED_WINDOW_DAYS);

        let mut extended: Vec<Event> = schedule
            .iter()
            .filter(|e| e.start_time >= extended_start && e.start_time <= extended_end)
            .cloned()
            .collect();
        let mut window: Vec<EnrichedEvent> = schedule
            .into_iter()
            .filter(|e| e.start_time >= epg_start && e.start_time < window_end)
            .map(EnrichedEvent::bare)
            .collect();

        // 4. Unified scoreboard enrichment: merge live data in place,
        //    discover events the schedule endpoints missed.
        let tz = parse_tz(&settings.epg_timezone);
        let today = now.with_timezone(&tz).date_naive();
        let mut day = epg_start.with_timezone(&tz).date_naive();
        let last_day = (window_end - Duration::seconds(1)).with_timezone(&tz).date_naive();
        while day <= last_day {
            for league in &leagues {
                let scoreboard = self.scoreboard(league, day).await;
                for sb_event in scoreboard.iter() {
                    if !sb_event.event.involves_team(&config.team_id, &config.team_name) {
                        continue;
                    }
                    let is_today = day == today;
                    match window.iter().position(|e| e.event.id == sb_event.event.id) {
                        Some(index) => {
                            window[index] =
                                merge_scoreboard(&window[index].event, sb_event, is_today);
                        }
                        None => {
                            // Discovery: the schedule endpoint missed it.
                            if sb_event.event.start_time >= epg_start
                                && sb_event.event.start_time < window_end
                            {
                                debug!(
                                    "[EPG] Discovered {} for {} via scoreboard",
                                    sb_event.event.id, config.team_name
                                );
                                let mut discovered = sb_event.clone();
                                if !is_today {
                                    discovered.has_odds = false;
                                    discovered.odds_favorite = None;
                                    discovered.odds_spread = None;
                                    discovered.odds_over_under = None;
                                }
                                window.push(discovered);
                            }
                        }
                    }
                    if !extended.iter().any(|e| e.id == sb_event.event.id) {
                        extended.push(sb_event.event.clone());
                    }
                }
            }
            day = day + chrono::Days::new(1);
        }

        // 5. Final scores for recent past events.
        self.enrich_past_events(&mut extended, &leagues, now, tz).await;

        window.sort_by_key(|e| e.event.start_time);
        extended.sort_by_key(|e| e.start_time);

        // 6-7. Per-event contexts and programme resolution.
        let mut timeline: Vec<ProcessedProgramme> = Vec::new();
        let head_coach = self
            .service
            .get_head_coach(&config.team_id, &api_league)
            .await;

        let duration_hours = settings.game_duration_hours(&config.league);
        let mut window_spans: Vec<GameSpan> = Vec::new();

        for event in &window {
            let Some(template_ctx) = self
                .build_template_context(
                    &config,
                    team_stats.clone(),
                    event.clone(),
                    &extended,
                    head_coach.clone(),
                    settings,
                    now,
                )
                .await
            else {
                continue;
            };
            let programme = self.resolve_programme(
                &template_ctx,
                event,
                &team.templates,
                duration_hours,
            );
            if let Some(game_ctx) = template_ctx.game.clone() {
                window_spans.push(GameSpan {
                    start: programme.start_datetime,
                    end: programme.end_datetime,
                    context: game_ctx,
                });
            }
            timeline.push(programme);
        }

        // 8. Filler across the whole window.
        let extended_spans = self
            .build_extended_spans(&config, team_stats.clone(), &extended, duration_hours)
            .await;
        let filler = FillerGenerator::new(&self.resolver).generate(&FillerInputs {
            team_config: &config,
            team_stats: team_stats.as_ref(),
            window_games: &window_spans,
            extended_games: &extended_spans,
            days_ahead,
            epg_start,
            epg_timezone: settings.epg_timezone.clone(),
            time_format: settings.time_format,
            show_timezone: settings.show_timezone,
            midnight_mode: settings.midnight_crossover_mode,
            templates: &team.templates.filler,
            now,
        });
        timeline.extend(filler);

        // 9. Final ordering.
        timeline.sort_by_key(|p| p.start_datetime);
        Ok(timeline)
    }

    /// Scoreboard-backfill final scores for extended events in the last
    /// week that still look unfinished.
    async fn enrich_past_events(
        &self,
        extended: &mut [Event],
        leagues: &[String],
        now: DateTime<Utc>,
        tz: chrono_tz::Tz,
    ) {
        let cutoff = now - Duration::days(PAST_ENRICH_DAYS);
        let needs_scores: Vec<NaiveDate> = extended
            .iter()
            .filter(|e| {
                e.start_time >= cutoff
                    && e.start_time < now
                    && (e.home_score.is_none() || !e.status.is_final())
            })
            .map(|e| e.start_time.with_timezone(&tz).date_naive())
            .collect();
        let mut days: Vec<NaiveDate> = needs_scores;
        days.sort();
        days.dedup();

        for day in days {
            for league in leagues {
                let scoreboard = self.scoreboard(league, day).await;
                for sb_event in scoreboard.iter() {
                    if let Some(existing) =
                        extended.iter_mut().find(|e| e.id == sb_event.event.id)
                    {
                        if sb_event.event.status.is_final() {
                            existing.home_score = sb_event.event.home_score;
                            existing.away_score = sb_event.event.away_score;
                            existing.status = sb_event.event.status.clone();
                        }
                    }
                }
            }
        }
    }

    /// Build the template context for one window event: current, next,
    /// and last game contexts walked relative to the event's date.
    #[allow(clippy::too_many_arguments)]
    async fn build_template_context(
        &self,
        config: &crate::types::TeamConfig,
        team_stats: Option<crate::types::TeamStats>,
        event: EnrichedEvent,
        extended: &[Event],
        head_coach: Option<String>,
        settings: &AppSettings,
        now: DateTime<Utc>,
    ) -> Option<TemplateContext> {
        let anchor = event.event.start_time;
        let current = self
            .full_game_context(config, team_stats.clone(), event, extended, head_coach.clone())
            .await?;

        let (next_event, last_event) = neighbors(extended, anchor);
        let next_game = match next_event {
            Some(next) => {
                // Next context is itself scoreboard-enriched for odds.
                let enriched = self.enrich_single(next, settings, now).await;
                self.full_game_context(
                    config,
                    team_stats.clone(),
                    enriched,
                    extended,
                    head_coach.clone(),
                )
                .await
            }
            None => None,
        };
        let last_game = match last_event {
            Some(last) => {
                let mut ctx = self
                    .full_game_context(
                        config,
                        team_stats.clone(),
                        EnrichedEvent::bare(last.clone()),
                        extended,
                        head_coach.clone(),
                    )
                    .await;
                // Leaders only exist for completed games.
                if last.status.is_final() {
                    if let Some(ctx) = ctx.as_mut() {
                        self.count_api_call();
                        ctx.player_leaders = self
                            .service
                            .get_player_leaders(&last.id, &config.team_id, &last.league)
                            .await;
                    }
                }
                ctx
            }
            None => None,
        };

        Some(TemplateContext {
            team_config: config.clone(),
            team_stats,
            game: Some(current),
            next_game,
            last_game,
            epg_timezone: settings.epg_timezone.clone(),
            time_format: settings.time_format,
            show_timezone: settings.show_timezone,
            now,
        })
    }

    /// Scoreboard-enrich a single event when its day is cached; odds only
    /// apply for today.
    async fn enrich_single(
        &self,
        event: &Event,
        settings: &AppSettings,
        now: DateTime<Utc>,
    ) -> EnrichedEvent {
        let tz = parse_tz(&settings.epg_timezone);
        let day = event.start_time.with_timezone(&tz).date_naive();
        let today = now.with_timezone(&tz).date_naive();
        let scoreboard = self.scoreboard(&event.league, day).await;
        match scoreboard.iter().find(|sb| sb.event.id == event.id) {
            Some(sb_event) => merge_scoreboard(event, sb_event, day == today),
            None => EnrichedEvent::bare(event.clone()),
        }
    }

    /// Assemble one game context with opponent stats, h2h, and streaks.
    async fn full_game_context(
        &self,
        config: &crate::types::TeamConfig,
        team_stats: Option<crate::types::TeamStats>,
        event: EnrichedEvent,
        extended: &[Event],
        head_coach: Option<String>,
    ) -> Option<GameContext> {
        let anchor = event.event.start_time;
        let (_, _, opponent) = crate::epg::context::determine_home_away(
            &event.event,
            &config.team_id,
            &config.team_name,
        )?;
        let opponent = opponent.clone();

        let opponent_stats = if opponent.id.is_empty() || event.event.is_tournament() {
            None
        } else {
            self.count_api_call();
            self.service
                .get_team_stats(&opponent.id, &event.event.league)
                .await
        };
        let h2h = calculate_h2h(
            &config.team_id,
            &config.team_name,
            &opponent.id,
            &opponent.name,
            extended,
            anchor,
        );
        let streaks = calculate_streaks(
            &config.team_id,
            &config.team_name,
            &config.league,
            extended,
            anchor,
        );

        build_game_context(
            event,
            &config.team_id,
            &config.team_name,
            team_stats,
            opponent_stats,
            Some(h2h),
            Some(streaks),
            head_coach,
            None,
        )
    }

    /// Resolve one game programme: title, subtitle, conditional
    /// description, art, status, and the variable snapshot.
    fn resolve_programme(
        &self,
        ctx: &TemplateContext,
        event: &EnrichedEvent,
        templates: &crate::db::teams::TeamTemplates,
        duration_hours: f64,
    ) -> ProcessedProgramme {
        let title_template = if templates.title.is_empty() {
            "{matchup}"
        } else {
            templates.title.as_str()
        };
        let title = self.resolver.resolve(title_template, ctx);
        let subtitle = templates
            .subtitle
            .as_deref()
            .map(|t| self.resolver.resolve(t, ctx))
            .filter(|s| !s.is_empty());
        let description_template = select_description(&templates.description_options, ctx);
        let description = if description_template.is_empty() {
            None
        } else {
            Some(self.resolver.resolve(&description_template, ctx))
        };
        let art = templates
            .art_url
            .as_deref()
            .map(|t| self.resolver.resolve(t, ctx))
            .filter(|s| !s.is_empty());

        let status = match event.event.status.state {
            EventState::Live => ProgrammeStatus::InProgress,
            EventState::Final => ProgrammeStatus::Final,
            _ => ProgrammeStatus::Scheduled,
        };

        let vars = self.resolver.build_variables(ctx);
        let vars_json = serde_json::to_value(
            vars.into_iter().collect::<std::collections::BTreeMap<_, _>>(),
        )
        .unwrap_or(serde_json::Value::Null);

        let start = event.event.start_time;
        let end = start + Duration::seconds((duration_hours * 3600.0) as i64);

        ProcessedProgramme {
            start_datetime: start,
            end_datetime: end,
            title,
            subtitle,
            description,
            program_art_url: art,
            status,
            template_vars: vars_json,
            event_id: Some(event.event.id.clone()),
            is_filler: false,
            filler_type: None,
        }
    }

    /// Game spans for the extended schedule, used by filler next/last
    /// lookups. Contexts here are lighter: no opponent-stats fetches.
    async fn build_extended_spans(
        &self,
        config: &crate::types::TeamConfig,
        team_stats: Option<crate::types::TeamStats>,
        extended: &[Event],
        duration_hours: f64,
    ) -> Vec<GameSpan> {
        let mut spans = Vec::with_capacity(extended.len());
        for event in extended {
            let Some(context) = build_game_context(
                EnrichedEvent::bare(event.clone()),
                &config.team_id,
                &config.team_name,
                team_stats.clone(),
                None,
                None,
                None,
                None,
                None,
            ) else {
                continue;
            };
            let start = event.start_time;
            spans.push(GameSpan {
                start,
                end: start + Duration::seconds((duration_hours * 3600.0) as i64),
                context,
            });
        }
        spans
    }
}

/// Merge scoreboard data into a schedule event, build-then-freeze: the
/// result is a fresh enriched value, the inputs stay untouched.
///
/// Broadcasts replace only when the scoreboard has them; the odds flag is
/// set only for today's games.
pub fn merge_scoreboard(base: &Event, scoreboard: &EnrichedEvent, is_today: bool) -> EnrichedEvent {
    let sb = &scoreboard.event;
    let mut merged = base.clone();
    merged.status = sb.status.clone();
    if sb.home_score.is_some() {
        merged.home_score = sb.home_score;
    }
    if sb.away_score.is_some() {
        merged.away_score = sb.away_score;
    }
    if !sb.broadcasts.is_empty() {
        merged.broadcasts = sb.broadcasts.clone();
    }
    if merged.venue.is_none() {
        merged.venue = sb.venue.clone();
    }
    if merged.season_type.is_none() {
        merged.season_type = sb.season_type;
    }
    if sb.main_card_start.is_some() {
        merged.main_card_start = sb.main_card_start;
    }

    let has_odds = is_today && scoreboard.has_odds;
    EnrichedEvent {
        event: merged,
        has_odds,
        odds_favorite: has_odds.then(|| scoreboard.odds_favorite.clone()).flatten(),
        odds_spread: has_odds.then(|| scoreboard.odds_spread.clone()).flatten(),
        odds_over_under: has_odds
            .then(|| scoreboard.odds_over_under.clone())
            .flatten(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventStatus, Team, Venue};
    use chrono::TimeZone;

    fn team(id: &str, name: &str) -> Team {
        Team {
            id: id.to_string(),
            provider: "espn".to_string(),
            name: name.to_string(),
            short_name: name.to_string(),
            abbreviation: String::new(),
            league: "nba".to_string(),
            sport: "basketball".to_string(),
            logo_url: None,
            color: None,
        }
    }

    fn base_event() -> Event {
        Event {
            id: "401".to_string(),
            provider: "espn".to_string(),
            name: "Game".to_string(),
            short_name: "G".to_string(),
            start_time: Utc.with_ymd_and_hms(2026, 2, 11, 19, 0, 0).unwrap(),
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
        }
    }

    fn scoreboard_event() -> EnrichedEvent {
        let mut event = base_event();
        event.status.state = EventState::Live;
        event.home_score = Some(55);
        event.away_score = Some(48);
        event.broadcasts = vec!["ESPN".to_string()];
        event.venue = Some(Venue {
            name: "LCA".to_string(),
            city: None,
            state: None,
            country: None,
        });
        EnrichedEvent {
            event,
            has_odds: true,
            odds_favorite: Some("DET".to_string()),
            odds_spread: Some("DET -3.5".to_string()),
            odds_over_under: Some("221.5".to_string()),
        }
    }

    #[test]
    fn test_merge_scoreboard_today_carries_odds() {
        let base = base_event();
        let merged = merge_scoreboard(&base, &scoreboard_event(), true);
        assert_eq!(merged.event.home_score, Some(55));
        assert_eq!(merged.event.status.state, EventState::Live);
        assert_eq!(merged.event.broadcasts, vec!["ESPN".to_string()]);
        assert!(merged.has_odds);
        assert_eq!(merged.odds_spread.as_deref(), Some("DET -3.5"));
        // Build-then-freeze: the input event is untouched.
        assert_eq!(base.home_score, None);
    }

    #[test]
    fn test_merge_scoreboard_future_day_drops_odds() {
        let base = base_event();
        let merged = merge_scoreboard(&base, &scoreboard_event(), false);
        assert!(!merged.has_odds);
        assert!(merged.odds_spread.is_none());
        // Live data still merges.
        assert_eq!(merged.event.home_score, Some(55));
    }

    #[test]
    fn test_merge_keeps_base_broadcasts_when_scoreboard_empty() {
        let mut base = base_event();
        base.broadcasts = vec!["FanDuel SN".to_string()];
        let mut sb = scoreboard_event();
        sb.event.broadcasts.clear();
        let merged = merge_scoreboard(&base, &sb, true);
        assert_eq!(merged.event.broadcasts, vec!["FanDuel SN".to_string()]);
    }

    #[test]
    fn test_request_clamps_days_ahead() {
        let request = GenerationRequest::new(30, AppSettings::default());
        assert_eq!(request.days_ahead, 14);
        let request = GenerationRequest::new(0, AppSettings::default());
        assert_eq!(request.days_ahead, 1);
    }

    mod generation {
        use super::*;
        use crate::cache::PersistentTtlCache;
        use crate::db::test_pool;
        use crate::providers::SportsProvider;
        use crate::team_cache::TeamLeagueCache;
        use crate::types::TeamStats;
        use anyhow::Result as AnyResult;
        use async_trait::async_trait;

        fn soccer_team(id: &str, name: &str, league: &str) -> Team {
            Team {
                id: id.to_string(),
                provider: "espn".to_string(),
                name: name.to_string(),
                short_name: name.to_string(),
                abbreviation: name[..3.min(name.len())].to_uppercase(),
                league: league.to_string(),
                sport: "soccer".to_string(),
                logo_url: None,
                color: None,
            }
        }

        /// The league schedule endpoint knows nothing about future
        /// fixtures; only the Champions League scoreboard does.
        struct SoccerStub {
            fixture_day: chrono::NaiveDate,
            fixture: EnrichedEvent,
        }

        #[async_trait]
        impl SportsProvider for SoccerStub {
            fn name(&self) -> &str {
                "stub"
            }
            fn supports_league(&self, league: &str) -> bool {
                league == "eng.1" || league == "uefa.champions"
            }
            async fn get_events(
                &self,
                league: &str,
                date: chrono::NaiveDate,
            ) -> AnyResult<Vec<EnrichedEvent>> {
                if league == "uefa.champions" && date == self.fixture_day {
                    Ok(vec![self.fixture.clone()])
                } else {
                    Ok(Vec::new())
                }
            }
            async fn get_team_schedule(&self, _: &str, _: &str, _: u32) -> AnyResult<Vec<Event>> {
                Ok(Vec::new())
            }
            async fn get_team(&self, _: &str, _: &str) -> AnyResult<Option<Team>> {
                Ok(Some(soccer_team("364", "Liverpool", "eng.1")))
            }
            async fn get_event(&self, _: &str, _: &str) -> AnyResult<Option<Event>> {
                Ok(None)
            }
            async fn get_team_stats(&self, _: &str, _: &str) -> AnyResult<Option<TeamStats>> {
                Ok(None)
            }
        }

        #[tokio::test]
        async fn test_soccer_scoreboard_discovery_populates_window() {
            let pool = test_pool().await;
            sqlx::query(
                "INSERT INTO teams
                 (team_id, league, sport, team_name, team_abbrev, soccer_leagues,
                  soccer_primary_league)
                 VALUES ('364', 'eng.1', 'soccer', 'Liverpool', 'LIV',
                         '[\"eng.1\", \"uefa.champions\"]', 'eng.1')",
            )
            .execute(&pool)
            .await
            .unwrap();

            let epg_start = crate::tz::round_to_last_hour(Utc::now());
            let fixture_start = epg_start + Duration::days(3) + Duration::hours(5);
            let fixture_day = fixture_start.date_naive();
            let mut fixture = EnrichedEvent::bare(Event {
                id: "ucl-1".to_string(),
                provider: "espn".to_string(),
                name: "Liverpool vs Real Madrid".to_string(),
                short_name: "LIV vs RMA".to_string(),
                start_time: fixture_start,
                home_team: soccer_team("364", "Liverpool", "uefa.champions"),
                away_team: soccer_team("86", "Real Madrid", "uefa.champions"),
                status: EventStatus::scheduled(),
                league: "uefa.champions".to_string(),
                sport: "soccer".to_string(),
                home_score: None,
                away_score: None,
                venue: None,
                broadcasts: vec![],
                season_year: None,
                season_type: None,
                main_card_start: None,
            });
            fixture.has_odds = true;
            fixture.odds_spread = Some("LIV -0.5".to_string());

            let provider = Arc::new(SoccerStub {
                fixture_day,
                fixture,
            });
            let service = SportsDataService::new(
                vec![provider],
                PersistentTtlCache::new(pool.clone()),
            );
            let orchestrator = Arc::new(EpgOrchestrator::new(
                pool.clone(),
                service,
                TeamLeagueCache::new(pool.clone()),
                Arc::new(TemplateResolver::new()),
            ));

            let mut request = GenerationRequest::new(7, AppSettings::default());
            request.start_datetime = Some(epg_start);
            let result = orchestrator.generate(request).await.unwrap();

            assert_eq!(result.stats.failed_teams, 0);
            let timeline = result.programmes.values().next().unwrap();
            // Scoreboard discovery inserted the fixture the schedule
            // endpoints never returned.
            let game = timeline
                .iter()
                .find(|p| p.event_id.as_deref() == Some("ucl-1"))
                .expect("discovered fixture becomes a programme");
            assert!(!game.is_filler);
            // Source league flows through to the soccer variables.
            assert_eq!(
                game.template_vars["soccer_match_league_code"],
                "uefa.champions"
            );
            // Timeline stays monotonic with non-overlapping programmes.
            for pair in timeline.windows(2) {
                assert!(pair[0].start_datetime <= pair[1].start_datetime);
            }
        }
    }
}
