//! Event group processing.
//!
//! A group bundles IPTV streams scoped to one or more leagues. The
//! per-group pipeline: list streams from the stream source, filter by
//! M3U group and staleness, classify and match each stream against the
//! group's league-scoped events, cluster streams by event, and render
//! per-event EPG programmes (game plus simple pregame/postgame filler).

use crate::filler::time_blocks::chunk_range;
use crate::matching::{LeagueScope, StreamMatch, TeamMatcher};
use crate::service::SportsDataService;
use crate::team_cache::TeamLeagueCache;
use crate::templates::TemplateResolver;
use crate::types::{
    EnrichedEvent, Event, FillerType, ProcessedProgramme, ProgrammeStatus, TeamConfig,
    TemplateContext, TimeFormat,
};
use crate::tz::parse_tz;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Group league-scoping mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupMode {
    /// One configured league; search never leaves it.
    #[default]
    Single,
    /// Search all known leagues, filter matches to the configured set.
    Multi,
}

/// One configured event EPG group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventGroup {
    pub id: i64,
    pub name: String,
    pub mode: GroupMode,
    pub leagues: Vec<String>,
    /// Streams are filtered to this M3U channel group.
    pub m3u_group: Option<String>,
    /// Child groups inherit their parent's resolved scope.
    pub resolved_leagues: Option<Vec<String>>,
    pub channel_start_number: Option<u32>,
}

/// A stream row from the stream source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStream {
    pub id: i64,
    pub name: String,
    pub channel_group: Option<String>,
    pub m3u_account_id: Option<i64>,
    pub m3u_account_name: Option<String>,
    #[serde(default)]
    pub is_stale: bool,
}

/// Streams clustered under the event they matched.
#[derive(Debug, Clone)]
pub struct EventCluster {
    pub event: EnrichedEvent,
    pub streams: Vec<(SourceStream, StreamMatch)>,
}

/// Per-group matching pipeline.
pub struct GroupProcessor<'a> {
    service: &'a SportsDataService,
    team_cache: &'a TeamLeagueCache,
    matcher: &'a TeamMatcher,
}

impl<'a> GroupProcessor<'a> {
    pub fn new(
        service: &'a SportsDataService,
        team_cache: &'a TeamLeagueCache,
        matcher: &'a TeamMatcher,
    ) -> Self {
        Self {
            service,
            team_cache,
            matcher,
        }
    }

    /// Effective league scope for a group.
    ///
    /// Single-mode restricts search to the one configured league - the
    /// hard requirement that avoids cross-league false-positive fanout.
    /// A child with `resolved_leagues` uses those as its single-mode
    /// scope. Multi-mode searches everything and filters matches to the
    /// group's expanded league set.
    pub async fn league_scope(&self, group: &EventGroup) -> LeagueScope {
        if let Some(resolved) = &group.resolved_leagues {
            if !resolved.is_empty() {
                return LeagueScope::resolved(resolved.clone());
            }
        }
        match group.mode {
            GroupMode::Single => match group.leagues.first() {
                Some(league) => LeagueScope::single(league),
                None => LeagueScope::default(),
            },
            GroupMode::Multi => {
                let include = self.team_cache.expand_leagues(&group.leagues).await;
                LeagueScope::multi(include)
            }
        }
    }

    /// Candidate events for the active day across the searched leagues.
    async fn candidate_events(
        &self,
        scope: &LeagueScope,
        date: NaiveDate,
    ) -> Vec<EnrichedEvent> {
        let leagues = if scope.search_leagues.is_empty() {
            // Multi-mode: every league any configured group could match.
            scope.include_leagues.clone()
        } else {
            scope.search_leagues.clone()
        };
        let mut events = Vec::new();
        for league in &leagues {
            for event in self.service.get_events(league, date).await {
                if !events
                    .iter()
                    .any(|existing: &EnrichedEvent| existing.event.id == event.event.id)
                {
                    events.push(event);
                }
            }
        }
        events
    }

    /// Match a group's streams against the day's events and cluster by
    /// event.
    pub async fn process(
        &self,
        group: &EventGroup,
        streams: &[SourceStream],
        date: NaiveDate,
    ) -> Vec<EventCluster> {
        let scope = self.league_scope(group).await;
        let candidates = self.candidate_events(&scope, date).await;
        if candidates.is_empty() {
            return Vec::new();
        }
        let plain_events: Vec<Event> = candidates.iter().map(|e| e.event.clone()).collect();

        let mut clusters: Vec<EventCluster> = Vec::new();
        for stream in streams {
            if stream.is_stale {
                continue;
            }
            if let Some(wanted) = &group.m3u_group {
                if stream.channel_group.as_deref() != Some(wanted.as_str()) {
                    continue;
                }
            }
            let Some(matched) = self
                .matcher
                .match_stream(&stream.name, date, &plain_events, &scope)
            else {
                debug!("[GROUPS] No match for stream '{}'", stream.name);
                continue;
            };
            let Some(event) = candidates
                .iter()
                .find(|e| e.event.id == matched.event_id)
            else {
                continue;
            };
            match clusters
                .iter()
                .position(|c| c.event.event.id == matched.event_id)
            {
                Some(index) => clusters[index].streams.push((stream.clone(), matched)),
                None => clusters.push(EventCluster {
                    event: event.clone(),
                    streams: vec![(stream.clone(), matched)],
                }),
            }
        }

        info!(
            "[GROUPS] {}: {} streams clustered into {} events",
            group.name,
            clusters.iter().map(|c| c.streams.len()).sum::<usize>(),
            clusters.len()
        );
        clusters
    }
}

/// Render the EPG for one event channel: block-aligned pregame, the game
/// itself, and postgame to the end of the channel window.
#[allow(clippy::too_many_arguments)]
pub fn render_event_channel_epg(
    resolver: &TemplateResolver,
    cluster: &EventCluster,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    duration_hours: f64,
    epg_timezone: &str,
    time_format: TimeFormat,
    show_timezone: bool,
) -> Vec<ProcessedProgramme> {
    let tz = parse_tz(epg_timezone);
    let event = &cluster.event;
    let start = event.event.start_time;
    let end = start + Duration::seconds((duration_hours * 3600.0) as i64);

    // Event channels render against a synthetic home-side config.
    let config = TeamConfig {
        team_id: event.event.home_team.id.clone(),
        league: event.event.league.clone(),
        sport: event.event.sport.clone(),
        team_name: event.event.home_team.name.clone(),
        team_abbrev: event.event.home_team.abbreviation.clone(),
        logo_url: event.event.home_team.logo_url.clone(),
        channel_number: None,
        soccer_primary_league: None,
        soccer_primary_league_id: None,
        pregame_enabled: true,
        postgame_enabled: true,
        idle_enabled: false,
    };
    let game_ctx = crate::epg::context::build_game_context(
        event.clone(),
        &config.team_id,
        &config.team_name,
        None,
        None,
        None,
        None,
        None,
        None,
    );
    let ctx = TemplateContext {
        team_config: config,
        team_stats: None,
        game: game_ctx.clone(),
        next_game: game_ctx.clone(),
        last_game: game_ctx,
        epg_timezone: epg_timezone.to_string(),
        time_format,
        show_timezone,
        now: window_start,
    };

    let title = if event.event.name.is_empty() {
        resolver.resolve("{matchup}", &ctx)
    } else {
        event.event.name.clone()
    };
    let vars = resolver.build_variables(&ctx);
    let vars_json = serde_json::to_value(
        vars.into_iter().collect::<std::collections::BTreeMap<_, _>>(),
    )
    .unwrap_or(serde_json::Value::Null);

    let mut programmes = Vec::new();
    for (chunk_start, chunk_end) in chunk_range(window_start, start.min(window_end), tz) {
        programmes.push(ProcessedProgramme {
            start_datetime: chunk_start,
            end_datetime: chunk_end,
            title: format!("{title} - Pregame"),
            subtitle: None,
            description: None,
            program_art_url: None,
            status: ProgrammeStatus::Filler,
            template_vars: vars_json.clone(),
            event_id: Some(event.event.id.clone()),
            is_filler: true,
            filler_type: Some(FillerType::Pregame),
        });
    }
    programmes.push(ProcessedProgramme {
        start_datetime: start,
        end_datetime: end,
        title: title.clone(),
        subtitle: None,
        description: None,
        program_art_url: None,
        status: match event.event.status.state {
            crate::types::EventState::Live => ProgrammeStatus::InProgress,
            crate::types::EventState::Final => ProgrammeStatus::Final,
            _ => ProgrammeStatus::Scheduled,
        },
        template_vars: vars_json.clone(),
        event_id: Some(event.event.id.clone()),
        is_filler: false,
        filler_type: None,
    });
    for (chunk_start, chunk_end) in chunk_range(end.max(window_start), window_end, tz) {
        programmes.push(ProcessedProgramme {
            start_datetime: chunk_start,
            end_datetime: chunk_end,
            title: format!("{title} - Postgame"),
            subtitle: None,
            description: None,
            program_art_url: None,
            status: ProgrammeStatus::Filler,
            template_vars: vars_json.clone(),
            event_id: Some(event.event.id.clone()),
            is_filler: true,
            filler_type: Some(FillerType::Postgame),
        });
    }
    programmes
}
