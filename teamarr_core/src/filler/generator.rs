//! Filler generator: pregame, postgame, and idle programmes around games.
//!
//! Walks each day of the EPG window. Days with games get pregame up to
//! the first start and postgame after the last end; empty days fill with
//! idle blocks. A game crossing midnight either hands off to the next
//! day's pregame (when that day has games) or follows the configured
//! midnight-crossover mode, and the previous day's overlap suppresses
//! today's pregame/idle so coverage never doubles.
//!
//! The generator is synchronous and pure: contexts (including the
//! scoreboard-enriched `.last` game) are prepared by the orchestrator
//! before this runs.

use super::time_blocks::chunk_range;
use super::{
    FillerTemplate, FillerTemplates, MidnightCrossoverMode, OFFSEASON_LOOKAHEAD_DAYS,
};
use crate::templates::TemplateResolver;
use crate::types::{
    FillerType, GameContext, ProcessedProgramme, ProgrammeStatus, TeamConfig, TeamStats,
    TemplateContext, TimeFormat,
};
use crate::tz::parse_tz;
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// One game occupying guide time: its slot plus the full rendering
/// context for the event.
#[derive(Debug, Clone)]
pub struct GameSpan {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub context: GameContext,
}

/// Everything the generator needs for one team's window.
pub struct FillerInputs<'a> {
    pub team_config: &'a TeamConfig,
    pub team_stats: Option<&'a TeamStats>,
    /// Games inside the EPG window, sorted by start.
    pub window_games: &'a [GameSpan],
    /// Games beyond the window (60-day extended fetch) for `.next`/`.last`
    /// context. Superset of `window_games`.
    pub extended_games: &'a [GameSpan],
    pub days_ahead: u32,
    pub epg_start: DateTime<Utc>,
    pub epg_timezone: String,
    pub time_format: TimeFormat,
    pub show_timezone: bool,
    pub midnight_mode: MidnightCrossoverMode,
    pub templates: &'a FillerTemplates,
    pub now: DateTime<Utc>,
}

/// Generates block-aligned filler for one team.
pub struct FillerGenerator<'r> {
    resolver: &'r TemplateResolver,
}

impl<'r> FillerGenerator<'r> {
    pub fn new(resolver: &'r TemplateResolver) -> Self {
        Self { resolver }
    }

    /// Generate all filler programmes for the window.
    pub fn generate(&self, inputs: &FillerInputs<'_>) -> Vec<ProcessedProgramme> {
        let tz = parse_tz(&inputs.epg_timezone);
        let mut entries = Vec::new();

        let first_day_start = inputs.epg_start;
        let start_date = first_day_start.with_timezone(&tz).date_naive();
        let end_date = start_date + chrono::Days::new(u64::from(inputs.days_ahead.max(1)) - 1);
        // The window's hard stop: 23:59:59 local on the final day.
        let window_end = day_start_utc(end_date + chrono::Days::new(1), tz) - chrono::Duration::seconds(1);

        let mut current_date = start_date;
        while current_date <= end_date {
            let day_start = if current_date == start_date {
                first_day_start
            } else {
                day_start_utc(current_date, tz)
            };
            let day_end = day_start_utc(current_date + chrono::Days::new(1), tz).min(window_end);

            let games_today = games_on(inputs.window_games, current_date, tz);
            let prev_overlap = previous_day_overlap(inputs.window_games, current_date, day_start, tz);

            if !games_today.is_empty() {
                self.fill_game_day(
                    inputs,
                    tz,
                    &games_today,
                    current_date,
                    day_start,
                    day_end,
                    window_end,
                    prev_overlap,
                    &mut entries,
                );
            } else if !prev_overlap && inputs.team_config.idle_enabled {
                let next_game = find_next_game(inputs.extended_games, day_start);
                let last_game = find_last_started_game(inputs.extended_games, day_end);
                entries.extend(self.render_chunks(
                    inputs,
                    tz,
                    day_start,
                    day_end,
                    FillerType::Idle,
                    None,
                    next_game,
                    last_game,
                ));
            }

            current_date = current_date + chrono::Days::new(1);
        }

        entries
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_game_day(
        &self,
        inputs: &FillerInputs<'_>,
        tz: Tz,
        games_today: &[&GameSpan],
        current_date: NaiveDate,
        day_start: DateTime<Utc>,
        day_end: DateTime<Utc>,
        window_end: DateTime<Utc>,
        prev_overlap: bool,
        entries: &mut Vec<ProcessedProgramme>,
    ) {
        let first_game = games_today[0];
        let last_game_today = games_today[games_today.len() - 1];

        // Pregame: day start to first game, unless yesterday's game
        // already covers the morning.
        if inputs.team_config.pregame_enabled && !prev_overlap && day_start < first_game.start {
            let last_started = find_last_started_game(inputs.extended_games, first_game.start);
            entries.extend(self.render_chunks(
                inputs,
                tz,
                day_start,
                first_game.start,
                FillerType::Pregame,
                Some(&first_game.context),
                Some(&first_game.context),
                last_started,
            ));
        }

        if !inputs.team_config.postgame_enabled {
            return;
        }

        let last_end = last_game_today.end;
        if last_end > day_end {
            // Game crosses midnight.
            let next_date = current_date + chrono::Days::new(1);
            let next_day_games = games_on(inputs.window_games, next_date, tz);
            if let Some(next_game) = next_day_games.first() {
                // Next day has a game: bridge with pregame for it.
                if last_end < next_game.start {
                    entries.extend(self.render_chunks(
                        inputs,
                        tz,
                        last_end,
                        next_game.start,
                        FillerType::Pregame,
                        Some(&next_game.context),
                        Some(&next_game.context),
                        Some(&last_game_today.context),
                    ));
                }
            } else {
                // Empty next day: midnight crossover mode decides.
                let next_day_end =
                    day_start_utc(next_date + chrono::Days::new(1), tz).min(window_end);
                let next_game = find_next_game(inputs.extended_games, last_end);
                match inputs.midnight_mode {
                    MidnightCrossoverMode::Postgame => {
                        entries.extend(self.render_chunks(
                            inputs,
                            tz,
                            last_end,
                            next_day_end,
                            FillerType::Postgame,
                            Some(&last_game_today.context),
                            next_game,
                            Some(&last_game_today.context),
                        ));
                    }
                    MidnightCrossoverMode::Idle => {
                        if inputs.team_config.idle_enabled {
                            entries.extend(self.render_chunks(
                                inputs,
                                tz,
                                last_end,
                                next_day_end,
                                FillerType::Idle,
                                None,
                                next_game,
                                Some(&last_game_today.context),
                            ));
                        }
                    }
                }
            }
        } else if last_end < day_end {
            // Game ends before midnight: postgame to day end.
            let next_game = find_next_game(inputs.extended_games, last_end);
            entries.extend(self.render_chunks(
                inputs,
                tz,
                last_end,
                day_end,
                FillerType::Postgame,
                Some(&last_game_today.context),
                next_game,
                Some(&last_game_today.context),
            ));
        }
    }

    /// Chunk a span and resolve the filler template once per chunk.
    #[allow(clippy::too_many_arguments)]
    fn render_chunks(
        &self,
        inputs: &FillerInputs<'_>,
        tz: Tz,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        filler_type: FillerType,
        game: Option<&GameContext>,
        next_game: Option<&GameContext>,
        last_game: Option<&GameContext>,
    ) -> Vec<ProcessedProgramme> {
        let template = self.pick_template(inputs, filler_type, next_game, last_game);
        let ctx = TemplateContext {
            team_config: inputs.team_config.clone(),
            team_stats: inputs.team_stats.cloned(),
            game: game.cloned(),
            next_game: next_game.cloned(),
            last_game: last_game.cloned(),
            epg_timezone: inputs.epg_timezone.clone(),
            time_format: inputs.time_format,
            show_timezone: inputs.show_timezone,
            now: inputs.now,
        };

        let title = self.resolver.resolve(&template.title, &ctx);
        let description = self.resolver.resolve(&template.description, &ctx);
        let art = template
            .art_url
            .as_deref()
            .map(|a| self.resolver.resolve(a, &ctx))
            .filter(|a| !a.is_empty());
        let vars = self.resolver.build_variables(&ctx);
        let vars_json = serde_json::to_value(
            vars.into_iter().collect::<std::collections::BTreeMap<_, _>>(),
        )
        .unwrap_or(serde_json::Value::Null);

        chunk_range(start, end, tz)
            .into_iter()
            .map(|(chunk_start, chunk_end)| ProcessedProgramme {
                start_datetime: chunk_start,
                end_datetime: chunk_end,
                title: title.clone(),
                subtitle: None,
                description: (!description.is_empty()).then(|| description.clone()),
                program_art_url: art.clone(),
                status: ProgrammeStatus::Filler,
                template_vars: vars_json.clone(),
                event_id: None,
                is_filler: true,
                filler_type: Some(filler_type),
            })
            .collect()
    }

    /// Resolve the template for a chunk, honoring the conditional
    /// overrides: idle offseason, then final/not-final pairs.
    fn pick_template<'a>(
        &self,
        inputs: &'a FillerInputs<'_>,
        filler_type: FillerType,
        next_game: Option<&GameContext>,
        last_game: Option<&GameContext>,
    ) -> &'a FillerTemplate {
        let templates = inputs.templates;
        let last_is_final = last_game
            .map(|g| g.event.event.status.is_final())
            .unwrap_or(false);

        match filler_type {
            FillerType::Pregame => &templates.pregame,
            FillerType::Postgame => {
                if let Some(conditional) = &templates.postgame_conditional {
                    let pick = if last_is_final {
                        conditional.final_template.as_ref()
                    } else {
                        conditional.not_final_template.as_ref()
                    };
                    if let Some(template) = pick {
                        return template;
                    }
                }
                &templates.postgame
            }
            FillerType::Idle => {
                let offseason = match next_game {
                    None => true,
                    Some(game) => {
                        (game.event.event.start_time - inputs.now).num_days()
                            > OFFSEASON_LOOKAHEAD_DAYS
                    }
                };
                if offseason {
                    if let Some(template) = &templates.idle_offseason {
                        return template;
                    }
                }
                if let Some(conditional) = &templates.idle_conditional {
                    let pick = if last_is_final {
                        conditional.final_template.as_ref()
                    } else {
                        conditional.not_final_template.as_ref()
                    };
                    if let Some(template) = pick {
                        return template;
                    }
                }
                &templates.idle
            }
        }
    }
}

fn day_start_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    tz.with_ymd_and_hms(date.year(), date.month(), date.day(), 0, 0, 0)
        .single()
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|| {
            // DST gap at midnight: fall forward to 01:00.
            tz.with_ymd_and_hms(date.year(), date.month(), date.day(), 1, 0, 0)
                .single()
                .map(|d| d.with_timezone(&Utc))
                .expect("date resolvable in zone")
        })
}

fn games_on<'a>(games: &'a [GameSpan], date: NaiveDate, tz: Tz) -> Vec<&'a GameSpan> {
    let mut on_day: Vec<&GameSpan> = games
        .iter()
        .filter(|g| g.start.with_timezone(&tz).date_naive() == date)
        .collect();
    on_day.sort_by_key(|g| g.start);
    on_day
}

/// Whether the previous day's last game spills past this day's start.
fn previous_day_overlap(games: &[GameSpan], date: NaiveDate, day_start: DateTime<Utc>, tz: Tz) -> bool {
    let prev_date = date.pred_opt().unwrap_or(date);
    games_on(games, prev_date, tz)
        .last()
        .map_or(false, |g| g.end > day_start)
}

/// The next game starting at or after an instant.
fn find_next_game(games: &[GameSpan], after: DateTime<Utc>) -> Option<&GameContext> {
    games
        .iter()
        .filter(|g| g.start >= after)
        .min_by_key(|g| g.start)
        .map(|g| &g.context)
}

/// The most recent game whose start has passed, irrespective of
/// completion status; the resolver decides which final-only variables
/// actually surface.
fn find_last_started_game(games: &[GameSpan], before: DateTime<Utc>) -> Option<&GameContext> {
    games
        .iter()
        .filter(|g| g.start < before)
        .max_by_key(|g| g.start)
        .map(|g| &g.context)
}
