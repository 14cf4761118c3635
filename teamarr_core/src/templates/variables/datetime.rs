//! DateTime variables: game dates, times, relative time.
//!
//! All times convert to the user's configured timezone; clock style and
//! timezone abbreviation follow the user's display settings.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use super::{display_settings, event_of};
use crate::tz;
use chrono::{DateTime, Timelike, Utc};

fn start_time(game_ctx: Option<&crate::types::GameContext>) -> Option<DateTime<Utc>> {
    event_of(game_ctx).map(|e| e.event.start_time)
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "game_date",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            start_time(game_ctx)
                .map(|t| tz::format_date_long(t, display_settings(ctx).tz))
                .unwrap_or_default()
        },
        "Full game date ('Tuesday, December 10, 2024')",
        &[("NBA", "Tuesday, December 10, 2024")],
    );
    registry.register(
        "game_date_short",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            start_time(game_ctx)
                .map(|t| tz::format_date_short(t, display_settings(ctx).tz))
                .unwrap_or_default()
        },
        "Short game date ('Dec 10')",
        &[("NBA", "Dec 10")],
    );
    registry.register(
        "game_day",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            start_time(game_ctx)
                .map(|t| tz::format_weekday(t, display_settings(ctx).tz))
                .unwrap_or_default()
        },
        "Day of week ('Tuesday')",
        &[("NBA", "Tuesday")],
    );
    registry.register(
        "game_day_short",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            start_time(game_ctx)
                .map(|t| tz::format_weekday_short(t, display_settings(ctx).tz))
                .unwrap_or_default()
        },
        "Short day of week ('Tue')",
        &[("NBA", "Tue")],
    );
    registry.register(
        "game_time",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            start_time(game_ctx)
                .map(|t| tz::format_time_with_tz(t, &display_settings(ctx), true))
                .unwrap_or_default()
        },
        "Game time with timezone ('7:30 PM EST')",
        &[("NBA", "7:30 PM EST")],
    );
    registry.register(
        "game_time_short",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            start_time(game_ctx)
                .map(|t| tz::format_time_with_tz(t, &display_settings(ctx), false))
                .unwrap_or_default()
        },
        "Game time without timezone ('7:30 PM')",
        &[("NBA", "7:30 PM")],
    );
    registry.register(
        "today_tonight",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            start_time(game_ctx)
                .map(|t| {
                    let local = tz::to_user_tz(t, display_settings(ctx).tz);
                    if local.hour() >= 17 { "tonight" } else { "today" }.to_string()
                })
                .unwrap_or_default()
        },
        "'today' or 'tonight' based on 5pm cutoff",
        &[("NBA", "tonight")],
    );
    registry.register(
        "today_tonight_title",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            start_time(game_ctx)
                .map(|t| {
                    let local = tz::to_user_tz(t, display_settings(ctx).tz);
                    if local.hour() >= 17 { "Tonight" } else { "Today" }.to_string()
                })
                .unwrap_or_default()
        },
        "'Today' or 'Tonight' (title case)",
        &[("NBA", "Tonight")],
    );
    registry.register(
        "days_until",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            let Some(start) = start_time(game_ctx) else {
                return String::new();
            };
            let settings = display_settings(ctx);
            let game_day = tz::to_user_tz(start, settings.tz).date_naive();
            let today = tz::to_user_tz(ctx.now, settings.tz).date_naive();
            let days = (game_day - today).num_days().max(0);
            days.to_string()
        },
        "Days until game",
        &[("NBA", "3")],
    );
    registry.register(
        "hours_until",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            let Some(start) = start_time(game_ctx) else {
                return String::new();
            };
            let hours = (start - ctx.now).num_hours().max(0);
            hours.to_string()
        },
        "Hours until game",
        &[("NBA", "24")],
    );
    registry.register(
        "main_card_time",
        Category::DateTime,
        SuffixRules::All,
        |ctx, game_ctx| {
            event_of(game_ctx)
                .and_then(|e| e.event.main_card_start)
                .map(|t| tz::format_time(t, &display_settings(ctx)))
                .unwrap_or_default()
        },
        "Main card start time (combat sports)",
        &[("MMA", "10:00 PM EST")],
    );
}
