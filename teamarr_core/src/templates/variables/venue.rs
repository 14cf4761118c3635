//! Venue and home/away variables.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use super::event_of;
use crate::types::Venue;

fn venue(game_ctx: Option<&crate::types::GameContext>) -> Option<Venue> {
    event_of(game_ctx).and_then(|e| e.event.venue.clone())
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "venue",
        Category::Venue,
        SuffixRules::All,
        |_, game_ctx| venue(game_ctx).map(|v| v.name).unwrap_or_default(),
        "Venue name",
        &[("NBA", "Little Caesars Arena")],
    );
    registry.register(
        "venue_city",
        Category::Venue,
        SuffixRules::All,
        |_, game_ctx| {
            venue(game_ctx).and_then(|v| v.city).unwrap_or_default()
        },
        "Venue city",
        &[("NBA", "Detroit")],
    );
    registry.register(
        "venue_state",
        Category::Venue,
        SuffixRules::All,
        |_, game_ctx| {
            venue(game_ctx).and_then(|v| v.state).unwrap_or_default()
        },
        "Venue state/region",
        &[("NBA", "MI")],
    );
    registry.register(
        "venue_city_state",
        Category::Venue,
        SuffixRules::All,
        |_, game_ctx| {
            let Some(v) = venue(game_ctx) else {
                return String::new();
            };
            match (v.city, v.state) {
                (Some(city), Some(state)) => format!("{city}, {state}"),
                (Some(city), None) => city,
                (None, Some(state)) => state,
                (None, None) => String::new(),
            }
        },
        "Venue city and state ('Detroit, MI')",
        &[("NBA", "Detroit, MI")],
    );

    registry.register(
        "is_home",
        Category::HomeAway,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .map(|g| if g.is_home { "true" } else { "false" }.to_string())
                .unwrap_or_default()
        },
        "'true' when the configured team hosts",
        &[("NBA", "true")],
    );
    registry.register(
        "home_away",
        Category::HomeAway,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .map(|g| if g.is_home { "Home" } else { "Away" }.to_string())
                .unwrap_or_default()
        },
        "'Home' or 'Away'",
        &[("NBA", "Home")],
    );
    registry.register(
        "vs_at",
        Category::HomeAway,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .map(|g| if g.is_home { "vs" } else { "@" }.to_string())
                .unwrap_or_default()
        },
        "'vs' when home, '@' when away",
        &[("NBA", "vs")],
    );
    registry.register(
        "vs_at_word",
        Category::HomeAway,
        SuffixRules::All,
        |_, game_ctx| {
            game_ctx
                .map(|g| if g.is_home { "vs" } else { "at" }.to_string())
                .unwrap_or_default()
        },
        "'vs' when home, 'at' when away",
        &[("NBA", "at")],
    );
}
