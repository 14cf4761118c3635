//! Broadcast variables: TV networks, national broadcast status.
//!
//! Event broadcasts partition into national TV, national streaming, team
//! TV, team streaming, and other buckets. Radio feeds and league
//! subscription packages (League Pass and friends) are skipped entirely;
//! templates list watchable networks, not paywalled add-ons.

use super::super::registry::{Category, SuffixRules, VariableRegistry};
use super::event_of;
use crate::types::GameContext;

/// National broadcast networks (priority order).
const NATIONAL_NETWORKS: &[&str] = &[
    "ABC", "CBS", "NBC", "FOX", "ESPN", "ESPN2", "TNT", "TBS", "NFL Network",
    "NBA TV", "NHL Network", "MLB Network", "FS1", "FS2", "USA Network",
];

/// National streaming services.
const NATIONAL_STREAMING: &[&str] = &[
    "ESPN+", "Peacock", "Paramount+", "Prime Video", "Apple TV+", "Max",
];

/// Subscription packages - skipped, not a way to watch one game.
const SUBSCRIPTION_PACKAGES: &[&str] = &[
    "NBA League Pass",
    "NHL.TV",
    "MLB.TV",
    "MLS Season Pass",
    "NFL Sunday Ticket",
];

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct BroadcastBuckets {
    pub national_tv: Vec<String>,
    pub national_streaming: Vec<String>,
    pub other_tv: Vec<String>,
    pub other_streaming: Vec<String>,
}

fn looks_like_streaming(name: &str) -> bool {
    let lower = name.to_lowercase();
    NATIONAL_STREAMING.iter().any(|s| s.eq_ignore_ascii_case(name))
        || lower.ends_with('+')
        || lower.contains("stream")
        || lower.contains(".tv")
        || lower.contains("app")
}

/// Partition a broadcast list into buckets, dropping radio and
/// subscription packages, de-duplicating while preserving order.
pub(crate) fn partition_broadcasts(broadcasts: &[String]) -> BroadcastBuckets {
    let mut buckets = BroadcastBuckets::default();
    let mut seen: Vec<String> = Vec::new();
    for name in broadcasts {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let lower = name.to_lowercase();
        if lower.contains("radio") {
            continue;
        }
        if SUBSCRIPTION_PACKAGES.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            continue;
        }
        if seen.iter().any(|s| s.eq_ignore_ascii_case(name)) {
            continue;
        }
        seen.push(name.to_string());

        let is_national_tv = NATIONAL_NETWORKS.iter().any(|n| n.eq_ignore_ascii_case(name));
        let is_national_streaming = NATIONAL_STREAMING
            .iter()
            .any(|n| n.eq_ignore_ascii_case(name));
        if is_national_tv {
            buckets.national_tv.push(name.to_string());
        } else if is_national_streaming {
            buckets.national_streaming.push(name.to_string());
        } else if looks_like_streaming(name) {
            buckets.other_streaming.push(name.to_string());
        } else {
            buckets.other_tv.push(name.to_string());
        }
    }
    buckets
}

impl BroadcastBuckets {
    /// All watchable entries, national first.
    pub(crate) fn ordered(&self) -> Vec<&str> {
        self.national_tv
            .iter()
            .chain(self.national_streaming.iter())
            .chain(self.other_tv.iter())
            .chain(self.other_streaming.iter())
            .map(String::as_str)
            .collect()
    }

    pub(crate) fn best(&self) -> Option<&str> {
        self.ordered().first().copied()
    }

    pub(crate) fn is_national(&self) -> bool {
        !self.national_tv.is_empty() || !self.national_streaming.is_empty()
    }
}

fn buckets(game_ctx: Option<&GameContext>) -> BroadcastBuckets {
    event_of(game_ctx)
        .map(|e| partition_broadcasts(&e.event.broadcasts))
        .unwrap_or_default()
}

pub fn register(registry: &mut VariableRegistry) {
    registry.register(
        "broadcast_simple",
        Category::Broadcast,
        SuffixRules::All,
        |_, game_ctx| buckets(game_ctx).ordered().join(", "),
        "Comma-separated broadcast networks ('ESPN, FanDuel SN')",
        &[("NBA", "ESPN, FanDuel SN Detroit")],
    );
    registry.register(
        "broadcast_network",
        Category::Broadcast,
        SuffixRules::All,
        |_, game_ctx| {
            buckets(game_ctx)
                .best()
                .map(|s| s.to_string())
                .unwrap_or_default()
        },
        "Single best broadcast network",
        &[("NBA", "ESPN")],
    );
    registry.register(
        "broadcast_national_network",
        Category::Broadcast,
        SuffixRules::All,
        |_, game_ctx| {
            let buckets = buckets(game_ctx);
            buckets
                .national_tv
                .iter()
                .chain(buckets.national_streaming.iter())
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        },
        "National broadcast networks only",
        &[("NBA", "ESPN")],
    );
    registry.register(
        "broadcast_streaming",
        Category::Broadcast,
        SuffixRules::All,
        |_, game_ctx| {
            let buckets = buckets(game_ctx);
            buckets
                .national_streaming
                .iter()
                .chain(buckets.other_streaming.iter())
                .cloned()
                .collect::<Vec<_>>()
                .join(", ")
        },
        "Streaming services carrying the game",
        &[("NHL", "ESPN+")],
    );
    registry.register(
        "is_national_broadcast",
        Category::Broadcast,
        SuffixRules::All,
        |_, game_ctx| {
            if buckets(game_ctx).is_national() {
                "true"
            } else {
                "false"
            }
            .to_string()
        },
        "'true' if the game is on national TV or streaming",
        &[("NBA", "true")],
    );
}
