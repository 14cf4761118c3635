// Core modules (used by services)
pub mod cache;
pub mod clients;
pub mod db;
pub mod providers;
pub mod service;
pub mod types;
pub mod tz;

// Domain modules
pub mod detection;
pub mod dispatcharr;
pub mod epg;
pub mod filler;
pub mod gold_zone;
pub mod league_config;
pub mod lifecycle;
pub mod matching;
pub mod rate_limit;
pub mod team_cache;
pub mod templates;
