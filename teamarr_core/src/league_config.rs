//! League configuration for supported sports.
//!
//! This module provides:
//! - Static configuration for all supported leagues
//! - League code → provider API path mapping
//! - Per-sport default game durations used by filler math

/// Configuration for a single league.
#[derive(Debug, Clone)]
pub struct LeagueConfig {
    /// Canonical league code (e.g., "nfl", "eng.1")
    pub league_code: &'static str,
    /// Provider API sport segment (e.g., "football", "soccer")
    pub api_sport: &'static str,
    /// Provider API league segment (e.g., "nfl", "eng.1")
    pub api_league: &'static str,
    /// Human display name
    pub display_name: &'static str,
    /// Whether this is an association-football league (W-D-L records,
    /// multi-competition teams)
    pub is_soccer: bool,
    /// Whether this is a college league (rankings, conference games)
    pub is_college: bool,
    /// Default game duration in hours for EPG slotting
    pub game_duration_hours: f64,
}

/// Static configuration for all supported leagues.
pub static LEAGUE_CONFIGS: &[LeagueConfig] = &[
    // Football
    LeagueConfig {
        league_code: "nfl",
        api_sport: "football",
        api_league: "nfl",
        display_name: "NFL",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 3.5,
    },
    LeagueConfig {
        league_code: "college-football",
        api_sport: "football",
        api_league: "college-football",
        display_name: "College Football",
        is_soccer: false,
        is_college: true,
        game_duration_hours: 3.5,
    },
    // Basketball
    LeagueConfig {
        league_code: "nba",
        api_sport: "basketball",
        api_league: "nba",
        display_name: "NBA",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "wnba",
        api_sport: "basketball",
        api_league: "wnba",
        display_name: "WNBA",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "mens-college-basketball",
        api_sport: "basketball",
        api_league: "mens-college-basketball",
        display_name: "Men's College Basketball",
        is_soccer: false,
        is_college: true,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "womens-college-basketball",
        api_sport: "basketball",
        api_league: "womens-college-basketball",
        display_name: "Women's College Basketball",
        is_soccer: false,
        is_college: true,
        game_duration_hours: 2.5,
    },
    // Hockey
    LeagueConfig {
        league_code: "nhl",
        api_sport: "hockey",
        api_league: "nhl",
        display_name: "NHL",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 3.0,
    },
    // Baseball
    LeagueConfig {
        league_code: "mlb",
        api_sport: "baseball",
        api_league: "mlb",
        display_name: "MLB",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 3.5,
    },
    // Soccer - major competitions
    LeagueConfig {
        league_code: "eng.1",
        api_sport: "soccer",
        api_league: "eng.1",
        display_name: "Premier League",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "eng.fa",
        api_sport: "soccer",
        api_league: "eng.fa",
        display_name: "FA Cup",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "eng.league_cup",
        api_sport: "soccer",
        api_league: "eng.league_cup",
        display_name: "EFL Cup",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "esp.1",
        api_sport: "soccer",
        api_league: "esp.1",
        display_name: "La Liga",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "ger.1",
        api_sport: "soccer",
        api_league: "ger.1",
        display_name: "Bundesliga",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "ita.1",
        api_sport: "soccer",
        api_league: "ita.1",
        display_name: "Serie A",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "fra.1",
        api_sport: "soccer",
        api_league: "fra.1",
        display_name: "Ligue 1",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "usa.1",
        api_sport: "soccer",
        api_league: "usa.1",
        display_name: "MLS",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "uefa.champions",
        api_sport: "soccer",
        api_league: "uefa.champions",
        display_name: "UEFA Champions League",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    LeagueConfig {
        league_code: "uefa.europa",
        api_sport: "soccer",
        api_league: "uefa.europa",
        display_name: "UEFA Europa League",
        is_soccer: true,
        is_college: false,
        game_duration_hours: 2.5,
    },
    // Combat sports
    LeagueConfig {
        league_code: "ufc",
        api_sport: "mma",
        api_league: "ufc",
        display_name: "UFC",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 6.0,
    },
    LeagueConfig {
        league_code: "pfl",
        api_sport: "mma",
        api_league: "pfl",
        display_name: "PFL",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 5.0,
    },
    LeagueConfig {
        league_code: "boxing",
        api_sport: "boxing",
        api_league: "boxing",
        display_name: "Boxing",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 5.0,
    },
    // Tournament-style sports
    LeagueConfig {
        league_code: "f1",
        api_sport: "racing",
        api_league: "f1",
        display_name: "Formula 1",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 3.0,
    },
    LeagueConfig {
        league_code: "nascar",
        api_sport: "racing",
        api_league: "nascar-premier",
        display_name: "NASCAR Cup Series",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 4.0,
    },
    LeagueConfig {
        league_code: "pga",
        api_sport: "golf",
        api_league: "pga",
        display_name: "PGA Tour",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 6.0,
    },
    LeagueConfig {
        league_code: "atp",
        api_sport: "tennis",
        api_league: "atp",
        display_name: "ATP Tour",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 4.0,
    },
    LeagueConfig {
        league_code: "wta",
        api_sport: "tennis",
        api_league: "wta",
        display_name: "WTA Tour",
        is_soccer: false,
        is_college: false,
        game_duration_hours: 4.0,
    },
];

/// Get league configuration by code.
pub fn get_league_config(league: &str) -> Option<&'static LeagueConfig> {
    LEAGUE_CONFIGS
        .iter()
        .find(|c| c.league_code.eq_ignore_ascii_case(league))
}

/// Resolve `(api_sport, api_league)` for a league code.
///
/// Unknown leagues pass through as `("soccer", code)` when the code looks
/// like an ESPN soccer slug (`xxx.N`), otherwise `(code, code)` so new
/// leagues degrade gracefully instead of erroring.
pub fn api_path(league: &str) -> (String, String) {
    if let Some(config) = get_league_config(league) {
        return (config.api_sport.to_string(), config.api_league.to_string());
    }
    if league.contains('.') {
        return ("soccer".to_string(), league.to_string());
    }
    (league.to_string(), league.to_string())
}

/// Default game duration in hours for a league (fallback 3.0).
pub fn default_game_duration(league: &str) -> f64 {
    get_league_config(league).map_or(3.0, |c| c.game_duration_hours)
}

/// Whether a league uses W-D-L record formatting.
pub fn is_soccer_league(league: &str) -> bool {
    get_league_config(league).map_or(league.contains('.'), |c| c.is_soccer)
}

/// Whether a league is collegiate (rankings apply).
pub fn is_college_league(league: &str) -> bool {
    get_league_config(league).map_or(false, |c| c.is_college)
}

/// Get all league configurations.
pub fn get_all_league_configs() -> &'static [LeagueConfig] {
    LEAGUE_CONFIGS
}

/// Get list of all league codes.
pub fn get_all_league_codes() -> Vec<&'static str> {
    LEAGUE_CONFIGS.iter().map(|c| c.league_code).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_league_config() {
        let nfl = get_league_config("nfl").unwrap();
        assert_eq!(nfl.api_sport, "football");
        assert_eq!(nfl.api_league, "nfl");
    }

    #[test]
    fn test_case_insensitivity() {
        assert!(get_league_config("NFL").is_some());
        assert!(get_league_config("Eng.1").is_some());
    }

    #[test]
    fn test_api_path_known() {
        assert_eq!(
            api_path("uefa.champions"),
            ("soccer".to_string(), "uefa.champions".to_string())
        );
        assert_eq!(api_path("nba"), ("basketball".to_string(), "nba".to_string()));
    }

    #[test]
    fn test_api_path_unknown_soccer_slug() {
        assert_eq!(api_path("ned.1"), ("soccer".to_string(), "ned.1".to_string()));
    }

    #[test]
    fn test_soccer_and_college_flags() {
        assert!(is_soccer_league("eng.1"));
        assert!(!is_soccer_league("nhl"));
        assert!(is_college_league("college-football"));
        assert!(!is_college_league("nfl"));
    }

    #[test]
    fn test_durations() {
        assert_eq!(default_game_duration("ufc"), 6.0);
        assert_eq!(default_game_duration("unknown-league"), 3.0);
    }
}
