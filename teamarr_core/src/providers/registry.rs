//! Provider registry - single source of truth for data providers.
//!
//! Manages provider configuration and priority-ordered discovery. The
//! registry is a constructed value threaded through the call graph (no
//! process-global state); `initialize` must run once before first use to
//! inject shared dependencies, notably the league-mapping lookup that the
//! TSDB provider needs.

use super::SportsProvider;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Factory building a provider instance on first use.
pub type ProviderFactory = Box<dyn Fn(&RegistryDependencies) -> Arc<dyn SportsProvider> + Send + Sync>;

/// Shared dependencies injected at initialization.
#[derive(Debug, Clone, Default)]
pub struct RegistryDependencies {
    /// canonical league code → TSDB numeric league id
    pub tsdb_league_ids: FxHashMap<String, String>,
}

/// Configuration for a registered provider.
pub struct ProviderConfig {
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    factory: ProviderFactory,
    instance: Option<Arc<dyn SportsProvider>>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("enabled", &self.enabled)
            .field("instantiated", &self.instance.is_some())
            .finish()
    }
}

/// Central registry for all data providers.
///
/// Registration is idempotent: re-registering a name overwrites the old
/// config (logged). `get_all()` returns enabled providers in ascending
/// priority order - lower number wins, tried first.
pub struct ProviderRegistry {
    providers: HashMap<String, ProviderConfig>,
    dependencies: RegistryDependencies,
    initialized: bool,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            dependencies: RegistryDependencies::default(),
            initialized: false,
        }
    }

    /// Create a registry with the default provider set: ESPN primary,
    /// TheSportsDB fallback.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("espn", 0, true, |_deps| {
            Arc::new(super::espn::EspnProvider::new())
        });
        registry.register("tsdb", 100, true, |deps| {
            let provider = super::tsdb::TsdbProvider::new();
            provider.set_league_mappings(deps.tsdb_league_ids.clone());
            Arc::new(provider)
        });
        info!(
            "[REGISTRY] Registry created with {} providers",
            registry.providers.len()
        );
        registry
    }

    /// Register a provider. Lower priority = tried first.
    pub fn register<F>(&mut self, name: &str, priority: i32, enabled: bool, factory: F)
    where
        F: Fn(&RegistryDependencies) -> Arc<dyn SportsProvider> + Send + Sync + 'static,
    {
        if self.providers.contains_key(name) {
            warn!("[REGISTRY] Provider '{}' already registered, overwriting", name);
        }
        self.providers.insert(
            name.to_string(),
            ProviderConfig {
                name: name.to_string(),
                priority,
                enabled,
                factory: Box::new(factory),
                instance: None,
            },
        );
        debug!("[REGISTRY] Registered provider: {} (priority={})", name, priority);
    }

    /// Inject shared dependencies and reset cached instances so they are
    /// recreated with them. Must run before first use.
    pub fn initialize(&mut self, dependencies: RegistryDependencies) {
        self.dependencies = dependencies;
        for config in self.providers.values_mut() {
            config.instance = None;
        }
        self.initialized = true;
        info!("[REGISTRY] Provider registry initialized with dependencies");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn instantiate(&mut self, name: &str) -> Option<Arc<dyn SportsProvider>> {
        let deps = self.dependencies.clone();
        let config = self.providers.get_mut(name)?;
        if !config.enabled {
            return None;
        }
        if config.instance.is_none() {
            config.instance = Some((config.factory)(&deps));
        }
        config.instance.clone()
    }

    /// Get a specific provider by name.
    pub fn get(&mut self, name: &str) -> Option<Arc<dyn SportsProvider>> {
        self.instantiate(name)
    }

    /// Get all enabled providers, sorted by ascending priority.
    pub fn get_all(&mut self) -> Vec<Arc<dyn SportsProvider>> {
        let mut names: Vec<(i32, String)> = self
            .providers
            .values()
            .filter(|c| c.enabled)
            .map(|c| (c.priority, c.name.clone()))
            .collect();
        names.sort();
        names
            .into_iter()
            .filter_map(|(_, name)| self.instantiate(&name))
            .collect()
    }

    /// Get the first provider that supports a league.
    pub fn get_for_league(&mut self, league: &str) -> Option<Arc<dyn SportsProvider>> {
        self.get_all()
            .into_iter()
            .find(|p| p.supports_league(league))
    }

    /// Check if a provider has premium/full capabilities.
    ///
    /// Used for fallback resolution: when a provider's primary
    /// functionality is limited (e.g. TSDB free-tier schedule caps) this
    /// returns false so the service layer can route around it.
    pub fn is_provider_premium(&mut self, name: &str) -> bool {
        match self.get(name) {
            Some(provider) => provider.is_premium(),
            None => false,
        }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn enabled_provider_names(&self) -> Vec<String> {
        self.providers
            .values()
            .filter(|c| c.enabled)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Unregister a provider (mainly for testing).
    pub fn unregister(&mut self, name: &str) -> bool {
        self.providers.remove(name).is_some()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EnrichedEvent, Event, Team, TeamStats};
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct StubProvider {
        name: String,
        premium: bool,
        leagues: Vec<String>,
    }

    #[async_trait]
    impl SportsProvider for StubProvider {
        fn name(&self) -> &str {
            &self.name
        }
        fn supports_league(&self, league: &str) -> bool {
            self.leagues.iter().any(|l| l == league)
        }
        fn is_premium(&self) -> bool {
            self.premium
        }
        async fn get_events(&self, _: &str, _: NaiveDate) -> Result<Vec<EnrichedEvent>> {
            Ok(Vec::new())
        }
        async fn get_team_schedule(&self, _: &str, _: &str, _: u32) -> Result<Vec<Event>> {
            Ok(Vec::new())
        }
        async fn get_team(&self, _: &str, _: &str) -> Result<Option<Team>> {
            Ok(None)
        }
        async fn get_event(&self, _: &str, _: &str) -> Result<Option<Event>> {
            Ok(None)
        }
        async fn get_team_stats(&self, _: &str, _: &str) -> Result<Option<TeamStats>> {
            Ok(None)
        }
    }

    fn stub(name: &str, premium: bool, leagues: &[&str]) -> StubProvider {
        StubProvider {
            name: name.to_string(),
            premium,
            leagues: leagues.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_priority_ordering() {
        let mut registry = ProviderRegistry::new();
        registry.register("fallback", 100, true, |_| Arc::new(stub("fallback", false, &["liiga"])));
        registry.register("primary", 0, true, |_| Arc::new(stub("primary", true, &["nba"])));
        registry.initialize(RegistryDependencies::default());

        let all = registry.get_all();
        assert_eq!(all[0].name(), "primary");
        assert_eq!(all[1].name(), "fallback");
    }

    #[test]
    fn test_disabled_provider_skipped() {
        let mut registry = ProviderRegistry::new();
        registry.register("off", 0, false, |_| Arc::new(stub("off", true, &["nba"])));
        registry.initialize(RegistryDependencies::default());
        assert!(registry.get("off").is_none());
        assert!(registry.get_all().is_empty());
    }

    #[test]
    fn test_get_for_league_first_supporting() {
        let mut registry = ProviderRegistry::new();
        registry.register("a", 0, true, |_| Arc::new(stub("a", true, &["nba"])));
        registry.register("b", 10, true, |_| Arc::new(stub("b", false, &["nba", "liiga"])));
        registry.initialize(RegistryDependencies::default());

        assert_eq!(registry.get_for_league("nba").unwrap().name(), "a");
        assert_eq!(registry.get_for_league("liiga").unwrap().name(), "b");
        assert!(registry.get_for_league("khl").is_none());
    }

    #[test]
    fn test_reregistration_overwrites() {
        let mut registry = ProviderRegistry::new();
        registry.register("x", 0, true, |_| Arc::new(stub("x", true, &["nba"])));
        registry.register("x", 5, true, |_| Arc::new(stub("x", false, &["nba"])));
        registry.initialize(RegistryDependencies::default());
        assert_eq!(registry.get_all().len(), 1);
        assert!(!registry.is_provider_premium("x"));
    }

    #[test]
    fn test_is_provider_premium_unknown() {
        let mut registry = ProviderRegistry::new();
        assert!(!registry.is_provider_premium("ghost"));
    }

    #[test]
    fn test_defaults_contain_espn_and_tsdb() {
        let mut registry = ProviderRegistry::with_defaults();
        registry.initialize(RegistryDependencies::default());
        let names = registry.enabled_provider_names();
        assert!(names.contains(&"espn".to_string()));
        assert!(names.contains(&"tsdb".to_string()));
        assert!(registry.is_provider_premium("espn"));
        assert!(!registry.is_provider_premium("tsdb"));
    }
}
