//! Variable registry and registration plumbing.
//!
//! The central registry for all template variables. Each variable is
//! registered once with a name, category, suffix-eligibility rule, and an
//! extractor closure. The registry drives both resolution (two-pass
//! suffix expansion) and the read-only variables catalog endpoint.

use crate::types::{GameContext, TemplateContext};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Extractor from context to a rendered string. Missing data yields "".
pub type Extractor = fn(&TemplateContext, Option<&GameContext>) -> String;

/// Variable categories for organization and documentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Identity,
    DateTime,
    Venue,
    HomeAway,
    Records,
    Streaks,
    H2h,
    Scores,
    Outcome,
    Standings,
    Statistics,
    Playoffs,
    Odds,
    Broadcast,
    Rankings,
    Conference,
    Soccer,
    PlayerLeaders,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Identity => "Team Identity",
            Category::DateTime => "Date & Time",
            Category::Venue => "Venue",
            Category::HomeAway => "Home/Away",
            Category::Records => "Records",
            Category::Streaks => "Streaks",
            Category::H2h => "Head-to-Head",
            Category::Scores => "Scores",
            Category::Outcome => "Outcome",
            Category::Standings => "Standings",
            Category::Statistics => "Statistics",
            Category::Playoffs => "Season Type",
            Category::Odds => "Betting Odds",
            Category::Broadcast => "Broadcast",
            Category::Rankings => "Rankings",
            Category::Conference => "Conference/Division",
            Category::Soccer => "Soccer",
            Category::PlayerLeaders => "Player Leaders",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::Identity => "🏷️",
            Category::DateTime => "📅",
            Category::Venue => "🏟️",
            Category::HomeAway => "🏠",
            Category::Records => "📊",
            Category::Streaks => "🔥",
            Category::H2h => "⚔️",
            Category::Scores => "🎯",
            Category::Outcome => "🏆",
            Category::Standings => "📈",
            Category::Statistics => "📉",
            Category::Playoffs => "🏅",
            Category::Odds => "💰",
            Category::Broadcast => "📺",
            Category::Rankings => "🎖️",
            Category::Conference => "🏛️",
            Category::Soccer => "⚽",
            Category::PlayerLeaders => "👤",
        }
    }
}

/// Rules for which suffixes a variable supports.
///
/// Variables are generated for base (current game), `.next`, and `.last`
/// contexts. Different variables make sense in different contexts: odds
/// exist only looking forward, final scores only looking back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuffixRules {
    /// base, .next, .last (most variables)
    All,
    /// base only (team-level: team_name, league)
    BaseOnly,
    /// base and .next only (odds - no odds for past games)
    BaseNextOnly,
    /// .last only (score, result - only exist after a game ends)
    LastOnly,
}

impl SuffixRules {
    pub fn allows_base(&self) -> bool {
        !matches!(self, SuffixRules::LastOnly)
    }

    pub fn allows_next(&self) -> bool {
        matches!(self, SuffixRules::All | SuffixRules::BaseNextOnly)
    }

    pub fn allows_last(&self) -> bool {
        matches!(self, SuffixRules::All | SuffixRules::LastOnly)
    }

    pub fn available_suffixes(&self) -> Vec<&'static str> {
        match self {
            SuffixRules::All => vec!["base", "next", "last"],
            SuffixRules::BaseOnly => vec!["base"],
            SuffixRules::BaseNextOnly => vec!["base", "next"],
            SuffixRules::LastOnly => vec!["last"],
        }
    }
}

/// Complete definition of a template variable.
#[derive(Clone)]
pub struct VariableDefinition {
    pub name: &'static str,
    pub category: Category,
    pub suffix_rules: SuffixRules,
    pub extractor: Extractor,
    pub description: &'static str,
    /// sport → example value, for the template editor.
    pub examples: &'static [(&'static str, &'static str)],
}

impl std::fmt::Debug for VariableDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VariableDefinition")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("suffix_rules", &self.suffix_rules)
            .finish()
    }
}

/// Registry of all template variables, indexed by base name.
pub struct VariableRegistry {
    variables: FxHashMap<&'static str, VariableDefinition>,
    ordered: Vec<&'static str>,
}

impl VariableRegistry {
    pub fn empty() -> Self {
        Self {
            variables: FxHashMap::default(),
            ordered: Vec::new(),
        }
    }

    /// Register a variable definition. Last registration of a name wins.
    pub fn register(
        &mut self,
        name: &'static str,
        category: Category,
        suffix_rules: SuffixRules,
        extractor: Extractor,
        description: &'static str,
        examples: &'static [(&'static str, &'static str)],
    ) {
        if self.variables.insert(
            name,
            VariableDefinition {
                name,
                category,
                suffix_rules,
                extractor,
                description,
                examples,
            },
        ).is_none()
        {
            self.ordered.push(name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&VariableDefinition> {
        self.variables.get(name)
    }

    pub fn all_variables(&self) -> impl Iterator<Item = &VariableDefinition> {
        self.ordered.iter().filter_map(|name| self.variables.get(name))
    }

    pub fn by_category(&self, category: Category) -> Vec<&VariableDefinition> {
        self.all_variables()
            .filter(|v| v.category == category)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.variables.len()
    }

    /// Generate the read-only variables catalog for the API surface.
    pub fn to_api_format(&self) -> serde_json::Value {
        let mut variables: Vec<serde_json::Value> = Vec::with_capacity(self.count());
        let mut categories: Vec<String> = Vec::new();

        for def in self.all_variables() {
            let category_name = format!("{} {}", def.category.icon(), def.category.label());
            if !categories.contains(&category_name) {
                categories.push(category_name.clone());
            }
            let examples: serde_json::Map<String, serde_json::Value> = def
                .examples
                .iter()
                .map(|(sport, value)| ((*sport).to_string(), serde_json::json!(value)))
                .collect();
            let mut entry = serde_json::json!({
                "name": def.name,
                "description": def.description,
                "category": category_name,
                "icon": def.category.icon(),
                "available_suffixes": def.suffix_rules.available_suffixes(),
            });
            if !examples.is_empty() {
                entry["examples_by_sport"] = serde_json::Value::Object(examples);
            }
            variables.push(entry);
        }

        variables.sort_by(|a, b| {
            let key_a = (a["category"].as_str().unwrap_or(""), a["name"].as_str().unwrap_or(""));
            let key_b = (b["category"].as_str().unwrap_or(""), b["name"].as_str().unwrap_or(""));
            key_a.cmp(&key_b)
        });
        categories.sort();

        serde_json::json!({
            "total_variables": variables.len(),
            "categories": categories,
            "variables": variables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &TemplateContext, _: Option<&GameContext>) -> String {
        String::new()
    }

    #[test]
    fn test_suffix_rules() {
        assert!(SuffixRules::All.allows_base());
        assert!(SuffixRules::All.allows_next());
        assert!(SuffixRules::All.allows_last());

        assert!(SuffixRules::BaseOnly.allows_base());
        assert!(!SuffixRules::BaseOnly.allows_next());
        assert!(!SuffixRules::BaseOnly.allows_last());

        assert!(SuffixRules::BaseNextOnly.allows_base());
        assert!(SuffixRules::BaseNextOnly.allows_next());
        assert!(!SuffixRules::BaseNextOnly.allows_last());

        assert!(!SuffixRules::LastOnly.allows_base());
        assert!(!SuffixRules::LastOnly.allows_next());
        assert!(SuffixRules::LastOnly.allows_last());
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = VariableRegistry::empty();
        registry.register(
            "team_name",
            Category::Identity,
            SuffixRules::BaseOnly,
            noop,
            "Team name",
            &[],
        );
        assert_eq!(registry.count(), 1);
        let def = registry.get("team_name").unwrap();
        assert_eq!(def.category, Category::Identity);
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn test_api_format_shape() {
        let mut registry = VariableRegistry::empty();
        registry.register(
            "opponent",
            Category::Identity,
            SuffixRules::All,
            noop,
            "Opponent team name",
            &[("NBA", "Chicago Bulls")],
        );
        let api = registry.to_api_format();
        assert_eq!(api["total_variables"], 1);
        let entry = &api["variables"][0];
        assert_eq!(entry["name"], "opponent");
        assert_eq!(
            entry["available_suffixes"],
            serde_json::json!(["base", "next", "last"])
        );
        assert_eq!(entry["examples_by_sport"]["NBA"], "Chicago Bulls");
    }
}
