//! Template resolution.
//!
//! A pure function from a typed [`TemplateContext`] to strings.
//! Placeholders have the form `{name}`, `{name.next}`, `{name.last}`.
//! Unknown placeholders and missing data resolve to the empty string;
//! resolution never fails.
//!
//! Suffix expansion is a two-pass over the registry: first the base
//! variable map from the current game context, then `.next`/`.last`
//! applications filtered by each variable's suffix-eligibility mask.

use crate::types::{GameContext, TemplateContext};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::sync::OnceLock;

pub mod conditions;
pub mod registry;
pub mod variables;

pub use conditions::{select_description, DescriptionOption};
pub use registry::{Category, SuffixRules, VariableRegistry};

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"\{([a-zA-Z0-9_]+)(?:\.(next|last))?\}").expect("placeholder pattern")
    })
}

/// Resolves templates against the full variable registry.
pub struct TemplateResolver {
    registry: VariableRegistry,
}

impl Default for TemplateResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateResolver {
    pub fn new() -> Self {
        let mut registry = VariableRegistry::empty();
        variables::register_all(&mut registry);
        Self { registry }
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    fn game_for_suffix<'a>(
        ctx: &'a TemplateContext,
        suffix: Option<&str>,
    ) -> Option<&'a GameContext> {
        match suffix {
            None => ctx.game.as_ref(),
            Some("next") => ctx.next_game.as_ref(),
            Some("last") => ctx.last_game.as_ref(),
            _ => None,
        }
    }

    /// Resolve one placeholder. Empty when the name is unknown or the
    /// suffix is outside the variable's eligibility mask.
    fn resolve_placeholder(
        &self,
        ctx: &TemplateContext,
        name: &str,
        suffix: Option<&str>,
    ) -> String {
        let Some(def) = self.registry.get(name) else {
            return String::new();
        };
        let allowed = match suffix {
            None => def.suffix_rules.allows_base(),
            Some("next") => def.suffix_rules.allows_next(),
            Some("last") => def.suffix_rules.allows_last(),
            _ => false,
        };
        if !allowed {
            return String::new();
        }
        (def.extractor)(ctx, Self::game_for_suffix(ctx, suffix))
    }

    /// Resolve every placeholder in a template.
    pub fn resolve(&self, template: &str, ctx: &TemplateContext) -> String {
        placeholder_regex()
            .replace_all(template, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                let suffix = caps.get(2).map(|m| m.as_str());
                self.resolve_placeholder(ctx, name, suffix)
            })
            .into_owned()
    }

    /// Build the full variable snapshot for a context: every eligible
    /// base, `.next`, and `.last` name. Stored on programmes for late
    /// category resolution.
    pub fn build_variables(&self, ctx: &TemplateContext) -> FxHashMap<String, String> {
        let mut vars = FxHashMap::default();
        // Pass 1: base map from the current game context.
        for def in self.registry.all_variables() {
            if def.suffix_rules.allows_base() {
                vars.insert(
                    def.name.to_string(),
                    (def.extractor)(ctx, ctx.game.as_ref()),
                );
            }
        }
        // Pass 2: suffix contexts filtered by the eligibility mask.
        for def in self.registry.all_variables() {
            if def.suffix_rules.allows_next() {
                vars.insert(
                    format!("{}.next", def.name),
                    (def.extractor)(ctx, ctx.next_game.as_ref()),
                );
            }
            if def.suffix_rules.allows_last() {
                vars.insert(
                    format!("{}.last", def.name),
                    (def.extractor)(ctx, ctx.last_game.as_ref()),
                );
            }
        }
        vars
    }
}
