//! World-scoped spellbook settings.
//!
//! Settings are stored by the host one key at a time. They are read into a
//! typed struct where every field carries a serde default, so a world that
//! never touched a setting still gets a usable value.
//!
//! # Versioned Filter Configuration
//!
//! `filterConfiguration` carries a schema version. A stored configuration
//! with another version is replaced by the defaults on load.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spellbook_domain::{CopyRates, EnforcementBehavior, PackId, RuleSet};

/// Setting namespace.
pub const SETTINGS_NAMESPACE: &str = "spell-book";

/// Every key `SpellbookSettings` reads.
pub const SETTING_KEYS: &[&str] = &[
    "indexedCompendiums",
    "spellcastingRuleSet",
    "defaultEnforcementBehavior",
    "customSpellMappings",
    "cantripScaleValues",
    "consumeScrollsWhenLearning",
    "deductSpellLearningCost",
    "spellComparisonMax",
    "filterConfiguration",
    "hiddenSpellLists",
    "deleteUnpreparedSpells",
    "spellLearningCostPerLevel",
    "spellLearningTimePerLevel",
    "wizardStartingSpells",
    "wizardSpellsPerLevel",
    "fetchConcurrency",
    "spellListCacheTtlSecs",
];

// ============================================================================
// Filter Configuration
// ============================================================================

pub const FILTER_CONFIGURATION_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSetting {
    pub id: String,
    pub enabled: bool,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfiguration {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub filters: Vec<FilterSetting>,
}

impl Default for FilterConfiguration {
    fn default() -> Self {
        let ids = [
            "name",
            "level",
            "school",
            "castingTime",
            "range",
            "damageType",
            "condition",
            "requiresSave",
            "concentration",
            "ritual",
            "prepared",
            "favorited",
            "materialComponents",
        ];
        Self {
            version: FILTER_CONFIGURATION_VERSION,
            filters: ids
                .iter()
                .zip(0u32..)
                .map(|(id, order)| FilterSetting {
                    id: (*id).to_string(),
                    enabled: true,
                    order,
                })
                .collect(),
        }
    }
}

impl FilterConfiguration {
    pub fn is_current(&self) -> bool {
        self.version == FILTER_CONFIGURATION_VERSION
    }
}

// ============================================================================
// Spellbook Settings
// ============================================================================

fn default_cantrip_scale_values() -> String {
    "cantrips-known, cantrips".to_string()
}

fn default_true() -> bool {
    true
}

fn default_comparison_max() -> u32 {
    3
}

fn default_cost_per_level() -> u32 {
    50
}

fn default_time_per_level() -> u32 {
    2
}

fn default_two() -> u32 {
    2
}

fn default_fetch_concurrency() -> usize {
    5
}

fn default_cache_ttl_secs() -> u64 {
    300
}

/// All world-scoped settings the spellbook reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellbookSettings {
    /// Packs to index; empty means every pack
    #[serde(default)]
    pub indexed_compendiums: Vec<PackId>,
    #[serde(default)]
    pub spellcasting_rule_set: RuleSet,
    #[serde(default)]
    pub default_enforcement_behavior: EnforcementBehavior,
    /// Spell list page uuid to its replacement
    #[serde(default)]
    pub custom_spell_mappings: BTreeMap<String, String>,
    /// Comma separated scale-value keys, probed in order
    #[serde(default = "default_cantrip_scale_values")]
    pub cantrip_scale_values: String,
    #[serde(default = "default_true")]
    pub consume_scrolls_when_learning: bool,
    #[serde(default)]
    pub deduct_spell_learning_cost: bool,
    #[serde(default = "default_comparison_max")]
    pub spell_comparison_max: u32,
    #[serde(default)]
    pub filter_configuration: FilterConfiguration,
    #[serde(default)]
    pub hidden_spell_lists: Vec<String>,

    // ============================================================================
    // Save and learning behavior
    // ============================================================================
    #[serde(default = "default_true")]
    pub delete_unprepared_spells: bool,
    #[serde(default = "default_cost_per_level")]
    pub spell_learning_cost_per_level: u32,
    #[serde(default = "default_time_per_level")]
    pub spell_learning_time_per_level: u32,
    #[serde(default = "default_two")]
    pub wizard_starting_spells: u32,
    #[serde(default = "default_two")]
    pub wizard_spells_per_level: u32,

    // ============================================================================
    // Compendium access
    // ============================================================================
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub spell_list_cache_ttl_secs: u64,
}

impl Default for SpellbookSettings {
    fn default() -> Self {
        Self {
            indexed_compendiums: Vec::new(),
            spellcasting_rule_set: RuleSet::Legacy,
            default_enforcement_behavior: EnforcementBehavior::NotifyGm,
            custom_spell_mappings: BTreeMap::new(),
            cantrip_scale_values: default_cantrip_scale_values(),
            consume_scrolls_when_learning: true,
            deduct_spell_learning_cost: false,
            spell_comparison_max: default_comparison_max(),
            filter_configuration: FilterConfiguration::default(),
            hidden_spell_lists: Vec::new(),
            delete_unprepared_spells: true,
            spell_learning_cost_per_level: default_cost_per_level(),
            spell_learning_time_per_level: default_time_per_level(),
            wizard_starting_spells: default_two(),
            wizard_spells_per_level: default_two(),
            fetch_concurrency: default_fetch_concurrency(),
            spell_list_cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl SpellbookSettings {
    /// Scale-value keys probed for a class's cantrip maximum.
    pub fn cantrip_scale_keys(&self) -> Vec<String> {
        self.cantrip_scale_values
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn copy_rates(&self) -> CopyRates {
        CopyRates {
            cost_per_level: self.spell_learning_cost_per_level,
            hours_per_level: self.spell_learning_time_per_level,
            starting_spells: self.wizard_starting_spells,
            spells_per_level: self.wizard_spells_per_level,
        }
    }

    /// Whether a pack is indexed.
    pub fn indexes(&self, pack: &PackId) -> bool {
        self.indexed_compendiums.is_empty() || self.indexed_compendiums.contains(pack)
    }

    pub fn is_hidden_list(&self, uuid: &str) -> bool {
        self.hidden_spell_lists.iter().any(|hidden| hidden == uuid)
    }

    /// Replacement for a spell list page, if one is mapped.
    pub fn mapped_list<'a>(&'a self, uuid: &'a str) -> &'a str {
        self.custom_spell_mappings
            .get(uuid)
            .map(String::as_str)
            .unwrap_or(uuid)
    }

    pub fn spell_list_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.spell_list_cache_ttl_secs)
    }

    /// Concurrency gate for compendium fetches; never zero.
    pub fn fetch_gate(&self) -> usize {
        self.fetch_concurrency.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let settings: SpellbookSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, SpellbookSettings::default());
        assert_eq!(
            settings.cantrip_scale_keys(),
            vec!["cantrips-known".to_string(), "cantrips".to_string()]
        );
        assert_eq!(settings.fetch_gate(), 5);
    }

    #[test]
    fn stored_values_override_defaults() {
        let settings: SpellbookSettings = serde_json::from_value(serde_json::json!({
            "spellcastingRuleSet": "modern",
            "defaultEnforcementBehavior": "enforced",
            "indexedCompendiums": ["dnd5e.spells"],
            "customSpellMappings": {"page-a": "page-b"},
            "spellLearningCostPerLevel": 100
        }))
        .unwrap();
        assert_eq!(settings.spellcasting_rule_set, RuleSet::Modern);
        assert_eq!(
            settings.default_enforcement_behavior,
            EnforcementBehavior::Enforced
        );
        assert!(settings.indexes(&PackId::new("dnd5e.spells")));
        assert!(!settings.indexes(&PackId::new("homebrew.spells")));
        assert_eq!(settings.mapped_list("page-a"), "page-b");
        assert_eq!(settings.mapped_list("page-c"), "page-c");
        assert_eq!(settings.copy_rates().cost_per_level, 100);
    }

    #[test]
    fn default_filter_configuration_is_current() {
        let config = FilterConfiguration::default();
        assert!(config.is_current());
        assert_eq!(config.filters.first().map(|f| f.id.as_str()), Some("name"));
    }
}
