//! Actor flag entity module.
//!
//! Typed access to the spellbook's flags. Per-class records are stored as
//! one object per key, keyed by class identifier, and written back whole.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use spellbook_domain::{
    ActorId, ClassIdentifier, ClassRulesOverride, CopyRecord, EnforcementBehavior, Loadout,
    LoadoutId, RuleSet, SpellUuid, StoredClassRules, SwapTracking, VersionedClassRules,
};

use crate::infrastructure::ports::{FlagRepo, FlagScope, RepoError, FLAG_NAMESPACE};

/// Flag keys written under the spellbook namespace.
pub mod keys {
    pub const CLASS_RULES: &str = "classRules";
    pub const CLASS_RULE_OVERRIDES: &str = "classRuleOverrides";
    pub const RULE_SET_OVERRIDE: &str = "ruleSetOverride";
    pub const ENFORCEMENT_BEHAVIOR: &str = "enforcementBehavior";
    pub const WIZARD_COPIED_SPELLS: &str = "wizardCopiedSpells";
    pub const WIZARD_KNOWN_SPELLS: &str = "wizardKnownSpells";
    pub const SPELL_LOADOUTS: &str = "spellLoadouts";
    pub const LONG_REST_COMPLETED: &str = "longRestCompleted";
    pub const LONG_REST_ID: &str = "longRestId";
    pub const CLASS_LEVEL_BASELINE: &str = "classLevelBaseline";
    pub const SWAP_TRACKING: &str = "swapTracking";
    pub const COLLAPSED_LEVELS: &str = "collapsedLevels";
}

/// Actor flag entity - typed reads and writes of spellbook flags.
pub struct ActorFlags {
    repo: Arc<dyn FlagRepo>,
}

impl ActorFlags {
    pub fn new(repo: Arc<dyn FlagRepo>) -> Self {
        Self { repo }
    }

    async fn read<T: DeserializeOwned>(
        &self,
        scope: &FlagScope,
        key: &str,
    ) -> Result<Option<T>, RepoError> {
        match self.repo.get_flag(scope, FLAG_NAMESPACE, key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    async fn write<T: Serialize>(
        &self,
        scope: &FlagScope,
        key: &str,
        value: &T,
    ) -> Result<(), RepoError> {
        let value = serde_json::to_value(value)?;
        self.repo.set_flag(scope, FLAG_NAMESPACE, key, value).await
    }

    async fn read_map<T: DeserializeOwned>(
        &self,
        actor: &ActorId,
        key: &str,
    ) -> Result<BTreeMap<String, T>, RepoError> {
        Ok(self
            .read(&FlagScope::Actor(actor.clone()), key)
            .await?
            .unwrap_or_default())
    }

    async fn read_entry<T: DeserializeOwned>(
        &self,
        actor: &ActorId,
        key: &str,
        class: &ClassIdentifier,
    ) -> Result<Option<T>, RepoError> {
        let mut map: BTreeMap<String, T> = self.read_map(actor, key).await?;
        Ok(map.remove(class.as_str()))
    }

    async fn write_entry<T: Serialize + DeserializeOwned>(
        &self,
        actor: &ActorId,
        key: &str,
        class: &ClassIdentifier,
        value: Option<T>,
    ) -> Result<(), RepoError> {
        let mut map: BTreeMap<String, T> = self.read_map(actor, key).await?;
        match value {
            Some(value) => {
                map.insert(class.to_string(), value);
            }
            None => {
                map.remove(class.as_str());
            }
        }
        self.write(&FlagScope::Actor(actor.clone()), key, &map)
            .await
    }

    // =========================================================================
    // Rules
    // =========================================================================

    pub async fn stored_class_rules(
        &self,
        actor: &ActorId,
    ) -> Result<BTreeMap<String, StoredClassRules>, RepoError> {
        self.read_map(actor, keys::CLASS_RULES).await
    }

    pub async fn set_class_rules(
        &self,
        actor: &ActorId,
        rules: &BTreeMap<String, VersionedClassRules>,
    ) -> Result<(), RepoError> {
        self.write(&FlagScope::Actor(actor.clone()), keys::CLASS_RULES, rules)
            .await
    }

    pub async fn class_rule_overrides(
        &self,
        actor: &ActorId,
    ) -> Result<BTreeMap<String, ClassRulesOverride>, RepoError> {
        self.read_map(actor, keys::CLASS_RULE_OVERRIDES).await
    }

    pub async fn set_class_rule_override(
        &self,
        actor: &ActorId,
        class: &ClassIdentifier,
        overrides: &ClassRulesOverride,
    ) -> Result<(), RepoError> {
        let value = (!overrides.is_empty()).then(|| overrides.clone());
        self.write_entry(actor, keys::CLASS_RULE_OVERRIDES, class, value)
            .await
    }

    pub async fn rule_set_override(&self, actor: &ActorId) -> Result<Option<RuleSet>, RepoError> {
        self.read(&FlagScope::Actor(actor.clone()), keys::RULE_SET_OVERRIDE)
            .await
    }

    pub async fn set_rule_set_override(
        &self,
        actor: &ActorId,
        rule_set: Option<RuleSet>,
    ) -> Result<(), RepoError> {
        let scope = FlagScope::Actor(actor.clone());
        match rule_set {
            Some(rule_set) => self.write(&scope, keys::RULE_SET_OVERRIDE, &rule_set).await,
            None => {
                self.repo
                    .unset_flag(&scope, FLAG_NAMESPACE, keys::RULE_SET_OVERRIDE)
                    .await
            }
        }
    }

    pub async fn enforcement_behavior(
        &self,
        actor: &ActorId,
    ) -> Result<Option<EnforcementBehavior>, RepoError> {
        self.read(&FlagScope::Actor(actor.clone()), keys::ENFORCEMENT_BEHAVIOR)
            .await
    }

    pub async fn set_enforcement_behavior(
        &self,
        actor: &ActorId,
        behavior: Option<EnforcementBehavior>,
    ) -> Result<(), RepoError> {
        let scope = FlagScope::Actor(actor.clone());
        match behavior {
            Some(behavior) => {
                self.write(&scope, keys::ENFORCEMENT_BEHAVIOR, &behavior)
                    .await
            }
            None => {
                self.repo
                    .unset_flag(&scope, FLAG_NAMESPACE, keys::ENFORCEMENT_BEHAVIOR)
                    .await
            }
        }
    }

    // =========================================================================
    // Wizard spellbooks
    // =========================================================================

    pub async fn wizard_known_spells(
        &self,
        actor: &ActorId,
        class: &ClassIdentifier,
    ) -> Result<Vec<SpellUuid>, RepoError> {
        Ok(self
            .read_entry(actor, keys::WIZARD_KNOWN_SPELLS, class)
            .await?
            .unwrap_or_default())
    }

    pub async fn wizard_copied_spells(
        &self,
        actor: &ActorId,
        class: &ClassIdentifier,
    ) -> Result<BTreeMap<SpellUuid, CopyRecord>, RepoError> {
        Ok(self
            .read_entry(actor, keys::WIZARD_COPIED_SPELLS, class)
            .await?
            .unwrap_or_default())
    }

    /// Write both halves of a class's spellbook.
    pub async fn set_wizard_spellbook(
        &self,
        actor: &ActorId,
        class: &ClassIdentifier,
        known: &[SpellUuid],
        ledger: &BTreeMap<SpellUuid, CopyRecord>,
    ) -> Result<(), RepoError> {
        self.write_entry(actor, keys::WIZARD_KNOWN_SPELLS, class, Some(known.to_vec()))
            .await?;
        self.write_entry(
            actor,
            keys::WIZARD_COPIED_SPELLS,
            class,
            Some(ledger.clone()),
        )
        .await
    }

    // =========================================================================
    // Loadouts
    // =========================================================================

    pub async fn loadouts(&self, actor: &ActorId) -> Result<BTreeMap<String, Loadout>, RepoError> {
        self.read_map(actor, keys::SPELL_LOADOUTS).await
    }

    pub async fn set_loadout(&self, actor: &ActorId, loadout: &Loadout) -> Result<(), RepoError> {
        let mut loadouts = self.loadouts(actor).await?;
        loadouts.insert(loadout.id.to_string(), loadout.clone());
        self.write(&FlagScope::Actor(actor.clone()), keys::SPELL_LOADOUTS, &loadouts)
            .await
    }

    /// Remove a loadout. Returns false when it did not exist.
    pub async fn remove_loadout(&self, actor: &ActorId, id: &LoadoutId) -> Result<bool, RepoError> {
        let mut loadouts = self.loadouts(actor).await?;
        if loadouts.remove(&id.to_string()).is_none() {
            return Ok(false);
        }
        self.write(&FlagScope::Actor(actor.clone()), keys::SPELL_LOADOUTS, &loadouts)
            .await?;
        Ok(true)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Id of the completed long rest, if one is pending.
    pub async fn long_rest(&self, actor: &ActorId) -> Result<Option<String>, RepoError> {
        let scope = FlagScope::Actor(actor.clone());
        let completed: Option<bool> = self.read(&scope, keys::LONG_REST_COMPLETED).await?;
        if completed != Some(true) {
            return Ok(None);
        }
        self.read(&scope, keys::LONG_REST_ID).await
    }

    pub async fn set_long_rest(&self, actor: &ActorId, rest_id: &str) -> Result<(), RepoError> {
        let scope = FlagScope::Actor(actor.clone());
        self.write(&scope, keys::LONG_REST_ID, &rest_id).await?;
        self.write(&scope, keys::LONG_REST_COMPLETED, &true).await
    }

    pub async fn class_level_baselines(
        &self,
        actor: &ActorId,
    ) -> Result<BTreeMap<String, u8>, RepoError> {
        self.read_map(actor, keys::CLASS_LEVEL_BASELINE).await
    }

    pub async fn set_class_level_baselines(
        &self,
        actor: &ActorId,
        baselines: &BTreeMap<String, u8>,
    ) -> Result<(), RepoError> {
        self.write(
            &FlagScope::Actor(actor.clone()),
            keys::CLASS_LEVEL_BASELINE,
            baselines,
        )
        .await
    }

    pub async fn swap_tracking(
        &self,
        actor: &ActorId,
        class: &ClassIdentifier,
    ) -> Result<SwapTracking, RepoError> {
        Ok(self
            .read_entry(actor, keys::SWAP_TRACKING, class)
            .await?
            .unwrap_or_default())
    }

    pub async fn set_swap_tracking(
        &self,
        actor: &ActorId,
        class: &ClassIdentifier,
        tracking: &SwapTracking,
    ) -> Result<(), RepoError> {
        self.write_entry(actor, keys::SWAP_TRACKING, class, Some(tracking.clone()))
            .await
    }

    // =========================================================================
    // User flags
    // =========================================================================

    /// Collapsed level groups, stored as level strings.
    pub async fn collapsed_levels(&self) -> Result<Vec<u8>, RepoError> {
        let levels: Option<Vec<String>> = self.read(&FlagScope::User, keys::COLLAPSED_LEVELS).await?;
        Ok(levels
            .unwrap_or_default()
            .iter()
            .filter_map(|level| level.parse().ok())
            .collect())
    }

    pub async fn set_collapsed_levels(&self, levels: &[u8]) -> Result<(), RepoError> {
        let levels: Vec<String> = levels.iter().map(u8::to_string).collect();
        self.write(&FlagScope::User, keys::COLLAPSED_LEVELS, &levels)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::MockFlagRepo;
    use serde_json::json;

    fn actor() -> ActorId {
        ActorId::new("actor1")
    }

    #[tokio::test]
    async fn per_class_entries_keep_other_classes() {
        let mut repo = MockFlagRepo::new();
        repo.expect_get_flag()
            .withf(|_, namespace, key| namespace == FLAG_NAMESPACE && key == keys::SWAP_TRACKING)
            .returning(|_, _, _| Ok(Some(json!({"cleric": {"cantrip": {"longRest": ["r1"]}}}))));
        repo.expect_set_flag()
            .withf(|_, _, key, value| {
                key == keys::SWAP_TRACKING
                    && value["cleric"]["cantrip"]["longRest"] == json!(["r1"])
                    && value["wizard"]["spell"]["levelUp"] == json!([5])
            })
            .times(1)
            .returning(|_, _, _, _| Ok(()));

        let flags = ActorFlags::new(Arc::new(repo));
        let mut tracking = SwapTracking::default();
        tracking.spell.level_up.push(5);
        flags
            .set_swap_tracking(&actor(), &ClassIdentifier::new("wizard"), &tracking)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn long_rest_requires_completed_flag() {
        let mut repo = MockFlagRepo::new();
        repo.expect_get_flag()
            .withf(|_, _, key| key == keys::LONG_REST_COMPLETED)
            .returning(|_, _, _| Ok(Some(json!(false))));

        let flags = ActorFlags::new(Arc::new(repo));
        assert_eq!(flags.long_rest(&actor()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_flag_is_a_serialization_error() {
        let mut repo = MockFlagRepo::new();
        repo.expect_get_flag()
            .returning(|_, _, _| Ok(Some(json!("not a map"))));

        let flags = ActorFlags::new(Arc::new(repo));
        let result = flags.loadouts(&actor()).await;
        assert!(matches!(result, Err(RepoError::Serialization(_))));
    }

    #[tokio::test]
    async fn collapsed_levels_skip_garbage() {
        let mut repo = MockFlagRepo::new();
        repo.expect_get_flag()
            .withf(|scope, _, key| scope == &FlagScope::User && key == keys::COLLAPSED_LEVELS)
            .returning(|_, _, _| Ok(Some(json!(["0", "3", "x"]))));

        let flags = ActorFlags::new(Arc::new(repo));
        assert_eq!(flags.collapsed_levels().await.unwrap(), vec![0, 3]);
    }
}
