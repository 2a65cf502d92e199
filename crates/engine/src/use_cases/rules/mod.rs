//! Rule-set use cases.
//!
//! Detects spellcasting classes, resolves their effective rules and keeps
//! the persisted per-class records current.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use spellbook_domain::{
    resolve_class_rules, Actor, ActorId, ClassIdentifier, ClassRules, ClassRulesOverride,
    EnforcementBehavior, RuleSet, StoredClassRules, VersionedClassRules,
};
use tokio::sync::Mutex;

use crate::entities::ActorFlags;
use crate::infrastructure::app_settings::SpellbookSettings;
use crate::infrastructure::ports::RepoError;
use crate::use_cases::spell_list::SpellListOps;

/// Effective rules for every spellcasting class of an actor.
#[derive(Debug, Clone, PartialEq)]
pub struct ActorRules {
    pub rule_set: RuleSet,
    pub enforcement: EnforcementBehavior,
    pub classes: BTreeMap<ClassIdentifier, ClassRules>,
}

impl ActorRules {
    pub fn class(&self, class: &ClassIdentifier) -> Option<&ClassRules> {
        self.classes.get(class)
    }
}

/// Container for rule use cases.
pub struct RulesUseCases {
    pub resolve: Arc<ResolveClassRules>,
    pub configure: Arc<ConfigureRules>,
}

impl RulesUseCases {
    pub fn new(resolve: Arc<ResolveClassRules>, configure: Arc<ConfigureRules>) -> Self {
        Self { resolve, configure }
    }
}

/// Resolve and persist class rules.
pub struct ResolveClassRules {
    flags: Arc<ActorFlags>,
    /// Actors already warned about a stale rules record
    warned: Mutex<HashSet<ActorId>>,
}

impl ResolveClassRules {
    pub fn new(flags: Arc<ActorFlags>) -> Self {
        Self {
            flags,
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Resolve effective rules for every spellcasting class of `actor`.
    ///
    /// # Arguments
    /// * `actor` - Actor snapshot, read from the host for this pass
    /// * `settings` - World settings in force
    ///
    /// # Returns
    /// * `Ok(ActorRules)` - Rules per detected class; the persisted record is
    ///   rewritten when it differs
    /// * `Err(RepoError)` - A flag read or write failed
    pub async fn execute(
        &self,
        actor: &Actor,
        settings: &SpellbookSettings,
    ) -> Result<ActorRules, RepoError> {
        let rule_set = self
            .flags
            .rule_set_override(&actor.id)
            .await?
            .unwrap_or(settings.spellcasting_rule_set);
        let enforcement = self
            .flags
            .enforcement_behavior(&actor.id)
            .await?
            .unwrap_or(settings.default_enforcement_behavior);

        let stored = self.flags.stored_class_rules(&actor.id).await?;
        let overrides = self.flags.class_rule_overrides(&actor.id).await?;
        let scale_keys = settings.cantrip_scale_keys();

        let mut classes = BTreeMap::new();
        let mut stale = Vec::new();
        for class in actor.spellcasting_classes() {
            let has_scale = class.scale_value(&scale_keys).is_some();
            let (rules, migrated) = resolve_class_rules(
                rule_set,
                class,
                has_scale,
                stored.get(class.identifier.as_str()),
                overrides.get(class.identifier.as_str()),
            );
            if migrated {
                stale.push(class.identifier.clone());
            }
            tracing::debug!(
                actor_id = %actor.id,
                class_id = %class.identifier,
                rule_set = %rule_set,
                "Resolved class rules"
            );
            classes.insert(class.identifier.clone(), rules);
        }

        if !stale.is_empty() && self.warned.lock().await.insert(actor.id.clone()) {
            tracing::warn!(
                actor_id = %actor.id,
                classes = ?stale,
                "Stored class rules have an outdated version, merged with defaults"
            );
        }

        self.persist(&actor.id, &classes, &stored).await?;

        Ok(ActorRules {
            rule_set,
            enforcement,
            classes,
        })
    }

    async fn persist(
        &self,
        actor: &ActorId,
        classes: &BTreeMap<ClassIdentifier, ClassRules>,
        stored: &BTreeMap<String, StoredClassRules>,
    ) -> Result<(), RepoError> {
        let record: BTreeMap<String, VersionedClassRules> = classes
            .iter()
            .map(|(class, rules)| (class.to_string(), VersionedClassRules::from(rules.clone())))
            .collect();

        // Compare in the lenient stored shape so field order and absent
        // options do not force a rewrite
        let as_stored: BTreeMap<String, StoredClassRules> =
            serde_json::from_value(serde_json::to_value(&record)?)?;
        if &as_stored == stored {
            return Ok(());
        }
        tracing::info!(actor_id = %actor, classes = record.len(), "Writing class rules");
        self.flags.set_class_rules(actor, &record).await
    }
}

/// Change rule selections on an actor.
pub struct ConfigureRules {
    flags: Arc<ActorFlags>,
    spell_lists: Arc<SpellListOps>,
}

impl ConfigureRules {
    pub fn new(flags: Arc<ActorFlags>, spell_lists: Arc<SpellListOps>) -> Self {
        Self { flags, spell_lists }
    }

    /// Pick a rule set for one actor; `None` follows the world setting.
    pub async fn set_rule_set(
        &self,
        actor: &ActorId,
        rule_set: Option<RuleSet>,
    ) -> Result<(), RepoError> {
        self.flags.set_rule_set_override(actor, rule_set).await?;
        self.spell_lists.invalidate().await;
        tracing::info!(actor_id = %actor, rule_set = ?rule_set, "Rule set override changed");
        Ok(())
    }

    pub async fn set_enforcement(
        &self,
        actor: &ActorId,
        behavior: Option<EnforcementBehavior>,
    ) -> Result<(), RepoError> {
        self.flags.set_enforcement_behavior(actor, behavior).await?;
        tracing::info!(actor_id = %actor, behavior = ?behavior, "Enforcement behavior changed");
        Ok(())
    }

    /// Replace the per-class overrides. An empty override removes the entry.
    pub async fn set_class_overrides(
        &self,
        actor: &ActorId,
        class: &ClassIdentifier,
        overrides: &ClassRulesOverride,
    ) -> Result<(), RepoError> {
        self.flags
            .set_class_rule_override(actor, class, overrides)
            .await?;
        self.spell_lists.invalidate_class(class).await;
        tracing::info!(actor_id = %actor, class_id = %class, "Class rule overrides changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::{InMemoryHost, WorldSnapshot};
    use crate::infrastructure::ports::{FlagRepo, FlagScope, MockFlagRepo, FLAG_NAMESPACE};
    use serde_json::json;
    use spellbook_domain::{ScaleTrack, SpellProgression, SpellcastingClass, SwapMode, CLASS_RULES_VERSION};

    fn cleric() -> SpellcastingClass {
        SpellcastingClass::new("cleric", "Cleric", 3)
            .with_progression(SpellProgression::Full)
            .with_max_prepared(6)
            .with_scale("cantrips-known", ScaleTrack::new([(1, 3), (4, 4)]))
    }

    fn actor() -> Actor {
        Actor::new("actor1", "Jozan")
            .with_class(cleric())
            .with_class(SpellcastingClass::new("fighter", "Fighter", 2))
    }

    fn host() -> Arc<InMemoryHost> {
        Arc::new(InMemoryHost::new(WorldSnapshot {
            actors: vec![actor()],
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn detects_casters_and_persists_versioned_rules() {
        let host = host();
        let resolve = ResolveClassRules::new(Arc::new(ActorFlags::new(host.clone())));

        let rules = resolve
            .execute(&actor(), &SpellbookSettings::default())
            .await
            .unwrap();
        assert_eq!(rules.classes.len(), 1);
        let cleric_rules = rules.class(&ClassIdentifier::new("cleric")).unwrap();
        assert!(cleric_rules.cantrips_visible());
        assert_eq!(cleric_rules.cantrip_swapping, SwapMode::LevelUp);
        assert_eq!(rules.enforcement, EnforcementBehavior::NotifyGm);

        let stored = host
            .get_flag(
                &FlagScope::Actor(ActorId::new("actor1")),
                FLAG_NAMESPACE,
                "classRules",
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["cleric"]["version"], json!(CLASS_RULES_VERSION));
    }

    #[tokio::test]
    async fn actor_override_selects_rule_set() {
        let host = host();
        let flags = Arc::new(ActorFlags::new(host.clone()));
        flags
            .set_rule_set_override(&ActorId::new("actor1"), Some(RuleSet::Modern))
            .await
            .unwrap();

        let rules = ResolveClassRules::new(flags)
            .execute(&actor(), &SpellbookSettings::default())
            .await
            .unwrap();
        assert_eq!(rules.rule_set, RuleSet::Modern);
        assert_eq!(
            rules.class(&ClassIdentifier::new("cleric")).unwrap().cantrip_swapping,
            SwapMode::LongRest
        );
    }

    #[tokio::test]
    async fn stale_record_is_merged_and_rewritten() {
        let host = host();
        host.set_flag(
            &FlagScope::Actor(ActorId::new("actor1")),
            FLAG_NAMESPACE,
            "classRules",
            json!({"cleric": {"version": 1, "spellPreparationBonus": 2}}),
        )
        .await
        .unwrap();
        let flags = Arc::new(ActorFlags::new(host.clone()));

        let rules = ResolveClassRules::new(flags.clone())
            .execute(&actor(), &SpellbookSettings::default())
            .await
            .unwrap();
        let cleric_rules = rules.class(&ClassIdentifier::new("cleric")).unwrap();
        assert_eq!(cleric_rules.spell_preparation_bonus, 2);

        let stored = flags.stored_class_rules(&ActorId::new("actor1")).await.unwrap();
        assert!(stored["cleric"].is_current());
    }

    #[tokio::test]
    async fn unchanged_rules_are_not_rewritten() {
        let host = host();
        let flags = Arc::new(ActorFlags::new(host.clone()));
        let resolve = ResolveClassRules::new(flags);
        resolve
            .execute(&actor(), &SpellbookSettings::default())
            .await
            .unwrap();
        let first = resolve
            .execute(&actor(), &SpellbookSettings::default())
            .await
            .unwrap();

        // A second pass through a read-only mock must not write
        let mut repo = MockFlagRepo::new();
        let snapshot = host
            .get_flag(
                &FlagScope::Actor(ActorId::new("actor1")),
                FLAG_NAMESPACE,
                "classRules",
            )
            .await
            .unwrap();
        repo.expect_get_flag().returning(move |_, _, key| {
            Ok(if key == "classRules" {
                snapshot.clone()
            } else {
                None
            })
        });
        repo.expect_set_flag().never();
        let again = ResolveClassRules::new(Arc::new(ActorFlags::new(Arc::new(repo))))
            .execute(&actor(), &SpellbookSettings::default())
            .await
            .unwrap();
        assert_eq!(first, again);
    }
}
