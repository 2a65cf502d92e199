//! Loadout use cases.
//!
//! Loadouts are named sets of prepared leveled spells, stored per actor.
//! Applying one only produces a target set; the spellbook session turns it
//! into pending changes and the normal commit writes them.

mod error;

use std::collections::BTreeSet;
use std::sync::Arc;

use spellbook_domain::{Actor, ActorId, ClassIdentifier, Loadout, LoadoutId, SpellUuid};

use crate::entities::ActorFlags;
use crate::infrastructure::ports::{ClockPort, RandomPort};

pub use error::LoadoutError;

pub struct LoadoutOps {
    flags: Arc<ActorFlags>,
    clock: Arc<dyn ClockPort>,
    random: Arc<dyn RandomPort>,
}

impl LoadoutOps {
    pub fn new(flags: Arc<ActorFlags>, clock: Arc<dyn ClockPort>, random: Arc<dyn RandomPort>) -> Self {
        Self {
            flags,
            clock,
            random,
        }
    }

    /// Save a new loadout.
    ///
    /// # Arguments
    /// * `spells` - The prepared leveled spells to capture
    ///
    /// # Returns
    /// * `Ok(Loadout)` - The stored loadout
    /// * `Err(LoadoutError::Validation)` - The name is blank
    pub async fn save(
        &self,
        actor_id: &ActorId,
        class: &ClassIdentifier,
        name: &str,
        description: &str,
        spells: Vec<SpellUuid>,
    ) -> Result<Loadout, LoadoutError> {
        let mut loadout = Loadout::new(name, class.clone(), spells, self.clock.now())?
            .with_description(description);
        loadout.id = LoadoutId::from_uuid(self.random.gen_uuid());
        self.flags.set_loadout(actor_id, &loadout).await?;
        tracing::info!(
            actor_id = %actor_id,
            class_id = %class,
            loadout_id = %loadout.id,
            spells = loadout.spell_configuration.len(),
            "Loadout saved"
        );
        Ok(loadout)
    }

    /// Loadouts of an actor, optionally for one class, sorted by name.
    pub async fn list(
        &self,
        actor_id: &ActorId,
        class: Option<&ClassIdentifier>,
    ) -> Result<Vec<Loadout>, LoadoutError> {
        let mut loadouts: Vec<Loadout> = self
            .flags
            .loadouts(actor_id)
            .await?
            .into_values()
            .filter(|loadout| class.map_or(true, |class| &loadout.class_identifier == class))
            .collect();
        loadouts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(loadouts)
    }

    pub async fn get(&self, actor_id: &ActorId, id: &LoadoutId) -> Result<Loadout, LoadoutError> {
        self.flags
            .loadouts(actor_id)
            .await?
            .remove(&id.to_string())
            .ok_or(LoadoutError::NotFound(*id))
    }

    pub async fn rename(
        &self,
        actor_id: &ActorId,
        id: &LoadoutId,
        name: &str,
    ) -> Result<Loadout, LoadoutError> {
        let mut loadout = self.get(actor_id, id).await?;
        loadout.rename(name, self.clock.now())?;
        self.flags.set_loadout(actor_id, &loadout).await?;
        tracing::info!(actor_id = %actor_id, loadout_id = %id, name = %loadout.name, "Loadout renamed");
        Ok(loadout)
    }

    pub async fn delete(&self, actor_id: &ActorId, id: &LoadoutId) -> Result<(), LoadoutError> {
        if !self.flags.remove_loadout(actor_id, id).await? {
            return Err(LoadoutError::NotFound(*id));
        }
        tracing::info!(actor_id = %actor_id, loadout_id = %id, "Loadout deleted");
        Ok(())
    }

    /// The prepared-spell set applying `loadout` should reach.
    ///
    /// Spells the actor holds as cantrips or in a locked mode are left out,
    /// as are spells missing from `known` when the class keeps a spellbook.
    pub fn apply_target(
        loadout: &Loadout,
        actor: &Actor,
        known: Option<&[SpellUuid]>,
    ) -> BTreeSet<SpellUuid> {
        let class = &loadout.class_identifier;
        loadout
            .spell_configuration
            .iter()
            .filter(|uuid| {
                actor.find_owned(class, uuid).map_or(true, |owned| {
                    !owned.is_cantrip() && !owned.preparation_mode.is_locked()
                })
            })
            .filter(|uuid| known.map_or(true, |known| known.contains(uuid)))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::{FixedClock, SequenceRandom};
    use crate::infrastructure::memory::{InMemoryHost, WorldSnapshot};
    use chrono::{DateTime, Utc};
    use spellbook_domain::{
        ActorItem, DomainError, ItemId, OwnedSpell, PreparationMode, SpellLevel,
        SpellProgression, SpellcastingClass,
    };

    fn uuid(id: &str) -> SpellUuid {
        SpellUuid::new(format!("Compendium.dnd5e.spells.Item.{id}"))
    }

    fn owned(id: &str, level: u8, mode: PreparationMode) -> ActorItem {
        ActorItem::Spell(OwnedSpell {
            id: ItemId::new(format!("item-{id}")),
            name: id.into(),
            level: SpellLevel::from(level),
            source_id: Some(uuid(id)),
            source_class: Some(ClassIdentifier::new("cleric")),
            preparation_mode: mode,
            prepared: true,
            source_item: None,
            ritual: false,
        })
    }

    fn ops() -> LoadoutOps {
        let host = Arc::new(InMemoryHost::new(WorldSnapshot {
            actors: vec![Actor::new("a1", "Jozan")],
            ..Default::default()
        }));
        let now = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        LoadoutOps::new(
            Arc::new(ActorFlags::new(host)),
            Arc::new(FixedClock(now)),
            Arc::new(SequenceRandom::new()),
        )
    }

    #[tokio::test]
    async fn save_list_rename_delete() {
        let ops = ops();
        let actor = ActorId::new("a1");
        let cleric = ClassIdentifier::new("cleric");

        let healer = ops
            .save(&actor, &cleric, "Healer", "", vec![uuid("cure"), uuid("bless")])
            .await
            .unwrap();
        ops.save(&actor, &cleric, "Attacker", "burst", vec![uuid("bolt")])
            .await
            .unwrap();
        ops.save(&actor, &ClassIdentifier::new("wizard"), "Other", "", vec![])
            .await
            .unwrap();

        let names: Vec<String> = ops
            .list(&actor, Some(&cleric))
            .await
            .unwrap()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["Attacker", "Healer"]);

        let renamed = ops.rename(&actor, &healer.id, "Support").await.unwrap();
        assert_eq!(renamed.name, "Support");
        assert_eq!(ops.get(&actor, &healer.id).await.unwrap().name, "Support");

        ops.delete(&actor, &healer.id).await.unwrap();
        assert!(matches!(
            ops.delete(&actor, &healer.id).await,
            Err(LoadoutError::NotFound(_))
        ));
        assert_eq!(ops.list(&actor, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn blank_names_are_rejected() {
        let ops = ops();
        let err = ops
            .save(&ActorId::new("a1"), &ClassIdentifier::new("cleric"), "  ", "", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, LoadoutError::Validation(DomainError::Validation(_))));
    }

    #[test]
    fn apply_target_skips_locked_and_unknown() {
        let actor = Actor::new("a1", "Jozan")
            .with_class(
                SpellcastingClass::new("cleric", "Cleric", 5).with_progression(SpellProgression::Full),
            )
            .with_item(owned("p1", 1, PreparationMode::Prepared))
            .with_item(owned("al", 1, PreparationMode::Always))
            .with_item(owned("c1", 0, PreparationMode::Prepared));
        let loadout = Loadout::new(
            "Mixed",
            ClassIdentifier::new("cleric"),
            vec![uuid("p1"), uuid("p4"), uuid("al"), uuid("c1")],
            Utc::now(),
        )
        .unwrap();

        let target = LoadoutOps::apply_target(&loadout, &actor, None);
        assert_eq!(target, [uuid("p1"), uuid("p4")].into_iter().collect());

        let known = [uuid("p4")];
        let target = LoadoutOps::apply_target(&loadout, &actor, Some(&known));
        assert_eq!(target, [uuid("p4")].into_iter().collect());
    }
}
