//! Diff a class's desired preparation against the owned spells.

use std::collections::{BTreeMap, BTreeSet};

use spellbook_domain::{
    Actor, ClassRules, ItemId, NewOwnedSpell, OwnedSpellPatch, PreparationMode, Spell, SpellUuid,
    SpellcastingClass,
};

/// Mutations for one class, applied create, update, delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassPlan {
    pub create: Vec<NewOwnedSpell>,
    pub update: Vec<OwnedSpellPatch>,
    pub delete: Vec<ItemId>,
}

impl ClassPlan {
    pub fn is_empty(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

pub struct PlanInput<'a> {
    pub actor: &'a Actor,
    pub class: &'a SpellcastingClass,
    pub rules: &'a ClassRules,
    /// Leveled spells that should end up prepared
    pub spells: &'a BTreeSet<SpellUuid>,
    pub cantrips: &'a BTreeSet<SpellUuid>,
    /// Known rituals to hold in ritual mode
    pub rituals: &'a BTreeSet<SpellUuid>,
    pub docs: &'a BTreeMap<SpellUuid, Spell>,
    pub delete_unprepared: bool,
}

pub fn plan_class(input: &PlanInput<'_>) -> ClassPlan {
    let class_id = &input.class.identifier;
    let mut plan = ClassPlan::default();
    let leveled_mode = if input.class.is_pact_caster() {
        PreparationMode::Pact
    } else {
        PreparationMode::Prepared
    };

    // Locked modes are always prepared
    for owned in input.actor.class_spells(class_id) {
        if owned.preparation_mode.is_locked() && !owned.prepared {
            plan.update.push(OwnedSpellPatch::prepared(owned.id.clone(), true));
        }
    }

    for uuid in input.spells.iter().chain(input.cantrips.iter()) {
        let cantrip = input.cantrips.contains(uuid);
        let mode = if cantrip {
            PreparationMode::Prepared
        } else {
            leveled_mode
        };
        match input.actor.find_owned(class_id, uuid) {
            None => {
                let Some(doc) = input.docs.get(uuid) else {
                    tracing::warn!(class_id = %class_id, uuid = %uuid, "Cannot create unresolved spell");
                    continue;
                };
                plan.create
                    .push(NewOwnedSpell::from_spell(doc, class_id.clone(), mode, true));
            }
            Some(owned) if owned.preparation_mode.is_locked() => {}
            Some(owned) if owned.preparation_mode == PreparationMode::Ritual => {
                plan.update
                    .push(OwnedSpellPatch::prepared(owned.id.clone(), true).with_mode(mode));
            }
            Some(owned) if !owned.prepared => {
                plan.update
                    .push(OwnedSpellPatch::prepared(owned.id.clone(), true));
            }
            Some(_) => {}
        }
    }

    for uuid in input.rituals.iter().filter(|uuid| !input.spells.contains(*uuid)) {
        match input.actor.find_owned(class_id, uuid) {
            None => {
                let Some(doc) = input.docs.get(uuid) else {
                    continue;
                };
                plan.create.push(NewOwnedSpell::from_spell(
                    doc,
                    class_id.clone(),
                    PreparationMode::Ritual,
                    false,
                ));
            }
            Some(owned) if owned.preparation_mode.is_locked() => {}
            Some(owned) if owned.preparation_mode != PreparationMode::Ritual || owned.prepared => {
                plan.update.push(
                    OwnedSpellPatch::prepared(owned.id.clone(), false)
                        .with_mode(PreparationMode::Ritual),
                );
            }
            Some(_) => {}
        }
    }

    for owned in input.actor.class_spells(class_id) {
        let Some(uuid) = &owned.source_id else {
            continue;
        };
        if input.spells.contains(uuid) || input.cantrips.contains(uuid) || input.rituals.contains(uuid) {
            continue;
        }
        match owned.preparation_mode {
            PreparationMode::Ritual => plan.delete.push(owned.id.clone()),
            PreparationMode::Prepared | PreparationMode::Pact => {
                if owned.is_cantrip() && !input.rules.cantrips_visible() {
                    continue;
                }
                if input.delete_unprepared {
                    plan.delete.push(owned.id.clone());
                } else if owned.prepared {
                    plan.update
                        .push(OwnedSpellPatch::prepared(owned.id.clone(), false));
                }
            }
            _ => {}
        }
    }

    plan
}
