//! Pending preparation state for one editing session.
//!
//! The session snapshots what each class had prepared when it opened and
//! records intent as deltas against that snapshot. Nothing here touches the
//! actor; the commit pipeline turns the deltas into mutations.

use std::collections::{BTreeMap, BTreeSet};

use crate::entities::Actor;
use crate::ids::{ClassIdentifier, SpellUuid};
use crate::value_objects::SwapKind;

/// Additions and removals relative to the session baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub added: BTreeSet<SpellUuid>,
    pub removed: BTreeSet<SpellUuid>,
}

impl Delta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Per-class pending state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassPending {
    /// Leveled spells prepared when the session opened
    baseline_spells: BTreeSet<SpellUuid>,
    baseline_cantrips: BTreeSet<SpellUuid>,
    pub spells: Delta,
    pub cantrips: Delta,
}

impl ClassPending {
    fn baseline(&self, kind: SwapKind) -> &BTreeSet<SpellUuid> {
        match kind {
            SwapKind::Cantrip => &self.baseline_cantrips,
            SwapKind::Spell => &self.baseline_spells,
        }
    }

    pub fn delta(&self, kind: SwapKind) -> &Delta {
        match kind {
            SwapKind::Cantrip => &self.cantrips,
            SwapKind::Spell => &self.spells,
        }
    }

    fn delta_mut(&mut self, kind: SwapKind) -> &mut Delta {
        match kind {
            SwapKind::Cantrip => &mut self.cantrips,
            SwapKind::Spell => &mut self.spells,
        }
    }

    pub fn was_prepared(&self, kind: SwapKind, uuid: &SpellUuid) -> bool {
        self.baseline(kind).contains(uuid)
    }

    pub fn is_prepared(&self, kind: SwapKind, uuid: &SpellUuid) -> bool {
        let delta = self.delta(kind);
        (self.baseline(kind).contains(uuid) && !delta.removed.contains(uuid))
            || delta.added.contains(uuid)
    }

    /// Prepared set as the user currently sees it.
    pub fn effective(&self, kind: SwapKind) -> BTreeSet<SpellUuid> {
        let delta = self.delta(kind);
        self.baseline(kind)
            .difference(&delta.removed)
            .chain(delta.added.iter())
            .cloned()
            .collect()
    }

    pub fn count(&self, kind: SwapKind) -> u32 {
        self.effective(kind).len() as u32
    }

    /// Originally prepared entries removed this session, excluding `except`.
    pub fn swaps_used(&self, kind: SwapKind, except: Option<&SpellUuid>) -> u32 {
        self.delta(kind)
            .removed
            .iter()
            .filter(|uuid| Some(*uuid) != except)
            .count() as u32
    }

    /// The class had nothing of this kind prepared at open.
    pub fn initial_selection(&self, kind: SwapKind) -> bool {
        self.baseline(kind).is_empty()
    }

    pub fn set(&mut self, kind: SwapKind, uuid: SpellUuid, prepared: bool) {
        let in_baseline = self.baseline(kind).contains(&uuid);
        let delta = self.delta_mut(kind);
        match (prepared, in_baseline) {
            (true, true) => {
                delta.removed.remove(&uuid);
            }
            (true, false) => {
                delta.added.insert(uuid);
            }
            (false, true) => {
                delta.removed.insert(uuid);
            }
            (false, false) => {
                delta.added.remove(&uuid);
            }
        }
    }

    /// Replace the prepared leveled spells with `target`.
    pub fn replace_spells(&mut self, target: &BTreeSet<SpellUuid>) {
        self.spells = Delta {
            added: target.difference(&self.baseline_spells).cloned().collect(),
            removed: self.baseline_spells.difference(target).cloned().collect(),
        };
    }

    pub fn is_dirty(&self) -> bool {
        !self.spells.is_empty() || !self.cantrips.is_empty()
    }
}

/// Pending state across all classes of the actor being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingState {
    classes: BTreeMap<ClassIdentifier, ClassPending>,
}

impl PendingState {
    /// Snapshot the actor's user-prepared spells per spellcasting class.
    pub fn open(actor: &Actor) -> Self {
        let classes = actor
            .spellcasting_classes()
            .map(|class| (class.identifier.clone(), snapshot(actor, &class.identifier)))
            .collect();
        Self { classes }
    }

    /// Re-snapshot one class from `actor`, dropping its deltas. Other
    /// classes keep their pending changes.
    pub fn rebase_class(&mut self, actor: &Actor, class: &ClassIdentifier) {
        if actor.class(class).is_some() {
            self.classes.insert(class.clone(), snapshot(actor, class));
        } else {
            self.classes.remove(class);
        }
    }

    pub fn class(&self, class: &ClassIdentifier) -> Option<&ClassPending> {
        self.classes.get(class)
    }

    pub fn class_mut(&mut self, class: &ClassIdentifier) -> Option<&mut ClassPending> {
        self.classes.get_mut(class)
    }

    pub fn classes(&self) -> impl Iterator<Item = (&ClassIdentifier, &ClassPending)> {
        self.classes.iter()
    }

    pub fn is_dirty(&self) -> bool {
        self.classes.values().any(ClassPending::is_dirty)
    }

    /// Drop the deltas of one class after a successful commit.
    pub fn clear_class(&mut self, class: &ClassIdentifier) {
        if let Some(pending) = self.classes.get_mut(class) {
            pending.spells = Delta::default();
            pending.cantrips = Delta::default();
        }
    }
}

fn snapshot(actor: &Actor, class: &ClassIdentifier) -> ClassPending {
    let mut pending = ClassPending::default();
    for spell in actor.class_spells(class) {
        let Some(uuid) = spell.source_id.clone() else {
            continue;
        };
        if !spell.prepared || spell.preparation_mode.is_locked() {
            continue;
        }
        if spell.is_cantrip() {
            pending.baseline_cantrips.insert(uuid);
        } else if spell.counts_toward_maximum() {
            pending.baseline_spells.insert(uuid);
        }
    }
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ActorItem, OwnedSpell, PreparationMode, SpellLevel, SpellProgression, SpellcastingClass};
    use crate::ids::ItemId;

    fn owned(uuid: &str, level: u8, mode: PreparationMode, prepared: bool) -> ActorItem {
        ActorItem::Spell(OwnedSpell {
            id: ItemId::new(format!("i-{uuid}")),
            name: uuid.into(),
            level: SpellLevel::from(level),
            source_id: Some(SpellUuid::new(uuid)),
            source_class: Some(ClassIdentifier::new("cleric")),
            preparation_mode: mode,
            prepared,
            source_item: None,
            ritual: false,
        })
    }

    fn actor() -> Actor {
        Actor::new("a", "Cleric")
            .with_class(
                SpellcastingClass::new("cleric", "Cleric", 3).with_progression(SpellProgression::Full),
            )
            .with_item(owned("p1", 1, PreparationMode::Prepared, true))
            .with_item(owned("p2", 1, PreparationMode::Prepared, true))
            .with_item(owned("p3", 1, PreparationMode::Prepared, true))
            .with_item(owned("c1", 0, PreparationMode::Prepared, true))
            .with_item(owned("al", 1, PreparationMode::Always, true))
    }

    fn uuid(s: &str) -> SpellUuid {
        SpellUuid::new(s)
    }

    #[test]
    fn baseline_excludes_locked() {
        let state = PendingState::open(&actor());
        let cleric = state.class(&ClassIdentifier::new("cleric")).unwrap();
        assert_eq!(cleric.count(SwapKind::Spell), 3);
        assert_eq!(cleric.count(SwapKind::Cantrip), 1);
        assert!(!cleric.was_prepared(SwapKind::Spell, &uuid("al")));
    }

    #[test]
    fn toggles_are_reversible() {
        let mut state = PendingState::open(&actor());
        let cleric = state.class_mut(&ClassIdentifier::new("cleric")).unwrap();
        cleric.set(SwapKind::Spell, uuid("p1"), false);
        cleric.set(SwapKind::Spell, uuid("p4"), true);
        assert_eq!(cleric.swaps_used(SwapKind::Spell, None), 1);
        assert!(cleric.is_dirty());
        cleric.set(SwapKind::Spell, uuid("p1"), true);
        cleric.set(SwapKind::Spell, uuid("p4"), false);
        assert!(!cleric.is_dirty());
        assert!(!state.is_dirty());
    }

    #[test]
    fn replace_spells_matches_target_exactly() {
        let mut state = PendingState::open(&actor());
        let cleric = state.class_mut(&ClassIdentifier::new("cleric")).unwrap();
        let target: BTreeSet<_> = [uuid("p2"), uuid("p4")].into_iter().collect();
        cleric.replace_spells(&target);
        assert_eq!(cleric.spells.removed, [uuid("p1"), uuid("p3")].into_iter().collect());
        assert_eq!(cleric.spells.added, [uuid("p4")].into_iter().collect());
        assert_eq!(cleric.effective(SwapKind::Spell), target);

        let once = cleric.clone();
        cleric.replace_spells(&target);
        assert_eq!(*cleric, once);
        assert_eq!(cleric.count(SwapKind::Cantrip), 1);
    }

    #[test]
    fn rebase_resets_one_class() {
        let mut state = PendingState::open(&actor());
        let cleric_id = ClassIdentifier::new("cleric");
        state
            .class_mut(&cleric_id)
            .unwrap()
            .set(SwapKind::Spell, uuid("p1"), false);

        let after = actor().with_item(owned("p4", 1, PreparationMode::Prepared, true));
        state.rebase_class(&after, &cleric_id);
        let cleric = state.class(&cleric_id).unwrap();
        assert!(!cleric.is_dirty());
        assert_eq!(cleric.count(SwapKind::Spell), 4);
    }
}
