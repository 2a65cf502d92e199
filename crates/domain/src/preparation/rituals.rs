//! Ritual castability.

use std::collections::BTreeSet;

use crate::ids::SpellUuid;
use crate::value_objects::{ClassRules, RitualCasting};

/// Whether a spell can be cast as a ritual by a class.
pub fn ritual_castable(rules: &ClassRules, is_ritual: bool, prepared: bool, known: bool) -> bool {
    if !is_ritual {
        return false;
    }
    match rules.ritual_casting {
        RitualCasting::None => false,
        RitualCasting::Prepared => prepared,
        RitualCasting::Always => known || prepared,
    }
}

/// Known rituals that must be materialised in ritual mode.
///
/// Only classes keeping a spellbook under `always` ritual casting inject;
/// rituals already in `prepared` are left alone. Order follows `known`.
pub fn ritual_injections<'a, F>(
    rules: &ClassRules,
    known: impl IntoIterator<Item = &'a SpellUuid>,
    is_ritual: F,
    prepared: &BTreeSet<SpellUuid>,
) -> Vec<SpellUuid>
where
    F: Fn(&SpellUuid) -> bool,
{
    if rules.ritual_casting != RitualCasting::Always || !rules.uses_spellbook() {
        return Vec::new();
    }
    known
        .into_iter()
        .filter(|uuid| !prepared.contains(*uuid) && is_ritual(uuid))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SpellcastingClass;
    use crate::value_objects::RuleSet;

    fn rules(rule_set: RuleSet) -> ClassRules {
        ClassRules::defaults(rule_set, &SpellcastingClass::new("wizard", "Wizard", 3), true)
    }

    #[test]
    fn modern_wizard_injects_unprepared_rituals() {
        let known = [SpellUuid::new("r1"), SpellUuid::new("r2")];
        let prepared: BTreeSet<_> = [SpellUuid::new("r2")].into_iter().collect();
        let injected = ritual_injections(
            &rules(RuleSet::Modern),
            known.iter(),
            |uuid| uuid.as_str() == "r1",
            &prepared,
        );
        assert_eq!(injected, vec![SpellUuid::new("r1")]);
    }

    #[test]
    fn legacy_injects_nothing() {
        let known = [SpellUuid::new("r1")];
        let injected = ritual_injections(&rules(RuleSet::Legacy), known.iter(), |_| true, &BTreeSet::new());
        assert!(injected.is_empty());
    }

    #[test]
    fn castability_by_mode() {
        let legacy = rules(RuleSet::Legacy);
        assert!(ritual_castable(&legacy, true, true, true));
        assert!(!ritual_castable(&legacy, true, false, true));
        let modern = rules(RuleSet::Modern);
        assert!(ritual_castable(&modern, true, false, true));
        assert!(!ritual_castable(&modern, false, true, true));
    }
}
