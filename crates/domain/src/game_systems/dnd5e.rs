//! D&D 5e spellcasting arithmetic.

use crate::entities::{SpellProgression, SpellcastingClass};

/// Highest spell level castable with the actor's slots.
///
/// Multiclass casters pool their levels (full + ⌊half/2⌋ + ⌊third/3⌋ +
/// ⌈artificer/2⌉). A single contributing class uses its own rounding.
/// Pact magic is tracked separately and the higher of the two wins.
pub fn max_castable_level(classes: &[SpellcastingClass]) -> u8 {
    let contributing: Vec<&SpellcastingClass> = classes
        .iter()
        .filter(|class| contributes_slots(class.effective_progression()))
        .collect();

    let caster_level = match contributing.as_slice() {
        [] => 0,
        [single] => single_class_caster_level(single.effective_progression(), single.level),
        many => many
            .iter()
            .map(|class| multiclass_caster_levels(class.effective_progression(), class.level))
            .sum(),
    };

    let pact = classes
        .iter()
        .filter(|class| class.effective_progression() == SpellProgression::Pact)
        .map(|class| pact_slot_level(class.level))
        .max()
        .unwrap_or(0);

    highest_slot_level(caster_level).max(pact)
}

fn contributes_slots(progression: SpellProgression) -> bool {
    matches!(
        progression,
        SpellProgression::Full
            | SpellProgression::Half
            | SpellProgression::Third
            | SpellProgression::Artificer
            | SpellProgression::Leveled
    )
}

fn multiclass_caster_levels(progression: SpellProgression, level: u8) -> u8 {
    match progression {
        SpellProgression::Full | SpellProgression::Leveled => level,
        SpellProgression::Half => level / 2,
        SpellProgression::Third => level / 3,
        SpellProgression::Artificer => level.div_ceil(2),
        _ => 0,
    }
}

fn single_class_caster_level(progression: SpellProgression, level: u8) -> u8 {
    match progression {
        SpellProgression::Full | SpellProgression::Leveled => level,
        SpellProgression::Half if level >= 2 => level.div_ceil(2),
        SpellProgression::Third if level >= 3 => level.div_ceil(3),
        SpellProgression::Artificer => level.div_ceil(2),
        _ => 0,
    }
}

/// Highest slot level on the standard table for a caster level.
fn highest_slot_level(caster_level: u8) -> u8 {
    match caster_level {
        0 => 0,
        1..=16 => caster_level.div_ceil(2),
        _ => 9,
    }
}

/// Pact slot level for a warlock level.
fn pact_slot_level(level: u8) -> u8 {
    level.div_ceil(2).min(5)
}
