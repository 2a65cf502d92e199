//! Domain entities - Core business objects with identity

mod actor;
mod class;
mod loadout;
mod owned_spell;
mod spell;
mod wizard_spellbook;

pub use actor::{
    Activity, ActivityKind, Actor, ActorItem, ConsumableItem, ConsumableKind, Currency,
};
pub use class::{ClassItemRef, ScaleTrack, SpellProgression, SpellcastingClass, Subclass};
pub use loadout::Loadout;
pub use owned_spell::{
    NewOwnedSpell, OwnedSpell, OwnedSpellPatch, PreparationMode, SourceItemKind, SourceItemRef,
};
pub use spell::{
    CastingTime, CastingTimeUnit, DurationUnit, MaterialComponent, RangeUnit, Spell,
    SpellComponents, SpellDuration, SpellLevel, SpellProperty, SpellRange,
};
pub use wizard_spellbook::{CopyOptions, CopyOutcome, CopyRates, CopyRecord, WizardSpellbook};
