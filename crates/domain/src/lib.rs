//! Spellbook domain: spell preparation rules, the wizard spellbook ledger
//! and spell filtering. Pure types with no I/O.

pub mod entities;
pub mod error;
pub mod filter;
pub mod game_systems;
pub mod ids;
pub mod pending;
pub mod preparation;
pub mod value_objects;

// Re-export all entities (explicit list in entities/mod.rs)
pub use entities::{
    Activity, ActivityKind, Actor, ActorItem, CastingTime, CastingTimeUnit, ClassItemRef,
    ConsumableItem, ConsumableKind, CopyOptions, CopyOutcome, CopyRates, CopyRecord, Currency,
    DurationUnit, Loadout, MaterialComponent, NewOwnedSpell, OwnedSpell, OwnedSpellPatch,
    PreparationMode, RangeUnit, ScaleTrack, SourceItemKind, SourceItemRef, Spell,
    SpellComponents, SpellDuration, SpellLevel, SpellProgression, SpellProperty, SpellRange,
    SpellcastingClass, Subclass, WizardSpellbook,
};

pub use error::DomainError;
pub use filter::{AdvancedQuery, DistanceUnit, EntryFlags, SpellFilter};
pub use game_systems::max_castable_level;
pub use pending::{ClassPending, Delta, PendingState};
pub use preparation::{
    can_change_cantrip_status, can_change_spell_status, ritual_castable, ritual_injections,
    CantripCheck, Rejection, SpellCheck, Verdict, ViolationKind,
};

// Re-export ID types
pub use ids::{ActorId, ClassIdentifier, ItemId, LoadoutId, PackId, SpellUuid};

// Re-export value objects (explicit list in value_objects/mod.rs)
pub use value_objects::{
    apply_bonus, resolve_class_rules, ClassRules, ClassRulesOverride, EnforcementBehavior,
    Lifecycle, RitualCasting, RuleSet, StoredClassRules, SwapKind, SwapMode, SwapTracking,
    SwapWindow, VersionedClassRules, WindowMarkers, CLASS_RULES_VERSION,
};
