//! Value objects - Immutable objects defined by their attributes

mod rule_set;
mod swap_window;

pub use rule_set::{
    apply_bonus, resolve_class_rules, ClassRules, ClassRulesOverride, EnforcementBehavior,
    RitualCasting, RuleSet, StoredClassRules, SwapMode, VersionedClassRules,
    CLASS_RULES_VERSION,
};
pub use swap_window::{Lifecycle, SwapKind, SwapTracking, SwapWindow, WindowMarkers};
