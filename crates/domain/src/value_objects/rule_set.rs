//! Rule sets and effective per-class rules.
//!
//! Effective rules for a class are built in three layers: the defaults of
//! the rule set in force, then the actor's rule-set override (which picks a
//! different set of defaults), then the actor's per-class overrides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entities::SpellcastingClass;
use crate::error::DomainError;
use crate::ids::SpellUuid;

/// Schema version of persisted class rules.
pub const CLASS_RULES_VERSION: u32 = 2;

/// Canonical rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleSet {
    #[default]
    Legacy,
    Modern,
}

impl RuleSet {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Legacy => "Legacy",
            Self::Modern => "Modern",
        }
    }

    pub fn cantrip_swapping(&self) -> SwapMode {
        match self {
            Self::Legacy => SwapMode::LevelUp,
            Self::Modern => SwapMode::LongRest,
        }
    }

    pub fn spell_swapping(&self) -> SwapMode {
        SwapMode::LongRest
    }

    pub fn ritual_casting(&self) -> RitualCasting {
        match self {
            Self::Legacy => RitualCasting::Prepared,
            Self::Modern => RitualCasting::Always,
        }
    }

    pub fn enforcement(&self) -> EnforcementBehavior {
        EnforcementBehavior::NotifyGm
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::Modern => write!(f, "modern"),
        }
    }
}

impl FromStr for RuleSet {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "2014" => Ok(Self::Legacy),
            "modern" | "2024" => Ok(Self::Modern),
            other => Err(DomainError::parse(format!("Unknown rule set: {other}"))),
        }
    }
}

/// When a class may swap cantrips or spells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapMode {
    None,
    LevelUp,
    LongRest,
}

impl fmt::Display for SwapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "never"),
            Self::LevelUp => write!(f, "on level up"),
            Self::LongRest => write!(f, "after a long rest"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RitualCasting {
    None,
    /// Only currently prepared rituals are castable as rituals
    Prepared,
    /// Every known ritual is castable
    Always,
}

/// How validation rejections reach the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EnforcementBehavior {
    #[serde(rename = "enforced")]
    Enforced,
    #[default]
    #[serde(rename = "notifyGM")]
    NotifyGm,
    #[serde(rename = "unenforced")]
    Unenforced,
}

impl FromStr for EnforcementBehavior {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "enforced" => Ok(Self::Enforced),
            "notifyGM" | "notifyGm" => Ok(Self::NotifyGm),
            "unenforced" => Ok(Self::Unenforced),
            other => Err(DomainError::parse(format!(
                "Unknown enforcement behavior: {other}"
            ))),
        }
    }
}

/// Effective rules for one class on one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRules {
    pub show_cantrips: bool,
    pub force_wizard_mode: bool,
    pub cantrip_swapping: SwapMode,
    pub spell_swapping: SwapMode,
    pub ritual_casting: RitualCasting,
    #[serde(default)]
    pub custom_spell_list: Vec<SpellUuid>,
    #[serde(default)]
    pub spell_preparation_bonus: i32,
    #[serde(default)]
    pub cantrip_preparation_bonus: i32,
    /// Set when the class has no numeric cantrip scale value
    #[serde(default, rename = "_noScaleValue")]
    pub no_scale_value: bool,
}

impl ClassRules {
    /// Defaults of a rule set for a class.
    ///
    /// `has_cantrip_scale` reports whether any configured cantrip scale key
    /// resolves for the class.
    pub fn defaults(
        rule_set: RuleSet,
        class: &SpellcastingClass,
        has_cantrip_scale: bool,
    ) -> Self {
        Self {
            show_cantrips: has_cantrip_scale,
            force_wizard_mode: class.identifier.as_str() == "wizard",
            cantrip_swapping: rule_set.cantrip_swapping(),
            spell_swapping: rule_set.spell_swapping(),
            ritual_casting: rule_set.ritual_casting(),
            custom_spell_list: Vec::new(),
            spell_preparation_bonus: 0,
            cantrip_preparation_bonus: 0,
            no_scale_value: !has_cantrip_scale,
        }
    }

    /// Layer an override on top of these rules.
    pub fn merged(mut self, overrides: &ClassRulesOverride) -> Self {
        if let Some(value) = overrides.show_cantrips {
            self.show_cantrips = value;
        }
        if let Some(value) = overrides.force_wizard_mode {
            self.force_wizard_mode = value;
        }
        if let Some(value) = overrides.cantrip_swapping {
            self.cantrip_swapping = value;
        }
        if let Some(value) = overrides.spell_swapping {
            self.spell_swapping = value;
        }
        if let Some(value) = overrides.ritual_casting {
            self.ritual_casting = value;
        }
        if let Some(value) = &overrides.custom_spell_list {
            self.custom_spell_list = value.clone();
        }
        if let Some(value) = overrides.spell_preparation_bonus {
            self.spell_preparation_bonus = value;
        }
        if let Some(value) = overrides.cantrip_preparation_bonus {
            self.cantrip_preparation_bonus = value;
        }
        self
    }

    /// Whether cantrips are shown, after the scale-value check.
    pub fn cantrips_visible(&self) -> bool {
        self.show_cantrips && !self.no_scale_value
    }

    pub fn uses_spellbook(&self) -> bool {
        self.force_wizard_mode
    }

    pub fn max_prepared(&self, base: u32) -> u32 {
        apply_bonus(base, self.spell_preparation_bonus)
    }

    pub fn max_cantrips(&self, base: u32) -> u32 {
        apply_bonus(base, self.cantrip_preparation_bonus)
    }

    /// Stable key of the fields that change which spell list resolves.
    pub fn list_fingerprint(&self) -> String {
        let mut list: Vec<&str> = self.custom_spell_list.iter().map(|u| u.as_str()).collect();
        list.sort_unstable();
        format!("{}|{}", self.force_wizard_mode, list.join(","))
    }
}

/// Add a signed bonus, clamping at zero.
pub fn apply_bonus(base: u32, bonus: i32) -> u32 {
    let total = i64::from(base) + i64::from(bonus);
    u32::try_from(total.max(0)).unwrap_or(u32::MAX)
}

/// Per-class overrides an actor carries. Absent fields keep the default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRulesOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_cantrips: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_wizard_mode: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cantrip_swapping: Option<SwapMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spell_swapping: Option<SwapMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ritual_casting: Option<RitualCasting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_spell_list: Option<Vec<SpellUuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spell_preparation_bonus: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cantrip_preparation_bonus: Option<i32>,
}

impl ClassRulesOverride {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Class rules as persisted on the actor.
///
/// Fields are read leniently so that a record written under another schema
/// version can still be folded into current defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredClassRules {
    #[serde(default)]
    pub version: Option<u32>,
    #[serde(flatten)]
    pub fields: ClassRulesOverride,
}

impl StoredClassRules {
    pub fn is_current(&self) -> bool {
        self.version == Some(CLASS_RULES_VERSION)
    }
}

/// Class rules as written back to the actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedClassRules {
    pub version: u32,
    #[serde(flatten)]
    pub rules: ClassRules,
}

impl From<ClassRules> for VersionedClassRules {
    fn from(rules: ClassRules) -> Self {
        Self {
            version: CLASS_RULES_VERSION,
            rules,
        }
    }
}

/// Resolve effective rules for a class.
///
/// A stale stored record is merged over the defaults before the explicit
/// overrides are applied; the returned flag reports that a migration ran.
pub fn resolve_class_rules(
    rule_set: RuleSet,
    class: &SpellcastingClass,
    has_cantrip_scale: bool,
    stored: Option<&StoredClassRules>,
    overrides: Option<&ClassRulesOverride>,
) -> (ClassRules, bool) {
    let mut rules = ClassRules::defaults(rule_set, class, has_cantrip_scale);
    let mut migrated = false;
    if let Some(stored) = stored.filter(|stored| !stored.is_current()) {
        rules = rules.merged(&stored.fields);
        migrated = true;
    }
    if let Some(overrides) = overrides {
        rules = rules.merged(overrides);
    }
    (rules, migrated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wizard() -> SpellcastingClass {
        SpellcastingClass::new("wizard", "Wizard", 5)
    }

    #[test]
    fn legacy_and_modern_defaults() {
        let legacy = ClassRules::defaults(RuleSet::Legacy, &wizard(), true);
        assert_eq!(legacy.cantrip_swapping, SwapMode::LevelUp);
        assert_eq!(legacy.spell_swapping, SwapMode::LongRest);
        assert_eq!(legacy.ritual_casting, RitualCasting::Prepared);
        assert!(legacy.force_wizard_mode);

        let modern = ClassRules::defaults(RuleSet::Modern, &wizard(), true);
        assert_eq!(modern.cantrip_swapping, SwapMode::LongRest);
        assert_eq!(modern.ritual_casting, RitualCasting::Always);
        assert_eq!(RuleSet::Modern.enforcement(), EnforcementBehavior::NotifyGm);
    }

    #[test]
    fn no_scale_value_hides_cantrips_despite_override() {
        let paladin = SpellcastingClass::new("paladin", "Paladin", 2);
        let overrides = ClassRulesOverride {
            show_cantrips: Some(true),
            ..Default::default()
        };
        let (rules, _) = resolve_class_rules(RuleSet::Legacy, &paladin, false, None, Some(&overrides));
        assert!(rules.show_cantrips);
        assert!(rules.no_scale_value);
        assert!(!rules.cantrips_visible());
    }

    #[test]
    fn bonus_clamps_at_zero() {
        assert_eq!(apply_bonus(3, -5), 0);
        assert_eq!(apply_bonus(3, 2), 5);
        let rules = ClassRules::defaults(RuleSet::Legacy, &wizard(), true).merged(
            &ClassRulesOverride {
                spell_preparation_bonus: Some(-10),
                ..Default::default()
            },
        );
        assert_eq!(rules.max_prepared(7), 0);
    }

    #[test]
    fn overrides_beat_stale_record() {
        let stored = StoredClassRules {
            version: Some(1),
            fields: ClassRulesOverride {
                ritual_casting: Some(RitualCasting::None),
                spell_swapping: Some(SwapMode::None),
                ..Default::default()
            },
        };
        let overrides = ClassRulesOverride {
            spell_swapping: Some(SwapMode::LevelUp),
            ..Default::default()
        };
        let (rules, migrated) =
            resolve_class_rules(RuleSet::Legacy, &wizard(), true, Some(&stored), Some(&overrides));
        assert!(migrated);
        assert_eq!(rules.ritual_casting, RitualCasting::None);
        assert_eq!(rules.spell_swapping, SwapMode::LevelUp);
    }

    #[test]
    fn current_record_does_not_pin_defaults() {
        let stored = StoredClassRules {
            version: Some(CLASS_RULES_VERSION),
            fields: ClassRulesOverride {
                ritual_casting: Some(RitualCasting::Prepared),
                ..Default::default()
            },
        };
        let (rules, migrated) =
            resolve_class_rules(RuleSet::Modern, &wizard(), true, Some(&stored), None);
        assert!(!migrated);
        assert_eq!(rules.ritual_casting, RitualCasting::Always);
    }

    #[test]
    fn enforcement_serde_names() {
        assert_eq!(
            serde_json::to_string(&EnforcementBehavior::NotifyGm).unwrap(),
            "\"notifyGM\""
        );
        assert_eq!("notifyGM".parse::<EnforcementBehavior>().unwrap(), EnforcementBehavior::NotifyGm);
    }

    #[test]
    fn written_record_reads_back_as_current() {
        let rules = ClassRules::defaults(RuleSet::Modern, &wizard(), false);
        let json = serde_json::to_value(VersionedClassRules::from(rules)).unwrap();
        assert_eq!(json["_noScaleValue"], serde_json::json!(true));
        let stored: StoredClassRules = serde_json::from_value(json).unwrap();
        assert!(stored.is_current());
        assert_eq!(stored.fields.ritual_casting, Some(RitualCasting::Always));
    }

    #[test]
    fn stored_rules_read_flattened() {
        let json = r#"{"version": 2, "showCantrips": false, "_noScaleValue": true}"#;
        let stored: StoredClassRules = serde_json::from_str(json).unwrap();
        assert!(stored.is_current());
        assert_eq!(stored.fields.show_cantrips, Some(false));
    }
}
