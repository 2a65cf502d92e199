//! Source spell documents.
//!
//! A `Spell` is the compendium copy of a spell, addressed by its canonical
//! UUID. Actors never hold these directly; they hold [`super::OwnedSpell`]
//! copies that point back here through `source_uuid`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{PackId, SpellUuid};

/// A spell as it exists in a compendium pack.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Spell {
    /// Canonical compendium UUID
    pub uuid: SpellUuid,
    /// Display name of the spell
    pub name: String,
    /// Spell level (cantrip = 0)
    pub level: SpellLevel,
    /// School key (e.g. "evo", "nec")
    #[serde(default)]
    pub school: Option<String>,
    /// How long it takes to cast
    #[serde(default = "CastingTime::action")]
    pub activation: CastingTime,
    /// Range of the spell
    #[serde(default)]
    pub range: SpellRange,
    /// How long the spell lasts
    #[serde(default)]
    pub duration: SpellDuration,
    /// Required components (verbal, somatic, material)
    #[serde(default)]
    pub components: SpellComponents,
    /// Flags such as ritual or concentration
    #[serde(default)]
    pub properties: BTreeSet<SpellProperty>,
    /// Damage type labels (e.g. "fire")
    #[serde(default)]
    pub damage_types: Vec<String>,
    /// Conditions the spell can inflict (e.g. "frightened")
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Whether the spell calls for a saving throw
    #[serde(default)]
    pub requires_save: bool,
}

impl Spell {
    /// Minimal spell record; the remaining fields take their defaults.
    pub fn new(uuid: impl Into<SpellUuid>, name: impl Into<String>, level: u8) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            level: SpellLevel::from(level),
            school: None,
            activation: CastingTime::action(),
            range: SpellRange::default(),
            duration: SpellDuration::default(),
            components: SpellComponents::default(),
            properties: BTreeSet::new(),
            damage_types: Vec::new(),
            conditions: Vec::new(),
            requires_save: false,
        }
    }

    pub fn with_school(mut self, school: impl Into<String>) -> Self {
        self.school = Some(school.into());
        self
    }

    pub fn with_property(mut self, property: SpellProperty) -> Self {
        self.properties.insert(property);
        self
    }

    pub fn with_range(mut self, range: SpellRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_activation(mut self, activation: CastingTime) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_components(mut self, components: SpellComponents) -> Self {
        self.components = components;
        self
    }

    pub fn with_damage_type(mut self, damage: impl Into<String>) -> Self {
        self.damage_types.push(damage.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn with_save(mut self) -> Self {
        self.requires_save = true;
        self
    }

    pub fn is_cantrip(&self) -> bool {
        self.level.is_cantrip()
    }

    pub fn is_ritual(&self) -> bool {
        self.properties.contains(&SpellProperty::Ritual)
    }

    pub fn requires_concentration(&self) -> bool {
        self.properties.contains(&SpellProperty::Concentration)
    }

    pub fn material_consumed(&self) -> bool {
        self.components
            .material
            .as_ref()
            .is_some_and(|material| material.consumed)
    }

    /// Pack the spell was indexed from.
    pub fn pack_id(&self) -> Option<PackId> {
        self.uuid.pack_id()
    }
}

/// Spell property flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpellProperty {
    Ritual,
    Concentration,
    /// Properties this engine does not interpret
    #[serde(other)]
    Other,
}

/// Spell level representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum SpellLevel {
    /// Cantrip (level 0 spell, can be cast at will)
    Cantrip,
    /// Leveled spell (1-9)
    Level(u8),
}

impl SpellLevel {
    /// Convert to numeric level (cantrip = 0).
    pub fn as_number(&self) -> u8 {
        match self {
            SpellLevel::Cantrip => 0,
            SpellLevel::Level(n) => *n,
        }
    }

    /// Check if this is a cantrip.
    pub fn is_cantrip(&self) -> bool {
        matches!(self, SpellLevel::Cantrip)
    }
}

impl From<u8> for SpellLevel {
    fn from(level: u8) -> Self {
        if level == 0 {
            SpellLevel::Cantrip
        } else {
            SpellLevel::Level(level.min(9))
        }
    }
}

impl From<SpellLevel> for u8 {
    fn from(level: SpellLevel) -> Self {
        level.as_number()
    }
}

/// How long it takes to cast a spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastingTime {
    /// The amount of time
    pub amount: u32,
    /// The unit of time
    pub unit: CastingTimeUnit,
    /// Additional condition (e.g., "which you take when..." for reactions)
    #[serde(default)]
    pub condition: Option<String>,
}

/// Unit of time for casting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CastingTimeUnit {
    Action,
    #[serde(alias = "bonus")]
    BonusAction,
    Reaction,
    Minute,
    Hour,
    /// Special timing (e.g., "special", "see text")
    Special,
}

impl CastingTimeUnit {
    /// Short key used by the casting-time filter.
    pub fn key(&self) -> &'static str {
        match self {
            CastingTimeUnit::Action => "action",
            CastingTimeUnit::BonusAction => "bonus",
            CastingTimeUnit::Reaction => "reaction",
            CastingTimeUnit::Minute => "minute",
            CastingTimeUnit::Hour => "hour",
            CastingTimeUnit::Special => "special",
        }
    }
}

impl CastingTime {
    /// Create a standard action casting time.
    pub fn action() -> Self {
        Self {
            amount: 1,
            unit: CastingTimeUnit::Action,
            condition: None,
        }
    }

    /// Create a bonus action casting time.
    pub fn bonus_action() -> Self {
        Self {
            amount: 1,
            unit: CastingTimeUnit::BonusAction,
            condition: None,
        }
    }

    /// Create a casting time in minutes.
    pub fn minutes(amount: u32) -> Self {
        Self {
            amount,
            unit: CastingTimeUnit::Minute,
            condition: None,
        }
    }

    /// Create a casting time in hours.
    pub fn hours(amount: u32) -> Self {
        Self {
            amount,
            unit: CastingTimeUnit::Hour,
            condition: None,
        }
    }

    /// `type:value` tuple as used by the casting-time filter, e.g. `minute:10`.
    pub fn filter_key(&self) -> String {
        format!("{}:{}", self.unit.key(), self.amount)
    }
}

/// Distance units a spell range can be expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RangeUnit {
    #[serde(rename = "ft")]
    Feet,
    #[serde(rename = "mi")]
    Miles,
    #[serde(rename = "m")]
    Meters,
    #[serde(rename = "km")]
    Kilometers,
    #[serde(rename = "self")]
    SelfOnly,
    Touch,
    /// Special range (see spell description)
    #[default]
    #[serde(rename = "spec")]
    Special,
    /// Unlimited
    Any,
}

/// Range of a spell.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellRange {
    #[serde(default)]
    pub value: Option<u32>,
    pub units: RangeUnit,
}

const FEET_PER_MILE: u32 = 5280;
const METERS_PER_FOOT: f64 = 0.3048;

impl SpellRange {
    /// Create a touch range.
    pub fn touch() -> Self {
        Self {
            value: None,
            units: RangeUnit::Touch,
        }
    }

    /// Create a range in feet.
    pub fn feet(distance: u32) -> Self {
        Self {
            value: Some(distance),
            units: RangeUnit::Feet,
        }
    }

    /// Create a range in miles.
    pub fn miles(distance: u32) -> Self {
        Self {
            value: Some(distance),
            units: RangeUnit::Miles,
        }
    }

    /// Distance in feet. Self, touch and special ranges count as 0;
    /// unlimited range saturates.
    pub fn in_feet(&self) -> u32 {
        let value = self.value.unwrap_or(0);
        match self.units {
            RangeUnit::Feet => value,
            RangeUnit::Miles => value.saturating_mul(FEET_PER_MILE),
            RangeUnit::Meters => (f64::from(value) / METERS_PER_FOOT).round() as u32,
            RangeUnit::Kilometers => (f64::from(value) * 1000.0 / METERS_PER_FOOT).round() as u32,
            RangeUnit::SelfOnly | RangeUnit::Touch | RangeUnit::Special => 0,
            RangeUnit::Any => u32::MAX,
        }
    }

    /// Distance in whole meters, as displayed under metric settings.
    pub fn in_meters(&self) -> u32 {
        let feet = self.in_feet();
        if feet == u32::MAX {
            return u32::MAX;
        }
        (f64::from(feet) * METERS_PER_FOOT).round() as u32
    }
}

/// Spell components (what's required to cast).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellComponents {
    /// Requires verbal component
    #[serde(default)]
    pub verbal: bool,
    /// Requires somatic component
    #[serde(default)]
    pub somatic: bool,
    /// Material component details
    #[serde(default)]
    pub material: Option<MaterialComponent>,
}

impl SpellComponents {
    /// Create components with all three.
    pub fn all(material: impl Into<String>) -> Self {
        Self {
            verbal: true,
            somatic: true,
            material: Some(MaterialComponent {
                description: material.into(),
                consumed: false,
                cost: None,
            }),
        }
    }

    /// Mark the material component as consumed.
    pub fn consumed(mut self) -> Self {
        if let Some(material) = self.material.as_mut() {
            material.consumed = true;
        }
        self
    }
}

/// Material component for a spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialComponent {
    /// Description of the material
    pub description: String,
    /// Whether the material is consumed by the spell
    #[serde(default)]
    pub consumed: bool,
    /// Cost in gold pieces (if any)
    #[serde(default)]
    pub cost: Option<u32>,
}

/// How long a spell's effects last.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SpellDuration {
    /// Effect happens instantly
    #[default]
    Instantaneous,
    /// Lasts for a specific amount of time
    Timed { amount: u32, unit: DurationUnit },
    /// Until dispelled or specific condition
    UntilDispelled { trigger: Option<String> },
    /// Special duration (see spell description)
    Special { description: String },
}

/// Unit of time for duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DurationUnit {
    Round,
    Minute,
    Hour,
    Day,
}
