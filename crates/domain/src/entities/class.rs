//! Per-character class state as exposed by the host.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ClassIdentifier, PackId};

/// Spellcasting progression of a class or subclass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpellProgression {
    #[default]
    None,
    Full,
    Half,
    Third,
    Pact,
    Artificer,
    Leveled,
    #[serde(other)]
    Other,
}

impl SpellProgression {
    pub fn is_caster(&self) -> bool {
        !matches!(self, SpellProgression::None)
    }
}

/// A named numeric track indexed by class level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaleTrack {
    values: BTreeMap<u8, u32>,
}

impl ScaleTrack {
    pub fn new(values: impl IntoIterator<Item = (u8, u32)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    /// Value in effect at `level`: the entry with the greatest level not above it.
    pub fn value_at(&self, level: u8) -> Option<u32> {
        self.values
            .range(..=level)
            .next_back()
            .map(|(_, value)| *value)
    }
}

/// Reference to the class item the host built this class from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassItemRef {
    pub uuid: String,
    /// Compendium pack the class item was sourced from
    #[serde(default)]
    pub pack: Option<PackId>,
    /// Top-level folder of that pack
    #[serde(default)]
    pub folder: Option<String>,
}

/// Subclass that may contribute its own progression and scale values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subclass {
    pub identifier: ClassIdentifier,
    pub name: String,
    #[serde(default)]
    pub progression: SpellProgression,
    #[serde(default)]
    pub scale_values: BTreeMap<String, ScaleTrack>,
}

/// A class on a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellcastingClass {
    pub identifier: ClassIdentifier,
    pub name: String,
    pub level: u8,
    #[serde(default)]
    pub progression: SpellProgression,
    /// Preparation maximum as evaluated by the host's formula
    #[serde(default)]
    pub max_prepared: u32,
    #[serde(default)]
    pub scale_values: BTreeMap<String, ScaleTrack>,
    #[serde(default)]
    pub subclass: Option<Subclass>,
    #[serde(default)]
    pub source_item: Option<ClassItemRef>,
}

impl SpellcastingClass {
    pub fn new(identifier: impl AsRef<str>, name: impl Into<String>, level: u8) -> Self {
        Self {
            identifier: ClassIdentifier::new(identifier),
            name: name.into(),
            level,
            progression: SpellProgression::None,
            max_prepared: 0,
            scale_values: BTreeMap::new(),
            subclass: None,
            source_item: None,
        }
    }

    pub fn with_progression(mut self, progression: SpellProgression) -> Self {
        self.progression = progression;
        self
    }

    pub fn with_max_prepared(mut self, max: u32) -> Self {
        self.max_prepared = max;
        self
    }

    pub fn with_scale(mut self, key: impl Into<String>, track: ScaleTrack) -> Self {
        self.scale_values.insert(key.into(), track);
        self
    }

    pub fn with_subclass(mut self, subclass: Subclass) -> Self {
        self.subclass = Some(subclass);
        self
    }

    pub fn with_source_item(mut self, source: ClassItemRef) -> Self {
        self.source_item = Some(source);
        self
    }

    /// Progression of the class, or of its subclass when the class itself has none.
    pub fn effective_progression(&self) -> SpellProgression {
        if self.progression.is_caster() {
            return self.progression;
        }
        self.subclass
            .as_ref()
            .map(|subclass| subclass.progression)
            .unwrap_or_default()
    }

    pub fn is_spellcaster(&self) -> bool {
        self.effective_progression().is_caster()
    }

    pub fn is_pact_caster(&self) -> bool {
        self.effective_progression() == SpellProgression::Pact
    }

    /// First defined value among `keys`, probing class scale values before
    /// the subclass's.
    pub fn scale_value(&self, keys: &[String]) -> Option<u32> {
        let subclass_scales = self.subclass.as_ref().map(|s| &s.scale_values);
        keys.iter().find_map(|key| {
            self.scale_values
                .get(key)
                .or_else(|| subclass_scales.and_then(|scales| scales.get(key)))
                .and_then(|track| track.value_at(self.level))
        })
    }
}
