//! Loadout entity - a named preparation preset for one class.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::{ClassIdentifier, LoadoutId, SpellUuid};

use super::actor::Actor;

/// A saved set of prepared spells for a class.
///
/// Only leveled spells the user prepares are captured. Cantrips, locked modes
/// and rituals are never part of a loadout and applying one never touches them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loadout {
    pub id: LoadoutId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub class_identifier: ClassIdentifier,
    pub spell_configuration: Vec<SpellUuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loadout {
    pub fn new(
        name: impl Into<String>,
        class_identifier: ClassIdentifier,
        spell_configuration: Vec<SpellUuid>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = validated_name(name.into())?;
        Ok(Self {
            id: LoadoutId::new(),
            name,
            description: String::new(),
            class_identifier,
            spell_configuration: dedup(spell_configuration),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn rename(&mut self, name: impl Into<String>, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.name = validated_name(name.into())?;
        self.updated_at = now;
        Ok(())
    }

    pub fn contains(&self, uuid: &SpellUuid) -> bool {
        self.spell_configuration.contains(uuid)
    }

    /// Capture the user-prepared leveled spells of a class.
    pub fn capture(actor: &Actor, class: &ClassIdentifier) -> Vec<SpellUuid> {
        let mut captured: Vec<SpellUuid> = actor
            .class_spells(class)
            .filter(|spell| spell.counts_toward_maximum())
            .filter_map(|spell| spell.source_id.clone())
            .collect();
        captured.sort();
        captured.dedup();
        captured
    }
}

fn validated_name(name: String) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("Loadout name cannot be empty"));
    }
    Ok(trimmed.to_string())
}

fn dedup(uuids: Vec<SpellUuid>) -> Vec<SpellUuid> {
    let mut seen = std::collections::HashSet::new();
    uuids
        .into_iter()
        .filter(|uuid| seen.insert(uuid.clone()))
        .collect()
}
