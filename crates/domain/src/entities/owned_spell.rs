//! Spells attached to an actor.

use serde::{Deserialize, Serialize};

use crate::ids::{ClassIdentifier, ItemId, SpellUuid};

use super::spell::{Spell, SpellLevel};

/// How an owned spell became castable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PreparationMode {
    Prepared,
    Pact,
    Ritual,
    #[serde(alias = "atWill")]
    Atwill,
    Innate,
    Always,
    Granted,
}

impl PreparationMode {
    /// Modes the user never toggles; they are always prepared and never
    /// count against a class maximum.
    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            PreparationMode::Always
                | PreparationMode::Granted
                | PreparationMode::Atwill
                | PreparationMode::Innate
        )
    }

    /// Modes the commit pipeline owns and may delete.
    pub fn is_managed(&self) -> bool {
        matches!(
            self,
            PreparationMode::Prepared | PreparationMode::Pact | PreparationMode::Ritual
        )
    }
}

/// Kind of document that granted an owned spell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceItemKind {
    Feat,
    Class,
    Subclass,
    Race,
    Background,
    #[serde(other)]
    Other,
}

/// Reference to the item that granted an owned spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceItemRef {
    #[serde(rename = "type")]
    pub kind: SourceItemKind,
    pub uuid: String,
}

/// A spell item on the actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedSpell {
    /// Item id on the actor (not a UUID)
    pub id: ItemId,
    pub name: String,
    pub level: SpellLevel,
    /// Compendium UUID this item was copied from
    #[serde(default)]
    pub source_id: Option<SpellUuid>,
    /// Class owning this preparation slot
    #[serde(default)]
    pub source_class: Option<ClassIdentifier>,
    pub preparation_mode: PreparationMode,
    #[serde(default)]
    pub prepared: bool,
    #[serde(default)]
    pub source_item: Option<SourceItemRef>,
    #[serde(default)]
    pub ritual: bool,
}

impl OwnedSpell {
    /// Counts against the owning class's prepared maximum. Pact spells are
    /// the warlock's equivalent of prepared spells.
    pub fn counts_toward_maximum(&self) -> bool {
        matches!(
            self.preparation_mode,
            PreparationMode::Prepared | PreparationMode::Pact
        ) && self.prepared
            && !self.level.is_cantrip()
    }

    pub fn is_cantrip(&self) -> bool {
        self.level.is_cantrip()
    }

    /// Granted by a feat rather than selected by the user.
    pub fn is_granted(&self) -> bool {
        self.source_item
            .as_ref()
            .is_some_and(|item| item.kind == SourceItemKind::Feat)
    }

    pub fn belongs_to(&self, class: &ClassIdentifier) -> bool {
        self.source_class.as_ref() == Some(class)
    }

    pub fn matches_source(&self, uuid: &SpellUuid) -> bool {
        self.source_id.as_ref() == Some(uuid)
    }

    /// Effective castability regardless of how the flag is stored.
    pub fn is_effectively_prepared(&self) -> bool {
        self.prepared || self.preparation_mode.is_locked()
    }
}

/// A spell item the commit pipeline asks the host to create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOwnedSpell {
    pub source_id: SpellUuid,
    pub name: String,
    pub level: SpellLevel,
    pub source_class: ClassIdentifier,
    pub preparation_mode: PreparationMode,
    pub prepared: bool,
    pub ritual: bool,
}

impl NewOwnedSpell {
    pub fn from_spell(
        spell: &Spell,
        class: ClassIdentifier,
        mode: PreparationMode,
        prepared: bool,
    ) -> Self {
        Self {
            source_id: spell.uuid.clone(),
            name: spell.name.clone(),
            level: spell.level,
            source_class: class,
            preparation_mode: mode,
            prepared,
            ritual: spell.is_ritual(),
        }
    }
}

/// Field patch for an existing owned spell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedSpellPatch {
    pub id: ItemId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepared: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preparation_mode: Option<PreparationMode>,
}

impl OwnedSpellPatch {
    pub fn prepared(id: ItemId, prepared: bool) -> Self {
        Self {
            id,
            prepared: Some(prepared),
            preparation_mode: None,
        }
    }

    pub fn with_mode(mut self, mode: PreparationMode) -> Self {
        self.preparation_mode = Some(mode);
        self
    }

    /// Apply this patch to an owned spell.
    pub fn apply_to(&self, spell: &mut OwnedSpell) {
        if let Some(prepared) = self.prepared {
            spell.prepared = prepared;
        }
        if let Some(mode) = self.preparation_mode {
            spell.preparation_mode = mode;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(mode: PreparationMode, prepared: bool, level: u8) -> OwnedSpell {
        OwnedSpell {
            id: ItemId::new("item1"),
            name: "Shield".into(),
            level: SpellLevel::from(level),
            source_id: Some(SpellUuid::new("Compendium.dnd5e.spells.Item.shield")),
            source_class: Some(ClassIdentifier::new("wizard")),
            preparation_mode: mode,
            prepared,
            source_item: None,
            ritual: false,
        }
    }

    #[test]
    fn locked_modes() {
        assert!(PreparationMode::Always.is_locked());
        assert!(PreparationMode::Granted.is_locked());
        assert!(PreparationMode::Atwill.is_locked());
        assert!(PreparationMode::Innate.is_locked());
        assert!(!PreparationMode::Prepared.is_locked());
        assert!(!PreparationMode::Pact.is_locked());
        assert!(!PreparationMode::Ritual.is_locked());
    }

    #[test]
    fn only_prepared_leveled_spells_count() {
        assert!(owned(PreparationMode::Prepared, true, 1).counts_toward_maximum());
        assert!(!owned(PreparationMode::Prepared, false, 1).counts_toward_maximum());
        assert!(!owned(PreparationMode::Prepared, true, 0).counts_toward_maximum());
        assert!(owned(PreparationMode::Pact, true, 1).counts_toward_maximum());
        assert!(!owned(PreparationMode::Always, true, 1).counts_toward_maximum());
        assert!(!owned(PreparationMode::Ritual, false, 1).counts_toward_maximum());
    }

    #[test]
    fn granted_by_feat() {
        let mut spell = owned(PreparationMode::Innate, true, 1);
        assert!(!spell.is_granted());
        spell.source_item = Some(SourceItemRef {
            kind: SourceItemKind::Feat,
            uuid: "Item.feat1".into(),
        });
        assert!(spell.is_granted());
    }

    #[test]
    fn patch_applies_fields() {
        let mut spell = owned(PreparationMode::Ritual, false, 1);
        OwnedSpellPatch::prepared(spell.id.clone(), true)
            .with_mode(PreparationMode::Prepared)
            .apply_to(&mut spell);
        assert!(spell.prepared);
        assert_eq!(spell.preparation_mode, PreparationMode::Prepared);
    }

    #[test]
    fn mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&PreparationMode::Atwill).unwrap(),
            "\"atwill\""
        );
    }
}
