//! Data types exchanged across the host ports.

use serde::{Deserialize, Serialize};
use spellbook_domain::{
    ActorId, ClassIdentifier, ConsumableItem, ItemId, NewOwnedSpell, OwnedSpellPatch, PackId,
    SpellUuid,
};

/// Flag namespace the spellbook writes under.
pub const FLAG_NAMESPACE: &str = "spell-book";

// =============================================================================
// Compendium Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackKind {
    Item,
    JournalEntry,
    #[serde(other)]
    Other,
}

/// A compendium pack as the host indexes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackInfo {
    pub id: PackId,
    pub label: String,
    pub kind: PackKind,
    /// Package (module or system) that ships the pack
    pub package: String,
    /// Top-level folder in the compendium sidebar
    #[serde(default)]
    pub folder: Option<String>,
}

/// A journal page listing the spells of a class or subclass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellListPage {
    pub uuid: String,
    pub name: String,
    /// `system.identifier` of the page
    pub identifier: ClassIdentifier,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub spells: Vec<SpellUuid>,
}

// =============================================================================
// Actor Mutation Types
// =============================================================================

/// Embedded documents the engine creates on an actor.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedDocument {
    Spell(NewOwnedSpell),
    Consumable(ConsumableItem),
}

/// Embedded document updates.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbeddedPatch {
    Spell(OwnedSpellPatch),
    Quantity { id: ItemId, quantity: u32 },
}

impl EmbeddedPatch {
    pub fn id(&self) -> &ItemId {
        match self {
            EmbeddedPatch::Spell(patch) => &patch.id,
            EmbeddedPatch::Quantity { id, .. } => id,
        }
    }
}

/// Top-level actor update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorPatch {
    pub gold: Option<u32>,
}

impl ActorPatch {
    pub fn gold(gp: u32) -> Self {
        Self { gold: Some(gp) }
    }
}

// =============================================================================
// Flag Types
// =============================================================================

/// Where a flag is stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlagScope {
    Actor(ActorId),
    /// The current user
    User,
}
