//! View models projected by the spellbook state for the host UI.

use serde::{Deserialize, Serialize};
use spellbook_domain::{ClassIdentifier, ItemId, PreparationMode, SpellUuid, SwapWindow};

/// Whole spellbook for one actor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellbookView {
    pub actor_id: String,
    pub actor_name: String,
    pub tabs: Vec<TabView>,
    pub active_tab: Option<String>,
    #[serde(default)]
    pub sidebar_collapsed: bool,
    /// Unsaved preparation changes exist
    pub dirty: bool,
    #[serde(default)]
    pub scrolls: Vec<LearnableScroll>,
    #[serde(default)]
    pub notices: Vec<UserNotice>,
}

impl SpellbookView {
    pub fn tab(&self, id: &str) -> Option<&TabView> {
        self.tabs.iter().find(|tab| tab.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TabKind {
    /// Preparation tab for a spellcasting class
    Class,
    /// Known spells of a class keeping a spellbook
    Wizardbook,
}

/// One tab of the spellbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabView {
    pub id: String,
    pub kind: TabKind,
    pub class_identifier: ClassIdentifier,
    pub title: String,
    pub spell_levels: Vec<LevelGroup>,
    pub spell_preparation: PreparationCount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cantrips: Option<PreparationCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wizard_stats: Option<WizardStats>,
    pub spell_window: SwapWindow,
    pub cantrip_window: SwapWindow,
}

impl TabView {
    pub fn spells(&self) -> impl Iterator<Item = &SpellEntryView> {
        self.spell_levels.iter().flat_map(|group| group.spells.iter())
    }

    pub fn spell(&self, uuid: &SpellUuid) -> Option<&SpellEntryView> {
        self.spells().find(|spell| &spell.uuid == uuid)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelGroup {
    pub level: u8,
    pub name: String,
    pub collapsed: bool,
    pub spells: Vec<SpellEntryView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparationCount {
    pub current: u32,
    pub max: u32,
}

impl PreparationCount {
    pub fn is_at_max(&self) -> bool {
        self.current >= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardStats {
    pub total_known: u32,
    pub free_remaining: u32,
    pub max_free: u32,
    pub is_at_max: bool,
}

/// A spell row with its ownership annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellEntryView {
    pub uuid: SpellUuid,
    pub name: String,
    pub level: u8,
    #[serde(default)]
    pub school: Option<String>,
    pub prepared: bool,
    pub is_owned: bool,
    pub is_granted: bool,
    #[serde(default)]
    pub preparation_mode: Option<PreparationMode>,
    #[serde(default)]
    pub in_wizard_spellbook: Option<bool>,
    pub ritual_castable: bool,
    /// Why the checkbox is disabled, when it is
    #[serde(default)]
    pub disabled_reason: Option<String>,
    /// Prepared state differs from what is saved
    pub pending: bool,
}

/// A scroll the actor can learn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnableScroll {
    pub scroll_item_id: ItemId,
    pub spell_uuid: SpellUuid,
    pub name: String,
    pub level: u8,
    pub cost: u32,
    pub time: u32,
    pub already_known: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

/// Message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl UserNotice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warn,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
