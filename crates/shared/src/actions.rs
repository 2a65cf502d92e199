//! User actions dispatched from the spellbook UI.

use serde::{Deserialize, Serialize};
use spellbook_domain::{ClassIdentifier, ItemId, LoadoutId, SpellFilter, SpellUuid};

/// Every interaction the spellbook handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    ToggleSidebar,
    #[serde(rename_all = "camelCase")]
    SelectTab { tab: String },
    FilterSpells { filter: SpellFilter },
    ToggleLevel { level: u8 },
    #[serde(rename_all = "camelCase")]
    TogglePrepare {
        class_identifier: ClassIdentifier,
        uuid: SpellUuid,
        checked: bool,
    },
    #[serde(rename_all = "camelCase")]
    LearnSpell {
        class_identifier: ClassIdentifier,
        uuid: SpellUuid,
        #[serde(default)]
        free: bool,
    },
    #[serde(rename_all = "camelCase")]
    LearnFromScroll {
        class_identifier: ClassIdentifier,
        scroll_item_id: ItemId,
    },
    /// Revert the most recent scroll learning
    UndoScrollLearning,
    #[serde(rename_all = "camelCase")]
    SaveLoadout {
        class_identifier: ClassIdentifier,
        name: String,
        #[serde(default)]
        description: String,
    },
    ApplyLoadout { id: LoadoutId },
    RenameLoadout { id: LoadoutId, name: String },
    DeleteLoadout { id: LoadoutId },
    /// Discard unsaved preparation changes
    Reset,
    /// Re-read the actor after it changed outside the spellbook
    Refresh,
}

impl Action {
    /// Actions that only change presentation and never touch the actor.
    pub fn is_presentational(&self) -> bool {
        matches!(
            self,
            Action::ToggleSidebar
                | Action::SelectTab { .. }
                | Action::FilterSpells { .. }
                | Action::ToggleLevel { .. }
        )
    }
}
