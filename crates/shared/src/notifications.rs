//! GM-visible preparation notices.

use serde::{Deserialize, Serialize};
use spellbook_domain::{ClassIdentifier, ViolationKind};

/// Event name the host broadcasts notices under.
pub const PREP_NOTIFY_EVENT: &str = "spell-prep-notify";

/// A rule violation that was admitted under `notifyGM` enforcement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepNotification {
    pub actor_id: String,
    pub class_id: ClassIdentifier,
    pub kind: ViolationKind,
    pub details: PrepNotificationDetails,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepNotificationDetails {
    pub actor_name: String,
    pub class_name: String,
    /// Count after the save, for over-max notices
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Names of the spells involved
    #[serde(default)]
    pub spells: Vec<String>,
}
