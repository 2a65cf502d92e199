//! Leveled spell transition checks.

use crate::entities::PreparationMode;
use crate::value_objects::{ClassRules, SwapKind, SwapWindow};

use super::cantrips::swap_allowed;
use super::rejection::Rejection;

#[derive(Debug, Clone)]
pub struct SpellCheck<'a> {
    pub rules: &'a ClassRules,
    pub mode: Option<PreparationMode>,
    pub checking: bool,
    pub was_prepared: bool,
    pub current_prepared: u32,
    pub max_prepared: u32,
    pub window: &'a SwapWindow,
    pub swaps_used: u32,
    pub initial_selection: bool,
    /// Spellbook membership; `None` when the class keeps no spellbook
    pub in_spellbook: Option<bool>,
}

pub fn can_change_spell_status(check: &SpellCheck<'_>) -> Result<(), Rejection> {
    if let Some(mode) = check.mode.filter(|mode| mode.is_locked()) {
        return Err(Rejection::Locked { mode });
    }

    if check.checking {
        if check.in_spellbook == Some(false) {
            return Err(Rejection::NotInSpellbook);
        }
        // Re-checking a baseline spell still needs a free slot
        if check.current_prepared >= check.max_prepared {
            return Err(Rejection::AtMaximum {
                kind: SwapKind::Spell,
                current: check.current_prepared,
                max: check.max_prepared,
            });
        }
        return Ok(());
    }

    // unchecking something checked earlier this session is an undo
    if !check.was_prepared || check.initial_selection {
        return Ok(());
    }
    swap_allowed(
        SwapKind::Spell,
        check.rules.spell_swapping,
        check.window,
        check.swaps_used,
    )
}
