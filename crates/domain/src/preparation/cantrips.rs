//! Cantrip transition checks.

use crate::entities::PreparationMode;
use crate::value_objects::{ClassRules, SwapKind, SwapWindow};

use super::rejection::Rejection;

/// Everything the cantrip check needs to know about one toggle.
#[derive(Debug, Clone)]
pub struct CantripCheck<'a> {
    pub rules: &'a ClassRules,
    /// Mode of the owned cantrip, if the actor has one
    pub mode: Option<PreparationMode>,
    pub checking: bool,
    /// Prepared when the session opened
    pub was_prepared: bool,
    /// Count shown in the UI before this toggle
    pub current_count: u32,
    pub max_allowed: u32,
    pub window: &'a SwapWindow,
    /// Originally prepared cantrips already removed this session
    pub swaps_used: u32,
    /// The class had no cantrips when the session opened
    pub initial_selection: bool,
}

pub fn can_change_cantrip_status(check: &CantripCheck<'_>) -> Result<(), Rejection> {
    if !check.rules.cantrips_visible() {
        return Err(Rejection::CantripsHidden);
    }
    if let Some(mode) = check.mode.filter(|mode| mode.is_locked()) {
        return Err(Rejection::Locked { mode });
    }

    if check.checking {
        if check.current_count >= check.max_allowed {
            return Err(Rejection::AtMaximum {
                kind: SwapKind::Cantrip,
                current: check.current_count,
                max: check.max_allowed,
            });
        }
        return Ok(());
    }

    if !check.was_prepared || check.initial_selection {
        return Ok(());
    }
    swap_allowed(
        SwapKind::Cantrip,
        check.rules.cantrip_swapping,
        check.window,
        check.swaps_used,
    )
}

/// One swap per open window.
pub(crate) fn swap_allowed(
    kind: SwapKind,
    mode: crate::value_objects::SwapMode,
    window: &SwapWindow,
    swaps_used: u32,
) -> Result<(), Rejection> {
    if !window.is_open() {
        return Err(Rejection::SwapNotAllowed { kind, mode });
    }
    if swaps_used >= 1 {
        return Err(Rejection::SwapExhausted {
            kind,
            window: window.clone(),
        });
    }
    Ok(())
}
