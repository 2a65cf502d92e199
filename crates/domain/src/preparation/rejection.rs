//! Outcomes of preparation checks.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::PreparationMode;
use crate::value_objects::{EnforcementBehavior, SwapKind, SwapMode, SwapWindow};

/// Why a preparation change was refused.
///
/// A rejection is a validation outcome, not a failure. Whether it blocks the
/// change depends on the enforcement behavior in force.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum Rejection {
    #[error("{mode:?} spells are not prepared by choice")]
    Locked { mode: PreparationMode },

    #[error("this class does not select cantrips")]
    CantripsHidden,

    #[error("the spell is not in this class's spellbook")]
    NotInSpellbook,

    #[error("{kind} maximum reached ({current}/{max})")]
    AtMaximum { kind: SwapKind, current: u32, max: u32 },

    #[error("{kind}s can only be swapped {mode}")]
    SwapNotAllowed { kind: SwapKind, mode: SwapMode },

    #[error("the {kind} swap for this window has already been used")]
    SwapExhausted { kind: SwapKind, window: SwapWindow },
}

impl Rejection {
    /// Structural rejections block under every enforcement behavior.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Rejection::Locked { .. } | Rejection::CantripsHidden | Rejection::NotInSpellbook
        )
    }

    pub fn violation(&self) -> Option<ViolationKind> {
        match self {
            Rejection::AtMaximum { .. } => Some(ViolationKind::Overmax),
            Rejection::SwapNotAllowed { kind, .. } | Rejection::SwapExhausted { kind, .. } => {
                Some(match kind {
                    SwapKind::Cantrip => ViolationKind::IllegalCantripSwap,
                    SwapKind::Spell => ViolationKind::IllegalSpellSwap,
                })
            }
            _ => None,
        }
    }
}

/// Rule violations the GM is told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    Overmax,
    IllegalCantripSwap,
    IllegalSpellSwap,
}

/// A check result after applying the enforcement behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    /// Admitted, but the GM is notified on save
    Flagged(Rejection),
    Rejected(Rejection),
}

impl Verdict {
    pub fn under(enforcement: EnforcementBehavior, check: Result<(), Rejection>) -> Self {
        let rejection = match check {
            Ok(()) => return Verdict::Allowed,
            Err(rejection) => rejection,
        };
        if rejection.is_structural() {
            return Verdict::Rejected(rejection);
        }
        match enforcement {
            EnforcementBehavior::Enforced => Verdict::Rejected(rejection),
            EnforcementBehavior::NotifyGm => Verdict::Flagged(rejection),
            EnforcementBehavior::Unenforced => Verdict::Allowed,
        }
    }

    pub fn is_admitted(&self) -> bool {
        !matches!(self, Verdict::Rejected(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Verdict::Allowed => None,
            Verdict::Flagged(rejection) | Verdict::Rejected(rejection) => Some(rejection),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overmax() -> Rejection {
        Rejection::AtMaximum {
            kind: SwapKind::Spell,
            current: 7,
            max: 7,
        }
    }

    #[test]
    fn enforcement_changes_surface_not_predicate() {
        assert_eq!(
            Verdict::under(EnforcementBehavior::Enforced, Err(overmax())),
            Verdict::Rejected(overmax())
        );
        assert_eq!(
            Verdict::under(EnforcementBehavior::NotifyGm, Err(overmax())),
            Verdict::Flagged(overmax())
        );
        assert_eq!(
            Verdict::under(EnforcementBehavior::Unenforced, Err(overmax())),
            Verdict::Allowed
        );
    }

    #[test]
    fn structural_rejections_always_block() {
        for enforcement in [
            EnforcementBehavior::Enforced,
            EnforcementBehavior::NotifyGm,
            EnforcementBehavior::Unenforced,
        ] {
            let verdict = Verdict::under(enforcement, Err(Rejection::NotInSpellbook));
            assert!(!verdict.is_admitted());
        }
    }

    #[test]
    fn violation_kinds() {
        assert_eq!(overmax().violation(), Some(ViolationKind::Overmax));
        let swap = Rejection::SwapNotAllowed {
            kind: SwapKind::Cantrip,
            mode: SwapMode::LevelUp,
        };
        assert_eq!(swap.violation(), Some(ViolationKind::IllegalCantripSwap));
        assert_eq!(Rejection::CantripsHidden.violation(), None);
        assert_eq!(
            serde_json::to_string(&ViolationKind::IllegalSpellSwap).unwrap(),
            "\"illegal-spell-swap\""
        );
    }

    #[test]
    fn messages_name_the_window() {
        let swap = Rejection::SwapNotAllowed {
            kind: SwapKind::Cantrip,
            mode: SwapMode::LongRest,
        };
        assert_eq!(swap.to_string(), "cantrips can only be swapped after a long rest");
    }
}
