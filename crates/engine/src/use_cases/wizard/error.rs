//! Wizard spellbook errors.

use spellbook_domain::{ClassIdentifier, DomainError, SpellUuid};

use crate::infrastructure::ports::RepoError;

/// Errors that can occur while reading or changing a spellbook.
#[derive(Debug, thiserror::Error)]
pub enum WizardError {
    #[error("Actor not found")]
    ActorNotFound,
    #[error("Class {0} not found on actor")]
    ClassNotFound(ClassIdentifier),
    #[error("Spell {0} could not be resolved")]
    SpellNotFound(SpellUuid),
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}

impl WizardError {
    /// Gold shortfall, when that is what failed.
    pub fn insufficient_gold(&self) -> Option<(u32, u32)> {
        match self {
            WizardError::Validation(DomainError::InsufficientGold { needed, available }) => {
                Some((*needed, *available))
            }
            _ => None,
        }
    }
}
