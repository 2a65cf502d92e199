//! Spellbook session errors.

use spellbook_domain::{ActorId, ClassIdentifier, DomainError, SpellUuid};

use crate::infrastructure::ports::RepoError;
use crate::use_cases::commit::CommitError;
use crate::use_cases::loadouts::LoadoutError;
use crate::use_cases::scrolls::ScrollError;
use crate::use_cases::wizard::WizardError;

/// Errors that can occur in a spellbook session.
///
/// Rule rejections are not errors; they come back as a `Verdict` and a
/// notice.
#[derive(Debug, thiserror::Error)]
pub enum SpellbookError {
    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),
    #[error("Class {0} is not a spellcasting class on this actor")]
    ClassNotFound(ClassIdentifier),
    #[error("Spell {0} is not part of this spellbook")]
    SpellNotFound(SpellUuid),
    #[error("Spellbook error: {0}")]
    Wizard(#[from] WizardError),
    #[error("Scroll error: {0}")]
    Scroll(#[from] ScrollError),
    #[error("Loadout error: {0}")]
    Loadout(#[from] LoadoutError),
    #[error("Commit error: {0}")]
    Commit(#[from] CommitError),
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
