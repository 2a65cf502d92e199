use spellbook_domain::{DomainError, SpellUuid};

use crate::infrastructure::ports::RepoError;
use crate::use_cases::wizard::WizardError;

#[derive(Debug, thiserror::Error)]
pub enum ScrollError {
    #[error("Actor not found")]
    ActorNotFound,
    #[error("Scroll spell {0} could not be resolved")]
    SpellNotFound(SpellUuid),
    #[error("Spellbook error: {0}")]
    Wizard(#[from] WizardError),
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
