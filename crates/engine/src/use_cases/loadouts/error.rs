use spellbook_domain::{DomainError, LoadoutId};

use crate::infrastructure::ports::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum LoadoutError {
    #[error("Loadout not found: {0}")]
    NotFound(LoadoutId),
    #[error("Validation error: {0}")]
    Validation(#[from] DomainError),
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
