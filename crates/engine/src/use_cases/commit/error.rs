use crate::infrastructure::ports::RepoError;

#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Actor not found")]
    ActorNotFound,
    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),
}
