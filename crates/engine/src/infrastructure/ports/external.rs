//! Notification port to the host UI and the GM channel.

use async_trait::async_trait;
use spellbook_shared::{PrepNotification, UserNotice};

use super::error::RepoError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Show a notice to the current user.
    async fn user_notify(&self, notice: UserNotice);

    /// Broadcast a preparation notice to the GM.
    async fn notify_gm(&self, notification: PrepNotification) -> Result<(), RepoError>;
}
