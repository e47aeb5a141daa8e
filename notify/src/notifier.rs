//! The outbound messaging contract.

use async_trait::async_trait;

use crate::NotifyError;

/// Best-effort delivery of a text message to a chat.
///
/// Implementations wrap a real transport (a bot API, a mail relay); this
/// workspace only ships [`LogNotifier`] and the test double in
/// `rewards-nullables`.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, chat_id: &str, message: &str) -> Result<(), NotifyError>;
}

/// Writes every message to the log instead of sending it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, chat_id: &str, message: &str) -> Result<(), NotifyError> {
        tracing::info!(chat_id, message, "notification");
        Ok(())
    }
}
