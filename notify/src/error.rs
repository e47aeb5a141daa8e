use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("recipient {0} refused the message")]
    Rejected(String),

    #[error("dispatcher is no longer running")]
    DispatcherClosed,
}

impl From<NotifyError> for rewards_types::RewardsError {
    fn from(e: NotifyError) -> Self {
        rewards_types::RewardsError::ExternalService(e.to_string())
    }
}
