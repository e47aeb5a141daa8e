//! Error taxonomy shared by every core operation.
//!
//! Each engine returns [`RewardsError`]. Callers branch on [`RewardsError::kind`];
//! the message carries the precise reason shown to the user.

use thiserror::Error;

/// The stable classification of a failed operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Validation,
    Forbidden,
    ExternalService,
    Store,
}

/// Common error type for the rewards ledger.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RewardsError {
    /// The referenced record does not exist, or is not in the state the
    /// operation expects (e.g. a pending pair that was already decided).
    #[error("not found: {0}")]
    NotFound(String),

    /// Structurally valid request that violates a lifecycle invariant.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Malformed input.
    #[error("{0}")]
    Validation(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A collaborator (notification transport) failed. Never blocks a
    /// committed state transition.
    #[error("external service failure: {0}")]
    ExternalService(String),

    /// The store failed or could not be reached; the outcome of the write is
    /// unknown and the caller should re-read before retrying.
    #[error("storage failure: {0}")]
    Store(String),
}

impl RewardsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::ExternalService(_) => ErrorKind::ExternalService,
            Self::Store(_) => ErrorKind::Store,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid_state(why: impl Into<String>) -> Self {
        Self::InvalidState(why.into())
    }

    pub fn validation(why: impl Into<String>) -> Self {
        Self::Validation(why.into())
    }

    /// Whether the outcome of the failed call is unknown (the write may have
    /// landed). Only storage failures qualify.
    pub fn is_unknown_outcome(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
