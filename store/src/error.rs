use rewards_types::{RewardsError, WithdrawalId, WithdrawalStatus};
use thiserror::Error;

use crate::UserGuard;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// A guard of a [`crate::UserUpdate`] did not hold; nothing was written.
    #[error("update guard failed: {0:?}")]
    GuardFailed(UserGuard),

    /// Compare-and-set on a withdrawal status lost.
    #[error("withdrawal {id} is {actual}, expected {expected}")]
    StatusMismatch {
        id: WithdrawalId,
        expected: WithdrawalStatus,
        actual: WithdrawalStatus,
    },

    #[error("illegal withdrawal transition {from} -> {to}")]
    IllegalTransition {
        from: WithdrawalStatus,
        to: WithdrawalStatus,
    },

    #[error("arithmetic overflow: {0}")]
    Overflow(String),

    /// The update would have broken a document invariant; nothing was written.
    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}

impl From<StoreError> for RewardsError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => RewardsError::NotFound(what),
            StoreError::Duplicate(what) => RewardsError::InvalidState(format!("{what} already exists")),
            e @ (StoreError::GuardFailed(_)
            | StoreError::StatusMismatch { .. }
            | StoreError::IllegalTransition { .. }
            | StoreError::Invariant(_)
            | StoreError::Overflow(_)) => RewardsError::InvalidState(e.to_string()),
            e @ (StoreError::Backend(_)
            | StoreError::Serialization(_)
            | StoreError::Corruption(_)) => RewardsError::Store(e.to_string()),
        }
    }
}
