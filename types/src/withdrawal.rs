//! Withdrawal requests.

use crate::{Amount, Timestamp, UserId, WithdrawalId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a withdrawal request. Transitions are one-way:
/// `Pending → Approved` or `Pending → Rejected`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn can_transition_to(&self, next: WithdrawalStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved) | (Self::Pending, Self::Rejected)
        )
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// A request to pay part of a balance out to an external wallet.
///
/// Immutable once decided; serves as the audit record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalRequest {
    pub id: WithdrawalId,
    pub user_id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    pub amount: Amount,
    pub wallet_address: String,
    /// Balance at request time, kept for audit only.
    pub balance_snapshot: Amount,
    pub status: WithdrawalStatus,
    pub created_at: Timestamp,
    #[serde(default)]
    pub decided_at: Option<Timestamp>,
}

impl WithdrawalRequest {
    pub fn is_pending(&self) -> bool {
        self.status == WithdrawalStatus::Pending
    }
}
