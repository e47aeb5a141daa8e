//! Withdrawal request storage trait.

use crate::StoreError;
use async_trait::async_trait;
use rewards_types::{
    Amount, Timestamp, UserId, WithdrawalId, WithdrawalRequest, WithdrawalStatus,
};

/// A withdrawal request before the store has assigned its id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewWithdrawal {
    pub user_id: UserId,
    pub username: Option<String>,
    pub amount: Amount,
    pub wallet_address: String,
    pub balance_snapshot: Amount,
    pub created_at: Timestamp,
}

impl NewWithdrawal {
    /// The stored record: always starts `Pending` and undecided.
    pub fn into_request(self, id: WithdrawalId) -> WithdrawalRequest {
        WithdrawalRequest {
            id,
            user_id: self.user_id,
            username: self.username,
            amount: self.amount,
            wallet_address: self.wallet_address,
            balance_snapshot: self.balance_snapshot,
            status: WithdrawalStatus::Pending,
            created_at: self.created_at,
            decided_at: None,
        }
    }
}

/// Compare-and-set the status of `record`, shared by every backend.
///
/// Refuses any move that is not a legal lifecycle transition, so even a
/// buggy caller cannot reopen a decided request.
pub fn transition(
    record: &mut WithdrawalRequest,
    expected: WithdrawalStatus,
    next: WithdrawalStatus,
    decided_at: Timestamp,
) -> Result<(), StoreError> {
    if record.status != expected {
        return Err(StoreError::StatusMismatch {
            id: record.id.clone(),
            expected,
            actual: record.status,
        });
    }
    if !expected.can_transition_to(next) {
        return Err(StoreError::IllegalTransition {
            from: expected,
            to: next,
        });
    }
    record.status = next;
    record.decided_at = Some(decided_at);
    Ok(())
}

#[async_trait]
pub trait WithdrawalStore: Send + Sync {
    /// Store a new pending request under a freshly issued id.
    async fn insert_withdrawal(&self, new: NewWithdrawal) -> Result<WithdrawalRequest, StoreError>;

    async fn get_withdrawal(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, StoreError>;

    /// Atomically move the request from `expected` to `next`, stamping
    /// `decided_at`. See [`transition`].
    async fn transition_withdrawal(
        &self,
        id: &WithdrawalId,
        expected: WithdrawalStatus,
        next: WithdrawalStatus,
        decided_at: Timestamp,
    ) -> Result<WithdrawalRequest, StoreError>;

    /// All requests of one user, in no particular order.
    async fn withdrawals_for_user(&self, user: &UserId)
        -> Result<Vec<WithdrawalRequest>, StoreError>;

    /// All requests currently in `status`, in no particular order.
    async fn withdrawals_with_status(
        &self,
        status: WithdrawalStatus,
    ) -> Result<Vec<WithdrawalRequest>, StoreError>;

    /// Bulk-load an already-normalized request, overwriting any existing
    /// record with the same id.
    async fn import_withdrawal(&self, request: &WithdrawalRequest) -> Result<(), StoreError>;
}
