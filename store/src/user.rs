//! User account storage trait and the single-document update language.

use crate::StoreError;
use async_trait::async_trait;
use rewards_types::{Amount, PendingSnapshot, TaskId, UserAccount, UserId, WithdrawalId};

/// A precondition checked against the stored document inside the same
/// atomic write as the operations it protects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserGuard {
    NotBanned,
    TaskNotCompleted(TaskId),
    TaskNotPending(TaskId),
    TaskPending(TaskId),
    BalanceAtLeast(Amount),
    DailyNotClaimed { task: TaskId, day: u64 },
    WithdrawalDebited(WithdrawalId),
    WithdrawalNotDebited(WithdrawalId),
}

impl UserGuard {
    pub fn holds(&self, account: &UserAccount) -> bool {
        match self {
            Self::NotBanned => !account.is_banned,
            Self::TaskNotCompleted(task) => !account.has_completed(task),
            Self::TaskNotPending(task) => !account.is_pending(task),
            Self::TaskPending(task) => account.is_pending(task),
            Self::BalanceAtLeast(amount) => account.balance >= *amount,
            Self::DailyNotClaimed { task, day } => !account.claimed_on(task, *day),
            Self::WithdrawalDebited(id) => account.debited_withdrawals.contains(id),
            Self::WithdrawalNotDebited(id) => !account.debited_withdrawals.contains(id),
        }
    }
}

/// A delta applied to one field of a user document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserOp {
    Credit(Amount),
    /// Fails the whole update rather than letting the balance go negative.
    Debit(Amount),
    MarkCompleted(TaskId),
    AddPending(TaskId, PendingSnapshot),
    RemovePending(TaskId),
    ClaimDaily { task: TaskId, day: u64 },
    MarkWithdrawalDebited(WithdrawalId),
    ClearWithdrawalDebited(WithdrawalId),
    SetBanned(bool),
    SetWallet(Option<String>),
    SetUsername(Option<String>),
}

/// Guards plus operations, applied to a single user document as one unit.
///
/// Backends call [`UserUpdate::apply`] while holding whatever exclusive
/// access they use for a single-document write, so every backend shares the
/// same semantics: either all guards hold and all ops land, or nothing is
/// written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserUpdate {
    guards: Vec<UserGuard>,
    ops: Vec<UserOp>,
}

impl UserUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guard(mut self, guard: UserGuard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn op(mut self, op: UserOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn guards(&self) -> &[UserGuard] {
        &self.guards
    }

    pub fn ops(&self) -> &[UserOp] {
        &self.ops
    }

    /// Apply to `account` in place. On error `account` is left untouched.
    pub fn apply(&self, account: &mut UserAccount) -> Result<(), StoreError> {
        if let Some(failed) = self.guards.iter().find(|g| !g.holds(account)) {
            return Err(StoreError::GuardFailed(failed.clone()));
        }

        let mut next = account.clone();
        for op in &self.ops {
            match op {
                UserOp::Credit(amount) => {
                    next.balance = next.balance.checked_add(*amount).ok_or_else(|| {
                        StoreError::Overflow(format!("crediting {amount} to {}", next.id))
                    })?;
                }
                UserOp::Debit(amount) => {
                    next.balance = next
                        .balance
                        .checked_sub(*amount)
                        .ok_or(StoreError::GuardFailed(UserGuard::BalanceAtLeast(*amount)))?;
                }
                UserOp::MarkCompleted(task) => {
                    next.completed_task_ids.insert(task.clone());
                }
                UserOp::AddPending(task, snapshot) => {
                    next.pending_verification
                        .entry(task.clone())
                        .or_insert_with(|| snapshot.clone());
                }
                UserOp::RemovePending(task) => {
                    next.pending_verification.remove(task);
                }
                UserOp::ClaimDaily { task, day } => {
                    next.daily_claims.insert(task.clone(), *day);
                }
                UserOp::MarkWithdrawalDebited(id) => {
                    next.debited_withdrawals.insert(id.clone());
                }
                UserOp::ClearWithdrawalDebited(id) => {
                    next.debited_withdrawals.remove(id);
                }
                UserOp::SetBanned(banned) => next.is_banned = *banned,
                UserOp::SetWallet(wallet) => next.wallet_address = wallet.clone(),
                UserOp::SetUsername(name) => next.username = name.clone(),
            }
        }

        if !next.sets_disjoint() {
            return Err(StoreError::Invariant(format!(
                "user {} would hold a task both completed and pending",
                next.id
            )));
        }

        *account = next;
        Ok(())
    }
}

/// Trait for user account storage operations.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Atomically insert `account` unless a document with its id exists.
    /// Returns whichever document is stored afterwards.
    async fn create_user_if_absent(&self, account: UserAccount) -> Result<UserAccount, StoreError>;

    async fn get_user(&self, id: &UserId) -> Result<UserAccount, StoreError>;

    /// Apply `update` to one user document atomically and return the
    /// document as written.
    async fn apply_user_update(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<UserAccount, StoreError>;

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError>;

    /// Bulk-load an already-normalized account, overwriting any existing
    /// record. Only the import path uses this; engines never do.
    async fn import_user(&self, account: &UserAccount) -> Result<(), StoreError>;

    /// Users with at least one pending manual-review entry.
    async fn users_with_pending(&self) -> Result<Vec<UserAccount>, StoreError> {
        Ok(self
            .list_users()
            .await?
            .into_iter()
            .filter(|u| !u.pending_verification.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewards_types::{Timestamp, UserProfile};

    fn account() -> UserAccount {
        UserAccount::new(UserProfile::new("u1", None), Timestamp::new(0))
    }

    fn snapshot(reward: u64) -> PendingSnapshot {
        PendingSnapshot {
            title: "Join".into(),
            reward_amount: Amount::new(reward),
            target: "@chan".into(),
            submitted_at: Timestamp::new(1),
        }
    }

    #[test]
    fn failed_guard_writes_nothing() {
        let mut acc = account();
        let update = UserUpdate::new()
            .guard(UserGuard::TaskPending("t1".into()))
            .op(UserOp::Credit(Amount::new(50)));
        let err = update.apply(&mut acc).unwrap_err();
        assert!(matches!(err, StoreError::GuardFailed(UserGuard::TaskPending(_))));
        assert_eq!(acc.balance, Amount::ZERO);
    }

    #[test]
    fn debit_below_zero_is_refused_without_partial_write() {
        let mut acc = account();
        acc.balance = Amount::new(10);
        let update = UserUpdate::new()
            .op(UserOp::MarkWithdrawalDebited(WithdrawalId::from_sequence(1)))
            .op(UserOp::Debit(Amount::new(11)));
        assert!(update.apply(&mut acc).is_err());
        assert_eq!(acc.balance, Amount::new(10));
        assert!(acc.debited_withdrawals.is_empty());
    }

    #[test]
    fn moving_pending_to_completed_keeps_sets_disjoint() {
        let mut acc = account();
        UserUpdate::new()
            .op(UserOp::AddPending("t1".into(), snapshot(50)))
            .apply(&mut acc)
            .unwrap();

        UserUpdate::new()
            .guard(UserGuard::TaskPending("t1".into()))
            .op(UserOp::RemovePending("t1".into()))
            .op(UserOp::MarkCompleted("t1".into()))
            .op(UserOp::Credit(Amount::new(50)))
            .apply(&mut acc)
            .unwrap();

        assert!(acc.has_completed(&"t1".into()));
        assert!(!acc.is_pending(&"t1".into()));
        assert_eq!(acc.balance, Amount::new(50));
    }

    #[test]
    fn completing_without_clearing_pending_is_an_invariant_error() {
        let mut acc = account();
        UserUpdate::new()
            .op(UserOp::AddPending("t1".into(), snapshot(50)))
            .apply(&mut acc)
            .unwrap();
        let err = UserUpdate::new()
            .op(UserOp::MarkCompleted("t1".into()))
            .apply(&mut acc)
            .unwrap_err();
        assert!(matches!(err, StoreError::Invariant(_)));
        assert!(!acc.has_completed(&"t1".into()));
    }

    #[test]
    fn add_pending_keeps_first_snapshot() {
        let mut acc = account();
        UserUpdate::new()
            .op(UserOp::AddPending("t1".into(), snapshot(50)))
            .apply(&mut acc)
            .unwrap();
        UserUpdate::new()
            .op(UserOp::AddPending("t1".into(), snapshot(99)))
            .apply(&mut acc)
            .unwrap();
        assert_eq!(acc.pending_verification[&TaskId::new("t1")].reward_amount, Amount::new(50));
    }
}
