//! User accounts.

use crate::{Amount, TaskId, Timestamp, UserId, WithdrawalId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Task metadata captured when a manual submission is queued.
///
/// Decisions credit `reward_amount` from here, never from the catalog, so
/// later edits or deletion of the task cannot change what is paid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSnapshot {
    pub title: String,
    pub reward_amount: Amount,
    pub target: String,
    pub submitted_at: Timestamp,
}

/// Who a user is, as reported by the messaging platform on first contact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: Option<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<UserId>, username: Option<&str>) -> Self {
        Self {
            id: id.into(),
            username: username.map(str::to_string),
        }
    }
}

/// Per-user ledger state.
///
/// Invariants (enforced by the store update language, see `rewards-store`):
/// - `completed_task_ids` and the keys of `pending_verification` are disjoint;
/// - `balance` is never negative (it is unsigned and only debited with checks).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    pub id: UserId,
    #[serde(default)]
    pub username: Option<String>,
    pub balance: Amount,
    #[serde(default)]
    pub completed_task_ids: BTreeSet<TaskId>,
    #[serde(default)]
    pub pending_verification: BTreeMap<TaskId, PendingSnapshot>,
    /// Last UTC day number on which each daily task was claimed.
    #[serde(default)]
    pub daily_claims: BTreeMap<TaskId, u64>,
    /// Withdrawals whose debit has been applied to `balance`.
    #[serde(default)]
    pub debited_withdrawals: BTreeSet<WithdrawalId>,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub wallet_address: Option<String>,
    pub joined_at: Timestamp,
}

impl UserAccount {
    /// A fresh account: zero balance, nothing completed or pending.
    pub fn new(profile: UserProfile, joined_at: Timestamp) -> Self {
        Self {
            id: profile.id,
            username: profile.username,
            balance: Amount::ZERO,
            completed_task_ids: BTreeSet::new(),
            pending_verification: BTreeMap::new(),
            daily_claims: BTreeMap::new(),
            debited_withdrawals: BTreeSet::new(),
            is_banned: false,
            wallet_address: None,
            joined_at,
        }
    }

    pub fn has_completed(&self, task: &TaskId) -> bool {
        self.completed_task_ids.contains(task)
    }

    pub fn is_pending(&self, task: &TaskId) -> bool {
        self.pending_verification.contains_key(task)
    }

    pub fn claimed_on(&self, task: &TaskId, day: u64) -> bool {
        self.daily_claims.get(task) == Some(&day)
    }

    /// `@username` when known, otherwise `User <id>`.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(name) if !name.is_empty() => format!("@{name}"),
            _ => format!("User {}", self.id),
        }
    }

    /// Whether the completed and pending sets are disjoint.
    pub fn sets_disjoint(&self) -> bool {
        self.pending_verification
            .keys()
            .all(|task| !self.completed_task_ids.contains(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_account_has_defaults() {
        let account = UserAccount::new(UserProfile::new("42", None), Timestamp::new(1));
        assert_eq!(account.balance, Amount::ZERO);
        assert!(account.completed_task_ids.is_empty());
        assert!(account.pending_verification.is_empty());
        assert!(!account.is_banned);
        assert_eq!(account.display_name(), "User 42");
    }

    #[test]
    fn serializes_with_record_field_names() {
        let account = UserAccount::new(UserProfile::new("42", Some("ann")), Timestamp::new(1));
        let json = serde_json::to_value(&account).unwrap();
        assert!(json.get("completedTaskIds").is_some());
        assert!(json.get("pendingVerification").is_some());
        assert!(json.get("isBanned").is_some());
        assert!(json.get("walletAddress").is_some());
    }
}
