//! Task completion: the user-facing half of the ledger.
//!
//! Ordering of checks matters for idempotence: a task the user already
//! holds (completed or pending) answers with the same outcome as the first
//! call, even if the task has since been deactivated. The guarded update
//! repeats the checks inside the store so a racing duplicate request can
//! never credit twice.

use rewards_store::{StoreError, UserGuard, UserOp, UserUpdate};
use rewards_types::{
    Amount, RewardsError, Schedule, Task, TaskId, UserAccount, UserId, VerificationMode,
};
use serde::{Deserialize, Serialize};

use crate::UserLedger;

/// What a completion attempt did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompletionOutcome {
    /// The task counts as completed. `credited` is zero when it already was.
    Completed { credited: Amount },
    /// The submission waits in the manual review queue.
    PendingReview,
}

impl CompletionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    pub fn credited(&self) -> Amount {
        match self {
            Self::Completed { credited } => *credited,
            Self::PendingReview => Amount::ZERO,
        }
    }
}

const ALREADY_DONE: CompletionOutcome = CompletionOutcome::Completed {
    credited: Amount::ZERO,
};

impl UserLedger {
    /// Claim completion of `task` for `user`.
    ///
    /// Automatic tasks credit immediately, manual ones are queued for review
    /// with a snapshot of the task, daily tasks credit at most once per UTC
    /// day.
    pub async fn attempt_complete(
        &self,
        user: &UserId,
        task: &TaskId,
    ) -> Result<CompletionOutcome, RewardsError> {
        let task = self.store.get_task(task).await?;
        let account = self.store.get_user(user).await?;
        if account.is_banned {
            return Err(RewardsError::Forbidden(format!("user {user} is banned")));
        }
        match task.schedule {
            Schedule::Once => self.complete_once(&account, &task).await,
            Schedule::Daily => self.claim_daily(&account, &task).await,
        }
    }

    /// Complete the configured daily check-in task.
    pub async fn check_in(&self, user: &UserId) -> Result<CompletionOutcome, RewardsError> {
        let task = self.check_in_task.clone();
        self.attempt_complete(user, &task).await
    }

    async fn complete_once(
        &self,
        account: &UserAccount,
        task: &Task,
    ) -> Result<CompletionOutcome, RewardsError> {
        if account.has_completed(&task.id) {
            tracing::debug!(user = %account.id, task = %task.id, "task already completed");
            return Ok(ALREADY_DONE);
        }
        if account.is_pending(&task.id) {
            tracing::debug!(user = %account.id, task = %task.id, "task already pending review");
            return Ok(CompletionOutcome::PendingReview);
        }
        if !task.active {
            return Err(RewardsError::invalid_state(format!(
                "task {} is not active",
                task.id
            )));
        }

        let update = UserUpdate::new()
            .guard(UserGuard::NotBanned)
            .guard(UserGuard::TaskNotCompleted(task.id.clone()))
            .guard(UserGuard::TaskNotPending(task.id.clone()));
        let (update, outcome) = match task.verification_mode {
            VerificationMode::Automatic => (
                update
                    .op(UserOp::MarkCompleted(task.id.clone()))
                    .op(UserOp::Credit(task.reward_amount)),
                CompletionOutcome::Completed {
                    credited: task.reward_amount,
                },
            ),
            VerificationMode::Manual => (
                update.op(UserOp::AddPending(
                    task.id.clone(),
                    task.snapshot(self.clock.now()),
                )),
                CompletionOutcome::PendingReview,
            ),
        };

        match self.store.apply_user_update(&account.id, &update).await {
            Ok(_) => {
                tracing::info!(
                    user = %account.id,
                    task = %task.id,
                    amount = %outcome.credited(),
                    outcome = ?outcome,
                    "task completion recorded"
                );
                Ok(outcome)
            }
            Err(StoreError::GuardFailed(guard)) => lost_race(&account.id, &task.id, guard),
            Err(e) => Err(e.into()),
        }
    }

    async fn claim_daily(
        &self,
        account: &UserAccount,
        task: &Task,
    ) -> Result<CompletionOutcome, RewardsError> {
        let day = self.clock.now().day_number();
        if account.claimed_on(&task.id, day) {
            tracing::debug!(user = %account.id, task = %task.id, day, "already claimed today");
            return Ok(ALREADY_DONE);
        }
        if !task.active {
            return Err(RewardsError::invalid_state(format!(
                "task {} is not active",
                task.id
            )));
        }

        let update = UserUpdate::new()
            .guard(UserGuard::NotBanned)
            .guard(UserGuard::DailyNotClaimed {
                task: task.id.clone(),
                day,
            })
            .op(UserOp::ClaimDaily {
                task: task.id.clone(),
                day,
            })
            .op(UserOp::Credit(task.reward_amount));

        match self.store.apply_user_update(&account.id, &update).await {
            Ok(_) => {
                tracing::info!(
                    user = %account.id,
                    task = %task.id,
                    day,
                    amount = %task.reward_amount,
                    "daily task claimed"
                );
                Ok(CompletionOutcome::Completed {
                    credited: task.reward_amount,
                })
            }
            Err(StoreError::GuardFailed(guard)) => lost_race(&account.id, &task.id, guard),
            Err(e) => Err(e.into()),
        }
    }
}

/// A concurrent request changed the document between our read and our
/// write. Answer as if we had read the newer state.
fn lost_race(
    user: &UserId,
    task: &TaskId,
    guard: UserGuard,
) -> Result<CompletionOutcome, RewardsError> {
    tracing::debug!(user = %user, task = %task, guard = ?guard, "completion guard failed");
    match guard {
        UserGuard::NotBanned => Err(RewardsError::Forbidden(format!("user {user} is banned"))),
        UserGuard::TaskNotCompleted(_) | UserGuard::DailyNotClaimed { .. } => Ok(ALREADY_DONE),
        UserGuard::TaskNotPending(_) => Ok(CompletionOutcome::PendingReview),
        other => Err(StoreError::GuardFailed(other).into()),
    }
}
