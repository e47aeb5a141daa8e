//! Admin decisions on pending submissions.

use std::sync::Arc;

use rewards_notify::{EventBus, RewardsEvent};
use rewards_store::{RewardsStore, StoreError, UserGuard, UserOp, UserUpdate};
use rewards_types::{PendingSnapshot, RewardsError, TaskId, UserAccount, UserId};

use crate::{Decision, PendingItem};

pub struct VerificationQueue {
    store: Arc<dyn RewardsStore>,
    events: Arc<EventBus>,
}

impl VerificationQueue {
    pub fn new(store: Arc<dyn RewardsStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    /// Every pending pair, oldest submission first.
    pub async fn list_pending(&self) -> Result<Vec<PendingItem>, RewardsError> {
        let mut items: Vec<PendingItem> = self
            .store
            .users_with_pending()
            .await?
            .into_iter()
            .flat_map(|account| {
                let display_name = account.display_name();
                let user_id = account.id;
                account
                    .pending_verification
                    .into_iter()
                    .map(move |(task_id, snapshot)| PendingItem {
                        user_id: user_id.clone(),
                        display_name: display_name.clone(),
                        task_id,
                        snapshot,
                    })
            })
            .collect();
        items.sort_by(|a, b| {
            a.snapshot
                .submitted_at
                .cmp(&b.snapshot.submitted_at)
                .then_with(|| a.user_id.cmp(&b.user_id))
                .then_with(|| a.task_id.cmp(&b.task_id))
        });
        Ok(items)
    }

    /// Approve a pending submission, crediting the snapshotted reward.
    ///
    /// Re-entrant: if the task is already completed (a duplicate click or a
    /// retry after an unknown outcome) the call succeeds with
    /// [`Decision::AlreadyApproved`] and credits nothing.
    pub async fn approve(&self, user: &UserId, task: &TaskId) -> Result<Decision, RewardsError> {
        let account = self.store.get_user(user).await?;
        if account.has_completed(task) {
            tracing::debug!(user = %user, task = %task, "submission already approved");
            return Ok(Decision::AlreadyApproved);
        }
        let snapshot = match account.pending_verification.get(task) {
            Some(snapshot) => snapshot.clone(),
            None => return Err(not_pending(user, task)),
        };

        let update = UserUpdate::new()
            .guard(UserGuard::TaskPending(task.clone()))
            .op(UserOp::RemovePending(task.clone()))
            .op(UserOp::MarkCompleted(task.clone()))
            .op(UserOp::Credit(snapshot.reward_amount));
        let written = match self.store.apply_user_update(user, &update).await {
            Ok(written) => written,
            Err(StoreError::GuardFailed(_)) => return self.reread_after_race(user, task).await,
            Err(e) => return Err(e.into()),
        };

        tracing::info!(
            user = %user,
            task = %task,
            amount = %snapshot.reward_amount,
            "submission approved"
        );
        self.events.emit(&RewardsEvent::TaskApproved {
            user: user.clone(),
            username: written.username,
            task: task.clone(),
            title: snapshot.title,
            reward: snapshot.reward_amount,
        });
        Ok(Decision::Approved {
            credited: snapshot.reward_amount,
        })
    }

    /// Reject a pending submission. Nothing is credited.
    pub async fn reject(&self, user: &UserId, task: &TaskId) -> Result<PendingItem, RewardsError> {
        let account = self.store.get_user(user).await?;
        let snapshot = match account.pending_verification.get(task) {
            Some(snapshot) => snapshot.clone(),
            None => return Err(not_pending(user, task)),
        };

        let update = UserUpdate::new()
            .guard(UserGuard::TaskPending(task.clone()))
            .op(UserOp::RemovePending(task.clone()));
        match self.store.apply_user_update(user, &update).await {
            Ok(_) => {}
            Err(StoreError::GuardFailed(_)) => return Err(not_pending(user, task)),
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user = %user, task = %task, "submission rejected");
        self.events.emit(&RewardsEvent::TaskRejected {
            user: user.clone(),
            username: account.username.clone(),
            task: task.clone(),
            title: snapshot.title.clone(),
        });
        Ok(item(&account, task.clone(), snapshot))
    }

    /// The pending entry vanished between our read and our write: either a
    /// concurrent approval won, or a rejection did.
    async fn reread_after_race(
        &self,
        user: &UserId,
        task: &TaskId,
    ) -> Result<Decision, RewardsError> {
        let account = self.store.get_user(user).await?;
        if account.has_completed(task) {
            tracing::debug!(user = %user, task = %task, "lost approval race to another approval");
            Ok(Decision::AlreadyApproved)
        } else {
            Err(not_pending(user, task))
        }
    }
}

fn item(account: &UserAccount, task_id: TaskId, snapshot: PendingSnapshot) -> PendingItem {
    PendingItem {
        user_id: account.id.clone(),
        display_name: account.display_name(),
        task_id,
        snapshot,
    }
}

fn not_pending(user: &UserId, task: &TaskId) -> RewardsError {
    RewardsError::not_found(format!("no pending submission of task {task} by user {user}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewards_nullables::NullStore;
    use rewards_store::{TaskStore, UserStore};
    use rewards_types::{Amount, ErrorKind, Task, TaskPatch, Timestamp, UserProfile, VerificationMode};
    use std::sync::Mutex;

    struct Fixture {
        store: Arc<NullStore>,
        queue: VerificationQueue,
        events: Arc<Mutex<Vec<RewardsEvent>>>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(NullStore::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = events.clone();
        bus.subscribe(Box::new(move |e| sink.lock().unwrap().push(e.clone())));
        let queue = VerificationQueue::new(store.clone(), Arc::new(bus));
        Fixture {
            store,
            queue,
            events,
        }
    }

    async fn submit(store: &NullStore, user: &str, task: &str, reward: u64, at: u64) {
        let id = UserId::new(user);
        store
            .create_user_if_absent(UserAccount::new(
                UserProfile::new(user, Some(user)),
                Timestamp::new(0),
            ))
            .await
            .unwrap();
        let snapshot = PendingSnapshot {
            title: format!("Task {task}"),
            reward_amount: Amount::new(reward),
            target: String::new(),
            submitted_at: Timestamp::new(at),
        };
        store
            .apply_user_update(
                &id,
                &UserUpdate::new().op(UserOp::AddPending(TaskId::new(task), snapshot)),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn approve_credits_once_and_emits_once() {
        let f = fixture();
        submit(&f.store, "u1", "t1", 50, 10).await;
        let (u1, t1) = (UserId::new("u1"), TaskId::new("t1"));

        let first = f.queue.approve(&u1, &t1).await.unwrap();
        assert_eq!(first, Decision::Approved { credited: Amount::new(50) });
        let second = f.queue.approve(&u1, &t1).await.unwrap();
        assert_eq!(second, Decision::AlreadyApproved);

        let account = f.store.get_user(&u1).await.unwrap();
        assert_eq!(account.balance, Amount::new(50));
        assert!(account.has_completed(&t1));
        assert!(!account.is_pending(&t1));
        assert_eq!(f.events.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn approval_pays_snapshot_not_current_reward() {
        let f = fixture();
        let task = Task::new("t1", "Join", Amount::new(50), VerificationMode::Manual);
        f.store.insert_task(&task).await.unwrap();
        submit(&f.store, "u1", "t1", 50, 5).await;
        f.store
            .update_task(
                &task.id,
                &TaskPatch {
                    reward_amount: Some(Amount::new(500)),
                    ..TaskPatch::default()
                },
            )
            .await
            .unwrap();
        f.store.delete_task(&task.id).await.unwrap();

        let decision = f.queue.approve(&UserId::new("u1"), &task.id).await.unwrap();
        assert_eq!(decision.credited(), Amount::new(50));
    }

    #[tokio::test]
    async fn reject_removes_without_credit() {
        let f = fixture();
        submit(&f.store, "u1", "t1", 50, 10).await;
        let (u1, t1) = (UserId::new("u1"), TaskId::new("t1"));

        let removed = f.queue.reject(&u1, &t1).await.unwrap();
        assert_eq!(removed.snapshot.reward_amount, Amount::new(50));
        let account = f.store.get_user(&u1).await.unwrap();
        assert_eq!(account.balance, Amount::ZERO);
        assert!(account.pending_verification.is_empty());
        assert!(!account.has_completed(&t1));

        // Decided pairs are no longer pending.
        assert_eq!(f.queue.reject(&u1, &t1).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(f.queue.approve(&u1, &t1).await.unwrap_err().kind(), ErrorKind::NotFound);
        assert!(matches!(
            f.events.lock().unwrap().as_slice(),
            [RewardsEvent::TaskRejected { .. }]
        ));
    }

    #[tokio::test]
    async fn never_submitted_is_not_found() {
        let f = fixture();
        submit(&f.store, "u1", "t1", 50, 10).await;
        let err = f
            .queue
            .approve(&UserId::new("u1"), &TaskId::new("t9"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = f
            .queue
            .approve(&UserId::new("ghost"), &TaskId::new("t1"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn retry_after_lost_ack_is_already_approved() {
        let f = fixture();
        submit(&f.store, "u1", "t1", 50, 10).await;
        let (u1, t1) = (UserId::new("u1"), TaskId::new("t1"));
        f.store.lose_next_ack();

        assert!(f.queue.approve(&u1, &t1).await.unwrap_err().is_unknown_outcome());
        assert_eq!(f.queue.approve(&u1, &t1).await.unwrap(), Decision::AlreadyApproved);
        assert_eq!(f.store.get_user(&u1).await.unwrap().balance, Amount::new(50));
    }

    #[tokio::test]
    async fn approval_racing_another_approval_credits_once() {
        let f = fixture();
        submit(&f.store, "u1", "t1", 50, 10).await;
        let (u1, t1) = (UserId::new("u1"), TaskId::new("t1"));

        // A second admin click commits after this approval read the pair
        // as pending but before it writes.
        let (user, task) = (u1.clone(), t1.clone());
        f.store.interleave_next_write(move |store| {
            let competing = UserUpdate::new()
                .guard(UserGuard::TaskPending(task.clone()))
                .op(UserOp::RemovePending(task.clone()))
                .op(UserOp::MarkCompleted(task))
                .op(UserOp::Credit(Amount::new(50)));
            store.commit_user_update(&user, &competing).unwrap();
        });

        assert_eq!(f.queue.approve(&u1, &t1).await.unwrap(), Decision::AlreadyApproved);
        let account = f.store.get_user(&u1).await.unwrap();
        assert_eq!(account.balance, Amount::new(50));
        assert!(account.has_completed(&t1));
        assert!(f.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn approval_racing_a_rejection_is_not_found() {
        let f = fixture();
        submit(&f.store, "u1", "t1", 50, 10).await;
        let (u1, t1) = (UserId::new("u1"), TaskId::new("t1"));

        let (user, task) = (u1.clone(), t1.clone());
        f.store.interleave_next_write(move |store| {
            let competing = UserUpdate::new()
                .guard(UserGuard::TaskPending(task.clone()))
                .op(UserOp::RemovePending(task));
            store.commit_user_update(&user, &competing).unwrap();
        });

        let err = f.queue.approve(&u1, &t1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let account = f.store.get_user(&u1).await.unwrap();
        assert_eq!(account.balance, Amount::ZERO);
        assert!(!account.has_completed(&t1));
        assert!(f.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_oldest_first() {
        let f = fixture();
        submit(&f.store, "u2", "t1", 10, 30).await;
        submit(&f.store, "u1", "t2", 10, 20).await;
        submit(&f.store, "u1", "t1", 10, 40).await;

        let order: Vec<(String, String)> = f
            .queue
            .list_pending()
            .await
            .unwrap()
            .into_iter()
            .map(|i| (i.user_id.to_string(), i.task_id.to_string()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("u1".to_string(), "t2".to_string()),
                ("u2".to_string(), "t1".to_string()),
                ("u1".to_string(), "t1".to_string()),
            ]
        );
    }
}
