//! End-to-end scenarios against the assembled service, on nullable
//! infrastructure.

use std::sync::Arc;

use rewards_node::{RewardsConfig, RewardsService};
use rewards_nullables::{NullClock, NullNotifier, NullStore};
use rewards_store::UserStore;
use rewards_types::{
    Amount, ErrorKind, Schedule, Task, TaskId, TaskPatch, UserId, UserProfile, VerificationMode,
    WithdrawalStatus,
};
use rewards_verification::Decision;

const ADMIN: &str = "admin-chat";

struct Harness {
    store: Arc<NullStore>,
    notifier: Arc<NullNotifier>,
    service: RewardsService,
    user: UserId,
}

async fn harness() -> Harness {
    let config = RewardsConfig {
        admin_chat_id: Some(ADMIN.to_string()),
        ..RewardsConfig::default()
    };
    let store = Arc::new(NullStore::new());
    let notifier = Arc::new(NullNotifier::new());
    let service = RewardsService::start(
        &config,
        store.clone(),
        Arc::new(NullClock::new(1_700_000_000)),
        notifier.clone(),
    )
    .unwrap();

    let catalog = service.catalog();
    catalog
        .create(Task::new("t1", "Join channel", Amount::new(50), VerificationMode::Manual))
        .await
        .unwrap();
    catalog
        .create(Task::new("t2", "Follow", Amount::new(20), VerificationMode::Automatic))
        .await
        .unwrap();
    catalog
        .create(
            Task::new("task_daily_checkin", "Daily check-in", Amount::new(5), VerificationMode::Automatic)
                .with_schedule(Schedule::Daily),
        )
        .await
        .unwrap();
    let user = service
        .ledger()
        .get_or_create(UserProfile::new("u1", Some("alice")))
        .await
        .unwrap()
        .id;

    Harness {
        store,
        notifier,
        service,
        user,
    }
}

fn wallet() -> String {
    format!("EQ{}", "k".repeat(46))
}

async fn balance(h: &Harness) -> Amount {
    h.store.get_user(&h.user).await.unwrap().balance
}

async fn fund(h: &Harness, amount: u64) {
    use rewards_store::{UserOp, UserUpdate};
    h.store
        .apply_user_update(&h.user, &UserUpdate::new().op(UserOp::Credit(Amount::new(amount))))
        .await
        .unwrap();
}

#[tokio::test]
async fn manual_task_approved_by_admin() {
    let h = harness().await;
    let t1 = TaskId::new("t1");

    let outcome = h.service.attempt_complete(&h.user, &t1).await.unwrap();
    assert!(!outcome.is_completed());
    assert!(h.store.get_user(&h.user).await.unwrap().is_pending(&t1));

    let decision = h.service.approve_submission(&h.user, &t1).await.unwrap();
    assert_eq!(decision, Decision::Approved { credited: Amount::new(50) });

    let account = h.store.get_user(&h.user).await.unwrap();
    assert_eq!(account.balance, Amount::new(50));
    assert!(account.has_completed(&t1));
    assert!(!account.is_pending(&t1));
}

#[tokio::test]
async fn automatic_task_credits_immediately() {
    let h = harness().await;
    let t2 = TaskId::new("t2");

    let outcome = h.service.attempt_complete(&h.user, &t2).await.unwrap();
    assert!(outcome.is_completed());
    assert_eq!(balance(&h).await, Amount::new(20));
    assert!(h.service.list_pending().await.unwrap().is_empty());

    // Second attempt: completed again, credited once.
    assert!(h.service.attempt_complete(&h.user, &t2).await.unwrap().is_completed());
    assert_eq!(balance(&h).await, Amount::new(20));
    assert_eq!(h.service.metrics().tasks_completed.get(), 1);
}

#[tokio::test]
async fn double_click_approval_credits_once() {
    let h = harness().await;
    let t1 = TaskId::new("t1");
    h.service.attempt_complete(&h.user, &t1).await.unwrap();

    let (a, b) = tokio::join!(
        h.service.approve_submission(&h.user, &t1),
        h.service.approve_submission(&h.user, &t1),
    );
    let credited = a.unwrap().credited().raw() + b.unwrap().credited().raw();
    assert_eq!(credited, 50);
    assert_eq!(balance(&h).await, Amount::new(50));
}

#[tokio::test]
async fn rejecting_a_submission_changes_nothing() {
    let h = harness().await;
    let t1 = TaskId::new("t1");
    h.service.attempt_complete(&h.user, &t1).await.unwrap();

    h.service.reject_submission(&h.user, &t1).await.unwrap();
    let account = h.store.get_user(&h.user).await.unwrap();
    assert_eq!(account.balance, Amount::ZERO);
    assert!(account.pending_verification.is_empty());
    assert_eq!(
        h.service.reject_submission(&h.user, &t1).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn edited_reward_does_not_change_pending_payout() {
    let h = harness().await;
    let t1 = TaskId::new("t1");
    h.service.attempt_complete(&h.user, &t1).await.unwrap();

    h.service
        .catalog()
        .update(
            &t1,
            TaskPatch {
                reward_amount: Some(Amount::new(1_000)),
                ..TaskPatch::default()
            },
        )
        .await
        .unwrap();
    h.service.catalog().delete(&t1).await.unwrap();

    h.service.approve_submission(&h.user, &t1).await.unwrap();
    assert_eq!(balance(&h).await, Amount::new(50));
}

#[tokio::test]
async fn full_balance_withdrawal() {
    let h = harness().await;
    fund(&h, 500).await;

    let request = h
        .service
        .request_withdrawal(&h.user, Amount::new(500), &wallet())
        .await
        .unwrap();
    assert_eq!(request.status, WithdrawalStatus::Pending);
    assert_eq!(balance(&h).await, Amount::new(500));

    let approved = h.service.approve_withdrawal(&request.id).await.unwrap();
    assert_eq!(approved.status, WithdrawalStatus::Approved);
    assert_eq!(balance(&h).await, Amount::ZERO);

    for result in [
        h.service.approve_withdrawal(&request.id).await,
        h.service.reject_withdrawal(&request.id).await,
    ] {
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidState);
    }
    assert_eq!(balance(&h).await, Amount::ZERO);
}

#[tokio::test]
async fn rejected_withdrawal_keeps_balance() {
    let h = harness().await;
    fund(&h, 200).await;
    let request = h
        .service
        .request_withdrawal(&h.user, Amount::new(150), &wallet())
        .await
        .unwrap();
    h.service.reject_withdrawal(&request.id).await.unwrap();
    assert_eq!(balance(&h).await, Amount::new(200));

    let history = h.service.withdrawals().history_for_user(&h.user).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, WithdrawalStatus::Rejected);
}

#[tokio::test]
async fn decisions_notify_user_and_admin() {
    let h = harness().await;
    let t1 = TaskId::new("t1");
    h.service.attempt_complete(&h.user, &t1).await.unwrap();
    h.service.approve_submission(&h.user, &t1).await.unwrap();
    h.service.flush_notifications().await.unwrap();

    let to_user = h.notifier.sent_to("u1");
    assert_eq!(to_user.len(), 1);
    assert!(to_user[0].contains("Task Approved"));
    assert!(to_user[0].contains("+50 STON"));
    assert_eq!(h.notifier.sent_to(ADMIN).len(), 1);
    assert_eq!(h.service.metrics().notifications_delivered.get(), 2);
}

#[tokio::test]
async fn notification_failure_never_rolls_back() {
    let h = harness().await;
    h.notifier.set_failing(true);
    fund(&h, 100).await;

    let request = h
        .service
        .request_withdrawal(&h.user, Amount::new(100), &wallet())
        .await
        .unwrap();
    h.service.approve_withdrawal(&request.id).await.unwrap();
    h.service.flush_notifications().await.unwrap();

    assert_eq!(balance(&h).await, Amount::ZERO);
    assert!(h.service.metrics().notifications_failed.get() > 0);
    assert!(h.notifier.sent().is_empty());
}

#[tokio::test]
async fn daily_check_in_through_service() {
    let h = harness().await;
    assert_eq!(h.service.check_in(&h.user).await.unwrap().credited(), Amount::new(5));
    assert_eq!(h.service.check_in(&h.user).await.unwrap().credited(), Amount::ZERO);
    assert_eq!(balance(&h).await, Amount::new(5));
}

#[tokio::test]
async fn shutdown_drains_notifications() {
    let h = harness().await;
    fund(&h, 10).await;
    h.service
        .request_withdrawal(&h.user, Amount::new(10), &wallet())
        .await
        .unwrap();
    let notifier = h.notifier.clone();
    h.service.shutdown().await.unwrap();

    let admin = notifier.sent_to(ADMIN);
    assert_eq!(admin.len(), 1);
    assert!(admin[0].contains("Withdrawal Request"));
}
