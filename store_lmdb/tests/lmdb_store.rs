use rewards_store::{
    NewWithdrawal, StoreError, TaskStore, UserGuard, UserOp, UserStore, UserUpdate,
    WithdrawalStore,
};
use rewards_store_lmdb::LmdbStore;
use rewards_types::{
    Amount, PendingSnapshot, Task, TaskId, TaskPatch, Timestamp, UserAccount, UserId,
    UserProfile, VerificationMode, WithdrawalStatus,
};

const MAP_SIZE: usize = 10 * 1024 * 1024;

fn open(dir: &tempfile::TempDir) -> LmdbStore {
    LmdbStore::open(dir.path(), MAP_SIZE).unwrap()
}

fn join_task() -> Task {
    Task::new("t1", "Join channel", Amount::new(50), VerificationMode::Manual)
        .with_target("@channel")
}

fn alice() -> UserAccount {
    UserAccount::new(UserProfile::new("100", Some("alice")), Timestamp::new(1_000))
}

#[tokio::test]
async fn task_crud_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);

    store.insert_task(&join_task()).await.unwrap();
    assert!(matches!(
        store.insert_task(&join_task()).await,
        Err(StoreError::Duplicate(_))
    ));

    let patch = TaskPatch {
        reward_amount: Some(Amount::new(80)),
        active: Some(false),
        ..TaskPatch::default()
    };
    let updated = store.update_task(&TaskId::new("t1"), &patch).await.unwrap();
    assert_eq!(updated.reward_amount, Amount::new(80));
    assert!(!updated.active);
    assert_eq!(updated.target, "@channel");

    assert_eq!(store.list_tasks().await.unwrap().len(), 1);
    store.delete_task(&TaskId::new("t1")).await.unwrap();
    assert!(matches!(
        store.delete_task(&TaskId::new("t1")).await,
        Err(StoreError::NotFound(_))
    ));
    assert!(store.list_tasks().await.unwrap().is_empty());
}

#[tokio::test]
async fn guarded_update_is_all_or_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let user = store.create_user_if_absent(alice()).await.unwrap();
    let task = TaskId::new("t1");

    let submit = UserUpdate::new()
        .guard(UserGuard::TaskNotCompleted(task.clone()))
        .guard(UserGuard::TaskNotPending(task.clone()))
        .op(UserOp::AddPending(
            task.clone(),
            PendingSnapshot {
                title: "Join channel".into(),
                reward_amount: Amount::new(50),
                target: "@channel".into(),
                submitted_at: Timestamp::new(2_000),
            },
        ));
    store.apply_user_update(&user.id, &submit).await.unwrap();

    // A second submission fails its guard and leaves the document alone.
    let err = store.apply_user_update(&user.id, &submit).await.unwrap_err();
    assert!(matches!(err, StoreError::GuardFailed(UserGuard::TaskNotPending(ref t)) if *t == task));

    let approve = UserUpdate::new()
        .guard(UserGuard::TaskPending(task.clone()))
        .op(UserOp::RemovePending(task.clone()))
        .op(UserOp::MarkCompleted(task.clone()))
        .op(UserOp::Credit(Amount::new(50)));
    let written = store.apply_user_update(&user.id, &approve).await.unwrap();
    assert_eq!(written.balance, Amount::new(50));

    let reread = store.get_user(&user.id).await.unwrap();
    assert_eq!(reread, written);
    assert!(reread.has_completed(&task));
    assert!(!reread.is_pending(&task));
}

#[tokio::test]
async fn create_if_absent_does_not_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(&dir);
    let user = store.create_user_if_absent(alice()).await.unwrap();
    store
        .apply_user_update(&user.id, &UserUpdate::new().op(UserOp::Credit(Amount::new(9))))
        .await
        .unwrap();

    let again = store.create_user_if_absent(alice()).await.unwrap();
    assert_eq!(again.balance, Amount::new(9));
    assert!(matches!(
        store.get_user(&UserId::new("nobody")).await,
        Err(StoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn withdrawal_sequence_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let new = NewWithdrawal {
        user_id: UserId::new("100"),
        username: Some("alice".into()),
        amount: Amount::new(10),
        wallet_address: "EQ".to_string() + &"a".repeat(46),
        balance_snapshot: Amount::new(40),
        created_at: Timestamp::new(5),
    };

    let first = {
        let store = open(&dir);
        store.insert_withdrawal(new.clone()).await.unwrap()
    };

    let store = open(&dir);
    let second = store.insert_withdrawal(new).await.unwrap();
    assert_ne!(first.id, second.id);
    assert_eq!(second.id.as_str(), "wd-000000000002");

    let approved = store
        .transition_withdrawal(
            &first.id,
            WithdrawalStatus::Pending,
            WithdrawalStatus::Approved,
            Timestamp::new(6),
        )
        .await
        .unwrap();
    assert_eq!(approved.decided_at, Some(Timestamp::new(6)));

    let err = store
        .transition_withdrawal(
            &first.id,
            WithdrawalStatus::Pending,
            WithdrawalStatus::Rejected,
            Timestamp::new(7),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::StatusMismatch { .. }));

    let pending = store
        .withdrawals_with_status(WithdrawalStatus::Pending)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);
    assert_eq!(
        store.withdrawals_for_user(&UserId::new("100")).await.unwrap().len(),
        2
    );
}
