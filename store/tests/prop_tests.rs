use proptest::prelude::*;

use rewards_store::{UserGuard, UserOp, UserUpdate};
use rewards_types::{Amount, PendingSnapshot, TaskId, Timestamp, UserAccount, UserProfile};

fn task(n: u8) -> TaskId {
    TaskId::new(format!("t{n}"))
}

fn op() -> impl Strategy<Value = UserOp> {
    prop_oneof![
        (0u64..1_000).prop_map(|a| UserOp::Credit(Amount::new(a))),
        (0u64..1_000).prop_map(|a| UserOp::Debit(Amount::new(a))),
        (0u8..4).prop_map(|n| UserOp::MarkCompleted(task(n))),
        (0u8..4, 0u64..100).prop_map(|(n, r)| UserOp::AddPending(
            task(n),
            PendingSnapshot {
                title: String::new(),
                reward_amount: Amount::new(r),
                target: String::new(),
                submitted_at: Timestamp::new(0),
            }
        )),
        (0u8..4).prop_map(|n| UserOp::RemovePending(task(n))),
    ]
}

fn guard() -> impl Strategy<Value = UserGuard> {
    prop_oneof![
        (0u8..4).prop_map(|n| UserGuard::TaskNotCompleted(task(n))),
        (0u8..4).prop_map(|n| UserGuard::TaskPending(task(n))),
        (0u64..1_000).prop_map(|a| UserGuard::BalanceAtLeast(Amount::new(a))),
    ]
}

fn update() -> impl Strategy<Value = UserUpdate> {
    (prop::collection::vec(guard(), 0..2), prop::collection::vec(op(), 1..4)).prop_map(
        |(guards, ops)| {
            let u = guards.into_iter().fold(UserUpdate::new(), UserUpdate::guard);
            ops.into_iter().fold(u, UserUpdate::op)
        },
    )
}

proptest! {
    /// Whatever sequence of updates is attempted, a failed update leaves the
    /// document unchanged and a successful one keeps the sets disjoint.
    #[test]
    fn updates_are_all_or_nothing(updates in prop::collection::vec(update(), 1..20)) {
        let mut account = UserAccount::new(UserProfile::new("u", None), Timestamp::new(0));
        for update in updates {
            let before = account.clone();
            match update.apply(&mut account) {
                Ok(()) => prop_assert!(account.sets_disjoint()),
                Err(_) => prop_assert_eq!(&account, &before),
            }
        }
    }

    /// The balance equals credits minus debits of the updates that landed.
    #[test]
    fn balance_tracks_applied_deltas(updates in prop::collection::vec(update(), 1..20)) {
        let mut account = UserAccount::new(UserProfile::new("u", None), Timestamp::new(0));
        let mut expected: u64 = 0;
        for update in updates {
            let mut delta: i128 = 0;
            for op in update.ops() {
                match op {
                    UserOp::Credit(a) => delta += a.raw() as i128,
                    UserOp::Debit(a) => delta -= a.raw() as i128,
                    _ => {}
                }
            }
            if update.apply(&mut account).is_ok() {
                expected = (expected as i128 + delta) as u64;
            }
            prop_assert_eq!(account.balance.raw(), expected);
        }
    }
}
