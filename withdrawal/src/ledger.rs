use std::sync::Arc;

use rewards_notify::{EventBus, RewardsEvent};
use rewards_store::{NewWithdrawal, RewardsStore, StoreError, UserGuard, UserOp, UserUpdate};
use rewards_types::{
    Amount, Clock, RewardsError, UserId, WithdrawalId, WithdrawalRequest, WithdrawalStatus,
};

/// Owns withdrawal requests and moves their funds out of user balances.
pub struct WithdrawalLedger {
    store: Arc<dyn RewardsStore>,
    clock: Arc<dyn Clock>,
    events: Arc<EventBus>,
    min_withdrawal: Amount,
}

impl WithdrawalLedger {
    pub fn new(store: Arc<dyn RewardsStore>, clock: Arc<dyn Clock>, events: Arc<EventBus>) -> Self {
        Self {
            store,
            clock,
            events,
            min_withdrawal: Amount::new(1),
        }
    }

    pub fn with_min_withdrawal(mut self, min: Amount) -> Self {
        self.min_withdrawal = min;
        self
    }

    /// Create a pending request against the user's current balance.
    /// No funds are reserved.
    pub async fn request(
        &self,
        user: &UserId,
        amount: Amount,
        wallet_address: &str,
    ) -> Result<WithdrawalRequest, RewardsError> {
        if amount.is_zero() {
            return Err(RewardsError::validation("withdrawal amount must be positive"));
        }
        if amount < self.min_withdrawal {
            return Err(RewardsError::validation(format!(
                "minimum withdrawal is {}",
                self.min_withdrawal
            )));
        }
        let wallet_address = wallet_address.trim();
        if wallet_address.is_empty() {
            return Err(RewardsError::validation("wallet address must not be empty"));
        }

        let account = self.store.get_user(user).await?;
        if account.is_banned {
            return Err(RewardsError::Forbidden(format!("user {user} is banned")));
        }
        if amount > account.balance {
            return Err(RewardsError::invalid_state(format!(
                "insufficient balance: requested {amount}, available {}",
                account.balance
            )));
        }

        let request = self
            .store
            .insert_withdrawal(NewWithdrawal {
                user_id: account.id.clone(),
                username: account.username.clone(),
                amount,
                wallet_address: wallet_address.to_string(),
                balance_snapshot: account.balance,
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!(
            withdrawal = %request.id,
            user = %user,
            amount = %amount,
            "withdrawal requested"
        );
        self.events.emit(&RewardsEvent::WithdrawalRequested {
            withdrawal: request.id.clone(),
            user: request.user_id.clone(),
            username: request.username.clone(),
            amount,
            wallet: request.wallet_address.clone(),
        });
        Ok(request)
    }

    /// Approve a pending request, debiting its amount from the live balance.
    ///
    /// Fails with `InvalidState` if the request is no longer pending or the
    /// balance no longer covers the amount; in the latter case the request
    /// stays pending.
    pub async fn approve(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, RewardsError> {
        let request = self.store.get_withdrawal(id).await?;
        if request.status.is_terminal() {
            if request.status == WithdrawalStatus::Rejected {
                self.refund_if_debited(&request).await?;
            }
            return Err(already_decided(id, request.status));
        }

        let debit = UserUpdate::new()
            .guard(UserGuard::WithdrawalNotDebited(id.clone()))
            .guard(UserGuard::BalanceAtLeast(request.amount))
            .op(UserOp::Debit(request.amount))
            .op(UserOp::MarkWithdrawalDebited(id.clone()));
        match self.store.apply_user_update(&request.user_id, &debit).await {
            Ok(account) => tracing::info!(
                withdrawal = %id,
                user = %request.user_id,
                amount = %request.amount,
                balance = %account.balance,
                "withdrawal debited"
            ),
            Err(StoreError::GuardFailed(UserGuard::WithdrawalNotDebited(_))) => {
                tracing::debug!(withdrawal = %id, "debit already applied by an earlier attempt")
            }
            Err(StoreError::GuardFailed(UserGuard::BalanceAtLeast(_))) => {
                return Err(RewardsError::invalid_state(format!(
                    "insufficient balance: withdrawal {id} needs {}",
                    request.amount
                )))
            }
            Err(e) => return Err(e.into()),
        }

        let decided = match self
            .store
            .transition_withdrawal(
                id,
                WithdrawalStatus::Pending,
                WithdrawalStatus::Approved,
                self.clock.now(),
            )
            .await
        {
            Ok(decided) => decided,
            Err(StoreError::StatusMismatch { actual, .. }) => {
                // A rejection won the race after our debit: give it back.
                if actual == WithdrawalStatus::Rejected {
                    self.refund_if_debited(&request).await?;
                }
                return Err(already_decided(id, actual));
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(withdrawal = %id, user = %decided.user_id, "withdrawal approved");
        self.events.emit(&RewardsEvent::WithdrawalApproved {
            withdrawal: decided.id.clone(),
            user: decided.user_id.clone(),
            username: decided.username.clone(),
            amount: decided.amount,
            wallet: decided.wallet_address.clone(),
        });
        Ok(decided)
    }

    /// Reject a pending request. The balance is unchanged, unless an
    /// interrupted approval had already debited it, which is refunded.
    pub async fn reject(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, RewardsError> {
        let request = self.store.get_withdrawal(id).await?;
        if request.status.is_terminal() {
            if request.status == WithdrawalStatus::Rejected {
                self.refund_if_debited(&request).await?;
            }
            return Err(already_decided(id, request.status));
        }

        let decided = match self
            .store
            .transition_withdrawal(
                id,
                WithdrawalStatus::Pending,
                WithdrawalStatus::Rejected,
                self.clock.now(),
            )
            .await
        {
            Ok(decided) => decided,
            Err(StoreError::StatusMismatch { actual, .. }) => {
                return Err(already_decided(id, actual))
            }
            Err(e) => return Err(e.into()),
        };

        tracing::info!(withdrawal = %id, user = %decided.user_id, "withdrawal rejected");
        self.events.emit(&RewardsEvent::WithdrawalRejected {
            withdrawal: decided.id.clone(),
            user: decided.user_id.clone(),
            username: decided.username.clone(),
            amount: decided.amount,
        });
        self.refund_if_debited(&decided).await?;
        Ok(decided)
    }

    pub async fn get(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, RewardsError> {
        Ok(self.store.get_withdrawal(id).await?)
    }

    /// All requests of one user, newest first.
    pub async fn history_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<WithdrawalRequest>, RewardsError> {
        let mut requests = self.store.withdrawals_for_user(user).await?;
        newest_first(&mut requests);
        Ok(requests)
    }

    /// Requests awaiting a decision, newest first.
    pub async fn pending(&self) -> Result<Vec<WithdrawalRequest>, RewardsError> {
        let mut requests = self
            .store
            .withdrawals_with_status(WithdrawalStatus::Pending)
            .await?;
        newest_first(&mut requests);
        Ok(requests)
    }

    /// Credit back the debit of a rejected request, if one was recorded.
    async fn refund_if_debited(&self, request: &WithdrawalRequest) -> Result<(), RewardsError> {
        let refund = UserUpdate::new()
            .guard(UserGuard::WithdrawalDebited(request.id.clone()))
            .op(UserOp::Credit(request.amount))
            .op(UserOp::ClearWithdrawalDebited(request.id.clone()));
        match self.store.apply_user_update(&request.user_id, &refund).await {
            Ok(_) => {
                tracing::info!(
                    withdrawal = %request.id,
                    user = %request.user_id,
                    amount = %request.amount,
                    "withdrawal debit refunded"
                );
                Ok(())
            }
            Err(StoreError::GuardFailed(_)) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn newest_first(requests: &mut [WithdrawalRequest]) {
    requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
}

fn already_decided(id: &WithdrawalId, status: WithdrawalStatus) -> RewardsError {
    RewardsError::invalid_state(format!("withdrawal {id} is already {status}"))
}
