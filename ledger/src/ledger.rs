//! User lifecycle: get-or-create on first contact, bans, payout wallet.

use std::sync::Arc;

use rewards_store::{RewardsStore, UserOp, UserUpdate};
use rewards_types::{Clock, RewardsError, TaskId, UserAccount, UserId, UserProfile};

use crate::wallet::validate_wallet_address;

/// Task id of the daily check-in unless configured otherwise.
pub const DEFAULT_CHECK_IN_TASK: &str = "task_daily_checkin";

/// Per-user balances and task sets.
pub struct UserLedger {
    pub(crate) store: Arc<dyn RewardsStore>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) check_in_task: TaskId,
}

impl UserLedger {
    pub fn new(store: Arc<dyn RewardsStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            check_in_task: TaskId::new(DEFAULT_CHECK_IN_TASK),
        }
    }

    pub fn with_check_in_task(mut self, task: impl Into<TaskId>) -> Self {
        self.check_in_task = task.into();
        self
    }

    pub fn check_in_task(&self) -> &TaskId {
        &self.check_in_task
    }

    /// Return the user's account, creating it with defaults on first
    /// contact. A changed username is refreshed.
    pub async fn get_or_create(&self, profile: UserProfile) -> Result<UserAccount, RewardsError> {
        if !profile.id.is_valid() {
            return Err(RewardsError::validation("user id must not be empty"));
        }
        let fresh = UserAccount::new(profile.clone(), self.clock.now());
        let account = self.store.create_user_if_absent(fresh.clone()).await?;
        if account == fresh {
            tracing::info!(user = %account.id, "user created");
            return Ok(account);
        }

        match profile.username {
            Some(name) if account.username.as_deref() != Some(name.as_str()) => {
                let update = UserUpdate::new().op(UserOp::SetUsername(Some(name)));
                Ok(self.store.apply_user_update(&account.id, &update).await?)
            }
            _ => Ok(account),
        }
    }

    pub async fn get(&self, user: &UserId) -> Result<UserAccount, RewardsError> {
        Ok(self.store.get_user(user).await?)
    }

    /// Every account, oldest first.
    pub async fn list_users(&self) -> Result<Vec<UserAccount>, RewardsError> {
        let mut users = self.store.list_users().await?;
        users.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    pub async fn set_banned(&self, user: &UserId, banned: bool) -> Result<UserAccount, RewardsError> {
        let update = UserUpdate::new().op(UserOp::SetBanned(banned));
        let account = self.store.apply_user_update(user, &update).await?;
        tracing::info!(user = %user, banned, "ban status changed");
        Ok(account)
    }

    pub async fn connect_wallet(
        &self,
        user: &UserId,
        address: &str,
    ) -> Result<UserAccount, RewardsError> {
        let address = validate_wallet_address(address)?;
        let update = UserUpdate::new().op(UserOp::SetWallet(Some(address)));
        let account = self.store.apply_user_update(user, &update).await?;
        tracing::info!(user = %user, "wallet connected");
        Ok(account)
    }

    pub async fn disconnect_wallet(&self, user: &UserId) -> Result<UserAccount, RewardsError> {
        let update = UserUpdate::new().op(UserOp::SetWallet(None));
        let account = self.store.apply_user_update(user, &update).await?;
        tracing::info!(user = %user, "wallet disconnected");
        Ok(account)
    }
}
