//! Fixed message templates, one per event type.
//!
//! Messages use the HTML subset understood by the chat transport (`<b>`).

use crate::RewardsEvent;
use rewards_types::UserId;

/// Renders events into user-facing and admin-facing text.
#[derive(Clone, Debug)]
pub struct Templates {
    currency: String,
}

impl Templates {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
        }
    }

    /// Message for the user the event concerns, if they get one.
    pub fn user_message(&self, event: &RewardsEvent) -> Option<String> {
        let cur = &self.currency;
        match event {
            RewardsEvent::TaskApproved { title, reward, .. } => Some(format!(
                "✅ <b>Task Approved!</b>\n\nYour task \"<b>{title}</b>\" has been verified and approved.\n\n<b>+{reward} {cur}</b> has been added to your balance."
            )),
            RewardsEvent::TaskRejected { title, .. } => Some(format!(
                "❌ <b>Task Rejected</b>\n\nYour task \"<b>{title}</b>\" verification request has been rejected.\n\nPlease make sure you've completed the task correctly and try again."
            )),
            RewardsEvent::WithdrawalRequested { .. } => None,
            RewardsEvent::WithdrawalApproved { amount, wallet, .. } => Some(format!(
                "✅ <b>Withdrawal Approved</b>\n\nYour withdrawal of <b>{amount} {cur}</b> to {wallet} has been approved."
            )),
            RewardsEvent::WithdrawalRejected { amount, .. } => Some(format!(
                "❌ <b>Withdrawal Rejected</b>\n\nYour withdrawal of <b>{amount} {cur}</b> has been rejected. Your balance was not changed."
            )),
        }
    }

    /// Mirror of the event for the administrator chat.
    pub fn admin_message(&self, event: &RewardsEvent) -> String {
        let cur = &self.currency;
        match event {
            RewardsEvent::TaskApproved {
                user,
                username,
                title,
                reward,
                ..
            } => format!(
                "✅ <b>Task Approved</b>\nUser: {}\nTask: <b>{title}</b>\nReward: +{reward} {cur}",
                mention(user, username.as_deref())
            ),
            RewardsEvent::TaskRejected {
                user,
                username,
                title,
                ..
            } => format!(
                "❌ <b>Task Rejected</b>\nUser: {}\nTask: <b>{title}</b>",
                mention(user, username.as_deref())
            ),
            RewardsEvent::WithdrawalRequested {
                user,
                username,
                amount,
                wallet,
                ..
            } => format!(
                "💰 <b>Withdrawal Request</b>\n{} requested to withdraw <b>{amount} {cur}</b>\nWallet: {wallet}",
                mention(user, username.as_deref())
            ),
            RewardsEvent::WithdrawalApproved {
                user,
                username,
                amount,
                wallet,
                ..
            } => format!(
                "✅ <b>Withdrawal Approved</b>\nUser: {}\nAmount: {amount} {cur}\nWallet: {wallet}",
                mention(user, username.as_deref())
            ),
            RewardsEvent::WithdrawalRejected {
                user,
                username,
                amount,
                ..
            } => format!(
                "❌ <b>Withdrawal Rejected</b>\nUser: {}\nAmount: {amount} {cur}\nReason: Admin decision",
                mention(user, username.as_deref())
            ),
        }
    }

    /// Operational message for the administrator chat.
    pub fn debug_log(&self, message: &str) -> String {
        format!("🔍 <b>Debug Log</b>: {message}")
    }
}

fn mention(user: &UserId, username: Option<&str>) -> String {
    match username {
        Some(name) if !name.is_empty() => format!("@{name}"),
        _ => format!("User {user}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewards_types::{Amount, WithdrawalId};

    #[test]
    fn approval_interpolates_snapshot_fields() {
        let t = Templates::new("STON");
        let event = RewardsEvent::TaskApproved {
            user: "42".into(),
            username: Some("ann".into()),
            task: "t1".into(),
            title: "Join channel".into(),
            reward: Amount::new(50),
        };
        let user = t.user_message(&event).unwrap();
        assert!(user.contains("Join channel"));
        assert!(user.contains("+50 STON"));
        let admin = t.admin_message(&event);
        assert!(admin.contains("@ann"));
    }

    #[test]
    fn request_notice_goes_to_admin_only() {
        let t = Templates::new("STON");
        let event = RewardsEvent::WithdrawalRequested {
            withdrawal: WithdrawalId::from_sequence(3),
            user: "42".into(),
            username: None,
            amount: Amount::new(500),
            wallet: "EQabc".into(),
        };
        assert!(t.user_message(&event).is_none());
        let admin = t.admin_message(&event);
        assert!(admin.contains("User 42"));
        assert!(admin.contains("500 STON"));
    }
}
