//! Events emitted after ledger state changes commit.

use rewards_types::{Amount, TaskId, UserId, WithdrawalId};

/// Committed ledger transitions that observers can subscribe to via the
/// [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RewardsEvent {
    /// A manual submission was approved and its snapshotted reward credited.
    TaskApproved {
        user: UserId,
        username: Option<String>,
        task: TaskId,
        title: String,
        reward: Amount,
    },
    /// A manual submission was rejected; nothing was credited.
    TaskRejected {
        user: UserId,
        username: Option<String>,
        task: TaskId,
        title: String,
    },
    /// A withdrawal request was created. No funds moved.
    WithdrawalRequested {
        withdrawal: WithdrawalId,
        user: UserId,
        username: Option<String>,
        amount: Amount,
        wallet: String,
    },
    /// A withdrawal was approved and its amount debited.
    WithdrawalApproved {
        withdrawal: WithdrawalId,
        user: UserId,
        username: Option<String>,
        amount: Amount,
        wallet: String,
    },
    /// A withdrawal was rejected; the balance is unchanged.
    WithdrawalRejected {
        withdrawal: WithdrawalId,
        user: UserId,
        username: Option<String>,
        amount: Amount,
    },
}

impl RewardsEvent {
    /// The user the event concerns; also their chat id.
    pub fn user(&self) -> &UserId {
        match self {
            Self::TaskApproved { user, .. }
            | Self::TaskRejected { user, .. }
            | Self::WithdrawalRequested { user, .. }
            | Self::WithdrawalApproved { user, .. }
            | Self::WithdrawalRejected { user, .. } => user,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskApproved { .. } => "task_approved",
            Self::TaskRejected { .. } => "task_rejected",
            Self::WithdrawalRequested { .. } => "withdrawal_requested",
            Self::WithdrawalApproved { .. } => "withdrawal_approved",
            Self::WithdrawalRejected { .. } => "withdrawal_rejected",
        }
    }
}

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting task; keep them to a channel
/// send so a slow consumer never stalls a ledger operation.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&RewardsEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&RewardsEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &RewardsEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
