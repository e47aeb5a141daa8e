use rewards_types::{Amount, PendingSnapshot, TaskId, UserId};
use serde::{Deserialize, Serialize};

/// One entry of the admin review queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    pub user_id: UserId,
    pub display_name: String,
    pub task_id: TaskId,
    pub snapshot: PendingSnapshot,
}

/// Result of an approval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// This call moved the pair to completed and credited the snapshot reward.
    Approved { credited: Amount },
    /// An earlier approval already completed the task; nothing was credited.
    AlreadyApproved,
}

impl Decision {
    pub fn credited(&self) -> Amount {
        match self {
            Self::Approved { credited } => *credited,
            Self::AlreadyApproved => Amount::ZERO,
        }
    }
}
