//! Task definitions owned by the catalog.

use crate::{Amount, PendingSnapshot, RewardsError, TaskId, Timestamp};
use serde::{Deserialize, Serialize};

/// How a completion claim is verified.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationMode {
    /// Credited as soon as the user claims completion.
    Automatic,
    /// Held in the review queue until an administrator decides.
    Manual,
}

/// How often a user may complete a task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schedule {
    /// One-shot: completion is keyed by task id.
    #[default]
    Once,
    /// Repeatable once per UTC day: completion is keyed by (task id, day).
    Daily,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Free-form category label, e.g. `telegram_join`.
    #[serde(default)]
    pub kind: String,
    pub reward_amount: Amount,
    pub verification_mode: VerificationMode,
    #[serde(default)]
    pub schedule: Schedule,
    /// Opaque target of the task: a handle, a URL.
    #[serde(default)]
    pub target: String,
    pub active: bool,
}

impl Task {
    /// A new active one-shot task with empty description and target.
    pub fn new(
        id: impl Into<TaskId>,
        title: impl Into<String>,
        reward: Amount,
        mode: VerificationMode,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            kind: String::new(),
            reward_amount: reward,
            verification_mode: mode,
            schedule: Schedule::Once,
            target: String::new(),
            active: true,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn is_manual(&self) -> bool {
        self.verification_mode == VerificationMode::Manual
    }

    /// Check the definition is well-formed.
    pub fn validate(&self) -> Result<(), RewardsError> {
        if !self.id.is_valid() {
            return Err(RewardsError::validation("task id must not be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(RewardsError::validation("task title must not be empty"));
        }
        if self.schedule == Schedule::Daily && self.is_manual() {
            return Err(RewardsError::validation(
                "daily tasks must use automatic verification",
            ));
        }
        Ok(())
    }

    /// Capture what a manual submission needs at decision time.
    pub fn snapshot(&self, submitted_at: Timestamp) -> PendingSnapshot {
        PendingSnapshot {
            title: self.title.clone(),
            reward_amount: self.reward_amount,
            target: self.target.clone(),
            submitted_at,
        }
    }

    /// Apply an administrator edit. The id is immutable.
    pub fn apply_patch(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(reward) = patch.reward_amount {
            self.reward_amount = reward;
        }
        if let Some(mode) = patch.verification_mode {
            self.verification_mode = mode;
        }
        if let Some(schedule) = patch.schedule {
            self.schedule = schedule;
        }
        if let Some(target) = patch.target {
            self.target = target;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
    }
}

/// A partial edit of a task; `None` leaves the field unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<String>,
    pub reward_amount: Option<Amount>,
    pub verification_mode: Option<VerificationMode>,
    pub schedule: Option<Schedule>,
    pub target: Option<String>,
    pub active: Option<bool>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
