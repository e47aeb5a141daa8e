//! Task catalog.
//!
//! Owns task definitions. Deleting or editing a task never touches user
//! documents: pending submissions carry their own snapshot of the task.

use std::sync::Arc;

use rewards_store::RewardsStore;
use rewards_types::{RewardsError, Task, TaskId, TaskPatch};

pub struct TaskCatalog {
    store: Arc<dyn RewardsStore>,
}

impl TaskCatalog {
    pub fn new(store: Arc<dyn RewardsStore>) -> Self {
        Self { store }
    }

    /// Add a new task. The id must be unused.
    pub async fn create(&self, task: Task) -> Result<Task, RewardsError> {
        task.validate()?;
        self.store.insert_task(&task).await?;
        tracing::info!(
            task = %task.id,
            reward = %task.reward_amount,
            mode = ?task.verification_mode,
            "task created"
        );
        Ok(task)
    }

    /// Edit a task. The patched task is validated before anything is written.
    pub async fn update(&self, id: &TaskId, patch: TaskPatch) -> Result<Task, RewardsError> {
        let mut preview = self.get(id).await?;
        if patch.is_empty() {
            return Ok(preview);
        }
        preview.apply_patch(patch.clone());
        preview.validate()?;

        let task = self.store.update_task(id, &patch).await?;
        tracing::info!(task = %id, "task updated");
        Ok(task)
    }

    /// Remove a task definition. Existing pending snapshots are unaffected.
    pub async fn delete(&self, id: &TaskId) -> Result<(), RewardsError> {
        self.store.delete_task(id).await?;
        tracing::info!(task = %id, "task deleted");
        Ok(())
    }

    /// All tasks ordered by id; with `active_only` the inactive ones are
    /// left out, which is the list offered to users.
    pub async fn list(&self, active_only: bool) -> Result<Vec<Task>, RewardsError> {
        let mut tasks = self.store.list_tasks().await?;
        if active_only {
            tasks.retain(|t| t.active);
        }
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    pub async fn get(&self, id: &TaskId) -> Result<Task, RewardsError> {
        Ok(self.store.get_task(id).await?)
    }
}
