//! Task catalog storage trait.

use crate::StoreError;
use async_trait::async_trait;
use rewards_types::{Task, TaskId, TaskPatch};

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a new task. Fails with [`StoreError::Duplicate`] if the id is taken.
    async fn insert_task(&self, task: &Task) -> Result<(), StoreError>;

    async fn get_task(&self, id: &TaskId) -> Result<Task, StoreError>;

    /// Apply `patch` to the stored task in one write and return the result.
    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, StoreError>;

    /// Remove a task definition. Fails with [`StoreError::NotFound`] if absent.
    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError>;

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Bulk-load an already-normalized task, overwriting any existing record.
    async fn import_task(&self, task: &Task) -> Result<(), StoreError>;
}
