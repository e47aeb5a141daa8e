//! LMDB implementation of TaskStore.

use async_trait::async_trait;
use rewards_store::{StoreError, TaskStore};
use rewards_types::{Task, TaskId, TaskPatch};

use crate::codec::{decode, encode};
use crate::{LmdbEnvironment, LmdbError, LmdbStore};

impl LmdbEnvironment {
    fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = task.id.as_str().as_bytes();
        if self.tasks.get(&wtxn, key).map_err(LmdbError::from)?.is_some() {
            return Err(StoreError::Duplicate(format!("task {}", task.id)));
        }
        self.tasks
            .put(&mut wtxn, key, &encode(task)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let bytes = self
            .tasks
            .get(&rtxn, id.as_str().as_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
        Ok(decode(id.as_str(), bytes)?)
    }

    fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let key = id.as_str().as_bytes();
        let mut task: Task = match self.tasks.get(&wtxn, key).map_err(LmdbError::from)? {
            Some(bytes) => decode(id.as_str(), bytes)?,
            None => return Err(StoreError::NotFound(format!("task {id}"))),
        };
        task.apply_patch(patch.clone());
        self.tasks
            .put(&mut wtxn, key, &encode(&task)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(task)
    }

    fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existed = self
            .tasks
            .delete(&mut wtxn, id.as_str().as_bytes())
            .map_err(LmdbError::from)?;
        if !existed {
            return Err(StoreError::NotFound(format!("task {id}")));
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut tasks = Vec::new();
        for entry in self.tasks.iter(&rtxn).map_err(LmdbError::from)? {
            let (key, bytes) = entry.map_err(LmdbError::from)?;
            tasks.push(decode(&String::from_utf8_lossy(key), bytes)?);
        }
        Ok(tasks)
    }

    fn import_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.tasks
            .put(&mut wtxn, task.id.as_str().as_bytes(), &encode(task)?)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}

#[async_trait]
impl TaskStore for LmdbStore {
    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let task = task.clone();
        self.blocking(move |env| env.insert_task(&task)).await
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        let id = id.clone();
        self.blocking(move |env| env.get_task(&id)).await
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        let (id, patch) = (id.clone(), patch.clone());
        self.blocking(move |env| env.update_task(&id, &patch)).await
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        let id = id.clone();
        self.blocking(move |env| env.delete_task(&id)).await
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.blocking(|env| env.list_tasks()).await
    }

    async fn import_task(&self, task: &Task) -> Result<(), StoreError> {
        let task = task.clone();
        self.blocking(move |env| env.import_task(&task)).await
    }
}
