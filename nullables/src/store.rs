//! Nullable store: thread-safe in-memory storage for testing.
//!
//! Applies the same [`UserUpdate`] language and withdrawal compare-and-set
//! as the LMDB backend, so engine tests exercise the real write semantics.
//! Faults can be injected to simulate a lost acknowledgement: the write
//! commits but the caller sees a backend error. A competing write can be
//! interleaved between an engine's read and its own write with
//! [`NullStore::interleave_next_write`].

use async_trait::async_trait;
use rewards_store::withdrawal::transition;
use rewards_store::{
    NewWithdrawal, StoreError, TaskStore, UserStore, UserUpdate, WithdrawalStore,
};
use rewards_types::{
    Task, TaskId, TaskPatch, Timestamp, UserAccount, UserId, WithdrawalId, WithdrawalRequest,
    WithdrawalStatus,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Faults {
    /// Fail the next user update or withdrawal transition without writing.
    fail_next_write: bool,
    /// Commit the next user update or withdrawal transition, then report
    /// a backend error.
    lose_next_ack: bool,
    /// Runs once, just before the next user update or withdrawal transition.
    interleave: Option<Interleave>,
}

struct Interleave(Box<dyn FnOnce(&NullStore) + Send>);

impl std::fmt::Debug for Interleave {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Interleave")
    }
}

/// An in-memory task + user + withdrawal store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Debug, Default)]
pub struct NullStore {
    tasks: Mutex<HashMap<TaskId, Task>>,
    users: Mutex<HashMap<UserId, UserAccount>>,
    withdrawals: Mutex<HashMap<WithdrawalId, WithdrawalRequest>>,
    next_withdrawal: AtomicU64,
    faults: Mutex<Faults>,
    writes: AtomicU64,
}

impl NullStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next guarded write fails before touching any document.
    pub fn fail_next_write(&self) {
        self.faults.lock().unwrap().fail_next_write = true;
    }

    /// The next guarded write commits but reports a backend error.
    pub fn lose_next_ack(&self) {
        self.faults.lock().unwrap().lose_next_ack = true;
    }

    /// Run `competing` right before the next user update or withdrawal
    /// transition, as if another request had committed first. The closure
    /// writes through [`NullStore::commit_user_update`] and
    /// [`NullStore::commit_transition`], which bypass faults and hooks.
    pub fn interleave_next_write(&self, competing: impl FnOnce(&NullStore) + Send + 'static) {
        self.faults.lock().unwrap().interleave = Some(Interleave(Box::new(competing)));
    }

    /// Apply `update` to one user document immediately.
    pub fn commit_user_update(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<UserAccount, StoreError> {
        let mut users = self.users.lock().unwrap();
        let account = users
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))?;
        update.apply(account)?;
        Ok(account.clone())
    }

    /// Compare-and-set a withdrawal status immediately.
    pub fn commit_transition(
        &self,
        id: &WithdrawalId,
        expected: WithdrawalStatus,
        next: WithdrawalStatus,
        decided_at: Timestamp,
    ) -> Result<WithdrawalRequest, StoreError> {
        let mut withdrawals = self.withdrawals.lock().unwrap();
        let record = withdrawals
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("withdrawal {id}")))?;
        transition(record, expected, next, decided_at)?;
        Ok(record.clone())
    }

    /// Number of committed user updates and withdrawal transitions.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    fn before_write(&self) -> Result<(), StoreError> {
        let competing = self.faults.lock().unwrap().interleave.take();
        if let Some(Interleave(competing)) = competing {
            competing(self);
        }
        let mut faults = self.faults.lock().unwrap();
        if std::mem::take(&mut faults.fail_next_write) {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        Ok(())
    }

    fn after_write(&self) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut faults = self.faults.lock().unwrap();
        if std::mem::take(&mut faults.lose_next_ack) {
            return Err(StoreError::Backend("injected lost acknowledgement".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for NullStore {
    async fn insert_task(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.contains_key(&task.id) {
            return Err(StoreError::Duplicate(format!("task {}", task.id)));
        }
        tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.tasks
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("task {id}")))
    }

    async fn update_task(&self, id: &TaskId, patch: &TaskPatch) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("task {id}")))?;
        task.apply_patch(patch.clone());
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        self.tasks
            .lock()
            .unwrap()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("task {id}")))
    }

    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.tasks.lock().unwrap().values().cloned().collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    async fn import_task(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks
            .lock()
            .unwrap()
            .insert(task.id.clone(), task.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for NullStore {
    async fn create_user_if_absent(&self, account: UserAccount) -> Result<UserAccount, StoreError> {
        let mut users = self.users.lock().unwrap();
        Ok(users.entry(account.id.clone()).or_insert(account).clone())
    }

    async fn get_user(&self, id: &UserId) -> Result<UserAccount, StoreError> {
        self.users
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {id}")))
    }

    async fn apply_user_update(
        &self,
        id: &UserId,
        update: &UserUpdate,
    ) -> Result<UserAccount, StoreError> {
        self.before_write()?;
        let written = self.commit_user_update(id, update)?;
        self.after_write()?;
        Ok(written)
    }

    async fn list_users(&self) -> Result<Vec<UserAccount>, StoreError> {
        let mut users: Vec<UserAccount> = self.users.lock().unwrap().values().cloned().collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }

    async fn import_user(&self, account: &UserAccount) -> Result<(), StoreError> {
        self.users
            .lock()
            .unwrap()
            .insert(account.id.clone(), account.clone());
        Ok(())
    }
}

#[async_trait]
impl WithdrawalStore for NullStore {
    async fn insert_withdrawal(&self, new: NewWithdrawal) -> Result<WithdrawalRequest, StoreError> {
        let seq = self.next_withdrawal.fetch_add(1, Ordering::SeqCst) + 1;
        let request = new.into_request(WithdrawalId::from_sequence(seq));
        self.withdrawals
            .lock()
            .unwrap()
            .insert(request.id.clone(), request.clone());
        Ok(request)
    }

    async fn get_withdrawal(&self, id: &WithdrawalId) -> Result<WithdrawalRequest, StoreError> {
        self.withdrawals
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("withdrawal {id}")))
    }

    async fn transition_withdrawal(
        &self,
        id: &WithdrawalId,
        expected: WithdrawalStatus,
        next: WithdrawalStatus,
        decided_at: Timestamp,
    ) -> Result<WithdrawalRequest, StoreError> {
        self.before_write()?;
        let written = self.commit_transition(id, expected, next, decided_at)?;
        self.after_write()?;
        Ok(written)
    }

    async fn withdrawals_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        Ok(self
            .withdrawals
            .lock()
            .unwrap()
            .values()
            .filter(|w| &w.user_id == user)
            .cloned()
            .collect())
    }

    async fn withdrawals_with_status(
        &self,
        status: WithdrawalStatus,
    ) -> Result<Vec<WithdrawalRequest>, StoreError> {
        Ok(self
            .withdrawals
            .lock()
            .unwrap()
            .values()
            .filter(|w| w.status == status)
            .cloned()
            .collect())
    }

    async fn import_withdrawal(&self, request: &WithdrawalRequest) -> Result<(), StoreError> {
        if let Some(seq) = request
            .id
            .as_str()
            .strip_prefix("wd-")
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.next_withdrawal.fetch_max(seq, Ordering::SeqCst);
        }
        self.withdrawals
            .lock()
            .unwrap()
            .insert(request.id.clone(), request.clone());
        Ok(())
    }
}
