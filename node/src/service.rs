//! The assembled service.
//!
//! One store, one event bus, one dispatcher task. Engines publish on the
//! bus after their writes commit; the dispatcher renders and delivers
//! messages on its own task. Operation wrappers here only add metrics.

use std::sync::Arc;

use rewards_catalog::TaskCatalog;
use rewards_ledger::{CompletionOutcome, UserLedger};
use rewards_notify::{DispatcherHandle, EventBus, NotificationDispatcher, Notifier};
use rewards_store::ingest::Export;
use rewards_store::RewardsStore;
use rewards_store_lmdb::LmdbStore;
use rewards_types::{
    Amount, Clock, RewardsError, SystemClock, TaskId, UserId, WithdrawalId, WithdrawalRequest,
};
use rewards_verification::{Decision, PendingItem, VerificationQueue};
use rewards_withdrawal::WithdrawalLedger;

use crate::{NodeError, RewardsConfig, RewardsMetrics};

/// Counts of records written by [`RewardsService::import`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub tasks: usize,
    pub users: usize,
    pub withdrawals: usize,
}

pub struct RewardsService {
    store: Arc<dyn RewardsStore>,
    catalog: TaskCatalog,
    ledger: UserLedger,
    verification: VerificationQueue,
    withdrawals: WithdrawalLedger,
    metrics: RewardsMetrics,
    dispatcher: DispatcherHandle,
}

impl RewardsService {
    /// Assemble the service and start the notification dispatcher.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: &RewardsConfig,
        store: Arc<dyn RewardsStore>,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        let mut bus = EventBus::new();
        let dispatcher =
            NotificationDispatcher::new(notifier, config.dispatch_config()).spawn(&mut bus);
        let events = Arc::new(bus);

        let service = Self {
            catalog: TaskCatalog::new(store.clone()),
            ledger: UserLedger::new(store.clone(), clock.clone())
                .with_check_in_task(config.check_in_task()),
            verification: VerificationQueue::new(store.clone(), events.clone()),
            withdrawals: WithdrawalLedger::new(store.clone(), clock, events)
                .with_min_withdrawal(config.min_withdrawal()),
            store,
            metrics: RewardsMetrics::new()?,
            dispatcher,
        };
        tracing::info!(
            admin_chat = config.admin_chat_id.as_deref().unwrap_or("<none>"),
            currency = %config.currency,
            "rewards service started"
        );
        Ok(service)
    }

    /// Open the LMDB store under `config.data_dir` and start on it.
    pub fn open(config: &RewardsConfig, notifier: Arc<dyn Notifier>) -> Result<Self, NodeError> {
        let store = LmdbStore::open(&config.data_dir, config.map_size_bytes())?;
        Self::start(config, Arc::new(store), Arc::new(SystemClock), notifier)
    }

    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &UserLedger {
        &self.ledger
    }

    pub fn verification(&self) -> &VerificationQueue {
        &self.verification
    }

    pub fn withdrawals(&self) -> &WithdrawalLedger {
        &self.withdrawals
    }

    pub fn metrics(&self) -> &RewardsMetrics {
        &self.metrics
    }

    pub async fn attempt_complete(
        &self,
        user: &UserId,
        task: &TaskId,
    ) -> Result<CompletionOutcome, RewardsError> {
        let outcome = self.ledger.attempt_complete(user, task).await?;
        self.record_completion(outcome);
        Ok(outcome)
    }

    pub async fn check_in(&self, user: &UserId) -> Result<CompletionOutcome, RewardsError> {
        let outcome = self.ledger.check_in(user).await?;
        self.record_completion(outcome);
        Ok(outcome)
    }

    pub async fn list_pending(&self) -> Result<Vec<PendingItem>, RewardsError> {
        self.verification.list_pending().await
    }

    pub async fn approve_submission(
        &self,
        user: &UserId,
        task: &TaskId,
    ) -> Result<Decision, RewardsError> {
        let decision = self.verification.approve(user, task).await?;
        if let Decision::Approved { .. } = decision {
            self.metrics.verifications_approved.inc();
        }
        Ok(decision)
    }

    pub async fn reject_submission(
        &self,
        user: &UserId,
        task: &TaskId,
    ) -> Result<PendingItem, RewardsError> {
        let item = self.verification.reject(user, task).await?;
        self.metrics.verifications_rejected.inc();
        Ok(item)
    }

    pub async fn request_withdrawal(
        &self,
        user: &UserId,
        amount: Amount,
        wallet_address: &str,
    ) -> Result<WithdrawalRequest, RewardsError> {
        let request = self.withdrawals.request(user, amount, wallet_address).await?;
        self.metrics.withdrawals_requested.inc();
        Ok(request)
    }

    pub async fn approve_withdrawal(
        &self,
        id: &WithdrawalId,
    ) -> Result<WithdrawalRequest, RewardsError> {
        let request = self.withdrawals.approve(id).await?;
        self.metrics.withdrawals_approved.inc();
        Ok(request)
    }

    pub async fn reject_withdrawal(
        &self,
        id: &WithdrawalId,
    ) -> Result<WithdrawalRequest, RewardsError> {
        let request = self.withdrawals.reject(id).await?;
        self.metrics.withdrawals_rejected.inc();
        Ok(request)
    }

    /// Bulk-load an already-normalized export, overwriting records with the
    /// same ids.
    pub async fn import(&self, export: &Export) -> Result<ImportSummary, NodeError> {
        for task in &export.tasks {
            task.validate()?;
        }
        for task in &export.tasks {
            self.store.import_task(task).await?;
        }
        for user in &export.users {
            self.store.import_user(user).await?;
        }
        for request in &export.withdrawals {
            self.store.import_withdrawal(request).await?;
        }
        let summary = ImportSummary {
            tasks: export.tasks.len(),
            users: export.users.len(),
            withdrawals: export.withdrawals.len(),
        };
        tracing::info!(
            tasks = summary.tasks,
            users = summary.users,
            withdrawals = summary.withdrawals,
            "import complete"
        );
        Ok(summary)
    }

    /// Wait for every queued notification to be handled.
    pub async fn flush_notifications(&self) -> Result<(), NodeError> {
        self.dispatcher.flush().await?;
        self.metrics.observe_dispatch(&self.dispatcher.stats());
        Ok(())
    }

    /// Drain the dispatcher and stop it.
    pub async fn shutdown(self) -> Result<(), NodeError> {
        let stats = self.dispatcher.stats();
        self.dispatcher.shutdown().await?;
        self.metrics.observe_dispatch(&stats);
        tracing::info!(
            delivered = stats.delivered(),
            failed = stats.failed(),
            "rewards service stopped"
        );
        Ok(())
    }

    fn record_completion(&self, outcome: CompletionOutcome) {
        match outcome {
            CompletionOutcome::Completed { credited } if !credited.is_zero() => {
                self.metrics.tasks_completed.inc()
            }
            CompletionOutcome::PendingReview => self.metrics.submissions_queued.inc(),
            CompletionOutcome::Completed { .. } => {}
        }
    }
}
