//! Prometheus metrics for the rewards service.
//!
//! [`RewardsMetrics`] owns a dedicated [`Registry`] so several services (or
//! tests) in one process never collide on metric names. Amounts are not
//! exported; they live in the ledger.

use prometheus::{
    register_int_counter_with_registry, Encoder, IntCounter, Opts, Registry, TextEncoder,
};

use rewards_notify::DispatchStats;

use crate::NodeError;

pub struct RewardsMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    /// Completion attempts that credited a reward (automatic and daily tasks).
    pub tasks_completed: IntCounter,
    /// Completion attempts that ended in the manual review queue.
    pub submissions_queued: IntCounter,
    pub verifications_approved: IntCounter,
    pub verifications_rejected: IntCounter,
    pub withdrawals_requested: IntCounter,
    pub withdrawals_approved: IntCounter,
    pub withdrawals_rejected: IntCounter,
    /// Mirrors [`DispatchStats::delivered`].
    pub notifications_delivered: IntCounter,
    /// Mirrors [`DispatchStats::failed`].
    pub notifications_failed: IntCounter,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
}

impl RewardsMetrics {
    /// Create a fresh set of metrics, all registered under a new [`Registry`].
    pub fn new() -> Result<Self, NodeError> {
        let registry = Registry::new();
        Ok(Self {
            tasks_completed: counter(
                &registry,
                "rewards_tasks_completed_total",
                "Task completions that credited a reward",
            )?,
            submissions_queued: counter(
                &registry,
                "rewards_submissions_queued_total",
                "Task completions held for manual review",
            )?,
            verifications_approved: counter(
                &registry,
                "rewards_verifications_approved_total",
                "Manual submissions approved",
            )?,
            verifications_rejected: counter(
                &registry,
                "rewards_verifications_rejected_total",
                "Manual submissions rejected",
            )?,
            withdrawals_requested: counter(
                &registry,
                "rewards_withdrawals_requested_total",
                "Withdrawal requests created",
            )?,
            withdrawals_approved: counter(
                &registry,
                "rewards_withdrawals_approved_total",
                "Withdrawal requests approved and debited",
            )?,
            withdrawals_rejected: counter(
                &registry,
                "rewards_withdrawals_rejected_total",
                "Withdrawal requests rejected",
            )?,
            notifications_delivered: counter(
                &registry,
                "rewards_notifications_delivered_total",
                "Notification messages delivered",
            )?,
            notifications_failed: counter(
                &registry,
                "rewards_notifications_failed_total",
                "Notification messages that failed to send",
            )?,
            registry,
        })
    }

    /// Bring the notification counters up to the dispatcher's totals.
    pub fn observe_dispatch(&self, stats: &DispatchStats) {
        catch_up(&self.notifications_delivered, stats.delivered());
        catch_up(&self.notifications_failed, stats.failed());
    }

    /// Encode every metric in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, NodeError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()).into())
    }
}

fn catch_up(counter: &IntCounter, total: u64) {
    let seen = counter.get();
    if total > seen {
        counter.inc_by(total - seen);
    }
}
