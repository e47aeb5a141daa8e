//! Rewards ledger service.
//!
//! Wires the engines (catalog, user ledger, verification queue, withdrawal
//! ledger) to one store, one event bus and the notification dispatcher,
//! and carries the process-level concerns: configuration, logging and
//! metrics.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod service;

pub use config::RewardsConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::RewardsMetrics;
pub use service::{ImportSummary, RewardsService};
