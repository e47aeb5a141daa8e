//! Abstract storage traits for the rewards ledger.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits.
//!
//! Contended fields of a user document (balance, completed/pending sets) are
//! never written by fetch-modify-store from the engines. Instead the engines
//! describe a [`UserUpdate`] (guards plus delta operations) and the backend
//! applies it to a single document atomically.

pub mod error;
pub mod ingest;
pub mod task;
pub mod user;
pub mod withdrawal;

pub use error::StoreError;
pub use task::TaskStore;
pub use user::{UserGuard, UserOp, UserStore, UserUpdate};
pub use withdrawal::{NewWithdrawal, WithdrawalStore};

/// Everything the engines need from a backend.
pub trait RewardsStore: TaskStore + UserStore + WithdrawalStore {}

impl<T: TaskStore + UserStore + WithdrawalStore> RewardsStore for T {}
