//! Fundamental types for the rewards ledger.
//!
//! This crate defines the strict record schema shared across every other crate
//! in the workspace: identifiers, amounts, timestamps, tasks, user accounts,
//! withdrawal requests, and the error taxonomy returned by every core operation.

pub mod account;
pub mod amount;
pub mod error;
pub mod ids;
pub mod task;
pub mod time;
pub mod withdrawal;

pub use account::{PendingSnapshot, UserAccount, UserProfile};
pub use amount::Amount;
pub use error::{ErrorKind, RewardsError};
pub use ids::{TaskId, UserId, WithdrawalId};
pub use task::{Schedule, Task, TaskPatch, VerificationMode};
pub use time::{Clock, SystemClock, Timestamp};
pub use withdrawal::{WithdrawalRequest, WithdrawalStatus};
