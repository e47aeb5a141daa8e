//! User ledger.
//!
//! Owns per-user balances and the completed / pending task sets. Every
//! mutation goes through a guarded [`rewards_store::UserUpdate`], so two
//! concurrent requests against the same account can never lose an update
//! or credit a task twice.

pub mod completion;
pub mod ledger;
pub mod wallet;

pub use completion::CompletionOutcome;
pub use ledger::{UserLedger, DEFAULT_CHECK_IN_TASK};
pub use wallet::validate_wallet_address;
