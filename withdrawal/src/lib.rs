//! Withdrawal ledger.
//!
//! A request records the amount and a balance snapshot but reserves
//! nothing. Funds move only on approval, as a guarded debit on the user
//! document:
//!
//! 1. debit with guards `WithdrawalNotDebited(id)` and `BalanceAtLeast(amount)`,
//!    recording `id` in the user's `debited_withdrawals` in the same update;
//! 2. compare-and-set the request `pending -> approved`.
//!
//! The debit marker makes a retried approval skip step 1, and lets a
//! rejection that wins the race in step 2 refund exactly once. Balance can
//! never go negative: an approval whose amount exceeds the live balance
//! fails and leaves the request pending.

pub mod ledger;

pub use ledger::WithdrawalLedger;
