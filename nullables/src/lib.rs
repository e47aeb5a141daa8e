//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the engines (clock, store, notification
//! transport) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically (including injected faults)
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod notifier;
pub mod store;

pub use clock::NullClock;
pub use notifier::NullNotifier;
pub use store::NullStore;
