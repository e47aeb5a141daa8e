//! Manual verification queue.
//!
//! A (user, task) pair is pending while the task id is a key of the user's
//! `pending_verification` map, and decided (terminal) once it is removed.
//! Decisions are guarded updates on the user document, so a duplicate admin
//! click finds the pair no longer pending and credits nothing.

pub mod decision;
pub mod queue;

pub use decision::{Decision, PendingItem};
pub use queue::VerificationQueue;
