//! LMDB storage backend for the rewards ledger.
//!
//! Implements all storage traits from `rewards-store` using the `heed` LMDB bindings.
//! Each logical store maps to one LMDB database within a single environment.
//! LMDB allows a single writer at a time, so every guarded update runs
//! read-check-write inside one write transaction and is atomic per document.

mod codec;
pub mod environment;
pub mod error;
pub mod meta;
pub mod task;
pub mod user;
pub mod withdrawal;

pub use environment::{LmdbEnvironment, LmdbStore};
pub use error::LmdbError;
