//! Outbound notifications.
//!
//! Engines publish a [`RewardsEvent`] on the [`EventBus`] only after the state
//! change it describes has been committed. The [`NotificationDispatcher`]
//! consumes those events on its own task, renders the fixed message
//! templates, and hands them to a [`Notifier`]. Delivery failures are logged
//! and counted, never reported back to the ledger.

pub mod dispatcher;
pub mod error;
pub mod event;
pub mod messages;
pub mod notifier;
pub mod stats;

pub use dispatcher::{DispatchConfig, DispatcherHandle, NotificationDispatcher};
pub use error::NotifyError;
pub use event::{EventBus, RewardsEvent};
pub use messages::Templates;
pub use notifier::{LogNotifier, Notifier};
pub use stats::DispatchStats;
