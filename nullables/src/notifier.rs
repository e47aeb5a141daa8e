//! Nullable notifier: records messages without sending them.

use async_trait::async_trait;
use rewards_notify::{Notifier, NotifyError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A notifier that records messages instead of sending them, and can be
/// told to fail.
#[derive(Debug, Default)]
pub struct NullNotifier {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl NullNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every delivery fails.
    pub fn failing() -> Self {
        let notifier = Self::new();
        notifier.set_failing(true);
        notifier
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// All `(chat_id, message)` pairs delivered so far.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages delivered to one chat.
    pub fn sent_to(&self, chat_id: &str) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(chat, _)| chat == chat_id)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn reset(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, chat_id: &str, message: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Transport(format!("null transport refused {chat_id}")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((chat_id.to_string(), message.to_string()));
        Ok(())
    }
}
