//! Consumes committed events and delivers their messages.
//!
//! The dispatcher runs on its own tokio task, fed through an unbounded
//! channel that a listener on the [`EventBus`] writes into. A ledger
//! operation therefore returns as soon as its state change is committed and
//! the event is queued; whether the message is ever delivered has no effect
//! on the ledger.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{DispatchStats, EventBus, Notifier, NotifyError, RewardsEvent, Templates};

/// Who gets which messages.
#[derive(Clone, Debug)]
pub struct DispatchConfig {
    /// Chat that receives the admin mirror and debug logs. `None` disables both.
    pub admin_chat_id: Option<String>,
    pub notify_users: bool,
    pub mirror_to_admin: bool,
    pub currency: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            admin_chat_id: None,
            notify_users: true,
            mirror_to_admin: true,
            currency: "STON".to_string(),
        }
    }
}

enum Envelope {
    Event(RewardsEvent),
    Flush(oneshot::Sender<()>),
    Shutdown,
}

pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    templates: Templates,
    config: DispatchConfig,
    stats: Arc<DispatchStats>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, config: DispatchConfig) -> Self {
        Self {
            notifier,
            templates: Templates::new(config.currency.clone()),
            config,
            stats: Arc::new(DispatchStats::new()),
        }
    }

    /// Subscribe to `bus` and start consuming on a new task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(self, bus: &mut EventBus) -> DispatcherHandle {
        let (tx, rx) = mpsc::unbounded_channel();

        let listener_tx = tx.clone();
        bus.subscribe(Box::new(move |event| {
            if listener_tx.send(Envelope::Event(event.clone())).is_err() {
                warn!(event = event.name(), "notification dispatcher stopped; event dropped");
            }
        }));

        debug!(listeners = bus.listener_count(), "notification dispatcher subscribed");

        let stats = Arc::clone(&self.stats);
        let join = tokio::spawn(self.run(rx));
        DispatcherHandle { tx, join, stats }
    }

    async fn run(self, mut rx: mpsc::UnboundedReceiver<Envelope>) {
        while let Some(envelope) = rx.recv().await {
            match envelope {
                Envelope::Event(event) => self.deliver(&event).await,
                Envelope::Flush(ack) => {
                    let _ = ack.send(());
                }
                Envelope::Shutdown => break,
            }
        }
        debug!(
            events = self.stats.events(),
            delivered = self.stats.delivered(),
            failed = self.stats.failed(),
            "notification dispatcher stopped"
        );
    }

    async fn deliver(&self, event: &RewardsEvent) {
        self.stats.record_event();

        if self.config.notify_users {
            if let Some(text) = self.templates.user_message(event) {
                let chat = event.user().as_str();
                if let Err(e) = self.send(chat, &text).await {
                    let log = self
                        .templates
                        .debug_log(&format!("Failed to send user notification to {chat}: {e}"));
                    self.send_admin(&log).await;
                }
            }
        }

        if self.config.mirror_to_admin {
            let text = self.templates.admin_message(event);
            self.send_admin(&text).await;
        }
    }

    async fn send(&self, chat_id: &str, text: &str) -> Result<(), NotifyError> {
        let result = self.notifier.notify(chat_id, text).await;
        self.stats.record_delivery(result.is_ok());
        if let Err(e) = &result {
            warn!(chat_id, error = %e, "notification delivery failed");
        }
        result
    }

    async fn send_admin(&self, text: &str) {
        if let Some(admin) = self.config.admin_chat_id.as_deref() {
            let _ = self.send(admin, text).await;
        }
    }
}

/// Control handle for a running dispatcher.
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<Envelope>,
    join: JoinHandle<()>,
    stats: Arc<DispatchStats>,
}

impl DispatcherHandle {
    /// Wait until every event queued before this call has been handled.
    pub async fn flush(&self) -> Result<(), NotifyError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx
            .send(Envelope::Flush(ack_tx))
            .map_err(|_| NotifyError::DispatcherClosed)?;
        ack_rx.await.map_err(|_| NotifyError::DispatcherClosed)
    }

    /// Handle everything already queued, then stop the task.
    pub async fn shutdown(self) -> Result<(), NotifyError> {
        self.tx
            .send(Envelope::Shutdown)
            .map_err(|_| NotifyError::DispatcherClosed)?;
        self.join.await.map_err(|_| NotifyError::DispatcherClosed)
    }

    pub fn stats(&self) -> Arc<DispatchStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rewards_types::{Amount, WithdrawalId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<(String, String)>>,
        fail_chat: Option<String>,
    }

    #[async_trait]
    impl Notifier for Recording {
        async fn notify(&self, chat_id: &str, message: &str) -> Result<(), NotifyError> {
            if self.fail_chat.as_deref() == Some(chat_id) {
                return Err(NotifyError::Transport("unreachable".into()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((chat_id.to_string(), message.to_string()));
            Ok(())
        }
    }

    fn config() -> DispatchConfig {
        DispatchConfig {
            admin_chat_id: Some("admin".into()),
            ..Default::default()
        }
    }

    fn approved() -> RewardsEvent {
        RewardsEvent::TaskApproved {
            user: "u1".into(),
            username: None,
            task: "t1".into(),
            title: "Join".into(),
            reward: Amount::new(50),
        }
    }

    #[tokio::test]
    async fn delivers_to_user_and_mirrors_to_admin() {
        let notifier = Arc::new(Recording::default());
        let mut bus = EventBus::new();
        let handle = NotificationDispatcher::new(notifier.clone(), config()).spawn(&mut bus);

        assert_eq!(bus.listener_count(), 1);
        bus.emit(&approved());
        handle.flush().await.unwrap();

        let sent = notifier.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, "u1");
        assert_eq!(sent[1].0, "admin");
        assert_eq!(handle.stats().delivered(), 2);
    }

    #[tokio::test]
    async fn user_failure_is_logged_to_admin_and_counted() {
        let notifier = Arc::new(Recording {
            fail_chat: Some("u1".into()),
            ..Default::default()
        });
        let mut bus = EventBus::new();
        let handle = NotificationDispatcher::new(notifier.clone(), config()).spawn(&mut bus);

        bus.emit(&approved());
        handle.flush().await.unwrap();

        let sent = notifier.sent.lock().unwrap().clone();
        assert!(sent.iter().all(|(chat, _)| chat == "admin"));
        assert!(sent.iter().any(|(_, text)| text.contains("Debug Log")));
        let stats = handle.stats();
        assert_eq!(stats.failed(), 1);
        assert_eq!(stats.events(), 1);
    }

    #[tokio::test]
    async fn no_admin_chat_means_no_mirror() {
        let notifier = Arc::new(Recording::default());
        let mut bus = EventBus::new();
        let handle = NotificationDispatcher::new(notifier.clone(), DispatchConfig::default())
            .spawn(&mut bus);

        bus.emit(&RewardsEvent::WithdrawalRequested {
            withdrawal: WithdrawalId::from_sequence(1),
            user: "u1".into(),
            username: None,
            amount: Amount::new(10),
            wallet: "EQ".into(),
        });
        handle.shutdown().await.unwrap();

        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_after_shutdown_are_dropped_quietly() {
        let notifier = Arc::new(Recording::default());
        let mut bus = EventBus::new();
        let handle = NotificationDispatcher::new(notifier.clone(), config()).spawn(&mut bus);
        handle.shutdown().await.unwrap();

        bus.emit(&approved());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }
}
