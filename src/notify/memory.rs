use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{Notification, Notifier, NotifyError, SUBSCRIBER_CAPACITY};

/// In-process notifier. Clones share one bus, so several metadata stores in
/// one process observe each other's events as if they were separate nodes.
#[derive(Clone)]
pub struct MemoryNotifier {
    tx: broadcast::Sender<Notification>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SUBSCRIBER_CAPACITY);
        Self { tx }
    }

    /// Simulate a transport reconnect.
    pub fn resync(&self) {
        let _ = self.tx.send(Notification::Resync);
    }
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn publish(&self, payload: &str) -> Result<(), NotifyError> {
        // No subscribers is not an error.
        let _ = self.tx.send(Notification::Payload(payload.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
